//! Savekeeper - Binary Entry Point
//!
//! Thin command-line front end over SaveManager. The save directory comes
//! from `SAVEKEEPER_DIR` (see `SaveConfig::from_env`).

use std::env;
use std::process::ExitCode;

use savekeeper::persistence::{SaveConfig, SaveManager, SaveStatistics};

const USAGE: &str = "usage: savekeeper <command>

commands:
  list                   list occupied slots
  stats                  show slot and backup statistics
  backups [file]         list backups, optionally for one slot file
  load <slot>            load a slot and print its player summary
  delete <slot>          delete a slot (a backup is kept)
  export <slot> <path>   copy a slot file to <path>
  import <path> <slot>   validate <path> and install it into <slot>
  verify <backup>        check that a backup decodes";

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::from(2)
        }
    }
}

fn run(args: &[String]) -> Result<bool, String> {
    let config = SaveConfig::from_env().map_err(|e| format!("configuration error: {}", e))?;
    let manager = SaveManager::new(config).map_err(|e| format!("cannot open save directory: {}", e))?;

    let command = args.first().map(String::as_str).ok_or(USAGE)?;
    match command {
        "list" => {
            for slot in manager.list_slots() {
                let meta = &slot.cached_metadata;
                if meta.corrupted {
                    println!("{:>3}  {}  <corrupted>", slot.slot_id, slot.filename);
                } else {
                    println!(
                        "{:>3}  {}  {} @ {} (hp {}, gold {})  {}",
                        slot.slot_id,
                        slot.filename,
                        meta.player_name,
                        meta.location,
                        meta.health,
                        meta.gold,
                        meta.saved_at.as_deref().unwrap_or("-")
                    );
                }
            }
            Ok(true)
        }
        "stats" => {
            let stats = manager.get_save_statistics();
            println!("slots:    {}/{}", stats.used_slots(), stats.max_slots);
            println!("current:  {}", stats.current_slot.map_or("-".to_string(), |s| s.to_string()));
            println!("saves:    {}", SaveStatistics::format_size(stats.total_size_bytes));
            println!(
                "backups:  {} ({})",
                stats.backups.total_backups,
                SaveStatistics::format_size(stats.backups.total_size_bytes)
            );
            if let (Some(oldest), Some(newest)) = (stats.oldest_save, stats.newest_save) {
                println!("range:    {} .. {}", oldest.to_rfc3339(), newest.to_rfc3339());
            }
            Ok(true)
        }
        "backups" => {
            let records = manager
                .backup_manager()
                .list_backups(args.get(1).map(String::as_str))
                .map_err(|e| e.to_string())?;
            for record in records {
                println!(
                    "{}  {}  {:.1}d  {}",
                    record.backup_filename,
                    record.reason,
                    record.age_days,
                    SaveStatistics::format_size(record.size_bytes)
                );
            }
            Ok(true)
        }
        "load" => {
            let slot = slot_arg(args.get(1))?;
            Ok(match manager.load_save_slot(slot) {
                Some(snapshot) => {
                    println!(
                        "{} @ {} (hp {}, gold {}, {} item(s))",
                        snapshot.player.name,
                        snapshot.world.current_location,
                        snapshot.player.health,
                        snapshot.player.gold,
                        snapshot.player.inventory.len()
                    );
                    true
                }
                None => false,
            })
        }
        "delete" => Ok(manager.delete_save_slot(slot_arg(args.get(1))?)),
        "export" => {
            let slot = slot_arg(args.get(1))?;
            let path = args.get(2).ok_or(USAGE)?;
            Ok(manager.export_save_slot(slot, path))
        }
        "import" => {
            let path = args.get(1).ok_or(USAGE)?;
            let slot = slot_arg(args.get(2))?;
            Ok(manager.import_save_slot(path, slot))
        }
        "verify" => {
            let backup = args.get(1).ok_or(USAGE)?;
            let ok = manager.backup_manager().verify_backup_integrity(backup);
            println!("{}", if ok { "ok" } else { "invalid" });
            Ok(ok)
        }
        _ => Err(USAGE.to_string()),
    }
}

fn slot_arg(arg: Option<&String>) -> Result<u32, String> {
    let raw = arg.ok_or(USAGE)?;
    raw.parse().map_err(|_| format!("invalid slot number: {}", raw))
}
