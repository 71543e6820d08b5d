//! Atomic file operations
//!
//! Slot files, backups and sidecars are never written in place.
//!
//! # Pattern
//!
//! 1. Write to a temporary file (.tmp)
//! 2. Call sync_all() to flush to disk
//! 3. Rename temp file to final path (atomic on most filesystems)
//!
//! A reader therefore sees either the old file or the new one, never a
//! partially written save.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Temp path used while `path` is being written
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Atomically write bytes to a file
///
/// # Example
///
/// ```ignore
/// atomic_write("saves/slot_01.sav", &bytes)?;
/// ```
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> io::Result<()> {
    atomic_write_with(path, |file| file.write_all(content))
}

/// Atomically write content using a writer function
///
/// Useful when the content is streamed (e.g. through a gzip encoder)
/// rather than built in memory first.
pub fn atomic_write_with<P, F>(path: P, write_fn: F) -> io::Result<()>
where
    P: AsRef<Path>,
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let path = path.as_ref();
    let temp_path = temp_path_for(path);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let result = (|| {
        let mut file = File::create(&temp_path)?;
        write_fn(&mut file)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

/// Atomically copy `from` to `to`, returning the number of bytes copied
pub fn atomic_copy<P1, P2>(from: P1, to: P2) -> io::Result<u64>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
{
    let bytes = fs::read(from)?;
    atomic_write(to, &bytes)?;
    Ok(bytes.len() as u64)
}

/// Clean up any leftover temp files from interrupted writes
///
/// Called when a save directory is opened.
pub fn cleanup_temp_files<P: AsRef<Path>>(dir: P) -> io::Result<usize> {
    let dir = dir.as_ref();
    let mut cleaned = 0;

    if !dir.exists() {
        return Ok(0);
    }

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() && path.extension().map(|e| e == "tmp").unwrap_or(false) {
            fs::remove_file(&path)?;
            cleaned += 1;
        }
    }

    Ok(cleaned)
}
