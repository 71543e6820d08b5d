//! Periodic background saves
//!
//! The AutoSaveManager owns one worker thread that invokes a save callback
//! every `interval`. It knows nothing about slots: the callback is usually
//! [`SaveManager::auto_save_callback`], which saves the latest published
//! game state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::save_manager::SaveManager;

/// Callback run on every tick; returns whether the save succeeded
pub type SaveCallback = Arc<dyn Fn() -> bool + Send + Sync>;

const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);
const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct Counters {
    succeeded: AtomicU64,
    failed: AtomicU64,
    last_save: Mutex<Option<DateTime<Utc>>>,
}

impl Counters {
    fn record(&self, ok: bool) {
        if ok {
            self.succeeded.fetch_add(1, Ordering::SeqCst);
            *self.last_save.lock() = Some(Utc::now());
        } else {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct Worker {
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    handle: JoinHandle<()>,
}

/// Snapshot of the auto-save worker
#[derive(Debug, Clone, PartialEq)]
pub struct AutoSaveStatus {
    pub running: bool,
    pub interval: Duration,
    pub saves_succeeded: u64,
    pub saves_failed: u64,
    pub last_save: Option<DateTime<Utc>>,
}

/// Runs a save callback on a background timer
pub struct AutoSaveManager {
    callback: SaveCallback,
    interval: Duration,
    stop_timeout: Duration,
    counters: Arc<Counters>,
    worker: Option<Worker>,
}

impl AutoSaveManager {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
            interval: DEFAULT_INTERVAL,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            counters: Arc::new(Counters::default()),
            worker: None,
        }
    }

    /// Auto-save bound to a SaveManager, timed by its configuration
    pub fn for_save_manager(manager: Arc<SaveManager>) -> Self {
        let interval = manager.config().auto_save_interval();
        let stop_timeout = manager.config().auto_save_stop_timeout();
        Self::new(manager.auto_save_callback())
            .with_interval(interval)
            .with_stop_timeout(stop_timeout)
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_stop_timeout(mut self, stop_timeout: Duration) -> Self {
        self.stop_timeout = stop_timeout;
        self
    }

    /// Start the worker; `false` if it is already running or `interval` is zero
    pub fn start(&mut self, interval: Duration) -> bool {
        if self.is_running() {
            log::debug!("Auto-save already running");
            return false;
        }
        if interval.is_zero() {
            log::warn!("Refusing to start auto-save with a zero interval");
            return false;
        }
        // A worker that finished on its own leaves a stale handle behind
        self.worker = None;
        self.interval = interval;

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let callback = Arc::clone(&self.callback);
        let counters = Arc::clone(&self.counters);

        let spawned = thread::Builder::new()
            .name("auto-save".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => counters.record(callback()),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                let _ = done_tx.send(());
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker {
                    stop_tx,
                    done_rx,
                    handle,
                });
                log::info!("Auto-save started (every {:?})", interval);
                true
            }
            Err(e) => {
                log::error!("Failed to spawn auto-save thread: {}", e);
                false
            }
        }
    }

    /// Stop the worker, waiting at most `stop_timeout` for it to exit
    ///
    /// Returns `false` if nothing was running. A save still in progress when
    /// the timeout elapses is left to finish on the detached thread.
    pub fn stop(&mut self) -> bool {
        let Some(worker) = self.worker.take() else {
            return false;
        };

        let _ = worker.stop_tx.send(());
        match worker.done_rx.recv_timeout(self.stop_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    log::error!("Auto-save thread panicked");
                }
                log::info!("Auto-save stopped");
            }
            Err(RecvTimeoutError::Timeout) => {
                log::warn!(
                    "Auto-save worker did not stop within {:?}; detaching it",
                    self.stop_timeout
                );
            }
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .map(|w| !w.handle.is_finished())
            .unwrap_or(false)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn status(&self) -> AutoSaveStatus {
        AutoSaveStatus {
            running: self.is_running(),
            interval: self.interval,
            saves_succeeded: self.counters.succeeded.load(Ordering::SeqCst),
            saves_failed: self.counters.failed.load(Ordering::SeqCst),
            last_save: *self.counters.last_save.lock(),
        }
    }

    /// Run the callback once on the calling thread
    pub fn trigger_now(&self) -> bool {
        let ok = (self.callback)();
        self.counters.record(ok);
        ok
    }
}

impl Drop for AutoSaveManager {
    fn drop(&mut self) {
        self.stop();
    }
}
