//! Utility functions and helpers
//!
//! Atomic file writes, gzip probing and timestamp helpers shared by the
//! persistence components.

pub mod atomic;
pub mod codec;
pub mod time;

pub use atomic::{atomic_copy, atomic_write, atomic_write_with, cleanup_temp_files};
pub use codec::{decode_payload, gunzip, gzip};
pub use time::{age_days, backup_timestamp, now, now_rfc3339, parse_backup_timestamp, parse_rfc3339};
