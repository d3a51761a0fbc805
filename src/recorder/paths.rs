// src/recorder/paths.rs
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

// All naming is UTC so that folder-name order always agrees with file birth
// order, including across DST transitions.

pub fn day_dir(base: &Path, at: DateTime<Utc>) -> PathBuf {
    base.join(at.format("%Y.%m.%d").to_string())
}

pub fn segment_path(base: &Path, at: DateTime<Utc>, ext: &str) -> PathBuf {
    day_dir(base, at).join(format!("{}.{}", at.format("%H-%M-%S"), ext))
}
