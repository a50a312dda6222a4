// Quran Audio Engine - word-by-word recitation audio downloader
// Copyright (C) 2025 Quran Audio Engine contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Progress reporting
//!
//! The engine holds no global progress state; a caller registers an
//! observer per invocation and receives one event per processed file.
//! Events are ephemeral and never persisted. A panicking observer is
//! logged and ignored so a broken front end cannot abort a download.

use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Snapshot pushed to the observer after each processed file
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    /// Completion percentage in [0, 100]
    pub percent: f64,

    /// Files accounted for so far (successes and failures)
    pub completed: u64,

    /// Total files expected for the requested range
    pub total: u64,

    /// Human-readable description of the current step
    pub message: String,

    pub chapter_id: Option<u32>,
    pub verse_id: Option<u32>,
    pub word_id: Option<u32>,
}

impl ProgressEvent {
    pub fn new(
        completed: u64,
        total: u64,
        message: String,
        chapter_id: Option<u32>,
        verse_id: Option<u32>,
        word_id: Option<u32>,
    ) -> Self {
        Self {
            percent: percent_complete(completed, total),
            completed,
            total,
            message,
            chapter_id,
            verse_id,
            word_id,
        }
    }
}

/// Callback type for progress updates
pub type ProgressObserver = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Invoke the observer, tolerating panics.
pub fn emit(observer: Option<&ProgressObserver>, event: ProgressEvent) {
    if let Some(observer) = observer {
        let observer = Arc::clone(observer);
        if let Err(panic) = catch_unwind(AssertUnwindSafe(move || observer(event))) {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(%detail, "progress observer panicked, continuing download");
        }
    }
}

/// Completion percentage; 0 when the total is unknown or zero
pub fn percent_complete(completed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (completed as f64 / total as f64) * 100.0
    }
}

/// Format a byte count as a human-readable string (e.g. "45.2 MB")
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", UNITS[unit])
}

/// Format a duration in seconds as a human-readable string (e.g. "5.2m")
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{seconds:.1}s")
    } else if seconds < 3600.0 {
        format!("{:.1}m", seconds / 60.0)
    } else {
        format!("{:.1}h", seconds / 3600.0)
    }
}
