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


//! Resume state persistence
//!
//! One small JSON record per chapter under the download root, recording the
//! last successfully written verse/word so a later invocation can skip
//! already-downloaded ranges. The record always reflects the most recent
//! successful write, never a failed attempt.
//!
//! State I/O is deliberately non-fatal in both directions: a failed save is
//! logged and the download continues (resume just restarts from the last
//! persisted point), and a missing or corrupt file reads as "no prior
//! state".

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Persisted download position for one chapter.
///
/// Field names match the on-disk record, which is meant to stay
/// human-inspectable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResumeState {
    /// Chapter this record belongs to
    pub surah_id: u32,

    /// Last verse with a successful write, 0 if none
    pub last_verse: u32,

    /// Last word within that verse, absent in verse-by-verse mode
    pub last_word: Option<u32>,

    /// RFC 3339 timestamp of the last save
    pub timestamp: String,
}

impl ResumeState {
    /// Default state for a chapter with no prior progress
    pub fn fresh(surah_id: u32) -> Self {
        Self {
            surah_id,
            last_verse: 0,
            last_word: None,
            timestamp: String::new(),
        }
    }
}

/// Reads and writes per-chapter resume records
#[derive(Debug, Clone)]
pub struct ResumeStateStore {
    root: PathBuf,
}

impl ResumeStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of a chapter's state file
    pub fn state_path(&self, chapter_id: u32) -> PathBuf {
        self.root.join(format!("download_state_{chapter_id:03}.json"))
    }

    /// Overwrite the chapter's state with the current position.
    ///
    /// Fails silently on I/O error: the download keeps going and a later
    /// resume restarts from the last record that did make it to disk.
    pub async fn save(&self, chapter_id: u32, verse_id: u32, word_id: Option<u32>) {
        let state = ResumeState {
            surah_id: chapter_id,
            last_verse: verse_id,
            last_word: word_id,
            timestamp: Utc::now().to_rfc3339(),
        };

        let path = self.state_path(chapter_id);
        let json = match serde_json::to_string_pretty(&state) {
            Ok(json) => json,
            Err(e) => {
                warn!(chapter_id, error = %e, "failed to serialize resume state");
                return;
            }
        };

        if let Err(e) = tokio::fs::write(&path, json).await {
            warn!(chapter_id, path = %path.display(), error = %e, "failed to save resume state");
        }
    }

    /// Load the chapter's state, defaulting to no-prior-state when the file
    /// is missing or unparsable. Corrupt JSON is never fatal.
    pub async fn load(&self, chapter_id: u32) -> ResumeState {
        let path = self.state_path(chapter_id);
        match tokio::fs::read_to_string(&path).await {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(state) => state,
                Err(e) => {
                    warn!(chapter_id, path = %path.display(), error = %e,
                        "resume state file is corrupt, treating as no prior state");
                    ResumeState::fresh(chapter_id)
                }
            },
            Err(_) => ResumeState::fresh(chapter_id),
        }
    }

    /// Best-effort delete after a fully successful range completion.
    /// A stale file left behind just gets overwritten on the next run.
    pub async fn clear(&self, chapter_id: u32) {
        let path = self.state_path(chapter_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(chapter_id, "cleared resume state"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(chapter_id, path = %path.display(), error = %e, "failed to clear resume state");
            }
        }
    }
}

/// Check whether a file exists with non-zero size. Files matching this are
/// treated as already downloaded and never re-fetched when resuming.
pub async fn file_is_complete(path: &Path) -> Option<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Some(meta.len()),
        _ => None,
    }
}
