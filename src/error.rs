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


//! Error types for the download engine
//!
//! Errors are split along the engine's failure boundaries: request
//! validation fails before any I/O, per-file fetch problems are folded into
//! the aggregate result rather than propagated, and only packaging and
//! catalog loading surface hard errors to the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our EngineError type
pub type Result<T> = std::result::Result<T, EngineError>;

/// Main error type for the download engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Requested chapter is not present in the catalog
    #[error("chapter {0} not found in catalog")]
    ChapterNotFound(u32),

    /// Caller-supplied range is outside catalog bounds or inverted.
    /// Raised before any network I/O is performed.
    #[error("invalid range: {message}")]
    InvalidRange { message: String },

    /// Catalog file could not be parsed
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Engine configuration is unusable, caught at construction
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Zip archive creation failed (legacy packaging mode).
    /// Fatal to the invocation, unlike per-file failures.
    #[error("packaging failed for {dir}: {message}")]
    Packaging { dir: PathBuf, message: String },

    /// HTTP client error from reqwest
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create an InvalidRange error with a message
    pub fn invalid_range<S: Into<String>>(message: S) -> Self {
        EngineError::InvalidRange {
            message: message.into(),
        }
    }
}
