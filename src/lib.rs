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


//! Download engine for per-word and per-verse Quran recitation audio.
//!
//! Audio is served by a static file host under a deterministic scheme:
//! every (chapter, verse, word) triple maps to one remote `.mp3`. The
//! engine turns a chapter-level download request into a concurrency-bounded
//! sequence of fetches with retry, resume-state persistence, a
//! consecutive-not-found short circuit, and progress reporting to a
//! caller-supplied observer.
//!
//! Front ends (interactive or otherwise) consume only the engine's
//! outputs: [`download::DownloadResult`] records, progress events and the
//! on-disk file layout.

pub mod catalog;
pub mod download;
pub mod error;
pub mod file;
pub mod package;
pub mod state;

pub use catalog::{Catalog, ChapterEntry};
pub use download::{
    DownloadEngine, DownloadMode, DownloadRequest, DownloadResult, EngineConfig, ProgressEvent,
    ProgressObserver,
};
pub use error::{EngineError, Result};
pub use file::AddressBuilder;
pub use state::{ResumeState, ResumeStateStore};
