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


//! Download orchestration: fetch worker, progress reporting and the
//! chapter orchestrator

pub mod fetch;
pub mod orchestrator;
pub mod progress;

pub use fetch::{FetchStatus, HttpTransport, Transport};
pub use orchestrator::{
    ChapterProgress, DownloadEngine, DownloadMode, DownloadRequest, DownloadResult, EngineConfig,
};
pub use progress::{ProgressEvent, ProgressObserver};
