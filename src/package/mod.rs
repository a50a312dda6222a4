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


//! Legacy chapter packaging
//!
//! Zips a completed chapter directory (every `.mp3`, relative paths
//! preserved) together with a `metadata.json` manifest of the fetched
//! files, then deletes the working directory. Archive creation failure is
//! fatal to the invocation; failure to delete the source directory is
//! logged and ignored.

use crate::error::{EngineError, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One manifest record per successfully fetched file
#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub surah_id: u32,
    pub ayah_id: u32,
    /// Absent for verse-level files
    pub word_id: Option<u32>,
    pub audio_file: String,
}

/// Zip the chapter directory into `surah_{ccc}.zip` beside it, add the
/// manifest, then delete the directory.
pub async fn package_chapter(
    chapter_dir: &Path,
    chapter_id: u32,
    manifest: &[ManifestEntry],
) -> Result<PathBuf> {
    let parent = chapter_dir.parent().unwrap_or_else(|| Path::new("."));
    let zip_path = parent.join(format!("surah_{chapter_id:03}.zip"));

    let manifest_json = serde_json::to_string_pretty(manifest)?;
    let dir = chapter_dir.to_path_buf();
    let archive = zip_path.clone();

    // The zip crate is synchronous; keep it off the async workers.
    tokio::task::spawn_blocking(move || write_archive(&dir, &archive, &manifest_json))
        .await
        .map_err(|e| EngineError::Packaging {
            dir: chapter_dir.to_path_buf(),
            message: format!("packaging task panicked: {e}"),
        })??;

    info!(archive = %zip_path.display(), "created chapter archive");

    if let Err(e) = tokio::fs::remove_dir_all(chapter_dir).await {
        warn!(dir = %chapter_dir.display(), error = %e, "failed to delete chapter directory after packaging");
    }

    Ok(zip_path)
}

fn write_archive(chapter_dir: &Path, zip_path: &Path, manifest_json: &str) -> Result<()> {
    let fail = |message: String| EngineError::Packaging {
        dir: chapter_dir.to_path_buf(),
        message,
    };

    let file = std::fs::File::create(zip_path).map_err(|e| fail(e.to_string()))?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries: Vec<PathBuf> = std::fs::read_dir(chapter_dir)
        .map_err(|e| fail(e.to_string()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "mp3"))
        .collect();
    entries.sort();

    for path in entries {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| fail(format!("unnameable entry {}", path.display())))?;
        let bytes = std::fs::read(&path).map_err(|e| fail(e.to_string()))?;
        zip.start_file(name, options)
            .map_err(|e| fail(e.to_string()))?;
        zip.write_all(&bytes).map_err(|e| fail(e.to_string()))?;
    }

    zip.start_file("metadata.json", options)
        .map_err(|e| fail(e.to_string()))?;
    zip.write_all(manifest_json.as_bytes())
        .map_err(|e| fail(e.to_string()))?;

    zip.finish().map_err(|e| fail(e.to_string()))?;
    Ok(())
}
