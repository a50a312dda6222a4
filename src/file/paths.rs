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


//! Address builder: deterministic URL and path construction
//!
//! All addressing is derived from (chapter, verse, word) identifiers and the
//! catalog's remote folder id — nothing is discovered dynamically.
//!
//! Remote scheme: `{base}/{folder_id}/{ccc}_{vvv}_{www}.mp3` with zero-padded
//! 3-digit ids. Verse-level audio is addressed as word 1 of the verse.
//!
//! Local layout: `{root}/{ccc}_{sanitized chapter name}/{ccc}_{vvv}_{www}.mp3`,
//! or `..._verse.mp3` for word-less verse files.

use crate::error::{EngineError, Result};
use std::path::{Path, PathBuf};
use url::Url;

/// Default remote host for word audio
pub const DEFAULT_BASE_URL: &str = "https://audios.quranwbw.com/words";

/// Builds remote URLs and local paths for audio files
#[derive(Debug, Clone)]
pub struct AddressBuilder {
    base_url: Url,
    download_root: PathBuf,
}

impl AddressBuilder {
    /// Create a builder over a download root with the default remote host
    pub fn new(download_root: impl Into<PathBuf>) -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            download_root: download_root.into(),
        }
    }

    /// Create a builder with a custom remote base URL.
    ///
    /// Rejects cannot-be-a-base URLs (`mailto:`, `data:`, ...) here so that
    /// URL construction later is infallible.
    pub fn with_base_url(base_url: Url, download_root: impl Into<PathBuf>) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(EngineError::Config(format!(
                "base URL {base_url} cannot hold path segments"
            )));
        }
        Ok(Self {
            base_url,
            download_root: download_root.into(),
        })
    }

    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    /// Fully qualified remote URL for one word audio file.
    ///
    /// Pure and deterministic: the same inputs always yield the same URL.
    pub fn remote_url(&self, folder_id: u32, chapter_id: u32, verse_id: u32, word_id: u32) -> Url {
        let mut url = self.base_url.clone();
        {
            // Hierarchical base URL is guaranteed at construction
            let mut segments = url
                .path_segments_mut()
                .expect("base URL validated at construction");
            segments.push(&folder_id.to_string());
            segments.push(&format!(
                "{chapter_id:03}_{verse_id:03}_{word_id:03}.mp3"
            ));
        }
        url
    }

    /// Folder name for a chapter: `"{ccc}_{sanitized name}"`
    pub fn chapter_dir_name(chapter_id: u32, chapter_name: &str) -> String {
        format!("{chapter_id:03}_{}", sanitize_chapter_name(chapter_name))
    }

    /// Directory holding a chapter's audio files (not created here)
    pub fn chapter_dir(&self, chapter_id: u32, chapter_name: &str) -> PathBuf {
        self.download_root
            .join(Self::chapter_dir_name(chapter_id, chapter_name))
    }

    /// Bare filename for one audio file
    pub fn file_name(chapter_id: u32, verse_id: u32, word_id: Option<u32>) -> String {
        match word_id {
            Some(word_id) => format!("{chapter_id:03}_{verse_id:03}_{word_id:03}.mp3"),
            None => format!("{chapter_id:03}_{verse_id:03}_verse.mp3"),
        }
    }

    /// Local destination path for one audio file, creating the chapter
    /// directory if absent. Idempotent.
    pub async fn local_path(
        &self,
        chapter_id: u32,
        chapter_name: &str,
        verse_id: u32,
        word_id: Option<u32>,
    ) -> Result<PathBuf> {
        let dir = self.chapter_dir(chapter_id, chapter_name);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir.join(Self::file_name(chapter_id, verse_id, word_id)))
    }
}

/// Sanitize a chapter display name for use as a directory component:
/// spaces and hyphens become underscores, apostrophes are dropped.
fn sanitize_chapter_name(name: &str) -> String {
    name.chars()
        .filter_map(|c| match c {
            ' ' | '-' => Some('_'),
            '\'' | '\u{2019}' => None,
            c => Some(c),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_url_is_deterministic_and_padded() {
        let builder = AddressBuilder::new("/tmp/downloads");
        let url = builder.remote_url(2, 2, 34, 5);
        assert_eq!(
            url.as_str(),
            "https://audios.quranwbw.com/words/2/002_034_005.mp3"
        );
        assert_eq!(url, builder.remote_url(2, 2, 34, 5));
    }

    #[test]
    fn non_hierarchical_base_url_is_rejected() {
        let url = Url::parse("mailto:audio@example.com").unwrap();
        assert!(matches!(
            AddressBuilder::with_base_url(url, "/tmp/downloads"),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn custom_base_url_is_used_for_remote_addresses() {
        let base = Url::parse("https://mirror.example/audio").unwrap();
        let builder = AddressBuilder::with_base_url(base, "/tmp/downloads").unwrap();
        assert_eq!(
            builder.remote_url(1, 1, 1, 1).as_str(),
            "https://mirror.example/audio/1/001_001_001.mp3"
        );
    }

    #[test]
    fn folder_id_is_independent_of_chapter_id() {
        let builder = AddressBuilder::new("/tmp/downloads");
        let url = builder.remote_url(9, 114, 1, 1);
        assert_eq!(
            url.as_str(),
            "https://audios.quranwbw.com/words/9/114_001_001.mp3"
        );
    }

    #[test]
    fn sanitizes_chapter_names() {
        assert_eq!(
            AddressBuilder::chapter_dir_name(103, "Al-'Asr"),
            "103_Al_Asr"
        );
        assert_eq!(
            AddressBuilder::chapter_dir_name(1, "Al Fatihah"),
            "001_Al_Fatihah"
        );
    }

    #[test]
    fn file_names_for_both_modes() {
        assert_eq!(AddressBuilder::file_name(1, 2, Some(3)), "001_002_003.mp3");
        assert_eq!(AddressBuilder::file_name(1, 2, None), "001_002_verse.mp3");
    }

    #[tokio::test]
    async fn local_path_creates_chapter_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let builder = AddressBuilder::new(tmp.path());

        let path = builder.local_path(1, "Al-Fatihah", 1, Some(1)).await.unwrap();
        assert!(path.parent().unwrap().is_dir());
        assert!(path.ends_with("001_Al_Fatihah/001_001_001.mp3"));

        // Second call is a no-op on the directory
        let again = builder.local_path(1, "Al-Fatihah", 1, Some(2)).await.unwrap();
        assert_eq!(again.parent(), path.parent());
    }
}
