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


//! Static chapter reference data
//!
//! The catalog enumerates every chapter with its verse count, word count,
//! per-verse word table and the remote folder identifier used for URL
//! construction. It is loaded once at engine construction and never
//! mutated.
//!
//! A missing or malformed catalog file degrades to an empty catalog: the
//! engine stays constructible and every subsequent range validation fails
//! with a chapter-not-found error instead of a load-time panic.

use crate::error::{EngineError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::warn;

/// One verse with its exact word count
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VerseEntry {
    pub verse_id: u32,
    pub word_count: u32,
}

/// Reference entry for a single chapter
#[derive(Debug, Clone)]
pub struct ChapterEntry {
    /// Chapter ordinal, 1-based
    pub chapter_id: u32,

    /// English display name, used for the on-disk folder name
    pub name_en: String,

    /// Arabic display name
    pub name_ar: String,

    /// Number of verses in the chapter
    pub verse_count: u32,

    /// Total number of words across all verses
    pub word_count: u32,

    /// Remote folder identifier. Usually equal to the chapter id but the
    /// host may group some chapters differently.
    pub folder_id: u32,

    /// Per-verse word counts, ascending by verse id
    pub verses: Vec<VerseEntry>,
}

impl ChapterEntry {
    /// Exact word count for a verse, if the verse exists
    pub fn words_in_verse(&self, verse_id: u32) -> Option<u32> {
        self.verses
            .iter()
            .find(|v| v.verse_id == verse_id)
            .map(|v| v.word_count)
    }
}

/// Raw on-disk chapter record.
///
/// Accepts both the exact `verses` table and the older aggregate
/// `ayah_range`/`word_range` shape. The aggregate shape only yields an
/// approximate per-verse table and is kept as a compatibility fallback.
#[derive(Debug, Deserialize)]
struct RawChapter {
    surah_id: u32,
    name_en: String,
    name_ar: String,
    ayah_range: [u32; 2],
    word_range: [u32; 2],
    #[serde(default)]
    folder_id: Option<u32>,
    #[serde(default)]
    verses: Vec<VerseEntry>,
}

impl RawChapter {
    fn into_entry(self) -> Result<ChapterEntry> {
        let verse_count = range_span(self.ayah_range).ok_or_else(|| {
            EngineError::Catalog(format!(
                "chapter {}: ayah_range {:?} is inverted",
                self.surah_id, self.ayah_range
            ))
        })?;
        let word_count = range_span(self.word_range).ok_or_else(|| {
            EngineError::Catalog(format!(
                "chapter {}: word_range {:?} is inverted",
                self.surah_id, self.word_range
            ))
        })?;

        let verses = if self.verses.is_empty() {
            warn!(
                chapter_id = self.surah_id,
                "catalog entry has no per-verse word table, deriving an approximate one"
            );
            approximate_verse_table(self.ayah_range, verse_count, word_count)
        } else {
            self.verses
        };

        Ok(ChapterEntry {
            chapter_id: self.surah_id,
            name_en: self.name_en,
            name_ar: self.name_ar,
            verse_count,
            word_count,
            folder_id: self.folder_id.unwrap_or(self.surah_id),
            verses,
        })
    }
}

/// Inclusive span of `[lo, hi]`; `None` when the range is inverted
fn range_span([lo, hi]: [u32; 2]) -> Option<u32> {
    hi.checked_sub(lo)?.checked_add(1)
}

/// Distribute the aggregate word count evenly across verses, assigning the
/// remainder to the last verse. Deprecated path; exact tables always win.
/// `verse_count` is the already-validated span of `ayah_range`, at least 1.
fn approximate_verse_table(
    ayah_range: [u32; 2],
    verse_count: u32,
    total_words: u32,
) -> Vec<VerseEntry> {
    let per_verse = (total_words / verse_count).max(1);

    (ayah_range[0]..=ayah_range[1])
        .map(|verse_id| {
            let word_count = if verse_id == ayah_range[1] {
                total_words.saturating_sub(per_verse * (verse_count - 1)).max(1)
            } else {
                per_verse
            };
            VerseEntry { verse_id, word_count }
        })
        .collect()
}

/// Immutable chapter catalog, loaded once per process
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    chapters: Vec<ChapterEntry>,
}

impl Catalog {
    /// Catalog with no chapters. Every lookup fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a catalog from JSON text. Entries with inverted
    /// `ayah_range`/`word_range` bounds are rejected as malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Vec<RawChapter> =
            serde_json::from_str(json).map_err(|e| EngineError::Catalog(e.to_string()))?;
        let chapters = raw
            .into_iter()
            .map(RawChapter::into_entry)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { chapters })
    }

    /// Load the catalog from a reference data file.
    ///
    /// Absence or malformed content yields an empty catalog rather than an
    /// error; the condition is logged and later range validations fail with
    /// chapter-not-found.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(json) => match Self::from_json(&json) {
                Ok(catalog) => catalog,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "catalog file is malformed, using empty catalog");
                    Self::empty()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "catalog file missing, using empty catalog");
                Self::empty()
            }
        }
    }

    /// Look up a chapter by id
    pub fn chapter(&self, chapter_id: u32) -> Option<&ChapterEntry> {
        self.chapters.iter().find(|c| c.chapter_id == chapter_id)
    }

    /// All chapters, catalog order
    pub fn chapters(&self) -> &[ChapterEntry] {
        &self.chapters
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chapters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {
            "surah_id": 1,
            "name_en": "Al-Fatihah",
            "name_ar": "الفاتحة",
            "ayah_range": [1, 2],
            "word_range": [1, 5],
            "verses": [
                {"verse_id": 1, "word_count": 3},
                {"verse_id": 2, "word_count": 2}
            ]
        },
        {
            "surah_id": 108,
            "name_en": "Al-Kawthar",
            "name_ar": "الكوثر",
            "ayah_range": [1, 3],
            "word_range": [1, 10]
        }
    ]"#;

    #[test]
    fn parses_exact_verse_table() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        let chapter = catalog.chapter(1).unwrap();

        assert_eq!(chapter.verse_count, 2);
        assert_eq!(chapter.word_count, 5);
        assert_eq!(chapter.folder_id, 1);
        assert_eq!(chapter.words_in_verse(1), Some(3));
        assert_eq!(chapter.words_in_verse(2), Some(2));
        assert_eq!(chapter.words_in_verse(3), None);
    }

    #[test]
    fn derives_approximate_table_when_missing() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        let chapter = catalog.chapter(108).unwrap();

        // 10 words over 3 verses: 3 + 3 + remainder 4
        assert_eq!(chapter.verses.len(), 3);
        assert_eq!(chapter.words_in_verse(1), Some(3));
        assert_eq!(chapter.words_in_verse(2), Some(3));
        assert_eq!(chapter.words_in_verse(3), Some(4));
        assert_eq!(
            chapter.verses.iter().map(|v| v.word_count).sum::<u32>(),
            chapter.word_count
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(Catalog::from_json("{not json").is_err());
    }

    #[test]
    fn inverted_ranges_are_rejected() {
        let inverted_ayah = r#"[{
            "surah_id": 1,
            "name_en": "Bad",
            "name_ar": "x",
            "ayah_range": [3, 1],
            "word_range": [1, 5]
        }]"#;
        assert!(matches!(
            Catalog::from_json(inverted_ayah),
            Err(EngineError::Catalog(_))
        ));

        let inverted_word = r#"[{
            "surah_id": 1,
            "name_en": "Bad",
            "name_ar": "x",
            "ayah_range": [1, 3],
            "word_range": [5, 1]
        }]"#;
        assert!(matches!(
            Catalog::from_json(inverted_word),
            Err(EngineError::Catalog(_))
        ));
    }

    #[tokio::test]
    async fn inverted_range_file_degrades_to_empty_catalog() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("quran_data.json");
        tokio::fs::write(
            &path,
            r#"[{
                "surah_id": 1,
                "name_en": "Bad",
                "name_ar": "x",
                "ayah_range": [3, 1],
                "word_range": [1, 5]
            }]"#,
        )
        .await
        .unwrap();

        let catalog = Catalog::load(&path).await;
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn missing_file_yields_empty_catalog() {
        let catalog = Catalog::load("/definitely/not/here.json").await;
        assert!(catalog.is_empty());
        assert!(catalog.chapter(1).is_none());
    }
}
