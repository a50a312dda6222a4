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


//! Chapter download orchestration
//!
//! Drives one chapter download end to end: request validation against the
//! catalog, range planning (explicit ranges, resumed position, else the
//! full chapter), the per-verse/per-word loops with resume skipping and the
//! consecutive-not-found short circuit, bounded-concurrency fetching, and
//! result aggregation.
//!
//! Fetches are pipelined up to the concurrency cap but their completions
//! are applied strictly in submission order, so the resume record can never
//! claim a later word while an earlier one in the same verse is still
//! unaccounted for.
//!
//! Individual file failures never abort the run: the orchestrator always
//! returns a [`DownloadResult`] and callers inspect its `failed` count to
//! detect partial success. Two invocations for the same chapter race on the
//! same resume record and destination files; serializing those is the
//! caller's responsibility.

use crate::catalog::{Catalog, ChapterEntry};
use crate::download::fetch::{
    fetch_with_retry, HttpTransport, Transport, FETCH_TIMEOUT, MAX_FETCH_ATTEMPTS, RETRY_BACKOFF,
};
use crate::download::progress::{emit, format_bytes, ProgressEvent, ProgressObserver};
use crate::error::{EngineError, Result};
use crate::file::paths::{AddressBuilder, DEFAULT_BASE_URL};
use crate::package::{package_chapter, ManifestEntry};
use crate::state::{file_is_complete, ResumeStateStore};
use futures_util::{stream, StreamExt};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use url::Url;

/// Cap on concurrently in-flight requests
pub const CONCURRENT_DOWNLOADS: usize = 5;

/// Consecutive 404s within one verse before the rest of the verse is
/// abandoned. Five straight misses means the verse's word audio does not
/// extend further.
pub const MAX_CONSECUTIVE_NOT_FOUND: u32 = 5;

/// Engine configuration. Defaults mirror the named constants.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root directory for downloaded audio and resume records
    pub download_root: PathBuf,

    /// Remote host serving the audio files
    pub base_url: Url,

    /// Maximum concurrently in-flight fetches
    pub concurrent_downloads: usize,

    /// Attempts per file for transient errors
    pub max_fetch_attempts: u32,

    /// Fixed delay between retry attempts
    pub retry_backoff: Duration,

    /// Hard timeout for one GET
    pub fetch_timeout: Duration,

    /// Consecutive-404 threshold for the verse short circuit
    pub max_consecutive_not_found: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            download_root: PathBuf::from("downloads"),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            concurrent_downloads: CONCURRENT_DOWNLOADS,
            max_fetch_attempts: MAX_FETCH_ATTEMPTS,
            retry_backoff: RETRY_BACKOFF,
            fetch_timeout: FETCH_TIMEOUT,
            max_consecutive_not_found: MAX_CONSECUTIVE_NOT_FOUND,
        }
    }
}

/// Download granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadMode {
    /// One file per word
    WordByWord,
    /// One file per verse, addressed as word 1 of the verse
    VerseByVerse,
}

/// One chapter download invocation
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub chapter_id: u32,
    pub mode: DownloadMode,

    /// Inclusive verse range; unset means the full chapter (or the resumed
    /// position when `resume` is set)
    pub verse_range: Option<(u32, u32)>,

    /// Inclusive word range, applied only to the boundary verses of the
    /// effective range. Word-by-word mode only.
    pub word_range: Option<(u32, u32)>,

    /// Skip files that already exist with content, and start from the
    /// persisted position when no explicit range is given
    pub resume: bool,

    /// Zip the chapter directory after a full-chapter run and delete the
    /// working directory (legacy behavior)
    pub package: bool,
}

impl DownloadRequest {
    /// Full-chapter word-by-word download with resume enabled
    pub fn word_by_word(chapter_id: u32) -> Self {
        Self {
            chapter_id,
            mode: DownloadMode::WordByWord,
            verse_range: None,
            word_range: None,
            resume: true,
            package: false,
        }
    }

    /// Full-chapter verse-by-verse download with resume enabled
    pub fn verse_by_verse(chapter_id: u32) -> Self {
        Self {
            chapter_id,
            mode: DownloadMode::VerseByVerse,
            verse_range: None,
            word_range: None,
            resume: true,
            package: false,
        }
    }
}

/// Aggregate outcome of one orchestration run.
///
/// Top-level success means the orchestration ran to completion, not that
/// every file was retrieved.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub chapter_id: u32,
    pub chapter_name: String,
    pub mode: DownloadMode,
    pub start_verse: u32,
    pub end_verse: u32,
    pub start_word: Option<u32>,
    pub end_word: Option<u32>,
    pub total_files_expected: u64,
    pub successful: u64,
    pub failed: u64,
    pub total_bytes: u64,
    pub duration_seconds: f64,

    /// Archive path when legacy packaging ran
    pub archive_path: Option<PathBuf>,
}

/// On-disk progress snapshot for a chapter
#[derive(Debug, Clone, Serialize)]
pub struct ChapterProgress {
    pub downloaded_files: u64,
    pub total_expected: u64,
    pub percent: f64,
}

/// Effective per-verse word range after planning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VersePlan {
    verse_id: u32,
    start_word: u32,
    end_word: u32,
}

/// Resolved download plan: effective ranges plus the expected file total
#[derive(Debug, Clone)]
struct Plan {
    start_verse: u32,
    end_verse: u32,
    start_word: Option<u32>,
    end_word: Option<u32>,
    verses: Vec<VersePlan>,
    total_files: u64,
}

/// Outcome of one word/verse job, applied in submission order
enum JobOutcome {
    /// File already on disk with content; no network issued
    Skipped(u64),
    /// Fetched and written
    Fetched(u64),
    Failed,
}

/// Chapter download orchestrator
pub struct DownloadEngine {
    catalog: Catalog,
    config: EngineConfig,
    transport: Arc<dyn Transport>,
    paths: AddressBuilder,
    state: ResumeStateStore,
    observer: Option<ProgressObserver>,
}

impl DownloadEngine {
    /// Engine with the HTTP transport
    pub fn new(catalog: Catalog, config: EngineConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(
            config.fetch_timeout,
            config.concurrent_downloads,
        )?);
        Self::with_transport(catalog, config, transport)
    }

    /// Engine over an arbitrary transport (tests substitute a scripted one).
    /// Fails when the configured base URL cannot hold path segments.
    pub fn with_transport(
        catalog: Catalog,
        config: EngineConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let paths =
            AddressBuilder::with_base_url(config.base_url.clone(), config.download_root.clone())?;
        let state = ResumeStateStore::new(config.download_root.clone());
        Ok(Self {
            catalog,
            config,
            transport,
            paths,
            state,
            observer: None,
        })
    }

    /// Register the progress observer for subsequent downloads
    pub fn set_observer(&mut self, observer: ProgressObserver) {
        self.observer = Some(observer);
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run one chapter download to completion.
    ///
    /// Long-running: callers needing responsiveness run this in a
    /// background task and watch progress events.
    pub async fn download_chapter(&self, request: &DownloadRequest) -> Result<DownloadResult> {
        // Init: validate before any I/O
        let chapter = self
            .catalog
            .chapter(request.chapter_id)
            .ok_or(EngineError::ChapterNotFound(request.chapter_id))?;
        validate_request(chapter, request)?;

        info!(
            chapter_id = chapter.chapter_id,
            chapter = %chapter.name_en,
            mode = ?request.mode,
            "starting chapter download"
        );

        // Planning
        let resume_state = if request.resume {
            self.state.load(chapter.chapter_id).await
        } else {
            crate::state::ResumeState::fresh(chapter.chapter_id)
        };
        let plan = build_plan(chapter, request, &resume_state)?;

        let started = Instant::now();
        let mut successful = 0u64;
        let mut failed = 0u64;
        let mut total_bytes = 0u64;
        let mut processed = 0u64;
        let mut manifest: Vec<ManifestEntry> = Vec::new();

        // The short circuit only abandons the current verse; the loop
        // always proceeds to the next one.
        for verse in &plan.verses {
            self.run_verse(
                chapter,
                request,
                verse,
                plan.total_files,
                &mut successful,
                &mut failed,
                &mut total_bytes,
                &mut processed,
                &mut manifest,
            )
            .await?;
        }

        // Finalizing
        if successful > 0 {
            self.state.clear(chapter.chapter_id).await;
        }

        let archive_path = if request.package {
            self.package_if_full_chapter(chapter, &plan, &manifest).await?
        } else {
            None
        };

        let duration_seconds = started.elapsed().as_secs_f64();
        info!(
            chapter_id = chapter.chapter_id,
            successful,
            failed,
            bytes = %format_bytes(total_bytes),
            "chapter download finished"
        );

        Ok(DownloadResult {
            chapter_id: chapter.chapter_id,
            chapter_name: chapter.name_en.clone(),
            mode: request.mode,
            start_verse: plan.start_verse,
            end_verse: plan.end_verse,
            start_word: plan.start_word,
            end_word: plan.end_word,
            total_files_expected: plan.total_files,
            successful,
            failed,
            total_bytes,
            duration_seconds,
            archive_path,
        })
    }

    /// Process one verse: issue its word jobs with bounded concurrency and
    /// apply completions in submission order. The consecutive-not-found
    /// short circuit abandons the remainder of the verse.
    #[allow(clippy::too_many_arguments)]
    async fn run_verse(
        &self,
        chapter: &ChapterEntry,
        request: &DownloadRequest,
        verse: &VersePlan,
        total_files: u64,
        successful: &mut u64,
        failed: &mut u64,
        total_bytes: &mut u64,
        processed: &mut u64,
        manifest: &mut Vec<ManifestEntry>,
    ) -> Result<()> {
        info!(
            verse_id = verse.verse_id,
            start_word = verse.start_word,
            end_word = verse.end_word,
            "processing verse"
        );

        // Word ids for word mode; a single word-1 job stands in for the
        // whole verse in verse mode.
        let words: Vec<Option<u32>> = match request.mode {
            DownloadMode::WordByWord => {
                (verse.start_word..=verse.end_word).map(Some).collect()
            }
            DownloadMode::VerseByVerse => vec![None],
        };

        let mut jobs = Vec::with_capacity(words.len());
        for word_id in words {
            let dest = self
                .paths
                .local_path(chapter.chapter_id, &chapter.name_en, verse.verse_id, word_id)
                .await?;
            jobs.push((word_id, dest));
        }

        let verse_id = verse.verse_id;
        let mut results = stream::iter(jobs.into_iter().map(|(word_id, dest)| {
            let transport = Arc::clone(&self.transport);
            // Verse audio is addressed as word 1 of the remote scheme
            let url = self.paths.remote_url(
                chapter.folder_id,
                chapter.chapter_id,
                verse_id,
                word_id.unwrap_or(1),
            );
            let resume = request.resume;
            let attempts = self.config.max_fetch_attempts;
            let backoff = self.config.retry_backoff;
            async move {
                if resume {
                    if let Some(size) = file_is_complete(&dest).await {
                        return (word_id, dest, JobOutcome::Skipped(size));
                    }
                }
                let (ok, bytes) =
                    fetch_with_retry(&*transport, &url, &dest, attempts, backoff).await;
                let outcome = if ok {
                    JobOutcome::Fetched(bytes)
                } else {
                    JobOutcome::Failed
                };
                (word_id, dest, outcome)
            }
        }))
        .buffered(self.config.concurrent_downloads);

        let mut consecutive_not_found = 0u32;
        while let Some((word_id, dest, outcome)) = results.next().await {
            let label = AddressBuilder::file_name(chapter.chapter_id, verse_id, word_id);
            *processed += 1;

            match outcome {
                JobOutcome::Skipped(size) => {
                    info!(file = %label, "file already exists, skipping");
                    *successful += 1;
                    *total_bytes += size;
                    consecutive_not_found = 0;
                    self.emit_progress(
                        *processed,
                        total_files,
                        format!("Already exists: {label}"),
                        chapter.chapter_id,
                        verse_id,
                        word_id,
                    );
                }
                JobOutcome::Fetched(bytes) => {
                    info!(file = %label, bytes, "downloaded");
                    *successful += 1;
                    *total_bytes += bytes;
                    consecutive_not_found = 0;
                    // Persisted only after a successful write, in order
                    self.state
                        .save(chapter.chapter_id, verse_id, word_id)
                        .await;
                    manifest.push(ManifestEntry {
                        surah_id: chapter.chapter_id,
                        ayah_id: verse_id,
                        word_id,
                        audio_file: dest
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or(label.clone()),
                    });
                    self.emit_progress(
                        *processed,
                        total_files,
                        format!("Downloaded: {label}"),
                        chapter.chapter_id,
                        verse_id,
                        word_id,
                    );
                }
                JobOutcome::Failed => {
                    warn!(file = %label, "failed to download");
                    *failed += 1;
                    consecutive_not_found += 1;
                    self.emit_progress(
                        *processed,
                        total_files,
                        format!("Failed: {label}"),
                        chapter.chapter_id,
                        verse_id,
                        word_id,
                    );

                    if request.mode == DownloadMode::WordByWord
                        && consecutive_not_found >= self.config.max_consecutive_not_found
                    {
                        info!(
                            verse_id,
                            consecutive_not_found,
                            "too many consecutive misses, moving to next verse"
                        );
                        // Dropping the stream abandons in-flight fetches for
                        // this verse; they are re-attempted on a later run.
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }

    fn emit_progress(
        &self,
        completed: u64,
        total: u64,
        message: String,
        chapter_id: u32,
        verse_id: u32,
        word_id: Option<u32>,
    ) {
        emit(
            self.observer.as_ref(),
            ProgressEvent::new(
                completed,
                total,
                message,
                Some(chapter_id),
                Some(verse_id),
                word_id,
            ),
        );
    }

    /// Legacy packaging applies only to a full-chapter run
    async fn package_if_full_chapter(
        &self,
        chapter: &ChapterEntry,
        plan: &Plan,
        manifest: &[ManifestEntry],
    ) -> Result<Option<PathBuf>> {
        let full_chapter = plan.start_verse == 1
            && plan.end_verse == chapter.verse_count
            && plan.start_word.is_none()
            && plan.end_word.is_none();
        if !full_chapter {
            warn!(
                chapter_id = chapter.chapter_id,
                "packaging requested for a partial range, skipping"
            );
            return Ok(None);
        }

        let chapter_dir = self.paths.chapter_dir(chapter.chapter_id, &chapter.name_en);
        let archive = package_chapter(&chapter_dir, chapter.chapter_id, manifest).await?;
        Ok(Some(archive))
    }

    /// On-disk progress for a chapter: downloaded `.mp3` files vs the
    /// catalog's expected word total.
    pub async fn chapter_progress(&self, chapter_id: u32) -> Result<ChapterProgress> {
        let chapter = self
            .catalog
            .chapter(chapter_id)
            .ok_or(EngineError::ChapterNotFound(chapter_id))?;

        let dir = self.paths.chapter_dir(chapter_id, &chapter.name_en);
        let mut downloaded = 0u64;
        if let Ok(mut entries) = tokio::fs::read_dir(&dir).await {
            while let Ok(Some(entry)) = entries.next_entry().await {
                if entry.path().extension().is_some_and(|ext| ext == "mp3") {
                    downloaded += 1;
                }
            }
        }

        let total = chapter.word_count as u64;
        Ok(ChapterProgress {
            downloaded_files: downloaded,
            total_expected: total,
            percent: crate::download::progress::percent_complete(downloaded, total),
        })
    }
}

/// Fail fast on ranges the catalog cannot satisfy
fn validate_request(chapter: &ChapterEntry, request: &DownloadRequest) -> Result<()> {
    if let Some((start, end)) = request.verse_range {
        if start < 1 || start > end {
            return Err(EngineError::invalid_range(format!(
                "verse range {start}..={end} is inverted or zero-based"
            )));
        }
        if end > chapter.verse_count {
            return Err(EngineError::invalid_range(format!(
                "verse range {start}..={end} exceeds chapter {} verse count {}",
                chapter.chapter_id, chapter.verse_count
            )));
        }
    }

    if let Some((start, end)) = request.word_range {
        if request.mode == DownloadMode::VerseByVerse {
            return Err(EngineError::invalid_range(
                "word range is not applicable in verse-by-verse mode",
            ));
        }
        if start < 1 || start > end {
            return Err(EngineError::invalid_range(format!(
                "word range {start}..={end} is inverted or zero-based"
            )));
        }
    }

    Ok(())
}

/// Resolve the effective verse/word ranges and the expected file count.
///
/// Explicit ranges always win; the resume position only fills in when the
/// caller left the range unset. Word bounds apply to the boundary verses of
/// the range; interior verses span their full word count.
fn build_plan(
    chapter: &ChapterEntry,
    request: &DownloadRequest,
    resume_state: &crate::state::ResumeState,
) -> Result<Plan> {
    let resumed_verse = if resume_state.last_verse > 0 {
        Some(resume_state.last_verse)
    } else {
        None
    };

    let (start_verse, end_verse) = match request.verse_range {
        Some((start, end)) => (start, end),
        None => (
            resumed_verse.unwrap_or(1).min(chapter.verse_count),
            chapter.verse_count,
        ),
    };

    let (start_word, end_word) = match request.mode {
        DownloadMode::WordByWord => {
            let (explicit_start, explicit_end) = request
                .word_range
                .map_or((None, None), |(s, e)| (Some(s), Some(e)));
            // The persisted word position only applies when resuming into
            // an implicit range.
            let resumed_word = if request.verse_range.is_none() && request.word_range.is_none() {
                resume_state.last_word
            } else {
                None
            };
            (explicit_start.or(resumed_word), explicit_end)
        }
        DownloadMode::VerseByVerse => (None, None),
    };

    let mut verses = Vec::with_capacity((end_verse - start_verse + 1) as usize);
    let mut total_files = 0u64;

    for verse_id in start_verse..=end_verse {
        let words_in_verse = chapter.words_in_verse(verse_id).ok_or_else(|| {
            EngineError::invalid_range(format!(
                "verse {verse_id} missing from chapter {} word table",
                chapter.chapter_id
            ))
        })?;

        let (verse_start, verse_end) = match request.mode {
            DownloadMode::VerseByVerse => (1, 1),
            DownloadMode::WordByWord => {
                let verse_start = if verse_id == start_verse {
                    start_word.unwrap_or(1)
                } else {
                    1
                };
                let verse_end = if verse_id == end_verse {
                    end_word.unwrap_or(words_in_verse).min(words_in_verse)
                } else {
                    words_in_verse
                };
                (verse_start, verse_end)
            }
        };

        if verse_start > verse_end {
            // A resumed/explicit start past the verse's end yields nothing
            continue;
        }

        total_files += (verse_end - verse_start + 1) as u64;
        verses.push(VersePlan {
            verse_id,
            start_word: verse_start,
            end_word: verse_end,
        });
    }

    Ok(Plan {
        start_verse,
        end_verse,
        start_word,
        end_word,
        verses,
        total_files,
    })
}
