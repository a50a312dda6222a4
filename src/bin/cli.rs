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


use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use quran_audio_engine::download::progress::{format_bytes, format_duration};
use quran_audio_engine::{
    Catalog, DownloadEngine, DownloadMode, DownloadRequest, EngineConfig, ProgressObserver,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "quran-audio-cli")]
#[command(about = "Download per-word and per-verse Quran recitation audio", long_about = None)]
struct Cli {
    /// Chapter reference data file
    #[arg(long, default_value = "quran_data.json", global = true)]
    catalog: PathBuf,

    /// Download root directory
    #[arg(long, default_value = "downloads", global = true)]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Word,
    Verse,
}

impl From<ModeArg> for DownloadMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Word => DownloadMode::WordByWord,
            ModeArg::Verse => DownloadMode::VerseByVerse,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List the chapters in the catalog
    Chapters,
    /// Download one chapter
    Download {
        /// Chapter id (1-based)
        chapter: u32,

        /// Download granularity
        #[arg(long, value_enum, default_value = "word")]
        mode: ModeArg,

        /// First verse of the range (inclusive)
        #[arg(long)]
        start_verse: Option<u32>,

        /// Last verse of the range (inclusive)
        #[arg(long)]
        end_verse: Option<u32>,

        /// First word of the starting verse (word mode)
        #[arg(long)]
        start_word: Option<u32>,

        /// Last word of the ending verse (word mode)
        #[arg(long)]
        end_word: Option<u32>,

        /// Ignore existing files and resume state
        #[arg(long)]
        no_resume: bool,

        /// Zip the chapter directory afterwards and delete it (legacy)
        #[arg(long)]
        package: bool,
    },
    /// Show on-disk progress for a chapter
    Progress {
        /// Chapter id (1-based)
        chapter: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let catalog = Catalog::load(&cli.catalog).await;
    if catalog.is_empty() {
        eprintln!(
            "warning: no chapters loaded from {} (downloads will fail validation)",
            cli.catalog.display()
        );
    }

    let config = EngineConfig {
        download_root: cli.dir.clone(),
        ..EngineConfig::default()
    };

    match cli.command {
        Commands::Chapters => {
            for chapter in catalog.chapters() {
                println!(
                    "{:3}  {:<24} {:<16} {:4} verses  {:5} words",
                    chapter.chapter_id,
                    chapter.name_en,
                    chapter.name_ar,
                    chapter.verse_count,
                    chapter.word_count
                );
            }
        }
        Commands::Download {
            chapter,
            mode,
            start_verse,
            end_verse,
            start_word,
            end_word,
            no_resume,
            package,
        } => {
            let mut engine = DownloadEngine::new(catalog, config)?;

            let observer: ProgressObserver = Arc::new(|event| {
                println!(
                    "[{:5.1}%] {:>4}/{:<4} {}",
                    event.percent, event.completed, event.total, event.message
                );
            });
            engine.set_observer(observer);

            // A half-open flag pair fills in from the chapter bounds
            let verse_range = match (start_verse, end_verse) {
                (None, None) => None,
                (start, end) => {
                    let count = engine
                        .catalog()
                        .chapter(chapter)
                        .map(|c| c.verse_count)
                        .unwrap_or(1);
                    Some((start.unwrap_or(1), end.unwrap_or(count)))
                }
            };

            let word_range = match (start_word, end_word) {
                (Some(s), Some(e)) => Some((s, e)),
                (None, None) => None,
                _ => anyhow::bail!("--start-word and --end-word must be given together"),
            };

            let request = DownloadRequest {
                chapter_id: chapter,
                mode: mode.into(),
                verse_range,
                word_range,
                resume: !no_resume,
                package,
            };

            let result = engine.download_chapter(&request).await?;
            println!();
            println!(
                "{} ({}): {}/{} files, {} failed, {} in {}",
                result.chapter_name,
                result.chapter_id,
                result.successful,
                result.total_files_expected,
                result.failed,
                format_bytes(result.total_bytes),
                format_duration(result.duration_seconds)
            );
            if let Some(archive) = result.archive_path {
                println!("archive: {}", archive.display());
            }
        }
        Commands::Progress { chapter } => {
            let engine = DownloadEngine::new(catalog, config)?;
            let progress = engine.chapter_progress(chapter).await?;
            println!(
                "{}/{} files on disk ({:.1}%)",
                progress.downloaded_files, progress.total_expected, progress.percent
            );
        }
    }

    Ok(())
}
