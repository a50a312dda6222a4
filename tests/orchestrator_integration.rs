//! End-to-end orchestrator scenarios over a scripted transport
//!
//! Exercises the engine's aggregate behavior without touching the network:
//! full-success runs, isolated 404s, the consecutive-not-found short
//! circuit, resume skipping and range validation.

use async_trait::async_trait;
use quran_audio_engine::download::fetch::{FetchStatus, Transport};
use quran_audio_engine::{
    Catalog, DownloadEngine, DownloadMode, DownloadRequest, EngineConfig, ProgressObserver,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use url::Url;

/// Two-verse chapter with word counts [3, 2]
const SMALL_CHAPTER: &str = r#"[{
    "surah_id": 1,
    "name_en": "Al-Fatihah",
    "name_ar": "الفاتحة",
    "ayah_range": [1, 2],
    "word_range": [1, 5],
    "verses": [
        {"verse_id": 1, "word_count": 3},
        {"verse_id": 2, "word_count": 2}
    ]
}]"#;

/// Chapter whose first verse claims more words than the host has
const OVERLONG_CHAPTER: &str = r#"[{
    "surah_id": 7,
    "name_en": "Test Chapter",
    "name_ar": "اختبار",
    "ayah_range": [1, 2],
    "word_range": [1, 10],
    "verses": [
        {"verse_id": 1, "word_count": 8},
        {"verse_id": 2, "word_count": 2}
    ]
}]"#;

/// Transport scripted per file name; records every request it receives
struct MockTransport {
    /// Keyed by the URL's trailing file name, e.g. "001_002_001.mp3"
    responses: HashMap<String, FetchStatus>,
    default: FetchStatus,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    fn all_success() -> Self {
        Self {
            responses: HashMap::new(),
            default: FetchStatus::Success(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with_responses(responses: HashMap<String, FetchStatus>) -> Self {
        Self {
            responses,
            default: FetchStatus::Success(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch_one(&self, url: &Url, dest: &Path) -> FetchStatus {
        let name = url
            .path_segments()
            .and_then(|s| s.last())
            .unwrap()
            .to_string();
        self.calls.lock().unwrap().push(name.clone());

        match self.responses.get(&name).unwrap_or(&self.default) {
            FetchStatus::Success(_) => {
                let body = b"mock audio bytes";
                std::fs::write(dest, body).unwrap();
                FetchStatus::Success(body.len() as u64)
            }
            other => other.clone(),
        }
    }
}

fn engine_with(
    catalog_json: &str,
    root: &Path,
    transport: Arc<MockTransport>,
) -> DownloadEngine {
    let catalog = Catalog::from_json(catalog_json).unwrap();
    let config = EngineConfig {
        download_root: root.to_path_buf(),
        retry_backoff: std::time::Duration::ZERO,
        ..EngineConfig::default()
    };
    DownloadEngine::with_transport(catalog, config, transport).unwrap()
}

fn chapter_dir(root: &Path) -> PathBuf {
    root.join("001_Al_Fatihah")
}

#[tokio::test]
async fn full_word_by_word_download_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(MockTransport::all_success());
    let engine = engine_with(SMALL_CHAPTER, tmp.path(), Arc::clone(&transport));

    let result = engine
        .download_chapter(&DownloadRequest::word_by_word(1))
        .await
        .unwrap();

    assert_eq!(result.total_files_expected, 5);
    assert_eq!(result.successful, 5);
    assert_eq!(result.failed, 0);
    assert!(result.total_bytes > 0);

    for name in [
        "001_001_001.mp3",
        "001_001_002.mp3",
        "001_001_003.mp3",
        "001_002_001.mp3",
        "001_002_002.mp3",
    ] {
        assert!(chapter_dir(tmp.path()).join(name).exists(), "missing {name}");
    }

    // Fully successful run clears the resume record
    assert!(!tmp.path().join("download_state_001.json").exists());
}

#[tokio::test]
async fn single_not_found_does_not_short_circuit() {
    let tmp = tempfile::tempdir().unwrap();
    let mut responses = HashMap::new();
    responses.insert("001_002_001.mp3".to_string(), FetchStatus::NotFound);
    let transport = Arc::new(MockTransport::with_responses(responses));
    let engine = engine_with(SMALL_CHAPTER, tmp.path(), Arc::clone(&transport));

    let result = engine
        .download_chapter(&DownloadRequest::word_by_word(1))
        .await
        .unwrap();

    assert_eq!(result.successful, 4);
    assert_eq!(result.failed, 1);

    // One miss is below the threshold: the rest of verse 2 still ran
    assert!(chapter_dir(tmp.path()).join("001_002_002.mp3").exists());
    assert!(!chapter_dir(tmp.path()).join("001_002_001.mp3").exists());
}

#[tokio::test]
async fn five_consecutive_not_founds_abandon_the_verse() {
    let tmp = tempfile::tempdir().unwrap();
    let mut responses = HashMap::new();
    // Verse 1 words 3..=8 do not exist on the host
    for word in 3..=8 {
        responses.insert(
            format!("007_001_{word:03}.mp3"),
            FetchStatus::NotFound,
        );
    }
    let transport = Arc::new(MockTransport::with_responses(responses));

    let catalog = Catalog::from_json(OVERLONG_CHAPTER).unwrap();
    let config = EngineConfig {
        download_root: tmp.path().to_path_buf(),
        retry_backoff: std::time::Duration::ZERO,
        // Serialize fetches so the abandoned words are provably never issued
        concurrent_downloads: 1,
        ..EngineConfig::default()
    };
    let engine = DownloadEngine::with_transport(catalog, config, Arc::clone(&transport) as Arc<dyn Transport>).unwrap();

    let result = engine
        .download_chapter(&DownloadRequest::word_by_word(7))
        .await
        .unwrap();

    // Exactly the five consecutive misses count as failed; word 8 was
    // abandoned, verse 2 still downloaded in full.
    assert_eq!(result.failed, 5);
    assert_eq!(result.successful, 2 + 2);

    let calls = transport.calls();
    assert!(calls.contains(&"007_001_007.mp3".to_string()));
    assert!(!calls.contains(&"007_001_008.mp3".to_string()));
    assert!(calls.contains(&"007_002_001.mp3".to_string()));
    assert!(calls.contains(&"007_002_002.mp3".to_string()));
}

#[tokio::test]
async fn resume_skips_existing_files_without_network() {
    let tmp = tempfile::tempdir().unwrap();

    // Pre-populate verse 1 in full
    let dir = chapter_dir(tmp.path());
    std::fs::create_dir_all(&dir).unwrap();
    for name in ["001_001_001.mp3", "001_001_002.mp3", "001_001_003.mp3"] {
        std::fs::write(dir.join(name), b"already here").unwrap();
    }

    let transport = Arc::new(MockTransport::all_success());
    let engine = engine_with(SMALL_CHAPTER, tmp.path(), Arc::clone(&transport));

    let result = engine
        .download_chapter(&DownloadRequest::word_by_word(1))
        .await
        .unwrap();

    assert_eq!(result.successful, 5);
    assert_eq!(result.failed, 0);

    // No request was issued for the pre-populated files
    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert!(!calls.iter().any(|c| c.starts_with("001_001_")));
}

#[tokio::test]
async fn zero_byte_files_are_not_treated_as_downloaded() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = chapter_dir(tmp.path());
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("001_001_001.mp3"), b"").unwrap();

    let transport = Arc::new(MockTransport::all_success());
    let engine = engine_with(SMALL_CHAPTER, tmp.path(), Arc::clone(&transport));

    engine
        .download_chapter(&DownloadRequest::word_by_word(1))
        .await
        .unwrap();

    // The empty file was re-fetched
    assert!(transport
        .calls()
        .contains(&"001_001_001.mp3".to_string()));
    assert!(!std::fs::read(dir.join("001_001_001.mp3")).unwrap().is_empty());
}

#[tokio::test]
async fn inverted_range_fails_before_any_network() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(MockTransport::all_success());
    let engine = engine_with(SMALL_CHAPTER, tmp.path(), Arc::clone(&transport));

    let request = DownloadRequest {
        verse_range: Some((5, 3)),
        ..DownloadRequest::word_by_word(1)
    };
    let err = engine.download_chapter(&request).await.unwrap_err();

    assert!(matches!(
        err,
        quran_audio_engine::EngineError::InvalidRange { .. }
    ));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn unknown_chapter_fails_before_any_network() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(MockTransport::all_success());
    let engine = engine_with(SMALL_CHAPTER, tmp.path(), Arc::clone(&transport));

    let err = engine
        .download_chapter(&DownloadRequest::word_by_word(99))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        quran_audio_engine::EngineError::ChapterNotFound(99)
    ));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn verse_by_verse_addresses_word_one_and_names_verse_files() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(MockTransport::all_success());
    let engine = engine_with(SMALL_CHAPTER, tmp.path(), Arc::clone(&transport));

    let result = engine
        .download_chapter(&DownloadRequest::verse_by_verse(1))
        .await
        .unwrap();

    assert_eq!(result.mode, DownloadMode::VerseByVerse);
    assert_eq!(result.total_files_expected, 2);
    assert_eq!(result.successful, 2);

    // Remote addressing uses word 1; local files carry the verse suffix
    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.contains(&"001_001_001.mp3".to_string()));
    assert!(calls.contains(&"001_002_001.mp3".to_string()));
    assert!(chapter_dir(tmp.path()).join("001_001_verse.mp3").exists());
    assert!(chapter_dir(tmp.path()).join("001_002_verse.mp3").exists());
}

#[tokio::test]
async fn progress_events_cover_every_file_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(MockTransport::all_success());
    let mut engine = engine_with(SMALL_CHAPTER, tmp.path(), Arc::clone(&transport));

    let events: Arc<Mutex<Vec<(u64, u64, f64)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let observer: ProgressObserver = Arc::new(move |event| {
        sink.lock()
            .unwrap()
            .push((event.completed, event.total, event.percent));
    });
    engine.set_observer(observer);

    engine
        .download_chapter(&DownloadRequest::word_by_word(1))
        .await
        .unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 5);
    assert_eq!(
        events.iter().map(|(c, _, _)| *c).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    assert!(events.iter().all(|(_, t, _)| *t == 5));
    assert_eq!(events.last().unwrap().2, 100.0);
}

#[tokio::test]
async fn panicking_observer_does_not_abort_the_download() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(MockTransport::all_success());
    let mut engine = engine_with(SMALL_CHAPTER, tmp.path(), Arc::clone(&transport));

    let observer: ProgressObserver = Arc::new(|_| panic!("broken front end"));
    engine.set_observer(observer);

    let result = engine
        .download_chapter(&DownloadRequest::word_by_word(1))
        .await
        .unwrap();
    assert_eq!(result.successful, 5);
}

#[tokio::test]
async fn packaging_archives_the_chapter_and_removes_the_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(MockTransport::all_success());
    let engine = engine_with(SMALL_CHAPTER, tmp.path(), Arc::clone(&transport));

    let request = DownloadRequest {
        package: true,
        ..DownloadRequest::word_by_word(1)
    };
    let result = engine.download_chapter(&request).await.unwrap();

    let archive = result.archive_path.expect("archive should be produced");
    assert_eq!(archive, tmp.path().join("surah_001.zip"));
    assert!(archive.exists());
    assert!(!chapter_dir(tmp.path()).exists());
}

#[tokio::test]
async fn partial_range_request_skips_packaging() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(MockTransport::all_success());
    let engine = engine_with(SMALL_CHAPTER, tmp.path(), Arc::clone(&transport));

    let request = DownloadRequest {
        verse_range: Some((1, 1)),
        package: true,
        ..DownloadRequest::word_by_word(1)
    };
    let result = engine.download_chapter(&request).await.unwrap();

    assert!(result.archive_path.is_none());
    assert!(chapter_dir(tmp.path()).exists());
}

#[tokio::test]
async fn transient_errors_count_as_failed_after_retries() {
    let tmp = tempfile::tempdir().unwrap();
    let mut responses = HashMap::new();
    responses.insert(
        "001_001_002.mp3".to_string(),
        FetchStatus::Error("status 503".into()),
    );
    let transport = Arc::new(MockTransport::with_responses(responses));
    let engine = engine_with(SMALL_CHAPTER, tmp.path(), Arc::clone(&transport));

    let result = engine
        .download_chapter(&DownloadRequest::word_by_word(1))
        .await
        .unwrap();

    assert_eq!(result.successful, 4);
    assert_eq!(result.failed, 1);

    // Transient failures are retried up to the attempt limit
    let attempts = transport
        .calls()
        .iter()
        .filter(|c| c.as_str() == "001_001_002.mp3")
        .count();
    assert_eq!(attempts, 3);
}
