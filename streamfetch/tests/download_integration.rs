//! Integration tests for the download pipeline.
//!
//! These tests drive a complete job through the public API:
//! - Manifest parse → worker pool → scratch files → merged output
//! - Partial failure followed by a merge of what was downloaded
//! - Cancellation from another thread
//!
//! The network is replaced by an in-memory [`HttpClient`].
//!
//! Run with: `cargo test --test download_integration`

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use streamfetch::download::NullSink;
use streamfetch::{
    DownloadConfig, Downloader, FetchError, HttpClient, JobError, JobOutcome, MergeMethod,
    ParseError, ProgressEvent, ProgressSink,
};

// ============================================================================
// Helper Functions
// ============================================================================

const MANIFEST_URL: &str = "http://media.test/show/ep1/index.m3u8";

/// In-memory client serving fixed bodies; unknown URLs answer 404.
#[derive(Default)]
struct FakeCdn {
    bodies: HashMap<String, Vec<u8>>,
    hits: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    downloads: AtomicUsize,
}

impl FakeCdn {
    fn serve(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    fn hits(&self, url: &str) -> usize {
        self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn lookup(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        *self.hits.lock().unwrap().entry(url.to_string()).or_default() += 1;
        self.bodies.get(url).cloned().ok_or(FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

impl HttpClient for FakeCdn {
    fn get_text(&self, url: &str, _referer: &str) -> Result<String, FetchError> {
        let body = self.lookup(url)?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn download(&self, url: &str, _referer: &str, dest: &Path) -> Result<u64, FetchError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let body = self.lookup(url)?;
        fs::write(dest, &body).map_err(|source| FetchError::Io {
            path: dest.to_path_buf(),
            source,
        })?;
        Ok(body.len() as u64)
    }
}

/// CDN serving a playlist of `n` relative segments, segment `i` holding the byte `i`.
fn cdn_with_segments(n: usize) -> FakeCdn {
    let mut playlist = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n");
    let mut cdn = FakeCdn::default();
    for i in 0..n {
        playlist.push_str(&format!("#EXTINF:4.000,\npart{}.ts\n", i));
        cdn = cdn.serve(&format!("http://media.test/show/ep1/part{}.ts", i), vec![i as u8]);
    }
    playlist.push_str("#EXT-X-ENDLIST\n");
    cdn.serve(MANIFEST_URL, playlist)
}

/// Config forcing the concatenation fallback so tests do not need ffmpeg.
fn test_config() -> DownloadConfig {
    DownloadConfig::default().with_muxer("streamfetch-test-missing-muxer")
}

fn collecting_sink() -> (Arc<Mutex<Vec<ProgressEvent>>>, Arc<dyn ProgressSink>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = Arc::clone(&events);
    let sink = move |event: &ProgressEvent| events_clone.lock().unwrap().push(event.clone());
    (events, Arc::new(sink))
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A full job downloads every segment once and merges them in order.
#[test]
fn test_download_and_merge_round_trip() {
    let dir = TempDir::new().unwrap();
    let cdn = Arc::new(cdn_with_segments(12));
    let downloader = Downloader::new(test_config(), Arc::clone(&cdn), Arc::new(NullSink));

    let report = downloader.start(MANIFEST_URL, dir.path(), 4).unwrap();
    assert_eq!(report.outcome, JobOutcome::Success);
    assert_eq!(report.completed, 12);
    assert_eq!(cdn.downloads.load(Ordering::SeqCst), 12);
    for i in 0..12 {
        assert_eq!(cdn.hits(&format!("http://media.test/show/ep1/part{}.ts", i)), 1);
    }

    let merged = downloader.merge().unwrap();
    assert_eq!(merged.method, MergeMethod::Concatenate);
    assert_eq!(merged.output, dir.path().join("output.mp4"));
    assert_eq!(fs::read(&merged.output).unwrap(), (0u8..12).collect::<Vec<_>>());
    assert!(!test_config().scratch_dir(dir.path()).exists());
}

/// Every segment produces exactly one progress count, ending at total.
#[test]
fn test_progress_reaches_total() {
    let dir = TempDir::new().unwrap();
    let (events, sink) = collecting_sink();
    let downloader = Downloader::new(test_config(), Arc::new(cdn_with_segments(8)), sink);

    downloader.start(MANIFEST_URL, dir.path(), 3).unwrap();

    let events = events.lock().unwrap();
    let mut progress: Vec<usize> = events
        .iter()
        .filter(|e| {
            e.message
                .as_deref()
                .is_some_and(|m| m.starts_with("Downloading:"))
        })
        .map(|e| e.completed)
        .collect();
    // Workers report concurrently, so arrival order may differ from the counts.
    progress.sort_unstable();
    assert_eq!(progress, (1..=8).collect::<Vec<_>>());
    assert_eq!(events.last().map(|e| e.completed), Some(8));
}

/// A missing segment is retried, recorded, and skipped by the merge.
#[test]
fn test_partial_failure_then_merge() {
    let dir = TempDir::new().unwrap();
    let mut cdn = cdn_with_segments(5);
    cdn.bodies.remove("http://media.test/show/ep1/part2.ts");
    let cdn = Arc::new(cdn);
    let downloader = Downloader::new(test_config(), Arc::clone(&cdn), Arc::new(NullSink));

    let report = downloader.start(MANIFEST_URL, dir.path(), 2).unwrap();

    assert_eq!(report.outcome, JobOutcome::PartialFailure);
    assert_eq!(report.completed, 5);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].index, 2);
    assert_eq!(cdn.hits("http://media.test/show/ep1/part2.ts"), 3);
    assert!(report.is_mergeable());

    let merged = downloader.merge().unwrap();
    assert_eq!(fs::read(&merged.output).unwrap(), vec![0, 1, 3, 4]);
}

/// An unreachable manifest aborts before any segment request.
#[test]
fn test_manifest_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let cdn = Arc::new(FakeCdn::default());
    let (events, sink) = collecting_sink();
    let downloader = Downloader::new(test_config(), Arc::clone(&cdn), sink);

    let err = downloader.start(MANIFEST_URL, dir.path(), 4).unwrap_err();

    assert!(matches!(err, JobError::Parse(ParseError::FetchFailed(_))));
    assert_eq!(cdn.downloads.load(Ordering::SeqCst), 0);
    assert!(events.lock().unwrap().iter().any(|e| e.is_error()));
}

/// A playlist without media lines is rejected.
#[test]
fn test_playlist_without_segments() {
    let dir = TempDir::new().unwrap();
    let cdn = FakeCdn::default().serve(MANIFEST_URL, "#EXTM3U\n#EXT-X-ENDLIST\n");
    let downloader = Downloader::new(test_config(), Arc::new(cdn), Arc::new(NullSink));

    let err = downloader.start(MANIFEST_URL, dir.path(), 4).unwrap_err();

    assert!(matches!(err, JobError::Parse(ParseError::NoSegments { .. })));
}

/// Restarting a job wipes segments left by the previous one.
#[test]
fn test_restart_discards_stale_segments() {
    let dir = TempDir::new().unwrap();
    let scratch = test_config().scratch_dir(dir.path());
    fs::create_dir_all(&scratch).unwrap();
    fs::write(scratch.join("segment_00007.ts"), b"stale").unwrap();

    let downloader = Downloader::new(test_config(), Arc::new(cdn_with_segments(2)), Arc::new(NullSink));
    downloader.start(MANIFEST_URL, dir.path(), 2).unwrap();
    let merged = downloader.merge().unwrap();

    assert_eq!(fs::read(&merged.output).unwrap(), vec![0, 1]);
}

/// Stop from another thread ends the job early with completed < total.
#[test]
fn test_cancel_mid_job() {
    let dir = TempDir::new().unwrap();
    let mut cdn = cdn_with_segments(40);
    cdn.delay = Some(Duration::from_millis(25));
    let cdn = Arc::new(cdn);
    let downloader = Arc::new(Downloader::new(test_config(), Arc::clone(&cdn), Arc::new(NullSink)));

    let stopper = {
        let downloader = Arc::clone(&downloader);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(120));
            downloader.stop();
        })
    };
    let report = downloader.start(MANIFEST_URL, dir.path(), 2).unwrap();
    stopper.join().unwrap();

    assert_eq!(report.outcome, JobOutcome::Cancelled);
    assert!(report.succeeded() < 40);
    assert!(cdn.downloads.load(Ordering::SeqCst) < 40);
}

/// Merging twice with segments kept produces identical bytes.
#[test]
fn test_merge_idempotent_with_kept_segments() {
    let dir = TempDir::new().unwrap();
    let downloader = Downloader::new(
        test_config().with_keep_segments(true),
        Arc::new(cdn_with_segments(6)),
        Arc::new(NullSink),
    );
    downloader.start(MANIFEST_URL, dir.path(), 6).unwrap();

    let first = downloader.merge().unwrap();
    let first_bytes = fs::read(&first.output).unwrap();
    let second = downloader.merge().unwrap();

    assert_eq!(first_bytes, fs::read(&second.output).unwrap());
    assert_eq!(first.bytes, 6);
}

/// A scratch area left by an earlier process can be merged on its own.
#[test]
fn test_merge_dir_after_restart() {
    let dir = TempDir::new().unwrap();
    {
        let downloader = Downloader::new(
            test_config().with_keep_segments(true),
            Arc::new(cdn_with_segments(3)),
            Arc::new(NullSink),
        );
        downloader.start(MANIFEST_URL, dir.path(), 3).unwrap();
    }

    let fresh = Downloader::new(test_config(), Arc::new(FakeCdn::default()), Arc::new(NullSink));
    let merged = fresh.merge_dir(dir.path()).unwrap();

    assert_eq!(fs::read(&merged.output).unwrap(), vec![0, 1, 2]);
    assert!(!test_config().scratch_dir(dir.path()).exists());
}
