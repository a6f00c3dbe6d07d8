//! Orchestrator integration tests.
//!
//! The pipeline runs against fake capabilities so the full state flow —
//! classify, extract, probe, decide, encode, cleanup — is exercised
//! without external tools.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use waclip::pipeline::{Capabilities, Pipeline, RunOptions};
use waclip_av::{EncodeParams, Transcoder};
use waclip_core::config::Config;
use waclip_core::{Error, Platform};
use waclip_extract::Extractor;
use waclip_probe::{MediaMetadata, Prober};

const YOUTUBE_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

// -- Fakes ------------------------------------------------------------------

/// Extractor that writes a file of a planned size (or fails).
struct FakeExtractor {
    platform: Platform,
    size: usize,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeExtractor {
    fn ok(platform: Platform, size: usize) -> Self {
        Self {
            platform,
            size,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(platform: Platform) -> Self {
        Self {
            platform,
            size: 0,
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch(&self, _url: &str, dest_dir: &Path) -> waclip_core::Result<PathBuf> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::DownloadVerification {
                path: dest_dir.join("youtube_dQw4w9WgXcQ.mp4"),
            });
        }
        std::fs::create_dir_all(dest_dir)?;
        let path = dest_dir.join("youtube_dQw4w9WgXcQ.mp4");
        std::fs::write(&path, vec![0u8; self.size])?;
        Ok(path)
    }
}

/// Prober that reads the real on-disk size and reports fixed stream fields.
struct StubProber {
    codec: &'static str,
    width: u32,
    height: u32,
    duration_secs: f64,
}

impl StubProber {
    fn compliant_streams() -> Self {
        Self {
            codec: "h264",
            width: 640,
            height: 360,
            duration_secs: 60.0,
        }
    }

    fn wrong_codec() -> Self {
        Self {
            codec: "hevc",
            width: 640,
            height: 360,
            duration_secs: 60.0,
        }
    }
}

#[async_trait]
impl Prober for StubProber {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn probe(&self, path: &Path) -> waclip_core::Result<MediaMetadata> {
        let byte_size = std::fs::metadata(path)
            .map_err(|e| Error::Probe(e.to_string()))?
            .len();
        Ok(MediaMetadata {
            path: path.to_path_buf(),
            byte_size,
            duration_secs: self.duration_secs,
            bit_rate: 0,
            width: self.width,
            height: self.height,
            codec_name: self.codec.into(),
        })
    }
}

/// Transcoder that plays back a plan of output sizes (or failures).
struct PlanTranscoder {
    plan: Mutex<Vec<Option<usize>>>,
    calls: AtomicUsize,
}

impl PlanTranscoder {
    /// `Some(size)` writes a file of that size; `None` fails the encode.
    fn new(plan: Vec<Option<usize>>) -> Arc<Self> {
        Arc::new(Self {
            plan: Mutex::new(plan),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Transcoder for PlanTranscoder {
    async fn transcode(
        &self,
        _input: &Path,
        output: &Path,
        _params: &EncodeParams,
    ) -> waclip_core::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.plan.lock().unwrap().remove(0);
        match step {
            Some(size) => {
                std::fs::write(output, vec![0u8; size])?;
                Ok(())
            }
            None => Err(Error::transcode("plan", "planned failure")),
        }
    }
}

// -- Harness ----------------------------------------------------------------

fn test_config(root: &Path, max_bytes: u64) -> Config {
    let mut config = Config::default();
    config.paths.download_dir = root.join("downloads");
    config.paths.output_dir = root.join("output");
    config.delivery.max_bytes = max_bytes;
    config
}

fn pipeline(
    config: Config,
    extractor: FakeExtractor,
    prober: StubProber,
    transcoder: Arc<PlanTranscoder>,
) -> Pipeline {
    Pipeline::new(
        config,
        Capabilities {
            prober: Arc::new(prober),
            transcoder,
            extractors: vec![Box::new(extractor)],
        },
    )
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

// -- Tests ------------------------------------------------------------------

#[tokio::test]
async fn compliant_source_is_moved_through_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 16_000);
    let transcoder = PlanTranscoder::new(vec![]);

    let p = pipeline(
        config,
        FakeExtractor::ok(Platform::YouTube, 10_000),
        StubProber::compliant_streams(),
        transcoder.clone(),
    );

    let outcome = p
        .process_url(YOUTUBE_URL, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.platform, Platform::YouTube);
    assert_eq!(outcome.video_id, "dQw4w9WgXcQ");
    assert_eq!(outcome.metadata.byte_size, 10_000);
    assert!(outcome.output.exists());
    let name = outcome
        .output
        .file_name()
        .unwrap()
        .to_string_lossy()
        .into_owned();
    assert!(name.starts_with("youtube_"), "got {name}");
    assert!(name.ends_with("_whatsapp.mp4"), "got {name}");

    // No encode ran and the downloaded source was cleaned up.
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 0);
    assert!(files_in(&dir.path().join("downloads")).is_empty());
}

#[tokio::test]
async fn keep_original_preserves_the_download() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 16_000);

    let p = pipeline(
        config,
        FakeExtractor::ok(Platform::YouTube, 10_000),
        StubProber::compliant_streams(),
        PlanTranscoder::new(vec![]),
    );

    let opts = RunOptions {
        keep_original: true,
        ..RunOptions::default()
    };
    let outcome = p.process_url(YOUTUBE_URL, &opts).await.unwrap();

    assert!(outcome.output.exists());
    let downloads = files_in(&dir.path().join("downloads"));
    assert_eq!(downloads.len(), 1);
    assert_eq!(std::fs::metadata(&downloads[0]).unwrap().len(), 10_000);
}

#[tokio::test]
async fn oversized_source_descends_the_ladder() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 16_000);
    // First tier still too large, second fits.
    let transcoder = PlanTranscoder::new(vec![Some(20_000), Some(12_000)]);

    let p = pipeline(
        config,
        FakeExtractor::ok(Platform::YouTube, 50_000),
        StubProber::compliant_streams(),
        transcoder.clone(),
    );

    let outcome = p
        .process_url(YOUTUBE_URL, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.metadata.byte_size, 12_000);
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 2);
    // Exactly one artifact, no temp files.
    assert_eq!(files_in(&dir.path().join("output")).len(), 1);
    assert!(files_in(&dir.path().join("downloads")).is_empty());
}

#[tokio::test]
async fn wrong_codec_gets_a_single_recode() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 16_000);
    let transcoder = PlanTranscoder::new(vec![Some(8_000)]);

    let p = pipeline(
        config,
        FakeExtractor::ok(Platform::YouTube, 10_000),
        StubProber::wrong_codec(),
        transcoder.clone(),
    );

    let outcome = p
        .process_url(YOUTUBE_URL, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.metadata.byte_size, 8_000);
    // One pass-through encode, no ladder.
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn oversized_recode_result_escalates_into_the_ladder() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 16_000);
    // Pass-through balloons past the ceiling, then the first tier fits.
    let transcoder = PlanTranscoder::new(vec![Some(20_000), Some(12_000)]);

    let p = pipeline(
        config,
        FakeExtractor::ok(Platform::YouTube, 10_000),
        StubProber::wrong_codec(),
        transcoder.clone(),
    );

    let outcome = p
        .process_url(YOUTUBE_URL, &RunOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.metadata.byte_size, 12_000);
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 2);
    assert_eq!(files_in(&dir.path().join("output")).len(), 1);
}

#[tokio::test]
async fn no_compress_accepts_an_oversized_result() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 16_000);
    let transcoder = PlanTranscoder::new(vec![Some(30_000)]);

    let p = pipeline(
        config,
        FakeExtractor::ok(Platform::YouTube, 50_000),
        StubProber::compliant_streams(),
        transcoder.clone(),
    );

    let opts = RunOptions {
        compress: false,
        ..RunOptions::default()
    };
    let outcome = p.process_url(YOUTUBE_URL, &opts).await.unwrap();

    // Single encode, no ladder, oversized output accepted.
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.metadata.byte_size, 30_000);
}

#[tokio::test]
async fn unrecognized_url_fails_before_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 16_000);

    let extractor = FakeExtractor::ok(Platform::YouTube, 10_000);
    let p = pipeline(
        config,
        extractor,
        StubProber::compliant_streams(),
        PlanTranscoder::new(vec![]),
    );

    let err = p
        .process_url("https://example.com/watch?v=nope", &RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnrecognizedUrl { .. }));
    assert!(files_in(&dir.path().join("downloads")).is_empty());
    assert!(files_in(&dir.path().join("output")).is_empty());
}

#[tokio::test]
async fn extractor_failure_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 16_000);

    let p = pipeline(
        config,
        FakeExtractor::failing(Platform::YouTube),
        StubProber::compliant_streams(),
        PlanTranscoder::new(vec![]),
    );

    let err = p
        .process_url(YOUTUBE_URL, &RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::DownloadVerification { .. }));
    assert!(files_in(&dir.path().join("output")).is_empty());
}

#[tokio::test]
async fn ladder_exhaustion_cleans_up_every_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 16_000);
    let transcoder = PlanTranscoder::new(vec![
        Some(30_000),
        Some(25_000),
        Some(20_000),
        Some(18_000),
    ]);

    let p = pipeline(
        config,
        FakeExtractor::ok(Platform::YouTube, 50_000),
        StubProber::compliant_streams(),
        transcoder.clone(),
    );

    let err = p
        .process_url(YOUTUBE_URL, &RunOptions::default())
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::CompressionExhausted { .. }),
        "got {err}"
    );
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 4);
    // Terminal failure: no oversized artifact, no temp files, no download.
    assert!(files_in(&dir.path().join("output")).is_empty());
    assert!(files_in(&dir.path().join("downloads")).is_empty());
}

#[tokio::test]
async fn cancelled_run_cleans_up_and_reports_cancellation() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), 16_000);

    let p = pipeline(
        config,
        FakeExtractor::ok(Platform::YouTube, 50_000),
        StubProber::compliant_streams(),
        PlanTranscoder::new(vec![]),
    );
    p.cancellation_token().cancel();

    let err = p
        .process_url(YOUTUBE_URL, &RunOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(files_in(&dir.path().join("output")).is_empty());
}
