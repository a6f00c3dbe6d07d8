//! The end-to-end pipeline: classify → extract → probe → decide →
//! {move-through | single recode | compression ladder} → cleanup.
//!
//! One [`Pipeline`] invocation owns its downloaded, temporary, and output
//! paths exclusively; callers running pipelines concurrently must supply
//! distinct directories. Every error path removes the run's partial files
//! before surfacing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use waclip_av::{
    CompressionLadder, EncodeParams, FfmpegTranscoder, FfprobeProber, ToolRegistry, Transcoder,
};
use waclip_core::config::Config;
use waclip_core::{Error, Platform, Result};
use waclip_extract::{classify, extractor_for, CookieStore, Extractor, FileCookieStore};
use waclip_probe::{evaluate, MediaMetadata, Prober, Verdict};

/// Bitrate cap for the single pass-through re-encode. Generous compared to
/// the ladder tiers since the source already fits the size ceiling.
const PASS_MAX_RATE: &str = "4000k";
const PASS_BUF_SIZE: &str = "8000k";

/// Per-run options from the CLI.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// When false, the compression ladder is skipped and an oversized
    /// result is accepted with a warning.
    pub compress: bool,
    /// Keep the downloaded source file after the run.
    pub keep_original: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            compress: true,
            keep_original: false,
        }
    }
}

/// The external capabilities a pipeline runs against. Injected so tests
/// can substitute fakes for the tool-backed implementations.
pub struct Capabilities {
    pub prober: Arc<dyn Prober>,
    pub transcoder: Arc<dyn Transcoder>,
    pub extractors: Vec<Box<dyn Extractor>>,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub platform: Platform,
    pub video_id: String,
    /// Path of the final artifact.
    pub output: PathBuf,
    /// Fresh probe of the final artifact.
    pub metadata: MediaMetadata,
}

/// Orchestrates one URL end-to-end.
pub struct Pipeline {
    config: Config,
    capabilities: Capabilities,
    cancel: CancellationToken,
}

impl Pipeline {
    /// Create a pipeline over explicit capabilities.
    pub fn new(config: Config, capabilities: Capabilities) -> Self {
        Self {
            config,
            capabilities,
            cancel: CancellationToken::new(),
        }
    }

    /// Wire up the real tool-backed capabilities: ffprobe prober, ffmpeg
    /// transcoder, and yt-dlp extractors with the file-backed cookie store.
    ///
    /// Fails fast if a required tool is missing from `PATH` and config.
    pub fn from_config(config: Config) -> Result<Self> {
        let tools = ToolRegistry::discover(&config.tools);
        let prober = Arc::new(FfprobeProber::from_registry(&tools)?);
        let transcoder = Arc::new(FfmpegTranscoder::from_registry(&tools)?);
        let cookie_store: Arc<dyn CookieStore> = Arc::new(FileCookieStore::default_location()?);

        let extractors = Platform::ALL
            .iter()
            .map(|&platform| extractor_for(platform, &tools, cookie_store.clone()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(
            config,
            Capabilities {
                prober,
                transcoder,
                extractors,
            },
        ))
    }

    /// Builder: attach a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A clone of the run's cancellation token, for wiring to signals.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Process one URL end-to-end and return the final artifact.
    pub async fn process_url(&self, url: &str, opts: &RunOptions) -> Result<RunOutcome> {
        let classification = classify(url)?;
        tracing::info!(
            "Classified as {} (id {})",
            classification.platform,
            classification.video_id
        );

        let extractor = self.extractor(classification.platform)?;

        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let downloaded = extractor
            .fetch(url, &self.config.paths.download_dir)
            .await?;
        tracing::info!("Downloaded {}", downloaded.display());

        if self.cancel.is_cancelled() {
            self.cleanup_source(&downloaded, opts);
            return Err(Error::Cancelled);
        }

        let output = self.output_path(classification.platform);
        match self.convert(&downloaded, &output, opts).await {
            Ok(()) => {
                // Fresh probe of the artifact; prior records are stale the
                // moment an encode ran.
                let metadata = self.capabilities.prober.probe(&output).await?;
                self.cleanup_source(&downloaded, opts);
                tracing::info!(
                    "Finalized: {:.2} MB, {:.1}s, {}x{}",
                    metadata.megabytes(),
                    metadata.duration_secs,
                    metadata.width,
                    metadata.height
                );
                Ok(RunOutcome {
                    platform: classification.platform,
                    video_id: classification.video_id,
                    output,
                    metadata,
                })
            }
            Err(e) => {
                remove_if_present(&output);
                self.cleanup_source(&downloaded, opts);
                Err(e)
            }
        }
    }

    /// The delivery profile this pipeline targets.
    pub fn delivery(&self) -> &waclip_core::config::DeliveryConfig {
        &self.config.delivery
    }

    // -- Stages --------------------------------------------------------------

    async fn convert(&self, downloaded: &Path, output: &Path, opts: &RunOptions) -> Result<()> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let meta = self.capabilities.prober.probe(downloaded).await?;
        tracing::info!(
            "Source: {:.2} MB, {:.1}s, {} {}x{}",
            meta.megabytes(),
            meta.duration_secs,
            meta.codec_name,
            meta.width,
            meta.height
        );

        match evaluate(&meta, &self.config.delivery) {
            Verdict::Compliant => {
                tracing::info!("Source already satisfies the delivery profile");
                promote_file(downloaded, output, opts.keep_original)
            }
            Verdict::RecodeOnly => self.recode_single(downloaded, output, opts.compress).await,
            Verdict::RecodeAndLadder => {
                if opts.compress {
                    self.ladder()
                        .compress(downloaded, output, &self.config.delivery, &self.cancel)
                        .await
                        .map(|_| ())
                } else {
                    tracing::warn!("Compression disabled for an oversized source");
                    self.recode_single(downloaded, output, false).await
                }
            }
        }
    }

    /// Single pass-through re-encode: fix codec/container, preserve
    /// resolution and duration. When `escalate` is set and the result still
    /// exceeds the size ceiling, the run falls into the compression ladder.
    async fn recode_single(&self, input: &Path, output: &Path, escalate: bool) -> Result<()> {
        let d = &self.config.delivery;
        let params = EncodeParams {
            video_codec: d.video_codec,
            audio_codec: d.audio_codec,
            audio_bitrate: d.audio_bitrate.clone(),
            preset: d.preset.clone(),
            crf: d.crf,
            max_rate: PASS_MAX_RATE.into(),
            buf_size: PASS_BUF_SIZE.into(),
            scale: None,
        };

        let tmp = work_path(output);
        if let Err(e) = self.capabilities.transcoder.transcode(input, &tmp, &params).await {
            remove_if_present(&tmp);
            return Err(e);
        }

        let meta = match self.capabilities.prober.probe(&tmp).await {
            Ok(meta) => meta,
            Err(e) => {
                remove_if_present(&tmp);
                return Err(e);
            }
        };
        if meta.byte_size > d.max_bytes {
            if escalate {
                tracing::info!(
                    "Pass-through result oversized ({} bytes); escalating into the ladder",
                    meta.byte_size
                );
                remove_if_present(&tmp);
                return self
                    .ladder()
                    .compress(input, output, d, &self.cancel)
                    .await
                    .map(|_| ());
            }
            tracing::warn!(
                "Output exceeds the delivery size limit ({} > {} bytes)",
                meta.byte_size,
                d.max_bytes
            );
        }

        promote_file(&tmp, output, false)
    }

    fn ladder(&self) -> CompressionLadder {
        CompressionLadder::new(
            self.capabilities.transcoder.clone(),
            self.capabilities.prober.clone(),
        )
    }

    fn extractor(&self, platform: Platform) -> Result<&dyn Extractor> {
        self.capabilities
            .extractors
            .iter()
            .find(|e| e.platform() == platform)
            .map(|e| e.as_ref())
            .ok_or_else(|| {
                Error::Validation(format!("no extractor registered for {platform}"))
            })
    }

    fn output_path(&self, platform: Platform) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        self.config.paths.output_dir.join(format!(
            "{platform}_{timestamp}_whatsapp.{}",
            self.config.delivery.container.extension()
        ))
    }

    fn cleanup_source(&self, downloaded: &Path, opts: &RunOptions) {
        if !opts.keep_original {
            remove_if_present(downloaded);
        }
    }
}

/// Temporary encode target next to the final output.
fn work_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    output.with_file_name(format!(".{name}.work"))
}

/// Move (or, when the source must survive, copy) a finished file into its
/// final location.
fn promote_file(src: &Path, dst: &Path, preserve_source: bool) -> Result<()> {
    if preserve_source {
        std::fs::copy(src, dst)?;
        return Ok(());
    }
    if std::fs::rename(src, dst).is_err() {
        std::fs::copy(src, dst)?;
        let _ = std::fs::remove_file(src);
    }
    Ok(())
}

fn remove_if_present(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove {}: {e}", path.display());
        }
    }
}
