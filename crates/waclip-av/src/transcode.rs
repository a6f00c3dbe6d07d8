//! The [`Transcoder`] capability and its ffmpeg implementation.
//!
//! The adapter applies a fixed parameter template: software encoders chosen
//! by the target codecs, CRF quality control, a `-maxrate`/`-bufsize` cap
//! on instantaneous video bitrate so a favorable average CRF cannot hide
//! oversized bursts, and an optional aspect-preserving downscale that never
//! upscales past the source resolution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use waclip_core::{AudioCodec, VideoCodec};

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// Encode timeout: 1 hour. Sources here are short-form clips; anything
/// taking longer is wedged.
const ENCODE_TIMEOUT: Duration = Duration::from_secs(3600);

/// Bounding box for an aspect-ratio-preserving downscale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleSpec {
    pub width: u32,
    pub height: u32,
}

impl ScaleSpec {
    /// Render the ffmpeg scale filter. `min(..)` against the input
    /// dimensions guarantees the filter only ever shrinks.
    pub fn filter_arg(&self) -> String {
        format!(
            "scale='min({},iw)':'min({},ih)':force_original_aspect_ratio=decrease:force_divisible_by=2",
            self.width, self.height
        )
    }
}

/// Full parameter set for one encode invocation.
#[derive(Debug, Clone)]
pub struct EncodeParams {
    pub video_codec: VideoCodec,
    pub audio_codec: AudioCodec,
    /// Audio bitrate in ffmpeg notation (e.g. "128k").
    pub audio_bitrate: String,
    /// x264 speed/quality preset.
    pub preset: String,
    /// Constant rate factor.
    pub crf: u32,
    /// Cap on instantaneous video bitrate (e.g. "2000k").
    pub max_rate: String,
    /// Rate-control buffer size paired with `max_rate`.
    pub buf_size: String,
    /// Optional downscale bound; `None` preserves the source resolution.
    pub scale: Option<ScaleSpec>,
}

/// A capability that re-encodes a media file with the given parameters.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Encode `input` into `output`, overwriting `output` if present.
    ///
    /// # Errors
    ///
    /// Returns [`waclip_core::Error::Transcode`] on any failure of the
    /// underlying encode process. The caller is responsible for removing
    /// partial output.
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        params: &EncodeParams,
    ) -> waclip_core::Result<()>;
}

/// A transcoder backed by the `ffmpeg` CLI.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    ffmpeg_path: PathBuf,
}

impl FfmpegTranscoder {
    /// Create a new transcoder using the given ffmpeg path.
    pub fn new(ffmpeg_path: PathBuf) -> Self {
        Self { ffmpeg_path }
    }

    /// Create a transcoder from a registry, failing if ffmpeg was not
    /// discovered.
    pub fn from_registry(tools: &ToolRegistry) -> waclip_core::Result<Self> {
        Ok(Self::new(tools.require("ffmpeg")?.clone()))
    }
}

/// Build the full ffmpeg argument list for one encode.
fn build_args(input: &Path, output: &Path, params: &EncodeParams) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into(), "-i".into(), input.to_string_lossy().into_owned()];

    args.extend([
        "-c:v".into(),
        params.video_codec.encoder().into(),
        "-crf".into(),
        params.crf.to_string(),
        "-preset".into(),
        params.preset.clone(),
        "-maxrate".into(),
        params.max_rate.clone(),
        "-bufsize".into(),
        params.buf_size.clone(),
    ]);

    if let Some(scale) = params.scale {
        args.extend(["-vf".into(), scale.filter_arg()]);
    }

    args.extend([
        "-c:a".into(),
        params.audio_codec.encoder().into(),
        "-b:a".into(),
        params.audio_bitrate.clone(),
        "-movflags".into(),
        "+faststart".into(),
        // Audio map is optional: some clips carry no audio stream.
        "-map".into(),
        "0:v:0".into(),
        "-map".into(),
        "0:a:0?".into(),
    ]);

    args.push(output.to_string_lossy().into_owned());
    args
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        params: &EncodeParams,
    ) -> waclip_core::Result<()> {
        tracing::info!(
            "Encoding {} -> {} (codec={}, crf={}, preset={}, maxrate={}, scale={:?})",
            input.display(),
            output.display(),
            params.video_codec,
            params.crf,
            params.preset,
            params.max_rate,
            params.scale,
        );

        ToolCommand::new(self.ffmpeg_path.clone())
            .args(build_args(input, output, params))
            .timeout(ENCODE_TIMEOUT)
            .execute()
            .await
            .map_err(|e| waclip_core::Error::transcode("ffmpeg", e.to_string()))?;

        Ok(())
    }
}
