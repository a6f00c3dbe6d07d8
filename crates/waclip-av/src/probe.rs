//! FFprobe-based [`Prober`] implementation.
//!
//! Shells out to `ffprobe -v quiet -print_format json -show_format
//! -show_streams` and maps the JSON output into
//! [`waclip_probe::MediaMetadata`].

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use waclip_probe::{MediaMetadata, Prober};

use crate::command::ToolCommand;
use crate::tools::ToolRegistry;

/// A prober backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
}

impl FfprobeProber {
    /// Create a new prober using the given ffprobe path.
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    /// Create a prober from a registry, failing if ffprobe was not discovered.
    pub fn from_registry(tools: &ToolRegistry) -> waclip_core::Result<Self> {
        Ok(Self::new(tools.require("ffprobe")?.clone()))
    }
}

#[async_trait]
impl Prober for FfprobeProber {
    fn name(&self) -> &'static str {
        "ffprobe"
    }

    async fn probe(&self, path: &Path) -> waclip_core::Result<MediaMetadata> {
        let output = ToolCommand::new(self.ffprobe_path.clone())
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg_path(path)
            .execute()
            .await
            .map_err(|e| waclip_core::Error::Probe(e.to_string()))?;

        let ff: FfprobeOutput = serde_json::from_str(&output.stdout)
            .map_err(|e| waclip_core::Error::Probe(format!("ffprobe JSON parse error: {e}")))?;

        parse_ffprobe_output(path, ff)
    }
}

// ---------------------------------------------------------------------------
// JSON structures
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn parse_ffprobe_output(path: &Path, output: FfprobeOutput) -> waclip_core::Result<MediaMetadata> {
    // Containers may carry audio, subtitle, and attachment streams; the
    // metadata record is built from the first video stream only.
    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| {
            waclip_core::Error::Probe(format!("no video stream in {}", path.display()))
        })?;

    let duration_secs = output
        .format
        .duration
        .as_deref()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| {
            waclip_core::Error::Probe(format!("missing format duration in {}", path.display()))
        })?;

    let byte_size = output
        .format
        .size
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| {
            waclip_core::Error::Probe(format!("missing format size in {}", path.display()))
        })?;

    let bit_rate = output
        .format
        .bit_rate
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    Ok(MediaMetadata {
        path: path.to_path_buf(),
        byte_size,
        duration_secs,
        bit_rate,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        codec_name: video.codec_name.clone().unwrap_or_default(),
    })
}
