//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! sub-configs for filesystem paths, external tools, and the delivery
//! profile. Every section defaults sensibly so a completely empty `{}` file
//! is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::media::{AudioCodec, Container, VideoCodec};
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub tools: ToolsConfig,
    pub delivery: DeliveryConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    ///
    /// This is intentionally string-based so the caller can read the file
    /// however it sees fit.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.delivery.max_bytes == 0 {
            warnings.push("delivery.max_bytes is 0; every run will fail compression".into());
        }
        if self.delivery.max_duration_secs <= 0.0 {
            warnings.push("delivery.max_duration_secs is not positive".into());
        }
        if self.delivery.crf > 51 {
            warnings.push(format!(
                "delivery.crf {} is outside the x264 range 0-51",
                self.delivery.crf
            ));
        }
        if !self.delivery.audio_bitrate.ends_with('k') {
            warnings.push(format!(
                "delivery.audio_bitrate '{}' does not look like an ffmpeg bitrate (e.g. \"128k\")",
                self.delivery.audio_bitrate
            ));
        }

        let known_presets = [
            "ultrafast", "superfast", "veryfast", "faster", "fast", "medium", "slow", "slower",
            "veryslow",
        ];
        if !known_presets.contains(&self.delivery.preset.as_str()) {
            warnings.push(format!(
                "delivery.preset '{}' is not a recognized x264 preset (valid: {})",
                self.delivery.preset,
                known_presets.join(", ")
            ));
        }

        for (name, path) in [
            ("paths.download_dir", &self.paths.download_dir),
            ("paths.output_dir", &self.paths.output_dir),
        ] {
            if path.as_os_str().is_empty() {
                warnings.push(format!("{name} is empty"));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Filesystem layout: ephemeral downloads and final artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory for downloaded source files (created on demand).
    pub download_dir: PathBuf,
    /// Directory for final converted artifacts (created on demand).
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub ytdlp_path: Option<PathBuf>,
}

/// The fixed delivery profile a final artifact must satisfy.
///
/// Defaults target WhatsApp: 16 MB, 3 minutes, H.264/AAC in MP4.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Hard ceiling on output file size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    /// Maximum duration in seconds.
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f64,
    /// Target video codec.
    pub video_codec: VideoCodec,
    /// Target audio codec.
    pub audio_codec: AudioCodec,
    /// x264 speed/quality preset.
    #[serde(default = "default_preset")]
    pub preset: String,
    /// Constant rate factor for the single pass-through re-encode.
    #[serde(default = "default_crf")]
    pub crf: u32,
    /// Fixed audio bitrate (ffmpeg notation, e.g. "128k").
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,
    /// Output container.
    pub container: Container,
}

fn default_max_bytes() -> u64 {
    16_000_000
}
fn default_max_duration() -> f64 {
    180.0
}
fn default_preset() -> String {
    "medium".into()
}
fn default_crf() -> u32 {
    23
}
fn default_audio_bitrate() -> String {
    "128k".into()
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            max_duration_secs: default_max_duration(),
            video_codec: VideoCodec::H264,
            audio_codec: AudioCodec::Aac,
            preset: default_preset(),
            crf: default_crf(),
            audio_bitrate: default_audio_bitrate(),
            container: Container::Mp4,
        }
    }
}
