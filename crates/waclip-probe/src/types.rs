//! Core metadata type produced by probing a local media file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Normalized metadata record for a local media file.
///
/// Produced fresh by every probe and never mutated; a re-encode is always
/// followed by a new probe rather than patching an old record, so a
/// `MediaMetadata` value always describes the file as it was at probe time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// The file that was probed.
    pub path: PathBuf,
    /// Total file size in bytes.
    pub byte_size: u64,
    /// Container-level duration in seconds.
    pub duration_secs: f64,
    /// Container-level overall bit rate in bits per second (0 if unknown).
    pub bit_rate: u64,
    /// Width of the first video stream.
    pub width: u32,
    /// Height of the first video stream.
    pub height: u32,
    /// Codec name of the first video stream as reported by the prober
    /// (e.g. "h264", "hevc", "vp9").
    pub codec_name: String,
}

impl MediaMetadata {
    /// File size in (decimal) megabytes, for human-facing output.
    pub fn megabytes(&self) -> f64 {
        self.byte_size as f64 / 1_000_000.0
    }
}
