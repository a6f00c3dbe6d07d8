//! # waclip-av
//!
//! External-tool plumbing for the conversion pipeline: a command builder
//! with timeouts, tool discovery, the ffprobe-backed [`Prober`]
//! implementation, the ffmpeg-backed [`Transcoder`], and the compression
//! ladder engine that searches for the highest quality tier fitting the
//! size budget.
//!
//! [`Prober`]: waclip_probe::Prober

pub mod command;
pub mod ladder;
pub mod probe;
pub mod tools;
pub mod transcode;

// Re-export key types at crate root for convenience.
pub use command::{ToolCommand, ToolOutput};
pub use ladder::{CompressionLadder, Tier, TIERS};
pub use probe::FfprobeProber;
pub use tools::{ToolInfo, ToolRegistry};
pub use transcode::{EncodeParams, FfmpegTranscoder, ScaleSpec, Transcoder};
