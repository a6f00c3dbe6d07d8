//! Unified error type for the waclip application.
//!
//! All crates funnel their failures into [`Error`], which carries enough
//! context for the CLI to derive a process exit code via [`Error::exit_code`]
//! and a remediation hint via [`Error::guidance`].

use std::path::PathBuf;

use crate::media::Platform;

/// Unified error type covering all failure modes in waclip.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The URL matched no supported platform.
    #[error("unrecognized URL: {url}")]
    UnrecognizedUrl {
        /// The URL that failed classification.
        url: String,
    },

    /// The URL matched a platform but no identifier sub-pattern matched.
    #[error("could not extract a {platform} video id from {url}")]
    IdentifierExtraction {
        /// The platform whose patterns matched the URL.
        platform: Platform,
        /// The malformed or unsupported URL.
        url: String,
    },

    /// The platform requires stored credentials that are absent.
    #[error("{platform} authentication required")]
    AuthenticationRequired {
        /// The platform that demands credentials.
        platform: Platform,
    },

    /// The extractor reported success but the expected file is absent or empty.
    #[error("download verification failed: {}", path.display())]
    DownloadVerification {
        /// The path that was expected to hold the downloaded file.
        path: PathBuf,
    },

    /// Media probing failed.
    #[error("probe error: {0}")]
    Probe(String),

    /// A re-encode attempt failed.
    #[error("transcode failed [{stage}]: {message}")]
    Transcode {
        /// Tier label or pipeline stage that was encoding.
        stage: String,
        /// Human-readable error description.
        message: String,
    },

    /// Every compression tier produced an oversized file.
    #[error(
        "compression exhausted after {attempts} tiers; smallest result \
         {smallest_bytes} bytes exceeds the {limit_bytes} byte limit"
    )]
    CompressionExhausted {
        /// Number of tiers attempted.
        attempts: usize,
        /// Smallest output size achieved across all tiers.
        smallest_bytes: u64,
        /// The size ceiling that was never met.
        limit_bytes: u64,
    },

    /// An external tool (yt-dlp, ffmpeg, ffprobe) failed to run.
    #[error("tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// The run was cancelled by the caller.
    #[error("cancelled")]
    Cancelled,

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Configuration or input data failed validation.
    #[error("validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Map this error to the process exit code the CLI reports.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::UnrecognizedUrl { .. } | Error::IdentifierExtraction { .. } => 2,
            Error::AuthenticationRequired { .. } => 3,
            Error::DownloadVerification { .. } => 4,
            Error::Probe(_) => 5,
            Error::Transcode { .. } => 6,
            Error::CompressionExhausted { .. } => 7,
            Error::Tool { .. } => 8,
            Error::Cancelled => 130,
            Error::Io { .. } => 9,
            Error::Validation(_) => 10,
        }
    }

    /// A one-line remediation hint for user-facing output, when one exists.
    pub fn guidance(&self) -> Option<&'static str> {
        match self {
            Error::UnrecognizedUrl { .. } => {
                Some("supported platforms: YouTube, TikTok, Instagram")
            }
            Error::AuthenticationRequired { .. } => {
                Some("run `waclip cookies import <file>` with a Netscape cookie export")
            }
            Error::Tool { .. } => {
                Some("run `waclip check-tools` to see which external tools are missing")
            }
            Error::CompressionExhausted { .. } => {
                Some("the source is too long or too dense to fit the size limit")
            }
            _ => None,
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Transcode`].
    pub fn transcode(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Transcode {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
