//! The [`Prober`] capability trait.

use std::path::Path;

use async_trait::async_trait;

use crate::types::MediaMetadata;

/// A capability that reads metadata from a local media file.
///
/// Implementations must not cache: the pipeline probes the same path before
/// and after re-encoding and relies on every call reflecting the file's
/// current on-disk state.
#[async_trait]
pub trait Prober: Send + Sync {
    /// A short name identifying the prober backend (e.g. "ffprobe").
    fn name(&self) -> &'static str;

    /// Probe the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`waclip_core::Error::Probe`] if the file is unreadable, is
    /// not a valid media container, or has no video stream.
    async fn probe(&self, path: &Path) -> waclip_core::Result<MediaMetadata>;
}
