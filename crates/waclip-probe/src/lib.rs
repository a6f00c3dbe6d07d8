//! # waclip-probe
//!
//! Normalized media metadata, the [`Prober`] capability trait, and the pure
//! compliance checker that decides how much work a source file needs to
//! satisfy a delivery profile.
//!
//! The actual ffprobe-backed implementation of [`Prober`] lives in
//! `waclip-av`; this crate only defines the seam so the decision logic can
//! be exercised without external tools.

pub mod compliance;
pub mod prober;
pub mod types;

// Re-export key types at crate root for convenience.
pub use compliance::{evaluate, Verdict};
pub use prober::Prober;
pub use types::MediaMetadata;
