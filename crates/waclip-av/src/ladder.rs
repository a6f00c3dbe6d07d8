//! The compression ladder engine.
//!
//! A fixed, ordered sequence of quality tiers is tried from highest to
//! lowest. Each attempt encodes into a temporary path, probes the result,
//! and accepts the first output that fits the size ceiling; the ladder is
//! strictly descending in quality, so the first success is also the
//! highest-quality acceptable result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use waclip_core::config::DeliveryConfig;
use waclip_probe::Prober;

use crate::transcode::{EncodeParams, ScaleSpec, Transcoder};

/// One rung of the compression ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tier {
    /// Human-readable label used in logs and error context.
    pub label: &'static str,
    /// Downscale bounding box.
    pub width: u32,
    /// Downscale bounding box.
    pub height: u32,
    /// Constant rate factor (higher = smaller/worse).
    pub crf: u32,
    /// Instantaneous video bitrate cap.
    pub max_rate: &'static str,
    /// Rate-control buffer size paired with `max_rate`.
    pub buf_size: &'static str,
}

/// The fixed tier sequence, highest quality first.
pub const TIERS: [Tier; 4] = [
    Tier {
        label: "720p",
        width: 1280,
        height: 720,
        crf: 23,
        max_rate: "2000k",
        buf_size: "4000k",
    },
    Tier {
        label: "480p",
        width: 854,
        height: 480,
        crf: 28,
        max_rate: "1200k",
        buf_size: "2400k",
    },
    Tier {
        label: "360p",
        width: 640,
        height: 360,
        crf: 32,
        max_rate: "800k",
        buf_size: "1600k",
    },
    Tier {
        label: "270p",
        width: 480,
        height: 270,
        crf: 35,
        max_rate: "500k",
        buf_size: "1000k",
    },
];

/// Searches the tier sequence for the highest quality encode that fits the
/// delivery size ceiling.
pub struct CompressionLadder {
    transcoder: Arc<dyn Transcoder>,
    prober: Arc<dyn Prober>,
    tiers: &'static [Tier],
}

impl CompressionLadder {
    /// Create a ladder over the default [`TIERS`] sequence.
    pub fn new(transcoder: Arc<dyn Transcoder>, prober: Arc<dyn Prober>) -> Self {
        Self {
            transcoder,
            prober,
            tiers: &TIERS,
        }
    }

    /// Create a ladder over a custom tier sequence.
    pub fn with_tiers(
        transcoder: Arc<dyn Transcoder>,
        prober: Arc<dyn Prober>,
        tiers: &'static [Tier],
    ) -> Self {
        Self {
            transcoder,
            prober,
            tiers,
        }
    }

    /// Run the ladder: encode `input` at each tier until an output fits
    /// `delivery.max_bytes`, then move it to `output` and return that path.
    ///
    /// A transcode failure at a single tier is logged and the ladder
    /// advances; lower tiers have smaller targets and simpler encodes, so
    /// they may still succeed. Cancellation is checked between tiers.
    ///
    /// # Errors
    ///
    /// - [`waclip_core::Error::CompressionExhausted`] if every tier
    ///   produced an oversized file.
    /// - [`waclip_core::Error::Transcode`] if every tier errored outright.
    /// - [`waclip_core::Error::Cancelled`] if the token fired between tiers.
    ///
    /// In every error case the temporary tier file has been removed.
    pub async fn compress(
        &self,
        input: &Path,
        output: &Path,
        delivery: &DeliveryConfig,
        cancel: &CancellationToken,
    ) -> waclip_core::Result<PathBuf> {
        let tmp = tier_temp_path(output);
        let mut attempts = 0usize;
        let mut smallest: Option<u64> = None;
        let mut last_error: Option<waclip_core::Error> = None;
        let mut any_encoded = false;

        for tier in self.tiers {
            if cancel.is_cancelled() {
                remove_if_present(&tmp);
                return Err(waclip_core::Error::Cancelled);
            }

            attempts += 1;
            let params = EncodeParams {
                video_codec: delivery.video_codec,
                audio_codec: delivery.audio_codec,
                audio_bitrate: delivery.audio_bitrate.clone(),
                preset: delivery.preset.clone(),
                crf: tier.crf,
                max_rate: tier.max_rate.into(),
                buf_size: tier.buf_size.into(),
                scale: Some(ScaleSpec {
                    width: tier.width,
                    height: tier.height,
                }),
            };

            tracing::info!(
                "Ladder tier {} (crf {}, cap {})",
                tier.label,
                tier.crf,
                tier.max_rate
            );

            if let Err(e) = self.transcoder.transcode(input, &tmp, &params).await {
                tracing::warn!("Tier {} failed, descending: {e}", tier.label);
                remove_if_present(&tmp);
                last_error = Some(waclip_core::Error::transcode(tier.label, e.to_string()));
                continue;
            }
            any_encoded = true;

            let meta = match self.prober.probe(&tmp).await {
                Ok(meta) => meta,
                Err(e) => {
                    // A freshly written file we cannot probe is an
                    // environment fault, not a tier-sized-wrong outcome.
                    remove_if_present(&tmp);
                    return Err(e);
                }
            };

            if meta.byte_size <= delivery.max_bytes {
                promote(&tmp, output)?;
                tracing::info!(
                    "Tier {} accepted: {:.2} MB at {}x{}",
                    tier.label,
                    meta.megabytes(),
                    meta.width,
                    meta.height
                );
                return Ok(output.to_path_buf());
            }

            tracing::info!(
                "Tier {} oversized ({} bytes > {} bytes), descending",
                tier.label,
                meta.byte_size,
                delivery.max_bytes
            );
            smallest = Some(smallest.map_or(meta.byte_size, |s| s.min(meta.byte_size)));
            remove_if_present(&tmp);
        }

        if !any_encoded {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        Err(waclip_core::Error::CompressionExhausted {
            attempts,
            smallest_bytes: smallest.unwrap_or(0),
            limit_bytes: delivery.max_bytes,
        })
    }
}

/// Temporary encode target: a hidden sibling of the final output, so a
/// failed or oversized attempt never touches a previously accepted file.
fn tier_temp_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    output.with_file_name(format!(".{name}.part"))
}

/// Move an accepted tier output into place. Rename first (same
/// filesystem), fall back to copy+remove.
fn promote(tmp: &Path, output: &Path) -> waclip_core::Result<()> {
    if std::fs::rename(tmp, output).is_err() {
        std::fs::copy(tmp, output)?;
        let _ = std::fs::remove_file(tmp);
    }
    Ok(())
}

fn remove_if_present(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove temp file {}: {e}", path.display());
        }
    }
}
