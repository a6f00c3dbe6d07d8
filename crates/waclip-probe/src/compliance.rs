//! Pure decision function: how much work does a source file need to satisfy
//! a delivery profile?

use waclip_core::config::DeliveryConfig;

use crate::types::MediaMetadata;

/// Resolution ceiling for direct delivery.
pub const MAX_WIDTH: u32 = 1280;
/// Resolution ceiling for direct delivery.
pub const MAX_HEIGHT: u32 = 720;

/// Three-way classification of a probed source file against the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The file already satisfies every delivery constraint; no re-encode.
    Compliant,
    /// The file fits the size ceiling but codec, resolution, or duration is
    /// non-conforming: one pass-through re-encode, no ladder.
    RecodeOnly,
    /// The file exceeds the size ceiling: run the full compression ladder.
    RecodeAndLadder,
}

/// Evaluate a metadata record against the delivery profile.
///
/// The size check dominates: an oversized file always takes the ladder path.
/// A file inside the size ceiling takes the cheap single-pass path, which
/// matters for cost since compliant and near-compliant inputs must not pay
/// for the full ladder search.
pub fn evaluate(meta: &MediaMetadata, delivery: &DeliveryConfig) -> Verdict {
    if meta.byte_size > delivery.max_bytes {
        return Verdict::RecodeAndLadder;
    }

    let compliant = meta.byte_size < delivery.max_bytes
        && meta.duration_secs < delivery.max_duration_secs
        && meta.codec_name == delivery.video_codec.to_string()
        && meta.width <= MAX_WIDTH
        && meta.height <= MAX_HEIGHT;

    if compliant {
        Verdict::Compliant
    } else {
        Verdict::RecodeOnly
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn meta(byte_size: u64, duration_secs: f64, codec: &str, width: u32, height: u32) -> MediaMetadata {
        MediaMetadata {
            path: PathBuf::from("in.mp4"),
            byte_size,
            duration_secs,
            bit_rate: 0,
            width,
            height,
            codec_name: codec.into(),
        }
    }

    #[test]
    fn small_h264_sd_clip_is_compliant() {
        let verdict = evaluate(&meta(10_000_000, 60.0, "h264", 640, 360), &DeliveryConfig::default());
        assert_eq!(verdict, Verdict::Compliant);
    }

    #[test]
    fn oversized_file_takes_the_ladder() {
        let verdict = evaluate(&meta(50_000_000, 60.0, "h264", 1920, 1080), &DeliveryConfig::default());
        assert_eq!(verdict, Verdict::RecodeAndLadder);
    }

    #[test]
    fn wrong_codec_within_size_is_recode_only() {
        let verdict = evaluate(&meta(10_000_000, 60.0, "hevc", 640, 360), &DeliveryConfig::default());
        assert_eq!(verdict, Verdict::RecodeOnly);
    }

    #[test]
    fn oversize_resolution_within_size_is_recode_only() {
        let verdict = evaluate(&meta(10_000_000, 60.0, "h264", 1920, 1080), &DeliveryConfig::default());
        assert_eq!(verdict, Verdict::RecodeOnly);
    }

    #[test]
    fn too_long_within_size_is_recode_only() {
        let verdict = evaluate(&meta(10_000_000, 240.0, "h264", 640, 360), &DeliveryConfig::default());
        assert_eq!(verdict, Verdict::RecodeOnly);
    }

    #[test]
    fn exactly_at_size_limit_is_not_compliant() {
        // The ceiling itself is excluded from the compliant band but does
        // not trigger the ladder.
        let delivery = DeliveryConfig::default();
        let verdict = evaluate(
            &meta(delivery.max_bytes, 60.0, "h264", 640, 360),
            &delivery,
        );
        assert_eq!(verdict, Verdict::RecodeOnly);
    }

    #[test]
    fn one_byte_over_limit_takes_the_ladder() {
        let delivery = DeliveryConfig::default();
        let verdict = evaluate(
            &meta(delivery.max_bytes + 1, 60.0, "h264", 640, 360),
            &delivery,
        );
        assert_eq!(verdict, Verdict::RecodeAndLadder);
    }

    #[test]
    fn boundary_resolution_is_compliant() {
        let verdict = evaluate(&meta(10_000_000, 60.0, "h264", 1280, 720), &DeliveryConfig::default());
        assert_eq!(verdict, Verdict::Compliant);
    }
}
