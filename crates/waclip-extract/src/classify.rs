//! Pure URL classification: map an arbitrary URL to a platform tag and a
//! canonical video identifier.
//!
//! Platforms are tried in the fixed priority order of
//! [`Platform::ALL`]. The pattern sets are disjoint in practice, so the
//! order only exists for determinism.

use std::sync::LazyLock;

use regex::Regex;
use waclip_core::{Error, Platform, Result};

/// A positively classified URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub platform: Platform,
    /// Platform-specific identifier: an 11-character YouTube id, a numeric
    /// TikTok id (or the raw URL for shortened links awaiting redirect
    /// resolution), or an Instagram shortcode / `story_<id>`.
    pub video_id: String,
}

static YOUTUBE_VALID: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^https?://(?:www\.)?youtube\.com/watch\?v=[\w-]+",
        r"^https?://(?:www\.)?youtube\.com/shorts/[\w-]+",
        r"^https?://youtu\.be/[\w-]+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

static YOUTUBE_ID: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?:v=|/)([\w-]{11})(?:\?|&|/|$)",
        r"shorts/([\w-]{11})(?:\?|&|/|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

static TIKTOK_VALID: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^https?://(?:www\.)?tiktok\.com/@[\w.-]+/video/\d+",
        r"^https?://(?:vm|vt)\.tiktok\.com/\w+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

static TIKTOK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"video/(\d+)").expect("static pattern"));

static INSTAGRAM_VALID: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^https?://(?:www\.)?instagram\.com/(?:p|tv)/[\w-]+",
        r"^https?://(?:www\.)?instagram\.com/stories/[\w.]+/\d+",
        r"^https?://(?:www\.)?instagram\.com/(?:[\w.]+/)?reel/[\w-]+/?",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

static INSTAGRAM_SHORTCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:p|reel|tv)/([A-Za-z0-9_-]+)").expect("static pattern"));

static INSTAGRAM_STORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"stories/[\w.]+/(\d+)").expect("static pattern"));

/// Whether the URL matches any of the platform's recognized shapes.
pub fn matches_platform(platform: Platform, url: &str) -> bool {
    let patterns = match platform {
        Platform::YouTube => &*YOUTUBE_VALID,
        Platform::TikTok => &*TIKTOK_VALID,
        Platform::Instagram => &*INSTAGRAM_VALID,
    };
    patterns.iter().any(|re| re.is_match(url))
}

/// Whether the URL is a shortened TikTok link whose numeric id is only
/// discovered by following the redirect during download.
pub fn is_shortened_tiktok(url: &str) -> bool {
    url.contains("vm.tiktok.com") || url.contains("vt.tiktok.com")
}

/// Classify a URL: first matching platform wins, then its identifier is
/// extracted.
///
/// # Errors
///
/// - [`Error::UnrecognizedUrl`] if no platform pattern matches.
/// - [`Error::IdentifierExtraction`] if a platform matched but no
///   identifier sub-pattern did (a malformed or unsupported URL shape
///   within a recognized platform).
pub fn classify(url: &str) -> Result<Classification> {
    for platform in Platform::ALL {
        if matches_platform(platform, url) {
            let video_id = extract_identifier(platform, url)?;
            return Ok(Classification { platform, video_id });
        }
    }
    Err(Error::UnrecognizedUrl { url: url.into() })
}

/// Extract the canonical identifier for an already-classified URL.
///
/// Only valid after a positive classification: calling this with a URL
/// that does not match the claimed platform's patterns fails with
/// [`Error::UnrecognizedUrl`].
pub fn extract_identifier(platform: Platform, url: &str) -> Result<String> {
    if !matches_platform(platform, url) {
        return Err(Error::UnrecognizedUrl { url: url.into() });
    }

    let id = match platform {
        Platform::YouTube => YOUTUBE_ID
            .iter()
            .find_map(|re| re.captures(url))
            .map(|c| c[1].to_string()),
        Platform::TikTok => {
            if is_shortened_tiktok(url) {
                // Identifier resolution is deferred: the raw URL stands in
                // until the extractor follows the redirect.
                Some(url.to_string())
            } else {
                TIKTOK_ID.captures(url).map(|c| c[1].to_string())
            }
        }
        Platform::Instagram => INSTAGRAM_SHORTCODE
            .captures(url)
            .map(|c| c[1].to_string())
            .or_else(|| {
                INSTAGRAM_STORY
                    .captures(url)
                    .map(|c| format!("story_{}", &c[1]))
            }),
    };

    id.ok_or_else(|| Error::IdentifierExtraction {
        platform,
        url: url.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn youtube_watch_url() {
        let c = classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(c.platform, Platform::YouTube);
        assert_eq!(c.video_id, "dQw4w9WgXcQ");
    }

    #[test]
    fn youtube_shorts_url() {
        let c = classify("https://youtube.com/shorts/abcDEF12345").unwrap();
        assert_eq!(c.platform, Platform::YouTube);
        assert_eq!(c.video_id, "abcDEF12345");
    }

    #[test]
    fn youtube_short_domain_url() {
        let c = classify("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert_eq!(c.platform, Platform::YouTube);
        assert_eq!(c.video_id, "dQw4w9WgXcQ");
    }

    #[test]
    fn youtube_watch_with_extra_params() {
        let c = classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s").unwrap();
        assert_eq!(c.video_id, "dQw4w9WgXcQ");
    }

    #[test]
    fn tiktok_standard_url() {
        let c = classify("https://www.tiktok.com/@some.user/video/7285950461412").unwrap();
        assert_eq!(c.platform, Platform::TikTok);
        assert_eq!(c.video_id, "7285950461412");
    }

    #[test]
    fn tiktok_shortened_url_defers_identifier() {
        let url = "https://vm.tiktok.com/ZMabc123/";
        let c = classify(url).unwrap();
        assert_eq!(c.platform, Platform::TikTok);
        // The raw URL stands in as the identifier.
        assert_eq!(c.video_id, url);
    }

    #[test]
    fn tiktok_vt_domain_is_shortened() {
        let url = "https://vt.tiktok.com/ZSabcdef";
        let c = classify(url).unwrap();
        assert_eq!(c.platform, Platform::TikTok);
        assert_eq!(c.video_id, url);
        assert!(is_shortened_tiktok(url));
    }

    #[test]
    fn instagram_post_url() {
        let c = classify("https://www.instagram.com/p/Cxyz123_ab/").unwrap();
        assert_eq!(c.platform, Platform::Instagram);
        assert_eq!(c.video_id, "Cxyz123_ab");
    }

    #[test]
    fn instagram_reel_url() {
        let c = classify("https://instagram.com/reel/Cab_456xyz/").unwrap();
        assert_eq!(c.platform, Platform::Instagram);
        assert_eq!(c.video_id, "Cab_456xyz");
    }

    #[test]
    fn instagram_user_scoped_reel_url() {
        let c = classify("https://www.instagram.com/some.user/reel/Cab456xyz/").unwrap();
        assert_eq!(c.platform, Platform::Instagram);
        assert_eq!(c.video_id, "Cab456xyz");
    }

    #[test]
    fn instagram_tv_url() {
        let c = classify("https://www.instagram.com/tv/Ctv789qrs/").unwrap();
        assert_eq!(c.video_id, "Ctv789qrs");
    }

    #[test]
    fn instagram_story_url_synthesizes_identifier() {
        let c = classify("https://www.instagram.com/stories/some.user/31415926535/").unwrap();
        assert_eq!(c.platform, Platform::Instagram);
        assert_eq!(c.video_id, "story_31415926535");
    }

    #[test]
    fn unrecognized_url_fails() {
        let err = classify("https://example.com/watch?v=dQw4w9WgXcQ").unwrap_err();
        assert!(matches!(err, Error::UnrecognizedUrl { .. }));
    }

    #[test]
    fn non_url_fails() {
        assert!(classify("not a url at all").is_err());
    }

    #[test]
    fn extract_identifier_rejects_wrong_platform() {
        let err =
            extract_identifier(Platform::YouTube, "https://www.tiktok.com/@u/video/1").unwrap_err();
        assert!(matches!(err, Error::UnrecognizedUrl { .. }));
    }

    #[test]
    fn classification_is_deterministic() {
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        assert_eq!(classify(url).unwrap(), classify(url).unwrap());
    }
}
