//! Per-platform extractor adapters over yt-dlp.
//!
//! Each adapter downloads exactly one file into the destination directory,
//! named `<platform>_<id>.mp4`, and verifies the file exists and is
//! non-empty before returning. Authenticated platforms check the secret
//! store before any network call.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use waclip_av::{ToolCommand, ToolRegistry};
use waclip_core::{Error, Platform, Result};

use crate::classify;
use crate::cookies::{self, CookieStore};

/// Download timeout: 1 hour.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(3600);

/// Browser User-Agent presented to platforms that reject the default
/// yt-dlp identity.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// A capability that fetches a video URL into a local file.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// The platform this adapter serves.
    fn platform(&self) -> Platform;

    /// Download `url` into `dest_dir`, returning the path of the single
    /// file written.
    ///
    /// # Errors
    ///
    /// - [`Error::AuthenticationRequired`] when the platform needs stored
    ///   credentials and none exist (checked before any network call).
    /// - [`Error::DownloadVerification`] when the underlying tool reported
    ///   success but the expected file is absent or empty.
    /// - [`Error::Tool`] when yt-dlp itself fails.
    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;
}

/// Build the extractor adapter for a platform.
pub fn extractor_for(
    platform: Platform,
    tools: &ToolRegistry,
    cookie_store: Arc<dyn CookieStore>,
) -> Result<Box<dyn Extractor>> {
    let ytdlp = tools.require("yt-dlp")?.clone();
    Ok(match platform {
        Platform::YouTube => Box::new(YouTubeExtractor { ytdlp }),
        Platform::TikTok => Box::new(TikTokExtractor { ytdlp }),
        Platform::Instagram => Box::new(InstagramExtractor {
            ytdlp,
            cookie_store,
        }),
    })
}

/// Run yt-dlp with the shared base flags plus per-platform extras.
async fn run_ytdlp(ytdlp: &Path, url: &str, output_file: &Path, extra: &[String]) -> Result<()> {
    ToolCommand::new(ytdlp)
        .args(["--quiet", "--no-warnings"])
        .arg("-o")
        .arg_path(output_file)
        .args(extra.iter().cloned())
        .arg(url)
        .timeout(DOWNLOAD_TIMEOUT)
        .execute()
        .await?;
    Ok(())
}

/// Guard against silent partial failures in the underlying fetch tool: the
/// reported-successful download must exist and be non-empty.
fn verify_download(path: &Path) -> Result<PathBuf> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(path.to_path_buf()),
        _ => Err(Error::DownloadVerification {
            path: path.to_path_buf(),
        }),
    }
}

// ---------------------------------------------------------------------------
// YouTube
// ---------------------------------------------------------------------------

pub struct YouTubeExtractor {
    ytdlp: PathBuf,
}

#[async_trait]
impl Extractor for YouTubeExtractor {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let id = classify::extract_identifier(Platform::YouTube, url)?;
        std::fs::create_dir_all(dest_dir)?;
        let output_file = dest_dir.join(format!("youtube_{id}.mp4"));

        tracing::info!("Downloading YouTube video {id}");
        run_ytdlp(
            &self.ytdlp,
            url,
            &output_file,
            &["-f".into(), "best[ext=mp4]".into()],
        )
        .await?;

        verify_download(&output_file)
    }
}

// ---------------------------------------------------------------------------
// TikTok
// ---------------------------------------------------------------------------

pub struct TikTokExtractor {
    ytdlp: PathBuf,
}

impl TikTokExtractor {
    /// Filename stem for the download. Shortened links carry the raw URL
    /// as their identifier; the trailing short code stands in until the
    /// redirect resolves, since a URL cannot name a file.
    fn file_stem(id: &str) -> &str {
        if id.starts_with("http") {
            id.trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or("video")
        } else {
            id
        }
    }
}

#[async_trait]
impl Extractor for TikTokExtractor {
    fn platform(&self) -> Platform {
        Platform::TikTok
    }

    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let id = classify::extract_identifier(Platform::TikTok, url)?;
        std::fs::create_dir_all(dest_dir)?;
        let output_file = dest_dir.join(format!("tiktok_{}.mp4", Self::file_stem(&id)));

        tracing::info!("Downloading TikTok video {url}");
        run_ytdlp(
            &self.ytdlp,
            url,
            &output_file,
            &[
                "-f".into(),
                "best".into(),
                "--user-agent".into(),
                BROWSER_USER_AGENT.into(),
            ],
        )
        .await?;

        verify_download(&output_file)
    }
}

// ---------------------------------------------------------------------------
// Instagram
// ---------------------------------------------------------------------------

pub struct InstagramExtractor {
    ytdlp: PathBuf,
    cookie_store: Arc<dyn CookieStore>,
}

#[async_trait]
impl Extractor for InstagramExtractor {
    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    async fn fetch(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        let id = classify::extract_identifier(Platform::Instagram, url)?;

        // Credentials are mandatory; an unauthenticated fetch is known to
        // fail, so bail before touching the network.
        let cookie_map = self
            .cookie_store
            .get(cookies::SERVICE_NAME, cookies::INSTAGRAM_COOKIE_KEY)?
            .filter(|m| !m.is_empty())
            .ok_or(Error::AuthenticationRequired {
                platform: Platform::Instagram,
            })?;

        std::fs::create_dir_all(dest_dir)?;
        let output_file = dest_dir.join(format!("instagram_{id}.mp4"));

        // yt-dlp takes cookies as a Netscape file; materialize the stored
        // map into a temp file that lives for the duration of the run.
        let mut cookie_file = tempfile::NamedTempFile::new()?;
        cookie_file.write_all(cookies::to_netscape(&cookie_map, ".instagram.com").as_bytes())?;
        cookie_file.flush()?;

        tracing::info!("Downloading Instagram video {id}");
        run_ytdlp(
            &self.ytdlp,
            url,
            &output_file,
            &[
                "-f".into(),
                "best".into(),
                "--user-agent".into(),
                BROWSER_USER_AGENT.into(),
                "--cookies".into(),
                cookie_file.path().to_string_lossy().into_owned(),
            ],
        )
        .await?;

        verify_download(&output_file)
    }
}
