use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "waclip")]
#[command(
    author,
    version,
    about = "Download social-media videos and convert them for WhatsApp delivery"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download a video URL and convert it for WhatsApp
    Run {
        /// URL of the video to process (YouTube, TikTok, or Instagram)
        #[arg(required = true)]
        url: String,

        /// Disable the compression ladder (may produce files too large for
        /// WhatsApp)
        #[arg(long)]
        no_compress: bool,

        /// Keep the original downloaded file
        #[arg(long)]
        keep_original: bool,
    },

    /// Probe a media file and display information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Manage stored platform credentials
    Cookies {
        #[command(subcommand)]
        action: CookiesAction,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum CookiesAction {
    /// Import an Instagram cookie export (Netscape HTTP Cookie File format)
    Import {
        /// Path to the exported cookie file
        file: PathBuf,
    },

    /// Remove stored Instagram cookies
    Clear,
}
