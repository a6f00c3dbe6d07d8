mod cli;

use clap::Parser;
use cli::{Cli, Commands, CookiesAction};
use waclip::pipeline::{Pipeline, RunOptions};
use waclip_av::{FfprobeProber, ToolRegistry};
use waclip_core::config::Config;
use waclip_extract::cookies::{self, parse_netscape};
use waclip_extract::{CookieStore, FileCookieStore};
use waclip_probe::Prober;

fn main() {
    let cli = Cli::parse();

    // Initialize logging. Respect RUST_LOG if set, otherwise pick defaults
    // based on the verbose flag.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "waclip=debug,waclip_core=debug,waclip_probe=debug,waclip_av=debug,waclip_extract=debug"
                .to_string()
        } else {
            "waclip=info,waclip_av=info,waclip_extract=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config = Config::load_or_default(cli.config.as_deref());

    let result = match cli.command {
        Commands::Run {
            url,
            no_compress,
            keep_original,
        } => run_url(config, &url, no_compress, keep_original),
        Commands::Probe { file, json } => probe_file(config, &file, json),
        Commands::CheckTools => check_tools(config),
        Commands::Cookies { action } => manage_cookies(action),
        Commands::Validate { file } => validate_config(file.or(cli.config).as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        if let Some(hint) = e.guidance() {
            eprintln!("hint: {hint}");
        }
        std::process::exit(e.exit_code());
    }
}

fn run_url(
    config: Config,
    url: &str,
    no_compress: bool,
    keep_original: bool,
) -> waclip_core::Result<()> {
    // Classification is pure; reject an unrecognized URL before bothering
    // with tool discovery.
    waclip_extract::classify(url)?;

    let max_bytes = config.delivery.max_bytes;
    let rt = tokio::runtime::Runtime::new()?;

    rt.block_on(async {
        let pipeline = Pipeline::from_config(config)?;

        // Ctrl-C cancels between pipeline stages; partial files are cleaned
        // up the same way the failure path does.
        let cancel = pipeline.cancellation_token();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received; cancelling after the current step");
                cancel.cancel();
            }
        });

        let opts = RunOptions {
            compress: !no_compress,
            keep_original,
        };
        let outcome = pipeline.process_url(url, &opts).await?;

        println!("Output: {}", outcome.output.display());
        let verdict = if outcome.metadata.byte_size <= max_bytes {
            "WhatsApp ready"
        } else {
            "too large for WhatsApp"
        };
        println!("Size: {:.1} MB ({verdict})", outcome.metadata.megabytes());
        Ok(())
    })
}

fn probe_file(config: Config, file: &std::path::Path, json: bool) -> waclip_core::Result<()> {
    if !file.exists() {
        return Err(waclip_core::Error::Probe(format!(
            "file does not exist: {}",
            file.display()
        )));
    }

    let tools = ToolRegistry::discover(&config.tools);
    let prober = FfprobeProber::from_registry(&tools)?;

    let rt = tokio::runtime::Runtime::new()?;
    let metadata = rt.block_on(prober.probe(file))?;

    if json {
        let json_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| waclip_core::Error::Validation(e.to_string()))?;
        println!("{json_str}");
    } else {
        println!("File: {}", metadata.path.display());
        println!("Size: {} bytes ({:.2} MB)", metadata.byte_size, metadata.megabytes());
        println!("Duration: {:.1}s", metadata.duration_secs);
        println!(
            "Video: {} {}x{}",
            metadata.codec_name, metadata.width, metadata.height
        );
        if metadata.bit_rate > 0 {
            println!("Bit rate: {} b/s", metadata.bit_rate);
        }
    }

    Ok(())
}

fn check_tools(config: Config) -> waclip_core::Result<()> {
    println!("Checking external tools...\n");

    let tools = ToolRegistry::discover(&config.tools);
    let mut all_ok = true;

    for tool in tools.check_all() {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);
        if let Some(ref version) = tool.version {
            print!(" ({version})");
        }
        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }
        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. Install them to enable all features.");
    }

    Ok(())
}

fn manage_cookies(action: CookiesAction) -> waclip_core::Result<()> {
    let store = FileCookieStore::default_location()?;

    match action {
        CookiesAction::Import { file } => {
            let contents = std::fs::read_to_string(&file)?;
            let parsed = parse_netscape(&contents);
            if parsed.is_empty() {
                return Err(waclip_core::Error::Validation(format!(
                    "no cookies found in {} (expected Netscape HTTP Cookie File format)",
                    file.display()
                )));
            }
            store.set(cookies::SERVICE_NAME, cookies::INSTAGRAM_COOKIE_KEY, &parsed)?;
            println!("Imported {} cookies", parsed.len());
            println!("You can now delete the exported cookie file: {}", file.display());
        }
        CookiesAction::Clear => {
            if store.clear(cookies::SERVICE_NAME, cookies::INSTAGRAM_COOKIE_KEY)? {
                println!("Cleared stored cookies");
            } else {
                println!("No cookies were stored");
            }
        }
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> waclip_core::Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {}", p.display());
            let contents = std::fs::read_to_string(p)?;
            Config::from_json(&contents)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        for warning in &warnings {
            println!("⚠ {warning}");
        }
    }
    println!("  Download dir: {}", config.paths.download_dir.display());
    println!("  Output dir: {}", config.paths.output_dir.display());
    println!(
        "  Delivery: {} / {} in {}, max {:.1} MB, max {:.0}s",
        config.delivery.video_codec,
        config.delivery.audio_codec,
        config.delivery.container,
        config.delivery.max_bytes as f64 / 1_000_000.0,
        config.delivery.max_duration_secs
    );

    Ok(())
}
