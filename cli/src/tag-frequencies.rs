//! # tag-frequencies
//!
//! Prints how many VK posts matched a hashtag during each of the last N hours.
//!
//! Settings are layered: built-in defaults, then an optional JSON settings
//! file, then environment variables and command-line flags. `.env` files are
//! loaded before anything else.
//!
//! ```text
//! tag-frequencies '#rust' --hours 24 --concurrency 6 --format json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{error, info};

use lib_common::configs::NewsfeedSettings;
use lib_common::loggers::{setup_logging, LogSettings};
use lib_common::retrieve::DispatchMode;
use lib_common::social::vk::HourlyFrequency;
use lib_common::social::windows::WindowAnchoring;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One `hours_before<TAB>start<TAB>end<TAB>count` line per window.
    Plain,
    /// The whole series as a JSON array.
    Json,
    /// Just the counts, as a JSON array.
    Counts,
}

#[derive(Parser, Debug, Clone)]
#[clap(about = "Per-hour VK newsfeed frequencies for a hashtag", version)]
struct Cli {
    /// Hashtag or keyword to search for.
    tag: String,

    #[clap(long, short = 'H', default_value_t = 24, help = "Number of one-hour windows to query.")]
    hours: u32,

    #[clap(long, env = "VK_ACCESS_TOKEN", hide_env_values = true, help = "Service access token.")]
    token: Option<String>,

    #[clap(long, env = "VK_TOKEN_FILE", help = "File holding the access token.")]
    token_file: Option<PathBuf>,

    #[clap(long, env = "TAGFREQ_CONFIG_PATH", help = "Path to the JSON settings file.")]
    config_path: Option<PathBuf>,

    #[clap(long, env = "TAGFREQ_HOST", help = "API host.")]
    host: Option<String>,

    #[clap(long, env = "TAGFREQ_PORT", help = "API port.")]
    port: Option<u16>,

    #[clap(long, env = "TAGFREQ_INSECURE", help = "Use plain HTTP instead of HTTPS.")]
    insecure: bool,

    #[clap(long, env = "TAGFREQ_CONCURRENCY", help = "Requests in flight; omit for sequential dispatch.")]
    concurrency: Option<usize>,

    #[clap(long, env = "TAGFREQ_TIMEOUT_SECS", help = "Per-request timeout in seconds.")]
    timeout_secs: Option<u64>,

    #[clap(long, env = "TAGFREQ_RETRIES", help = "Retries for transient failures (default 0).")]
    retries: Option<u32>,

    #[clap(long, help = "Read the clock once per window instead of once per batch.")]
    per_window_clock: bool,

    #[clap(long, value_enum, default_value_t = OutputFormat::Plain)]
    format: OutputFormat,
}

impl Cli {
    // Flags and env override file values, which override defaults.
    fn merge_into(&self, mut settings: NewsfeedSettings) -> Result<NewsfeedSettings> {
        if let Some(host) = &self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if self.insecure {
            settings.use_tls = false;
        }
        if let Some(limit) = self.concurrency {
            settings.dispatch = DispatchMode::concurrent(limit)?;
        }
        if let Some(secs) = self.timeout_secs {
            settings.transport.timeout = std::time::Duration::from_secs(secs);
        }
        if let Some(retries) = self.retries {
            settings.transport.max_retries = retries;
        }
        if self.per_window_clock {
            settings.anchoring = WindowAnchoring::PerWindow;
        }
        if self.token_file.is_some() {
            settings.token_file = self.token_file.clone();
        }
        Ok(settings)
    }
}

fn load_settings(cli: &Cli) -> Result<NewsfeedSettings> {
    let from_file = match &cli.config_path {
        Some(path) => NewsfeedSettings::from_json_file(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => NewsfeedSettings::default(),
    };
    cli.merge_into(from_file)
}

fn render(series: &[HourlyFrequency], format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(series)?,
        OutputFormat::Counts => {
            let counts: Vec<i64> = series.iter().map(|p| p.count).collect();
            serde_json::to_string(&counts)?
        }
        OutputFormat::Plain => series
            .iter()
            .map(|p| {
                format!(
                    "{}\t{}\t{}\t{}",
                    p.hours_before,
                    p.window.start(),
                    p.window.end(),
                    p.count
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let _guard = setup_logging(&LogSettings::from_env("tag-frequencies"))
        .context("initializing logging")?;

    let settings = load_settings(&cli)?;
    let token = settings
        .resolve_token(cli.token.as_deref())
        .context("resolving the access token")?;
    let client = settings.client(token);

    info!(tag = %cli.tag, hours = cli.hours, ?client, "querying frequencies");

    let series = match client.get_frequency_series(&cli.tag, cli.hours).await {
        Ok(series) => series,
        Err(e) => {
            error!(kind = e.kind(), "{e}");
            return Err(e).context(format!("fetching frequencies for {}", cli.tag));
        }
    };

    println!("{}", render(&series, cli.format)?);
    Ok(())
}
