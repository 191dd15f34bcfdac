use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use feedscout::feed::{DiscoveryRequest, FeedDiscovery};
use feedscout::net::HttpFetcher;
use feedscout::Config;

/// Get the default config file path (~/.config/feedscout/relays.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("feedscout")
        .join("relays.toml"))
}

#[derive(Parser, Debug)]
#[command(name = "feedscout", about = "Discover RSS/Atom/JSON feeds for a website")]
struct Args {
    /// Website or feed URL to discover feeds for
    url: String,

    /// Relay configuration file (defaults to ~/.config/feedscout/relays.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Per-attempt timeout override in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("feedscout=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from '{}'", config_path.display()))?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("feedscout/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let discovery = FeedDiscovery::new(
        Arc::new(HttpFetcher::new(client)),
        config.relay_endpoints(),
    )
    .with_direct_timeout(config.direct_timeout())
    .with_relay_timeout(config.relay_timeout());

    let mut request = DiscoveryRequest::new(&args.url);
    if let Some(secs) = args.timeout_secs {
        request = request.with_timeout(Duration::from_secs(secs));
    }

    let result = discovery.discover(&request).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.feeds.is_empty() {
        println!("No feeds found for {}", args.url);
    }
    for feed in &result.feeds {
        println!(
            "{:?}  {}  ({} items)  {}",
            feed.format,
            feed.title,
            feed.items.len(),
            feed.source_url
        );
    }
    for suggestion in &result.suggestions {
        println!("  hint [{:?}]: {}", suggestion.code, suggestion.detail);
    }

    Ok(())
}
