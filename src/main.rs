use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use creator_leaderboard::api::state::AppState;
use creator_leaderboard::config::{AppConfig, ScrapeSource};
use creator_leaderboard::fetch::{HttpPageSource, LeaderboardClient};
use creator_leaderboard::models::{MindshareUnit, NewEntry, Season};
use creator_leaderboard::scheduler::{RunOutcome, Scheduler, SnapshotSource};
use creator_leaderboard::scrape::HtmlScraper;
use creator_leaderboard::storage::{LeaderboardStore, StorageConfig};

#[derive(Parser)]
#[command(name = "creator-leaderboard")]
#[command(about = "Creator program leaderboard across five seasons")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        /// Bind address
        #[arg(long)]
        host: Option<String>,

        /// Port number
        #[arg(long)]
        port: Option<u16>,
    },

    /// Take leaderboard snapshots with the configured source
    Scrape {
        /// Run once and exit
        #[arg(long)]
        once: bool,

        /// Run continuously at the configured interval
        #[arg(long)]
        watch: bool,
    },

    /// Import a JSON array of rows as one batch for a season
    Import {
        /// Target season (s1..s5)
        #[arg(long)]
        season: String,

        /// JSON file with `[{rank, username, handle, mindshare}, ...]`
        #[arg(long)]
        file: PathBuf,

        /// Mindshare unit for every row (score, prize_usd)
        #[arg(long)]
        unit: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(Path::new(&cli.config))
        .with_context(|| format!("loading {}", cli.config))?;
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = PathBuf::from(data_dir);
    }
    let log_level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting creator-leaderboard v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(LeaderboardStore::new(StorageConfig::new(
        config.data_dir.clone(),
    )));

    match cli.command {
        Commands::Serve { host, port } => {
            let client = build_client(&config)?;
            let scheduler = Arc::new(build_scheduler(&config, store.clone(), client.clone())?);

            if config.scraper.enabled {
                tokio::spawn(scheduler.clone().run_periodic());
            } else {
                tracing::info!("Periodic scraper disabled");
            }

            let state = AppState {
                store,
                client,
                scheduler,
                cors_origin: config.server.cors_origin.clone(),
            };
            let app = creator_leaderboard::api::build_router(state);

            let addr = format!(
                "{}:{}",
                host.unwrap_or(config.server.host),
                port.unwrap_or(config.server.port)
            );
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("Listening on http://{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Commands::Scrape { once, watch } => {
            let client = build_client(&config)?;
            let scheduler = Arc::new(build_scheduler(&config, store, client)?);

            if watch {
                scheduler.run_periodic().await;
            } else if once {
                match scheduler.run_once().await {
                    RunOutcome::Completed { saved } => {
                        tracing::info!("Scrape complete: {} rows saved", saved)
                    }
                    RunOutcome::Failed(msg) => bail!("scrape failed: {}", msg),
                    RunOutcome::Skipped => tracing::warn!("Scrape skipped"),
                }
            } else {
                eprintln!("Specify --once or --watch");
            }
        }
        Commands::Import { season, file, unit } => {
            let season: Season = season.parse().map_err(anyhow::Error::msg)?;
            let unit: Option<MindshareUnit> = unit
                .map(|u| u.parse())
                .transpose()
                .map_err(anyhow::Error::msg)?;

            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let mut rows: Vec<NewEntry> = serde_json::from_str(&contents)
                .with_context(|| format!("parsing {}", file.display()))?;
            if let Some(unit) = unit {
                for row in &mut rows {
                    row.mindshare_unit = unit;
                }
            }

            let saved = store.save_batch(season, rows)?;
            tracing::info!("Imported {} rows into {}", saved.len(), season);
        }
    }

    Ok(())
}

fn build_client(config: &AppConfig) -> Result<LeaderboardClient> {
    let source = HttpPageSource::new(&config.upstream.fetcher_config())?;
    Ok(LeaderboardClient::new(Arc::new(source))
        .with_page_limits(config.upstream.max_pages, config.upstream.search_max_pages))
}

fn build_scheduler(
    config: &AppConfig,
    store: Arc<LeaderboardStore>,
    client: LeaderboardClient,
) -> Result<Scheduler> {
    let Some(interval) = config.scraper.interval() else {
        bail!("invalid scraper interval: {}", config.scraper.interval);
    };

    let source = match &config.scraper.source {
        ScrapeSource::Api { timeframe } => SnapshotSource::Api {
            client,
            timeframe: *timeframe,
        },
        ScrapeSource::Html { url } => SnapshotSource::Html {
            scraper: HtmlScraper::new(&config.upstream.user_agent, config.upstream.timeout())?,
            url: url.clone(),
        },
    };

    Ok(Scheduler::new(store, source, config.scraper.season, interval))
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
