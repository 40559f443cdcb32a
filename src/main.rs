use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use match_watcher::{
    config::{AppConfig, LoggingConfig},
    web::{self, AppState},
    ChromeFetcher, MatchRegistry, MatchScheduler, MatchTracker, SelectorExtractor,
};

#[derive(Debug, Parser)]
#[command(name = "match-watcher", version, about = "Tracks live match scores from rendered pages")]
struct Args {
    /// Extra configuration file layered over config/default.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides server.port
    #[arg(short, long)]
    port: Option<u16>,

    /// Starts without the periodic refresh job
    #[arg(long)]
    no_scheduler: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.no_scheduler {
        config.scheduler.enabled = false;
    }

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(&config.logging)?;

    info!("Starting Match Watcher...");

    let fetcher = Arc::new(ChromeFetcher::new(config.browser.clone()));
    let extractor = Arc::new(SelectorExtractor::new(&config.extractor, &config.labels)?);
    let registry = Arc::new(MatchRegistry::new());
    let tracker = Arc::new(MatchTracker::new(registry, fetcher, extractor, &config));

    let mut scheduler = MatchScheduler::new(Arc::clone(&tracker), config.scheduler.clone()).await?;
    scheduler.start().await?;
    let scheduler = Arc::new(tokio::sync::Mutex::new(scheduler));

    let state = AppState {
        tracker,
        scheduler: Arc::clone(&scheduler),
        config: config.clone(),
    };

    web::serve(&config.server, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
    })
    .await?;

    info!("Shutting down...");
    scheduler.lock().await.shutdown().await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("match_watcher=info,tower_http=info"));

    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, &logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
