use anyhow::Context;
use clap::Parser;
use pxier_fetcher::{
    config::Config,
    database::SqliteStore,
    logging::init_logging,
    proxy::ProviderRegistry,
    scheduler::Scheduler,
    Result,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Harvests public proxy lists and keeps them in a database
#[derive(Parser)]
#[command(name = "pxier-fetcher")]
#[command(about = "Harvests public proxy lists and keeps them in a database")]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Database url, overrides the config file
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Log level used when RUST_LOG is unset, overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Run a single fetch cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level).context("failed to install log subscriber")?;

    let selected = config.validate()?;

    info!("opening database");
    let store = SqliteStore::connect(&config.database)
        .await
        .context("failed to open database")?;

    let registry = ProviderRegistry::default();
    let mut scheduler = Scheduler::new(Arc::new(store.clone()), config.fetcher.interval());
    for provider in registry.build_all(&selected, &config.providers)? {
        scheduler.register(provider);
    }

    if cli.once {
        let stats = scheduler.run_once().await;
        info!(
            touched = stats.touched,
            inserted = stats.inserted,
            failed = stats.failed,
            "fetch cycle finished"
        );
        store.close().await;
        return Ok(());
    }

    info!(interval = ?scheduler.interval(), "starting scheduler");
    tokio::select! {
        _ = scheduler.run() => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutting down");
        }
    }

    store.close().await;
    Ok(())
}
