use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

use hotrank::cache::{DelayedRowScheduler, Inventory};
use hotrank::clock::SystemClock;
use hotrank::config::{load_config, Config};
use hotrank::session::{SessionSweeper, ViewPopularityTracker};
use hotrank::shutdown::Shutdown;
use hotrank::store::MemoryStore;
use hotrank::types::RowId;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Number of worker threads (defaults to number of CPU cores)
    #[arg(short, long)]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    hotrank::logging::init_dual_logging();

    let args = Args::parse();

    let num_cpus = std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);
    let worker_threads = args.threads.unwrap_or(num_cpus);

    // Single-threaded runtime avoids cross-core chatter when one core is enough
    if worker_threads == 1 {
        info!("Starting hotrank with single-threaded runtime");
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        rt.block_on(run(args))
    } else {
        info!(
            "Starting hotrank with {} worker threads (detected {} CPUs)",
            worker_threads, num_cpus
        );
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .enable_all()
            .build()?;
        rt.block_on(run(args))
    }
}

async fn run(args: Args) -> Result<()> {
    let config = if std::path::Path::new(&args.config).exists() {
        match load_config(&args.config) {
            Ok(config) => config,
            Err(e) => {
                error!(
                    "Failed to load existing config file '{}': {}",
                    args.config, e
                );
                error!("Please check your config file syntax and try again");
                return Err(e);
            }
        }
    } else {
        warn!(
            "Config file '{}' not found, creating default config",
            args.config
        );
        let default_config = Config::default();
        let config_toml = toml::to_string_pretty(&default_config)?;
        std::fs::write(&args.config, &config_toml)?;
        info!("Created default config file: {}", args.config);
        default_config
    };

    info!(
        capacity = config.session.capacity,
        sweep_batch = config.session.sweep_batch,
        decay_interval_secs = config.popularity.decay_interval_secs,
        "configuration loaded"
    );

    let clock = Arc::new(SystemClock);
    let store = Arc::new(MemoryStore::new(clock.clone()));
    let shutdown = Shutdown::new();

    let sweeper = SessionSweeper::new(store.clone())
        .with_capacity(config.session.capacity)
        .with_batch_max(config.session.sweep_batch);
    let popularity = ViewPopularityTracker::new(store.clone())
        .with_decay_interval(Duration::from_secs(config.popularity.decay_interval_secs));

    let mut tasks = Vec::new();
    tasks.push(tokio::spawn({
        let shutdown = shutdown.clone();
        async move { sweeper.run(shutdown).await }
    }));
    tasks.push(tokio::spawn({
        let shutdown = shutdown.clone();
        async move { popularity.run(shutdown).await }
    }));

    // The row re-cache driver needs an inventory to fetch from; without a
    // configured snapshot it has nothing to serve and stays off
    match &config.scheduler.snapshot_path {
        Some(path) => {
            let inventory = Arc::new(SnapshotInventory::load(path)?);
            let scheduler = DelayedRowScheduler::new(store.clone(), clock.clone(), inventory);
            tasks.push(tokio::spawn({
                let shutdown = shutdown.clone();
                async move { scheduler.run(shutdown).await }
            }));
        }
        None => info!("no inventory snapshot configured, row re-cache driver disabled"),
    }

    shutdown_signal().await;
    info!("Shutdown signal received, stopping background tasks...");
    shutdown.cancel();
    for task in tasks {
        if let Err(e) = task.await {
            error!("Background task panicked during shutdown: {}", e);
        }
    }
    info!("Graceful shutdown complete");
    Ok(())
}

/// Inventory rows loaded once from a JSON file of `{"<row id>": <snapshot>}`
#[derive(Debug)]
struct SnapshotInventory {
    rows: HashMap<u64, serde_json::Value>,
}

impl SnapshotInventory {
    fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read inventory snapshot '{path}'"))?;
        let raw: HashMap<String, serde_json::Value> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse inventory snapshot '{path}'"))?;

        let mut rows = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            let id: u64 = key
                .parse()
                .with_context(|| format!("Invalid row id '{key}' in inventory snapshot"))?;
            rows.insert(id, value);
        }
        info!(rows = rows.len(), "inventory snapshot loaded");
        Ok(Self { rows })
    }
}

#[async_trait]
impl Inventory for SnapshotInventory {
    async fn fetch_row(&self, row: RowId) -> anyhow::Result<serde_json::Value> {
        self.rows
            .get(&row.get())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("row {row} not present in inventory snapshot"))
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
