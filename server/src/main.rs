//! BioWatch API server – accepts camera-trap image uploads, runs the
//! detection strategy, persists events to the history store and serves
//! dashboard summaries, reports and exports over HTTP.

mod server;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use biowatch_common::config::Config;
use biowatch_detector::RandomDetector;
use biowatch_engine::HistoryStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // ── load config ──────────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| Config::default_path().to_string());
    let config =
        Config::load_or_default(&PathBuf::from(&config_path)).context("Config load failed")?;

    info!("BioWatch server starting (listen={})", config.listen_addr);

    std::fs::create_dir_all(&config.data_dir).context("Cannot create data directory")?;

    // ── history store ────────────────────────────────────────────────
    let store = HistoryStore::new(config.history_file.clone());
    let existing = store.load();
    info!(
        "History store ready at {} ({} events)",
        store.path().display(),
        existing.len()
    );

    // ── location registry ────────────────────────────────────────────
    let registry = biowatch_common::locations::registry_from_config(&config)
        .context("Cannot load location registry")?;
    info!("{} monitoring locations registered", registry.len());

    // ── detection strategy ───────────────────────────────────────────
    let detector = match config.detector_seed {
        Some(seed) => {
            info!("Using seeded detector (seed={seed})");
            RandomDetector::with_seed(config.confidence_threshold, seed)
        }
        None => RandomDetector::new(config.confidence_threshold),
    };

    // ── ctrl-c ───────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let ctrlc_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        ctrlc_flag.store(true, Ordering::Relaxed);
        info!("Shutdown signal received");
    })
    .context("Cannot set Ctrl-C handler")?;

    // ── HTTP server ──────────────────────────────────────────────────
    server::run(config, store, registry, Box::new(detector), shutdown).await?;

    info!("BioWatch server stopped");
    Ok(())
}
