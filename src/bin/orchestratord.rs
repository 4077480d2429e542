//! Standalone entry point for the engine orchestrator. Initializes logging
//! (the library crate never does this itself — only the binary that hosts
//! it knows where its logs should go), discovers engines, restores the
//! persisted role assignment, then idles until a shutdown signal arrives.
//!
//! The HTTP surface that would normally drive this orchestrator is out of
//! scope here; this binary exists to prove the core boots and tears down
//! cleanly on its own.

use shogi_orchestrator::{default_engines_root, default_preferences_path, Orchestrator};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let engines_root = std::env::var("SHOGI_ENGINES_ROOT")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_engines_root(dirs::data_dir().as_deref()));
    let preferences_path = std::env::var("SHOGI_PREFERENCES_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_preferences_path());

    log::info!("engines root: {engines_root:?}");
    log::info!("preferences file: {preferences_path:?}");

    let orchestrator = Orchestrator::new(engines_root, preferences_path);
    let descriptors = orchestrator.discover_engines();
    log::info!("discovered {} engine(s)", descriptors.len());

    if let Err(e) = orchestrator.load_preferences().await {
        log::error!("failed to restore preferences: {e}");
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("failed to listen for shutdown signal: {e}");
    }

    log::info!("shutting down");
    orchestrator.shutdown().await;
    if let Err(e) = orchestrator.save_preferences().await {
        log::warn!("failed to save preferences on shutdown: {e}");
    }
}
