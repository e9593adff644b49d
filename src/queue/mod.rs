//! Recording queue: which recordings still need encoding.
//!
//! Discovery runs in folder mode when a watch directory is configured and
//! asks the EPGStation server otherwise. Either way the processed-filename
//! ledger filters out what has already been done.

mod folder;
mod ledger;
mod server;

pub use folder::{find_recordings, is_sync_temp_file, pending_in_folder, settled};
pub use ledger::Ledger;
pub use server::{pending_on_server, EpgStationClient};

use crate::config::QueueConfig;
use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// File name of the ledger inside the work directory.
pub const LEDGER_FILE_NAME: &str = "processed_filenames.json";

/// Where pending recordings are discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryMode {
    Folder(PathBuf),
    Server(String),
}

impl DiscoveryMode {
    pub fn from_config(config: &QueueConfig) -> Self {
        match &config.watch_dir {
            Some(dir) => DiscoveryMode::Folder(dir.clone()),
            None => DiscoveryMode::Server(config.epgstation_url.clone()),
        }
    }
}

/// Unprocessed recording file names, in discovery order.
pub async fn pending(config: &QueueConfig, ledger: &Ledger) -> Result<Vec<String>> {
    match DiscoveryMode::from_config(config) {
        DiscoveryMode::Folder(dir) => {
            tracing::debug!("Folder mode: {:?}", dir);
            pending_in_folder(
                &dir,
                &config.recorded_extension,
                Duration::from_secs(config.settle_secs),
                ledger,
            )
            .await
        }
        DiscoveryMode::Server(url) => {
            tracing::debug!("Server mode: {}", url);
            let client =
                EpgStationClient::new(&url, Duration::from_secs(config.request_timeout_secs));
            Ok(pending_on_server(&client, ledger).await)
        }
    }
}

/// Add `filename` to the ledger at `config`'s work directory.
///
/// Returns `false` when it was already recorded.
pub fn mark_processed(config: &QueueConfig, filename: &str) -> Result<bool> {
    let mut ledger = Ledger::load(config.ledger_path());
    if !ledger.mark(filename) {
        tracing::debug!("{} already in {:?}", filename, ledger.path());
        return Ok(false);
    }
    ledger.save()?;
    tracing::info!(
        "Marked {} as processed in {:?} ({} entries)",
        filename,
        ledger.path(),
        ledger.len()
    );
    Ok(true)
}
