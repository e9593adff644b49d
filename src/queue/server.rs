use super::Ledger;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const RECORDED_PATH: &str = "/api/recorded?isHalfWidth=false&offset=0&limit=1000";

#[derive(Debug, Deserialize)]
struct RecordedResponse {
    #[serde(default)]
    records: Vec<RecordedItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordedItem {
    #[serde(default)]
    video_files: Vec<VideoFile>,
}

#[derive(Debug, Deserialize)]
struct VideoFile {
    #[serde(default)]
    filename: Option<String>,
}

/// Minimal EPGStation API client.
pub struct EpgStationClient {
    client: Client,
    base_url: String,
}

impl EpgStationClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Every video file name of every recorded programme, in API order.
    pub async fn recorded_filenames(&self) -> Result<Vec<String>> {
        let url = format!("{}{}", self.base_url, RECORDED_PATH);
        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await
            .with_context(|| format!("Failed to GET {}", url))?
            .error_for_status()
            .with_context(|| format!("EPGStation returned an error for {}", url))?;

        let body: RecordedResponse = response
            .json()
            .await
            .context("Failed to decode recorded programmes")?;

        Ok(body
            .records
            .into_iter()
            .flat_map(|record| record.video_files)
            .filter_map(|file| file.filename)
            .collect())
    }
}

/// Recorded file names not in the ledger. Request failures yield an empty list.
pub async fn pending_on_server(client: &EpgStationClient, ledger: &Ledger) -> Vec<String> {
    match client.recorded_filenames().await {
        Ok(names) => names
            .into_iter()
            .filter(|name| !ledger.contains(name))
            .collect(),
        Err(e) => {
            tracing::warn!("Error fetching recorded programs: {:#}", e);
            Vec::new()
        }
    }
}
