use super::Ledger;
use anyhow::Result;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Filename fragments left behind by Syncthing while a transfer is in flight.
const SYNC_TEMP_PATTERNS: [&str; 3] = [".syncthing.", ".sttmp", ".stfolder"];

/// Whether `path` is a sync tool's temporary file.
pub fn is_sync_temp_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy())
        .is_some_and(|name| SYNC_TEMP_PATTERNS.iter().any(|p| name.contains(p)))
}

/// Recursively collect recordings with `extension` under `dir`.
pub fn find_recordings(dir: &Path, extension: &str) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Error accessing file: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == extension))
        .filter(|path| !is_sync_temp_file(path))
        .collect()
}

/// Keep the files whose size did not change across `settle` and which can be opened.
pub async fn settled(paths: Vec<PathBuf>, settle: Duration) -> Vec<PathBuf> {
    let before: HashMap<PathBuf, u64> = paths
        .into_iter()
        .filter_map(|path| {
            let size = std::fs::metadata(&path).ok()?.len();
            Some((path, size))
        })
        .collect();

    tokio::time::sleep(settle).await;

    let mut ready: Vec<PathBuf> = before
        .into_iter()
        .filter(|(path, size)| {
            let now = std::fs::metadata(path).map(|m| m.len()).ok();
            if now != Some(*size) {
                tracing::debug!("Still being written: {:?}", path);
                return false;
            }
            std::fs::File::open(path).is_ok()
        })
        .map(|(path, _)| path)
        .collect();
    ready.sort();
    ready
}

/// Finished recordings under `dir` whose file names are not in the ledger.
pub async fn pending_in_folder(
    dir: &Path,
    extension: &str,
    settle: Duration,
    ledger: &Ledger,
) -> Result<Vec<String>> {
    if !dir.exists() {
        anyhow::bail!("Watch folder {:?} does not exist", dir);
    }

    let candidates = find_recordings(dir, extension);
    tracing::debug!("Found {} recordings under {:?}", candidates.len(), dir);

    let pending = settled(candidates, settle)
        .await
        .into_iter()
        .filter_map(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .filter(|name| !ledger.contains(name))
        .collect();
    Ok(pending)
}
