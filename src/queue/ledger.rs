use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Persistent set of recording filenames that have already been encoded.
///
/// Stored as a pretty-printed JSON array of strings.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    names: BTreeSet<String>,
}

impl Ledger {
    /// Load the ledger, creating an empty one on disk when it does not exist.
    ///
    /// An unreadable or corrupt ledger is treated as empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut ledger = Self {
            path,
            names: BTreeSet::new(),
        };

        if !ledger.path.exists() {
            tracing::info!(
                "Ledger does not exist, creating an empty one at {:?}",
                ledger.path
            );
            if let Err(e) = ledger.save() {
                tracing::warn!("{:#}", e);
            }
            return ledger;
        }

        match read_names(&ledger.path) {
            Ok(names) => ledger.names = names,
            Err(e) => tracing::warn!("Error loading processed filenames: {:#}", e),
        }
        ledger
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.names.contains(filename)
    }

    /// Add `filename`. Returns `false` when it was already present.
    pub fn mark(&mut self, filename: &str) -> bool {
        self.names.insert(filename.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Write the ledger back, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create ledger directory: {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(&self.names)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write ledger: {:?}", self.path))?;
        Ok(())
    }
}

fn read_names(path: &Path) -> Result<BTreeSet<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read ledger: {:?}", path))?;
    let names: Vec<String> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse ledger: {:?}", path))?;
    Ok(names.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_ledger_is_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/work/processed_filenames.json");

        let ledger = Ledger::load(&path);
        assert!(ledger.is_empty());
        assert_eq!(ledger.path(), path.as_path());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn test_mark_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processed_filenames.json");

        let mut ledger = Ledger::load(&path);
        assert!(ledger.mark("ニュース[字].m2ts"));
        assert!(!ledger.mark("ニュース[字].m2ts"));
        ledger.save().unwrap();

        let reloaded = Ledger::load(&path);
        assert_eq!(reloaded.len(), 1);
        assert!(reloaded.contains("ニュース[字].m2ts"));
        assert!(!reloaded.contains("other.m2ts"));
    }

    #[test]
    fn test_corrupt_ledger_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processed_filenames.json");
        std::fs::write(&path, "{ not a list").unwrap();

        let ledger = Ledger::load(&path);
        assert!(ledger.is_empty());
    }
}
