mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variables that override `[queue]` settings.
pub const ENV_WORKDIR: &str = "WORKDIR";
pub const ENV_EPGSTATION_URL: &str = "EPGSTATION_URL";
pub const ENV_WATCHDIR: &str = "WATCHDIR";

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    apply_env_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./tsencode.toml",
        "~/.config/tsencode/config.toml",
        "/etc/tsencode/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    let mut config = Config::default();
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Apply `WORKDIR`, `EPGSTATION_URL` and `WATCHDIR` from the process environment.
pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides_from(config, |key| std::env::var(key).ok());
}

fn apply_overrides_from(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    let set = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(workdir) = set(ENV_WORKDIR) {
        config.queue.workdir = PathBuf::from(workdir);
    }
    if let Some(url) = set(ENV_EPGSTATION_URL) {
        config.queue.epgstation_url = url;
    }
    if let Some(watch_dir) = set(ENV_WATCHDIR) {
        config.queue.watch_dir = Some(PathBuf::from(watch_dir.trim()));
    }
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    let encode = &config.encode;
    if encode.audio_bitrate.trim().is_empty() {
        anyhow::bail!("encode.audio_bitrate cannot be empty");
    }
    if encode.analyze_duration.trim().is_empty() || encode.probe_size.trim().is_empty() {
        anyhow::bail!("encode.analyze_duration and encode.probe_size cannot be empty");
    }
    if encode.preset.trim().is_empty() {
        anyhow::bail!("encode.preset cannot be empty");
    }

    for (name, path) in [
        ("ffmpeg", &config.tools.ffmpeg_path),
        ("ffprobe", &config.tools.ffprobe_path),
    ] {
        if let Some(path) = path {
            if !path.exists() {
                tracing::warn!("Configured {} path does not exist: {:?}", name, path);
            }
        }
    }

    if config.queue.recorded_extension.trim().is_empty() {
        anyhow::bail!("queue.recorded_extension cannot be empty");
    }

    Ok(())
}
