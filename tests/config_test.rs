//! Configuration loading tests
//!
//! These mutate the process environment, so they run serially.

use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;
use tsencode::config::{load_config, ENV_EPGSTATION_URL, ENV_WATCHDIR, ENV_WORKDIR};

fn clear_env() {
    for key in [ENV_WORKDIR, ENV_EPGSTATION_URL, ENV_WATCHDIR] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("tsencode.toml");
    fs::write(
        &path,
        r#"
[queue]
workdir = "/var/lib/tsencode"
epgstation_url = "http://recorder:8888"
"#,
    )
    .unwrap();

    std::env::set_var(ENV_WORKDIR, "/srv/work");
    std::env::set_var(ENV_WATCHDIR, "/mnt/recorded\n");
    let config = load_config(&path).unwrap();
    clear_env();

    assert_eq!(config.queue.workdir, PathBuf::from("/srv/work"));
    assert_eq!(config.queue.epgstation_url, "http://recorder:8888");
    assert_eq!(config.queue.watch_dir, Some(PathBuf::from("/mnt/recorded")));
}

#[test]
#[serial]
fn file_values_apply_without_environment() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("tsencode.toml");
    fs::write(
        &path,
        r#"
[encode]
cut_seconds = 0
audio_bitrate = "256k"

[queue]
watch_dir = "/mnt/rec"
recorded_extension = "ts"
"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();

    assert_eq!(config.encode.cut_seconds, 0);
    assert_eq!(config.encode.audio_bitrate, "256k");
    assert_eq!(config.queue.watch_dir, Some(PathBuf::from("/mnt/rec")));
    assert_eq!(config.queue.recorded_extension, "ts");
}

#[test]
#[serial]
fn malformed_file_is_an_error() {
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("tsencode.toml");
    fs::write(&path, "[encode\ncut_seconds = ").unwrap();

    let err = load_config(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}
