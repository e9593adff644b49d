//! External tool detection and invocation.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Resolve the executable for `name`, preferring a configured path over PATH lookup.
///
/// Unlike a strict lookup this never fails: when neither the configured path
/// nor `PATH` yields the tool, the bare name is returned and the failure
/// surfaces when the tool is actually spawned.
pub fn resolve_tool(name: &str, config_path: Option<&Path>) -> PathBuf {
    if let Some(path) = config_path {
        if path.exists() {
            return path.to_path_buf();
        }
        tracing::warn!(
            "Configured path for {} does not exist: {:?}, searching PATH",
            name,
            path
        );
    }

    which::which(name).unwrap_or_else(|_| PathBuf::from(name))
}

/// Run a tool to completion and return its stdout as text.
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`] when the program cannot be spawned because
/// it does not exist, and [`Error::ToolFailed`] on a non-zero exit.
pub fn run_capture<S: AsRef<std::ffi::OsStr>>(program: &Path, args: &[S]) -> Result<String> {
    let name = tool_name(program);

    let output = Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::tool_not_found(name.clone())
        } else {
            Error::Io(e)
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed(name, stderr.trim().to_string()));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

pub(crate) fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| program.to_string_lossy().to_string())
}
