//! Runs ffmpeg and reports on the result.
//!
//! The child's stdout and stderr are read line by line on the tokio runtime.
//! Progress lines are dropped, everything else is buffered so it can be
//! printed when the transcode fails. Ctrl+C is forwarded to the child as
//! SIGINT so ffmpeg can finalize the container.

use crate::encode::EncodeJob;
use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// ffmpeg progress lines start with this.
pub const PROGRESS_PREFIX: &str = "frame=";

/// Exit code used when the child was terminated by a signal.
const SIGNALED_EXIT_CODE: i32 = 1;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// How a finished child exited.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub exit_code: i32,
    pub elapsed: Duration,
    /// Non-progress output lines in arrival order.
    pub log: Vec<String>,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run `program` to completion. No timeout is applied.
pub async fn run(program: &Path, args: &[String]) -> Result<RunOutcome, RunError> {
    let program_name = program.to_string_lossy().into_owned();

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| RunError::Spawn {
            program: program_name.clone(),
            source,
        })?;
    let start = Instant::now();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(collect_lines(stdout, tx.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(collect_lines(stderr, tx.clone())));
    }
    drop(tx);

    let mut listen_for_interrupt = true;
    let status = loop {
        tokio::select! {
            status = child.wait() => {
                break status.map_err(|source| RunError::Wait {
                    program: program_name.clone(),
                    source,
                })?;
            }
            result = tokio::signal::ctrl_c(), if listen_for_interrupt => match result {
                Ok(()) => forward_interrupt(&mut child),
                Err(e) => {
                    warn!("Failed to install Ctrl+C handler: {}", e);
                    listen_for_interrupt = false;
                }
            },
        }
    };
    let elapsed = start.elapsed();

    for reader in readers {
        if let Err(e) = reader.await {
            debug!("Output reader task failed: {}", e);
        }
    }
    let mut log = Vec::new();
    while let Some(line) = rx.recv().await {
        log.push(line);
    }

    let exit_code = status.code().unwrap_or(SIGNALED_EXIT_CODE);
    debug!("{} exited with {} after {:?}", program_name, status, elapsed);

    Ok(RunOutcome {
        exit_code,
        elapsed,
        log,
    })
}

/// Trimmed output line, or `None` for blank and progress lines.
pub fn keep_line(raw: &str) -> Option<String> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with(PROGRESS_PREFIX) {
        None
    } else {
        Some(line.to_string())
    }
}

async fn collect_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    // ffmpeg rewrites its progress line with bare carriage returns.
    let mut segments = BufReader::new(reader).split(b'\n');
    loop {
        match segments.next_segment().await {
            Ok(Some(bytes)) => {
                for part in String::from_utf8_lossy(&bytes).split('\r') {
                    if let Some(line) = keep_line(part) {
                        if tx.send(line).is_err() {
                            return;
                        }
                    }
                }
            }
            Ok(None) => return,
            Err(e) => {
                debug!("Stopped reading child output: {}", e);
                return;
            }
        }
    }
}

#[cfg(unix)]
fn forward_interrupt(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(id) = child.id() else {
        return;
    };
    let Ok(pid) = i32::try_from(id) else {
        return;
    };
    match kill(Pid::from_raw(pid), Signal::SIGINT) {
        Ok(()) => info!("Forwarded interrupt to child process {}", pid),
        Err(e) => warn!("Failed to forward interrupt to child process {}: {}", pid, e),
    }
}

#[cfg(not(unix))]
fn forward_interrupt(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!("Failed to stop child process: {}", e);
    }
}

/// Summary printed after every transcode.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub output_args: String,
    pub duration: String,
    pub elapsed_time: String,
    pub average_speed: String,
    pub video_codec: String,
    pub audio_codec: String,
    pub cut_seconds: u32,
    pub subtitles_included: bool,
    pub metadata_included: bool,
    pub ignore_tags: bool,
    pub split_tracks: bool,
    pub exit_code: i32,
}

impl RunReport {
    pub fn new(
        job: &EncodeJob,
        args: &[String],
        duration: Option<Duration>,
        outcome: &RunOutcome,
    ) -> Self {
        Self {
            output_args: args.join(" "),
            duration: format_hms(duration.unwrap_or_default()),
            elapsed_time: format_hms(outcome.elapsed),
            average_speed: average_speed(duration, outcome.elapsed),
            video_codec: job.plan.video.ffmpeg_name().to_string(),
            audio_codec: job.capabilities.audio_codec().ffmpeg_name().to_string(),
            cut_seconds: job.plan.policy.cut_seconds,
            subtitles_included: job.has_subtitles(),
            metadata_included: job.has_metadata(),
            ignore_tags: job.ignore_tags,
            split_tracks: job.split_tracks,
            exit_code: outcome.exit_code,
        }
    }
}

/// `HH:MM:SS`, fractional seconds truncated. Hours do not wrap.
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Whole multiples of real time, e.g. `"4x"`, or `"N/A"` without a duration.
pub fn average_speed(duration: Option<Duration>, elapsed: Duration) -> String {
    match duration {
        Some(d) if !d.is_zero() && !elapsed.is_zero() => {
            format!("{}x", (d.as_secs_f64() / elapsed.as_secs_f64()).floor() as u64)
        }
        _ => "N/A".to_string(),
    }
}
