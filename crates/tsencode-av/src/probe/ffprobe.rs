//! FFprobe-based stream inspection.

use super::types::*;
use super::StreamInspector;
use crate::tools::run_capture;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default `-analyzeduration` / `-probesize` for broadcast recordings.
pub const DEFAULT_ANALYZE_WINDOW: &str = "100M";

const STREAM_ENTRIES: &str = "stream=index,codec_name,codec_type,channels,bit_rate,sample_rate,width,height:stream_tags=language,title";

#[derive(Debug, Deserialize)]
struct FfprobeStreams {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormatOutput {
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    channels: Option<u32>,
    bit_rate: Option<String>,
    sample_rate: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
    title: Option<String>,
}

/// Stream inspector backed by the `ffprobe` CLI.
#[derive(Debug, Clone)]
pub struct FfprobeInspector {
    ffprobe_path: PathBuf,
    analyze_duration: String,
    probe_size: String,
}

impl FfprobeInspector {
    /// Create an inspector using the given ffprobe path and the default analyze window.
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            analyze_duration: DEFAULT_ANALYZE_WINDOW.to_string(),
            probe_size: DEFAULT_ANALYZE_WINDOW.to_string(),
        }
    }

    /// Override the `-analyzeduration` and `-probesize` values.
    pub fn with_analyze_window(
        mut self,
        analyze_duration: impl Into<String>,
        probe_size: impl Into<String>,
    ) -> Self {
        self.analyze_duration = analyze_duration.into();
        self.probe_size = probe_size.into();
        self
    }

    fn analyze_args(&self) -> [&str; 4] {
        [
            "-analyzeduration",
            &self.analyze_duration,
            "-probesize",
            &self.probe_size,
        ]
    }

    /// Probe streams, surfacing failures to the caller.
    pub fn try_inspect(&self, path: &Path, filter: StreamFilter) -> Result<Vec<StreamRecord>> {
        if !path.exists() {
            return Err(Error::file_not_found(path));
        }

        let mut args: Vec<String> = self.analyze_args().iter().map(|s| s.to_string()).collect();
        args.extend(["-v".to_string(), "error".to_string()]);
        if let Some(select) = filter.select_arg() {
            args.extend(["-select_streams".to_string(), select.to_string()]);
        }
        args.extend([
            "-show_entries".to_string(),
            STREAM_ENTRIES.to_string(),
            "-of".to_string(),
            "json".to_string(),
        ]);
        args.push(path.to_string_lossy().into_owned());

        let stdout = run_capture(&self.ffprobe_path, &args)?;
        parse_streams(&stdout, filter)
    }

    /// Log every stream of the file at debug level.
    pub fn debug_dump(&self, path: &Path) {
        match self.try_inspect(path, StreamFilter::All) {
            Ok(streams) if streams.is_empty() => debug!("No streams found in {:?}", path),
            Ok(streams) => {
                debug!("Streams in {:?}:", path);
                for s in &streams {
                    let detail = match s.codec_type {
                        CodecType::Video => format!(
                            "{}x{}",
                            s.width.unwrap_or(0),
                            s.height.unwrap_or(0)
                        ),
                        CodecType::Audio => format!(
                            "{}ch {}Hz",
                            s.channels.unwrap_or(0),
                            s.sample_rate.unwrap_or(0)
                        ),
                        _ => String::new(),
                    };
                    debug!(
                        "  #{} {:?} codec={} lang={} {}",
                        s.index,
                        s.codec_type,
                        s.codec_name.as_deref().unwrap_or("unknown"),
                        s.language().unwrap_or("unknown"),
                        detail
                    );
                }
            }
            Err(e) => debug!("Stream dump failed for {:?}: {}", path, e),
        }
    }
}

impl StreamInspector for FfprobeInspector {
    fn inspect(&self, path: &Path, filter: StreamFilter) -> Vec<StreamRecord> {
        match self.try_inspect(path, filter) {
            Ok(streams) => {
                for s in &streams {
                    debug!(
                        "Found {:?} stream: index={}, codec={}, channels={:?}, bitrate={:?}, lang={:?}, title={:?}",
                        s.codec_type,
                        s.index,
                        s.codec_name.as_deref().unwrap_or("unknown"),
                        s.channels,
                        s.bit_rate,
                        s.language(),
                        s.title()
                    );
                }
                streams
            }
            Err(e) => {
                warn!("Stream probe ({:?}) failed for {:?}: {}", filter, path, e);
                Vec::new()
            }
        }
    }

    fn probe_duration(&self, path: &Path) -> Option<Duration> {
        let mut args: Vec<&str> = self.analyze_args().to_vec();
        let path_str = path.to_string_lossy();
        args.extend(["-v", "0", "-show_format", "-of", "json", &*path_str]);

        let stdout = match run_capture(&self.ffprobe_path, &args) {
            Ok(s) => s,
            Err(e) => {
                warn!("Duration probe failed for {:?}: {}", path, e);
                return None;
            }
        };

        match parse_duration(&stdout) {
            Ok(duration) => duration,
            Err(e) => {
                warn!("Could not read duration for {:?}: {}", path, e);
                None
            }
        }
    }
}

fn parse_streams(json: &str, filter: StreamFilter) -> Result<Vec<StreamRecord>> {
    let output: FfprobeStreams = serde_json::from_str(json)
        .map_err(|e| Error::parse_error("ffprobe", format!("invalid stream JSON: {}", e)))?;

    let streams = output
        .streams
        .into_iter()
        .map(|s| StreamRecord {
            index: s.index,
            codec_type: s
                .codec_type
                .as_deref()
                .map(CodecType::from_ffprobe)
                .unwrap_or(CodecType::Other),
            codec_name: s.codec_name,
            channels: s.channels,
            bit_rate: s.bit_rate.and_then(|b| b.parse().ok()),
            sample_rate: s.sample_rate.and_then(|r| r.parse().ok()),
            width: s.width,
            height: s.height,
            language: s.tags.language.filter(|l| !l.is_empty()),
            title: s.tags.title.filter(|t| !t.is_empty()),
        })
        .filter(|s| filter.matches(s.codec_type))
        .collect();

    Ok(streams)
}

fn parse_duration(json: &str) -> Result<Option<Duration>> {
    let output: FfprobeFormatOutput = serde_json::from_str(json)?;
    Ok(output
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64))
}
