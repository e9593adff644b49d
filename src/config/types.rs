use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tsencode_av::HardwareEncoder;
use tsencode_plan::EncodePolicy;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub encode: EncodeConfig,

    #[serde(default)]
    pub queue: QueueConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncodeConfig {
    /// Seconds trimmed from the start of every recording (default: 3)
    #[serde(default = "default_cut_seconds")]
    pub cut_seconds: u32,

    /// `-analyzeduration` for ffprobe and ffmpeg (default: "100M")
    #[serde(default = "default_analyze_window")]
    pub analyze_duration: String,

    /// `-probesize` for ffprobe and ffmpeg (default: "100M")
    #[serde(default = "default_analyze_window")]
    pub probe_size: String,

    /// Bitrate of every output audio track (default: "192k")
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: String,

    /// Hardware encoder to try before falling back to libx264
    #[serde(default)]
    pub hardware_encoder: HardwareEncoder,

    /// Only print ffmpeg's output when it fails (default: true)
    #[serde(default = "default_true")]
    pub log_tool_output_only_on_error: bool,

    /// Directory the outputs are written to (default: ".")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_preset")]
    pub preset: String,

    /// libx264 CRF (default: 23)
    #[serde(default = "default_crf")]
    pub crf: u32,

    /// QSV/VA-API quality (default: 20)
    #[serde(default = "default_global_quality")]
    pub global_quality: u32,

    #[serde(default = "default_vaapi_device")]
    pub vaapi_device: String,
}

fn default_cut_seconds() -> u32 {
    3
}

fn default_analyze_window() -> String {
    "100M".to_string()
}

fn default_audio_bitrate() -> String {
    tsencode_plan::audio::DEFAULT_BITRATE.to_string()
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_preset() -> String {
    "fast".to_string()
}

fn default_crf() -> u32 {
    23
}

fn default_global_quality() -> u32 {
    20
}

fn default_vaapi_device() -> String {
    "/dev/dri/renderD128".to_string()
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            cut_seconds: default_cut_seconds(),
            analyze_duration: default_analyze_window(),
            probe_size: default_analyze_window(),
            audio_bitrate: default_audio_bitrate(),
            hardware_encoder: HardwareEncoder::default(),
            log_tool_output_only_on_error: true,
            output_dir: default_output_dir(),
            preset: default_preset(),
            crf: default_crf(),
            global_quality: default_global_quality(),
            vaapi_device: default_vaapi_device(),
        }
    }
}

impl EncodeConfig {
    /// Fixed argument policy for the assembler.
    pub fn policy(&self) -> EncodePolicy {
        EncodePolicy {
            cut_seconds: self.cut_seconds,
            analyze_duration: self.analyze_duration.clone(),
            probe_size: self.probe_size.clone(),
            preset: self.preset.clone(),
            crf: self.crf,
            global_quality: self.global_quality,
            vaapi_device: self.vaapi_device.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Directory holding the processed-filename ledger (default: "~/work")
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,

    /// EPGStation base URL used in server mode
    #[serde(default = "default_epgstation_url")]
    pub epgstation_url: String,

    /// Recording folder; when set, discovery runs in folder mode
    #[serde(default)]
    pub watch_dir: Option<PathBuf>,

    #[serde(default = "default_recorded_extension")]
    pub recorded_extension: String,

    /// A file must keep its size this long to count as finished (default: 1)
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_workdir() -> PathBuf {
    PathBuf::from("~/work")
}

fn default_epgstation_url() -> String {
    "http://localhost:8888".to_string()
}

fn default_recorded_extension() -> String {
    "m2ts".to_string()
}

fn default_settle_secs() -> u64 {
    1
}

fn default_request_timeout() -> u64 {
    5
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
            epgstation_url: default_epgstation_url(),
            watch_dir: None,
            recorded_extension: default_recorded_extension(),
            settle_secs: default_settle_secs(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl QueueConfig {
    /// Ledger location with `~` expanded.
    pub fn ledger_path(&self) -> PathBuf {
        let workdir = self.workdir.to_string_lossy();
        PathBuf::from(shellexpand::tilde(&workdir).into_owned()).join(crate::queue::LEDGER_FILE_NAME)
    }
}
