//! ffmpeg argument assembly.
//!
//! [`TranscodePlan::assemble`] is a pure function of the plan: the same plan
//! always produces the same argument vector.

use crate::audio::{find_main_stream, AudioPlan};
use crate::schedule::ScheduleMetadata;
use crate::subtitle::SubtitlePlan;
use std::path::{Path, PathBuf};
use tracing::debug;
use tsencode_av::{CodecType, StreamRecord, VideoCodec};

/// Container extension of the primary output.
pub const OUTPUT_EXTENSION: &str = "mp4";

const DEINTERLACE_FILTER: &str = "yadif";
const VAAPI_FILTER_CHAIN: &str = "format=nv12,hwupload,deinterlace_vaapi,scale_vaapi=w=1280:h=720";

/// Fixed encoding policy shared by every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodePolicy {
    /// Seconds trimmed from the start of the recording. 0 disables trimming.
    pub cut_seconds: u32,
    pub analyze_duration: String,
    pub probe_size: String,
    /// x264/QSV speed preset.
    pub preset: String,
    /// Constant rate factor for the software encoder.
    pub crf: u32,
    /// Constant quality for hardware encoders.
    pub global_quality: u32,
    /// DRM render node for VA-API.
    pub vaapi_device: String,
}

impl Default for EncodePolicy {
    fn default() -> Self {
        Self {
            cut_seconds: 3,
            analyze_duration: "100M".to_string(),
            probe_size: "100M".to_string(),
            preset: "fast".to_string(),
            crf: 23,
            global_quality: 20,
            vaapi_device: "/dev/dri/renderD128".to_string(),
        }
    }
}

impl EncodePolicy {
    /// Options placed before `-i` for the chosen video encoder.
    pub fn video_input_args(&self, codec: VideoCodec) -> Vec<String> {
        match codec {
            VideoCodec::Libx264 | VideoCodec::H264Qsv => strings(&["-fflags", "+genpts"]),
            VideoCodec::H264Vaapi => vec![
                "-hwaccel".to_string(),
                "vaapi".to_string(),
                "-hwaccel_device".to_string(),
                self.vaapi_device.clone(),
            ],
        }
    }

    /// Filter chain and quality controls for the chosen video encoder.
    pub fn video_output_args(&self, codec: VideoCodec) -> Vec<String> {
        match codec {
            VideoCodec::Libx264 => vec![
                "-vf".to_string(),
                DEINTERLACE_FILTER.to_string(),
                "-preset".to_string(),
                self.preset.clone(),
                "-crf".to_string(),
                self.crf.to_string(),
            ],
            VideoCodec::H264Qsv => vec![
                "-vf".to_string(),
                DEINTERLACE_FILTER.to_string(),
                "-preset".to_string(),
                self.preset.clone(),
                "-global_quality".to_string(),
                self.global_quality.to_string(),
            ],
            VideoCodec::H264Vaapi => vec![
                "-vf".to_string(),
                VAAPI_FILTER_CHAIN.to_string(),
                "-compression_level".to_string(),
                "1".to_string(),
                "-global_quality".to_string(),
                self.global_quality.to_string(),
            ],
        }
    }

    fn analyze_args(&self) -> Vec<String> {
        vec![
            "-analyzeduration".to_string(),
            self.analyze_duration.clone(),
            "-probesize".to_string(),
            self.probe_size.clone(),
        ]
    }
}

/// What a side output carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitRole {
    Audio,
    Subtitle,
}

impl SplitRole {
    fn marker(self) -> &'static str {
        match self {
            SplitRole::Audio => "audio",
            SplitRole::Subtitle => "subtitle",
        }
    }

    fn extension(self) -> &'static str {
        match self {
            SplitRole::Audio => "m4a",
            SplitRole::Subtitle => "srt",
        }
    }
}

/// An additional single-stream output written by the same ffmpeg invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitTarget {
    pub source: u32,
    pub role: SplitRole,
    pub path: PathBuf,
}

impl SplitTarget {
    pub fn new(base: &str, out_dir: &Path, role: SplitRole, source: u32) -> Self {
        let file = format!("{}_{}_{}.{}", base, role.marker(), source, role.extension());
        Self {
            source,
            role,
            path: out_dir.join(file),
        }
    }

    fn args(&self) -> Vec<String> {
        let (codec_flag, codec) = match self.role {
            SplitRole::Audio => ("-c:a", "copy"),
            SplitRole::Subtitle => ("-c:s", "srt"),
        };
        vec![
            "-map".to_string(),
            format!("0:{}", self.source),
            codec_flag.to_string(),
            codec.to_string(),
            self.path.to_string_lossy().into_owned(),
        ]
    }
}

/// Side outputs for split-tracks mode.
///
/// Every non-main audio stream is stream-copied (only when there is more
/// than one), and every subtitle stream is extracted as SubRip.
pub fn plan_split_targets(
    base: &str,
    out_dir: &Path,
    audio: &[StreamRecord],
    subtitles: &[StreamRecord],
) -> Vec<SplitTarget> {
    let audio: Vec<&StreamRecord> = audio
        .iter()
        .filter(|s| s.codec_type == CodecType::Audio)
        .collect();
    let mut targets = Vec::new();

    if audio.len() > 1 {
        let main = find_main_stream(&audio).map(|s| s.index);
        for stream in audio.iter().filter(|s| Some(s.index) != main) {
            targets.push(SplitTarget::new(base, out_dir, SplitRole::Audio, stream.index));
        }
    }

    for stream in subtitles
        .iter()
        .filter(|s| s.codec_type == CodecType::Subtitle)
    {
        targets.push(SplitTarget::new(
            base,
            out_dir,
            SplitRole::Subtitle,
            stream.index,
        ));
    }

    for target in &targets {
        debug!(
            "Split track: stream {} -> {}",
            target.source,
            target.path.display()
        );
    }
    targets
}

/// Input file name without its final extension.
pub fn base_name(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Primary output path: `<out_dir>/<base>.mp4`.
pub fn output_path(input: &Path, out_dir: &Path) -> PathBuf {
    out_dir.join(format!("{}.{}", base_name(input), OUTPUT_EXTENSION))
}

/// Everything needed to drive one ffmpeg invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodePlan {
    pub input: PathBuf,
    pub output: PathBuf,
    pub video: VideoCodec,
    pub audio: AudioPlan,
    pub subtitles: SubtitlePlan,
    pub metadata: Option<ScheduleMetadata>,
    pub split_targets: Vec<SplitTarget>,
    pub policy: EncodePolicy,
}

impl TranscodePlan {
    /// Metadata options, present fields only.
    pub fn metadata_args(&self) -> Vec<String> {
        self.metadata
            .iter()
            .flat_map(|m| m.tags())
            .flat_map(|(key, value)| ["-metadata".to_string(), format!("{}={}", key, value)])
            .collect()
    }

    /// The full ffmpeg argument vector.
    pub fn assemble(&self) -> Vec<String> {
        let policy = &self.policy;
        let mut args = vec!["-y".to_string()];
        args.extend(policy.analyze_args());
        args.extend(self.subtitles.input_args());
        args.extend(policy.video_input_args(self.video));
        if policy.cut_seconds > 0 {
            args.push("-ss".to_string());
            args.push(policy.cut_seconds.to_string());
        }
        args.push("-i".to_string());
        args.push(self.input.to_string_lossy().into_owned());

        args.push("-map".to_string());
        args.push("0:v".to_string());
        args.push("-c:v".to_string());
        args.push(self.video.ffmpeg_name().to_string());

        args.extend(self.audio.args());
        args.extend(policy.video_output_args(self.video));
        args.extend(self.metadata_args());
        args.extend(self.subtitles.output_args());
        args.push(self.output.to_string_lossy().into_owned());

        for target in &self.split_targets {
            args.extend(target.args());
        }
        args
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
