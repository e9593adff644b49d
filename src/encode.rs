//! Encode orchestration: turns a request plus probes into a transcode plan.

use crate::config::EncodeConfig;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};
use tsencode_av::{CapabilityProbe, CodecCapabilities, StreamFilter, StreamInspector};
use tsencode_plan::{
    base_name, output_path, plan_split_targets, schedule, AudioPlan, FilenameTags, ScheduleArg,
    SubtitlePlan, TranscodePlan,
};

/// What the user asked for on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeRequest {
    pub input: PathBuf,
    pub schedule: Option<ScheduleArg>,
    /// Disable filename-tag driven behavior.
    pub ignore_tags: bool,
    /// Also write per-stream side files.
    pub split_tracks: bool,
}

impl EncodeRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            schedule: None,
            ignore_tags: false,
            split_tracks: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error(transparent)]
    Schedule(#[from] tsencode_plan::Error),
}

/// A fully decided transcode.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub plan: TranscodePlan,
    pub capabilities: CodecCapabilities,
    pub tags: FilenameTags,
    pub ignore_tags: bool,
    pub split_tracks: bool,
}

impl EncodeJob {
    pub fn args(&self) -> Vec<String> {
        self.plan.assemble()
    }

    pub fn has_subtitles(&self) -> bool {
        !self.plan.subtitles.is_empty()
    }

    pub fn has_metadata(&self) -> bool {
        self.plan
            .metadata
            .as_ref()
            .is_some_and(|metadata| !metadata.is_empty())
    }
}

/// Decide everything about an encode without running it.
///
/// Fatal only for a missing input or a missing schedule document; probe and
/// capability failures degrade to defaults.
pub fn prepare(
    request: &EncodeRequest,
    config: &EncodeConfig,
    probe: &dyn CapabilityProbe,
    inspector: &dyn StreamInspector,
) -> Result<EncodeJob, EncodeError> {
    let input = &request.input;
    if !input.exists() {
        return Err(EncodeError::InputNotFound {
            path: input.clone(),
        });
    }

    let source = schedule::resolve(request.schedule.as_ref())?;

    let base = base_name(input);
    let tags = FilenameTags::from_filename(&base);
    debug!("Filename tags for {:?}: {:?}", base, tags);

    let capabilities = CodecCapabilities::detect(probe, config.hardware_encoder);
    let video = capabilities.video_codec();
    if !video.is_hardware() {
        debug!(
            "{} unavailable, encoding in software",
            config.hardware_encoder.encoder_name()
        );
    }
    info!(
        "Video codec: {}, audio codec: {}",
        video.ffmpeg_name(),
        capabilities.audio_codec().ffmpeg_name()
    );

    let audio_streams = inspector.inspect(input, StreamFilter::Audio);
    let plan_tags = if request.ignore_tags {
        info!("Ignore tags mode: mapping only the main audio stream");
        FilenameTags::default()
    } else {
        tags
    };
    let audio = AudioPlan::build(
        &plan_tags,
        source.component_type,
        &audio_streams,
        capabilities.audio_codec(),
        &config.audio_bitrate,
    );

    let wants_captions = tags.subtitled && !request.ignore_tags && capabilities.caption_decoder;
    let subtitle_streams = if wants_captions || request.split_tracks {
        inspector.inspect(input, StreamFilter::Subtitle)
    } else {
        Vec::new()
    };
    let subtitles = SubtitlePlan::build(
        tags.subtitled,
        capabilities.caption_decoder,
        &subtitle_streams,
        request.ignore_tags,
    );

    let split_targets = if request.split_tracks {
        plan_split_targets(
            &base,
            &config.output_dir,
            &audio_streams,
            &subtitle_streams,
        )
    } else {
        Vec::new()
    };

    let plan = TranscodePlan {
        input: input.clone(),
        output: output_path(input, &config.output_dir),
        video,
        audio,
        subtitles,
        metadata: source.metadata,
        split_targets,
        policy: config.policy(),
    };

    Ok(EncodeJob {
        plan,
        capabilities,
        tags,
        ignore_tags: request.ignore_tags,
        split_tracks: request.split_tracks,
    })
}
