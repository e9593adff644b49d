//! tsencode-plan: decides how a broadcast recording gets transcoded.
//!
//! This crate turns what is known about a recording into an ffmpeg argument
//! vector:
//!
//! - **Filename tags**: `[字]`, `[二]`, `[解]`, `[多]`, `[副]` markers
//! - **Schedule documents**: EPG JSON with title, description, air date and ARIB genres
//! - **Audio plan**: dual-mono splitting, main-stream selection, language inference
//! - **Subtitle plan**: caption mapping gated on the caption decoder
//! - **Argument assembly**: a deterministic, ordered ffmpeg command line
//!
//! # Examples
//!
//! ```
//! use std::path::Path;
//! use tsencode_plan::{
//!     output_path, AudioPlan, ComponentType, EncodePolicy, FilenameTags, SubtitlePlan,
//!     TranscodePlan,
//! };
//! use tsencode_av::{AudioCodec, StreamRecord, VideoCodec};
//!
//! let input = Path::new("/rec/News[字].m2ts");
//! let tags = FilenameTags::from_filename("News[字]");
//! let audio = AudioPlan::build(
//!     &tags,
//!     ComponentType::default(),
//!     &[StreamRecord::audio(1)],
//!     AudioCodec::Aac,
//!     "192k",
//! );
//! let subtitles = SubtitlePlan::build(tags.subtitled, true, &[StreamRecord::subtitle(2)], false);
//!
//! let plan = TranscodePlan {
//!     input: input.to_path_buf(),
//!     output: output_path(input, Path::new(".")),
//!     video: VideoCodec::Libx264,
//!     audio,
//!     subtitles,
//!     metadata: None,
//!     split_targets: Vec::new(),
//!     policy: EncodePolicy::default(),
//! };
//! assert_eq!(plan.assemble().first().map(String::as_str), Some("-y"));
//! ```

pub mod args;
pub mod audio;
pub mod error;
pub mod schedule;
pub mod subtitle;
pub mod tags;

pub use args::{
    base_name, output_path, plan_split_targets, EncodePolicy, SplitRole, SplitTarget,
    TranscodePlan,
};
pub use audio::{AudioLayout, AudioMapping, AudioPlan, SplitChannel};
pub use error::{Error, Result};
pub use schedule::{ComponentType, ScheduleArg, ScheduleMetadata, ScheduleSource};
pub use subtitle::{SubtitleMapping, SubtitlePlan, SubtitleSource};
pub use tags::FilenameTags;
