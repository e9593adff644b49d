//! # tsencode-av
//!
//! ffprobe/ffmpeg plumbing for broadcast recordings.
//!
//! This crate provides:
//! - Stream inspection via ffprobe with an enlarged analyze window
//!   ([`FfprobeInspector`], behind the [`StreamInspector`] trait)
//! - Detection of optional ffmpeg components (ARIB caption decoder,
//!   libfdk_aac, hardware H.264 encoders) and codec selection
//! - External tool resolution and invocation helpers
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use tsencode_av::{FfprobeInspector, StreamFilter, StreamInspector};
//!
//! let inspector = FfprobeInspector::new("ffprobe");
//! for stream in inspector.inspect(Path::new("/rec/News[字].m2ts"), StreamFilter::Audio) {
//!     println!("#{} {:?} {:?}", stream.index, stream.codec_name, stream.language);
//! }
//! ```

pub mod capabilities;
mod error;
pub mod probe;
pub mod tools;

// Re-exports
pub use capabilities::{
    AudioCodec, Availability, CapabilityProbe, CodecCapabilities, FfmpegCapabilityProbe,
    HardwareEncoder, VideoCodec,
};
pub use error::{Error, Result};
pub use probe::{
    CodecType, FfprobeInspector, StreamFilter, StreamInspector, StreamRecord,
};
pub use tools::{resolve_tool, run_capture};
