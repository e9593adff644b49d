//! Stream inspection.
//!
//! Broadcast recordings frequently announce streams late in the transport
//! stream, so every inspection runs ffprobe with an enlarged analyze window.

mod ffprobe;
mod types;

pub use ffprobe::FfprobeInspector;
pub use types::*;

use std::path::Path;
use std::time::Duration;

/// Source of stream layout information for a media file.
///
/// Implementations fail soft: an unreadable file or a broken tool yields an
/// empty list (or `None`), never an error.
pub trait StreamInspector {
    /// Return the streams of `path` that pass `filter`, in probe order.
    fn inspect(&self, path: &Path, filter: StreamFilter) -> Vec<StreamRecord>;

    /// Container duration, or `None` when unknown.
    fn probe_duration(&self, path: &Path) -> Option<Duration>;
}
