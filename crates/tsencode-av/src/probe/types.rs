//! Stream record types.

use serde::{Deserialize, Serialize};

/// Kind of elementary stream, as reported by ffprobe's `codec_type`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CodecType {
    Video,
    Audio,
    Subtitle,
    /// Data, attachment, or anything else ffprobe reports.
    Other,
}

impl CodecType {
    /// Map an ffprobe `codec_type` string.
    pub fn from_ffprobe(value: &str) -> Self {
        match value {
            "video" => CodecType::Video,
            "audio" => CodecType::Audio,
            "subtitle" => CodecType::Subtitle,
            _ => CodecType::Other,
        }
    }
}

/// Which streams an inspection should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFilter {
    Video,
    Audio,
    Subtitle,
    All,
}

impl StreamFilter {
    /// Argument for ffprobe's `-select_streams`, if the filter narrows the result.
    pub fn select_arg(self) -> Option<&'static str> {
        match self {
            StreamFilter::Video => Some("v"),
            StreamFilter::Audio => Some("a"),
            StreamFilter::Subtitle => Some("s"),
            StreamFilter::All => None,
        }
    }

    /// Whether a stream of the given type passes this filter.
    pub fn matches(self, codec_type: CodecType) -> bool {
        match self {
            StreamFilter::Video => codec_type == CodecType::Video,
            StreamFilter::Audio => codec_type == CodecType::Audio,
            StreamFilter::Subtitle => codec_type == CodecType::Subtitle,
            StreamFilter::All => true,
        }
    }
}

/// One elementary stream of a probed container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    /// Absolute stream index within the container (unique per probe).
    pub index: u32,
    /// Stream kind.
    pub codec_type: CodecType,
    /// Codec name (e.g., "aac", "h264", "arib_caption").
    pub codec_name: Option<String>,
    /// Audio channel count.
    pub channels: Option<u32>,
    /// Bitrate in bits per second.
    pub bit_rate: Option<u64>,
    /// Audio sample rate in Hz.
    pub sample_rate: Option<u32>,
    /// Video width in pixels.
    pub width: Option<u32>,
    /// Video height in pixels.
    pub height: Option<u32>,
    /// Language tag (e.g., "jpn", "eng"). Empty tags are normalized to `None`.
    pub language: Option<String>,
    /// Stream title tag.
    pub title: Option<String>,
}

impl StreamRecord {
    /// Create a record with only the index and type set.
    pub fn new(index: u32, codec_type: CodecType) -> Self {
        Self {
            index,
            codec_type,
            codec_name: None,
            channels: None,
            bit_rate: None,
            sample_rate: None,
            width: None,
            height: None,
            language: None,
            title: None,
        }
    }

    /// Shorthand for an audio stream record.
    pub fn audio(index: u32) -> Self {
        Self::new(index, CodecType::Audio)
    }

    /// Shorthand for a subtitle stream record.
    pub fn subtitle(index: u32) -> Self {
        Self::new(index, CodecType::Subtitle)
    }

    /// Set the codec name.
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec_name = Some(codec.into());
        self
    }

    /// Set the language tag.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the title tag.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Language tag if present and non-empty.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref().filter(|l| !l.is_empty())
    }

    /// Title tag if present and non-empty.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.is_empty())
    }
}
