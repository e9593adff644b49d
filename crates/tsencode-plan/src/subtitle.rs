//! Caption track selection.

use tracing::{debug, info};
use tsencode_av::{CodecType, StreamRecord};

/// Text subtitle codec understood by the MP4 muxer.
pub const SUBTITLE_CODEC: &str = "mov_text";
/// Broadcast captions are always Japanese.
pub const SUBTITLE_LANGUAGE: &str = "jpn";

/// Where a subtitle track comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleSource {
    Stream(u32),
    /// Best-effort `0:s?` mapping used when probing found nothing.
    Wildcard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtitleMapping {
    pub source: SubtitleSource,
    pub output_index: usize,
}

/// Subtitle portion of a transcode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitlePlan {
    pub mappings: Vec<SubtitleMapping>,
    /// Apply `-fix_sub_duration` to the input.
    pub fix_duration: bool,
}

impl SubtitlePlan {
    /// Build the plan.
    ///
    /// Captions are only mapped for subtitled recordings when a caption
    /// decoder is present and `ignore` is not set.
    pub fn build(
        subtitled: bool,
        decoder_available: bool,
        streams: &[StreamRecord],
        ignore: bool,
    ) -> Self {
        if ignore {
            info!("Ignoring filename tags, skipping subtitle processing");
            return Self::default();
        }
        if !subtitled {
            debug!("No [字] tag in filename, skipping subtitle processing");
            return Self::default();
        }
        if !decoder_available {
            info!("Caption decoder is not available, skipping subtitle mapping");
            return Self::default();
        }

        let sources: Vec<SubtitleSource> = streams
            .iter()
            .filter(|s| s.codec_type == CodecType::Subtitle)
            .map(|s| SubtitleSource::Stream(s.index))
            .collect();

        let sources = if sources.is_empty() {
            info!("No subtitle streams found, using wildcard mapping");
            vec![SubtitleSource::Wildcard]
        } else {
            sources
        };

        Self {
            mappings: sources
                .into_iter()
                .enumerate()
                .map(|(output_index, source)| SubtitleMapping {
                    source,
                    output_index,
                })
                .collect(),
            fix_duration: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Options that must precede `-i`.
    pub fn input_args(&self) -> Vec<String> {
        if self.fix_duration {
            vec!["-fix_sub_duration".to_string()]
        } else {
            Vec::new()
        }
    }

    /// Output mapping options, emitted after the metadata block.
    pub fn output_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for mapping in &self.mappings {
            match mapping.source {
                SubtitleSource::Stream(index) => {
                    args.push("-map".to_string());
                    args.push(format!("0:{}?", index));
                    args.push(format!("-c:s:{}", mapping.output_index));
                }
                SubtitleSource::Wildcard => {
                    args.push("-map".to_string());
                    args.push("0:s?".to_string());
                    args.push("-c:s".to_string());
                }
            }
            args.push(SUBTITLE_CODEC.to_string());
            args.push(format!("-metadata:s:s:{}", mapping.output_index));
            args.push(format!("language={}", SUBTITLE_LANGUAGE));
        }
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let streams = [StreamRecord::subtitle(2)];
        for decoder in [true, false] {
            assert!(SubtitlePlan::build(true, decoder, &streams, true).is_empty());
        }
    }

    #[test]
    fn test_requires_tag_and_decoder() {
        let streams = [StreamRecord::subtitle(2)];
        assert!(SubtitlePlan::build(false, true, &streams, false).is_empty());
        assert!(SubtitlePlan::build(true, false, &streams, false).is_empty());
        assert!(SubtitlePlan::build(false, true, &streams, false)
            .input_args()
            .is_empty());
    }

    #[test]
    fn test_maps_detected_streams() {
        let streams = [StreamRecord::subtitle(2), StreamRecord::subtitle(5)];
        let plan = SubtitlePlan::build(true, true, &streams, false);
        assert!(plan.fix_duration);
        assert_eq!(plan.input_args(), vec!["-fix_sub_duration"]);
        assert_eq!(
            plan.output_args(),
            vec![
                "-map",
                "0:2?",
                "-c:s:0",
                "mov_text",
                "-metadata:s:s:0",
                "language=jpn",
                "-map",
                "0:5?",
                "-c:s:1",
                "mov_text",
                "-metadata:s:s:1",
                "language=jpn",
            ]
        );
    }

    #[test]
    fn test_wildcard_fallback() {
        let plan = SubtitlePlan::build(true, true, &[], false);
        assert_eq!(plan.mappings.len(), 1);
        assert_eq!(plan.mappings[0].source, SubtitleSource::Wildcard);
        assert!(plan.fix_duration);
        assert_eq!(
            plan.output_args(),
            vec!["-map", "0:s?", "-c:s", "mov_text", "-metadata:s:s:0", "language=jpn"]
        );
    }
}
