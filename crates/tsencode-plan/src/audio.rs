//! Audio track selection.
//!
//! Decides which probed audio streams end up in the output, in which order,
//! with which language tags, and whether a dual-mono carrier gets split into
//! two mono tracks.

use crate::schedule::ComponentType;
use crate::tags::FilenameTags;
use tracing::{debug, info, warn};
use tsencode_av::{AudioCodec, CodecType, StreamRecord};

/// Output bitrate for every audio track.
pub const DEFAULT_BITRATE: &str = "192k";

pub const JAPANESE: &str = "jpn";
pub const ENGLISH: &str = "eng";

/// Title substrings marking the primary programme audio. Matched case-sensitively.
const MAIN_TITLE_MARKERS: [&str; 4] = ["主", "メイン", "main", "primary"];

// Matched against the lowercased title, first hit wins.
const ENGLISH_TITLE_MARKERS: [&str; 3] = ["eng", "english", "英語"];
const JAPANESE_TITLE_MARKERS: [&str; 5] = ["jpn", "japanese", "日本語", "主", "メイン"];
const SECONDARY_TITLE_MARKERS: [&str; 4] = ["副", "解説", "comm", "comment"];

/// One half of a split dual-mono carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitChannel {
    Left,
    Right,
}

impl SplitChannel {
    /// Filter graph pad label.
    pub fn label(self) -> &'static str {
        match self {
            SplitChannel::Left => "left",
            SplitChannel::Right => "right",
        }
    }
}

/// How the audio streams are laid out in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioLayout {
    /// No audio streams were detected.
    Silent,
    /// First stream split into left/right mono tracks.
    DualMono,
    /// Only the main programme stream.
    MainOnly,
    /// Every detected stream in probe order.
    AllStreams,
}

/// A single output audio track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioMapping {
    /// Source stream index in the input container.
    pub source: u32,
    /// Dense 0-based output audio track index.
    pub output_index: usize,
    pub language: String,
    /// Set when the track is one channel of a split dual-mono carrier.
    pub channel: Option<SplitChannel>,
}

/// Audio portion of a transcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPlan {
    pub layout: AudioLayout,
    pub mappings: Vec<AudioMapping>,
    pub codec: AudioCodec,
    pub bitrate: String,
    /// Channels per output track.
    pub channels: u32,
}

impl AudioPlan {
    /// Build the plan.
    ///
    /// Dual-mono takes precedence over every filename tag. Callers that want
    /// tags ignored pass `FilenameTags::default()`.
    pub fn build(
        tags: &FilenameTags,
        component_type: ComponentType,
        streams: &[StreamRecord],
        codec: AudioCodec,
        bitrate: &str,
    ) -> Self {
        let audio: Vec<&StreamRecord> = streams
            .iter()
            .filter(|s| s.codec_type == CodecType::Audio)
            .collect();

        let plan = |layout, mappings, channels| AudioPlan {
            layout,
            mappings,
            codec,
            bitrate: bitrate.to_string(),
            channels,
        };

        let Some(&first) = audio.first() else {
            warn!("No audio streams found");
            return plan(AudioLayout::Silent, Vec::new(), 2);
        };

        if component_type.is_dual_mono() {
            info!("Processing stream {} as dual mono", first.index);
            let halves = [(SplitChannel::Left, JAPANESE), (SplitChannel::Right, ENGLISH)];
            let mappings: Vec<AudioMapping> = halves
                .into_iter()
                .enumerate()
                .map(|(output_index, (channel, language))| AudioMapping {
                    source: first.index,
                    output_index,
                    language: language.to_string(),
                    channel: Some(channel),
                })
                .collect();
            return plan(AudioLayout::DualMono, mappings, 1);
        }

        if !tags.maps_all_audio() {
            let main = find_main_stream(&audio).unwrap_or(first);
            info!("Mapping only main audio stream: {}", main.index);
            let mapping = AudioMapping {
                source: main.index,
                output_index: 0,
                language: JAPANESE.to_string(),
                channel: None,
            };
            return plan(AudioLayout::MainOnly, vec![mapping], 2);
        }

        let languages = infer_languages(&audio, tags.bilingual);
        let mappings: Vec<AudioMapping> = audio
            .iter()
            .zip(languages)
            .enumerate()
            .map(|(output_index, (stream, language))| {
                info!(
                    "Mapping audio stream {} as audio track {} with language: {}",
                    stream.index, output_index, language
                );
                AudioMapping {
                    source: stream.index,
                    output_index,
                    language,
                    channel: None,
                }
            })
            .collect();
        plan(AudioLayout::AllStreams, mappings, 2)
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn is_dual_mono(&self) -> bool {
        self.layout == AudioLayout::DualMono
    }

    /// ffmpeg output options for this plan.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.mappings.is_empty() {
            return args;
        }

        if self.is_dual_mono() {
            let source = self.mappings[0].source;
            let pads: String = self
                .mappings
                .iter()
                .filter_map(|m| m.channel)
                .map(|c| format!("[{}]", c.label()))
                .collect();
            args.push("-filter_complex".to_string());
            args.push(format!(
                "[0:{}]channelsplit=channel_layout=stereo{}",
                source, pads
            ));
            for mapping in &self.mappings {
                if let Some(channel) = mapping.channel {
                    args.push("-map".to_string());
                    args.push(format!("[{}]", channel.label()));
                }
            }
            for mapping in &self.mappings {
                args.push(format!("-metadata:s:a:{}", mapping.output_index));
                args.push(format!("language={}", mapping.language));
            }
            args.push("-c:a".to_string());
            args.push(self.codec.ffmpeg_name().to_string());
            for mapping in &self.mappings {
                args.push(format!("-b:a:{}", mapping.output_index));
                args.push(self.bitrate.clone());
            }
            for mapping in &self.mappings {
                args.push(format!("-ac:a:{}", mapping.output_index));
                args.push(self.channels.to_string());
            }
            return args;
        }

        for mapping in &self.mappings {
            args.push("-map".to_string());
            args.push(format!("0:{}?", mapping.source));
            args.push(format!("-metadata:s:a:{}", mapping.output_index));
            args.push(format!("language={}", mapping.language));
        }
        args.push("-c:a".to_string());
        args.push(self.codec.ffmpeg_name().to_string());
        args.push("-b:a".to_string());
        args.push(self.bitrate.clone());
        args.push("-ac".to_string());
        args.push(self.channels.to_string());
        args
    }
}

/// Pick the primary programme audio.
///
/// Prefers a Japanese language tag, then a title carrying a main marker,
/// then the first stream.
pub fn find_main_stream<'a>(streams: &[&'a StreamRecord]) -> Option<&'a StreamRecord> {
    if let Some(stream) = streams
        .iter()
        .find(|s| matches!(s.language(), Some("jpn") | Some("ja")))
    {
        debug!("Found Japanese audio stream: {}", stream.index);
        return Some(*stream);
    }

    if let Some(stream) = streams.iter().find(|s| {
        s.title()
            .is_some_and(|t| MAIN_TITLE_MARKERS.iter().any(|m| t.contains(m)))
    }) {
        debug!("Found main audio stream by title: {}", stream.index);
        return Some(*stream);
    }

    streams.first().copied()
}

/// Language tag for every stream, in input order.
pub fn infer_languages(streams: &[&StreamRecord], bilingual: bool) -> Vec<String> {
    let mut languages: Vec<Option<String>> = streams
        .iter()
        .map(|s| {
            s.language()
                .map(str::to_string)
                .or_else(|| s.title().and_then(language_from_title).map(str::to_string))
        })
        .collect();

    let untagged: Vec<usize> = languages
        .iter()
        .enumerate()
        .filter(|(_, lang)| lang.is_none())
        .map(|(pos, _)| pos)
        .collect();

    if bilingual && streams.len() >= 2 && !untagged.is_empty() {
        debug!("Bilingual content: lower index is Japanese, higher index is English");
        let lowest = untagged.iter().copied().min_by_key(|&pos| streams[pos].index);
        let highest = untagged.iter().copied().max_by_key(|&pos| streams[pos].index);
        if let Some(pos) = lowest {
            languages[pos] = Some(JAPANESE.to_string());
        }
        if let Some(pos) = highest.filter(|&pos| Some(pos) != lowest) {
            languages[pos] = Some(ENGLISH.to_string());
        }
    }

    languages
        .into_iter()
        .map(|lang| lang.unwrap_or_else(|| JAPANESE.to_string()))
        .collect()
}

fn language_from_title(title: &str) -> Option<&'static str> {
    let title = title.to_lowercase();
    let has_any = |markers: &[&str]| markers.iter().any(|m| title.contains(m));

    if has_any(&ENGLISH_TITLE_MARKERS) {
        Some(ENGLISH)
    } else if has_any(&JAPANESE_TITLE_MARKERS) || has_any(&SECONDARY_TITLE_MARKERS) {
        Some(JAPANESE)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(name: &str, component: i64, streams: &[StreamRecord]) -> AudioPlan {
        AudioPlan::build(
            &FilenameTags::from_filename(name),
            ComponentType(component),
            streams,
            AudioCodec::Aac,
            DEFAULT_BITRATE,
        )
    }

    fn sources(plan: &AudioPlan) -> Vec<u32> {
        plan.mappings.iter().map(|m| m.source).collect()
    }

    fn languages(plan: &AudioPlan) -> Vec<&str> {
        plan.mappings.iter().map(|m| m.language.as_str()).collect()
    }

    #[test]
    fn test_no_audio_streams() {
        let plan = build("映画[二]", 2, &[]);
        assert_eq!(plan.layout, AudioLayout::Silent);
        assert!(plan.args().is_empty());
    }

    #[test]
    fn test_dual_mono_overrides_tags() {
        let streams = [StreamRecord::audio(1), StreamRecord::audio(2)];
        for name in ["x[多]", "x[二]", "x[解]", "x[副]", "x"] {
            let plan = build(name, 2, &streams);
            assert!(plan.is_dual_mono(), "{}", name);
            assert_eq!(sources(&plan), vec![1, 1]);
            assert_eq!(languages(&plan), vec!["jpn", "eng"]);
            assert_eq!(plan.channels, 1);
        }
    }

    #[test]
    fn test_dual_mono_args() {
        let plan = AudioPlan::build(
            &FilenameTags::default(),
            ComponentType::DUAL_MONO,
            &[StreamRecord::audio(1)],
            AudioCodec::FdkAac,
            DEFAULT_BITRATE,
        );
        assert_eq!(
            plan.args(),
            vec![
                "-filter_complex",
                "[0:1]channelsplit=channel_layout=stereo[left][right]",
                "-map",
                "[left]",
                "-map",
                "[right]",
                "-metadata:s:a:0",
                "language=jpn",
                "-metadata:s:a:1",
                "language=eng",
                "-c:a",
                "libfdk_aac",
                "-b:a:0",
                "192k",
                "-b:a:1",
                "192k",
                "-ac:a:0",
                "1",
                "-ac:a:1",
                "1",
            ]
        );
    }

    #[test]
    fn test_untagged_filename_maps_main_only() {
        let streams = [
            StreamRecord::audio(1).with_language("eng"),
            StreamRecord::audio(2).with_language("jpn"),
        ];
        let plan = build("News[字]", 0, &streams);
        assert_eq!(plan.layout, AudioLayout::MainOnly);
        assert_eq!(sources(&plan), vec![2]);
        assert_eq!(
            plan.args(),
            vec![
                "-map",
                "0:2?",
                "-metadata:s:a:0",
                "language=jpn",
                "-c:a",
                "aac",
                "-b:a",
                "192k",
                "-ac",
                "2",
            ]
        );
    }

    #[test]
    fn test_main_stream_tie_break() {
        let a = StreamRecord::audio(1).with_title("副音声");
        let b = StreamRecord::audio(2).with_title("主音声");
        let c = StreamRecord::audio(3).with_language("ja");
        assert_eq!(find_main_stream(&[&a, &b, &c]).unwrap().index, 3);
        assert_eq!(find_main_stream(&[&a, &b]).unwrap().index, 2);
        assert_eq!(find_main_stream(&[&a]).unwrap().index, 1);
        assert!(find_main_stream(&[]).is_none());

        // title markers are case-sensitive
        let upper = StreamRecord::audio(4).with_title("MAIN");
        let lower = StreamRecord::audio(5).with_title("main mix");
        assert_eq!(find_main_stream(&[&upper, &lower]).unwrap().index, 5);
    }

    #[test]
    fn test_bilingual_untagged_pair() {
        let streams = [StreamRecord::audio(1), StreamRecord::audio(2)];
        let plan = build("映画[二]", 0, &streams);
        assert_eq!(plan.layout, AudioLayout::AllStreams);
        assert_eq!(languages(&plan), vec!["jpn", "eng"]);
        let outputs: Vec<usize> = plan.mappings.iter().map(|m| m.output_index).collect();
        assert_eq!(outputs, vec![0, 1]);
    }

    #[test]
    fn test_bilingual_single_untagged_gets_japanese() {
        let streams = [
            StreamRecord::audio(1).with_language("eng"),
            StreamRecord::audio(2),
        ];
        let plan = build("映画[二]", 0, &streams);
        assert_eq!(languages(&plan), vec!["eng", "jpn"]);
    }

    #[test]
    fn test_title_inference() {
        let streams = [
            StreamRecord::audio(1).with_title("English"),
            StreamRecord::audio(2).with_title("解説"),
            StreamRecord::audio(3).with_title("Stereo"),
        ];
        let plan = build("番組[多]", 0, &streams);
        assert_eq!(languages(&plan), vec!["eng", "jpn", "jpn"]);
    }

    #[test]
    fn test_explicit_language_is_kept() {
        let streams = [
            StreamRecord::audio(1).with_language("fre").with_title("English"),
            StreamRecord::audio(2),
            StreamRecord::audio(3),
        ];
        let plan = build("映画[二]", 0, &streams);
        assert_eq!(languages(&plan), vec!["fre", "jpn", "eng"]);
    }

    #[test]
    fn test_all_streams_args() {
        let streams = [StreamRecord::audio(1), StreamRecord::audio(2)];
        let plan = build("x[解]", 0, &streams);
        assert_eq!(
            plan.args(),
            vec![
                "-map",
                "0:1?",
                "-metadata:s:a:0",
                "language=jpn",
                "-map",
                "0:2?",
                "-metadata:s:a:1",
                "language=jpn",
                "-c:a",
                "aac",
                "-b:a",
                "192k",
                "-ac",
                "2",
            ]
        );
    }

    #[test]
    fn test_non_audio_records_are_ignored() {
        let streams = [StreamRecord::subtitle(0), StreamRecord::audio(1)];
        let plan = build("x", 0, &streams);
        assert_eq!(sources(&plan), vec![1]);
    }
}
