//! Broadcast filename tags.
//!
//! Japanese EPG titles carry bracketed single-character markers describing
//! the programme's audio and caption layout, e.g. `ニュース[字][二].m2ts`.

/// Closed captions are broadcast.
pub const SUBTITLED: &str = "[字]";
/// Bilingual broadcast (usually Japanese + English).
pub const BILINGUAL: &str = "[二]";
/// Audio description / commentary track.
pub const DESCRIPTIVE: &str = "[解]";
/// Multiple audio programmes.
pub const MULTI_AUDIO: &str = "[多]";
/// Secondary audio programme.
pub const SECONDARY: &str = "[副]";

/// Flags derived from a recording's base filename.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilenameTags {
    pub subtitled: bool,
    pub bilingual: bool,
    pub descriptive: bool,
    pub multi_audio: bool,
    pub secondary: bool,
}

impl FilenameTags {
    /// Detect every tag present in `name`. Each tag is matched independently.
    pub fn from_filename(name: &str) -> Self {
        Self {
            subtitled: name.contains(SUBTITLED),
            bilingual: name.contains(BILINGUAL),
            descriptive: name.contains(DESCRIPTIVE),
            multi_audio: name.contains(MULTI_AUDIO),
            secondary: name.contains(SECONDARY),
        }
    }

    /// Whether any tag implying more than one audio programme is set.
    pub fn maps_all_audio(&self) -> bool {
        self.bilingual || self.descriptive || self.multi_audio || self.secondary
    }
}
