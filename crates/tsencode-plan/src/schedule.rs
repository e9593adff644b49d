//! EPG schedule documents and the broadcast component type.
//!
//! The second positional argument is either a path to a recorder-exported
//! JSON document describing the programme, or (legacy mode) the raw ARIB
//! audio component type. A document that exists but cannot be used degrades
//! to legacy mode; only a document that is named but missing is fatal.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// ARIB STD-B10 content genres (content_nibble_level_1).
pub const MAIN_GENRES: [&str; 16] = [
    "ニュース／報道",
    "スポーツ",
    "情報／ワイドショー",
    "ドラマ",
    "音楽",
    "バラエティ",
    "映画",
    "アニメ／特撮",
    "ドキュメンタリー／教養",
    "劇場／公演",
    "趣味／教育",
    "福祉",
    "予備（未使用・その他）",
    "予備（未使用・その他）",
    "予備（未使用・その他）",
    "予備（未使用・その他）",
];

/// Sub-genres (content_nibble_level_2). Index 0 ("general") is never displayed.
pub const SUB_GENRES: [&str; 8] = [
    "一般",
    "天気",
    "特集／ドキュメント",
    "解説",
    "討論",
    "会見",
    "特別番組",
    "その他",
];

const GENRE_SEPARATOR: &str = " / ";

/// ARIB audio `component_type`. Only dual-mono gets special handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentType(pub i64);

impl ComponentType {
    /// 1/0+1/0 mode: two independent mono programmes on a stereo carrier.
    pub const DUAL_MONO: ComponentType = ComponentType(2);

    /// Parse the leading integer of a legacy positional argument.
    ///
    /// Anything without a leading integer yields 0.
    pub fn parse_legacy(arg: &str) -> Self {
        let trimmed = arg.trim_start();
        let (sign, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());

        digits[..end]
            .parse::<i64>()
            .map(|n| ComponentType(sign * n))
            .unwrap_or_default()
    }

    pub fn is_dual_mono(self) -> bool {
        self == Self::DUAL_MONO
    }
}

/// What the second positional argument turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleArg {
    /// Path to an EPG JSON document.
    Document(PathBuf),
    /// Legacy numeric component type string.
    ComponentType(String),
}

impl ScheduleArg {
    /// Classify a positional argument by its extension.
    pub fn from_positional(arg: &str) -> Self {
        if arg.ends_with(".json") {
            ScheduleArg::Document(PathBuf::from(arg))
        } else {
            ScheduleArg::ComponentType(arg.to_string())
        }
    }
}

/// Descriptive metadata extracted from a schedule document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleMetadata {
    pub title: Option<String>,
    /// Description and extended description joined by a newline.
    pub description: Option<String>,
    pub air_date: Option<NaiveDate>,
    /// At most three entries, `"Main"` or `"Main - Sub"`.
    pub genres: Vec<String>,
}

impl ScheduleMetadata {
    /// All genres joined for a single container tag.
    pub fn genre(&self) -> Option<String> {
        if self.genres.is_empty() {
            None
        } else {
            Some(self.genres.join(GENRE_SEPARATOR))
        }
    }

    /// Container metadata key/value pairs in emission order, present fields only.
    ///
    /// Newlines in the description are flattened to spaces.
    pub fn tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = Vec::new();
        if let Some(description) = &self.description {
            tags.push(("description", description.replace('\n', " ")));
        }
        if let Some(title) = &self.title {
            tags.push(("title", title.clone()));
        }
        if let Some(date) = self.air_date {
            tags.push(("date", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(genre) = self.genre() {
            tags.push(("genre", genre));
        }
        tags
    }

    pub fn is_empty(&self) -> bool {
        self.tags().is_empty()
    }
}

/// Outcome of resolving the second positional argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleSource {
    pub component_type: ComponentType,
    /// `None` in legacy mode.
    pub metadata: Option<ScheduleMetadata>,
}

impl ScheduleSource {
    fn legacy(component_type: ComponentType) -> Self {
        Self {
            component_type,
            metadata: None,
        }
    }
}

/// Raw document fields. Each one is interpreted on its own so a single
/// unexpected value does not invalidate the rest.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleDocument {
    audio_component_type: Option<Value>,
    name: Option<Value>,
    description: Option<Value>,
    extended: Option<Value>,
    start_at: Option<Value>,
    genre1: Option<Value>,
    sub_genre1: Option<Value>,
    genre2: Option<Value>,
    sub_genre2: Option<Value>,
    genre3: Option<Value>,
    sub_genre3: Option<Value>,
}

/// A genre table key as it appeared in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GenreKey {
    Index(i64),
    /// Not an integer; rendered verbatim.
    Raw(String),
}

impl GenreKey {
    /// `None` for JSON null.
    fn from_value(value: &Value) -> Option<Self> {
        let key = match value {
            Value::Null => return None,
            Value::Number(n) => n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                        .map(|f| f as i64)
                })
                .map(GenreKey::Index)
                .unwrap_or_else(|| GenreKey::Raw(n.to_string())),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(GenreKey::Index)
                .unwrap_or_else(|_| GenreKey::Raw(s.clone())),
            other => GenreKey::Raw(other.to_string()),
        };
        Some(key)
    }
}

/// Resolve the component type and optional metadata.
///
/// # Errors
///
/// Returns [`Error::ScheduleNotFound`] when a document path is given but the
/// file does not exist. Every other problem falls back to legacy mode.
pub fn resolve(arg: Option<&ScheduleArg>) -> Result<ScheduleSource> {
    let path = match arg {
        None => {
            info!("Using legacy mode - audioComponentType: 0");
            return Ok(ScheduleSource::default());
        }
        Some(ScheduleArg::ComponentType(value)) => {
            let component_type = ComponentType::parse_legacy(value);
            info!(
                "Using legacy mode - audioComponentType: {}",
                component_type.0
            );
            return Ok(ScheduleSource::legacy(component_type));
        }
        Some(ScheduleArg::Document(path)) => path,
    };

    if !path.exists() {
        return Err(Error::schedule_not_found(path));
    }

    Ok(load_document(path))
}

fn load_document(path: &Path) -> ScheduleSource {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!("Error reading schedule document {:?}: {}", path, e);
            info!("Fallback to legacy mode due to read error");
            return ScheduleSource::default();
        }
    };

    let content = content.trim();
    if content.is_empty() {
        info!("Schedule document is empty, using legacy mode");
        return ScheduleSource::default();
    }

    match parse_document(content) {
        Ok((component_type, metadata)) => {
            info!(
                "Using schedule document - audioComponentType: {}",
                component_type.0
            );
            ScheduleSource {
                component_type,
                metadata: Some(metadata),
            }
        }
        Err(e) => {
            error!("Error parsing schedule document: {}", e);
            info!("Fallback to legacy mode due to parse error");
            ScheduleSource::default()
        }
    }
}

/// Parse a non-empty schedule document.
///
/// # Errors
///
/// Fails only when `content` is not JSON or not a JSON object. Fields of an
/// unexpected type are skipped individually.
pub fn parse_document(content: &str) -> Result<(ComponentType, ScheduleMetadata)> {
    let value: Value = serde_json::from_str(content)?;
    if !value.is_object() {
        return Err(Error::ScheduleNotObject);
    }
    let doc: ScheduleDocument = serde_json::from_value(value)?;

    let component_type = doc
        .audio_component_type
        .as_ref()
        .map(component_type_from_value)
        .unwrap_or_default();

    let description = [
        text_field("description", doc.description.as_ref()),
        text_field("extended", doc.extended.as_ref()),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("\n");
    let description = (!description.is_empty()).then_some(description);
    if let Some(description) = &description {
        info!("Metadata description will be added: {}", description);
    }

    let title = text_field("name", doc.name.as_ref())
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    if let Some(title) = &title {
        info!("Metadata title will be added: {}", title);
    }

    let air_date = doc.start_at.as_ref().and_then(air_date_from_value);
    if let Some(date) = air_date {
        info!("Metadata date will be added: {}", date);
    }

    let slots = [
        (doc.genre1, doc.sub_genre1),
        (doc.genre2, doc.sub_genre2),
        (doc.genre3, doc.sub_genre3),
    ];
    let mut genres = Vec::new();
    for (slot, (genre, sub_genre)) in slots.into_iter().enumerate() {
        debug!(
            "Processing genre{}: {:?} subGenre{}: {:?}",
            slot + 1,
            genre,
            slot + 1,
            sub_genre
        );
        let genre = genre.as_ref().and_then(GenreKey::from_value);
        let sub_genre = sub_genre.as_ref().and_then(GenreKey::from_value);
        match compose_genre(genre, sub_genre) {
            Some(text) => {
                debug!("Added genre: {}", text);
                genres.push(text);
            }
            None => debug!("Skipping genre{} - absent or null", slot + 1),
        }
    }

    let metadata = ScheduleMetadata {
        title,
        description,
        air_date,
        genres,
    };
    match metadata.genre() {
        Some(genre) => info!("Metadata genre will be added: {}", genre),
        None => debug!("No valid genres found"),
    }

    Ok((component_type, metadata))
}

/// Display string for a main genre index.
pub fn main_genre_name(index: i64) -> String {
    genre_key_name(&GenreKey::Index(index), &MAIN_GENRES, "Genre")
}

/// Display string for a sub-genre index.
pub fn sub_genre_name(index: i64) -> String {
    genre_key_name(&GenreKey::Index(index), &SUB_GENRES, "SubGenre")
}

fn genre_key_name(key: &GenreKey, table: &[&str], fallback: &str) -> String {
    match key {
        GenreKey::Index(index) => usize::try_from(*index)
            .ok()
            .and_then(|i| table.get(i))
            .map(|name| name.to_string())
            .unwrap_or_else(|| format!("{}{}", fallback, index)),
        GenreKey::Raw(raw) => format!("{}{}", fallback, raw),
    }
}

/// One genre slot. Main genre 0 is valid; an absent main genre drops the slot.
/// Sub-genre 0 means "general" and is not shown.
fn compose_genre(genre: Option<GenreKey>, sub_genre: Option<GenreKey>) -> Option<String> {
    let main = genre_key_name(&genre?, &MAIN_GENRES, "Genre");
    match sub_genre {
        Some(GenreKey::Index(0)) | None => Some(main),
        Some(sub) => Some(format!(
            "{} - {}",
            main,
            genre_key_name(&sub, &SUB_GENRES, "SubGenre")
        )),
    }
}

/// String field value; other JSON types are skipped with a warning.
fn text_field<'a>(field: &str, value: Option<&'a Value>) -> Option<&'a str> {
    match value? {
        Value::String(s) => Some(s.as_str()),
        Value::Null => None,
        other => {
            warn!("Ignoring non-text {}: {}", field, other);
            None
        }
    }
}

fn component_type_from_value(value: &Value) -> ComponentType {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .map(ComponentType)
            .unwrap_or_default(),
        Value::String(s) => ComponentType::parse_legacy(s),
        _ => ComponentType::default(),
    }
}

/// Calendar date (UTC) of `startAt`, given as epoch milliseconds or an ISO-8601 string.
fn air_date_from_value(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            if millis == 0 {
                return None;
            }
            DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive())
        }
        Value::String(s) if !s.is_empty() => {
            let date = DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc).date_naive())
                .or_else(|_| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date())
                })
                .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"));
            match date {
                Ok(date) => Some(date),
                Err(e) => {
                    warn!("Ignoring unparseable startAt {:?}: {}", s, e);
                    None
                }
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_doc(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_genre_zero_is_valid_and_sub_genre_zero_is_hidden() {
        let (_, meta) =
            parse_document(r#"{ "genre1": 0, "subGenre1": 0, "genre2": null }"#).unwrap();
        assert_eq!(meta.genres, vec!["ニュース／報道"]);
    }

    #[test]
    fn test_absent_genre_skips_slot_even_with_sub_genre() {
        let (_, meta) = parse_document(r#"{ "subGenre1": 3, "genre2": 7, "subGenre2": 1 }"#).unwrap();
        assert_eq!(meta.genres, vec!["アニメ／特撮 - 天気"]);
    }

    #[test]
    fn test_genres_join_and_unknown_indices() {
        let (_, meta) = parse_document(
            r#"{ "genre1": 0, "subGenre1": 1, "genre2": 20, "subGenre2": 9, "genre3": 3 }"#,
        )
        .unwrap();
        assert_eq!(
            meta.genre().unwrap(),
            "ニュース／報道 - 天気 / Genre20 - SubGenre9 / ドラマ"
        );
    }

    #[test]
    fn test_air_date_ignores_time_of_day() {
        for start in [
            "2024-03-09T00:00:00Z",
            "2024-03-09T12:34:56.789Z",
            "2024-03-09T23:59:59Z",
        ] {
            let doc = format!(r#"{{ "startAt": "{}" }}"#, start);
            let (_, meta) = parse_document(&doc).unwrap();
            assert_eq!(meta.air_date, NaiveDate::from_ymd_opt(2024, 3, 9));
        }
    }

    #[test]
    fn test_air_date_from_epoch_millis() {
        // 2024-03-09T12:00:00Z
        let (_, meta) = parse_document(r#"{ "startAt": 1709985600000 }"#).unwrap();
        assert_eq!(meta.air_date, NaiveDate::from_ymd_opt(2024, 3, 9));
    }

    #[test]
    fn test_air_date_uses_utc() {
        let (_, meta) = parse_document(r#"{ "startAt": "2024-03-09T05:00:00+09:00" }"#).unwrap();
        assert_eq!(meta.air_date, NaiveDate::from_ymd_opt(2024, 3, 8));
    }

    #[test]
    fn test_description_and_tags() {
        let (ct, meta) = parse_document(
            r#"{
                "audioComponentType": 2,
                "name": "ニュース7",
                "description": "今日のニュース",
                "extended": "出演者\n青井実",
                "startAt": "2024-03-09T10:00:00Z",
                "genre1": 0
            }"#,
        )
        .unwrap();
        assert!(ct.is_dual_mono());
        assert_eq!(
            meta.description.as_deref(),
            Some("今日のニュース\n出演者\n青井実")
        );
        assert_eq!(
            meta.tags(),
            vec![
                ("description", "今日のニュース 出演者 青井実".to_string()),
                ("title", "ニュース7".to_string()),
                ("date", "2024-03-09".to_string()),
                ("genre", "ニュース／報道".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_description_parts_are_dropped() {
        let (_, meta) = parse_document(r#"{ "description": "", "extended": "詳細" }"#).unwrap();
        assert_eq!(meta.description.as_deref(), Some("詳細"));

        let (_, meta) = parse_document(r#"{ "description": "" }"#).unwrap();
        assert!(meta.description.is_none());
        assert!(meta.is_empty());
    }

    #[test]
    fn test_component_type_forms() {
        let (ct, _) = parse_document(r#"{ "audioComponentType": "2" }"#).unwrap();
        assert_eq!(ct, ComponentType(2));
        let (ct, _) = parse_document(r#"{ "audioComponentType": 3 }"#).unwrap();
        assert_eq!(ct, ComponentType(3));
        let (ct, _) = parse_document(r#"{ "name": "x" }"#).unwrap();
        assert_eq!(ct, ComponentType(0));
    }

    #[test]
    fn test_parse_legacy_component_type() {
        assert_eq!(ComponentType::parse_legacy("2"), ComponentType(2));
        assert_eq!(ComponentType::parse_legacy(" 2 "), ComponentType(2));
        assert_eq!(ComponentType::parse_legacy("2abc"), ComponentType(2));
        assert_eq!(ComponentType::parse_legacy("-1"), ComponentType(-1));
        assert_eq!(ComponentType::parse_legacy("stereo"), ComponentType(0));
        assert_eq!(ComponentType::parse_legacy(""), ComponentType(0));
    }

    #[test]
    fn test_schedule_arg_classification() {
        assert_eq!(
            ScheduleArg::from_positional("/rec/prog.json"),
            ScheduleArg::Document(PathBuf::from("/rec/prog.json"))
        );
        assert_eq!(
            ScheduleArg::from_positional("2"),
            ScheduleArg::ComponentType("2".to_string())
        );
    }

    #[test]
    fn test_resolve_absent_is_legacy() {
        let source = resolve(None).unwrap();
        assert_eq!(source.component_type, ComponentType(0));
        assert!(source.metadata.is_none());

        let arg = ScheduleArg::ComponentType("2".to_string());
        let source = resolve(Some(&arg)).unwrap();
        assert!(source.component_type.is_dual_mono());
        assert!(source.metadata.is_none());
    }

    #[test]
    fn test_resolve_missing_document_is_fatal() {
        let arg = ScheduleArg::Document(PathBuf::from("/nonexistent/prog.json"));
        let err = resolve(Some(&arg)).unwrap_err();
        assert!(matches!(err, Error::ScheduleNotFound { .. }));
    }

    #[test]
    fn test_resolve_empty_document_is_legacy() {
        let file = write_doc("  \n\t ");
        let arg = ScheduleArg::Document(file.path().to_path_buf());
        let source = resolve(Some(&arg)).unwrap();
        assert_eq!(source, ScheduleSource::default());
    }

    #[test]
    fn test_resolve_malformed_document_is_legacy() {
        for content in ["{ not json", "[1, 2, 3]", r#""text""#, "42"] {
            let file = write_doc(content);
            let arg = ScheduleArg::Document(file.path().to_path_buf());
            let source = resolve(Some(&arg)).unwrap();
            assert_eq!(source, ScheduleSource::default(), "content: {}", content);
        }
    }

    #[test]
    fn test_odd_field_types_do_not_discard_document() {
        let file = write_doc(r#"{ "audioComponentType": 2, "genre1": "3" }"#);
        let arg = ScheduleArg::Document(file.path().to_path_buf());
        let source = resolve(Some(&arg)).unwrap();
        assert!(source.component_type.is_dual_mono());
        assert_eq!(source.metadata.unwrap().genres, vec!["ドラマ"]);

        let (ct, meta) = parse_document(
            r#"{ "audioComponentType": 2, "name": 12345, "description": "説明", "genre1": 3.0, "subGenre1": "1" }"#,
        )
        .unwrap();
        assert!(ct.is_dual_mono());
        assert_eq!(meta.title, None);
        assert_eq!(meta.description.as_deref(), Some("説明"));
        assert_eq!(meta.genres, vec!["ドラマ - 天気"]);
    }

    #[test]
    fn test_non_numeric_genres_render_raw() {
        let (_, meta) = parse_document(
            r#"{ "genre1": "drama", "genre2": 2.5, "subGenre2": 0, "genre3": true, "subGenre3": "x" }"#,
        )
        .unwrap();
        assert_eq!(
            meta.genres,
            vec!["Genredrama", "Genre2.5", "Genretrue - SubGenrex"]
        );
    }

    #[test]
    fn test_resolve_valid_document() {
        let file = write_doc(r#"{ "audioComponentType": 2, "name": "映画" }"#);
        let arg = ScheduleArg::Document(file.path().to_path_buf());
        let source = resolve(Some(&arg)).unwrap();
        assert!(source.component_type.is_dual_mono());
        assert_eq!(
            source.metadata.unwrap().title.as_deref(),
            Some("映画")
        );
    }
}
