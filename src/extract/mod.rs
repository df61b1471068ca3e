//! Narrative content extraction.
//!
//! Walks semi-structured narrative documents (campaign definitions,
//! encounter files, dialogue files, flavor-text collections) and flattens
//! them into a uniform list of reviewable items. Dispatch is shape-based:
//! the top-level keys of the decoded document select the extraction rule,
//! not the filename.
//!
//! # Design decisions
//!
//! - **Explicit rule table**: dispatch is an ordered list of
//!   (predicate, handler) pairs in [`RULES`]. A document could satisfy
//!   more than one shape; only the first listed rule fires. Precedence:
//!   chapters > flavor collection > themes > dialogue list (JSON), and
//!   encounter > standalone dialogue (YAML).
//! - **One value type**: YAML decodes into `serde_json::Value` through
//!   serde, so every rule works on the same representation.
//! - **Stable identifiers**: item ids derive from the file stem and the
//!   entry's logical key or position, never from content, so they survive
//!   text edits.
//! - **Total handlers**: rules skip malformed entries instead of failing.
//!   The only error path out of this module is a parse failure.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

mod rules;

/// Format of a narrative document, derived from its file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocFormat {
    Json,
    Yaml,
}

impl DocFormat {
    /// Map a file extension to a document format
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(DocFormat::Json),
            "yaml" | "yml" => Some(DocFormat::Yaml),
            _ => None,
        }
    }

    /// Map a path to a document format via its extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Identity of the document being extracted, used for id derivation
#[derive(Debug, Clone)]
pub struct Source {
    /// Filename without extension
    pub stem: String,

    /// Document format
    pub format: DocFormat,
}

impl Source {
    pub fn new(stem: impl Into<String>, format: DocFormat) -> Self {
        Self {
            stem: stem.into(),
            format,
        }
    }

    /// Build a source descriptor from a file path.
    ///
    /// Returns None for extensions that are not narrative documents.
    pub fn from_path(path: &Path) -> Option<Self> {
        let format = DocFormat::from_path(path)?;
        let stem = path.file_stem()?.to_string_lossy().into_owned();
        Some(Self { stem, format })
    }
}

/// Classification of a reviewable item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Chapter introduction text
    ChapterIntro,

    /// Encounter introduction text
    EncounterIntro,

    /// Encounter success text
    EncounterSuccess,

    /// Encounter failure text
    EncounterFailure,

    /// Player hint, with a level
    Hint,

    /// Spoken line, with a speaker
    Dialogue,

    /// Flavor text, with a category
    Flavor,

    /// Weekly rotation theme
    WeeklyTheme,
}

/// One unit of extracted narrative text a reviewer evaluates independently
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewableItem {
    /// Stable identifier derived from file identity and logical position
    pub id: String,

    /// Content-type tag
    #[serde(rename = "type")]
    pub kind: ItemKind,

    /// The literal text payload
    pub text: String,

    /// Human-readable context for the reviewer
    pub context: String,

    /// Speaker, for dialogue items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,

    /// Hint level, for hint items (1-indexed)
    #[serde(
        default,
        rename = "hintLevel",
        skip_serializing_if = "Option::is_none"
    )]
    pub hint_level: Option<u32>,

    /// Source category, for flavor items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Week number, for weekly theme items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub week: Option<u32>,
}

impl ReviewableItem {
    /// Create a new item with the required attributes
    pub fn new(
        id: impl Into<String>,
        kind: ItemKind,
        text: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            text: text.into(),
            context: context.into(),
            speaker: None,
            hint_level: None,
            category: None,
            week: None,
        }
    }

    /// Set the speaker
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    /// Set the hint level
    pub fn with_hint_level(mut self, level: u32) -> Self {
        self.hint_level = Some(level);
        self
    }

    /// Set the flavor category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the week number
    pub fn with_week(mut self, week: u32) -> Self {
        self.week = Some(week);
        self
    }
}

/// One shape-dispatch rule: a predicate over the decoded document and the
/// handler that runs when it matches
pub struct ShapeRule {
    /// Rule name, for logging and tests
    pub name: &'static str,

    /// Format the rule applies to
    pub format: DocFormat,

    /// Does the document have this shape?
    pub matches: fn(&Value) -> bool,

    /// Flatten the document into reviewable items
    pub extract: fn(&Source, &Value) -> Vec<ReviewableItem>,
}

/// The ordered dispatch table. Evaluation is first-match-wins; the order
/// here is the documented precedence and must not be reshuffled.
pub const RULES: &[ShapeRule] = &[
    ShapeRule {
        name: "campaign_chapters",
        format: DocFormat::Json,
        matches: rules::is_campaign,
        extract: rules::extract_campaign,
    },
    ShapeRule {
        name: "flavor_collection",
        format: DocFormat::Json,
        matches: rules::is_flavor_collection,
        extract: rules::extract_flavor,
    },
    ShapeRule {
        name: "weekly_themes",
        format: DocFormat::Json,
        matches: rules::is_weekly_themes,
        extract: rules::extract_themes,
    },
    ShapeRule {
        name: "dialogue_list",
        format: DocFormat::Json,
        matches: rules::is_dialogue_list,
        extract: rules::extract_dialogue_list,
    },
    ShapeRule {
        name: "encounter",
        format: DocFormat::Yaml,
        matches: rules::is_encounter,
        extract: rules::extract_encounter,
    },
    ShapeRule {
        name: "standalone_dialogue",
        format: DocFormat::Yaml,
        matches: rules::is_standalone_dialogue,
        extract: rules::extract_standalone_dialogue,
    },
];

/// Name of the rule that would handle this document, if any
pub fn matching_rule(source: &Source, doc: &Value) -> Option<&'static str> {
    RULES
        .iter()
        .find(|r| r.format == source.format && (r.matches)(doc))
        .map(|r| r.name)
}

/// Extract reviewable items from a decoded document.
///
/// Returns an empty list when no rule matches; the caller falls back to a
/// file-level record.
pub fn extract_items(source: &Source, doc: &Value) -> Vec<ReviewableItem> {
    for rule in RULES {
        if rule.format == source.format && (rule.matches)(doc) {
            return (rule.extract)(source, doc);
        }
    }

    Vec::new()
}

/// Parse a document and extract reviewable items from it.
///
/// A malformed document is the only error; callers log it and continue.
pub fn extract_from_str(source: &Source, content: &str) -> Result<Vec<ReviewableItem>> {
    let doc: Value = match source.format {
        DocFormat::Json => serde_json::from_str(content)
            .with_context(|| format!("Malformed JSON in {}", source.stem))?,
        DocFormat::Yaml => serde_yaml::from_str(content)
            .with_context(|| format!("Malformed YAML in {}", source.stem))?,
    };

    Ok(extract_items(source, &doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_source() -> Source {
        Source::new("doc", DocFormat::Json)
    }

    #[test]
    fn test_chapters_beat_dialogues() {
        let doc = json!({
            "chapters": [],
            "dialogues": [{"id": "d1", "text": "hello", "speaker": "Guard"}]
        });

        assert_eq!(
            matching_rule(&json_source(), &doc),
            Some("campaign_chapters")
        );
        // The chapters rule fires and finds nothing; the dialogue rule
        // never runs.
        assert!(extract_items(&json_source(), &doc).is_empty());
    }

    #[test]
    fn test_encounter_beats_standalone_dialogue() {
        let source = Source::new("guard_post", DocFormat::Yaml);
        let doc = json!({
            "title": "Guard Post",
            "speaker": "Guard",
            "intro_text": "Halt."
        });

        assert_eq!(matching_rule(&source, &doc), Some("encounter"));

        let items = extract_items(&source, &doc);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].kind, ItemKind::EncounterIntro);
    }

    #[test]
    fn test_format_gates_rules() {
        // An encounter-shaped document in a JSON file matches nothing
        let doc = json!({"title": "Gate", "intro_text": "A gate."});
        assert_eq!(matching_rule(&json_source(), &doc), None);
        assert!(extract_items(&json_source(), &doc).is_empty());
    }

    #[test]
    fn test_unrecognized_shape_yields_nothing() {
        let doc = json!({"settings": {"volume": 3}});
        assert!(extract_items(&json_source(), &doc).is_empty());
    }

    #[test]
    fn test_campaign_worked_example() {
        let content = r#"{"chapters":[{"number":1,"title":"Intro","intro_text":"Welcome",
            "encounters":[{"id":"e1","title":"Gate","intro_text":"A gate.",
            "hints":["look up","push"]}]}]}"#;

        let items = extract_from_str(&json_source(), content).unwrap();

        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "chapter_1_intro",
                "encounter_e1_intro",
                "encounter_e1_hint_1",
                "encounter_e1_hint_2"
            ]
        );
        assert_eq!(items[2].hint_level, Some(1));
        assert_eq!(items[3].hint_level, Some(2));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let content = r#"{"weekly": ["one", "two"], "victory": ["gg"]}"#;
        let source = json_source();

        let first = extract_from_str(&source, content).unwrap();
        let second = extract_from_str(&source, content).unwrap();

        let a = serde_json::to_string(&first).unwrap();
        let b = serde_json::to_string(&second).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_malformed_yaml_is_an_error_not_a_panic() {
        let source = Source::new("broken", DocFormat::Yaml);
        assert!(extract_from_str(&source, "{ [ not yaml").is_err());
    }

    #[test]
    fn test_empty_yaml_yields_nothing() {
        let source = Source::new("empty", DocFormat::Yaml);
        let items = extract_from_str(&source, "").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_source_from_path() {
        let source = Source::from_path(Path::new("/x/encounters/gate_keeper.yaml")).unwrap();
        assert_eq!(source.stem, "gate_keeper");
        assert_eq!(source.format, DocFormat::Yaml);

        assert!(Source::from_path(Path::new("/x/image.png")).is_none());
    }

    #[test]
    fn test_item_kind_wire_names() {
        let item = ReviewableItem::new("x", ItemKind::ChapterIntro, "t", "c");
        let value = serde_json::to_value(&item).unwrap();

        assert_eq!(value["type"], "chapter_intro");
        // Unset attributes stay off the wire
        assert!(value.get("speaker").is_none());
        assert!(value.get("hintLevel").is_none());
    }
}
