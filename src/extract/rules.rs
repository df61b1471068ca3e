//! Shape predicates and extraction handlers.
//!
//! Each handler is total: entries that do not carry usable text are
//! skipped, never an error. Id conventions per shape:
//!
//! - chapters: `chapter_<number>_intro`, `encounter_<id>_intro`,
//!   `encounter_<id>_hint_<n>` (hints 1-indexed)
//! - flavor: `flavor_<category>_<n+1>` for sequences (1-indexed),
//!   `flavor_<category>_<key>` for mappings
//! - themes: `week_<n>` (explicit week number, else 1-indexed position)
//! - dialogue lists: `dialogue_<id-or-index>` (0-based index fallback)
//! - encounter files: `encounter_<id-or-stem>_{intro,success,failure}`,
//!   hints as above, embedded dialogue disambiguated by running item count
//! - standalone dialogue files: `dialogue_<stem>_<index>` (0-based)

use serde_json::Value;

use super::{ItemKind, ReviewableItem, Source};

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

pub(super) fn is_campaign(doc: &Value) -> bool {
    has_key(doc, "chapters")
}

pub(super) fn is_flavor_collection(doc: &Value) -> bool {
    has_key(doc, "weekly") || has_key(doc, "monthly") || has_key(doc, "victory")
}

pub(super) fn is_weekly_themes(doc: &Value) -> bool {
    has_key(doc, "themes") || has_key(doc, "weeks")
}

pub(super) fn is_dialogue_list(doc: &Value) -> bool {
    has_key(doc, "dialogues") || has_key(doc, "lines")
}

pub(super) fn is_encounter(doc: &Value) -> bool {
    has_key(doc, "intro_text") || has_key(doc, "title")
}

pub(super) fn is_standalone_dialogue(doc: &Value) -> bool {
    has_key(doc, "npc") || has_key(doc, "character") || has_key(doc, "speaker")
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Campaign document: chapters, each with an intro and encounters
pub(super) fn extract_campaign(_source: &Source, doc: &Value) -> Vec<ReviewableItem> {
    let mut items = Vec::new();

    let chapters = match doc.get("chapters").and_then(Value::as_array) {
        Some(chapters) => chapters,
        None => return items,
    };

    for (ci, chapter) in chapters.iter().enumerate() {
        let number = chapter
            .get("number")
            .and_then(Value::as_u64)
            .unwrap_or(ci as u64 + 1);

        let chapter_label = match str_field(chapter, "title") {
            Some(title) => format!("Chapter {}: {}", number, title),
            None => format!("Chapter {}", number),
        };

        if let Some(intro) = str_field(chapter, "intro_text") {
            items.push(ReviewableItem::new(
                format!("chapter_{}_intro", number),
                ItemKind::ChapterIntro,
                intro,
                &chapter_label,
            ));
        }

        let encounters = chapter
            .get("encounters")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        for (ei, encounter) in encounters.iter().enumerate() {
            let eid = id_field(encounter).unwrap_or_else(|| format!("{}_{}", number, ei + 1));
            let title = str_field(encounter, "title")
                .map(str::to_string)
                .unwrap_or_else(|| eid.clone());

            if let Some(intro) = str_field(encounter, "intro_text") {
                items.push(ReviewableItem::new(
                    format!("encounter_{}_intro", eid),
                    ItemKind::EncounterIntro,
                    intro,
                    format!("Encounter: {}", title),
                ));
            }

            push_hints(&mut items, encounter, &eid, &title);
        }
    }

    items
}

/// Flavor collection: every top-level category, sequences and mappings
pub(super) fn extract_flavor(_source: &Source, doc: &Value) -> Vec<ReviewableItem> {
    let mut items = Vec::new();

    let map = match doc.as_object() {
        Some(map) => map,
        None => return items,
    };

    for (category, value) in map {
        match value {
            Value::Array(entries) => {
                for (i, entry) in entries.iter().enumerate() {
                    if let Some(text) = entry_text(entry) {
                        items.push(
                            ReviewableItem::new(
                                format!("flavor_{}_{}", category, i + 1),
                                ItemKind::Flavor,
                                text,
                                format!("{} #{}", category, i + 1),
                            )
                            .with_category(category),
                        );
                    }
                }
            }
            Value::Object(entries) => {
                for (key, entry) in entries {
                    if let Some(text) = entry_text(entry) {
                        items.push(
                            ReviewableItem::new(
                                format!("flavor_{}_{}", category, key),
                                ItemKind::Flavor,
                                text,
                                format!("{}: {}", category, key),
                            )
                            .with_category(category),
                        );
                    }
                }
            }
            // Scalar top-level values (version numbers etc.) are not flavor
            _ => {}
        }
    }

    items
}

/// Weekly theme list: one item per entry, keyed by week number
pub(super) fn extract_themes(_source: &Source, doc: &Value) -> Vec<ReviewableItem> {
    let mut items = Vec::new();

    let entries = match list_field(doc, &["themes", "weeks"]) {
        Some(entries) => entries,
        None => return items,
    };

    for (i, entry) in entries.iter().enumerate() {
        let week = entry
            .get("week")
            .and_then(Value::as_u64)
            .unwrap_or(i as u64 + 1);

        let text = entry
            .as_str()
            .filter(|s| !s.is_empty())
            .or_else(|| str_field(entry, "text"))
            .or_else(|| str_field(entry, "description"));

        if let Some(text) = text {
            items.push(
                ReviewableItem::new(
                    format!("week_{}", week),
                    ItemKind::WeeklyTheme,
                    text,
                    format!("Week {}", week),
                )
                .with_week(week as u32),
            );
        }
    }

    items
}

/// JSON dialogue list: one item per entry, context from the speaker
pub(super) fn extract_dialogue_list(_source: &Source, doc: &Value) -> Vec<ReviewableItem> {
    let mut items = Vec::new();

    let entries = match list_field(doc, &["dialogues", "lines"]) {
        Some(entries) => entries,
        None => return items,
    };

    for (i, entry) in entries.iter().enumerate() {
        let text = match dialogue_text(entry) {
            Some(text) => text,
            None => continue,
        };

        let speaker = str_field(entry, "speaker").or_else(|| str_field(entry, "character"));
        let suffix = id_field(entry).unwrap_or_else(|| i.to_string());

        let mut item = ReviewableItem::new(
            format!("dialogue_{}", suffix),
            ItemKind::Dialogue,
            text,
            speaker.unwrap_or("Unknown"),
        );
        if let Some(speaker) = speaker {
            item = item.with_speaker(speaker);
        }

        items.push(item);
    }

    items
}

/// Single encounter document: intro/success/failure, hints, embedded dialogue
pub(super) fn extract_encounter(source: &Source, doc: &Value) -> Vec<ReviewableItem> {
    let mut items = Vec::new();

    let eid = id_field(doc).unwrap_or_else(|| source.stem.clone());
    let title = str_field(doc, "title")
        .map(str::to_string)
        .unwrap_or_else(|| source.stem.clone());

    let outcomes = [
        ("intro_text", ItemKind::EncounterIntro, "intro"),
        ("success_text", ItemKind::EncounterSuccess, "success"),
        ("failure_text", ItemKind::EncounterFailure, "failure"),
    ];

    for (field, kind, label) in outcomes {
        if let Some(text) = str_field(doc, field) {
            items.push(ReviewableItem::new(
                format!("encounter_{}_{}", eid, label),
                kind,
                text,
                format!("{} ({})", title, label),
            ));
        }
    }

    push_hints(&mut items, doc, &eid, &title);

    let dialogue = doc
        .get("dialogue")
        .or_else(|| doc.get("dialogues"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    for entry in dialogue {
        let text = match dialogue_text(entry) {
            Some(text) => text,
            None => continue,
        };

        let speaker = str_field(entry, "speaker");

        // The running item count keeps embedded dialogue ids unique within
        // the document even when speakers repeat.
        let mut item = ReviewableItem::new(
            format!("dialogue_{}_{}", eid, items.len()),
            ItemKind::Dialogue,
            text,
            speaker.unwrap_or("Unknown"),
        );
        if let Some(speaker) = speaker {
            item = item.with_speaker(speaker);
        }

        items.push(item);
    }

    items
}

/// Standalone dialogue document: one speaker, many lines
pub(super) fn extract_standalone_dialogue(source: &Source, doc: &Value) -> Vec<ReviewableItem> {
    let mut items = Vec::new();

    let speaker = ["npc", "character", "speaker"]
        .iter()
        .find_map(|key| str_field(doc, key))
        .map(str::to_string)
        .unwrap_or_else(|| source.stem.clone());

    let lines = match doc.get("lines").and_then(Value::as_array) {
        Some(lines) => lines,
        None => return items,
    };

    for (i, entry) in lines.iter().enumerate() {
        if let Some(text) = dialogue_text(entry) {
            items.push(
                ReviewableItem::new(
                    format!("dialogue_{}_{}", source.stem, i),
                    ItemKind::Dialogue,
                    text,
                    &speaker,
                )
                .with_speaker(&speaker),
            );
        }
    }

    items
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn has_key(doc: &Value, key: &str) -> bool {
    doc.as_object().map(|m| m.contains_key(key)).unwrap_or(false)
}

/// Non-empty string field
fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// First present list among the given keys
fn list_field<'a>(doc: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|key| doc.get(*key)).and_then(Value::as_array)
}

/// Entry text: the entry itself when it is a string, else its `text` field
fn entry_text(entry: &Value) -> Option<&str> {
    entry
        .as_str()
        .filter(|s| !s.is_empty())
        .or_else(|| str_field(entry, "text"))
}

/// Dialogue entries also spell their payload as `line`
fn dialogue_text(entry: &Value) -> Option<&str> {
    entry_text(entry).or_else(|| str_field(entry, "line"))
}

/// The `id` field as a string, accepting string or integer ids
fn id_field(value: &Value) -> Option<String> {
    match value.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Hint items: 1-indexed, `hintLevel` from an explicit level else position
fn push_hints(items: &mut Vec<ReviewableItem>, parent: &Value, eid: &str, title: &str) {
    let hints = parent
        .get("hints")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[]);

    for (hi, hint) in hints.iter().enumerate() {
        let n = hi as u64 + 1;

        if let Some(text) = entry_text(hint) {
            let level = hint.get("level").and_then(Value::as_u64).unwrap_or(n);

            items.push(
                ReviewableItem::new(
                    format!("encounter_{}_hint_{}", eid, n),
                    ItemKind::Hint,
                    text,
                    format!("Encounter: {} (hint {})", title, n),
                )
                .with_hint_level(level as u32),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract_items, DocFormat};
    use serde_json::json;

    fn yaml_source(stem: &str) -> Source {
        Source::new(stem, DocFormat::Yaml)
    }

    fn json_source() -> Source {
        Source::new("doc", DocFormat::Json)
    }

    #[test]
    fn test_campaign_chapter_number_fallback() {
        let doc = json!({
            "chapters": [
                {"intro_text": "First"},
                {"intro_text": "Second"}
            ]
        });

        let items = extract_campaign(&json_source(), &doc);
        assert_eq!(items[0].id, "chapter_1_intro");
        assert_eq!(items[1].id, "chapter_2_intro");
    }

    #[test]
    fn test_campaign_skips_chapters_without_intro() {
        let doc = json!({
            "chapters": [
                {"number": 3, "title": "Silent"},
                {"number": 4, "intro_text": "Loud"}
            ]
        });

        let items = extract_campaign(&json_source(), &doc);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "chapter_4_intro");
        assert_eq!(items[0].context, "Chapter 4");
    }

    #[test]
    fn test_flavor_sequences_are_one_indexed() {
        let doc = json!({
            "weekly": ["first spin", "second spin"],
            "victory": [{"text": "well played"}]
        });

        let items = extract_flavor(&json_source(), &doc);

        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["flavor_weekly_1", "flavor_weekly_2", "flavor_victory_1"]);
        assert_eq!(items[2].text, "well played");
        assert_eq!(items[0].category.as_deref(), Some("weekly"));
    }

    #[test]
    fn test_flavor_mappings_use_keys() {
        let doc = json!({
            "victory": {"flawless": "No damage taken", "close": {"text": "Barely"}},
            "count": 2
        });

        let items = extract_flavor(&json_source(), &doc);

        assert_eq!(items.len(), 2);
        assert!(items.iter().any(|i| i.id == "flavor_victory_flawless"));
        assert!(items.iter().any(|i| i.id == "flavor_victory_close"));
    }

    #[test]
    fn test_themes_explicit_week_beats_position() {
        let doc = json!({
            "themes": [
                {"week": 12, "text": "Frost"},
                {"description": "Embers"},
                "Plain string theme"
            ]
        });

        let items = extract_themes(&json_source(), &doc);

        assert_eq!(items[0].id, "week_12");
        assert_eq!(items[0].week, Some(12));
        assert_eq!(items[1].id, "week_2");
        assert_eq!(items[1].text, "Embers");
        assert_eq!(items[2].id, "week_3");
        assert_eq!(items[2].text, "Plain string theme");
    }

    #[test]
    fn test_dialogue_list_speaker_and_index() {
        let doc = json!({
            "dialogues": [
                {"id": "d_greet", "speaker": "Mara", "text": "Hello."},
                {"character": "Torvald", "text": "Hm."},
                {"text": "..."}
            ]
        });

        let items = extract_dialogue_list(&json_source(), &doc);

        assert_eq!(items[0].id, "dialogue_d_greet");
        assert_eq!(items[0].context, "Mara");
        assert_eq!(items[0].speaker.as_deref(), Some("Mara"));

        // Index fallback is 0-based
        assert_eq!(items[1].id, "dialogue_1");
        assert_eq!(items[1].context, "Torvald");

        assert_eq!(items[2].id, "dialogue_2");
        assert_eq!(items[2].context, "Unknown");
        assert!(items[2].speaker.is_none());
    }

    #[test]
    fn test_encounter_three_outcomes_and_hints() {
        let source = yaml_source("gate");
        let doc = json!({
            "id": "e7",
            "title": "The Gate",
            "intro_text": "A gate looms.",
            "success_text": "It opens.",
            "failure_text": "",
            "hints": ["look", {"text": "push", "level": 3}]
        });

        let items = extract_encounter(&source, &doc);

        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        // Empty failure_text is not an item
        assert_eq!(
            ids,
            vec![
                "encounter_e7_intro",
                "encounter_e7_success",
                "encounter_e7_hint_1",
                "encounter_e7_hint_2"
            ]
        );
        assert_eq!(items[2].hint_level, Some(1));
        // Explicit level wins over position
        assert_eq!(items[3].hint_level, Some(3));
    }

    #[test]
    fn test_encounter_stem_fallback_and_embedded_dialogue() {
        let source = yaml_source("cellar_door");
        let doc = json!({
            "intro_text": "Stairs lead down.",
            "dialogue": [
                {"speaker": "Rat", "line": "Squeak."},
                {"speaker": "Rat", "line": "Squeak again."}
            ]
        });

        let items = extract_encounter(&source, &doc);

        assert_eq!(items[0].id, "encounter_cellar_door_intro");
        // Running item count keeps repeated speakers distinct
        assert_eq!(items[1].id, "dialogue_cellar_door_1");
        assert_eq!(items[2].id, "dialogue_cellar_door_2");
        assert_eq!(items[1].speaker.as_deref(), Some("Rat"));
    }

    #[test]
    fn test_standalone_dialogue_key_precedence() {
        let source = yaml_source("mara_banter");
        let doc = json!({
            "npc": "Mara",
            "speaker": "Wrong",
            "lines": ["First line", {"text": "Second line"}]
        });

        let items = extract_standalone_dialogue(&source, &doc);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "dialogue_mara_banter_0");
        assert_eq!(items[1].id, "dialogue_mara_banter_1");
        assert_eq!(items[0].speaker.as_deref(), Some("Mara"));
        assert_eq!(items[0].context, "Mara");
    }

    #[test]
    fn test_standalone_dialogue_stem_speaker_fallback() {
        let source = yaml_source("old_miller");
        let doc = json!({
            "npc": 17,
            "lines": ["The mill turns."]
        });

        let items = extract_items(&source, &doc);
        assert_eq!(items[0].speaker.as_deref(), Some("old_miller"));
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let doc = json!({
            "dialogues": [42, null, {"speaker": "Mute"}, {"text": "Audible"}]
        });

        let items = extract_dialogue_list(&json_source(), &doc);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].text, "Audible");
    }
}
