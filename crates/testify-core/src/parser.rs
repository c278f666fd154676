//! JSON exam document parser.
//!
//! Turns an untrusted, already-decoded JSON value into a normalized
//! [`ExamDocument`]. Only structural malformation fails; missing or empty
//! fields are defaulted. Normalization is idempotent, so re-parsing a
//! serialized document yields the same value.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::error::ExamError;
use crate::model::{ExamDocument, Item, Section, DEFAULT_SECTION_NAME, MAX_CHOICES};

/// Parse a decoded JSON value into a normalized document.
pub fn parse_document(value: &Value) -> Result<ExamDocument, ExamError> {
    let root = value
        .as_object()
        .ok_or_else(|| ExamError::invalid("$", "document must be a JSON object"))?;

    let sections = match root.get("sections") {
        Some(Value::Array(sections)) => sections,
        Some(_) => return Err(ExamError::invalid("sections", "expected an array")),
        None => {
            return Err(ExamError::invalid(
                "$",
                "document must have a top-level 'sections' array",
            ))
        }
    };

    let sections = sections
        .iter()
        .enumerate()
        .map(|(i, s)| parse_section(s, &format!("sections[{i}]")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(normalize(ExamDocument { sections }))
}

/// Parse JSON text into a normalized document.
pub fn parse_document_str(content: &str) -> Result<ExamDocument, ExamError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| ExamError::invalid("$", format!("invalid JSON: {e}")))?;
    parse_document(&value)
}

/// Read and parse an exam document file.
pub fn load_document(path: &Path) -> Result<ExamDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read exam file: {}", path.display()))?;
    let document = parse_document_str(&content)
        .with_context(|| format!("failed to load exam: {}", path.display()))?;
    tracing::info!(
        "loaded {} ({} sections)",
        path.display(),
        document.sections.len()
    );
    Ok(document)
}

/// Serialize a document in the on-disk format.
pub fn to_json(document: &ExamDocument) -> Result<String> {
    serde_json::to_string_pretty(document).context("failed to serialize exam document")
}

/// Apply the value-level normalization rules shared by the parser and the
/// builder export.
pub fn normalize(mut document: ExamDocument) -> ExamDocument {
    for section in &mut document.sections {
        if section.name.trim().is_empty() {
            section.name = DEFAULT_SECTION_NAME.to_string();
        }
        if section.time_minutes == Some(0) {
            section.time_minutes = None;
        }
        for item in &mut section.items {
            if item.choices.len() > MAX_CHOICES {
                tracing::warn!(
                    "section '{}': truncating {} choices to {MAX_CHOICES}",
                    section.name,
                    item.choices.len()
                );
                item.choices.truncate(MAX_CHOICES);
            }
        }
    }
    document
}

fn parse_section(value: &Value, path: &str) -> Result<Section, ExamError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ExamError::invalid(path, "section must be an object"))?;

    let items = match obj.get("items") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(j, it)| parse_item(it, &format!("{path}.items[{j}]")))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(ExamError::invalid(format!("{path}.items"), "expected an array")),
    };

    Ok(Section {
        name: text_field(obj, "name", path)?,
        time_minutes: time_field(obj.get("time_minutes"), path),
        items,
    })
}

fn parse_item(value: &Value, path: &str) -> Result<Item, ExamError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ExamError::invalid(path, "item must be an object"))?;

    let choices = match obj.get("choices") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(choices)) => choices
            .iter()
            .enumerate()
            .map(|(k, c)| text_value(c, &format!("{path}.choices[{k}]")))
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(ExamError::invalid(
                format!("{path}.choices"),
                "expected an array",
            ))
        }
    };

    Ok(Item {
        q: text_field(obj, "q", path)?,
        passage: text_field(obj, "passage", path)?,
        choices,
        ans: text_field(obj, "ans", path)?,
    })
}

fn text_field(obj: &Map<String, Value>, key: &str, path: &str) -> Result<String, ExamError> {
    match obj.get(key) {
        None => Ok(String::new()),
        Some(v) => text_value(v, &format!("{path}.{key}")),
    }
}

/// Strings pass through, scalars are rendered, null is empty.
fn text_value(value: &Value, path: &str) -> Result<String, ExamError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(_) | Value::Object(_) => Err(ExamError::invalid(path, "expected a string")),
    }
}

/// Absent, null, zero, blank, negative, or unparseable all mean untimed.
fn time_field(value: Option<&Value>, path: &str) -> Option<u32> {
    let minutes = match value? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f > 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Null => None,
        other => {
            tracing::warn!("{path}.time_minutes: ignoring non-numeric value {other}");
            None
        }
    }?;
    u32::try_from(minutes).ok().filter(|&m| m > 0)
}

/// A non-fatal issue found in a loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Section name (if applicable).
    pub section: Option<String>,
    /// 1-based item number (if applicable).
    pub item: Option<usize>,
    /// Warning message.
    pub message: String,
}

/// Check a document for issues that load fine but are probably mistakes.
pub fn validate_document(document: &ExamDocument) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if document.sections.is_empty() {
        warnings.push(ValidationWarning {
            section: None,
            item: None,
            message: "document has no sections".into(),
        });
    }

    // Progress is keyed by name, so duplicates share answers and locks
    let mut seen = std::collections::HashSet::new();
    for section in &document.sections {
        if !seen.insert(section.name.as_str()) {
            warnings.push(ValidationWarning {
                section: Some(section.name.clone()),
                item: None,
                message: format!(
                    "duplicate section name '{}' (sections will share progress)",
                    section.name
                ),
            });
        }
    }

    for section in &document.sections {
        if section.items.is_empty() {
            warnings.push(ValidationWarning {
                section: Some(section.name.clone()),
                item: None,
                message: "section has no items".into(),
            });
        }

        for (i, item) in section.items.iter().enumerate() {
            let at = |message: String| ValidationWarning {
                section: Some(section.name.clone()),
                item: Some(i + 1),
                message,
            };

            if item.q.trim().is_empty() {
                warnings.push(at("question text is empty".into()));
            }
            if !item.is_scored() {
                continue;
            }
            let key = item.answer_key();
            if key.is_empty() {
                warnings.push(at("scored item has no answer key".into()));
            } else if !item.letters().any(|l| l.as_str() == key) {
                warnings.push(at(format!(
                    "answer key '{key}' does not name one of {} choices",
                    item.choices.len()
                )));
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID_JSON: &str = r#"{
  "title": "ignored",
  "sections": [
    {
      "name": "Verbal",
      "time_minutes": 20,
      "items": [
        {
          "q": "Pick the synonym of 'rapid'.",
          "passage": "",
          "choices": ["slow", "quick", "late", "heavy"],
          "ans": "B"
        },
        { "q": "Read the note below." }
      ]
    },
    { "name": "Math", "items": [] }
  ]
}"#;

    #[test]
    fn parse_valid_document() {
        let doc = parse_document_str(VALID_JSON).unwrap();
        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.sections[0].name, "Verbal");
        assert_eq!(doc.sections[0].time_minutes, Some(20));
        assert_eq!(doc.sections[0].items[0].choices.len(), 4);
        assert_eq!(doc.sections[0].items[0].ans, "B");
        assert_eq!(doc.sections[1].time_minutes, None);
    }

    #[test]
    fn parse_missing_optional_fields() {
        let doc = parse_document(&json!({
            "sections": [{ "items": [{}] }]
        }))
        .unwrap();
        let section = &doc.sections[0];
        assert_eq!(section.name, "Untitled");
        assert_eq!(section.time_minutes, None);
        assert_eq!(section.items[0], Item::default());
    }

    #[test]
    fn blank_name_defaults() {
        let doc = parse_document(&json!({ "sections": [{ "name": "   " }, { "name": null }] })).unwrap();
        assert_eq!(doc.sections[0].name, "Untitled");
        assert_eq!(doc.sections[1].name, "Untitled");
    }

    #[test]
    fn untimed_variants() {
        let doc = parse_document(&json!({
            "sections": [
                { "name": "a", "time_minutes": 0 },
                { "name": "b", "time_minutes": null },
                { "name": "c" },
                { "name": "d", "time_minutes": "" },
                { "name": "e", "time_minutes": -5 },
                { "name": "f", "time_minutes": "15" }
            ]
        }))
        .unwrap();
        let times: Vec<_> = doc.sections.iter().map(|s| s.time_minutes).collect();
        assert_eq!(times, vec![None, None, None, None, None, Some(15)]);
    }

    #[test]
    fn reject_structural_malformation() {
        assert!(parse_document(&json!([1, 2])).is_err());
        assert!(parse_document(&json!({ "items": [] })).is_err());
        assert!(parse_document(&json!({ "sections": {} })).is_err());
        assert!(parse_document(&json!({ "sections": ["x"] })).is_err());
        assert!(parse_document(&json!({ "sections": [{ "items": 3 }] })).is_err());
        assert!(parse_document(&json!({ "sections": [{ "items": [7] }] })).is_err());
        assert!(parse_document_str("this is { not json").is_err());

        let err = parse_document(&json!({ "sections": [{ "items": [{ "choices": "A" }] }] }))
            .unwrap_err();
        assert!(err.is_invalid_document());
        assert!(err.to_string().contains("sections[0].items[0].choices"));
    }

    #[test]
    fn empty_sections_is_valid_but_not_startable() {
        let doc = parse_document(&json!({ "sections": [] })).unwrap();
        assert!(!doc.is_startable());
    }

    #[test]
    fn scalar_text_is_rendered() {
        let doc = parse_document(&json!({
            "sections": [{ "name": 101, "items": [{ "choices": [1, 2.5, true, null] }] }]
        }))
        .unwrap();
        assert_eq!(doc.sections[0].name, "101");
        assert_eq!(doc.sections[0].items[0].choices, vec!["1", "2.5", "true", ""]);
    }

    #[test]
    fn extra_choices_are_truncated() {
        let doc = parse_document(&json!({
            "sections": [{ "items": [{ "choices": ["a", "b", "c", "d", "e", "f"] }] }]
        }))
        .unwrap();
        assert_eq!(doc.sections[0].items[0].choices.len(), 4);
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw = json!({
            "sections": [
                { "name": "", "time_minutes": "7", "items": [{ "q": 3, "choices": ["x", "y", "z", "w", "v"] }] },
                { "name": " Spaced ", "time_minutes": 0, "extra": true }
            ]
        });
        let once = parse_document(&raw).unwrap();
        let twice = parse_document(&serde_json::to_value(&once).unwrap()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn validate_flags_common_mistakes() {
        let doc = parse_document(&json!({
            "sections": [
                { "name": "A", "items": [
                    { "q": "", "choices": ["x", "y"], "ans": "" },
                    { "q": "key out of range", "choices": ["x", "y"], "ans": "d" }
                ] },
                { "name": "A", "items": [] }
            ]
        }))
        .unwrap();
        let warnings = validate_document(&doc);
        let has = |needle: &str| warnings.iter().any(|w| w.message.contains(needle));
        assert!(has("duplicate section name"));
        assert!(has("no items"));
        assert!(has("question text is empty"));
        assert!(has("no answer key"));
        assert!(has("does not name one of 2 choices"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exam.json");
        std::fs::write(&path, VALID_JSON).unwrap();

        let doc = load_document(&path).unwrap();
        assert_eq!(doc.sections.len(), 2);
        assert!(load_document(&dir.path().join("missing.json")).is_err());
    }
}
