//! Applying remediations to package.json
//!
//! This module provides:
//! - In-memory application of a remediation to a JSON document
//! - Saving it back with the file's indentation, key order and trailing newline

use crate::domain::{RangeSource, Remediation};
use crate::error::ManifestError;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use tracing::info;

/// Merges the remediation's ranges into the manifest document
pub fn apply_remediation(doc: &mut Value, remediation: &Remediation) -> Result<(), String> {
    let root = doc
        .as_object_mut()
        .ok_or_else(|| "package.json is not a JSON object".to_string())?;

    match remediation.field {
        RangeSource::Engines => {
            let engines = object_entry(root, "engines");
            for (engine, range) in &remediation.ranges {
                engines.insert(engine.key().to_string(), Value::String(range.clone()));
            }
        }
        RangeSource::DevEngines => {
            let dev_engines = object_entry(root, "devEngines");
            let runtime = dev_engines
                .entry("runtime")
                .or_insert_with(|| Value::Array(Vec::new()));
            if runtime.is_object() {
                *runtime = Value::Array(vec![runtime.take()]);
            }
            let entries = runtime
                .as_array_mut()
                .ok_or_else(|| "\"devEngines.runtime\" is not an object or array".to_string())?;
            for (engine, range) in &remediation.ranges {
                let existing = entries
                    .iter_mut()
                    .find(|entry| entry.get("name").and_then(Value::as_str) == Some(engine.key()));
                match existing.and_then(Value::as_object_mut) {
                    Some(entry) => {
                        entry.insert("version".to_string(), Value::String(range.clone()));
                    }
                    None => entries.push(json!({ "name": engine.key(), "version": range })),
                }
            }
            // A lone runtime stays in object form
            if entries.len() == 1 {
                let only = entries.remove(0);
                *runtime = only;
            }
        }
    }
    Ok(())
}

fn object_entry<'a>(root: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let value = root
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

/// Detects the indentation of a JSON document (defaults to two spaces)
fn detect_indent(content: &str) -> String {
    content
        .lines()
        .skip(1)
        .find(|line| !line.trim().is_empty())
        .map(|line| {
            line.chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect::<String>()
        })
        .filter(|indent| !indent.is_empty())
        .unwrap_or_else(|| "  ".to_string())
}

/// Serializes a document with the given indentation and a trailing newline
fn to_pretty_string(doc: &Value, indent: &str) -> Result<String, serde_json::Error> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    doc.serialize(&mut serializer)?;
    let mut text = String::from_utf8_lossy(&out).into_owned();
    text.push('\n');
    Ok(text)
}

/// Applies a remediation to the package.json at `path` and writes it back
pub fn save_remediation(path: &Path, remediation: &Remediation) -> Result<(), ManifestError> {
    let content = fs::read_to_string(path).map_err(|e| ManifestError::read_error(path, e))?;
    let mut doc: Value = serde_json::from_str(&content)
        .map_err(|e| ManifestError::json_parse_error(path, e.to_string()))?;

    apply_remediation(&mut doc, remediation)
        .map_err(|message| ManifestError::invalid_field(path, remediation.field.field(), message))?;

    let updated = to_pretty_string(&doc, &detect_indent(&content))
        .map_err(|e| ManifestError::json_parse_error(path, e.to_string()))?;
    fs::write(path, updated).map_err(|e| ManifestError::write_error(path, e))?;
    info!("saved {} to {}", remediation.field.field(), path.display());
    Ok(())
}
