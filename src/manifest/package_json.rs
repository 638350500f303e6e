//! package.json reader for the root project
//!
//! Handles:
//! - engines (object form; the legacy array form is ignored)
//! - devEngines.runtime (a single object or an array of objects)
//! - private
//! - dependencies / devDependencies / optionalDependencies / peerDependencies

use crate::domain::{Engine, EngineRanges, RangeSource};
use crate::error::ManifestError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of the npm manifest
pub const MANIFEST_FILENAME: &str = "package.json";

/// One `devEngines.runtime` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RuntimeEntry {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Root ranges together with the field they came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootRanges {
    pub source: RangeSource,
    /// Declared ranges; engines without a declaration are absent
    pub ranges: EngineRanges,
}

/// The parts of the root package.json this tool reads
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootManifest {
    pub path: PathBuf,
    pub name: Option<String>,
    pub private: bool,
    pub engines: EngineRanges,
    pub dev_engines_runtime: Vec<RuntimeEntry>,
    pub dependencies: BTreeMap<String, String>,
    pub dev_dependencies: BTreeMap<String, String>,
    pub optional_dependencies: BTreeMap<String, String>,
    pub peer_dependencies: BTreeMap<String, String>,
}

impl RootManifest {
    /// Parses package.json content
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self, ManifestError> {
        let path = path.into();
        let json: Value = serde_json::from_str(content)
            .map_err(|e| ManifestError::json_parse_error(&path, e.to_string()))?;
        let object = json
            .as_object()
            .ok_or_else(|| ManifestError::json_parse_error(&path, "expected a JSON object"))?;

        let dev_engines_runtime = match object.get("devEngines").and_then(|d| d.get("runtime")) {
            None | Some(Value::Null) => Vec::new(),
            Some(runtime @ Value::Object(_)) => vec![runtime_entry(&path, runtime)?],
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| runtime_entry(&path, item))
                .collect::<Result<_, _>>()?,
            Some(_) => {
                return Err(ManifestError::invalid_field(
                    &path,
                    "devEngines.runtime",
                    "expected an object or an array of objects",
                ))
            }
        };

        Ok(Self {
            name: object.get("name").and_then(Value::as_str).map(String::from),
            private: object.get("private").and_then(Value::as_bool).unwrap_or(false),
            engines: object.get("engines").map(engine_ranges).unwrap_or_default(),
            dev_engines_runtime,
            dependencies: string_map(object.get("dependencies")),
            dev_dependencies: string_map(object.get("devDependencies")),
            optional_dependencies: string_map(object.get("optionalDependencies")),
            peer_dependencies: string_map(object.get("peerDependencies")),
            path,
        })
    }

    /// Returns true if `devEngines.runtime` is declared
    pub fn has_dev_engines(&self) -> bool {
        !self.dev_engines_runtime.is_empty()
    }

    /// The `devEngines.runtime` version declared for an engine
    pub fn dev_engines_range(&self, engine: Engine) -> Option<&str> {
        self.dev_engines_runtime
            .iter()
            .find(|r| r.name == engine.key())
            .and_then(|r| r.version.as_deref())
    }

    /// Resolves the ranges the root declares for the selected engines
    ///
    /// Private packages with `devEngines.runtime` are checked against it
    /// instead of `engines`, since they are never installed as a dependency.
    pub fn root_ranges(&self, engines: &[Engine]) -> RootRanges {
        let source = if self.private && self.has_dev_engines() {
            RangeSource::DevEngines
        } else {
            RangeSource::Engines
        };
        let ranges = engines
            .iter()
            .filter_map(|engine| {
                let range = match source {
                    RangeSource::DevEngines => self.dev_engines_range(*engine),
                    RangeSource::Engines => self.engines.get(engine).map(String::as_str),
                };
                range.map(|r| (*engine, r.to_string()))
            })
            .collect();
        RootRanges { source, ranges }
    }
}

fn runtime_entry(path: &Path, value: &Value) -> Result<RuntimeEntry, ManifestError> {
    RuntimeEntry::deserialize(value)
        .map_err(|e| ManifestError::invalid_field(path, "devEngines.runtime", e.to_string()))
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|deps| {
            deps.iter()
                .filter_map(|(name, spec)| spec.as_str().map(|s| (name.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Extracts known engine ranges from an `engines` value
///
/// Non-object values (the legacy array form) and non-string ranges yield nothing.
pub fn engine_ranges(value: &Value) -> EngineRanges {
    let Some(object) = value.as_object() else {
        return EngineRanges::new();
    };
    object
        .iter()
        .filter_map(|(key, range)| {
            let engine = key.parse::<Engine>().ok()?;
            range.as_str().map(|r| (engine, r.to_string()))
        })
        .collect()
}

/// Reads `package.json` from a project directory
pub fn read_manifest(dir: &Path) -> Result<RootManifest, ManifestError> {
    let path = dir.join(MANIFEST_FILENAME);
    let content = std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ManifestError::not_found(&path)
        } else {
            ManifestError::read_error(&path, e)
        }
    })?;
    RootManifest::parse(path, &content)
}
