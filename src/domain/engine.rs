//! Engine type definitions for tracked runtimes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Runtimes whose version support is tracked in the `engines` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Node.js runtime (`engines.node`)
    Node,
    /// npm CLI (`engines.npm`)
    Npm,
}

impl Engine {
    /// Returns the key used in the `engines` field of package.json
    pub fn key(&self) -> &'static str {
        match self {
            Engine::Node => "node",
            Engine::Npm => "npm",
        }
    }

    /// Returns the display name for this engine
    pub fn display_name(&self) -> &'static str {
        match self {
            Engine::Node => "Node.js",
            Engine::Npm => "npm",
        }
    }

    /// Returns the executable used to probe the installed version
    pub fn executable(&self) -> &'static str {
        match self {
            Engine::Node => "node",
            Engine::Npm => "npm",
        }
    }

    /// Returns all supported engines
    pub fn all() -> &'static [Engine] {
        &[Engine::Node, Engine::Npm]
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Engine {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "node" | "nodejs" => Ok(Engine::Node),
            "npm" => Ok(Engine::Npm),
            other => Err(format!("unknown engine '{}': expected 'node' or 'npm'", other)),
        }
    }
}
