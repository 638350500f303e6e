//! Detection of the installed engine versions
//!
//! This module provides:
//! - A probe trait so checks can run against fixed versions in tests
//! - A system probe that runs `node --version` / `npm --version`

use crate::domain::{Engine, Version};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command, Output};
use tracing::debug;

/// Reports the currently installed version of an engine
pub trait RuntimeProbe: Send + Sync {
    /// The installed version, or None if the engine is unavailable
    fn current_version(&self, engine: Engine) -> Option<Version>;
}

/// Probes the version of every given engine
pub fn probe_all<P: RuntimeProbe + ?Sized>(
    probe: &P,
    engines: &[Engine],
) -> BTreeMap<Engine, Option<Version>> {
    engines
        .iter()
        .map(|engine| (*engine, probe.current_version(*engine)))
        .collect()
}

/// Probe that executes the engine binaries found on `PATH`
#[derive(Debug, Default)]
pub struct SystemRuntime {
    working_dir: Option<std::path::PathBuf>,
}

impl SystemRuntime {
    /// Create a new system runtime probe
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the probes from the given directory (picks up version managers' local pins)
    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Run a command and capture output
    fn run_command(&self, command: &[&str]) -> std::io::Result<Output> {
        if command.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Empty command",
            ));
        }

        let mut cmd = Command::new(command[0]);
        cmd.args(&command[1..]);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd.output()
    }
}

impl RuntimeProbe for SystemRuntime {
    fn current_version(&self, engine: Engine) -> Option<Version> {
        let output = match self.run_command(&[engine.executable(), "--version"]) {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                debug!(
                    "{} --version exited with {}: {}",
                    engine.executable(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                return None;
            }
            Err(e) => {
                debug!("failed to execute {}: {}", engine.executable(), e);
                return None;
            }
        };
        parse_version_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extracts a version from `--version` output (`v20.10.0\n`, `10.2.3\n`)
pub fn parse_version_output(stdout: &str) -> Option<Version> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty())?;
    let version = Version::parse(line).ok()?;
    // Catalog entries are `v`-prefixed; match their spelling
    if version.raw().starts_with('v') {
        Some(version)
    } else {
        Version::parse(&format!("v{}", version.semver())).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed versions for testing
    struct FixedRuntime(BTreeMap<Engine, &'static str>);

    impl RuntimeProbe for FixedRuntime {
        fn current_version(&self, engine: Engine) -> Option<Version> {
            self.0.get(&engine).and_then(|v| Version::parse(v).ok())
        }
    }

    #[test]
    fn test_parse_node_output() {
        let version = parse_version_output("v20.10.0\n").unwrap();
        assert_eq!(version.raw(), "v20.10.0");
    }

    #[test]
    fn test_parse_npm_output_gets_prefix() {
        let version = parse_version_output("10.2.3\n").unwrap();
        assert_eq!(version.raw(), "v10.2.3");
    }

    #[test]
    fn test_parse_garbage_output() {
        assert!(parse_version_output("").is_none());
        assert!(parse_version_output("command not found").is_none());
    }

    #[test]
    fn test_probe_all() {
        let mut versions = BTreeMap::new();
        versions.insert(Engine::Node, "v18.19.0");
        let probe = FixedRuntime(versions);
        let probed = probe_all(&probe, &[Engine::Node, Engine::Npm]);
        assert_eq!(probed[&Engine::Node].as_ref().unwrap().raw(), "v18.19.0");
        assert!(probed[&Engine::Npm].is_none());
    }

    #[test]
    fn test_system_runtime_new() {
        let _runtime = SystemRuntime::new().with_working_dir(".");
    }
}
