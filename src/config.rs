//! Project configuration
//!
//! Settings come from the command line, falling back to an optional
//! `enginefit.toml` in the project directory, then to built-in defaults.

use crate::cli::CliArgs;
use crate::domain::Engine;
use crate::error::ConfigError;
use crate::graph::{GraphOptions, TreeMode, DEFAULT_CONCURRENCY};
use crate::registry::NPM_REGISTRY_URL;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the project configuration file
pub const CONFIG_FILENAME: &str = "enginefit.toml";

/// Contents of `enginefit.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub mode: Option<TreeMode>,
    pub engines: Option<Vec<Engine>>,
    pub dev: Option<bool>,
    pub production: Option<bool>,
    pub peer: Option<bool>,
    pub current: Option<bool>,
    /// Relative paths are resolved against the project directory
    pub catalog: Option<PathBuf>,
    pub registry: Option<String>,
    pub concurrency: Option<usize>,
}

impl FileConfig {
    /// Parses the TOML content of a config file
    pub fn parse(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e: toml::de::Error| ConfigError::InvalidFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Loads `enginefit.toml` from a directory; a missing file yields the defaults
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILENAME);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                debug!("loading {}", path.display());
                Self::parse(&path, &content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::InvalidFile {
                path,
                message: e.to_string(),
            }),
        }
    }
}

/// Effective settings for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub dir: PathBuf,
    pub mode: TreeMode,
    pub graph: GraphOptions,
    /// Check the installed engine versions
    pub current: bool,
    pub save: bool,
    pub catalog: Option<PathBuf>,
    pub registry: String,
    pub concurrency: usize,
    pub json: bool,
    pub quiet: bool,
}

impl Settings {
    /// Merges CLI arguments over the config file
    ///
    /// Only one of dev/production given: `--dev` keeps production enabled,
    /// `--no-production` turns dev on. Including dev dependencies disables
    /// the current-version check.
    pub fn resolve(args: &CliArgs, file: FileConfig) -> Result<Self, ConfigError> {
        let dir = args.path.clone();
        if !dir.is_dir() {
            return Err(ConfigError::InvalidPath {
                path: dir,
                message: "not a directory".to_string(),
            });
        }

        let explicit_dev = args.dev_flag();
        let dev_flag = explicit_dev.or(file.dev);
        let production_flag = args.production_flag().or(file.production);
        let (dev, production) = match (dev_flag, production_flag) {
            (None, None) => (false, true),
            (Some(dev), None) => (dev, true),
            (None, Some(production)) => (!production, production),
            (Some(dev), Some(production)) => (dev, production),
        };
        if !dev && !production {
            return Err(ConfigError::NoDependencyKind);
        }
        let peer = args.peer_flag().or(file.peer).unwrap_or(true);

        let explicit_current = args.current_flag();
        if explicit_dev == Some(true) && explicit_current == Some(true) {
            return Err(ConfigError::ConflictingOptions {
                message: "`--current` cannot be used with `--dev`".to_string(),
            });
        }
        let current = !dev && explicit_current.or(file.current).unwrap_or(true);

        let mut engines = if !args.engines.is_empty() {
            args.engines.clone()
        } else {
            file.engines.unwrap_or_else(|| Engine::all().to_vec())
        };
        engines.sort();
        engines.dedup();
        if engines.is_empty() {
            return Err(ConfigError::ConflictingOptions {
                message: "no engines selected".to_string(),
            });
        }

        let catalog = args
            .catalog
            .clone()
            .or_else(|| file.catalog.map(|path| dir.join(path)));

        Ok(Self {
            mode: args.mode.or(file.mode).unwrap_or_default(),
            graph: GraphOptions {
                dev,
                production,
                peer,
                engines,
            },
            current,
            save: args.save,
            catalog,
            registry: args
                .registry
                .clone()
                .or(file.registry)
                .unwrap_or_else(|| NPM_REGISTRY_URL.to_string()),
            concurrency: args
                .concurrency
                .or(file.concurrency)
                .unwrap_or(DEFAULT_CONCURRENCY)
                .max(1),
            json: args.json,
            quiet: args.quiet,
            dir,
        })
    }

    /// Loads the config file from the target directory and merges the CLI over it
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let file = if args.path.is_dir() {
            FileConfig::load(&args.path)?
        } else {
            FileConfig::default()
        };
        Self::resolve(args, file)
    }
}
