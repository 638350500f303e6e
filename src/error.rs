//! Application error types using thiserror
//!
//! Error hierarchy:
//! - RangeError: malformed ranges or versions (invalid input)
//! - CompactError: range compaction produced an unsound range (internal defect)
//! - ManifestError: issues reading or writing package.json
//! - RegistryError: issues fetching release catalogs or package metadata
//! - GraphError: issues loading the dependency graph
//! - ConfigError: invalid CLI or config file options

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::Engine;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Range(#[from] RangeError),

    /// Signals a bug in range compaction, never a user mistake
    #[error("internal error: {0}")]
    Internal(#[from] CompactError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors from parsing ranges and versions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// The range expression could not be parsed
    #[error("invalid range '{range}': {message}")]
    InvalidRange { range: String, message: String },

    /// The string is not a semantic version
    #[error("invalid version '{version}'")]
    InvalidVersion { version: String },
}

/// Range compaction failed to cover its own input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompactError {
    #[error("please report this: {engine}: {versions} / {range}")]
    Unsound {
        engine: Engine,
        versions: String,
        range: String,
    },
}

/// Errors related to package.json operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write manifest file
    #[error("failed to write manifest file {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON parsing error
    #[error("failed to parse JSON in {path}: {message}")]
    JsonParseError { path: PathBuf, message: String },

    /// A field has an unexpected shape
    #[error("invalid field '{field}' in {path}: {message}")]
    InvalidField {
        path: PathBuf,
        field: String,
        message: String,
    },
}

/// Errors related to release catalogs and the package registry
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    /// Package not found in registry
    #[error("package '{package}' not found in {registry} registry")]
    PackageNotFound { package: String, registry: String },

    /// Network request failed
    #[error("failed to fetch package '{package}' from {registry}: {message}")]
    NetworkError {
        package: String,
        registry: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {registry} registry")]
    RateLimitExceeded { registry: String },

    /// Invalid response from registry
    #[error("invalid response from {registry} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        registry: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while fetching '{package}' from {registry}")]
    Timeout { package: String, registry: String },

    /// No release list could be produced for an engine
    #[error("no release catalog available for engine '{engine}'")]
    MissingCatalog { engine: Engine },

    /// Offline catalog file could not be loaded
    #[error("failed to load catalog {path}: {message}")]
    CatalogFile { path: PathBuf, message: String },
}

/// Errors related to loading the dependency graph
#[derive(Error, Debug)]
pub enum GraphError {
    /// No lockfile was found for a virtual tree
    #[error("no lockfile found in {path} (expected package-lock.json or npm-shrinkwrap.json)")]
    MissingLockfile { path: PathBuf },

    /// node_modules does not exist for an actual tree
    #[error("no node_modules directory found in {path}")]
    MissingNodeModules { path: PathBuf },

    /// The lockfile could not be parsed
    #[error("failed to parse lockfile {path}: {message}")]
    LockfileParse { path: PathBuf, message: String },

    /// Failed to read a file while walking the tree
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Registry lookup failed while building the ideal tree
    #[error("failed to resolve '{package}': {source}")]
    Resolve {
        package: String,
        #[source]
        source: RegistryError,
    },

    /// No published version satisfies a dependency spec
    #[error("no version of '{package}' satisfies '{spec}'")]
    NoMatchingVersion { package: String, spec: String },

    /// A background walker task failed
    #[error("tree walker failed: {message}")]
    Walker { message: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No dependency kind selected
    #[error("one of `--dev` and `--production` must be enabled")]
    NoDependencyKind,

    /// Conflicting options
    #[error("conflicting options: {message}")]
    ConflictingOptions { message: String },

    /// Config file could not be read or parsed
    #[error("invalid config file {path}: {message}")]
    InvalidFile { path: PathBuf, message: String },

    /// Invalid path
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: PathBuf, message: String },
}

impl RangeError {
    /// Creates a new InvalidRange error
    pub fn invalid_range(range: impl Into<String>, message: impl Into<String>) -> Self {
        RangeError::InvalidRange {
            range: range.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidVersion error
    pub fn invalid_version(version: impl Into<String>) -> Self {
        RangeError::InvalidVersion {
            version: version.into(),
        }
    }
}

impl ManifestError {
    /// Creates a new NotFound error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        ManifestError::NotFound { path: path.into() }
    }

    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new JsonParseError
    pub fn json_parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ManifestError::JsonParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidField error
    pub fn invalid_field(
        path: impl Into<PathBuf>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ManifestError::InvalidField {
            path: path.into(),
            field: field.into(),
            message: message.into(),
        }
    }
}

impl RegistryError {
    /// Creates a new PackageNotFound error
    pub fn package_not_found(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::PackageNotFound {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new NetworkError
    pub fn network_error(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::NetworkError {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new RateLimitExceeded error
    pub fn rate_limit_exceeded(registry: impl Into<String>) -> Self {
        RegistryError::RateLimitExceeded {
            registry: registry.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::Timeout {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new CatalogFile error
    pub fn catalog_file(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        RegistryError::CatalogFile {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl GraphError {
    /// Creates a new Io error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GraphError::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a new LockfileParse error
    pub fn lockfile_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        GraphError::LockfileParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new NoMatchingVersion error
    pub fn no_matching_version(package: impl Into<String>, spec: impl Into<String>) -> Self {
        GraphError::NoMatchingVersion {
            package: package.into(),
            spec: spec.into(),
        }
    }
}
