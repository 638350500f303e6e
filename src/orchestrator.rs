//! Orchestrator for coordinating the whole check
//!
//! This module provides:
//! - Workflow coordination: read manifest → fetch releases and walk the tree → reconcile → save
//! - Concurrent catalog fetch and graph walk
//! - Exit status composition from failures and save outcomes

use crate::config::Settings;
use crate::domain::{
    CompactRange, ConstraintEntry, Engine, EngineRanges, Failure, Range, RangeSource,
    Remediation, ValidSet, VersionCatalog,
};
use crate::error::AppError;
use crate::exit::ExitStatus;
use crate::graph::{self, create_walker, TreeMode, WalkerConfig};
use crate::manifest::{read_manifest, save_remediation, RootManifest};
use crate::progress::Progress;
use crate::reconcile::{
    aggregate, check_current, check_dev_engines, check_engines, compact_graph, filter, filter_str,
    latest_engine_majors, parse_range, CurrentReport, EngineMajors, EnginesCheck, EnginesOutcome,
};
use crate::registry::{
    create_catalog_source, CatalogSource, HttpClient, NpmRegistry, PackageRegistry,
};
use crate::runtime::{probe_all, RuntimeProbe, SystemRuntime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// What `--save` did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    /// Whether `--save` was given
    pub requested: bool,
    /// Remediations written to package.json
    pub saved: Vec<Remediation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of running the orchestrator
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub manifest: PathBuf,
    /// The tree mode actually used
    pub mode: TreeMode,
    pub engines: Vec<Engine>,
    /// Field the root ranges were read from
    pub source: RangeSource,
    pub root_ranges: EngineRanges,
    pub graph_ranges: BTreeMap<Engine, CompactRange>,
    /// Packages whose `engines` constrain the graph
    pub graph_entries: Vec<ConstraintEntry>,
    pub majors: BTreeMap<Engine, EngineMajors>,
    /// Successful engines check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<EnginesOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<CurrentReport>,
    pub failures: Vec<Failure>,
    pub save: SaveReport,
    pub status: ExitStatus,
}

/// Orchestrator for coordinating the check
pub struct Orchestrator {
    settings: Settings,
    catalog: Box<dyn CatalogSource>,
    registry: Arc<dyn PackageRegistry>,
    runtime: Box<dyn RuntimeProbe>,
}

impl Orchestrator {
    /// Create an orchestrator using the network (or the offline catalog file) and the installed engines
    pub fn new(settings: Settings) -> Result<Self, AppError> {
        let client = HttpClient::new()?;
        let registry = Arc::new(NpmRegistry::with_base_url(client.clone(), &settings.registry));
        let catalog = create_catalog_source(settings.catalog.as_deref(), client, &settings.registry);
        let runtime = Box::new(SystemRuntime::new().with_working_dir(&settings.dir));
        Ok(Self::with_sources(settings, catalog, registry, runtime))
    }

    /// Create an orchestrator with custom collaborators (for testing)
    pub fn with_sources(
        settings: Settings,
        catalog: Box<dyn CatalogSource>,
        registry: Arc<dyn PackageRegistry>,
        runtime: Box<dyn RuntimeProbe>,
    ) -> Self {
        Self {
            settings,
            catalog,
            registry,
            runtime,
        }
    }

    /// Run the check
    pub async fn run(&self) -> Result<Report, AppError> {
        self.run_with_progress(!self.settings.quiet && !self.settings.json)
            .await
    }

    /// Run the check with optional progress display
    pub async fn run_with_progress(&self, show_progress: bool) -> Result<Report, AppError> {
        let settings = &self.settings;
        let manifest = read_manifest(&settings.dir)?;

        let walker = create_walker(
            &WalkerConfig {
                dir: settings.dir.clone(),
                mode: settings.mode,
                concurrency: settings.concurrency,
            },
            &manifest,
            Arc::clone(&self.registry),
        );

        let mut progress = Progress::new(show_progress);
        progress.spinner(&format!(
            "Fetching engine releases and loading the {} tree...",
            walker.mode()
        ));
        let fetch = async {
            let catalog = self.catalog.fetch_catalog(&settings.graph.engines).await;
            if let Ok(catalog) = &catalog {
                for engine in &settings.graph.engines {
                    let count = catalog.versions(*engine).len();
                    progress.complete(&format!("{} {} releases", count, engine.display_name()));
                }
            }
            catalog
        };
        let load = async {
            let entries = graph::walk(walker.as_ref(), &settings.graph).await;
            if let Ok(entries) = &entries {
                progress.complete(&format!(
                    "{} constraining packages in the {} tree",
                    entries.len(),
                    walker.mode()
                ));
            }
            entries
        };
        let (catalog, entries) = tokio::join!(fetch, load);
        progress.finish_and_clear();

        let catalog = catalog?;
        let entries = entries?;
        info!(
            "loaded releases from {} and {} constraining packages",
            self.catalog.name(),
            entries.len()
        );
        self.reconcile(&manifest, &catalog, entries, walker.mode())
    }

    /// Compares the manifest with the graph and applies `--save`
    fn reconcile(
        &self,
        manifest: &RootManifest,
        catalog: &VersionCatalog,
        entries: Vec<ConstraintEntry>,
        mode: TreeMode,
    ) -> Result<Report, AppError> {
        let engines = &self.settings.graph.engines;
        let root = manifest.root_ranges(engines);

        let mut root_valids = ValidSet::new();
        let mut root_range_map = BTreeMap::new();
        for engine in engines {
            let range = parse_range(root.ranges.get(engine).map(String::as_str))?;
            root_valids.insert(*engine, filter(catalog.versions(*engine), &range));
            root_range_map.insert(*engine, range);
        }

        let graph = aggregate(&entries, catalog)?;
        let graph_ranges = compact_graph(&graph, catalog)?;
        let graph_range_map: BTreeMap<Engine, Range> = graph_ranges
            .iter()
            .map(|(engine, compact)| (*engine, compact.range.clone()))
            .collect();
        let majors = latest_engine_majors(engines, catalog, &root_range_map, &graph_range_map);

        let mut failures = Vec::new();

        // A published package's devEngines must stay within its engines
        if !manifest.private {
            for engine in engines {
                let Some(dev_range) = manifest.dev_engines_range(*engine) else {
                    continue;
                };
                let dev_valid = filter_str(catalog.versions(*engine), Some(dev_range))?;
                let engines_valid = root_valids.get(engine).map(Vec::as_slice).unwrap_or(&[]);
                if let Err(failure) = check_dev_engines(
                    dev_range,
                    &dev_valid,
                    root.ranges.get(engine).map(String::as_str),
                    engines_valid,
                ) {
                    failures.push(failure);
                }
            }
        }

        let check = EnginesCheck {
            engines,
            source: root.source,
            root_ranges: &root.ranges,
            root_valids: &root_valids,
            graph: &graph,
            graph_ranges: &graph_ranges,
        };
        let outcome = match check_engines(&check) {
            Ok(outcome) => Some(outcome),
            Err(failure) => {
                failures.push(failure);
                None
            }
        };

        let current = self.settings.current.then(|| {
            let installed = probe_all(self.runtime.as_ref(), engines);
            check_current(engines, &installed, &root_valids, &graph.valids)
        });
        if let Some(failure) = current.as_ref().and_then(CurrentReport::failure) {
            failures.push(failure);
        }

        let (status, save) = self.apply(manifest, &failures, outcome.as_ref());

        Ok(Report {
            manifest: manifest.path.clone(),
            mode,
            engines: engines.clone(),
            source: root.source,
            root_ranges: root.ranges,
            graph_ranges,
            graph_entries: entries,
            majors,
            outcome,
            current,
            failures,
            save,
            status,
        })
    }

    /// Composes the exit status, saving remediations when `--save` is given
    ///
    /// A failure whose remediation was saved does not count against the exit
    /// status; a save that fails sets the SAVE bit instead.
    fn apply(
        &self,
        manifest: &RootManifest,
        failures: &[Failure],
        outcome: Option<&EnginesOutcome>,
    ) -> (ExitStatus, SaveReport) {
        let mut status = ExitStatus::SUCCESS;
        let mut report = SaveReport {
            requested: self.settings.save,
            ..Default::default()
        };

        let save = |remediation: &Remediation, report: &mut SaveReport| -> bool {
            match save_remediation(&manifest.path, remediation) {
                Ok(()) => {
                    report.saved.push(remediation.clone());
                    true
                }
                Err(e) => {
                    warn!("failed to save {}: {}", remediation.field.field(), e);
                    report.error = Some(e.to_string());
                    false
                }
            }
        };

        for failure in failures {
            match &failure.remediation {
                Some(remediation) if self.settings.save => {
                    if !save(remediation, &mut report) {
                        status |= ExitStatus::SAVE;
                    }
                }
                _ => status |= failure.kind.exit_status(),
            }
        }

        if self.settings.save {
            if let Some(remediation) = outcome.and_then(|o| o.remediation.as_ref()) {
                if !save(remediation, &mut report) {
                    status |= ExitStatus::SAVE;
                }
            }
        }

        (status, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FailureKind, Version, VerdictKind};
    use crate::error::RegistryError;
    use crate::graph::GraphOptions;
    use crate::registry::Packument;
    use async_trait::async_trait;
    use std::fs;
    use tempfile::TempDir;

    struct FixedCatalog(Vec<&'static str>);

    #[async_trait]
    impl CatalogSource for FixedCatalog {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch_catalog(&self, _engines: &[Engine]) -> Result<VersionCatalog, RegistryError> {
            let versions = self.0.iter().map(|v| Version::parse(v).unwrap()).collect();
            Ok(VersionCatalog::new().with_engine(Engine::Node, versions))
        }
    }

    struct NoRegistry;

    #[async_trait]
    impl PackageRegistry for NoRegistry {
        fn registry_name(&self) -> &'static str {
            "none"
        }

        async fn packument(&self, package: &str) -> Result<Packument, RegistryError> {
            Err(RegistryError::package_not_found(package, "none"))
        }
    }

    struct FixedRuntime(Option<&'static str>);

    impl RuntimeProbe for FixedRuntime {
        fn current_version(&self, _engine: Engine) -> Option<Version> {
            self.0.and_then(|v| Version::parse(v).ok())
        }
    }

    const RELEASES: [&str; 8] = [
        "v20.10.0", "v20.0.0", "v18.19.0", "v18.0.0", "v16.20.0", "v16.0.0", "v14.21.0",
        "v14.0.0",
    ];

    fn project(package_json: &str, graph: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), package_json).unwrap();
        let packages: serde_json::Map<String, serde_json::Value> = graph
            .iter()
            .map(|(name, range)| {
                (
                    format!("node_modules/{}", name),
                    serde_json::json!({ "version": "1.0.0", "engines": { "node": range } }),
                )
            })
            .collect();
        let lockfile = serde_json::json!({ "lockfileVersion": 3, "packages": packages });
        fs::write(dir.path().join("package-lock.json"), lockfile.to_string()).unwrap();
        dir
    }

    fn settings(dir: &TempDir, save: bool, current: bool) -> Settings {
        Settings {
            dir: dir.path().to_path_buf(),
            mode: TreeMode::Auto,
            graph: GraphOptions {
                engines: vec![Engine::Node],
                ..Default::default()
            },
            current,
            save,
            catalog: None,
            registry: crate::registry::NPM_REGISTRY_URL.to_string(),
            concurrency: 2,
            json: false,
            quiet: true,
        }
    }

    fn orchestrator(settings: Settings, runtime: Option<&'static str>) -> Orchestrator {
        Orchestrator::with_sources(
            settings,
            Box::new(FixedCatalog(RELEASES.to_vec())),
            Arc::new(NoRegistry),
            Box::new(FixedRuntime(runtime)),
        )
    }

    async fn run(dir: &TempDir, save: bool) -> Report {
        orchestrator(settings(dir, save, false), None)
            .run_with_progress(false)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_exact_match() {
        let dir = project(r#"{ "engines": { "node": ">=16" } }"#, &[("one", ">=16")]);
        let report = run(&dir, false).await;
        assert_eq!(report.mode, TreeMode::Virtual);
        assert_eq!(report.outcome.unwrap().verdict.kind, VerdictKind::Exact);
        assert!(report.failures.is_empty());
        assert_eq!(report.status, ExitStatus::SUCCESS);
    }

    #[tokio::test]
    async fn test_root_superset_fails_with_conflicts() {
        let dir = project(r#"{ "engines": { "node": ">=14" } }"#, &[("one", ">=18")]);
        let report = run(&dir, false).await;
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.kind, FailureKind::Inexact);
        let conflicts = &failure.verdict.as_ref().unwrap().conflicts[&Engine::Node];
        assert_eq!(conflicts[0].package, "one");
        assert_eq!(report.graph_ranges[&Engine::Node].display, ">=18");
        assert_eq!(report.status, ExitStatus::INEXACT);
    }

    #[tokio::test]
    async fn test_missing_engines_is_implicit() {
        let dir = project(r#"{ "name": "demo" }"#, &[("one", ">=16")]);
        let report = run(&dir, false).await;
        assert!(matches!(report.failures[0].kind, FailureKind::Implicit(_)));
        assert_eq!(report.status, ExitStatus::IMPLICIT);
    }

    #[tokio::test]
    async fn test_save_fixes_failure() {
        let dir = project(r#"{ "engines": { "node": ">=14" } }"#, &[("one", ">=18")]);
        let report = run(&dir, true).await;
        assert_eq!(report.status, ExitStatus::SUCCESS);
        assert_eq!(report.save.saved.len(), 1);

        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("package.json")).unwrap())
                .unwrap();
        assert_eq!(saved["engines"]["node"], ">=18");
    }

    #[tokio::test]
    async fn test_save_widens_root_subset() {
        let dir = project(r#"{ "engines": { "node": ">=20" } }"#, &[("one", ">=18")]);
        let report = run(&dir, true).await;
        assert_eq!(report.outcome.unwrap().verdict.kind, VerdictKind::RootSubset);
        assert_eq!(report.status, ExitStatus::SUCCESS);
        let saved = fs::read_to_string(dir.path().join("package.json")).unwrap();
        assert!(saved.contains("\">=18\""));
    }

    #[tokio::test]
    async fn test_root_subset_without_save_keeps_manifest() {
        let original = r#"{ "engines": { "node": ">=20" } }"#;
        let dir = project(original, &[("one", ">=18")]);
        let report = run(&dir, false).await;
        assert_eq!(report.status, ExitStatus::SUCCESS);
        assert!(report.save.saved.is_empty());
        assert_eq!(fs::read_to_string(dir.path().join("package.json")).unwrap(), original);
    }

    #[tokio::test]
    async fn test_current_version_checked() {
        let dir = project(r#"{ "engines": { "node": ">=16" } }"#, &[("one", ">=16")]);
        let report = orchestrator(settings(&dir, false, true), Some("v14.21.0"))
            .run_with_progress(false)
            .await
            .unwrap();
        assert!(!report.current.unwrap().is_valid());
        assert_eq!(report.status, ExitStatus::CURRENT);
    }

    #[tokio::test]
    async fn test_dev_engines_outside_engines() {
        let dir = project(
            r#"{
                "engines": { "node": ">=18" },
                "devEngines": { "runtime": { "name": "node", "version": ">=16" } }
            }"#,
            &[("one", ">=18")],
        );
        let report = run(&dir, false).await;
        assert!(report.failures.iter().any(|f| f.kind == FailureKind::DevEngines));
        assert!(report.status.contains(ExitStatus::DEV_ENGINES));
    }

    #[tokio::test]
    async fn test_private_package_uses_dev_engines() {
        let dir = project(
            r#"{
                "private": true,
                "devEngines": { "runtime": { "name": "node", "version": ">=18" } }
            }"#,
            &[("one", ">=18")],
        );
        let report = run(&dir, false).await;
        assert_eq!(report.source, RangeSource::DevEngines);
        assert_eq!(report.status, ExitStatus::SUCCESS);
    }

    #[tokio::test]
    async fn test_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let result = orchestrator(settings(&dir, false, false), None)
            .run_with_progress(false)
            .await;
        assert!(matches!(result, Err(AppError::Manifest(_))));
    }

    #[tokio::test]
    async fn test_invalid_root_range() {
        let dir = project(r#"{ "engines": { "node": ">>16" } }"#, &[]);
        let result = orchestrator(settings(&dir, false, false), None)
            .run_with_progress(false)
            .await;
        assert!(matches!(result, Err(AppError::Range(_))));
    }
}
