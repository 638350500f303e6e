//! End-to-end tests for the enginefit CLI
//!
//! These tests verify:
//! - Exit codes for matching, inexact and implicit declarations
//! - Successes on stdout, failures on stderr
//! - CLI produces the JSON output schema
//! - `--save` edits package.json
//!
//! Every run reads releases from a catalog file and the graph from a
//! lockfile, so no network access is needed.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Create a project with a manifest, a lockfile and a release catalog
fn create_test_project(package_json: &str, packages: &[(&str, &str)]) -> TempDir {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    fs::write(temp_dir.path().join("package.json"), package_json).unwrap();

    let mut map = serde_json::Map::new();
    map.insert("".to_string(), serde_json::json!({ "name": "test-project" }));
    for (name, range) in packages {
        map.insert(
            format!("node_modules/{}", name),
            serde_json::json!({ "version": "1.0.0", "engines": { "node": range } }),
        );
    }
    let lockfile = serde_json::json!({ "lockfileVersion": 3, "packages": map });
    fs::write(temp_dir.path().join("package-lock.json"), lockfile.to_string()).unwrap();

    let catalog = serde_json::json!({
        "node": ["v20.10.0", "v20.0.0", "v18.19.0", "v18.0.0", "v16.20.0", "v16.0.0", "v14.21.0", "v14.0.0"],
        "npm": ["v10.2.4", "v9.8.1"]
    });
    fs::write(temp_dir.path().join("releases.json"), catalog.to_string()).unwrap();

    temp_dir
}

/// Command running offline against the project
fn enginefit(project: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("enginefit"));
    cmd.arg(project.path())
        .args(["--catalog"])
        .arg(project.path().join("releases.json"))
        .args(["--mode", "virtual", "--engine", "node", "--no-current"])
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

mod exit_codes {
    use super::*;

    #[test]
    fn test_exact_match_succeeds() {
        let project = create_test_project(
            r#"{ "name": "test-project", "engines": { "node": ">=16" } }"#,
            &[("one", ">=16")],
        );
        enginefit(&project)
            .assert()
            .success()
            .stdout(predicate::str::contains("exactly matches"))
            .stdout(predicate::str::contains(
                "Currently available latest release of each valid major version:",
            ))
            .stdout(predicate::str::contains("v20.10.0, v18.19.0, v16.20.0"));
    }

    #[test]
    fn test_inexact_fails_with_code_2() {
        let project = create_test_project(
            r#"{ "name": "test-project", "engines": { "node": ">=14" } }"#,
            &[("one", ">=18")],
        );
        enginefit(&project)
            .assert()
            .code(2)
            .stderr(predicate::str::contains("allows more node versions"))
            .stderr(predicate::str::contains("enginefit --save"))
            .stderr(predicate::str::contains("\"node\": \">=18\""))
            .stderr(predicate::str::contains("Conflicting dependencies:"));
    }

    #[test]
    fn test_missing_engines_fails_with_code_4() {
        let project = create_test_project(r#"{ "name": "test-project" }"#, &[("one", ">=16")]);
        enginefit(&project)
            .assert()
            .code(4)
            .stderr(predicate::str::contains("\"engines\" field is missing"));
    }

    #[test]
    fn test_root_subset_succeeds() {
        let project = create_test_project(
            r#"{ "name": "test-project", "engines": { "node": ">=20" } }"#,
            &[("one", ">=18")],
        );
        enginefit(&project)
            .assert()
            .success()
            .stdout(predicate::str::contains("allows fewer node versions"))
            .stdout(predicate::str::contains("If you want to widen your support"));
    }

    #[test]
    fn test_missing_manifest_is_error() {
        let project = create_test_project("{}", &[]);
        fs::remove_file(project.path().join("package.json")).unwrap();
        enginefit(&project)
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn test_no_dependency_kind_is_error() {
        let project = create_test_project(r#"{ "engines": { "node": ">=16" } }"#, &[]);
        enginefit(&project)
            .args(["--no-dev", "--no-production"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("`--dev` and `--production`"));
    }
}

mod save_tests {
    use super::*;

    #[test]
    fn test_save_updates_package_json() {
        let project = create_test_project(
            "{\n  \"name\": \"test-project\",\n  \"engines\": {\n    \"node\": \">=14\"\n  }\n}\n",
            &[("one", ">=18")],
        );
        enginefit(&project)
            .arg("--save")
            .assert()
            .success()
            .stderr(predicate::str::contains("will automatically fix this"));

        let saved = fs::read_to_string(project.path().join("package.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&saved).unwrap();
        assert_eq!(value["engines"]["node"], ">=18");

        enginefit(&project).assert().success();
    }

    #[test]
    fn test_without_save_leaves_file_unchanged() {
        let original = r#"{ "name": "test-project", "engines": { "node": ">=14" } }"#;
        let project = create_test_project(original, &[("one", ">=18")]);
        enginefit(&project).assert().code(2);
        assert_eq!(
            fs::read_to_string(project.path().join("package.json")).unwrap(),
            original
        );
    }
}

mod json_output {
    use super::*;

    #[test]
    fn test_json_schema() {
        let project = create_test_project(
            r#"{ "name": "test-project", "engines": { "node": ">=14" } }"#,
            &[("one", ">=18")],
        );
        let output = enginefit(&project).arg("--json").output().unwrap();
        assert_eq!(output.status.code(), Some(2));

        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["mode"], "virtual");
        assert_eq!(json["root"]["node"], ">=14");
        assert_eq!(json["graph"]["node"], ">=18");
        assert_eq!(json["verdict"]["kind"], "root_superset");
        assert_eq!(json["exit"]["code"], 2);
        assert_eq!(json["exit"]["status"][0], "INEXACT");
    }

    #[test]
    fn test_quiet_json_still_prints_report() {
        let project = create_test_project(
            r#"{ "name": "test-project", "engines": { "node": ">=16" } }"#,
            &[("one", ">=16")],
        );
        enginefit(&project)
            .args(["--json", "--quiet"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"exit\""));
    }
}

mod cli_tests {
    use super::*;

    #[test]
    fn test_help() {
        Command::new(cargo_bin("enginefit"))
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--save"))
            .stdout(predicate::str::contains("--mode"));
    }

    #[test]
    fn test_version() {
        Command::new(cargo_bin("enginefit"))
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_invalid_mode_rejected() {
        Command::new(cargo_bin("enginefit"))
            .args(["--mode", "lockfile"])
            .assert()
            .failure();
    }
}
