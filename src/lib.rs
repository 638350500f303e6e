//! enginefit - npm `engines` reconciliation library
//!
//! This library provides the core functionality for checking that a
//! package's declared engine support matches its dependency graph:
//! - npm-style range evaluation over Node.js and npm release lists
//! - Dependency graph loading from node_modules, lockfiles or the registry
//! - Reconciliation verdicts, remediations and exit statuses
//! - Text and JSON reporting

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod exit;
pub mod graph;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod reconcile;
pub mod registry;
pub mod runtime;
