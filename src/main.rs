//! enginefit - npm `engines` field checker CLI tool
//!
//! Compares the `engines` ranges a package declares with what its
//! dependency graph actually supports, and optionally fixes package.json.

use clap::Parser;
use enginefit::cli::CliArgs;
use enginefit::config::Settings;
use enginefit::exit::ExitStatus;
use enginefit::orchestrator::Orchestrator;
use enginefit::output::{create_formatter, OutputConfig};
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(status) => status.into(),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitStatus::ERROR.into()
        }
    }
}

/// Logs go to stderr; `--verbose` forces debug output for this crate
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("enginefit=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("enginefit=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Main application logic
async fn run(args: CliArgs) -> anyhow::Result<ExitStatus> {
    if args.verbose {
        eprintln!("enginefit v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("Target: {}", args.path.display());
    }

    let settings = Settings::load(&args)?;
    let orchestrator = Orchestrator::new(settings)?;
    let report = orchestrator.run().await?;

    let mut output_config = OutputConfig::from_cli(args.json, args.verbose, args.quiet);
    output_config.color = io::stdout().is_terminal() && io::stderr().is_terminal();
    let formatter = create_formatter(output_config);

    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    formatter.format(&report, &mut stdout, &mut stderr)?;
    stdout.flush()?;
    stderr.flush()?;

    Ok(report.status)
}
