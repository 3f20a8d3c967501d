//! Routinely CLI entry point.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use routinely::cli::Cli;
use routinely::runner::WorkflowRunner;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool, log_file: Option<&Path>) {
    let filter = if debug {
        EnvFilter::new("routinely=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("routinely=info"))
    };

    let file_layer = log_file.and_then(|path| {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file))),
            Err(e) => {
                eprintln!("Could not open log file {}: {}", path.display(), e);
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .with(filter)
        .init();
}

/// Ask before a real (non-preview) run, unless auto-confirmed or unattended.
fn confirmed(root: &Path, assume_yes: bool) -> bool {
    if assume_yes || !console::user_attended() {
        return true;
    }
    dialoguer::Confirm::new()
        .with_prompt(format!("Apply hygiene steps to {}?", root.display()))
        .default(false)
        .interact()
        .unwrap_or(false)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.log_file.as_deref());

    tracing::debug!("Routinely starting with args: {:?}", cli);

    let list_steps = cli.list_steps;
    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let runner = WorkflowRunner::new(&config);

    if list_steps {
        for descriptor in runner.registry().all() {
            println!(
                "{:<8} fatal={:<5} parallel={:<5} aliases: {}",
                descriptor.name(),
                descriptor.fatal,
                descriptor.parallel,
                descriptor.id.aliases().join(", ")
            );
        }
        return ExitCode::SUCCESS;
    }

    if !config.dry_run && !confirmed(&config.project_root, config.assume_yes) {
        tracing::info!("Aborted by user");
        return ExitCode::from(1);
    }

    match runner.run() {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
