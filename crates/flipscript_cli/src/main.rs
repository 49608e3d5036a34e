// SPDX-License-Identifier: MIT OR Apache-2.0
//! `FlipScript` command line.
//!
//! Turns block graphs saved by the visual editor into Flipper Zero apps:
//! - `generate` expands a graph into `main.c` and `application.fam`
//! - `validate` checks an existing source file
//! - `catalog` lists the available blocks

mod commands;
mod export;
mod settings;

use anyhow::Context;
use clap::Parser;
use commands::Command;
use settings::{ToolSettings, SETTINGS_FILE_NAME};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "flipscript=info";

/// `FlipScript` - Flipper Zero app generator
#[derive(Parser, Debug)]
#[command(name = "flipscript", version)]
#[command(about = "Generate Flipper Zero apps from visual block graphs", long_about = None)]
struct Cli {
    /// Tool settings file
    #[arg(long, global = true, default_value = SETTINGS_FILE_NAME)]
    settings: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

fn init_tracing(log_filter: Option<&str>, verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let base = log_filter.unwrap_or(DEFAULT_LOG_FILTER);
        if verbose {
            EnvFilter::new(format!("{base},flipscript=debug"))
        } else {
            EnvFilter::new(base)
        }
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Settings are read first since they carry the log filter
    let settings = ToolSettings::load_or_default(&cli.settings);
    init_tracing(
        settings.as_ref().ok().and_then(|s| s.log_filter.as_deref()),
        cli.verbose,
    );

    tracing::debug!("Starting FlipScript v{}", env!("CARGO_PKG_VERSION"));

    let result = settings
        .with_context(|| format!("Failed to load settings {}", cli.settings.display()))
        .and_then(|settings| commands::run(&cli.command, &settings));

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
