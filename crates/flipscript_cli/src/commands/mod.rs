// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command implementations.
//!
//! Each command returns `Ok(true)` on success and `Ok(false)` when it ran
//! but its result should fail the process (a failed check).

pub mod catalog;
pub mod generate;
pub mod validate;

use crate::settings::ToolSettings;
use anyhow::{Context, Result};
use clap::Subcommand;
use flipscript_codegen::{Diagnostic, Severity};
use flipscript_graph::{create_flipper_registry, BlockRegistry};
use std::path::Path;

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a Flipper app from a block graph
    Generate(generate::GenerateArgs),
    /// Check a C source file for the structure a Flipper app needs
    Validate(validate::ValidateArgs),
    /// List the block catalog
    Catalog(catalog::CatalogArgs),
}

/// Run a command
pub fn run(command: &Command, settings: &ToolSettings) -> Result<bool> {
    match command {
        Command::Generate(args) => generate::run(args, settings),
        Command::Validate(args) => validate::run(args, settings),
        Command::Catalog(args) => catalog::run(args, settings),
    }
}

/// Load the block registry: the given catalog, else the settings catalog,
/// else the built-in one
pub fn load_registry(catalog: Option<&Path>, settings: &ToolSettings) -> Result<BlockRegistry> {
    match catalog.or(settings.catalog.as_deref()) {
        Some(path) => {
            let mut registry = BlockRegistry::new();
            registry
                .load_file(path)
                .with_context(|| format!("Failed to load catalog {}", path.display()))?;
            Ok(registry)
        }
        None => {
            tracing::debug!("Using built-in block catalog");
            Ok(create_flipper_registry())
        }
    }
}

/// Log each diagnostic at its severity
pub fn log_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        match diagnostic.severity {
            Severity::Error => tracing::error!("{}", diagnostic.message),
            Severity::Warning => tracing::warn!("{}", diagnostic.message),
        }
    }
}
