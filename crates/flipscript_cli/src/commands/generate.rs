// SPDX-License-Identifier: MIT OR Apache-2.0
//! `flipscript generate`

use super::{load_registry, log_diagnostics};
use crate::export::{export, MANIFEST_FILE};
use crate::settings::ToolSettings;
use anyhow::{bail, Context, Result};
use clap::Args;
use flipscript_codegen::{CodeGenerator, Manifest, Severity, Validator};
use flipscript_graph::BlockGraph;
use std::path::PathBuf;

/// Arguments for `generate`
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Graph snapshot (JSON)
    #[arg(short, long)]
    pub graph: PathBuf,

    /// App manifest (.json or .fam)
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// Block catalog (JSON); the built-in catalog when omitted
    #[arg(short, long)]
    pub catalog: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Print the generated files instead of writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Exit with an error when validation fails
    #[arg(long)]
    pub check: bool,

    /// Also run the external syntax check
    #[arg(long)]
    pub syntax: bool,
}

/// Run `generate`
pub fn run(args: &GenerateArgs, settings: &ToolSettings) -> Result<bool> {
    let registry = load_registry(args.catalog.as_deref(), settings)?;

    let manifest = Manifest::load(&args.manifest)
        .with_context(|| format!("Failed to load manifest {}", args.manifest.display()))?;
    let issues = manifest.validate();
    for issue in issues.iter().filter(|i| i.severity == Severity::Warning) {
        tracing::warn!(field = issue.field, "{}", issue.message);
    }
    let errors: Vec<String> = issues
        .iter()
        .filter(|i| i.severity == Severity::Error)
        .map(|i| format!("{}: {}", i.field, i.message))
        .collect();
    if !errors.is_empty() {
        bail!("Manifest is invalid:\n  {}", errors.join("\n  "));
    }

    let text = std::fs::read_to_string(&args.graph)
        .with_context(|| format!("Failed to read graph {}", args.graph.display()))?;
    let graph = BlockGraph::from_snapshot_str(&text, &registry)
        .with_context(|| format!("Failed to parse graph {}", args.graph.display()))?;
    tracing::info!(
        "Loaded graph with {} blocks and {} connections",
        graph.block_count(),
        graph.connection_count()
    );

    let files = CodeGenerator::new()
        .generate(&registry, &manifest, &graph.to_snapshot())
        .context("Code generation failed")?;

    let mut validator = Validator::new();
    if args.syntax || settings.syntax_check.enabled {
        validator = validator.with_syntax_check(settings.syntax_check.to_check());
    }
    let mut ok = true;
    for (name, text) in files.iter().filter(|(name, _)| name.ends_with(".c")) {
        let report = validator.validate(text, &manifest.appid, &manifest.entry_point);
        log_diagnostics(&report.diagnostics);
        if !report.ok {
            tracing::error!("{name} failed validation");
            ok = false;
        }
    }

    if args.dry_run {
        for (name, text) in files.iter() {
            println!("// ---- {name} ----");
            println!("{text}");
        }
        println!("# ---- {MANIFEST_FILE} ----");
        println!("{}", manifest.to_fam());
    } else {
        let output_dir = args.out.as_ref().unwrap_or(&settings.output_dir);
        let summary = export(&files, &manifest, output_dir)
            .with_context(|| format!("Failed to write files to {}", output_dir.display()))?;
        for path in &summary.files {
            println!("{}", path.display());
        }
    }

    Ok(ok || !args.check)
}
