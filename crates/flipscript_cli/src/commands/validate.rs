// SPDX-License-Identifier: MIT OR Apache-2.0
//! `flipscript validate`

use crate::settings::ToolSettings;
use anyhow::{Context, Result};
use clap::Args;
use flipscript_codegen::Validator;
use std::path::PathBuf;

/// Arguments for `validate`
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// C source file
    pub file: PathBuf,

    /// App id the state struct is named after
    #[arg(long)]
    pub appid: String,

    /// Entry point function name
    #[arg(long, default_value = "app_main")]
    pub entry_point: String,

    /// Also run the external syntax check
    #[arg(long)]
    pub syntax: bool,
}

/// Run `validate`
pub fn run(args: &ValidateArgs, settings: &ToolSettings) -> Result<bool> {
    let code = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let mut validator = Validator::new();
    if args.syntax || settings.syntax_check.enabled {
        validator = validator.with_syntax_check(settings.syntax_check.to_check());
    }
    let report = validator.validate(&code, &args.appid, &args.entry_point);

    for diagnostic in &report.diagnostics {
        println!("{diagnostic}");
    }
    println!(
        "{}: {}",
        args.file.display(),
        if report.ok { "ok" } else { "FAILED" }
    );

    Ok(report.ok)
}
