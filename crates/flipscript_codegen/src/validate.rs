// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural validation of generated source.
//!
//! Mandatory checks look for the shape every generated app must have.
//! An optional syntax check runs an external compiler on a temporary copy.

use regex::Regex;
use std::fmt;
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Includes every generated app must carry
pub const REQUIRED_INCLUDES: &[&str] = &["#include <furi.h>", "#include <gui/gui.h>"];

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    /// Fails the report
    Error,
    /// Reported, does not fail the report
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => f.write_str("error"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Description
    pub message: String,
    /// Severity
    pub severity: Severity,
}

impl Diagnostic {
    /// Create an error diagnostic
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Error,
        }
    }

    /// Create a warning diagnostic
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Outcome of validating one source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// True when no mandatory check failed
    pub ok: bool,
    /// Findings in check order
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    fn from_diagnostics(diagnostics: Vec<Diagnostic>) -> Self {
        let ok = diagnostics.iter().all(|d| d.severity != Severity::Error);
        Self { ok, diagnostics }
    }

    /// Error diagnostics
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    /// Warning diagnostics
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }
}

/// Result of an external syntax check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxOutcome {
    /// Compiler exited successfully
    Passed,
    /// Compiler rejected the source; carries its stderr
    Failed(String),
    /// Compiler was killed after the timeout
    TimedOut,
    /// Compiler could not be found
    Unavailable,
}

/// External compiler run in syntax-only mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxCheck {
    /// Compiler executable
    pub compiler: String,
    /// Arguments placed before the source path
    pub args: Vec<String>,
    /// Time allowed before the compiler is killed
    pub timeout: Duration,
}

impl Default for SyntaxCheck {
    fn default() -> Self {
        Self {
            compiler: "gcc".to_string(),
            args: vec!["-fsyntax-only".to_string(), "-Wall".to_string()],
            timeout: Duration::from_secs(30),
        }
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(10);

impl SyntaxCheck {
    /// Run the compiler on `code`.
    ///
    /// The source goes to a temporary `.c` file that is removed when this
    /// returns, whichever way it returns.
    pub fn run(&self, code: &str) -> std::io::Result<SyntaxOutcome> {
        let mut file = tempfile::Builder::new()
            .prefix("flipscript_")
            .suffix(".c")
            .tempfile()?;
        file.write_all(code.as_bytes())?;
        file.flush()?;

        let spawned = Command::new(&self.compiler)
            .args(&self.args)
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(compiler = %self.compiler, "Compiler not found, skipping syntax check");
                return Ok(SyntaxOutcome::Unavailable);
            }
            Err(e) => return Err(e),
        };

        // Drain stderr off-thread so a chatty compiler cannot block on a full pipe.
        // The drain is never joined: a helper process spawned by the compiler can
        // hold the pipe open after the compiler itself is gone.
        let stderr = child.stderr.take();
        let (sender, receiver) = mpsc::channel();
        std::thread::spawn(move || {
            let mut text = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut text);
            }
            let _ = sender.send(text);
        });

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break Some(status);
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        Ok(match status {
            None => {
                tracing::warn!(timeout = ?self.timeout, "Syntax check timed out");
                SyntaxOutcome::TimedOut
            }
            Some(status) if status.success() => SyntaxOutcome::Passed,
            Some(_) => {
                let remaining = self.timeout.saturating_sub(started.elapsed()).max(POLL_INTERVAL);
                SyntaxOutcome::Failed(receiver.recv_timeout(remaining).unwrap_or_default())
            }
        })
    }
}

/// Structural validator
#[derive(Debug, Clone, Default)]
pub struct Validator {
    syntax: Option<SyntaxCheck>,
}

impl Validator {
    /// Validator running the mandatory checks only
    pub fn new() -> Self {
        Self::default()
    }

    /// Also run an external syntax check
    pub fn with_syntax_check(mut self, check: SyntaxCheck) -> Self {
        self.syntax = Some(check);
        self
    }

    /// Validate generated source for an app.
    ///
    /// Syntax check findings are warnings; `ok` follows the mandatory checks.
    pub fn validate(&self, code: &str, app_name: &str, entry_point: &str) -> ValidationReport {
        let mut diagnostics = Vec::new();

        for include in REQUIRED_INCLUDES {
            if !code.contains(include) {
                diagnostics.push(Diagnostic::error(format!("Missing required include: {include}")));
            }
        }

        let entry = format!(
            r"int32_t\s+{}\s*\([^)]*\)\s*\{{",
            regex::escape(entry_point)
        );
        if !matches(&entry, code) {
            diagnostics.push(Diagnostic::error(format!(
                "Missing entry point function: {entry_point}"
            )));
        }

        let state = format!(
            r"(?s)typedef\s+struct\s*\{{.*?\}}\s*{}_state_t\s*;",
            regex::escape(app_name)
        );
        if !matches(&state, code) {
            diagnostics.push(Diagnostic::error(format!(
                "Missing app state structure: {app_name}_state_t"
            )));
        }

        if !code.contains("view_port_alloc") {
            diagnostics.push(Diagnostic::error("Missing view port allocation"));
        }

        if !code.contains("furi_record_open(RECORD_GUI)") {
            diagnostics.push(Diagnostic::error("Missing GUI initialization"));
        }

        if let Some(check) = &self.syntax {
            match check.run(code) {
                Ok(SyntaxOutcome::Passed) => {}
                Ok(SyntaxOutcome::Failed(stderr)) => {
                    diagnostics.push(Diagnostic::warning(format!("Syntax error: {}", stderr.trim_end())));
                }
                Ok(SyntaxOutcome::TimedOut) => {
                    diagnostics.push(Diagnostic::warning(format!(
                        "Syntax check timed out after {:?}",
                        check.timeout
                    )));
                }
                Ok(SyntaxOutcome::Unavailable) => {
                    diagnostics.push(Diagnostic::warning(format!(
                        "Syntax check skipped: {} not available",
                        check.compiler
                    )));
                }
                Err(e) => {
                    diagnostics.push(Diagnostic::warning(format!("Syntax check could not run: {e}")));
                }
            }
        }

        let report = ValidationReport::from_diagnostics(diagnostics);
        tracing::debug!(
            ok = report.ok,
            diagnostics = report.diagnostics.len(),
            "Validated {app_name}"
        );
        report
    }
}

/// Run the mandatory checks on generated source
pub fn validate(code: &str, app_name: &str, entry_point: &str) -> ValidationReport {
    Validator::new().validate(code, app_name, entry_point)
}

fn matches(pattern: &str, text: &str) -> bool {
    match Regex::new(pattern) {
        Ok(re) => re.is_match(text),
        Err(e) => {
            tracing::error!("Invalid validation pattern: {e}");
            false
        }
    }
}
