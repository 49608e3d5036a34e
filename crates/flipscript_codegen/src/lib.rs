// SPDX-License-Identifier: MIT OR Apache-2.0
//! Flipper Zero code generation for `FlipScript` block graphs.
//!
//! ## Pipeline
//!
//! A [`GraphSnapshot`](flipscript_graph::GraphSnapshot), the block registry
//! and a [`Manifest`] go into the [`CodeGenerator`], which returns the
//! generated files. The [`Validator`] then checks the generated source for
//! the structure every Flipper app needs.

pub mod capability;
pub mod generator;
pub mod manifest;
pub mod validate;

pub use capability::{Capability, CapabilitySet, CAPABILITIES};
pub use generator::{generate, CodeGenerator, GenerateError, GeneratedFiles, MAIN_FILE};
pub use manifest::{Manifest, ManifestError, ManifestIssue};
pub use validate::{validate, Diagnostic, Severity, SyntaxCheck, SyntaxOutcome, ValidationReport, Validator};
