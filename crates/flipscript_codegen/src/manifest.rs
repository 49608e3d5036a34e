// SPDX-License-Identifier: MIT OR Apache-2.0
//! Application manifest.
//!
//! Read from JSON or from `application.fam` text, and rendered back to
//! `application.fam` for the firmware build.

use crate::capability;
use crate::validate::Severity;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// App id used for generation when a manifest does not name one
pub const FALLBACK_APPID: &str = "flipper_app";

/// Error when reading a manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The manifest file could not be read
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        /// Path that failed
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// Manifest JSON is malformed
    #[error("Malformed manifest: {0}")]
    Json(#[from] serde_json::Error),

    /// Text does not contain an `App(...)` declaration
    #[error("No App(...) declaration found")]
    NotAnApp,

    /// File extension is neither `.json` nor `.fam`
    #[error("Unsupported manifest format: {0}")]
    UnsupportedFormat(String),

    /// Internal pattern failed to compile
    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

/// A problem found by [`Manifest::validate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestIssue {
    /// Offending field
    pub field: &'static str,
    /// Description
    pub message: String,
    /// Severity
    pub severity: Severity,
}

impl ManifestIssue {
    fn error(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
            severity: Severity::Error,
        }
    }

    fn warning(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
            severity: Severity::Warning,
        }
    }
}

fn fallback_appid() -> String {
    FALLBACK_APPID.to_string()
}

/// Flipper application manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// Display name
    pub name: String,
    /// Application id, also the C identifier prefix
    #[serde(default = "fallback_appid")]
    pub appid: String,
    /// Version string
    pub version: String,
    /// Entry point function name
    pub entry_point: String,
    /// Required capabilities
    pub requires: Vec<String>,
    /// Stack size in bytes
    pub stack_size: u32,
    /// Icon path
    pub icon: Option<String>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self {
            name: "New Flipper App".to_string(),
            appid: "new_flipper_app".to_string(),
            version: "1.0".to_string(),
            entry_point: "app_main".to_string(),
            requires: vec!["gui".to_string()],
            stack_size: 1024,
            icon: None,
        }
    }
}

impl Manifest {
    /// Parse manifest JSON; missing fields take their defaults
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String, ManifestError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse `application.fam` text
    pub fn from_fam(text: &str) -> Result<Self, ManifestError> {
        if !Regex::new(r"\bApp\s*\(")?.is_match(text) {
            return Err(ManifestError::NotAnApp);
        }

        let mut manifest = Self {
            appid: fallback_appid(),
            ..Self::default()
        };

        if let Some(appid) = quoted_field(text, "appid")? {
            manifest.appid = appid;
        }
        if let Some(name) = quoted_field(text, "name")? {
            manifest.name = name;
        }
        if let Some(entry_point) = quoted_field(text, "entry_point")? {
            manifest.entry_point = entry_point;
        }
        if let Some(version) = quoted_field(text, "version")? {
            manifest.version = version;
        }
        if let Some(icon) = quoted_field(text, "icon")? {
            manifest.icon = Some(icon);
        }
        if let Some(size) = Regex::new(r"\bstack_size\s*=\s*(\d+)")?
            .captures(text)
            .and_then(|c| c[1].parse().ok())
        {
            manifest.stack_size = size;
        }
        if let Some(list) = Regex::new(r"(?s)\brequires\s*=\s*\[(.*?)\]")?.captures(text) {
            let item = Regex::new(r#""([^"]+)""#)?;
            manifest.requires = item
                .captures_iter(&list[1])
                .map(|c| c[1].to_string())
                .collect();
        }

        Ok(manifest)
    }

    /// Render as `application.fam` text
    pub fn to_fam(&self) -> String {
        let mut lines = vec![
            "App(".to_string(),
            format!("    appid=\"{}\"", self.appid),
            format!("    name=\"{}\"", self.name),
            "    apptype=FlipperAppType.EXTERNAL".to_string(),
            format!("    entry_point=\"{}\"", self.entry_point),
            format!("    stack_size={}", self.stack_size),
            format!("    version=\"{}\"", self.version),
        ];

        if let Some(icon) = self.icon.as_deref().filter(|i| !i.is_empty()) {
            let file_name = Path::new(icon)
                .file_name()
                .map_or_else(|| icon.to_string(), |f| f.to_string_lossy().into_owned());
            lines.push(format!("    icon=\"{file_name}\""));
        }

        if !self.requires.is_empty() {
            lines.push("    requires=[".to_string());
            lines.extend(self.requires.iter().map(|r| format!("        \"{r}\",")));
            lines.push("    ]".to_string());
        }

        lines.push(")".to_string());
        lines.join("\n")
    }

    /// Load a manifest file, choosing the parser by extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.display().to_string(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&text),
            Some("fam") => Self::from_fam(&text),
            _ => Err(ManifestError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// Check the manifest for problems
    pub fn validate(&self) -> Vec<ManifestIssue> {
        let mut issues = Vec::new();

        if self.name.is_empty() {
            issues.push(ManifestIssue::error("name", "App name is required"));
        }

        if self.appid.is_empty() {
            issues.push(ManifestIssue::error("appid", "App id is required"));
        } else if !is_valid_appid(&self.appid) {
            issues.push(ManifestIssue::error(
                "appid",
                "App id must contain only lowercase letters, numbers, and underscores",
            ));
        }

        if self.version.is_empty() {
            issues.push(ManifestIssue::error("version", "Version is required"));
        }

        if self.entry_point.is_empty() {
            issues.push(ManifestIssue::error("entry_point", "Entry point is required"));
        }

        if self.requires.is_empty() {
            issues.push(ManifestIssue::error(
                "requires",
                "At least one requirement must be selected",
            ));
        }
        for name in &self.requires {
            if capability::lookup(name).is_none() {
                issues.push(ManifestIssue::warning(
                    "requires",
                    format!("Unknown capability '{name}' is ignored"),
                ));
            }
        }

        issues
    }

    /// Whether validation found no errors
    pub fn is_valid(&self) -> bool {
        self.validate().iter().all(|i| i.severity != Severity::Error)
    }
}

fn is_valid_appid(appid: &str) -> bool {
    appid
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn quoted_field(text: &str, field: &str) -> Result<Option<String>, regex::Error> {
    let pattern = Regex::new(&format!(r#"\b{}\s*=\s*"([^"]+)""#, regex::escape(field)))?;
    Ok(pattern.captures(text).map(|c| c[1].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let manifest = Manifest::default();
        assert_eq!(manifest.entry_point, "app_main");
        assert_eq!(manifest.requires, vec!["gui"]);
        assert_eq!(manifest.stack_size, 1024);
        assert!(manifest.is_valid());
    }

    #[test]
    fn test_json_missing_appid_falls_back() {
        let manifest = Manifest::from_json(r#"{"name": "Demo", "requires": ["storage"]}"#).unwrap();
        assert_eq!(manifest.appid, FALLBACK_APPID);
        assert_eq!(manifest.entry_point, "app_main");
        assert_eq!(manifest.requires, vec!["storage"]);
    }

    #[test]
    fn test_fam_round_trip() {
        let manifest = Manifest {
            name: "Demo App".to_string(),
            appid: "demo".to_string(),
            version: "2.1".to_string(),
            entry_point: "demo_main".to_string(),
            requires: vec!["gui".to_string(), "storage".to_string()],
            stack_size: 2048,
            icon: Some("assets/icons/demo.png".to_string()),
        };

        let text = manifest.to_fam();
        assert!(text.contains("    apptype=FlipperAppType.EXTERNAL"));
        assert!(text.contains("    icon=\"demo.png\""));
        assert!(text.contains("        \"storage\","));

        let parsed = Manifest::from_fam(&text).unwrap();
        assert_eq!(parsed.appid, "demo");
        assert_eq!(parsed.name, "Demo App");
        assert_eq!(parsed.entry_point, "demo_main");
        assert_eq!(parsed.version, "2.1");
        assert_eq!(parsed.stack_size, 2048);
        assert_eq!(parsed.requires, manifest.requires);
        assert_eq!(parsed.icon.as_deref(), Some("demo.png"));
    }

    #[test]
    fn test_fam_requires_not_an_app() {
        assert!(matches!(Manifest::from_fam("hello"), Err(ManifestError::NotAnApp)));
    }

    #[test]
    fn test_fam_without_requires_keeps_default() {
        let manifest = Manifest::from_fam("App(\n    appid=\"x\"\n)").unwrap();
        assert_eq!(manifest.appid, "x");
        assert_eq!(manifest.requires, vec!["gui"]);
    }

    #[test]
    fn test_validate_reports_each_problem() {
        let manifest = Manifest {
            name: String::new(),
            appid: "Bad Id".to_string(),
            version: String::new(),
            entry_point: String::new(),
            requires: vec!["warp_drive".to_string()],
            stack_size: 1024,
            icon: None,
        };

        let issues = manifest.validate();
        let errors: Vec<&str> = issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .map(|i| i.field)
            .collect();
        assert_eq!(errors, vec!["name", "appid", "version", "entry_point"]);

        let warnings: Vec<&ManifestIssue> =
            issues.iter().filter(|i| i.severity == Severity::Warning).collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("warp_drive"));
        assert!(!manifest.is_valid());
    }

    #[test]
    fn test_validate_empty_requires() {
        let manifest = Manifest {
            requires: Vec::new(),
            ..Manifest::default()
        };
        assert_eq!(manifest.validate()[0].field, "requires");
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("manifest.json");
        std::fs::write(&json, r#"{"appid": "from_json"}"#).unwrap();
        assert_eq!(Manifest::load(&json).unwrap().appid, "from_json");

        let fam = dir.path().join("application.fam");
        std::fs::write(&fam, "App(appid=\"from_fam\")").unwrap();
        assert_eq!(Manifest::load(&fam).unwrap().appid, "from_fam");

        let other = dir.path().join("manifest.yaml");
        std::fs::write(&other, "appid: x").unwrap();
        assert!(matches!(
            Manifest::load(&other),
            Err(ManifestError::UnsupportedFormat(_))
        ));
    }
}
