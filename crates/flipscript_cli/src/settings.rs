// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tool settings.
//!
//! Stored as RON in `flipscript.ron`. Every field has a default, so a
//! settings file only needs the values it changes.

use flipscript_codegen::SyntaxCheck;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Settings file name
pub const SETTINGS_FILE_NAME: &str = "flipscript.ron";

/// Error when reading or writing settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File is not valid settings RON
    #[error("Malformed settings: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] ron::Error),

    /// File was written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Highest supported version
        supported: u32,
    },
}

/// External syntax check settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntaxCheckSettings {
    /// Run the check on every generate
    pub enabled: bool,
    /// Compiler executable
    pub compiler: String,
    /// Compiler arguments
    pub args: Vec<String>,
    /// Seconds before the compiler is killed
    pub timeout_secs: u64,
}

impl Default for SyntaxCheckSettings {
    fn default() -> Self {
        let check = SyntaxCheck::default();
        Self {
            enabled: false,
            compiler: check.compiler,
            args: check.args,
            timeout_secs: check.timeout.as_secs(),
        }
    }
}

impl SyntaxCheckSettings {
    /// Build the syntax check these settings describe
    pub fn to_check(&self) -> SyntaxCheck {
        SyntaxCheck {
            compiler: self.compiler.clone(),
            args: self.args.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Complete tool settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// Settings format version
    pub version: u32,
    /// Block catalog used when none is given on the command line
    pub catalog: Option<PathBuf>,
    /// Directory generated files are written to
    pub output_dir: PathBuf,
    /// Log filter used when `RUST_LOG` is not set
    pub log_filter: Option<String>,
    /// External syntax check
    pub syntax_check: SyntaxCheckSettings,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            catalog: None,
            output_dir: PathBuf::from("dist"),
            log_filter: None,
            syntax_check: SyntaxCheckSettings::default(),
        }
    }
}

impl ToolSettings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings: ToolSettings = ron::from_str(&content)?;

        // Version check
        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);

        let mut settings = ToolSettings::default();
        settings.catalog = Some(PathBuf::from("blocks.json"));
        settings.syntax_check.enabled = true;
        settings.save(&path).unwrap();

        assert_eq!(ToolSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings: ToolSettings = ron::from_str("(output_dir: \"build\")").unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("build"));
        assert_eq!(settings.version, SETTINGS_FORMAT_VERSION);
        assert_eq!(settings.syntax_check.compiler, "gcc");
        assert_eq!(settings.syntax_check.timeout_secs, 30);
        assert!(!settings.syntax_check.enabled);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = ToolSettings::load_or_default(&dir.path().join("absent.ron")).unwrap();
        assert_eq!(settings, ToolSettings::default());
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "(version: 99)").unwrap();
        assert!(matches!(
            ToolSettings::load(&path),
            Err(SettingsError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "(version: ").unwrap();
        assert!(matches!(
            ToolSettings::load_or_default(&path),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn test_syntax_check_conversion() {
        let check = SyntaxCheckSettings::default().to_check();
        assert_eq!(check, SyntaxCheck::default());
    }
}
