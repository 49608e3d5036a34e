// SPDX-License-Identifier: MIT OR Apache-2.0
//! Export of generated files to an app directory.
//!
//! Writes every generated source file plus `application.fam` rendered from
//! the manifest, which is what the firmware build tool expects to find.

use flipscript_codegen::{GeneratedFiles, Manifest};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Manifest file name expected by the firmware build
pub const MANIFEST_FILE: &str = "application.fam";

/// Export result
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    /// Directory the files were written to
    pub output_dir: PathBuf,
    /// Written files, in write order
    pub files: Vec<PathBuf>,
    /// Total bytes written
    pub bytes: u64,
    /// Wall time spent writing
    pub export_time_secs: f64,
}

/// Write generated files and the manifest under `output_dir`, creating it
pub fn export(
    files: &GeneratedFiles,
    manifest: &Manifest,
    output_dir: &Path,
) -> std::io::Result<ExportSummary> {
    let start = Instant::now();
    std::fs::create_dir_all(output_dir)?;

    let mut summary = ExportSummary {
        output_dir: output_dir.to_path_buf(),
        files: Vec::new(),
        bytes: 0,
        export_time_secs: 0.0,
    };

    let fam = manifest.to_fam() + "\n";
    for (name, text) in files.iter().chain(std::iter::once((MANIFEST_FILE, fam.as_str()))) {
        let path = output_dir.join(name);
        std::fs::write(&path, text)?;
        tracing::debug!("Wrote {}", path.display());
        summary.bytes += text.len() as u64;
        summary.files.push(path);
    }

    summary.export_time_secs = start.elapsed().as_secs_f64();
    tracing::info!(
        "Exported {} files ({} bytes) to {} in {:.2}s",
        summary.files.len(),
        summary.bytes,
        output_dir.display(),
        summary.export_time_secs
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipscript_codegen::{generate, MAIN_FILE};
    use flipscript_graph::{create_flipper_registry, BlockRecord, GraphSnapshot};

    #[test]
    fn test_export_writes_sources_and_manifest() {
        let registry = create_flipper_registry();
        let manifest = Manifest {
            appid: "exported".to_string(),
            ..Manifest::default()
        };
        let snapshot = GraphSnapshot {
            blocks: vec![BlockRecord::new("start", "app_on_start")],
            connections: Vec::new(),
        };
        let files = generate(&registry, &manifest, &snapshot).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("app");
        let summary = export(&files, &manifest, &out).unwrap();

        assert_eq!(summary.files, vec![out.join(MAIN_FILE), out.join(MANIFEST_FILE)]);
        let main = std::fs::read_to_string(out.join(MAIN_FILE)).unwrap();
        assert_eq!(main, files.main_source().unwrap());

        let fam = std::fs::read_to_string(out.join(MANIFEST_FILE)).unwrap();
        assert_eq!(Manifest::from_fam(&fam).unwrap().appid, "exported");
        assert_eq!(summary.bytes, (main.len() + fam.len()) as u64);
    }
}
