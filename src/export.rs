//! Export the progress document as JSON.
//!
//! The output has the same shape as the local progress file, so it can be
//! uploaded to a remote location or restored by copying it into place.

use anyhow::{Context, Result};
use skilltrack_core::Document;
use std::io::Write;
use std::path::Path;

/// Write `doc` as pretty JSON to `output`, or to stdout when `None`.
pub fn run_export(doc: &Document, output: Option<&Path>) -> Result<()> {
    let json = doc.to_json_pretty()?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create export directory: {}", parent.display())
                    })?;
                }
            }
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write export file: {}", path.display()))?;
            eprintln!(
                "Exported {} task flags to {}",
                doc.tasks.len(),
                path.display()
            );
        }
        None => {
            let mut out = std::io::stdout().lock();
            out.write_all(&json)?;
            out.flush()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn export_matches_the_local_file_format() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/backup.json");

        let mut doc = Document::new();
        doc.set_complete("helm_charts", true);
        doc.notes.to_learn = "Istio".into();
        run_export(&doc, Some(&path)).unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(written, doc.to_json_pretty().unwrap());
        assert_eq!(Document::from_json(&written).unwrap(), doc);
    }
}
