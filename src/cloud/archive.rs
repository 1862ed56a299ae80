//! Model archive
//!
//! Packs a fetched model directory into a single tar file for download.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{IoResultExt, PanelError, Result};

/// Archive `src_dir` into `dest` with entries rooted at `root_name/`.
///
/// Returns the archive size in bytes.
pub fn archive_directory(src_dir: &Path, dest: &Path, root_name: &str) -> Result<u64> {
    if !src_dir.is_dir() {
        return Err(PanelError::ArchiveError(format!(
            "model directory missing: {}",
            src_dir.display()
        )));
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).with_path(parent)?;
    }

    let file = File::create(dest).with_path(dest)?;
    let mut builder = tar::Builder::new(BufWriter::new(file));
    builder
        .append_dir_all(root_name, src_dir)
        .map_err(|e| PanelError::ArchiveError(e.to_string()))?;

    let mut writer = builder
        .into_inner()
        .map_err(|e| PanelError::ArchiveError(e.to_string()))?;
    writer.flush().with_path(dest)?;
    drop(writer);

    let size = std::fs::metadata(dest).with_path(dest)?.len();
    tracing::debug!(archive = %dest.display(), size, "model archive written");
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_archive_contains_model_files() {
        let tmp = tempfile::tempdir().unwrap();
        let model = tmp.path().join("downloads").join("model");
        std::fs::create_dir_all(model.join("train")).unwrap();
        std::fs::write(model.join("ckpt-300.index"), b"index").unwrap();
        std::fs::write(model.join("train").join("events.out"), b"events").unwrap();

        let dest = tmp.path().join("model.tar");
        let size = archive_directory(&model, &dest, "model").unwrap();
        assert!(size > 0);

        let mut archive = tar::Archive::new(File::open(&dest).unwrap());
        let names: BTreeSet<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
            .collect();
        assert!(names.contains("model/ckpt-300.index"));
        assert!(names.contains("model/train/events.out"));
    }

    #[test]
    fn test_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let err = archive_directory(&tmp.path().join("nope"), &tmp.path().join("m.tar"), "model")
            .unwrap_err();
        assert!(matches!(err, PanelError::ArchiveError(_)));
    }
}
