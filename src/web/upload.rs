//! Audio upload handling
//!
//! Every file in a request is read and validated before anything touches
//! the disk, so a request with one bad file persists nothing.

use axum::body::Bytes;
use axum::extract::Multipart;
use std::path::{Path, PathBuf};

use crate::config::PanelConfig;
use crate::error::{IoResultExt, PanelError, Result};

/// Multipart field carrying audio files
pub const FILE_FIELD: &str = "file";

/// One uploaded file, name already sanitized
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub data: Bytes,
}

impl UploadedFile {
    /// Extension including the leading dot, lowercased
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
    }
}

/// Read all `file` fields, dropping those whose sanitized name is empty
pub async fn read_files(multipart: &mut Multipart) -> Result<Vec<UploadedFile>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| PanelError::InvalidRequest(e.to_string()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let name = secure_filename(field.file_name().unwrap_or_default());
        let data = field
            .bytes()
            .await
            .map_err(|e| PanelError::InvalidRequest(e.to_string()))?;

        if name.is_empty() {
            continue;
        }
        files.push(UploadedFile { name, data });
    }

    Ok(files)
}

/// Reject the batch if any file has an extension outside the allowed set
pub fn validate(files: &[UploadedFile], config: &PanelConfig) -> Result<()> {
    for file in files {
        match file.extension() {
            Some(ext) if config.is_allowed_extension(&ext) => {}
            _ => return Err(PanelError::DisallowedExtension(file.name.clone())),
        }
    }
    Ok(())
}

/// Write files into `dir`, returning their paths
pub async fn persist(files: &[UploadedFile], dir: &Path) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await.with_path(dir)?;

    let mut saved = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.name);
        tokio::fs::write(&path, &file.data).await.with_path(&path)?;
        saved.push(path);
    }
    Ok(saved)
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Path separators and whitespace become underscores, anything outside
/// `[A-Za-z0-9_.-]` is dropped, and leading or trailing dots and
/// underscores are stripped. The result may be empty.
pub fn secure_filename(raw: &str) -> String {
    let spaced: String = raw
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}
