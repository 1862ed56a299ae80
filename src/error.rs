//! Error types for TrainPanel
//!
//! Infrastructure failures (I/O, missing CLI tools, malformed requests) are
//! represented here. Expected job outcomes such as "quota exceeded" are not
//! errors at this level; see [`crate::cloud::status`].

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for TrainPanel operations
#[derive(Error, Debug)]
pub enum PanelError {
    /// I/O error during file operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An external command could not be started
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An external command exited unsuccessfully
    #[error("'{program}' exited with status {code:?}: {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Uploaded file has an extension outside the allowed set
    #[error("File type not allowed: {0}")]
    DisallowedExtension(String),

    /// Request body could not be decoded
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Training form values out of range
    #[error("Invalid training parameter '{field}': {message}")]
    InvalidParameter { field: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Archive creation error
    #[error("Archive error: {0}")]
    ArchiveError(String),
}

impl PanelError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a command failure error
    pub fn command_failed(
        program: impl Into<String>,
        code: Option<i32>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            program: program.into(),
            code,
            stderr: stderr.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Whether the error was caused by the client rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::DisallowedExtension(_) | Self::InvalidRequest(_) | Self::InvalidParameter { .. }
        )
    }

    /// Captured stderr, if the error came from a finished command
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::CommandFailed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// Result type alias for TrainPanel operations
pub type Result<T> = std::result::Result<T, PanelError>;

impl From<std::io::Error> for PanelError {
    fn from(err: std::io::Error) -> Self {
        PanelError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| PanelError::io(path, e))
    }
}
