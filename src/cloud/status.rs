//! Job outcomes
//!
//! Tagged outcomes returned by the job client. Every failure of a remote
//! operation is folded into one of these variants at the client boundary.

use std::fmt;
use thiserror::Error;

/// Why a preprocessing job could not be started
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessError {
    /// The preprocessing container image has not been pushed yet
    #[error("preprocessing image not ready")]
    DockerImageNotReady,
    /// Any other failure while submitting the job
    #[error("preprocessing submission failed")]
    Failed,
}

/// Why a training job could not be started
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The training container image has not been pushed yet
    #[error("training image not ready")]
    DockerImageNotReady,
    /// The project lacks accelerator quota for the requested profile
    #[error("quota exceeded")]
    QuotaExceeded,
    /// Any other failure while submitting the job
    #[error("training submission failed")]
    Failed,
    /// Preprocessing job is still queued or running
    #[error("preprocessing not finished")]
    PreprocessingNotFinished,
    /// Preprocessing job ended without success
    #[error("preprocessing failed")]
    PreprocessingFailed,
    /// No preprocessing job was ever started
    #[error("preprocessing not submitted")]
    PreprocessingNotSubmitted,
}

/// Why a bucket could not be deleted
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteError {
    /// Removal command failed
    #[error("bucket deletion failed")]
    Failed,
}

/// Remote job state as reported by `gcloud ai-platform jobs describe`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Queued,
    Preparing,
    Running,
    Succeeded,
    Failed,
    Cancelling,
    Cancelled,
    Unspecified,
    /// The job does not exist (or could not be described)
    NotFound,
    /// A state string this client does not know
    Other(String),
}

impl JobState {
    /// Parse the raw state string
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "QUEUED" => Self::Queued,
            "PREPARING" => Self::Preparing,
            "RUNNING" => Self::Running,
            "SUCCEEDED" => Self::Succeeded,
            "FAILED" => Self::Failed,
            "CANCELLING" => Self::Cancelling,
            "CANCELLED" => Self::Cancelled,
            "STATE_UNSPECIFIED" | "" => Self::Unspecified,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire name of the state
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "QUEUED",
            Self::Preparing => "PREPARING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelling => "CANCELLING",
            Self::Cancelled => "CANCELLED",
            Self::Unspecified => "STATE_UNSPECIFIED",
            Self::NotFound => "NOT_FOUND",
            Self::Other(s) => s,
        }
    }

    /// Whether the job ended without success
    pub fn is_unsuccessful_end(&self) -> bool {
        matches!(self, Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_states() {
        assert_eq!(JobState::parse("RUNNING\n"), JobState::Running);
        assert_eq!(JobState::parse("succeeded"), JobState::Succeeded);
        assert_eq!(JobState::parse(""), JobState::Unspecified);
        assert_eq!(JobState::parse("PAUSED"), JobState::Other("PAUSED".into()));
    }

    #[test]
    fn test_display_matches_wire_name() {
        assert_eq!(JobState::Cancelling.to_string(), "CANCELLING");
        assert_eq!(JobState::Other("PAUSED".into()).to_string(), "PAUSED");
    }

    #[test]
    fn test_unsuccessful_end() {
        assert!(JobState::Failed.is_unsuccessful_end());
        assert!(JobState::Cancelled.is_unsuccessful_end());
        assert!(!JobState::Running.is_unsuccessful_end());
        assert!(!JobState::Succeeded.is_unsuccessful_end());
    }
}
