//! Cloud job client
//!
//! Wraps the storage and managed-job CLIs behind two traits:
//!
//! | Trait | Implementation | Backing tools |
//! |-------|----------------|---------------|
//! | [`JobClient`] | [`GcloudClient`] | `gsutil`, `gcloud ai-platform`, `gcloud container` |
//! | [`Dashboard`] | [`TensorboardDashboard`] | `tensorboard`, `gcloud compute` |
//!
//! The web layer only talks to the traits and maps their outcomes to
//! messages.

mod archive;
mod command;
mod dashboard;
mod gcloud;
mod status;
mod training;

#[cfg(test)]
pub(crate) mod testing;

pub use archive::*;
pub use command::*;
pub use dashboard::*;
pub use gcloud::*;
pub use status::*;
pub use training::*;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Remote storage and job operations
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Create the bucket; succeeds if it already exists
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()>;

    /// Copy every file in `dir` into the bucket's audio prefix
    async fn upload_blob(&self, bucket: &str, dir: &Path) -> Result<()>;

    /// Start preprocessing of the uploaded audio, returning the job id
    async fn run_preprocessing(
        &self,
        bucket: &str,
        region: &str,
    ) -> std::result::Result<String, PreprocessError>;

    /// Start training once preprocessing succeeded, returning the job id
    async fn submit_job(
        &self,
        params: &TrainingParams,
        bucket: &str,
        region: &str,
        preprocess_job: Option<&str>,
    ) -> std::result::Result<String, SubmitError>;

    /// Current state of a job
    async fn check_job_status(&self, job: &str) -> JobState;

    /// Fetch the trained model into `download_dir` and archive it under
    /// `archive_dir`, returning the archive path
    async fn get_model(
        &self,
        bucket: &str,
        download_dir: &Path,
        archive_dir: &Path,
    ) -> Result<PathBuf>;

    /// Remove the bucket and everything in it
    async fn delete_bucket(&self, bucket: &str) -> std::result::Result<(), DeleteError>;
}

/// Monitoring dashboard for a running job
#[async_trait]
pub trait Dashboard: Send + Sync {
    /// Start the dashboard process reading `logdir`
    async fn launch(&self, logdir: &str, port: u16) -> Result<()>;

    /// Externally reachable host address of this machine
    async fn public_address(&self) -> Result<String>;
}

/// Link to a dashboard served on `port` at `host`
pub fn dashboard_link(host: &str, port: u16) -> String {
    format!("http://{}:{}/", host, port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_link() {
        assert_eq!(dashboard_link("34.90.1.2", 6006), "http://34.90.1.2:6006/");
    }
}
