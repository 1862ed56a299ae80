//! User-facing status messages

use crate::cloud::{DeleteError, JobState, PreprocessError, SubmitError};

pub const NO_TRAINING_JOB: &str = "You haven't submitted training job yet!";
pub const PREPROCESSING_STARTED: &str = "Preprocessing started successfully!";
pub const TRAINING_STARTED: &str = "Training started successfully!";
pub const BUCKET_DELETED: &str = "Bucket deleted successfully!";

pub fn preprocess_error(err: PreprocessError) -> &'static str {
    match err {
        PreprocessError::DockerImageNotReady => {
            "Docker image is not ready for preprocessing. Try once more in a minute!"
        }
        PreprocessError::Failed => "There was a problem running preprocessing. Try once more!",
    }
}

pub fn submit_error(err: SubmitError) -> &'static str {
    match err {
        SubmitError::DockerImageNotReady => {
            "Docker image is not ready for training. Try once more in a minute!"
        }
        SubmitError::QuotaExceeded => {
            "Your project doesn't have enough quota for this setup. Try smaller batch size!"
        }
        SubmitError::Failed => "There was a problem starting training. Try once more!",
        SubmitError::PreprocessingNotFinished => {
            "Preprocessing is not yet finished. Try once more in a minute!"
        }
        SubmitError::PreprocessingFailed => "Preprocessing job failed. Run it once more!",
        SubmitError::PreprocessingNotSubmitted => "You haven't preprocessed the data!",
    }
}

pub fn delete_error(err: DeleteError) -> &'static str {
    match err {
        DeleteError::Failed => "There was a problem deleting bucket :/",
    }
}

pub fn job_status(state: &JobState) -> String {
    format!("Training job status: {}", state)
}

pub fn uploaded(count: usize, bucket: &str) -> String {
    match count {
        1 => format!("Uploaded 1 file to {}.", bucket),
        n => format!("Uploaded {} files to {}.", n, bucket),
    }
}
