//! Google Cloud job client
//!
//! Storage goes through `gsutil`; preprocessing and training run as AI
//! Platform custom-container jobs submitted with `gcloud`. Command failures
//! are classified here and never leave this module as raw stderr.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::archive::archive_directory;
use super::command::{args, CommandOutput, CommandRunner};
use super::status::{DeleteError, JobState, PreprocessError, SubmitError};
use super::training::TrainingParams;
use super::JobClient;
use crate::config::PanelConfig;
use crate::error::{IoResultExt, PanelError, Result};

/// Name of the archive served by `/download`
pub const MODEL_ARCHIVE: &str = "model.tar";

/// Job client backed by `gsutil` and `gcloud`
pub struct GcloudClient {
    runner: Arc<dyn CommandRunner>,
    project: OnceCell<String>,
    preprocess_image: String,
    train_image: String,
}

impl GcloudClient {
    /// Create a client with default image names
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            project: OnceCell::new(),
            preprocess_image: "ddsp-preprocess".to_string(),
            train_image: "ddsp-train".to_string(),
        }
    }

    /// Create a client from the panel configuration
    pub fn from_config(config: &PanelConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(runner)
            .with_project(config.project.clone())
            .with_images(&config.preprocess_image, &config.train_image)
    }

    /// Use a fixed project instead of the gcloud default
    pub fn with_project(mut self, project: Option<String>) -> Self {
        self.project = OnceCell::new_with(project);
        self
    }

    /// Set container image names
    pub fn with_images(mut self, preprocess: &str, train: &str) -> Self {
        self.preprocess_image = preprocess.to_string();
        self.train_image = train.to_string();
        self
    }

    async fn gsutil(&self, args: Vec<String>) -> Result<CommandOutput> {
        self.runner.output("gsutil", &args).await
    }

    async fn gcloud(&self, args: Vec<String>) -> Result<CommandOutput> {
        self.runner.output("gcloud", &args).await
    }

    /// Project id, resolved once from `gcloud config` if not configured
    async fn project(&self) -> Result<String> {
        self.project
            .get_or_try_init(|| async {
                let project = self
                    .gcloud(args(["config", "get-value", "project"]))
                    .await?
                    .into_stdout("gcloud")?;
                if project.is_empty() {
                    return Err(PanelError::config("no gcloud project configured"));
                }
                Ok(project)
            })
            .await
            .cloned()
    }

    async fn image_uri(&self, image: &str) -> Result<String> {
        Ok(format!("gcr.io/{}/{}", self.project().await?, image))
    }

    /// An image is ready once at least one tagged digest exists
    async fn image_ready(&self, uri: &str) -> bool {
        match self
            .gcloud(args([
                "container",
                "images",
                "list-tags",
                uri,
                "--limit=1",
                "--format=get(digest)",
            ]))
            .await
        {
            Ok(out) => out.success() && !out.stdout.trim().is_empty(),
            Err(e) => {
                tracing::warn!(image = uri, error = %e, "image lookup failed");
                false
            }
        }
    }

    async fn submit_training(
        &self,
        job: &str,
        region: &str,
        image_uri: &str,
        machine_args: Vec<String>,
        container_args: Vec<String>,
    ) -> Result<CommandOutput> {
        let mut cmd = args([
            "ai-platform",
            "jobs",
            "submit",
            "training",
            job,
            "--region",
            region,
            "--master-image-uri",
            image_uri,
        ]);
        cmd.extend(machine_args);
        cmd.push("--".to_string());
        cmd.extend(container_args);
        self.gcloud(cmd).await
    }
}

/// Job id for a new job: letters, digits and underscores only
pub fn job_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}_{}", prefix, now.format("%Y%m%d_%H%M%S_%3f"))
}

fn is_quota_error(stderr: &str) -> bool {
    stderr.to_lowercase().contains("quota")
}

fn is_already_exists(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    stderr.contains("already exists") || stderr.contains("409")
}

#[async_trait]
impl JobClient for GcloudClient {
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        let out = self.gsutil(args(["mb", "-l", region, bucket])).await?;

        if out.success() {
            tracing::info!(bucket, region, "bucket created");
            Ok(())
        } else if is_already_exists(&out.stderr) {
            tracing::debug!(bucket, "bucket already exists");
            Ok(())
        } else {
            out.into_stdout("gsutil").map(|_| ())
        }
    }

    async fn upload_blob(&self, bucket: &str, dir: &Path) -> Result<()> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await.with_path(dir)?;
        while let Some(entry) = entries.next_entry().await.with_path(dir)? {
            if entry.file_type().await.with_path(entry.path())?.is_file() {
                files.push(entry.path());
            }
        }

        if files.is_empty() {
            tracing::debug!(dir = %dir.display(), "nothing to upload");
            return Ok(());
        }
        files.sort();

        let mut cmd = args(["-m", "cp"]);
        cmd.extend(files.iter().map(|p| p.display().to_string()));
        cmd.push(format!("{}/audio/", bucket));

        self.gsutil(cmd).await?.into_stdout("gsutil")?;
        tracing::info!(bucket, count = files.len(), "audio uploaded");
        Ok(())
    }

    async fn run_preprocessing(
        &self,
        bucket: &str,
        region: &str,
    ) -> std::result::Result<String, PreprocessError> {
        let image = self.image_uri(&self.preprocess_image).await.map_err(|e| {
            tracing::warn!(error = %e, "cannot resolve preprocessing image");
            PreprocessError::Failed
        })?;

        if !self.image_ready(&image).await {
            return Err(PreprocessError::DockerImageNotReady);
        }

        let job = job_name("ddsp_preprocess", Utc::now());
        let container_args = vec![
            format!("--input_audio_filepatterns={}/audio/*", bucket),
            format!("--output_tfrecord_path={}/preprocessed/train.tfrecord", bucket),
        ];

        match self
            .submit_training(&job, region, &image, args(["--scale-tier", "basic"]), container_args)
            .await
        {
            Ok(out) if out.success() => {
                tracing::info!(job = %job, "preprocessing submitted");
                Ok(job)
            }
            Ok(_) => Err(PreprocessError::Failed),
            Err(e) => {
                tracing::warn!(error = %e, "preprocessing submission failed");
                Err(PreprocessError::Failed)
            }
        }
    }

    async fn submit_job(
        &self,
        params: &TrainingParams,
        bucket: &str,
        region: &str,
        preprocess_job: Option<&str>,
    ) -> std::result::Result<String, SubmitError> {
        let preprocess_job = preprocess_job.ok_or(SubmitError::PreprocessingNotSubmitted)?;

        match self.check_job_status(preprocess_job).await {
            JobState::Succeeded => {}
            JobState::NotFound => return Err(SubmitError::PreprocessingNotSubmitted),
            state if state.is_unsuccessful_end() => return Err(SubmitError::PreprocessingFailed),
            _ => return Err(SubmitError::PreprocessingNotFinished),
        }

        let image = self.image_uri(&self.train_image).await.map_err(|e| {
            tracing::warn!(error = %e, "cannot resolve training image");
            SubmitError::Failed
        })?;

        if !self.image_ready(&image).await {
            return Err(SubmitError::DockerImageNotReady);
        }

        let profile = params.machine_profile();
        let machine_args = args([
            "--scale-tier".to_string(),
            "custom".to_string(),
            "--master-machine-type".to_string(),
            profile.machine_type.to_string(),
            "--master-accelerator".to_string(),
            profile.accelerator_arg(),
        ]);

        let job = job_name("ddsp_train", Utc::now());
        match self
            .submit_training(&job, region, &image, machine_args, params.container_args(bucket))
            .await
        {
            Ok(out) if out.success() => {
                tracing::info!(job = %job, gpus = profile.gpu_count, "training submitted");
                Ok(job)
            }
            Ok(out) if is_quota_error(&out.stderr) => Err(SubmitError::QuotaExceeded),
            Ok(_) => Err(SubmitError::Failed),
            Err(e) => {
                tracing::warn!(error = %e, "training submission failed");
                Err(SubmitError::Failed)
            }
        }
    }

    async fn check_job_status(&self, job: &str) -> JobState {
        let out = self
            .gcloud(args([
                "ai-platform",
                "jobs",
                "describe",
                job,
                "--format=value(state)",
            ]))
            .await;

        match out {
            Ok(out) if out.success() => JobState::parse(&out.stdout),
            Ok(_) => JobState::NotFound,
            Err(e) => {
                tracing::warn!(job, error = %e, "job lookup failed");
                JobState::NotFound
            }
        }
    }

    async fn get_model(
        &self,
        bucket: &str,
        download_dir: &Path,
        archive_dir: &Path,
    ) -> Result<PathBuf> {
        let model_dir = download_dir.join("model");
        if tokio::fs::try_exists(&model_dir).await.with_path(&model_dir)? {
            tokio::fs::remove_dir_all(&model_dir).await.with_path(&model_dir)?;
        }
        tokio::fs::create_dir_all(download_dir).await.with_path(download_dir)?;

        self.gsutil(args([
            "-m".to_string(),
            "cp".to_string(),
            "-r".to_string(),
            format!("{}/model", bucket),
            download_dir.display().to_string(),
        ]))
        .await?
        .into_stdout("gsutil")?;

        let dest = archive_dir.join(MODEL_ARCHIVE);
        let archive_path = dest.clone();
        tokio::task::spawn_blocking(move || archive_directory(&model_dir, &archive_path, "model"))
            .await
            .map_err(|e| PanelError::ArchiveError(e.to_string()))??;

        tracing::info!(archive = %dest.display(), "model archived");
        Ok(dest)
    }

    async fn delete_bucket(&self, bucket: &str) -> std::result::Result<(), DeleteError> {
        match self.gsutil(args(["-m", "rm", "-r", bucket])).await {
            Ok(out) if out.success() => {
                tracing::info!(bucket, "bucket deleted");
                Ok(())
            }
            Ok(_) => Err(DeleteError::Failed),
            Err(e) => {
                tracing::warn!(bucket, error = %e, "bucket deletion failed");
                Err(DeleteError::Failed)
            }
        }
    }
}
