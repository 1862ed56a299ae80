//! Test doubles for the cloud seams

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::command::{CommandOutput, CommandRunner};
use super::status::{DeleteError, JobState, PreprocessError, SubmitError};
use super::training::TrainingParams;
use super::{Dashboard, JobClient};
use crate::error::{PanelError, Result};

type Hook = Box<dyn Fn(&[String]) + Send + Sync>;

/// Runner that replays canned outputs in order and records every call
pub struct ScriptedRunner {
    responses: Mutex<VecDeque<CommandOutput>>,
    calls: Mutex<Vec<Vec<String>>>,
    spawned: Mutex<Vec<Vec<String>>>,
    hook: Option<Hook>,
}

impl ScriptedRunner {
    pub fn new(responses: Vec<CommandOutput>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
            spawned: Mutex::new(Vec::new()),
            hook: None,
        })
    }

    /// Like `new`, running `hook` with each call before its output is returned
    pub fn with_hook(
        responses: Vec<CommandOutput>,
        hook: impl Fn(&[String]) + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
            spawned: Mutex::new(Vec::new()),
            hook: Some(Box::new(hook)),
        })
    }

    /// Program followed by its arguments, one entry per `output` call
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Program followed by its arguments, one entry per `spawn_detached` call
    pub fn spawned(&self) -> Vec<Vec<String>> {
        self.spawned.lock().unwrap().clone()
    }
}

fn record(program: &str, args: &[String]) -> Vec<String> {
    std::iter::once(program.to_string())
        .chain(args.iter().cloned())
        .collect()
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn output(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let call = record(program, args);
        if let Some(hook) = &self.hook {
            hook(&call);
        }
        self.calls.lock().unwrap().push(call);
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| CommandOutput::ok("")))
    }

    async fn spawn_detached(&self, program: &str, args: &[String]) -> Result<()> {
        self.spawned.lock().unwrap().push(record(program, args));
        Ok(())
    }
}

/// Job client with configurable outcomes
pub struct FakeJobClient {
    pub preprocess: Mutex<std::result::Result<String, PreprocessError>>,
    pub submit: Mutex<std::result::Result<String, SubmitError>>,
    pub state: Mutex<JobState>,
    pub delete: Mutex<std::result::Result<(), DeleteError>>,
    pub model_bytes: Vec<u8>,
    pub calls: Mutex<Vec<String>>,
    pub submitted_with: Mutex<Option<Option<String>>>,
}

impl Default for FakeJobClient {
    fn default() -> Self {
        Self {
            preprocess: Mutex::new(Ok("ddsp_preprocess_1".to_string())),
            submit: Mutex::new(Ok("ddsp_train_1".to_string())),
            state: Mutex::new(JobState::Running),
            delete: Mutex::new(Ok(())),
            model_bytes: b"fake model archive".to_vec(),
            calls: Mutex::new(Vec::new()),
            submitted_with: Mutex::new(None),
        }
    }
}

impl FakeJobClient {
    pub fn set_state(&self, state: JobState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl JobClient for FakeJobClient {
    async fn create_bucket(&self, bucket: &str, region: &str) -> Result<()> {
        self.record(format!("create_bucket {} {}", bucket, region));
        Ok(())
    }

    async fn upload_blob(&self, bucket: &str, _dir: &Path) -> Result<()> {
        self.record(format!("upload_blob {}", bucket));
        Ok(())
    }

    async fn run_preprocessing(
        &self,
        bucket: &str,
        _region: &str,
    ) -> std::result::Result<String, PreprocessError> {
        self.record(format!("run_preprocessing {}", bucket));
        self.preprocess.lock().unwrap().clone()
    }

    async fn submit_job(
        &self,
        params: &TrainingParams,
        bucket: &str,
        _region: &str,
        preprocess_job: Option<&str>,
    ) -> std::result::Result<String, SubmitError> {
        self.record(format!("submit_job {} batch={}", bucket, params.batch_size));
        *self.submitted_with.lock().unwrap() = Some(preprocess_job.map(str::to_string));
        self.submit.lock().unwrap().clone()
    }

    async fn check_job_status(&self, job: &str) -> JobState {
        self.record(format!("check_job_status {}", job));
        self.state.lock().unwrap().clone()
    }

    async fn get_model(
        &self,
        bucket: &str,
        _download_dir: &Path,
        archive_dir: &Path,
    ) -> Result<PathBuf> {
        self.record(format!("get_model {}", bucket));
        let path = archive_dir.join(super::MODEL_ARCHIVE);
        std::fs::write(&path, &self.model_bytes).map_err(|e| PanelError::io(&path, e))?;
        Ok(path)
    }

    async fn delete_bucket(&self, bucket: &str) -> std::result::Result<(), DeleteError> {
        self.record(format!("delete_bucket {}", bucket));
        *self.delete.lock().unwrap()
    }
}

/// Dashboard that records launches
pub struct FakeDashboard {
    pub address: String,
    pub launched: Mutex<Vec<(String, u16)>>,
}

impl Default for FakeDashboard {
    fn default() -> Self {
        Self {
            address: "34.90.12.7".to_string(),
            launched: Mutex::new(Vec::new()),
        }
    }
}

impl FakeDashboard {
    pub fn launched(&self) -> Vec<(String, u16)> {
        self.launched.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dashboard for FakeDashboard {
    async fn launch(&self, logdir: &str, port: u16) -> Result<()> {
        self.launched.lock().unwrap().push((logdir.to_string(), port));
        Ok(())
    }

    async fn public_address(&self) -> Result<String> {
        Ok(self.address.clone())
    }
}
