//! TensorBoard dashboard
//!
//! Starts TensorBoard in the background against the bucket's model
//! directory and looks up this VM's external address so the page can link
//! to it.

use async_trait::async_trait;
use std::sync::Arc;

use super::command::{args, CommandRunner};
use super::Dashboard;
use crate::config::PanelConfig;
use crate::error::{PanelError, Result};

/// Dashboard backed by the `tensorboard` CLI
pub struct TensorboardDashboard {
    runner: Arc<dyn CommandRunner>,
    instance: String,
    zone: String,
}

impl TensorboardDashboard {
    /// Create a dashboard for the named VM
    pub fn new(runner: Arc<dyn CommandRunner>, instance: &str, zone: &str) -> Self {
        Self {
            runner,
            instance: instance.to_string(),
            zone: zone.to_string(),
        }
    }

    /// Create a dashboard from the panel configuration
    pub fn from_config(config: &PanelConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(runner, &config.instance, &config.zone)
    }
}

#[async_trait]
impl Dashboard for TensorboardDashboard {
    async fn launch(&self, logdir: &str, port: u16) -> Result<()> {
        self.runner
            .spawn_detached(
                "tensorboard",
                &args([
                    "--logdir".to_string(),
                    logdir.to_string(),
                    "--port".to_string(),
                    port.to_string(),
                    "--bind_all".to_string(),
                ]),
            )
            .await
    }

    async fn public_address(&self) -> Result<String> {
        let address = self
            .runner
            .output(
                "gcloud",
                &args([
                    "compute".to_string(),
                    "instances".to_string(),
                    "describe".to_string(),
                    self.instance.clone(),
                    format!("--zone={}", self.zone),
                    "--format=get(networkInterfaces[0].accessConfigs[0].natIP)".to_string(),
                ]),
            )
            .await?
            .into_stdout("gcloud")?;

        if address.is_empty() {
            return Err(PanelError::config(format!(
                "instance '{}' has no external address",
                self.instance
            )));
        }

        Ok(address)
    }
}
