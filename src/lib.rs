//! # TrainPanel - Web Control Panel for Remote Training
//!
//! TrainPanel serves a single page that drives a remote audio-model
//! training workflow on managed cloud jobs. Every action delegates to the
//! `gsutil`, `gcloud` and `tensorboard` CLIs.
//!
//! ## Workflow
//!
//! - **Upload**: `.wav`/`.mp3` files are saved locally and copied to a bucket
//! - **Preprocess**: a container job turns the audio into TFRecords
//! - **Train**: a GPU container job trains on the preprocessed data
//! - **Monitor**: job state polling and a TensorBoard link
//! - **Download**: the trained model as a tar archive
//! - **Clean up**: delete the bucket
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use trainpanel::cloud::{GcloudClient, SystemRunner, TensorboardDashboard};
//! use trainpanel::config::PanelConfig;
//! use trainpanel::web::PanelServer;
//!
//! # async fn run() -> trainpanel::Result<()> {
//! let config = PanelConfig::default();
//! config.ensure_dirs()?;
//!
//! let runner = Arc::new(SystemRunner);
//! let client = Arc::new(GcloudClient::from_config(&config, runner.clone()));
//! let dashboard = Arc::new(TensorboardDashboard::from_config(&config, runner));
//!
//! PanelServer::new(config, client, dashboard).run().await
//! # }
//! ```

#![warn(clippy::all)]

pub mod cloud;
pub mod config;
pub mod error;
pub mod web;

// Re-export commonly used types
pub use cloud::{Dashboard, JobClient, JobState};
pub use config::{CliArgs, PanelConfig};
pub use error::{PanelError, Result};
pub use web::PanelServer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
