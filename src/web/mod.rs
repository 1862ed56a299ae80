//! TrainPanel web layer
//!
//! HTTP control surface for the training workflow.
//!
//! ## Routes
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/` | GET | Control panel page |
//! | `/health` | GET | Liveness check |
//! | `/upload` | POST | Upload `.wav`/`.mp3` files to the bucket |
//! | `/preprocess` | POST | Start the preprocessing job |
//! | `/submit` | POST | Start the training job |
//! | `/check_status` | POST | Show training job state |
//! | `/download` | POST | Download the trained model archive |
//! | `/delete_bucket` | POST | Delete the bucket |
//! | `/tensorboard` | POST | Start TensorBoard and link to it |

mod handlers;
mod messages;
mod page;
mod server;
mod session;
mod upload;

pub use handlers::*;
pub use page::{escape, Page};
pub use server::*;
pub use session::{Session, SessionJobs, SessionStore, SESSION_COOKIE};
pub use upload::{secure_filename, UploadedFile};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::cloud::{Dashboard, JobClient};
use crate::config::PanelConfig;

/// State shared by all handlers
pub struct AppState {
    /// Resolved configuration
    pub config: PanelConfig,
    /// Storage and job operations
    pub client: Arc<dyn JobClient>,
    /// Monitoring dashboard
    pub dashboard: Arc<dyn Dashboard>,
    /// Per-browser job ids
    pub sessions: SessionStore,
}

impl AppState {
    /// Create state with an empty session table
    pub fn new(
        config: PanelConfig,
        client: Arc<dyn JobClient>,
        dashboard: Arc<dyn Dashboard>,
    ) -> Self {
        Self {
            config,
            client,
            dashboard,
            sessions: SessionStore::new(),
        }
    }
}

/// Build the router for all panel routes
pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route(
            "/upload",
            post(upload_files).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/preprocess", post(preprocess))
        .route("/submit", post(submit_job))
        .route("/check_status", post(check_status))
        .route("/download", post(download_model))
        .route("/delete_bucket", post(delete_bucket))
        .route("/tensorboard", post(enable_tensorboard))
        .with_state(state)
}
