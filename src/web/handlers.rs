//! Route handlers
//!
//! Each handler validates input, calls the job client, maps the outcome to
//! a message and re-renders the page.

use axum::extract::{Multipart, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::Response;
use axum::Form;
use std::sync::Arc;

use super::messages;
use super::page::Page;
use super::session::Session;
use super::upload;
use super::AppState;
use crate::cloud::{dashboard_link, JobState, TrainingForm, TrainingParams, MODEL_ARCHIVE};
use crate::error::{IoResultExt, Result};

/// GET /
pub async fn index(session: Session) -> Response {
    session.respond(Page::default())
}

/// GET /health
pub async fn health() -> &'static str {
    "OK"
}

/// POST /upload
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Response> {
    let config = &state.config;

    let files = upload::read_files(&mut multipart).await?;
    upload::validate(&files, config)?;

    let uploads_dir = config.uploads_dir();
    let saved = upload::persist(&files, &uploads_dir).await?;
    tracing::info!(count = saved.len(), dir = %uploads_dir.display(), "files saved");

    state.client.create_bucket(&config.bucket, &config.region).await?;
    state.client.upload_blob(&config.bucket, &uploads_dir).await?;

    Ok(session.respond(Page::message(messages::uploaded(saved.len(), &config.bucket))))
}

/// POST /preprocess
pub async fn preprocess(State(state): State<Arc<AppState>>, session: Session) -> Response {
    let config = &state.config;

    let message = match state
        .client
        .run_preprocessing(&config.bucket, &config.region)
        .await
    {
        Ok(job) => {
            tracing::info!(session = %session.id, job = %job, "preprocessing started");
            state.sessions.set_preprocessing_job(&session.id, job);
            messages::PREPROCESSING_STARTED
        }
        Err(err) => {
            tracing::info!(session = %session.id, outcome = %err, "preprocessing not started");
            messages::preprocess_error(err)
        }
    };

    session.respond(Page::message(message))
}

/// POST /submit
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    session: Session,
    Form(form): Form<TrainingForm>,
) -> Result<Response> {
    let config = &state.config;
    let params = TrainingParams::from_form(&form)?;
    let jobs = state.sessions.get(&session.id);

    let message = match state
        .client
        .submit_job(
            &params,
            &config.bucket,
            &config.region,
            jobs.preprocessing_job.as_deref(),
        )
        .await
    {
        Ok(job) => {
            tracing::info!(session = %session.id, job = %job, ?params, "training started");
            state.sessions.set_training_job(&session.id, job);
            messages::TRAINING_STARTED
        }
        Err(err) => {
            tracing::info!(session = %session.id, outcome = %err, "training not started");
            messages::submit_error(err)
        }
    };

    Ok(session.respond(Page::message(message)))
}

/// POST /check_status
pub async fn check_status(State(state): State<Arc<AppState>>, session: Session) -> Response {
    let page = match training_state(&state, &session).await {
        Some(job_state) => Page::message(messages::job_status(&job_state)),
        None => Page::message(messages::NO_TRAINING_JOB),
    };
    session.respond(page)
}

/// POST /download
pub async fn download_model(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Response> {
    let job_state = match training_state(&state, &session).await {
        Some(job_state) => job_state,
        None => return Ok(session.respond(Page::message(messages::NO_TRAINING_JOB))),
    };

    if job_state != JobState::Succeeded {
        return Ok(session.respond(Page::message(messages::job_status(&job_state))));
    }

    let config = &state.config;
    let archive = state
        .client
        .get_model(&config.bucket, &config.downloads_dir(), &config.instance_dir)
        .await?;
    let body = tokio::fs::read(&archive).await.with_path(&archive)?;
    tracing::info!(archive = %archive.display(), bytes = body.len(), "serving model");

    let headers = [
        (CONTENT_TYPE, "application/x-tar".to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", MODEL_ARCHIVE),
        ),
    ];
    Ok(session.respond((headers, body)))
}

/// POST /delete_bucket
pub async fn delete_bucket(State(state): State<Arc<AppState>>, session: Session) -> Response {
    let message = match state.client.delete_bucket(&state.config.bucket).await {
        Ok(()) => messages::BUCKET_DELETED,
        Err(err) => messages::delete_error(err),
    };
    session.respond(Page::message(message))
}

/// POST /tensorboard
pub async fn enable_tensorboard(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Response> {
    let job_state = match training_state(&state, &session).await {
        Some(job_state) => job_state,
        None => return Ok(session.respond(Page::message(messages::NO_TRAINING_JOB))),
    };

    if job_state != JobState::Running {
        return Ok(session.respond(Page::message(messages::job_status(&job_state))));
    }

    let config = &state.config;
    state
        .dashboard
        .launch(&config.model_logdir(), config.tensorboard_port)
        .await?;
    let host = state.dashboard.public_address().await?;
    let link = dashboard_link(&host, config.tensorboard_port);
    tracing::info!(link = %link, "dashboard enabled");

    Ok(session.respond(Page::link(link)))
}

/// State of this session's training job; `None` if there is none or the
/// remote side does not know it
async fn training_state(state: &AppState, session: &Session) -> Option<JobState> {
    let job = state.sessions.get(&session.id).training_job?;
    match state.client.check_job_status(&job).await {
        JobState::NotFound => None,
        job_state => Some(job_state),
    }
}
