//! Per-browser sessions
//!
//! Each browser gets a cookie-identified session holding its own
//! preprocessing and training job ids, so concurrent users never overwrite
//! each other's jobs.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::RwLock;
use uuid::Uuid;

/// Session cookie name
pub const SESSION_COOKIE: &str = "trainpanel_session";

/// Job ids tracked for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionJobs {
    /// Last preprocessing job started from this session
    pub preprocessing_job: Option<String>,
    /// Last training job started from this session
    pub training_job: Option<String>,
}

/// In-memory session table
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionJobs>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs for a session (empty if unknown)
    pub fn get(&self, id: &str) -> SessionJobs {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions.get(id).cloned().unwrap_or_default()
    }

    /// Record a newly started preprocessing job
    pub fn set_preprocessing_job(&self, id: &str, job: String) {
        self.update(id, |jobs| jobs.preprocessing_job = Some(job));
    }

    /// Record a newly started training job
    pub fn set_training_job(&self, id: &str, job: String) {
        self.update(id, |jobs| jobs.training_job = Some(job));
    }

    /// Number of sessions with recorded jobs
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no session has recorded jobs
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update(&self, id: &str, f: impl FnOnce(&mut SessionJobs)) {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        f(sessions.entry(id.to_string()).or_default());
    }
}

/// Session of the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Session id carried in the cookie
    pub id: String,
    /// Whether the cookie has to be set on the response
    pub is_new: bool,
}

impl Session {
    /// Resolve the session from request headers, minting a new id if the
    /// cookie is missing or malformed
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match cookie_value(headers, SESSION_COOKIE) {
            Some(id) if Uuid::parse_str(&id).is_ok() => Self { id, is_new: false },
            _ => Self {
                id: Uuid::new_v4().to_string(),
                is_new: true,
            },
        }
    }

    /// Attach the session cookie to a response when the session is new
    pub fn respond(&self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if self.is_new {
            let cookie = format!(
                "{}={}; Path=/; HttpOnly; SameSite=Lax",
                SESSION_COOKIE, self.id
            );
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }
        response
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Value of a named cookie across all `Cookie` headers
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_existing_session_cookie() {
        let id = Uuid::new_v4().to_string();
        let session = Session::from_headers(&headers(&format!(
            "theme=dark; {}={}",
            SESSION_COOKIE, id
        )));
        assert_eq!(session, Session { id, is_new: false });
    }

    #[test]
    fn test_missing_or_malformed_cookie_mints_new_session() {
        let session = Session::from_headers(&HeaderMap::new());
        assert!(session.is_new);

        let session = Session::from_headers(&headers(&format!("{}=../../etc", SESSION_COOKIE)));
        assert!(session.is_new);
        assert!(Uuid::parse_str(&session.id).is_ok());
    }

    #[test]
    fn test_respond_sets_cookie_only_for_new_sessions() {
        let fresh = Session::from_headers(&HeaderMap::new());
        let response = fresh.respond("ok");
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with(&format!("{}={}", SESSION_COOKIE, fresh.id)));

        let known = Session { id: fresh.id.clone(), is_new: false };
        assert!(known.respond("ok").headers().get(SET_COOKIE).is_none());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        store.set_training_job("a", "job_a".to_string());
        store.set_preprocessing_job("b", "prep_b".to_string());

        assert_eq!(store.get("a").training_job.as_deref(), Some("job_a"));
        assert_eq!(store.get("a").preprocessing_job, None);
        assert_eq!(store.get("b").training_job, None);
        assert_eq!(store.get("unknown"), SessionJobs::default());
        assert_eq!(store.len(), 2);
    }
}
