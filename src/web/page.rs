//! The control panel page
//!
//! A single HTML page with one form per action. Every route re-renders it
//! with an optional status message or dashboard link.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::cloud::TrainingParams;
use crate::error::PanelError;

/// Render state for the page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub message: Option<String>,
    pub link: Option<String>,
}

impl Page {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            link: None,
        }
    }

    pub fn link(link: impl Into<String>) -> Self {
        Self {
            message: None,
            link: Some(link.into()),
        }
    }

    /// Render the full page
    pub fn render(&self) -> String {
        let defaults = TrainingParams::default();

        let message = self
            .message
            .as_deref()
            .map(|m| format!(r#"<p class="message">{}</p>"#, escape(m)))
            .unwrap_or_default();

        let link = self
            .link
            .as_deref()
            .map(|l| {
                let l = escape(l);
                format!(
                    r#"<p class="link">TensorBoard: <a href="{l}" target="_blank" rel="noopener">{l}</a></p>"#
                )
            })
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Train Panel</title>
<style>
body {{ font-family: sans-serif; max-width: 44rem; margin: 2rem auto; }}
form {{ margin: 1rem 0; padding: 1rem; border: 1px solid #ccc; border-radius: 4px; }}
label {{ display: block; margin: .25rem 0; }}
.message {{ padding: .75rem; background: #eef; }}
.link {{ padding: .75rem; background: #efe; }}
</style>
</head>
<body>
<h1>Train Panel</h1>
{message}{link}
<form action="/upload" method="post" enctype="multipart/form-data">
<h2>1. Upload audio</h2>
<input type="file" name="file" accept=".wav,.mp3" multiple>
<button type="submit">Upload</button>
</form>
<form action="/preprocess" method="post">
<h2>2. Preprocess</h2>
<button type="submit">Run preprocessing</button>
</form>
<form action="/submit" method="post">
<h2>3. Train</h2>
<label>Batch size <input type="number" name="batch_size" min="1" value="{batch_size}"></label>
<label>Learning rate <input type="text" name="learning_rate" value="{learning_rate}"></label>
<label>Training steps <input type="number" name="num_steps" min="1" value="{num_steps}"></label>
<label>Steps per summary <input type="number" name="steps_per_summary" min="1" value="{steps_per_summary}"></label>
<label>Steps per save <input type="number" name="steps_per_save" min="1" value="{steps_per_save}"></label>
<label>Early stop loss <input type="text" name="early_stop_loss_value" value="{early_stop}"></label>
<button type="submit">Start training</button>
</form>
<form action="/check_status" method="post"><button type="submit">Check status</button></form>
<form action="/tensorboard" method="post"><button type="submit">Enable TensorBoard</button></form>
<form action="/download" method="post"><button type="submit">Download model</button></form>
<form action="/delete_bucket" method="post"><button type="submit">Delete bucket</button></form>
</body>
</html>
"#,
            batch_size = defaults.batch_size,
            learning_rate = defaults.learning_rate,
            num_steps = defaults.num_steps,
            steps_per_summary = defaults.steps_per_summary,
            steps_per_save = defaults.steps_per_save,
            early_stop = defaults.early_stop_loss_value,
        )
    }
}

impl IntoResponse for Page {
    fn into_response(self) -> Response {
        Html(self.render()).into_response()
    }
}

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::info!(error = %self, "request rejected");
        }

        (status, Page::message(self.to_string())).into_response()
    }
}

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
