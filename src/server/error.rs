//! Error types and response handling for the HTML routes.
//!
//! Errors render as an HTML fragment rather than JSON so htmx can swap
//! them into the page like any other response.

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use minijinja::HtmlEscape;
use thiserror::Error;

use crate::render::TemplateError;
use crate::upstream::UpstreamError;

/// Errors a route handler can return.
#[derive(Debug, Error)]
pub enum AppError {
    /// Well-formed request carrying an unusable value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Path named something that does not exist
    #[error("{what} not found")]
    NotFound { what: String },

    /// Template failed to load or render
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Language-model service unreachable
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),
}

impl AppError {
    /// Map error variant to appropriate HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short machine-readable name, exposed as `data-error-type`
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "invalid_input",
            AppError::NotFound { .. } => "not_found",
            AppError::Template(_) => "template_error",
            AppError::Upstream(_) => "upstream_error",
        }
    }
}

/// Builder for error fragments.
pub struct ErrorResponse;

impl ErrorResponse {
    pub fn fragment(err: &AppError) -> String {
        format!(
            r#"<div class="error" role="alert" data-error-type="{}">{}</div>"#,
            err.error_type(),
            HtmlEscape(&err.to_string())
        )
    }

    pub fn from_error(err: &AppError) -> Response {
        let status = err.status_code();
        if status.is_server_error() {
            tracing::error!(error_type = err.error_type(), "{}", err);
        } else {
            tracing::debug!(error_type = err.error_type(), "{}", err);
        }

        (
            status,
            [(CONTENT_TYPE, "text/html; charset=utf-8")],
            Self::fragment(err),
        )
            .into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        ErrorResponse::from_error(&self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_status_code() {
        let err = AppError::NotFound {
            what: "Bird 9".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_type(), "not_found");
    }

    #[test]
    fn upstream_failure_is_bad_gateway() {
        let err = AppError::Upstream(UpstreamError::Body("reset".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn fragment_escapes_message() {
        let err = AppError::InvalidInput("<b>bad</b>".to_string());
        let html = ErrorResponse::fragment(&err);
        assert!(html.starts_with(r#"<div class="error""#));
        assert!(html.contains("&lt;b&gt;bad&lt;&#x2f;b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn error_response_is_html() {
        let err = AppError::InvalidInput("name must not be empty".to_string());
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
    }
}
