//! Error types for page rendering and the HTTP handlers.
//!
//! Errors are rendered as small HTML pages since the site is user-facing.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};

use crate::cms::CmsError;
use crate::helpers::{html_escape, DateError};

/// Site error type
#[derive(Debug, thiserror::Error)]
pub enum SiteError {
    /// No post with this uid
    #[error("not found: {0}")]
    NotFound(String),

    /// The request itself is malformed (e.g. a foreign pagination cursor)
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("cms error: {0}")]
    Cms(#[from] CmsError),

    /// A CMS date could not be parsed; the content is broken upstream
    #[error("date error: {0}")]
    Date(#[from] DateError),

    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

impl IntoResponse for SiteError {
    fn into_response(self) -> Response {
        let (status, title, message) = match &self {
            Self::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "Not Found",
                format!("Nothing here: {}", what),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad Request", msg.clone()),
            Self::Cms(CmsError::InvalidCursor(cursor)) => (
                StatusCode::BAD_REQUEST,
                "Bad Request",
                format!("Invalid page cursor: {}", cursor),
            ),
            Self::Cms(err) => {
                tracing::error!(error = %err, "cms error");
                (
                    StatusCode::BAD_GATEWAY,
                    "Service Unavailable",
                    "The content service is unavailable. Please try again later.".to_string(),
                )
            }
            Self::Date(err) => {
                tracing::error!(error = %err, "broken date in content");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Error",
                    "An internal error occurred.".to_string(),
                )
            }
            Self::Template(err) => {
                tracing::error!(error = ?err, "template error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Error",
                    "An internal error occurred.".to_string(),
                )
            }
        };

        let page = format!(
            "<!DOCTYPE html><html lang=\"pt-BR\"><head><meta charset=\"utf-8\">\
             <title>{title} | spacetraveling</title></head>\
             <body><main class=\"error-page\"><h1>{title}</h1><p>{message}</p>\
             <a href=\"/\">Voltar para o início</a></main></body></html>",
            title = title,
            message = html_escape(&message)
        );

        (status, Html(page)).into_response()
    }
}
