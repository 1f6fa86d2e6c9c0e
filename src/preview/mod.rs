//! Preview mode: token resolution and the preview session cookie

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use percent_encoding::percent_decode_str;
use serde_json::{json, Value};

use crate::cms::Cms;
use crate::helpers::{encode_query, html_escape, js_string, post_path};

/// Cookie holding the preview ref while preview mode is on
pub const PREVIEW_COOKIE: &str = "preview_ref";

/// Maps a CMS document to its path on this site
#[derive(Debug, Clone)]
pub struct LinkResolver {
    post_type: String,
}

impl LinkResolver {
    pub fn new(post_type: impl Into<String>) -> Self {
        Self {
            post_type: post_type.into(),
        }
    }

    /// `/post/{uid}` for posts, `/` for anything else
    pub fn resolve(&self, document: &Value) -> String {
        let doc_type = document.get("type").and_then(Value::as_str);
        let uid = document.get("uid").and_then(Value::as_str);
        match (doc_type, uid) {
            (Some(t), Some(uid)) if t == self.post_type && !uid.is_empty() => post_path(uid),
            _ => "/".to_string(),
        }
    }
}

/// Where the serving layer keeps preview state between requests
pub trait PreviewSession {
    fn start_preview(&mut self, reference: &str);
    fn end_preview(&mut self);
}

/// [`PreviewSession`] backed by a cookie; collects `Set-Cookie` headers
#[derive(Debug, Default)]
pub struct CookieSession {
    headers: HeaderMap,
    /// Mark the cookie `Secure` (site served over https)
    secure: bool,
}

impl CookieSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Headers to attach to the response
    pub fn into_headers(self) -> HeaderMap {
        self.headers
    }

    fn set_cookie(&mut self, mut value: String) {
        if self.secure {
            value.push_str("; Secure");
        }
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                self.headers.append(header::SET_COOKIE, value);
            }
            Err(err) => tracing::warn!(error = %err, "invalid preview cookie"),
        }
    }
}

impl PreviewSession for CookieSession {
    fn start_preview(&mut self, reference: &str) {
        self.set_cookie(format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            PREVIEW_COOKIE,
            encode_query(reference)
        ));
    }

    fn end_preview(&mut self) {
        self.set_cookie(format!(
            "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax",
            PREVIEW_COOKIE
        ));
    }
}

/// Read the preview ref from the request cookies
pub fn preview_ref(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == PREVIEW_COOKIE)
        .map(|(_, value)| percent_decode_str(value).decode_utf8_lossy().into_owned())
        .filter(|value| !value.is_empty())
}

/// Result of a preview request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// Token accepted; send the browser to this path
    Redirect(String),
    /// Token did not resolve to a document
    Rejected,
}

/// Validate a preview token and start a preview session on success.
///
/// CMS errors are logged and treated as a rejection.
pub async fn resolve_preview(
    cms: &dyn Cms,
    resolver: &LinkResolver,
    session: &mut impl PreviewSession,
    token: &str,
    document_id: &str,
) -> PreviewOutcome {
    match cms.resolve_preview(token, document_id, resolver).await {
        Ok(Some(path)) if !path.is_empty() => {
            session.start_preview(token);
            tracing::info!(document_id = %document_id, path = %path, "preview session started");
            PreviewOutcome::Redirect(path)
        }
        Ok(_) => {
            tracing::warn!(document_id = %document_id, "preview token did not resolve");
            PreviewOutcome::Rejected
        }
        Err(err) => {
            tracing::warn!(document_id = %document_id, error = %err, "preview resolution failed");
            PreviewOutcome::Rejected
        }
    }
}

/// HTML document that sends the browser to `path`
pub fn redirect_document(path: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta http-equiv=\"Refresh\" content=\"0; url={}\" />\n\
         <script>window.location.href = {}</script>\n\
         </head></html>",
        html_escape(path),
        js_string(path)
    )
}

impl IntoResponse for PreviewOutcome {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(path) => (StatusCode::OK, Html(redirect_document(&path))).into_response(),
            Self::Rejected => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Invalid token" })),
            )
                .into_response(),
        }
    }
}
