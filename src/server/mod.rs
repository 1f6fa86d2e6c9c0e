//! HTTP server: listing and post pages, "load more" and preview endpoints

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::PageCache;
use crate::error::SiteError;
use crate::generator::PageBuilder;
use crate::helpers::post_path;
use crate::preview::{preview_ref, resolve_preview, CookieSession, LinkResolver, PreviewSession};
use crate::templates::PostsPage;
use crate::Site;

/// Preview pages must never be stored by a shared cache
const PREVIEW_CACHE_CONTROL: &str = "private, no-cache, no-store, max-age=0, must-revalidate";

/// Server state
#[derive(Clone)]
pub struct AppState {
    pages: Arc<PageBuilder>,
    cache: Arc<PageCache>,
    resolver: LinkResolver,
    secure_cookies: bool,
}

impl AppState {
    pub fn new(pages: PageBuilder) -> Self {
        let resolver = LinkResolver::new(pages.config().post_type.clone());
        let secure_cookies = pages.config().secure_cookies;
        Self {
            pages: Arc::new(pages),
            cache: Arc::new(PageCache::new()),
            resolver,
            secure_cookies,
        }
    }

    fn session(&self) -> CookieSession {
        CookieSession::new().secure(self.secure_cookies)
    }
}

/// Build the router
pub fn router(state: AppState, static_dir: impl Into<PathBuf>) -> Router {
    Router::new()
        .route("/", get(home_handler))
        .route("/post/:slug", get(post_handler))
        .route("/api/posts", get(posts_handler))
        .route("/api/preview", get(preview_handler))
        .route("/api/exit-preview", get(exit_preview_handler))
        .fallback_service(ServeDir::new(static_dir.into()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server
pub async fn start(site: &Site, ip: &str, port: u16, open: bool) -> Result<()> {
    let state = AppState::new(site.page_builder()?);

    let built = prebuild(&state).await;
    tracing::info!(pages = built, "prebuilt pages");

    let app = router(state, &site.static_dir);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    // Open browser if requested
    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Render the listing and the posts on its first page into the cache.
///
/// Failures are logged; those pages are rendered on first request instead.
async fn prebuild(state: &AppState) -> usize {
    let mut built = 0;

    match state.pages.home(None).await {
        Ok(html) => {
            state.cache.insert("/", html).await;
            built += 1;
        }
        Err(err) => tracing::warn!(error = %err, "failed to prebuild the listing"),
    }

    let uids = match state.pages.prebuilt_uids().await {
        Ok(uids) => uids,
        Err(err) => {
            tracing::warn!(error = %err, "failed to list posts to prebuild");
            return built;
        }
    };

    for uid in uids {
        match state.pages.post(&uid, None).await {
            Ok(Some(html)) => {
                state.cache.insert(&post_path(&uid), html).await;
                built += 1;
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(uid = %uid, error = %err, "failed to prebuild post"),
        }
    }

    built
}

async fn home_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, SiteError> {
    if let Some(reference) = preview_ref(&headers) {
        let html = state.pages.home(Some(&reference)).await?;
        return Ok(html_response(html, PREVIEW_CACHE_CONTROL));
    }

    let revalidate = state.pages.config().index_revalidate();
    let pages = state.pages.clone();
    let html = state
        .cache
        .get_or_render("/", revalidate, || async move { pages.home(None).await.map(Some) })
        .await?
        .ok_or_else(|| SiteError::NotFound("/".to_string()))?;

    Ok(html_response(html, &cache_control(revalidate)))
}

async fn post_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Response, SiteError> {
    let path = post_path(&slug);

    if let Some(reference) = preview_ref(&headers) {
        let html = state
            .pages
            .post(&slug, Some(&reference))
            .await?
            .ok_or(SiteError::NotFound(path))?;
        return Ok(html_response(html, PREVIEW_CACHE_CONTROL));
    }

    let revalidate = Some(state.pages.config().revalidate());
    let pages = state.pages.clone();
    let uid = slug.clone();
    let html = state
        .cache
        .get_or_render(&path, revalidate, || async move { pages.post(&uid, None).await })
        .await?
        .ok_or(SiteError::NotFound(path))?;

    Ok(html_response(html, &cache_control(revalidate)))
}

#[derive(Debug, Deserialize)]
struct PostsParams {
    page: Option<String>,
}

async fn posts_handler(
    State(state): State<AppState>,
    Query(params): Query<PostsParams>,
) -> Result<Json<PostsPage>, SiteError> {
    let cursor = params
        .page
        .filter(|page| !page.is_empty())
        .ok_or_else(|| SiteError::BadRequest("missing page cursor".to_string()))?;

    Ok(Json(state.pages.next_page(&cursor).await?))
}

#[derive(Debug, Deserialize)]
struct PreviewParams {
    #[serde(default)]
    token: String,
    #[serde(default, rename = "documentId")]
    document_id: String,
}

async fn preview_handler(
    State(state): State<AppState>,
    Query(params): Query<PreviewParams>,
) -> Response {
    let mut session = state.session();
    let outcome = resolve_preview(
        state.pages.cms().as_ref(),
        &state.resolver,
        &mut session,
        &params.token,
        &params.document_id,
    )
    .await;

    (session.into_headers(), outcome).into_response()
}

async fn exit_preview_handler(State(state): State<AppState>) -> Response {
    let mut session = state.session();
    session.end_preview();
    tracing::info!("preview session ended");
    (session.into_headers(), Redirect::temporary("/")).into_response()
}

/// `Cache-Control` for a page regenerated every `revalidate`
fn cache_control(revalidate: Option<Duration>) -> String {
    match revalidate {
        Some(window) => format!(
            "public, s-maxage={}, stale-while-revalidate",
            window.as_secs()
        ),
        None => "public, s-maxage=31536000, stale-while-revalidate".to_string(),
    }
}

fn html_response(html: String, cache_control: &str) -> Response {
    let mut response = Html(html).into_response();
    if let Ok(value) = HeaderValue::from_str(cache_control) {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    response
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}
