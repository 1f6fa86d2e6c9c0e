//! Rendered page cache with time-based revalidation
//!
//! Pages are rendered on first request and served from memory afterwards.
//! Once an entry is older than its revalidation window the next request
//! renders it again; if that render fails the stale page keeps being served.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

/// A rendered page and when it was rendered
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub html: String,
    pub rendered_at: DateTime<Utc>,
}

impl CachedPage {
    /// Whether the page is still within its revalidation window.
    ///
    /// `None` means the page never goes stale.
    pub fn is_fresh(&self, revalidate: Option<Duration>, now: DateTime<Utc>) -> bool {
        let Some(window) = revalidate else {
            return true;
        };
        match (now - self.rendered_at).to_std() {
            Ok(age) => age < window,
            // rendered "in the future": clock moved backwards
            Err(_) => true,
        }
    }
}

/// In-memory cache of rendered pages keyed by request path
#[derive(Debug, Default)]
pub struct PageCache {
    entries: RwLock<HashMap<String, CachedPage>>,
    /// Held while a path renders, so concurrent misses render it once
    rendering: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, path: &str) -> Option<CachedPage> {
        self.entries.read().await.get(path).cloned()
    }

    pub async fn insert(&self, path: &str, html: String) {
        let page = CachedPage {
            html,
            rendered_at: Utc::now(),
        };
        self.entries.write().await.insert(path.to_string(), page);
    }

    pub async fn remove(&self, path: &str) -> Option<CachedPage> {
        self.entries.write().await.remove(path)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn render_lock(&self, path: &str) -> Arc<Mutex<()>> {
        self.rendering
            .lock()
            .await
            .entry(path.to_string())
            .or_default()
            .clone()
    }

    /// Serve `path` from the cache, rendering it when missing or stale.
    ///
    /// `render` returns `Ok(None)` when the page does not exist; nothing is
    /// cached then and a stale copy is dropped. A failed render of a stale
    /// page serves the stale copy; a failed first render is returned.
    /// Requests for a path that is already rendering wait for that render.
    pub async fn get_or_render<F, Fut, E>(
        &self,
        path: &str,
        revalidate: Option<Duration>,
        render: F,
    ) -> Result<Option<String>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<String>, E>>,
        E: Display,
    {
        if let Some(page) = self.get(path).await {
            if page.is_fresh(revalidate, Utc::now()) {
                tracing::debug!(path = %path, "page cache hit");
                return Ok(Some(page.html));
            }
        }

        let lock = self.render_lock(path).await;
        let _rendering = lock.lock().await;

        // another request may have rendered it while this one waited
        let cached = self.get(path).await;
        if let Some(page) = &cached {
            if page.is_fresh(revalidate, Utc::now()) {
                tracing::debug!(path = %path, "page rendered by a concurrent request");
                return Ok(Some(page.html.clone()));
            }
            tracing::debug!(path = %path, "page stale, revalidating");
        } else {
            tracing::debug!(path = %path, "page cache miss, rendering");
        }

        match render().await {
            Ok(Some(html)) => {
                self.insert(path, html.clone()).await;
                Ok(Some(html))
            }
            Ok(None) => {
                if self.remove(path).await.is_some() {
                    tracing::info!(path = %path, "page no longer exists, dropped from cache");
                }
                Ok(None)
            }
            Err(err) => match cached {
                Some(page) => {
                    tracing::warn!(path = %path, error = %err, "revalidation failed, serving stale page");
                    Ok(Some(page.html))
                }
                None => Err(err),
            },
        }
    }
}
