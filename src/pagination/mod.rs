//! Listing pagination: cursor state and "load more"

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::cms::Cms;
use crate::content::adapter;
use crate::content::{Post, PostPagination};

impl PostPagination {
    /// Append a freshly fetched page and take over its cursor
    pub fn apply_page(mut self, page: PostPagination) -> Self {
        self.results.extend(page.results);
        self.next_page = page.next_page;
        self
    }

    /// Whether another page can be fetched
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }
}

/// Outcome of [`Paginator::load_more`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// This many posts were appended
    Appended(usize),
    /// No cursor left; nothing fetched
    Exhausted,
    /// Another fetch is still running; nothing fetched
    InFlight,
    /// The fetch failed; state unchanged
    Failed,
}

/// Holds the posts loaded so far and fetches the next page on demand
pub struct Paginator {
    cms: Arc<dyn Cms>,
    state: Mutex<PostPagination>,
    loading: AtomicBool,
}

/// Clears the in-flight flag when the fetch ends, however it ends
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Paginator {
    /// Start from an already fetched first page
    pub fn new(cms: Arc<dyn Cms>, first_page: PostPagination) -> Self {
        Self {
            cms,
            state: Mutex::new(first_page),
            loading: AtomicBool::new(false),
        }
    }

    /// Fetch the page at the current cursor and append it.
    ///
    /// Overlapping calls are rejected with [`LoadMore::InFlight`]. A failed
    /// fetch is logged and leaves the posts and the cursor untouched so the
    /// caller can retry.
    pub async fn load_more(&self) -> LoadMore {
        if self
            .loading
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            tracing::debug!("load more ignored, request in flight");
            return LoadMore::InFlight;
        }
        let _guard = LoadingGuard(&self.loading);

        let Some(cursor) = self.state.lock().await.next_page.clone() else {
            return LoadMore::Exhausted;
        };

        let page = match self.cms.fetch_page(&cursor).await {
            Ok(response) => adapter::to_pagination(&response),
            Err(err) => {
                tracing::error!(error = %err, cursor = %cursor, "failed to load more posts");
                return LoadMore::Failed;
            }
        };

        let appended = page.results.len();
        let mut state = self.state.lock().await;
        *state = std::mem::take(&mut *state).apply_page(page);
        tracing::debug!(
            appended,
            total = state.results.len(),
            has_more = state.has_more(),
            "loaded more posts"
        );

        LoadMore::Appended(appended)
    }

    /// Keep loading until the cursor runs out.
    ///
    /// Stops at the first failure and returns how many pages were fetched.
    pub async fn load_all(&self) -> Result<usize, LoadMore> {
        let mut pages = 0;
        loop {
            match self.load_more().await {
                LoadMore::Appended(_) => pages += 1,
                LoadMore::Exhausted => return Ok(pages),
                other => return Err(other),
            }
        }
    }

    /// Current state
    pub async fn snapshot(&self) -> PostPagination {
        self.state.lock().await.clone()
    }

    /// Posts loaded so far
    pub async fn posts(&self) -> Vec<Post> {
        self.state.lock().await.results.clone()
    }

    /// Consume the paginator, returning its state
    pub fn into_inner(self) -> PostPagination {
        self.state.into_inner()
    }
}
