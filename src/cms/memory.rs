//! In-memory [`Cms`] used by the unit tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use super::{public_cursor, Cms, CmsError, Predicate, Query, SearchResponse, ORDER_BY_DATE_ASC};

const CURSOR_PREFIX: &str = "https://memory.cms/api/v2/documents/search?cursor=";

/// Documents held in CMS order (newest first), plus failure injection
#[derive(Default)]
pub struct MemoryCms {
    documents: Vec<Value>,
    /// Preview refs mapped to draft documents visible under them
    drafts: HashMap<String, Vec<Value>>,
    cursors: Mutex<HashMap<String, (Query, usize)>>,
    /// Echoed into every cursor, the way a private repository does
    access_token: Option<String>,
    failures: AtomicUsize,
    calls: AtomicUsize,
    held: AtomicBool,
    release: Notify,
}

impl MemoryCms {
    pub fn new(documents: Vec<Value>) -> Self {
        Self {
            documents,
            ..Default::default()
        }
    }

    /// Make a draft document visible under a preview ref
    pub fn with_draft(mut self, reference: &str, document: Value) -> Self {
        self.drafts
            .entry(reference.to_string())
            .or_default()
            .push(document);
        self
    }

    /// Echo an access token into the `next_page` cursors
    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    /// Fail the next `n` calls
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Block cursor fetches until [`MemoryCms::release`] is called
    pub fn hold(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    /// Number of calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self) -> Result<(), CmsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(CmsError::Status {
                status: 503,
                url: "memory".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn run(&self, query: &Query, page: usize) -> SearchResponse {
        let mut matching: Vec<Value> = match &query.reference {
            Some(reference) => self.drafts.get(reference).cloned().unwrap_or_default(),
            None => self.documents.clone(),
        };
        matching.retain(|doc| query.predicates.iter().all(|p| matches(p, doc)));

        match query.orderings.as_deref() {
            Some(ORDER_BY_DATE_ASC) => matching.sort_by_key(|d| publication_date(d)),
            Some(_) => matching.sort_by_key(|d| std::cmp::Reverse(publication_date(d))),
            None => {}
        }

        if let Some(after) = &query.after {
            if let Some(pos) = matching.iter().position(|d| d["id"] == json!(after)) {
                matching.drain(..=pos);
            }
        }

        let page_size = query.page_size.unwrap_or(20).max(1);
        let total = matching.len();
        let total_pages = total.div_ceil(page_size);
        let results: Vec<Value> = matching
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        let next_page = (page < total_pages).then(|| {
            let mut cursors = self.cursors.lock().unwrap();
            let cursor = format!("{}{}", CURSOR_PREFIX, cursors.len());
            cursors.insert(cursor.clone(), (query.clone(), page + 1));
            match &self.access_token {
                Some(token) => format!("{}&access_token={}", cursor, token),
                None => cursor,
            }
        });

        SearchResponse {
            page: page as u64,
            results_per_page: page_size as u64,
            total_results_size: total as u64,
            total_pages: total_pages as u64,
            results,
            next_page,
            prev_page: None,
        }
    }
}

#[async_trait]
impl Cms for MemoryCms {
    async fn query(&self, query: &Query) -> Result<SearchResponse, CmsError> {
        self.check_failure()?;
        Ok(self.run(query, 1))
    }

    async fn fetch_page(&self, cursor: &str) -> Result<SearchResponse, CmsError> {
        if self.held.load(Ordering::SeqCst) {
            let released = self.release.notified();
            if self.held.load(Ordering::SeqCst) {
                released.await;
            }
        }

        self.check_failure()?;
        let (query, page) = self
            .cursors
            .lock()
            .unwrap()
            .get(&public_cursor(cursor))
            .cloned()
            .ok_or_else(|| CmsError::InvalidCursor(cursor.to_string()))?;
        Ok(self.run(&query, page))
    }
}

fn matches(predicate: &Predicate, doc: &Value) -> bool {
    let Predicate::At { path, value } = predicate;
    match path.as_str() {
        "document.type" => doc["type"] == json!(value),
        "document.id" => doc["id"] == json!(value),
        other => match other
            .strip_prefix("my.")
            .and_then(|rest| rest.strip_suffix(".uid"))
        {
            Some(doc_type) => doc["type"] == json!(doc_type) && doc["uid"] == json!(value),
            None => false,
        },
    }
}

fn publication_date(doc: &Value) -> String {
    doc["first_publication_date"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

/// A post document in the shape the CMS returns
pub fn post_document(n: usize) -> Value {
    json!({
        "id": format!("ID{:03}", n),
        "uid": format!("post-{}", n),
        "type": "post",
        "first_publication_date": format!("2021-03-{:02}T12:00:00+0000", n),
        "last_publication_date": format!("2021-03-{:02}T12:00:00+0000", n),
        "data": {
            "title": format!("Post {}", n),
            "subtitle": format!("Subtitle {}", n),
            "author": "Joseph Oliveira",
            "banner": { "url": format!("https://images.prismic.io/{}.png", n) },
            "content": [
                {
                    "heading": "Heading",
                    "body": [{ "type": "paragraph", "text": "Lorem ipsum dolor", "spans": [] }]
                }
            ]
        }
    })
}

/// `count` posts, newest first (days `count` down to 1)
pub fn post_documents(count: usize) -> Vec<Value> {
    (1..=count).rev().map(post_document).collect()
}
