//! Headless CMS access.
//!
//! [`Cms`] is the read-only capability the rest of the crate depends on;
//! [`PrismicClient`] implements it over the Prismic REST API.

mod client;
#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::preview::LinkResolver;

pub use client::PrismicClient;

/// Ordering for neighbour lookups: oldest first
pub const ORDER_BY_DATE_ASC: &str = "[document.first_publication_date]";

/// Ordering for neighbour lookups: newest first
pub const ORDER_BY_DATE_DESC: &str = "[document.first_publication_date desc]";

/// Query parameter carrying the repository access token
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// `url` without its access token
pub fn without_access_token(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| k == ACCESS_TOKEN_PARAM) {
        return url.to_string();
    }

    let mut clean = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != ACCESS_TOKEN_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    clean.set_query(None);
    if !pairs.is_empty() {
        clean.query_pairs_mut().extend_pairs(pairs);
    }
    clean.to_string()
}

/// A `next_page` cursor fit to hand to a browser.
///
/// The CMS echoes the access token into its cursors; it is stripped here and
/// appended again when the cursor is fetched.
pub fn public_cursor(cursor: &str) -> String {
    match Url::parse(cursor) {
        Ok(url) => without_access_token(&url),
        Err(_) => cursor.to_string(),
    }
}

/// CMS access errors
#[derive(Debug, thiserror::Error)]
pub enum CmsError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("cursor does not point at the CMS: {0}")]
    InvalidCursor(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("CMS exposes no master ref")]
    NoMasterRef,
}

/// A page of raw documents as returned by the search API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub page: u64,
    pub results_per_page: u64,
    pub total_results_size: u64,
    pub total_pages: u64,
    pub results: Vec<Value>,
    pub next_page: Option<String>,
    pub prev_page: Option<String>,
}

/// A single query predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `at(path, "value")`: exact match
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::At {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Documents of a custom type
    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }

    /// The document with the given id
    pub fn document_id(id: &str) -> Self {
        Self::at("document.id", id)
    }

    /// The document of a type with the given uid
    pub fn uid(doc_type: &str, uid: &str) -> Self {
        Self::at(format!("my.{}.uid", doc_type), uid)
    }

    fn to_query(&self) -> String {
        match self {
            Self::At { path, value } => {
                let value = value.replace('\\', "\\\\").replace('"', "\\\"");
                format!("[at({}, \"{}\")]", path, value)
            }
        }
    }
}

/// Search query: predicates plus paging options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub page_size: Option<usize>,
    /// Return documents after the one with this id
    pub after: Option<String>,
    pub orderings: Option<String>,
    /// Content version to query; the master ref when `None`
    pub reference: Option<String>,
}

impl Query {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicates: vec![predicate],
            ..Default::default()
        }
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn after(mut self, id: impl Into<String>) -> Self {
        self.after = Some(id.into());
        self
    }

    pub fn orderings(mut self, orderings: impl Into<String>) -> Self {
        self.orderings = Some(orderings.into());
        self
    }

    pub fn reference(mut self, reference: Option<&str>) -> Self {
        self.reference = reference.map(str::to_string);
        self
    }

    /// The `q` parameter, e.g. `[[at(document.type, "post")]]`
    pub fn q(&self) -> String {
        let predicates: String = self.predicates.iter().map(Predicate::to_query).collect();
        format!("[{}]", predicates)
    }
}

/// Read-only access to the content repository
#[async_trait]
pub trait Cms: Send + Sync {
    /// Run a search query
    async fn query(&self, query: &Query) -> Result<SearchResponse, CmsError>;

    /// Fetch the page a `next_page` cursor points at
    async fn fetch_page(&self, cursor: &str) -> Result<SearchResponse, CmsError>;

    /// The document of `doc_type` with the given uid
    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        reference: Option<&str>,
    ) -> Result<Option<Value>, CmsError> {
        let query = Query::new(Predicate::uid(doc_type, uid))
            .page_size(1)
            .reference(reference);
        Ok(self.query(&query).await?.results.into_iter().next())
    }

    /// The document with the given id
    async fn get_by_id(&self, id: &str, reference: Option<&str>) -> Result<Option<Value>, CmsError> {
        let query = Query::new(Predicate::document_id(id))
            .page_size(1)
            .reference(reference);
        Ok(self.query(&query).await?.results.into_iter().next())
    }

    /// Resolve a preview token to the in-site path of the previewed document.
    ///
    /// The token is the preview ref; `None` when the document cannot be found
    /// under it.
    async fn resolve_preview(
        &self,
        token: &str,
        document_id: &str,
        resolver: &LinkResolver,
    ) -> Result<Option<String>, CmsError> {
        if token.trim().is_empty() || document_id.trim().is_empty() {
            return Ok(None);
        }
        let document = self.get_by_id(document_id, Some(token)).await?;
        Ok(document.map(|doc| resolver.resolve(&doc)))
    }
}
