//! Prismic REST API client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{without_access_token, Cms, CmsError, Query, SearchResponse, ACCESS_TOKEN_PARAM};
use crate::config::SiteConfig;

/// Request timeout for every CMS call
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// API root document; only the refs are used
#[derive(Debug, Deserialize)]
struct ApiInfo {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

/// Client for a Prismic repository API (`https://<repo>.cdn.prismic.io/api/v2`)
#[derive(Debug, Clone)]
pub struct PrismicClient {
    http: reqwest::Client,
    endpoint: Url,
    access_token: Option<String>,
}

impl PrismicClient {
    /// Create a client for an API endpoint
    pub fn new(endpoint: &str, access_token: Option<String>) -> Result<Self, CmsError> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| CmsError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(CmsError::InvalidEndpoint(endpoint.to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            access_token,
        })
    }

    /// Create a client from the site configuration
    pub fn from_config(config: &SiteConfig) -> Result<Self, CmsError> {
        Self::new(&config.cms_endpoint, config.cms_access_token.clone())
    }

    /// Fetch the ref of the published content version
    async fn master_ref(&self) -> Result<String, CmsError> {
        let mut url = self.endpoint.clone();
        self.append_token(&mut url);

        let info: ApiInfo = self.get_json(url).await?;
        info.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or(CmsError::NoMasterRef)
    }

    /// Build the `/documents/search` URL for a query
    fn search_url(&self, query: &Query, reference: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map(|mut segments| {
                segments.pop_if_empty().extend(["documents", "search"]);
            })
            .ok();

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("ref", reference);
            params.append_pair("q", &query.q());
            if let Some(page_size) = query.page_size {
                params.append_pair("pageSize", &page_size.to_string());
            }
            if let Some(after) = &query.after {
                params.append_pair("after", after);
            }
            if let Some(orderings) = &query.orderings {
                params.append_pair("orderings", orderings);
            }
        }

        self.append_token(&mut url);
        url
    }

    /// Validate that a cursor URL points at this repository
    fn cursor_url(&self, cursor: &str) -> Result<Url, CmsError> {
        let mut url =
            Url::parse(cursor).map_err(|_| CmsError::InvalidCursor(cursor.to_string()))?;

        if url.origin() != self.endpoint.origin() {
            return Err(CmsError::InvalidCursor(cursor.to_string()));
        }

        self.append_token(&mut url);
        Ok(url)
    }

    fn append_token(&self, url: &mut Url) {
        if let Some(token) = &self.access_token {
            if !url.query_pairs().any(|(k, _)| k == ACCESS_TOKEN_PARAM) {
                url.query_pairs_mut().append_pair(ACCESS_TOKEN_PARAM, token);
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, CmsError> {
        tracing::debug!(url = %without_access_token(&url), "cms request");

        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CmsError::Status {
                status: status.as_u16(),
                url: without_access_token(&url),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl Cms for PrismicClient {
    async fn query(&self, query: &Query) -> Result<SearchResponse, CmsError> {
        let reference = match &query.reference {
            Some(reference) => reference.clone(),
            None => self.master_ref().await?,
        };
        self.get_json(self.search_url(query, &reference)).await
    }

    async fn fetch_page(&self, cursor: &str) -> Result<SearchResponse, CmsError> {
        let url = self.cursor_url(cursor)?;
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::{Predicate, ORDER_BY_DATE_DESC};

    fn client(token: Option<&str>) -> PrismicClient {
        PrismicClient::new(
            "https://blog.cdn.prismic.io/api/v2/",
            token.map(str::to_string),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_bad_endpoints() {
        assert!(matches!(
            PrismicClient::new("not a url", None),
            Err(CmsError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            PrismicClient::new("ftp://blog.cdn.prismic.io/api/v2", None),
            Err(CmsError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_search_url() {
        let query = Query::new(Predicate::document_type("post"))
            .page_size(1)
            .after("YFz3")
            .orderings(ORDER_BY_DATE_DESC);
        let url = client(None).search_url(&query, "master-ref");

        assert_eq!(url.path(), "/api/v2/documents/search");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("ref".to_string(), "master-ref".to_string()),
                ("q".to_string(), r#"[[at(document.type, "post")]]"#.to_string()),
                ("pageSize".to_string(), "1".to_string()),
                ("after".to_string(), "YFz3".to_string()),
                ("orderings".to_string(), ORDER_BY_DATE_DESC.to_string()),
            ]
        );
    }

    #[test]
    fn test_access_token_appended_once() {
        let client = client(Some("secret"));
        let url = client.search_url(&Query::new(Predicate::document_type("post")), "r");
        assert_eq!(
            url.query_pairs().filter(|(k, _)| k == "access_token").count(),
            1
        );

        let cursor = "https://blog.cdn.prismic.io/api/v2/documents/search?page=2&access_token=secret";
        let url = client.cursor_url(cursor).unwrap();
        assert_eq!(
            url.query_pairs().filter(|(k, _)| k == "access_token").count(),
            1
        );
    }

    #[test]
    fn test_cursor_must_match_origin() {
        let client = client(None);
        assert!(client
            .cursor_url("https://blog.cdn.prismic.io/api/v2/documents/search?page=2")
            .is_ok());
        assert!(matches!(
            client.cursor_url("https://evil.example.com/api/v2/documents/search?page=2"),
            Err(CmsError::InvalidCursor(_))
        ));
        assert!(matches!(
            client.cursor_url("/relative"),
            Err(CmsError::InvalidCursor(_))
        ));
    }

    #[test]
    fn test_public_cursor_regains_token_on_fetch() {
        let client = PrismicClient::new(
            "https://blog.cdn.prismic.io/api/v2",
            Some("secret".to_string()),
        )
        .unwrap();
        let cursor = crate::cms::public_cursor(
            "https://blog.cdn.prismic.io/api/v2/documents/search?page=2&access_token=secret",
        );
        assert!(!cursor.contains("secret"));

        let url = client.cursor_url(&cursor).unwrap();
        assert_eq!(
            url.query_pairs()
                .filter(|(k, v)| k == "access_token" && v == "secret")
                .count(),
            1
        );
        assert!(!without_access_token(&url).contains("secret"));
    }
}
