//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding [`SiteConfig::cms_endpoint`]
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";

/// Environment variable overriding [`SiteConfig::cms_access_token`]
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,

    // Date / Time format (Moment.js-style tokens)
    pub date_format: String,
    pub datetime_format: String,

    // CMS
    pub cms_endpoint: String,
    pub cms_access_token: Option<String>,
    pub post_type: String,
    pub page_size: usize,

    // Regeneration
    pub revalidate_secs: u64,
    pub index_revalidate_secs: Option<u64>,

    // Comments
    pub utterances_repo: Option<String>,

    // Preview cookie carries `Secure` (set when served over https)
    pub secure_cookies: bool,

    // Directory
    pub static_dir: String,
    pub public_dir: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "pt_BR".to_string(),
            timezone: "UTC".to_string(),

            date_format: "DD MMM YYYY".to_string(),
            datetime_format: "DD MMM YYYY, às HH:mm".to_string(),

            cms_endpoint: "https://blog-ignite-weverson.cdn.prismic.io/api/v2".to_string(),
            cms_access_token: None,
            post_type: "post".to_string(),
            page_size: 2,

            revalidate_secs: 60 * 30,
            index_revalidate_secs: None,

            utterances_repo: None,

            secure_cookies: false,

            static_dir: "static".to_string(),
            public_dir: "public".to_string(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `PRISMIC_API_ENDPOINT` / `PRISMIC_ACCESS_TOKEN` from the environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, access_token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            self.cms_endpoint = endpoint;
        }
        if let Some(token) = access_token.filter(|t| !t.trim().is_empty()) {
            self.cms_access_token = Some(token);
        }
        self.cms_endpoint = self.cms_endpoint.trim_end_matches('/').to_string();

        tracing::debug!(
            cms_endpoint = %self.cms_endpoint,
            has_access_token = self.cms_access_token.is_some(),
            "cms configuration resolved"
        );
    }

    /// Revalidation window for post pages
    pub fn revalidate(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.revalidate_secs)
    }

    /// Revalidation window for the listing page, `None` when built once
    pub fn index_revalidate(&self) -> Option<std::time::Duration> {
        self.index_revalidate_secs.map(std::time::Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "spacetraveling");
        assert_eq!(config.post_type, "post");
        assert_eq!(config.page_size, 2);
        assert_eq!(config.revalidate_secs, 1800);
        assert!(config.index_revalidate().is_none());
        assert!(!config.secure_cookies);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
language: en_US
timezone: America/Sao_Paulo
page_size: 5
index_revalidate_secs: 60
utterances_repo: someone/comments
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.language, "en_US");
        assert_eq!(config.timezone, "America/Sao_Paulo");
        assert_eq!(config.page_size, 5);
        assert_eq!(
            config.index_revalidate(),
            Some(std::time::Duration::from_secs(60))
        );
        assert_eq!(config.utterances_repo.as_deref(), Some("someone/comments"));
        // untouched fields keep their defaults
        assert_eq!(config.post_type, "post");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_config.yml");
        fs::write(&path, "title: From Disk\nrevalidate_secs: 10\n").unwrap();

        let config = SiteConfig::load(&path).unwrap();
        assert_eq!(config.title, "From Disk");
        assert_eq!(config.revalidate(), std::time::Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let mut config = SiteConfig::default();
        config.apply_overrides(
            Some("https://repo.cdn.prismic.io/api/v2/".to_string()),
            Some("secret".to_string()),
        );
        assert_eq!(config.cms_endpoint, "https://repo.cdn.prismic.io/api/v2");
        assert_eq!(config.cms_access_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_blank_overrides_ignored() {
        let mut config = SiteConfig::default();
        let endpoint = config.cms_endpoint.clone();
        config.apply_overrides(Some("  ".to_string()), Some(String::new()));
        assert_eq!(config.cms_endpoint, endpoint);
        assert!(config.cms_access_token.is_none());
    }
}
