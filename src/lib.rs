//! spacetraveling: a server-rendered blog front-end for a headless CMS
//!
//! Posts live in a Prismic repository. This crate fetches them, renders the
//! listing and post pages with embedded Tera templates, keeps rendered pages
//! in a revalidating cache and supports the CMS's preview mode.

pub mod cache;
pub mod cms;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod pagination;
pub mod preview;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::cms::{Cms, PrismicClient};
use crate::generator::PageBuilder;

/// The blog application
#[derive(Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: std::path::PathBuf,
    /// Static assets directory
    pub static_dir: std::path::PathBuf,
    /// Public (export) directory
    pub public_dir: std::path::PathBuf,
}

impl Site {
    /// Create a new site from a directory
    ///
    /// Reads `_config.yml` when present, then applies the environment overrides.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        let static_dir = base_dir.join(&config.static_dir);
        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            base_dir,
            static_dir,
            public_dir,
        })
    }

    /// Client for the configured CMS repository
    pub fn cms(&self) -> Result<Arc<dyn Cms>> {
        Ok(Arc::new(PrismicClient::from_config(&self.config)?))
    }

    /// Page builder over the configured CMS repository
    pub fn page_builder(&self) -> Result<PageBuilder> {
        PageBuilder::new(self.cms()?, self.config.clone())
    }

    /// Export the site to the public directory
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("_config.yml"),
            "title: My Blog\nstatic_dir: assets\npublic_dir: out\n",
        )
        .unwrap();

        let site = Site::new(dir.path()).unwrap();
        assert_eq!(site.config.title, "My Blog");
        assert_eq!(site.static_dir, dir.path().join("assets"));
        assert_eq!(site.public_dir, dir.path().join("out"));
    }

    #[test]
    fn test_site_defaults_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let site = Site::new(dir.path()).unwrap();
        assert_eq!(site.config.page_size, 2);
        assert_eq!(site.public_dir, dir.path().join("public"));
    }
}
