//! Page builder: fetches content from the CMS and renders it to HTML

use anyhow::Result;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tera::Context;
use walkdir::WalkDir;

use crate::cms::{Cms, Predicate, Query, ORDER_BY_DATE_ASC, ORDER_BY_DATE_DESC};
use crate::config::SiteConfig;
use crate::content::{adapter, reading_time, rich_text};
use crate::content::{NavPost, Post, PostDetail, PostPagination};
use crate::error::SiteError;
use crate::helpers::{post_path, DateFormatter};
use crate::pagination::Paginator;
use crate::templates::{
    BlockView, CommentsData, NavLink, PostCard, PostView, PostsPage, SiteData, TemplateRenderer,
};

/// Builds the listing and post pages
pub struct PageBuilder {
    cms: Arc<dyn Cms>,
    config: SiteConfig,
    renderer: TemplateRenderer,
    dates: DateFormatter,
}

/// What a static export wrote
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub posts: usize,
    pub assets: usize,
}

impl PageBuilder {
    /// Create a new builder
    pub fn new(cms: Arc<dyn Cms>, config: SiteConfig) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let dates = DateFormatter::from_config(&config)?;

        Ok(Self {
            cms,
            config,
            renderer,
            dates,
        })
    }

    pub fn cms(&self) -> &Arc<dyn Cms> {
        &self.cms
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// First page of posts, newest first
    pub async fn first_page(&self, reference: Option<&str>) -> Result<PostPagination, SiteError> {
        let query = Query::new(Predicate::document_type(&self.config.post_type))
            .page_size(self.config.page_size)
            .reference(reference);
        let response = self.cms.query(&query).await?;
        Ok(adapter::to_pagination(&response))
    }

    /// The page a "load more" cursor points at, ready for display
    pub async fn next_page(&self, cursor: &str) -> Result<PostsPage, SiteError> {
        let response = self.cms.fetch_page(cursor).await?;
        let page = adapter::to_pagination(&response);
        Ok(PostsPage {
            results: self.post_cards(&page.results)?,
            next_page: page.next_page,
        })
    }

    /// Render the listing page; `reference` is the preview ref, if any
    pub async fn home(&self, reference: Option<&str>) -> Result<String, SiteError> {
        let page = self.first_page(reference).await?;
        self.render_home(&page, reference.is_some())
    }

    pub fn render_home(&self, page: &PostPagination, preview: bool) -> Result<String, SiteError> {
        let mut context = self.base_context(preview);
        context.insert("posts", &self.post_cards(&page.results)?);
        context.insert("next_page", &page.next_page);
        Ok(self.renderer.render("index.html", &context)?)
    }

    /// Render a post page; `None` when no post has this uid
    pub async fn post(
        &self,
        uid: &str,
        reference: Option<&str>,
    ) -> Result<Option<String>, SiteError> {
        let Some(document) = self
            .cms
            .get_by_uid(&self.config.post_type, uid, reference)
            .await?
        else {
            tracing::debug!(uid = %uid, "post not found");
            return Ok(None);
        };

        let post = adapter::to_post_detail(&document);
        let (previous, next) = self.neighbours(&post.id, reference).await?;
        self.render_post(&post, previous, next, reference.is_some())
            .map(Some)
    }

    /// The next-older and next-newer posts around the post with `id`.
    ///
    /// "Previous" is the older post, so the links read in publication order.
    async fn neighbours(
        &self,
        id: &str,
        reference: Option<&str>,
    ) -> Result<(Option<NavPost>, Option<NavPost>), SiteError> {
        if id.is_empty() {
            return Ok((None, None));
        }

        let around = |orderings: &str| {
            Query::new(Predicate::document_type(&self.config.post_type))
                .page_size(1)
                .after(id)
                .orderings(orderings)
                .reference(reference)
        };
        let older = around(ORDER_BY_DATE_DESC);
        let newer = around(ORDER_BY_DATE_ASC);

        let (older, newer) = tokio::try_join!(self.cms.query(&older), self.cms.query(&newer))?;
        let first = |results: &[serde_json::Value]| results.first().and_then(adapter::to_nav_post);

        Ok((first(&older.results), first(&newer.results)))
    }

    pub fn render_post(
        &self,
        post: &PostDetail,
        previous: Option<NavPost>,
        next: Option<NavPost>,
        preview: bool,
    ) -> Result<String, SiteError> {
        let edit_date = match (&post.first_publication_date, &post.last_publication_date) {
            (Some(first), Some(last)) if first != last => Some(self.dates.long(last)?),
            _ => None,
        };

        let view = PostView {
            title: post.title.clone(),
            author: post.author.clone(),
            banner_url: post.banner_url.clone(),
            date: self.short_date(post.first_publication_date.as_deref())?,
            reading_time: reading_time(&post.content),
            edit_date,
            blocks: post
                .content
                .iter()
                .map(|block| BlockView {
                    heading: block.heading.clone(),
                    html: rich_text::as_html(&block.body),
                })
                .collect(),
        };

        let nav_link = |nav: NavPost| NavLink {
            path: post_path(&nav.uid),
            title: nav.title,
        };

        let mut context = self.base_context(preview);
        context.insert("post", &view);
        context.insert("previous", &previous.map(nav_link));
        context.insert("next", &next.map(nav_link));
        context.insert(
            "comments",
            &self
                .config
                .utterances_repo
                .as_ref()
                .filter(|repo| !repo.is_empty())
                .map(|repo| CommentsData { repo: repo.clone() }),
        );

        Ok(self.renderer.render("post.html", &context)?)
    }

    /// Posts rendered ahead of the first request: the ones on the first page
    pub async fn prebuilt_uids(&self) -> Result<Vec<String>, SiteError> {
        let page = self.first_page(None).await?;
        Ok(page.results.into_iter().map(|post| post.uid).collect())
    }

    /// Write the listing and every post below `out_dir`, then copy `static_dir`
    pub async fn export(&self, out_dir: &Path, static_dir: &Path) -> Result<ExportReport> {
        let paginator = Paginator::new(self.cms.clone(), self.first_page(None).await?);
        if let Err(outcome) = paginator.load_all().await {
            anyhow::bail!("failed to load all posts: {:?}", outcome);
        }
        let all = paginator.into_inner();

        fs::create_dir_all(out_dir)?;

        // a static listing cannot load more, so it lists everything
        let home = self.render_home(
            &PostPagination {
                results: all.results.clone(),
                next_page: None,
            },
            false,
        )?;
        fs::write(out_dir.join("index.html"), home)?;

        let mut report = ExportReport::default();
        for post in &all.results {
            let Some(html) = self.post(&post.uid, None).await? else {
                tracing::warn!(uid = %post.uid, "post disappeared during export");
                continue;
            };

            let output_path = out_dir
                .join("post")
                .join(post.uid.trim_matches('/'))
                .join("index.html");
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&output_path, html)?;
            tracing::debug!(uid = %post.uid, "wrote {:?}", output_path);
            report.posts += 1;
        }

        report.assets = copy_static_assets(static_dir, out_dir)?;
        Ok(report)
    }

    fn base_context(&self, preview: bool) -> Context {
        let mut context = Context::new();
        context.insert(
            "site",
            &SiteData {
                title: self.config.title.clone(),
                preview,
            },
        );
        context
    }

    fn post_cards(&self, posts: &[Post]) -> Result<Vec<PostCard>, SiteError> {
        posts
            .iter()
            .map(|post| {
                Ok(PostCard {
                    uid: post.uid.clone(),
                    path: post_path(&post.uid),
                    title: post.title.clone(),
                    subtitle: post.subtitle.clone(),
                    author: post.author.clone(),
                    date: self.short_date(post.publication_date.as_deref())?,
                })
            })
            .collect()
    }

    /// Drafts have no publication date yet; they show none
    fn short_date(&self, date: Option<&str>) -> Result<String, SiteError> {
        match date {
            Some(date) => Ok(self.dates.short(date)?),
            None => Ok(String::new()),
        }
    }
}

/// Copy static assets (logo, favicon, ...) to the output directory
fn copy_static_assets(static_dir: &Path, out_dir: &Path) -> Result<usize> {
    if !static_dir.exists() {
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(static_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let relative = path.strip_prefix(static_dir)?;
        let dest = out_dir.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(path, &dest)?;
        copied += 1;
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::memory::{post_document, post_documents, MemoryCms};
    use serde_json::json;

    fn builder(cms: MemoryCms) -> PageBuilder {
        PageBuilder::new(Arc::new(cms), SiteConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_home_lists_first_page() {
        let builder = builder(MemoryCms::new(post_documents(3)));
        let html = builder.home(None).await.unwrap();

        assert!(html.contains("Post 3"));
        assert!(html.contains("Post 2"));
        assert!(!html.contains("Post 1<"));
        assert!(html.contains("03 mar 2021"));
        assert!(html.contains("id=\"load-more\""));
    }

    #[tokio::test]
    async fn test_home_without_more_posts_has_no_button() {
        let builder = builder(MemoryCms::new(post_documents(2)));
        let html = builder.home(None).await.unwrap();
        assert!(!html.contains("id=\"load-more\""));
    }

    #[tokio::test]
    async fn test_post_page() {
        let builder = builder(MemoryCms::new(post_documents(5)));
        let html = builder.post("post-3", None).await.unwrap().unwrap();

        assert!(html.contains("Post 3"));
        assert!(html.contains("03 mar 2021"));
        assert!(html.contains("1 min"));
        assert!(html.contains("<p>Lorem ipsum dolor</p>"));
        // previous is the next-older post, next the next-newer one
        assert!(html.contains("href=\"/post/post-2\""));
        assert!(html.contains("href=\"/post/post-4\""));
        assert!(!html.contains("editado em"));
    }

    #[tokio::test]
    async fn test_post_page_edges_have_one_neighbour() {
        let builder = builder(MemoryCms::new(post_documents(3)));

        let oldest = builder.post("post-1", None).await.unwrap().unwrap();
        assert!(oldest.contains("href=\"/post/post-2\""));
        assert!(!oldest.contains("Post anterior"));

        let newest = builder.post("post-3", None).await.unwrap().unwrap();
        assert!(newest.contains("href=\"/post/post-2\""));
        assert!(!newest.contains("Próximo post"));
    }

    #[tokio::test]
    async fn test_edited_post_shows_edit_date() {
        let mut document = post_document(1);
        document["last_publication_date"] = json!("2021-03-26T15:30:00+0000");
        let builder = builder(MemoryCms::new(vec![document]));

        let html = builder.post("post-1", None).await.unwrap().unwrap();
        assert!(html.contains("* editado em 26 mar 2021, às 15:30"));
    }

    #[tokio::test]
    async fn test_unknown_post_is_none() {
        let builder = builder(MemoryCms::new(post_documents(2)));
        assert!(builder.post("missing", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_broken_date_fails_render() {
        let mut document = post_document(1);
        document["first_publication_date"] = json!("not a date");
        let builder = builder(MemoryCms::new(vec![document]));

        let err = builder.home(None).await.unwrap_err();
        assert!(matches!(err, SiteError::Date(_)));
    }

    #[tokio::test]
    async fn test_preview_renders_draft() {
        let mut draft = post_document(9);
        draft["first_publication_date"] = json!(null);
        let cms = MemoryCms::new(post_documents(2)).with_draft("preview-ref", draft);
        let builder = builder(cms);

        let html = builder.post("post-9", Some("preview-ref")).await.unwrap().unwrap();
        assert!(html.contains("Post 9"));
        assert!(html.contains("Sair do modo Preview"));
        assert!(builder.post("post-9", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prebuilt_uids() {
        let builder = builder(MemoryCms::new(post_documents(5)));
        assert_eq!(builder.prebuilt_uids().await.unwrap(), ["post-5", "post-4"]);
    }

    #[tokio::test]
    async fn test_next_page_cards() {
        let builder = builder(MemoryCms::new(post_documents(3)));
        let first = builder.first_page(None).await.unwrap();
        let cursor = first.next_page.unwrap();

        let page = builder.next_page(&cursor).await.unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].path, "/post/post-1");
        assert_eq!(page.results[0].date, "01 mar 2021");
        assert!(page.next_page.is_none());
    }

    #[tokio::test]
    async fn test_export() {
        let dir = tempfile::tempdir().unwrap();
        let static_dir = dir.path().join("static");
        fs::create_dir_all(static_dir.join("images")).unwrap();
        fs::write(static_dir.join("images/logo.svg"), "<svg/>").unwrap();
        let out_dir = dir.path().join("public");

        let builder = builder(MemoryCms::new(post_documents(5)));
        let report = builder.export(&out_dir, &static_dir).await.unwrap();

        assert_eq!(report, ExportReport { posts: 5, assets: 1 });
        let index = fs::read_to_string(out_dir.join("index.html")).unwrap();
        assert!(index.contains("Post 1"));
        assert!(!index.contains("id=\"load-more\""));
        assert!(out_dir.join("post/post-3/index.html").exists());
        assert!(out_dir.join("images/logo.svg").exists());
    }
}
