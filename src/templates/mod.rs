//! Built-in site templates using the Tera template engine
//!
//! Templates are embedded in the binary; values are autoescaped, rendered
//! rich text is passed through with `| safe`.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            // Partials
            ("partials/header.html", include_str!("site/partials/header.html")),
            (
                "partials/preview_button.html",
                include_str!("site/partials/preview_button.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> tera::Result<String> {
        self.tera.render(template_name, context)
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    /// Whether the page is rendered against a preview ref
    pub preview: bool,
}

/// A post card on the listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostCard {
    pub uid: String,
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    /// Short publication date, empty when unpublished
    pub date: String,
}

/// One page of post cards, as sent to the "load more" button
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostsPage {
    pub results: Vec<PostCard>,
    pub next_page: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub title: String,
    pub author: String,
    pub banner_url: String,
    pub date: String,
    pub reading_time: String,
    /// Long date of the last edit, when the post was edited after publishing
    pub edit_date: Option<String>,
    pub blocks: Vec<BlockView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockView {
    pub heading: String,
    /// Rendered rich-text body
    pub html: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavLink {
    pub title: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentsData {
    pub repo: String,
}
