//! Post models narrowed from CMS documents

use serde::{Deserialize, Serialize};

/// A post as shown on the listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Unique slug of the post
    pub uid: String,

    /// First publication date as sent by the CMS
    pub publication_date: Option<String>,

    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// A full post as shown on its own page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetail {
    /// CMS document id (used as the cursor for neighbour lookups)
    pub id: String,
    pub uid: String,
    pub first_publication_date: Option<String>,
    pub last_publication_date: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub content: Vec<ContentBlock>,
}

/// A heading followed by a rich-text body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: Vec<RichTextBlock>,
}

/// One rich-text element (paragraph, heading, list item, image, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichTextBlock {
    /// Element type as named by the CMS, e.g. `paragraph` or `list-item`
    pub kind: String,
    pub text: String,
    pub spans: Vec<Span>,
    /// Image source, only set for `image` elements
    pub url: Option<String>,
    /// Image alt text, only set for `image` elements
    pub alt: Option<String>,
}

impl RichTextBlock {
    /// A plain paragraph without styling
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: "paragraph".to_string(),
            text: text.into(),
            spans: Vec::new(),
            url: None,
            alt: None,
        }
    }
}

/// Inline styling over a character range of a [`RichTextBlock`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub kind: SpanKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink { url: String, blank: bool },
    Label(String),
}

/// One page of listing posts plus the cursor to the next page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPagination {
    pub results: Vec<Post>,
    /// Opaque CMS URL of the next page, `None` once exhausted
    pub next_page: Option<String>,
}

/// Link target for the previous/next post navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavPost {
    pub uid: String,
    pub title: String,
}
