//! Maps raw CMS documents onto the narrowed post shapes.
//!
//! Every function here is total: fields the view does not use are dropped,
//! missing or mistyped fields become empty strings / `None`.

use serde_json::Value;

use super::post::{
    ContentBlock, NavPost, Post, PostDetail, PostPagination, RichTextBlock, Span, SpanKind,
};
use crate::cms::{public_cursor, SearchResponse};
use crate::helpers::post_path;

/// Map a raw document to a listing post
pub fn to_post(doc: &Value) -> Post {
    Post {
        uid: text_field(doc.get("uid")),
        publication_date: date_field(doc.get("first_publication_date")),
        title: text_field(doc.pointer("/data/title")),
        subtitle: text_field(doc.pointer("/data/subtitle")),
        author: text_field(doc.pointer("/data/author")),
    }
}

/// Map a raw document to a full post
pub fn to_post_detail(doc: &Value) -> PostDetail {
    let content = doc
        .pointer("/data/content")
        .and_then(Value::as_array)
        .map(|blocks| blocks.iter().map(content_block).collect())
        .unwrap_or_default();

    PostDetail {
        id: text_field(doc.get("id")),
        uid: text_field(doc.get("uid")),
        first_publication_date: date_field(doc.get("first_publication_date")),
        last_publication_date: date_field(doc.get("last_publication_date")),
        title: text_field(doc.pointer("/data/title")),
        subtitle: text_field(doc.pointer("/data/subtitle")),
        author: text_field(doc.pointer("/data/author")),
        banner_url: text_field(doc.pointer("/data/banner/url")),
        content,
    }
}

/// Map a search response to a listing page.
///
/// The cursor ends up in page output, so it loses the access token here.
pub fn to_pagination(response: &SearchResponse) -> PostPagination {
    PostPagination {
        results: response.results.iter().map(to_post).collect(),
        next_page: response
            .next_page
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(public_cursor),
    }
}

/// Map a neighbouring document to a navigation link, `None` without a uid
pub fn to_nav_post(doc: &Value) -> Option<NavPost> {
    let uid = text_field(doc.get("uid"));
    if uid.is_empty() {
        return None;
    }
    Some(NavPost {
        uid,
        title: text_field(doc.pointer("/data/title")),
    })
}

fn content_block(block: &Value) -> ContentBlock {
    ContentBlock {
        heading: text_field(block.get("heading")),
        body: block
            .get("body")
            .and_then(Value::as_array)
            .map(|elements| elements.iter().map(rich_text_block).collect())
            .unwrap_or_default(),
    }
}

fn rich_text_block(element: &Value) -> RichTextBlock {
    let kind = match element.get("type").and_then(Value::as_str) {
        Some(kind) if !kind.is_empty() => kind.to_string(),
        _ => "paragraph".to_string(),
    };

    let spans = element
        .get("spans")
        .and_then(Value::as_array)
        .map(|spans| spans.iter().filter_map(span).collect())
        .unwrap_or_default();

    RichTextBlock {
        text: text_field(element.get("text")),
        spans,
        url: optional_text(element.get("url")),
        alt: optional_text(element.get("alt")),
        kind,
    }
}

fn span(value: &Value) -> Option<Span> {
    let start = value.get("start")?.as_u64()? as usize;
    let end = value.get("end")?.as_u64()? as usize;
    if end <= start {
        return None;
    }

    let data = value.get("data");
    let kind = match value.get("type")?.as_str()? {
        "strong" => SpanKind::Strong,
        "em" => SpanKind::Em,
        "hyperlink" => {
            let data = data?;
            let url = match data.get("link_type").and_then(Value::as_str) {
                Some("Document") => optional_text(data.get("uid"))
                    .map(|uid| post_path(&uid))
                    .unwrap_or_else(|| "/".to_string()),
                _ => optional_text(data.get("url"))?,
            };
            let blank = data.get("target").and_then(Value::as_str) == Some("_blank");
            SpanKind::Hyperlink { url, blank }
        }
        "label" => SpanKind::Label(optional_text(data.and_then(|d| d.get("label")))?),
        _ => return None,
    };

    Some(Span { start, end, kind })
}

/// Read a text field; title-like fields may also arrive as rich text
fn text_field(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(elements)) => elements
            .iter()
            .filter_map(|e| e.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn optional_text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn date_field(value: Option<&Value>) -> Option<String> {
    optional_text(value)
}
