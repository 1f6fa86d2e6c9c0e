//! Rich-text serialization (plain text and HTML)

use std::cmp::Reverse;

use super::post::{RichTextBlock, Span, SpanKind};
use crate::helpers::html_escape;

/// Plain text of a rich-text body, elements joined by a space
pub fn as_text(blocks: &[RichTextBlock]) -> String {
    blocks
        .iter()
        .map(|b| b.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// HTML of a rich-text body.
///
/// Consecutive `list-item` / `o-list-item` elements are grouped into a single
/// `<ul>` / `<ol>`. Unknown element types render as paragraphs.
pub fn as_html(blocks: &[RichTextBlock]) -> String {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for block in blocks {
        let list = match block.kind.as_str() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        };

        if open_list != list {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list;
        }

        html.push_str(&block_html(block));
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

fn block_html(block: &RichTextBlock) -> String {
    let inner = || {
        let chars: Vec<char> = block.text.chars().collect();
        render_spans(&chars, 0, chars.len(), block.spans.clone())
    };

    match block.kind.as_str() {
        kind @ ("heading1" | "heading2" | "heading3" | "heading4" | "heading5" | "heading6") => {
            let level = &kind["heading".len()..];
            format!("<h{}>{}</h{}>", level, inner(), level)
        }
        "preformatted" => format!("<pre>{}</pre>", inner()),
        "list-item" | "o-list-item" => format!("<li>{}</li>", inner()),
        "image" => match &block.url {
            Some(url) => format!(
                r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                html_escape(url),
                html_escape(block.alt.as_deref().unwrap_or(""))
            ),
            None => String::new(),
        },
        _ => format!("<p>{}</p>", inner()),
    }
}

/// Render `chars[start..end]`, wrapping the span ranges in their tags.
///
/// Spans that straddle the end of an enclosing span are split so the output
/// stays well nested.
fn render_spans(chars: &[char], start: usize, end: usize, mut spans: Vec<Span>) -> String {
    spans.sort_by_key(|s| (s.start, Reverse(s.end)));

    let mut html = String::new();
    let mut cursor = start;
    let mut pending = spans;

    while !pending.is_empty() {
        let span = pending.remove(0);
        let span_start = span.start.clamp(cursor, end);
        let span_end = span.end.min(end);
        if span_start >= span_end {
            continue;
        }

        html.push_str(&text_html(&chars[cursor..span_start]));

        let mut inner = Vec::new();
        let mut rest = Vec::new();
        for other in pending.drain(..) {
            if other.start >= span_end {
                rest.push(other);
            } else if other.end > span_end {
                inner.push(Span {
                    end: span_end,
                    ..other.clone()
                });
                rest.push(Span {
                    start: span_end,
                    ..other
                });
            } else {
                inner.push(other);
            }
        }
        rest.sort_by_key(|s| (s.start, Reverse(s.end)));
        pending = rest;

        html.push_str(&open_tag(&span.kind));
        html.push_str(&render_spans(chars, span_start, span_end, inner));
        html.push_str(close_tag(&span.kind));

        cursor = span_end;
    }

    if cursor < end {
        html.push_str(&text_html(&chars[cursor..end]));
    }

    html
}

fn text_html(chars: &[char]) -> String {
    let text: String = chars.iter().collect();
    html_escape(&text).replace('\n', "<br />")
}

fn open_tag(kind: &SpanKind) -> String {
    match kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink { url, blank: true } => format!(
            r#"<a href="{}" target="_blank" rel="noopener noreferrer">"#,
            html_escape(url)
        ),
        SpanKind::Hyperlink { url, blank: false } => {
            format!(r#"<a href="{}">"#, html_escape(url))
        }
        SpanKind::Label(label) => format!(r#"<span class="{}">"#, html_escape(label)),
    }
}

fn close_tag(kind: &SpanKind) -> &'static str {
    match kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink { .. } => "</a>",
        SpanKind::Label(_) => "</span>",
    }
}
