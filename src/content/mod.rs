//! Content module - post models, CMS document adapter and text processing

pub mod adapter;
mod post;
pub mod reading_time;
pub mod rich_text;

pub use post::{
    ContentBlock, NavPost, Post, PostDetail, PostPagination, RichTextBlock, Span, SpanKind,
};
pub use reading_time::reading_time;
