//! Reading time estimate

use super::post::ContentBlock;
use super::rich_text::as_text;

/// Average reading speed in words per minute
pub const WORDS_PER_MINUTE: usize = 200;

/// Count whitespace-delimited words
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Total words across every heading and body of a post
pub fn total_words(content: &[ContentBlock]) -> usize {
    content
        .iter()
        .map(|block| count_words(&block.heading) + count_words(&as_text(&block.body)))
        .sum()
}

/// Estimated reading time, rounded up to the whole minute (e.g. "4 min")
pub fn reading_time(content: &[ContentBlock]) -> String {
    let minutes = total_words(content).div_ceil(WORDS_PER_MINUTE);
    format!("{} min", minutes)
}
