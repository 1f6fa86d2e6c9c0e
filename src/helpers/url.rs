//! URL helper functions

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped inside a single path segment; the result is also safe
/// inside a quoted HTML attribute
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'\'')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Path of a post page
///
/// # Examples
/// ```ignore
/// post_path("my-first-post") // -> "/post/my-first-post"
/// ```
pub fn post_path(uid: &str) -> String {
    format!("/post/{}", encode_segment(uid))
}

/// Encode a single URL path segment
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}

/// Encode a URL query value
pub fn encode_query(value: &str) -> String {
    percent_encoding::utf8_percent_encode(value, percent_encoding::NON_ALPHANUMERIC).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_path() {
        assert_eq!(post_path("como-utilizar-hooks"), "/post/como-utilizar-hooks");
        assert_eq!(post_path("a b/c"), "/post/a%20b%2Fc");
        assert_eq!(post_path("x\"'&<y>"), "/post/x%22%27%26%3Cy%3E");
    }

    #[test]
    fn test_encode_query() {
        assert_eq!(
            encode_query("https://x.io/a?b=1"),
            "https%3A%2F%2Fx%2Eio%2Fa%3Fb%3D1"
        );
    }
}
