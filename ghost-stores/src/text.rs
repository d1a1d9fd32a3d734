/*!
ASCII case-insensitive matching shared by every store reader
*/

/// Whether `needle` occurs anywhere in `haystack`, ignoring ASCII case.
///
/// An empty needle never matches; an empty identity must not turn every
/// store into a match.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    bytes_contain_ignore_case(haystack.as_bytes(), needle.as_bytes())
}

/// Byte-level variant used on raw file contents, which may not be UTF-8.
pub fn bytes_contain_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}
