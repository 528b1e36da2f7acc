//! Character-level scan state shared by the segmenter and the tokenizer.
//!
//! Both passes walk their input with a single forward cursor and the same
//! three-state machine. Only bytes seen in [`ScanState::Default`] are
//! structural: parentheses, commas, semicolons and comment openers inside a
//! quoted literal, or directly after an escape marker, are plain content.

use memchr::{memchr, memmem};

/// Quote/escape state of a forward scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    /// Outside any quoted literal
    #[default]
    Default,
    /// Inside a single-quoted literal
    InQuote,
    /// The previous byte was a backslash; the next byte is taken verbatim
    Escaped { in_quote: bool },
}

impl ScanState {
    /// Transition on one input byte.
    ///
    /// All control bytes are ASCII, so stepping over the raw bytes of a UTF-8
    /// string never splits a multi-byte character at a structural position.
    #[inline]
    pub fn step(self, b: u8) -> ScanState {
        match self {
            ScanState::Escaped { in_quote: true } => ScanState::InQuote,
            ScanState::Escaped { in_quote: false } => ScanState::Default,
            ScanState::Default => match b {
                b'\\' => ScanState::Escaped { in_quote: false },
                b'\'' => ScanState::InQuote,
                _ => ScanState::Default,
            },
            ScanState::InQuote => match b {
                b'\\' => ScanState::Escaped { in_quote: true },
                b'\'' => ScanState::Default,
                _ => ScanState::InQuote,
            },
        }
    }

    /// True while inside a quoted literal (including an escape within one)
    #[inline]
    pub fn is_quoted(self) -> bool {
        matches!(
            self,
            ScanState::InQuote | ScanState::Escaped { in_quote: true }
        )
    }
}

/// Position just past the end of a `--` comment starting at `at`
#[inline]
pub(crate) fn skip_line_comment(bytes: &[u8], at: usize) -> usize {
    match memchr(b'\n', &bytes[at..]) {
        Some(nl) => at + nl + 1,
        None => bytes.len(),
    }
}

/// Position just past the end of a `/* */` comment starting at `at`.
/// An unclosed comment runs to end of input.
#[inline]
pub(crate) fn skip_block_comment(bytes: &[u8], at: usize) -> usize {
    let body = at + 2;
    match memmem::find(&bytes[body.min(bytes.len())..], b"*/") {
        Some(end) => body + end + 2,
        None => bytes.len(),
    }
}

/// Comment opener at `at`, if any: returns the position after the comment
#[inline]
pub(crate) fn comment_end(bytes: &[u8], at: usize) -> Option<usize> {
    match (bytes[at], bytes.get(at + 1)) {
        (b'-', Some(b'-')) => Some(skip_line_comment(bytes, at)),
        (b'/', Some(b'*')) => Some(skip_block_comment(bytes, at)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(input: &[u8]) -> ScanState {
        input.iter().fold(ScanState::Default, |s, &b| s.step(b))
    }

    #[test]
    fn test_quote_toggles() {
        assert_eq!(run(b"'"), ScanState::InQuote);
        assert_eq!(run(b"''"), ScanState::Default);
        assert_eq!(run(b"'abc'"), ScanState::Default);
    }

    #[test]
    fn test_escape_inside_quote_keeps_quote_open() {
        assert_eq!(run(b"'it\\'s"), ScanState::InQuote);
        assert_eq!(run(b"'it\\'s'"), ScanState::Default);
    }

    #[test]
    fn test_escape_outside_quote_suppresses_toggle() {
        assert_eq!(run(b"\\'"), ScanState::Default);
        assert_eq!(run(b"\\"), ScanState::Escaped { in_quote: false });
    }

    #[test]
    fn test_escaped_backslash() {
        assert_eq!(run(b"'a\\\\'"), ScanState::Default);
    }

    #[test]
    fn test_is_quoted() {
        assert!(ScanState::InQuote.is_quoted());
        assert!(ScanState::Escaped { in_quote: true }.is_quoted());
        assert!(!ScanState::Escaped { in_quote: false }.is_quoted());
        assert!(!ScanState::Default.is_quoted());
    }

    #[test]
    fn test_comment_end() {
        let sql = b"-- note\nINSERT";
        assert_eq!(comment_end(sql, 0), Some(8));

        let sql = b"/* a;b */x";
        assert_eq!(comment_end(sql, 0), Some(9));

        let sql = b"/* open";
        assert_eq!(comment_end(sql, 0), Some(sql.len()));

        assert_eq!(comment_end(b"-1", 0), None);
    }
}
