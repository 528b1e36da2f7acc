//! Row tokenizer.
//!
//! Splits the inner text of one row group into positional field tokens.
//! Tokens borrow from the row: quoted literals are the bytes between their
//! quotes, bare literals are the untrimmed text up to the next top-level comma.

use super::scan::ScanState;

/// One positional field of a row, before normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldToken<'a> {
    /// Content of a single-quoted literal, escapes unresolved
    Quoted(&'a str),
    /// Unquoted text (NULL, numbers, expressions), untrimmed
    Bare(&'a str),
}

/// Lazy tokenizer over one row's inner text
pub struct Tokenizer<'a> {
    row: &'a str,
    pos: usize,
    finished: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(row: &'a str) -> Self {
        Self {
            row,
            pos: 0,
            finished: false,
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = FieldToken<'a>;

    fn next(&mut self) -> Option<FieldToken<'a>> {
        if self.finished {
            return None;
        }

        let bytes = self.row.as_bytes();
        let mut state = ScanState::Default;
        let mut depth: usize = 0;
        let mut start = self.pos;
        // Set when this field is a quoted literal opened at depth 0
        let mut quoted = false;
        let mut i = self.pos;

        while i < bytes.len() {
            let b = bytes[i];
            let prev = state;
            state = state.step(b);

            match (prev, b) {
                (ScanState::Default, b'\'') if depth == 0 => {
                    quoted = true;
                    start = i + 1;
                }
                (ScanState::InQuote, b'\'') if quoted => {
                    if bytes.get(i + 1) == Some(&b'\'') {
                        // '' stays inside the literal, verbatim
                        state = ScanState::InQuote;
                        i += 2;
                        continue;
                    }
                    let token = FieldToken::Quoted(&self.row[start..i]);
                    self.pos = skip_to_next_field(bytes, i + 1);
                    return Some(token);
                }
                (ScanState::Default, b'(') => depth += 1,
                (ScanState::Default, b')') => depth = depth.saturating_sub(1),
                (ScanState::Default, b',') if depth == 0 => {
                    self.pos = i + 1;
                    return Some(FieldToken::Bare(&self.row[start..i]));
                }
                _ => {}
            }
            i += 1;
        }

        self.finished = true;
        self.pos = bytes.len();

        let rest = &self.row[start..];
        if quoted {
            // Unterminated literal: keep what was captured
            Some(FieldToken::Quoted(rest))
        } else if rest.trim().is_empty() {
            None
        } else {
            Some(FieldToken::Bare(rest))
        }
    }
}

/// Skip whitespace after a closing quote and consume one following comma
fn skip_to_next_field(bytes: &[u8], from: usize) -> usize {
    let mut i = from;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b',' {
        i + 1
    } else {
        i
    }
}
