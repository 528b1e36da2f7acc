//! Statement segmenter.
//!
//! Finds every `VALUES` keyword in a blob and yields the inner text of each
//! top-level parenthesized row group that follows it, up to the statement's
//! terminating `;`. Row extent is decided by a nesting counter, so literal
//! values that carry their own balanced parentheses stay inside their row.
//! Row groups are separated by commas; anything else after a closed group
//! (`ON DUPLICATE KEY UPDATE ...`, `ON CONFLICT (...) ...`) is a trailing
//! clause and is skipped up to the `;`.

use super::scan::{comment_end, ScanState};
use memchr::memchr;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

const VALUES_KEYWORD: &[u8] = b"VALUES";
const PREVIEW_CHARS: usize = 40;

static INSERT_TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\bINSERT\s+(?:IGNORE\s+)?INTO\s+[`"\[]?([^\s`"\]\(;]+)"#).unwrap()
});

/// The inner text of one row group, parentheses excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRow<'a> {
    /// Text between the row's outer parentheses
    pub text: &'a str,
    /// Byte offset of `text` within the blob
    pub offset: usize,
    /// Index of the statement this row belongs to
    pub statement: usize,
}

/// An `INSERT ... VALUES` header seen during segmentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementHeader {
    pub index: usize,
    /// Byte offset where the statement text begins
    pub offset: usize,
    /// Target table named in the header, when it can be read
    pub table: Option<String>,
}

/// Why a fragment was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedKind {
    /// A quoted literal was still open at end of input
    UnterminatedString,
    /// A row group was still open at end of input or statement
    UnbalancedParens,
}

/// A dropped fragment of a blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedInput {
    pub kind: MalformedKind,
    /// Statement in which the fragment started, or the last statement
    /// before it when the fragment lies outside any `INSERT`
    pub statement: usize,
    /// Byte offset where the fragment began
    pub offset: usize,
    /// First characters of the fragment
    pub preview: String,
}

impl fmt::Display for MalformedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self.kind {
            MalformedKind::UnterminatedString => "unterminated string literal",
            MalformedKind::UnbalancedParens => "unterminated row",
        };
        write!(
            f,
            "{} in statement {} at byte {}: {}",
            what, self.statement, self.offset, self.preview
        )
    }
}

enum Step<'a> {
    Row(RawRow<'a>),
    EndOfStatement,
    Malformed(MalformedInput),
    EndOfInput,
}

/// Lazy row segmenter over one blob.
///
/// Yields rows in source order. A malformed fragment is yielded as an `Err`
/// item; rows before it stay valid and scanning resumes at the next
/// statement when there is one.
pub struct Segmenter<'a> {
    blob: &'a str,
    pos: usize,
    in_values: bool,
    /// A row group just closed; only `,`, `;` or a trailing clause may follow
    after_row: bool,
    finished: bool,
    statements: Vec<StatementHeader>,
}

impl<'a> Segmenter<'a> {
    pub fn new(blob: &'a str) -> Self {
        Self {
            blob,
            pos: 0,
            in_values: false,
            after_row: false,
            finished: false,
            statements: Vec::new(),
        }
    }

    /// Statement headers seen so far
    pub fn statements(&self) -> &[StatementHeader] {
        &self.statements
    }

    /// Consume the segmenter, returning the headers it saw
    pub fn into_statements(self) -> Vec<StatementHeader> {
        self.statements
    }

    fn current_statement(&self) -> usize {
        self.statements.len().saturating_sub(1)
    }

    fn open_statement(&mut self, stmt_start: usize, keyword: usize) {
        let header = &self.blob[stmt_start..keyword];
        let lead = header.len() - header.trim_start().len();
        let table = INSERT_TABLE_RE
            .captures(header)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());

        self.statements.push(StatementHeader {
            index: self.statements.len(),
            offset: stmt_start + lead,
            table,
        });
        self.pos = keyword + VALUES_KEYWORD.len();
        self.in_values = true;
        self.after_row = false;
    }

    /// Scan forward from the current position to the end of the next row
    fn scan_row(&mut self) -> Step<'a> {
        let bytes = self.blob.as_bytes();
        let mut state = ScanState::Default;
        let mut depth: usize = 0;
        let mut row_start = self.pos;
        let mut fragment_start = self.pos;
        let mut trailing = false;
        let mut i = self.pos;

        while i < bytes.len() {
            let b = bytes[i];
            let prev = state;
            state = state.step(b);

            if prev != ScanState::Default {
                i += 1;
                continue;
            }

            if depth == 0 {
                if let Some(end) = comment_end(bytes, i) {
                    i = end;
                    continue;
                }
                if b == b'\'' {
                    fragment_start = i;
                }
                if b != b';' {
                    if self.after_row && !trailing {
                        match b {
                            b',' => self.after_row = false,
                            // stray close parens between groups are tolerated
                            b')' => {}
                            b if b.is_ascii_whitespace() => {}
                            _ => trailing = true,
                        }
                    }
                    if trailing {
                        i += 1;
                        continue;
                    }
                }
            }

            match b {
                b'(' => {
                    depth += 1;
                    if depth == 1 {
                        row_start = i + 1;
                        fragment_start = i;
                    }
                }
                b')' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos = i + 1;
                        self.after_row = true;
                        return Step::Row(RawRow {
                            text: &self.blob[row_start..i],
                            offset: row_start,
                            statement: self.current_statement(),
                        });
                    }
                }
                b';' => {
                    self.pos = i + 1;
                    self.in_values = false;
                    self.after_row = false;
                    if depth > 0 {
                        return Step::Malformed(
                            self.malformed(MalformedKind::UnbalancedParens, fragment_start, i),
                        );
                    }
                    return Step::EndOfStatement;
                }
                _ => {}
            }
            i += 1;
        }

        self.pos = bytes.len();
        self.finished = true;

        if state.is_quoted() {
            Step::Malformed(self.malformed(
                MalformedKind::UnterminatedString,
                fragment_start,
                bytes.len(),
            ))
        } else if depth > 0 {
            Step::Malformed(self.malformed(
                MalformedKind::UnbalancedParens,
                fragment_start,
                bytes.len(),
            ))
        } else {
            Step::EndOfInput
        }
    }

    fn malformed(&self, kind: MalformedKind, start: usize, end: usize) -> MalformedInput {
        let fragment = &self.blob[start..end];
        let mut preview: String = fragment.chars().take(PREVIEW_CHARS).collect();
        if fragment.chars().nth(PREVIEW_CHARS).is_some() {
            preview.push_str("...");
        }
        MalformedInput {
            kind,
            statement: self.current_statement(),
            offset: start,
            preview,
        }
    }
}

impl<'a> Iterator for Segmenter<'a> {
    type Item = Result<RawRow<'a>, MalformedInput>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }

            if !self.in_values {
                match find_values_keyword(self.blob.as_bytes(), self.pos) {
                    Search::Found {
                        stmt_start,
                        keyword,
                    } => self.open_statement(stmt_start, keyword),
                    Search::Unterminated { quote } => {
                        self.finished = true;
                        self.pos = self.blob.len();
                        return Some(Err(self.malformed(
                            MalformedKind::UnterminatedString,
                            quote,
                            self.blob.len(),
                        )));
                    }
                    Search::Exhausted => {
                        self.finished = true;
                        return None;
                    }
                }
            }

            match self.scan_row() {
                Step::Row(row) => return Some(Ok(row)),
                Step::Malformed(m) => return Some(Err(m)),
                Step::EndOfStatement => continue,
                Step::EndOfInput => return None,
            }
        }
    }
}

enum Search {
    /// `stmt_start` is the position after the last `;` before the keyword
    Found { stmt_start: usize, keyword: usize },
    /// Input ended inside a literal or quoted identifier opened at `quote`
    Unterminated { quote: usize },
    Exhausted,
}

/// Locate the next `VALUES` keyword outside quotes, quoted identifiers and
/// comments.
fn find_values_keyword(bytes: &[u8], from: usize) -> Search {
    let mut state = ScanState::Default;
    let mut stmt_start = from;
    let mut quote_start = from;
    let mut i = from;

    while i < bytes.len() {
        let b = bytes[i];
        let prev = state;
        state = state.step(b);

        if prev == ScanState::Default {
            if let Some(end) = comment_end(bytes, i) {
                i = end;
                continue;
            }
            match b {
                b'\'' => quote_start = i,
                b'"' | b'`' => match memchr(b, &bytes[i + 1..]) {
                    Some(close) => {
                        i += close + 2;
                        continue;
                    }
                    None => return Search::Unterminated { quote: i },
                },
                b';' => stmt_start = i + 1,
                b'v' | b'V' if is_keyword_at(bytes, i, VALUES_KEYWORD) => {
                    return Search::Found {
                        stmt_start,
                        keyword: i,
                    };
                }
                _ => {}
            }
        }
        i += 1;
    }

    if state.is_quoted() {
        Search::Unterminated { quote: quote_start }
    } else {
        Search::Exhausted
    }
}

#[inline]
fn is_keyword_at(bytes: &[u8], at: usize, keyword: &[u8]) -> bool {
    let end = at + keyword.len();
    if end > bytes.len() || !bytes[at..end].eq_ignore_ascii_case(keyword) {
        return false;
    }
    let before_ok = at == 0 || !is_identifier_byte(bytes[at - 1]);
    let after_ok = end == bytes.len() || !is_identifier_byte(bytes[end]);
    before_ok && after_ok
}

/// Bytes that may continue an identifier, quoted identifiers included
#[inline]
fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'`' | b'"' | b'[' | b']')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(blob: &str) -> Vec<&str> {
        Segmenter::new(blob)
            .filter_map(Result::ok)
            .map(|r| r.text)
            .collect()
    }

    #[test]
    fn test_single_row_statement() {
        assert_eq!(
            rows("INSERT INTO T (a,b,c) VALUES ('Jo, Ann', NULL, 42);"),
            vec!["'Jo, Ann', NULL, 42"]
        );
    }

    #[test]
    fn test_batched_statement() {
        let blob = "INSERT INTO T (a) VALUES\n  ('x'),\n  ('y, z'),\n  (3);";
        assert_eq!(rows(blob), vec!["'x'", "'y, z'", "3"]);
    }

    #[test]
    fn test_repeated_statements_concatenate_in_order() {
        let blob = "INSERT INTO T (a) VALUES (1);\nINSERT INTO T (a) VALUES (2);\nINSERT INTO U (a) VALUES (3),(4);";
        assert_eq!(rows(blob), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_nested_parens_stay_in_row() {
        let blob = "INSERT INTO T VALUES (1, NOW(), COALESCE(NULL, (2)));";
        assert_eq!(rows(blob), vec!["1, NOW(), COALESCE(NULL, (2))"]);
    }

    #[test]
    fn test_quoted_parens_and_semicolons() {
        let blob = "INSERT INTO T VALUES ('a) ; (b', 'c');";
        assert_eq!(rows(blob), vec!["'a) ; (b', 'c'"]);
    }

    #[test]
    fn test_escaped_quote_does_not_toggle() {
        let blob = r"INSERT INTO T VALUES ('it\'s (fine)'), ('x');";
        assert_eq!(rows(blob), vec![r"'it\'s (fine)'", "'x'"]);
    }

    #[test]
    fn test_column_list_is_not_a_row() {
        let blob = "INSERT INTO T (a, b) VALUES (1, 2);";
        assert_eq!(rows(blob), vec!["1, 2"]);
    }

    #[test]
    fn test_other_statements_ignored() {
        let blob = "CREATE TABLE T (a TEXT, b TEXT);\nINSERT INTO T VALUES ('1', '2');\nSELECT COUNT(*) FROM T;";
        assert_eq!(rows(blob), vec!["'1', '2'"]);
    }

    #[test]
    fn test_values_inside_string_is_not_keyword() {
        let blob = "INSERT INTO T VALUES ('VALUES (9)');";
        assert_eq!(rows(blob), vec!["'VALUES (9)'"]);
    }

    #[test]
    fn test_values_as_identifier_part_is_not_keyword() {
        let blob = "INSERT INTO T (old_values, values_x) VALUES (1, 2);";
        assert_eq!(rows(blob), vec!["1, 2"]);
    }

    #[test]
    fn test_lowercase_keyword() {
        assert_eq!(rows("insert into t values (1),(2);"), vec!["1", "2"]);
    }

    #[test]
    fn test_comments_between_rows() {
        let blob = "INSERT INTO T VALUES -- first (ignored)\n(1), /* (x) */ (2);";
        assert_eq!(rows(blob), vec!["1", "2"]);
    }

    #[test]
    fn test_missing_terminator_at_end() {
        assert_eq!(rows("INSERT INTO T VALUES (1), (2)"), vec!["1", "2"]);
    }

    #[test]
    fn test_row_offsets_point_into_blob() {
        let blob = "INSERT INTO T VALUES (1), ('two');";
        for row in Segmenter::new(blob).filter_map(Result::ok) {
            assert_eq!(&blob[row.offset..row.offset + row.text.len()], row.text);
        }
    }

    #[test]
    fn test_statement_headers() {
        let blob = "-- dump\nINSERT INTO `Cases` (a) VALUES (1);\n  insert into kb.Articles VALUES (2);";
        let mut seg = Segmenter::new(blob);
        let rows: Vec<_> = seg.by_ref().filter_map(Result::ok).collect();
        assert_eq!(rows[0].statement, 0);
        assert_eq!(rows[1].statement, 1);

        let headers = seg.into_statements();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].table.as_deref(), Some("Cases"));
        assert_eq!(headers[1].table.as_deref(), Some("kb.Articles"));
        assert!(blob[headers[1].offset..].starts_with("insert into"));
    }

    #[test]
    fn test_unterminated_string_is_reported() {
        let items: Vec<_> = Segmenter::new("INSERT INTO T (a) VALUES ('unterminated").collect();
        assert_eq!(items.len(), 1);
        let err = items[0].as_ref().unwrap_err();
        assert_eq!(err.kind, MalformedKind::UnterminatedString);
        assert_eq!(err.statement, 0);
        assert!(err.preview.starts_with("('unterminated"));
    }

    #[test]
    fn test_unterminated_row_keeps_earlier_rows() {
        let items: Vec<_> = Segmenter::new("INSERT INTO T VALUES (1), (2), (3, 4").collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().text, "1");
        assert_eq!(items[1].as_ref().unwrap().text, "2");
        assert_eq!(
            items[2].as_ref().unwrap_err().kind,
            MalformedKind::UnbalancedParens
        );
    }

    #[test]
    fn test_semicolon_closes_open_row_and_scan_resumes() {
        let blob = "INSERT INTO T VALUES (1, 2;\nINSERT INTO T VALUES (3);";
        let items: Vec<_> = Segmenter::new(blob).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0].as_ref().unwrap_err().kind,
            MalformedKind::UnbalancedParens
        );
        assert_eq!(items[1].as_ref().unwrap().text, "3");
        assert_eq!(items[1].as_ref().unwrap().statement, 1);
    }

    #[test]
    fn test_unclosed_quote_before_values_is_reported() {
        let blob = "UPDATE t SET a = 'oops;\nINSERT INTO t (a) VALUES (1);";
        let items: Vec<_> = Segmenter::new(blob).collect();
        assert_eq!(items.len(), 1);
        let err = items[0].as_ref().unwrap_err();
        assert_eq!(err.kind, MalformedKind::UnterminatedString);
        assert_eq!(err.offset, blob.find('\'').unwrap());
    }

    #[test]
    fn test_quoted_identifier_with_apostrophe() {
        let blob = "INSERT INTO \"O'Hara\" (a) VALUES ('x');\nINSERT INTO `it's` VALUES ('y');";
        let mut seg = Segmenter::new(blob);
        let rows: Vec<_> = seg.by_ref().map(|r| r.unwrap().text).collect();
        assert_eq!(rows, vec!["'x'", "'y'"]);
        assert_eq!(seg.statements().len(), 2);
    }

    #[test]
    fn test_unclosed_quoted_identifier_is_reported() {
        let items: Vec<_> = Segmenter::new("INSERT INTO \"Cases VALUES ('x');").collect();
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].as_ref().unwrap_err().kind,
            MalformedKind::UnterminatedString
        );
    }

    #[test]
    fn test_trailing_clause_is_not_a_row() {
        assert_eq!(
            rows("INSERT INTO t (a, b) VALUES ('x', 'y') ON CONFLICT (a) DO NOTHING;"),
            vec!["'x', 'y'"]
        );
        assert_eq!(
            rows("INSERT INTO t VALUES (1), (2) ON DUPLICATE KEY UPDATE a = VALUES(a), b = (1);\nINSERT INTO t VALUES (3);"),
            vec!["1", "2", "3"]
        );
    }

    #[test]
    fn test_trailing_clause_quotes_still_tracked() {
        let blob = "INSERT INTO t VALUES (1) ON DUPLICATE KEY UPDATE b = 'a;(b';\nINSERT INTO t VALUES (2);";
        assert_eq!(rows(blob), vec!["1", "2"]);
    }

    #[test]
    fn test_no_insert_yields_nothing() {
        assert!(Segmenter::new("CREATE TABLE T (a INT);").next().is_none());
        assert!(Segmenter::new("").next().is_none());
    }

    #[test]
    fn test_malformed_display() {
        let err = Segmenter::new("INSERT INTO T VALUES ('abc")
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unterminated string literal in statement 0 at byte 21: ('abc"
        );
    }
}
