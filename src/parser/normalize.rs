//! Field normalization.
//!
//! Maps each raw [`FieldToken`] to a canonical [`Value`]. Quoted literals keep
//! their content byte-for-byte (escape markers included); bare literals are
//! trimmed and the keyword `NULL` collapses to [`Value::Null`].

use super::tokenize::FieldToken;
use serde::Serialize;
use std::fmt;

/// A normalized field value.
///
/// Numeric literals stay text: coercion is left to whatever consumes the row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// String content, quotes stripped, escapes unresolved
    Text(String),
    /// SQL NULL, distinct from the empty string
    Null,
}

impl Value {
    /// Check if this is the null sentinel
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the text, or `None` for NULL
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Null => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Null => write!(f, "NULL"),
        }
    }
}

/// Normalize one token into a value
pub fn normalize(token: FieldToken<'_>) -> Value {
    match token {
        FieldToken::Quoted(content) => Value::Text(content.to_string()),
        FieldToken::Bare(raw) => {
            let trimmed = raw.trim();
            if trimmed.eq_ignore_ascii_case("NULL") {
                Value::Null
            } else {
                Value::Text(trimmed.to_string())
            }
        }
    }
}
