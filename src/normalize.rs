//! OCR text normalization.
//!
//! Recognizer output is noisy: stray punctuation, line breaks, spaces between
//! glyph groups. A reading only becomes a candidate token when, after cleanup,
//! it is long enough and carries at least one digit.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Minimum length of an accepted token.
pub const MIN_TOKEN_LEN: usize = 8;

/// Canonical item identifier: ASCII alphanumeric, at least `MIN_TOKEN_LEN`
/// characters, at least one digit.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn first_char(&self) -> Option<char> {
        self.0.chars().next()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9]").expect("static regex"))
}

/// Clean raw recognizer text into a token, or reject it with `None`.
pub fn normalize(raw: &str) -> Option<Token> {
    let compact: String = raw.split_whitespace().collect();
    let cleaned = non_alphanumeric().replace_all(&compact, "");
    if cleaned.len() >= MIN_TOKEN_LEN && cleaned.bytes().any(|b| b.is_ascii_digit()) {
        Some(Token(cleaned.into_owned()))
    } else {
        None
    }
}
