use crate::config::DEFAULT_TOKEN_PATTERN;
use crate::error::Error;
use regex::Regex;
use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;

/// Identifier used as the join key between expected items and files on disk.
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Returns `None` for empty input; blank strings never become tokens.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Token(value))
        }
    }

    /// Keep only the ASCII digits of `raw`.
    pub fn from_digits(raw: &str) -> Option<Self> {
        Token::new(digits_of(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn digits_of(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Extracts a token from a file name.
///
/// Uses capture group 1 when the pattern has one, otherwise the whole match.
#[derive(Debug, Clone)]
pub struct TokenPattern {
    regex: Regex,
    digits_only: bool,
}

impl TokenPattern {
    pub fn new(pattern: &str, digits_only: bool) -> Result<Self, Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            digits_only,
        })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn extract(&self, file_name: &str) -> Option<Token> {
        let captures = self.regex.captures(file_name)?;
        let matched = captures.get(1).or_else(|| captures.get(0))?.as_str();
        if self.digits_only {
            Token::from_digits(matched)
        } else {
            Token::new(matched)
        }
    }
}

impl Default for TokenPattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(DEFAULT_TOKEN_PATTERN).expect("default token pattern is valid"),
            digits_only: true,
        }
    }
}
