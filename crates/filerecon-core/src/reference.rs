//! Parsing of pasted reference tables.
//!
//! Input is whatever a user copies out of a spreadsheet: one row per line,
//! columns separated by tabs or by runs of two or more spaces. Column 0 is
//! the order reference, column 1 holds the identifier whose digits become
//! the token, and anything after that is kept as free text for reports.

use crate::token::Token;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;
use tracing::debug;

/// A keyword matches a first line containing its words as whole, adjacent
/// words, case-insensitively.
pub const DEFAULT_HEADER_KEYWORDS: &[&str] = &["OC", "ORDEN", "N° DE SUMINISTRO", "SUMINISTRO"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceRecord {
    pub token: Token,
    pub raw_primary_field: String,
    pub raw_secondary_field: String,
    pub free_text_rest: String,
}

/// Token -> record. A repeated token replaces the earlier record; the number
/// of replaced records is kept in `shadowed`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceSet {
    records: BTreeMap<Token, ReferenceRecord>,
    shadowed: usize,
}

impl ReferenceSet {
    pub fn insert(&mut self, record: ReferenceRecord) {
        if let Some(previous) = self.records.insert(record.token.clone(), record) {
            self.shadowed += 1;
            debug!(
                "Reference token {} repeated; keeping the later row (was '{}')",
                previous.token, previous.raw_primary_field
            );
        }
    }

    pub fn get(&self, token: &str) -> Option<&ReferenceRecord> {
        self.records.get(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.records.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records dropped because a later row reused their token.
    pub fn shadowed(&self) -> usize {
        self.shadowed
    }

    /// Tokens in ascending order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.records.keys()
    }

    pub fn records(&self) -> impl Iterator<Item = &ReferenceRecord> {
        self.records.values()
    }
}

impl FromIterator<ReferenceRecord> for ReferenceSet {
    fn from_iter<T: IntoIterator<Item = ReferenceRecord>>(iter: T) -> Self {
        let mut set = ReferenceSet::default();
        for record in iter {
            set.insert(record);
        }
        set
    }
}

#[derive(Debug, Clone)]
pub struct ReferenceParser {
    header_keywords: Vec<Vec<String>>,
}

impl Default for ReferenceParser {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_KEYWORDS.iter().copied())
    }
}

impl ReferenceParser {
    pub fn new<I, S>(header_keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            header_keywords: header_keywords
                .into_iter()
                .map(|k| {
                    k.as_ref()
                        .to_uppercase()
                        .split_whitespace()
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .filter(|words| !words.is_empty())
                .collect(),
        }
    }

    pub fn parse(&self, text: &str) -> ReferenceSet {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty()).peekable();

        if let Some(first) = lines.peek() {
            if self.is_header(first) {
                debug!("Skipping reference header row: {}", first.trim());
                lines.next();
            }
        }

        lines.filter_map(parse_line).collect()
    }

    fn is_header(&self, line: &str) -> bool {
        let upper = line.to_uppercase();
        let words: Vec<&str> = upper.split_whitespace().collect();
        self.header_keywords.iter().any(|keyword| {
            words
                .windows(keyword.len())
                .any(|window| window.iter().zip(keyword).all(|(w, k)| *w == k.as_str()))
        })
    }
}

fn column_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\t|\s{2,}").expect("separator pattern is valid"))
}

fn parse_line(line: &str) -> Option<ReferenceRecord> {
    let fields: Vec<&str> = column_separator()
        .split(line.trim())
        .map(str::trim)
        .collect();

    if fields.len() < 2 {
        return None;
    }

    let token = Token::from_digits(fields[1])?;
    Some(ReferenceRecord {
        token,
        raw_primary_field: fields[0].to_string(),
        raw_secondary_field: fields[1].to_string(),
        free_text_rest: fields[2..].join(" "),
    })
}

/// One requested name per line; blanks dropped, repeats removed keeping the
/// first occurrence.
pub fn parse_names(text: &str) -> Vec<Token> {
    let mut seen = HashSet::new();
    text.lines()
        .filter_map(|line| Token::new(line.trim()))
        .filter(|token| seen.insert(token.clone()))
        .collect()
}
