//! Case-insensitive keyword matching inside a single token.
//!
//! Offsets are character offsets (not byte offsets) so multi-byte text reports
//! the same positions a reader would count.

use std::fmt;

use anyhow::{Result, bail};

/// The literal students are asked to transform (e.g. `apple`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    raw: String,
    chars: Vec<char>,
}

impl Keyword {
    /// Build a keyword, rejecting empty input and embedded whitespace.
    ///
    /// Tokens never contain whitespace, so such a keyword could never match.
    pub fn new(raw: &str) -> Result<Self> {
        if raw.is_empty() {
            bail!("keyword must be non-empty");
        }
        if raw.chars().any(char::is_whitespace) {
            bail!("keyword must not contain whitespace");
        }
        Ok(Self {
            raw: raw.to_string(),
            chars: raw.chars().collect(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Keyword length in characters.
    pub fn width(&self) -> usize {
        self.chars.len()
    }

    /// Start offsets of every case-insensitive match, scanning left to right.
    ///
    /// Matches never overlap: after a hit the scan resumes past its end, so
    /// `"appleapple"` yields `[0, 5]`.
    pub fn find_occurrences(&self, token: &str) -> Vec<usize> {
        let chars: Vec<char> = token.chars().collect();
        let width = self.width();
        let mut offsets = Vec::new();
        let mut start = 0;
        while start + width <= chars.len() {
            if self.matches_at(&chars[start..start + width]) {
                offsets.push(start);
                start += width;
            } else {
                start += 1;
            }
        }
        offsets
    }

    /// True when `token` contains the keyword case-insensitively.
    pub fn occurs_in(&self, token: &str) -> bool {
        !self.find_occurrences(token).is_empty()
    }

    /// The keyword-length span of `token` starting at character `offset`.
    pub fn span<'a>(&self, token: &'a str, offset: usize) -> &'a str {
        let mut indices = token.char_indices().map(|(idx, _)| idx).skip(offset);
        let Some(begin) = indices.next() else {
            return "";
        };
        let end = indices.nth(self.width() - 1).unwrap_or(token.len());
        &token[begin..end]
    }

    fn matches_at(&self, window: &[char]) -> bool {
        window
            .iter()
            .zip(&self.chars)
            .all(|(left, right)| chars_eq_ignore_case(*left, *right))
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn chars_eq_ignore_case(left: char, right: char) -> bool {
    left == right || left.to_lowercase().eq(right.to_lowercase())
}

/// Uppercase in the usual string sense: at least one cased character and no
/// lowercase character. `"APPL3"` qualifies, `"123"` does not.
pub fn is_uppercase(text: &str) -> bool {
    let mut cased = false;
    for ch in text.chars() {
        if ch.is_lowercase() {
            return false;
        }
        if ch.is_uppercase() {
            cased = true;
        }
    }
    cased
}
