//! Whitespace tokenization and candidate-token filtering.

use crate::core::keyword::Keyword;

/// A maximal whitespace-delimited run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    /// Byte offset of the token in the source text.
    pub position: usize,
}

/// Split `content` on runs of whitespace, keeping source order.
pub fn tokenize(content: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (idx, ch) in content.char_indices() {
        match (ch.is_whitespace(), start) {
            (true, Some(begin)) => {
                tokens.push(Token {
                    text: &content[begin..idx],
                    position: begin,
                });
                start = None;
            }
            (false, None) => start = Some(idx),
            _ => {}
        }
    }
    if let Some(begin) = start {
        tokens.push(Token {
            text: &content[begin..],
            position: begin,
        });
    }
    tokens
}

/// Tokens that contain `keyword` case-insensitively, in source order.
pub fn candidate_tokens<'a>(content: &'a str, keyword: &Keyword) -> Vec<Token<'a>> {
    tokenize(content)
        .into_iter()
        .filter(|token| keyword.occurs_in(token.text))
        .collect()
}
