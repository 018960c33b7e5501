//! Descent Tokenizer
//!
//! Converts source text into an ordered sequence of tagged [`Token`]s using
//! prioritized regular-expression matching.
//!
//! At each cursor position the patterns are tried in declaration order and the
//! first one matching a non-empty prefix wins. This is prioritized alternation,
//! not longest match: `[("int", r"\d+"), ("float", r"\d+\.\d+")]` never
//! produces a `float`. Tokens tile the input with no gaps and no overlaps.
//!
//! A pattern that can only match the empty string never fires. Patterns that
//! can match either way only fire on their non-empty matches.

use std::collections::HashSet;
use std::fmt;
use std::iter::FusedIterator;
use std::ops::{Deref, Range};
use std::sync::Arc;

use log::trace;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::LexError;

/// Maximum number of characters of unmatched input quoted in a [`LexError`].
const PREVIEW_CHARS: usize = 20;

/// Token kind given to grammar keywords by [`Tokenizer::with_keywords`].
pub const KEYWORD: &str = "keyword";

// ============================================================================
// CORE DATA STRUCTURES
// ============================================================================

/// A tagged slice of the source text.
///
/// `start` and `end` are byte offsets; `line` and `column` are 1-based and
/// `column` counts characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub kind: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.kind, self.text)
    }
}

/// One `(kind, pattern)` entry of a token table.
#[derive(Debug, Clone)]
pub struct TokenPattern {
    kind: String,
    pattern: String,
    regex: Regex,
}

impl TokenPattern {
    /// Compiles `pattern`, anchored so it only matches at the cursor.
    pub fn new(kind: impl Into<String>, pattern: impl Into<String>) -> Result<Self, LexError> {
        let kind = kind.into();
        let pattern = pattern.into();
        let regex = Regex::new(&format!("^(?:{pattern})")).map_err(|source| {
            LexError::InvalidPattern {
                kind: kind.clone(),
                pattern: pattern.clone(),
                source,
            }
        })?;
        Ok(Self {
            kind,
            pattern,
            regex,
        })
    }

    /// Matches `text` exactly. A literal ending in a word character must
    /// also end at a word boundary, so `let` does not match inside `letter`.
    pub fn literal(kind: impl Into<String>, text: &str) -> Result<Self, LexError> {
        let ends_in_word = text
            .chars()
            .last()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        let boundary = if ends_in_word { r"\b" } else { "" };
        Self::new(kind, format!("{}{boundary}", regex::escape(text)))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Length in bytes of the non-empty match at the start of `rest`.
    fn match_len(&self, rest: &str) -> Option<usize> {
        self.regex
            .find(rest)
            .map(|found| found.end())
            .filter(|&len| len > 0)
    }
}

// ============================================================================
// TOKENIZER
// ============================================================================

/// A compiled token table plus the set of kinds dropped by [`Tokenizer::tokenize`].
///
/// The tokenizer holds no per-input state; every call to [`Tokenizer::tokens`]
/// starts from scratch.
#[derive(Debug, Clone, Default)]
pub struct Tokenizer {
    patterns: Vec<TokenPattern>,
    skip: HashSet<String>,
}

impl Tokenizer {
    /// Compiles an ordered list of `(kind, pattern)` definitions.
    pub fn new<I, K, P>(definitions: I) -> Result<Self, LexError>
    where
        I: IntoIterator<Item = (K, P)>,
        K: Into<String>,
        P: Into<String>,
    {
        let patterns = definitions
            .into_iter()
            .map(|(kind, pattern)| TokenPattern::new(kind, pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_patterns(patterns))
    }

    pub fn from_patterns(patterns: Vec<TokenPattern>) -> Self {
        Self {
            patterns,
            skip: HashSet::new(),
        }
    }

    /// Token kinds (typically whitespace and comments) that
    /// [`Tokenizer::tokenize`] leaves out of the stream.
    pub fn with_skip<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skip.extend(kinds.into_iter().map(Into::into));
        self
    }

    /// Puts a [`KEYWORD`] pattern for each literal ahead of the existing table.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Result<Self, LexError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = keywords
            .into_iter()
            .map(|keyword| TokenPattern::literal(KEYWORD, keyword.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        patterns.append(&mut self.patterns);
        self.patterns = patterns;
        Ok(self)
    }

    pub fn patterns(&self) -> &[TokenPattern] {
        &self.patterns
    }

    pub fn skips(&self, kind: &str) -> bool {
        self.skip.contains(kind)
    }

    /// Lazily tokenizes `text`. Every token is yielded, including skip kinds.
    ///
    /// The iterator stops after the first error.
    pub fn tokens<'t, 's>(&'t self, text: &'s str) -> Tokens<'t, 's> {
        Tokens {
            tokenizer: self,
            text,
            cursor: 0,
            line: 1,
            column: 1,
            failed: false,
        }
    }

    /// Tokenizes all of `text` into a shared stream, dropping skip kinds.
    pub fn tokenize(&self, text: &str) -> Result<TokenStream, LexError> {
        let mut tokens = Vec::new();
        for token in self.tokens(text) {
            let token = token?;
            if !self.skips(&token.kind) {
                tokens.push(token);
            }
        }
        Ok(TokenStream::from(tokens))
    }
}

/// Lazy token iterator returned by [`Tokenizer::tokens`].
#[derive(Debug, Clone)]
pub struct Tokens<'t, 's> {
    tokenizer: &'t Tokenizer,
    text: &'s str,
    cursor: usize,
    line: usize,
    column: usize,
    failed: bool,
}

impl Tokens<'_, '_> {
    fn advance(&mut self, matched: &str) {
        self.cursor += matched.len();
        match matched.rfind('\n') {
            Some(last_newline) => {
                self.line += matched.matches('\n').count();
                self.column = matched[last_newline + 1..].chars().count() + 1;
            }
            None => self.column += matched.chars().count(),
        }
    }

    fn no_match(&self, rest: &str) -> LexError {
        let preview: String = rest.chars().take(PREVIEW_CHARS).collect();
        let width = rest.chars().next().map_or(0, char::len_utf8);
        LexError::NoMatch {
            position: self.cursor,
            line: self.line,
            column: self.column,
            preview,
            span: (self.cursor..self.cursor + width).into(),
        }
    }
}

impl Iterator for Tokens<'_, '_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.cursor..];
        for pattern in &self.tokenizer.patterns {
            if let Some(len) = pattern.match_len(rest) {
                let matched = &rest[..len];
                let token = Token {
                    kind: pattern.kind.clone(),
                    text: matched.to_string(),
                    start: self.cursor,
                    end: self.cursor + len,
                    line: self.line,
                    column: self.column,
                };
                trace!("lex {} at {}:{}", token, token.line, token.column);
                self.advance(matched);
                return Some(Ok(token));
            }
        }
        self.failed = true;
        Some(Err(self.no_match(rest)))
    }
}

impl FusedIterator for Tokens<'_, '_> {}

// ============================================================================
// SHARED TOKEN BUFFER
// ============================================================================

/// Read-only token buffer shared by a parse session and every node it builds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenStream(Arc<[Token]>);

impl TokenStream {
    /// Concatenated text of the tokens in `range` (token indices). Empty when
    /// the range lies outside the stream.
    pub fn text(&self, range: Range<usize>) -> String {
        self.slice(range)
            .iter()
            .map(|token| token.text.as_str())
            .collect()
    }

    /// The tokens in `range`, or none when the range lies outside the stream.
    pub fn slice(&self, range: Range<usize>) -> &[Token] {
        self.0.get(range).unwrap_or(&[])
    }

    /// Byte offset in the source where token `position` starts, or where the
    /// last token ends when `position` is past the end.
    pub fn offset_of(&self, position: usize) -> usize {
        match self.0.get(position) {
            Some(token) => token.start,
            None => self.0.last().map_or(0, |token| token.end),
        }
    }

    /// A new stream without the tokens of the given kinds.
    pub fn without_kinds(&self, kinds: &[&str]) -> TokenStream {
        self.0
            .iter()
            .filter(|token| !kinds.contains(&token.kind.as_str()))
            .cloned()
            .collect()
    }
}

/// A rewrite of the token stream applied between tokenizing and parsing,
/// for layout rules a grammar cannot express (merging newlines into
/// statement terminators, for instance).
#[derive(Clone)]
pub struct TokenTransform(Arc<dyn Fn(TokenStream) -> TokenStream + Send + Sync>);

impl TokenTransform {
    pub fn new<F>(transform: F) -> Self
    where
        F: Fn(TokenStream) -> TokenStream + Send + Sync + 'static,
    {
        Self(Arc::new(transform))
    }

    pub fn apply(&self, tokens: TokenStream) -> TokenStream {
        (self.0)(tokens)
    }
}

impl fmt::Debug for TokenTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenTransform(..)")
    }
}

impl Default for TokenStream {
    fn default() -> Self {
        Self::from(Vec::new())
    }
}

impl Deref for TokenStream {
    type Target = [Token];

    fn deref(&self) -> &[Token] {
        &self.0
    }
}

impl From<Vec<Token>> for TokenStream {
    fn from(tokens: Vec<Token>) -> Self {
        Self(Arc::from(tokens))
    }
}

impl FromIterator<Token> for TokenStream {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}
