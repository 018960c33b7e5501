//! Descent Parser - backtracking recursive descent over a data grammar
//!
//! Given a [`Grammar`] and a [`TokenStream`], a [`ParseSession`] derives a
//! target symbol from a start position:
//!
//! - a **terminal** matches iff the token at the position has that kind;
//! - a quoted **literal** matches iff the token at the position has that text;
//! - `EOF` matches, consuming nothing, iff the position is past the last token;
//! - a **nonterminal** tries its alternatives in declaration order, matching
//!   each body left to right; the first alternative whose whole body matches
//!   wins and no later alternative is considered.
//!
//! Failure inside the alternative loop is an ordinary value ([`Failure`]),
//! not an error: it rolls the cursor back and moves on to the next
//! alternative. Only a failure escaping the top-level call becomes a
//! [`ParseError`].
//!
//! The session is generic over a [`MemoTable`]. [`Parser`] runs with
//! [`NoMemo`] (the plain core); [`PackratParser`] runs with a
//! [`PackratCache`] that derives each `(nonterminal, position)` at most once.
//! Both produce identical results.
//!
//! Limitations: left recursion without progress recurses forever, and very
//! deep or long inputs can exhaust the call stack.

pub mod memo;

use std::collections::BTreeSet;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

pub use memo::{MemoTable, NoMemo, PackratCache, PackratParser};

use crate::ast::{Arena, NodeData, NodeId, ParseTree, Span};
use crate::errors::ParseError;
use crate::grammar::{literal_text, Grammar, SymbolId, SymbolKind};
use crate::lexer::{Token, TokenStream};

// ============================================================================
// OUTCOMES AND STATISTICS
// ============================================================================

/// A successful derivation: the node built and the position after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub node: NodeId,
    pub end: usize,
}

/// A failed derivation of `symbol` at `position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Failure {
    pub symbol: SymbolId,
    pub position: usize,
}

pub type Outcome = Result<Match, Failure>;

/// Observational counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    /// Every call to [`ParseSession::derive`], terminals and cache hits included.
    pub calls: u64,
    /// Nonterminal derivations actually computed.
    pub derivations: u64,
    /// Alternatives attempted across all derivations.
    pub alternatives: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

/// Run-time parser configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Use the packrat cache.
    pub memoize: bool,
    /// Fail with [`ParseError::Incomplete`] unless every token is consumed.
    pub require_complete: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            memoize: true,
            require_complete: false,
        }
    }
}

// ============================================================================
// PARSE SESSION
// ============================================================================

/// One parse over one token sequence.
///
/// The session owns the tokens, the node arena and the memo table, and borrows
/// the grammar immutably, so cached outcomes stay valid for its whole life.
/// Several [`ParseSession::derive`] or [`ParseSession::parse`] calls on the
/// same session share the cache.
#[derive(Debug)]
pub struct ParseSession<'g, M: MemoTable> {
    grammar: &'g Grammar,
    tokens: TokenStream,
    arena: Arena,
    memo: M,
    stats: ParseStats,
    /// Furthest position where a terminal failed, and the terminals tried there.
    furthest: Option<(usize, BTreeSet<SymbolId>)>,
}

impl<'g, M: MemoTable> ParseSession<'g, M> {
    pub fn new(grammar: &'g Grammar, tokens: TokenStream, memo: M) -> Self {
        Self {
            grammar,
            tokens,
            arena: Arena::default(),
            memo,
            stats: ParseStats::default(),
            furthest: None,
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn tokens(&self) -> &TokenStream {
        &self.tokens
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }

    pub fn memo(&self) -> &M {
        &self.memo
    }

    /// Derives `target` starting at token `position`.
    ///
    /// The match may stop before the end of the input. On failure, `expected`
    /// lists the terminals attempted during this call; failures replayed from
    /// the cache of an earlier call on the same session add nothing.
    ///
    /// `position` may equal the token count (only nullable targets and `EOF`
    /// match there) but not exceed it.
    pub fn parse(&mut self, target: &str, position: usize) -> Result<ParseTree, ParseError> {
        let symbol = self
            .grammar
            .symbol(target)
            .ok_or_else(|| ParseError::UnknownSymbol {
                symbol: target.to_string(),
            })?;
        if position > self.tokens.len() {
            return Err(ParseError::PositionOutOfRange {
                position,
                len: self.tokens.len(),
            });
        }
        debug!(
            "parse '{}' from token {} of {}",
            target,
            position,
            self.tokens.len()
        );
        self.furthest = None;
        let outcome = self.derive(symbol, position);
        debug!("parse '{}' finished: {:?}", target, self.stats);
        match outcome {
            Ok(matched) => Ok(self.tree(matched)),
            Err(failure) => Err(self.no_match(target, failure)),
        }
    }

    /// Like [`ParseSession::parse`], but every token must be consumed.
    pub fn parse_complete(&mut self, target: &str, position: usize) -> Result<ParseTree, ParseError> {
        let tree = self.parse(target, position)?;
        let consumed = tree.span().end;
        match self.tokens.get(consumed) {
            None => Ok(tree),
            Some(token) => Err(ParseError::Incomplete {
                target: target.to_string(),
                consumed,
                total: self.tokens.len(),
                found: token.to_string(),
                span: (token.start..self.tokens.offset_of(self.tokens.len())).into(),
            }),
        }
    }

    /// Extracts the tree rooted at a successful match.
    pub fn tree(&self, matched: Match) -> ParseTree {
        ParseTree::compact(
            self.grammar.symbols().clone(),
            self.tokens.clone(),
            &self.arena,
            matched.node,
        )
    }

    /// Derives `symbol` at `position`, consulting the memo table for nonterminals.
    pub fn derive(&mut self, symbol: SymbolId, position: usize) -> Outcome {
        self.stats.calls += 1;
        if self.grammar.is_terminal(symbol) {
            return self.match_terminal(symbol, position);
        }
        if let Some(outcome) = self.memo.lookup(symbol, position) {
            self.stats.cache_hits += 1;
            trace!("[HIT] ({}, {})", self.grammar.name(symbol), position);
            return outcome;
        }
        if self.memo.caches() {
            self.stats.cache_misses += 1;
            trace!("[MISS] ({}, {})", self.grammar.name(symbol), position);
        }
        self.stats.derivations += 1;
        let outcome = self.derive_alternatives(symbol, position);
        self.memo.record(symbol, position, outcome);
        outcome
    }

    fn derive_alternatives(&mut self, symbol: SymbolId, position: usize) -> Outcome {
        let grammar = self.grammar;
        trace!("derive {} at {}", grammar.name(symbol), position);
        for rule in grammar.alternatives(symbol) {
            self.stats.alternatives += 1;
            let mark = self.arena.len();
            match self.match_sequence(&rule.body, position) {
                Some((children, end)) => {
                    trace!("  success {} [{}, {})", grammar.display_rule(rule), position, end);
                    let node = self.arena.push(NodeData {
                        symbol,
                        children,
                        token: None,
                        span: Span::new(position, end),
                    });
                    return Ok(Match { node, end });
                }
                None => {
                    trace!("  fail {} at {}", grammar.display_rule(rule), position);
                    // Without a cache nothing else can reference these nodes.
                    if !self.memo.caches() {
                        self.arena.truncate(mark);
                    }
                }
            }
        }
        Err(Failure { symbol, position })
    }

    fn match_sequence(&mut self, body: &[SymbolId], position: usize) -> Option<(Vec<NodeId>, usize)> {
        let mut children = Vec::with_capacity(body.len());
        let mut cursor = position;
        for &symbol in body {
            let matched = self.derive(symbol, cursor).ok()?;
            children.push(matched.node);
            cursor = matched.end;
        }
        Some((children, cursor))
    }

    fn match_terminal(&mut self, symbol: SymbolId, position: usize) -> Outcome {
        if self.grammar.kind(symbol) == SymbolKind::EndOfInput {
            if position == self.tokens.len() {
                let node = self.arena.push(NodeData {
                    symbol,
                    children: Vec::new(),
                    token: None,
                    span: Span::new(position, position),
                });
                return Ok(Match {
                    node,
                    end: position,
                });
            }
            self.note_expected(symbol, position);
            return Err(Failure { symbol, position });
        }
        match self.tokens.get(position) {
            Some(token) if self.accepts(symbol, token) => {
                let node = self.arena.push(NodeData {
                    symbol,
                    children: Vec::new(),
                    token: Some(position),
                    span: Span::new(position, position + 1),
                });
                Ok(Match {
                    node,
                    end: position + 1,
                })
            }
            _ => {
                self.note_expected(symbol, position);
                Err(Failure { symbol, position })
            }
        }
    }

    fn accepts(&self, symbol: SymbolId, token: &Token) -> bool {
        let name = self.grammar.name(symbol);
        match self.grammar.kind(symbol) {
            SymbolKind::Literal => literal_text(name) == Some(token.text.as_str()),
            _ => token.kind == name,
        }
    }

    fn note_expected(&mut self, symbol: SymbolId, position: usize) {
        match &mut self.furthest {
            Some((furthest, expected)) if *furthest == position => {
                expected.insert(symbol);
                return;
            }
            Some((furthest, _)) if *furthest > position => return,
            _ => {}
        }
        self.furthest = Some((position, BTreeSet::from([symbol])));
    }

    fn no_match(&self, target: &str, failure: Failure) -> ParseError {
        let (position, expected) = match &self.furthest {
            Some((position, symbols)) => {
                let mut names: Vec<String> = symbols
                    .iter()
                    .map(|&symbol| self.grammar.name(symbol).to_string())
                    .collect();
                names.sort();
                (*position, names)
            }
            None => (failure.position, Vec::new()),
        };
        let found = self.tokens.get(position);
        let offset = self.tokens.offset_of(position);
        let width = found.map_or(0, |token| token.text.len());
        ParseError::NoMatch {
            target: target.to_string(),
            position,
            expected,
            found: found.map(ToString::to_string),
            span: (offset..offset + width).into(),
        }
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// The plain backtracking parser, without memoization.
///
/// Exponential on grammars whose alternatives share long prefixes; see
/// [`PackratParser`].
#[derive(Debug, Clone, Copy)]
pub struct Parser<'g> {
    grammar: &'g Grammar,
}

impl<'g> Parser<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn session(&self, tokens: TokenStream) -> ParseSession<'g, NoMemo> {
        ParseSession::new(self.grammar, tokens, NoMemo)
    }

    /// Derives `target` from token `position`.
    pub fn parse(
        &self,
        tokens: &TokenStream,
        target: &str,
        position: usize,
    ) -> Result<ParseTree, ParseError> {
        self.session(tokens.clone()).parse(target, position)
    }

    pub fn parse_with_stats(
        &self,
        tokens: &TokenStream,
        target: &str,
        position: usize,
    ) -> (Result<ParseTree, ParseError>, ParseStats) {
        let mut session = self.session(tokens.clone());
        let result = session.parse(target, position);
        (result, session.stats())
    }

    /// Derives the start symbol from the first token, consuming every token.
    pub fn parse_complete(&self, tokens: &TokenStream) -> Result<ParseTree, ParseError> {
        self.session(tokens.clone())
            .parse_complete(self.grammar.start_name(), 0)
    }
}

/// Parses with either parser, as selected by `options`.
pub fn parse_with_options(
    grammar: &Grammar,
    tokens: &TokenStream,
    target: &str,
    position: usize,
    options: ParseOptions,
) -> (Result<ParseTree, ParseError>, ParseStats) {
    if options.memoize {
        let session = ParseSession::new(grammar, tokens.clone(), PackratCache::new());
        run(session, target, position, options)
    } else {
        let session = ParseSession::new(grammar, tokens.clone(), NoMemo);
        run(session, target, position, options)
    }
}

fn run<M: MemoTable>(
    mut session: ParseSession<'_, M>,
    target: &str,
    position: usize,
    options: ParseOptions,
) -> (Result<ParseTree, ParseError>, ParseStats) {
    let result = if options.require_complete {
        session.parse_complete(target, position)
    } else {
        session.parse(target, position)
    };
    (result, session.stats())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(kinds: &[&str]) -> TokenStream {
        kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| Token {
                kind: kind.to_string(),
                text: kind.to_string(),
                start: i,
                end: i + kind.len(),
                line: 1,
                column: i + 1,
            })
            .collect()
    }

    #[test]
    fn abandoned_alternatives_are_rolled_back_without_a_cache() {
        let grammar = Grammar::from_notation("S -> a b c | a b").unwrap();
        let mut session = Parser::new(&grammar).session(tokens(&["a", "b"]));
        let tree = session.parse("S", 0).unwrap();
        assert_eq!(tree.node_count(), 3);
        assert_eq!(session.arena.len(), 3);
    }

    #[test]
    fn furthest_failure_collects_expected_terminals() {
        let grammar = Grammar::from_notation("S -> a b | a c").unwrap();
        let err = Parser::new(&grammar)
            .parse(&tokens(&["a", "d"]), "S", 0)
            .unwrap_err();
        match err {
            ParseError::NoMatch {
                position, expected, ..
            } => {
                assert_eq!(position, 1);
                assert_eq!(expected, ["b", "c"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn literals_match_token_text() {
        let grammar = Grammar::from_notation("S -> 'if' word | word").unwrap();
        let mut words = tokens(&["word", "word"]);
        let tree = Parser::new(&grammar).parse(&words, "S", 0).unwrap();
        assert_eq!(tree.span().end, 1);

        words = vec![
            Token {
                kind: "word".into(),
                text: "if".into(),
                start: 0,
                end: 2,
                line: 1,
                column: 1,
            },
            Token {
                kind: "word".into(),
                text: "x".into(),
                start: 3,
                end: 4,
                line: 1,
                column: 4,
            },
        ]
        .into();
        let tree = Parser::new(&grammar).parse(&words, "S", 0).unwrap();
        assert!(tree.root().matches_production("S", &["'if'", "word"]));
        assert_eq!(tree.root().child(0).unwrap().text(), "if");
    }

    #[test]
    fn end_of_input_consumes_nothing() {
        let grammar = Grammar::from_notation("S -> a EOF | a a EOF").unwrap();
        let tree = Parser::new(&grammar).parse(&tokens(&["a", "a"]), "S", 0).unwrap();
        assert!(tree.root().matches_production("S", &["a", "a", "EOF"]));
        let eof = tree.root().child(2).unwrap();
        assert_eq!(eof.span(), Span::new(2, 2));
        assert!(eof.token().is_none());

        let err = Parser::new(&grammar)
            .parse(&tokens(&["a", "a", "b"]), "S", 0)
            .unwrap_err();
        match err {
            ParseError::NoMatch {
                position, expected, ..
            } => {
                assert_eq!(position, 2);
                assert_eq!(expected, ["EOF"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn options_default_to_memoized_prefix_parsing() {
        let options: ParseOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ParseOptions::default());
        assert!(options.memoize);
        assert!(!options.require_complete);
    }
}
