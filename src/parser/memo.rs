//! Packrat memoization.
//!
//! A [`MemoTable`] remembers the outcome of deriving a nonterminal at a
//! position. Because the grammar and tokens of a session are immutable, that
//! outcome (including failure) never changes, so a cached entry is returned as
//! is. With every `(nonterminal, position)` derived at most once, parsing is
//! polynomial in the input length even on grammars whose alternatives share
//! long prefixes.
//!
//! Cached matches refer to nodes in the session arena. Those nodes are never
//! removed, so a subtree can be shared by every parent that reuses it.

use std::collections::HashMap;

use crate::ast::ParseTree;
use crate::errors::ParseError;
use crate::grammar::{Grammar, SymbolId};
use crate::lexer::TokenStream;

use super::{Outcome, ParseSession, ParseStats};

/// Storage for derivation outcomes, keyed by `(nonterminal, position)`.
pub trait MemoTable {
    fn lookup(&self, symbol: SymbolId, position: usize) -> Option<Outcome>;

    fn record(&mut self, symbol: SymbolId, position: usize, outcome: Outcome);

    /// Whether recorded outcomes are ever returned by [`MemoTable::lookup`].
    fn caches(&self) -> bool {
        true
    }
}

/// Remembers nothing; every call is derived from scratch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMemo;

impl MemoTable for NoMemo {
    fn lookup(&self, _symbol: SymbolId, _position: usize) -> Option<Outcome> {
        None
    }

    fn record(&mut self, _symbol: SymbolId, _position: usize, _outcome: Outcome) {}

    fn caches(&self) -> bool {
        false
    }
}

/// The packrat cache. Entries are written once and never evicted.
#[derive(Debug, Clone, Default)]
pub struct PackratCache {
    entries: HashMap<(SymbolId, usize), Outcome>,
}

impl PackratCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, symbol: SymbolId, position: usize) -> Option<&Outcome> {
        self.entries.get(&(symbol, position))
    }
}

impl MemoTable for PackratCache {
    fn lookup(&self, symbol: SymbolId, position: usize) -> Option<Outcome> {
        self.entries.get(&(symbol, position)).copied()
    }

    fn record(&mut self, symbol: SymbolId, position: usize, outcome: Outcome) {
        let previous = self.entries.insert((symbol, position), outcome);
        debug_assert!(
            previous.is_none(),
            "({symbol:?}, {position}) derived twice in one session"
        );
    }
}

/// The memoized parser. Same interface and results as [`super::Parser`].
#[derive(Debug, Clone, Copy)]
pub struct PackratParser<'g> {
    grammar: &'g Grammar,
}

impl<'g> PackratParser<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self { grammar }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// A session with a fresh cache scoped to `tokens`.
    pub fn session(&self, tokens: TokenStream) -> ParseSession<'g, PackratCache> {
        ParseSession::new(self.grammar, tokens, PackratCache::new())
    }

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

    pub fn parse_complete(&self, tokens: &TokenStream) -> Result<ParseTree, ParseError> {
        self.session(tokens.clone())
            .parse_complete(self.grammar.start_name(), 0)
    }
}
