//! Descent Grammar Model
//!
//! A grammar is plain data: an ordered list of productions `head -> body`, a
//! start symbol, and a predicate telling terminal names from nonterminal names.
//! Rules sharing a head are ordered alternatives; the parser tries them in
//! declaration order and the first full match wins.
//!
//! Symbol names are interned into dense [`SymbolId`]s when the grammar is
//! built, together with their [`SymbolKind`], so the parser dispatches through
//! a lookup table instead of re-classifying names.
//!
//! Two spellings are reserved regardless of the terminal predicate: a quoted
//! name such as `'let'` is a literal matched against token text, and `EOF`
//! matches only at the end of the input.

pub mod notation;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::GrammarError;

// ============================================================================
// SYMBOLS
// ============================================================================

/// Dense index of an interned grammar symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Matched directly against one token's kind.
    Terminal,
    /// A quoted literal, matched against one token's text.
    Literal,
    /// `EOF`: matches no token, and only after the last one.
    EndOfInput,
    /// Defined by zero or more alternative productions.
    Nonterminal,
}

impl SymbolKind {
    /// Whether the parser matches this kind directly instead of expanding rules.
    pub fn is_terminal(self) -> bool {
        self != SymbolKind::Nonterminal
    }
}

/// Name of the end-of-input symbol.
pub const END_OF_INPUT: &str = "EOF";

/// The text of a quoted literal symbol such as `'let'`.
pub fn literal_text(name: &str) -> Option<&str> {
    name.strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .filter(|text| !text.is_empty())
}

/// Interned names and kinds, shared by a grammar and every tree parsed with it.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    names: Vec<String>,
    kinds: Vec<SymbolKind>,
    index: HashMap<String, SymbolId>,
}

impl SymbolTable {
    fn intern(&mut self, name: &str, kind: SymbolKind) -> SymbolId {
        if let Some(&id) = self.index.get(name) {
            return id;
        }
        let id = SymbolId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.kinds.push(kind);
        self.index.insert(name.to_string(), id);
        id
    }

    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.index.get(name).copied()
    }

    pub fn name(&self, id: SymbolId) -> &str {
        &self.names[id.index()]
    }

    pub fn kind(&self, id: SymbolId) -> SymbolKind {
        self.kinds[id.index()]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &str, SymbolKind)> + '_ {
        self.names
            .iter()
            .zip(&self.kinds)
            .enumerate()
            .map(|(i, (name, &kind))| (SymbolId(i as u32), name.as_str(), kind))
    }
}

/// Decides whether a symbol name denotes a terminal.
///
/// The default classifies lowercase-initial names as terminals, so `add_op`
/// is a terminal and `AddExpr` a nonterminal.
#[derive(Clone)]
pub struct TerminalPredicate(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl TerminalPredicate {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    pub fn lowercase_initial() -> Self {
        Self::new(|name| name.chars().next().is_some_and(char::is_lowercase))
    }

    /// Treats exactly the given names as terminals.
    pub fn one_of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        Self::new(move |name| names.iter().any(|terminal| terminal == name))
    }

    pub fn is_terminal(&self, name: &str) -> bool {
        (self.0)(name)
    }
}

impl Default for TerminalPredicate {
    fn default() -> Self {
        Self::lowercase_initial()
    }
}

impl fmt::Debug for TerminalPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TerminalPredicate(..)")
    }
}

// ============================================================================
// RULES AND GRAMMAR
// ============================================================================

/// One production. An empty body matches the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub head: SymbolId,
    pub body: Vec<SymbolId>,
}

/// An immutable, interned grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    symbols: Arc<SymbolTable>,
    rules: Vec<Rule>,
    /// Rule indices per symbol, in declaration order.
    alternatives: Vec<Vec<usize>>,
    start: SymbolId,
}

impl Grammar {
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::default()
    }

    /// Builds a grammar from `(head, body)` pairs with the default predicate.
    ///
    /// ```rust
    /// use descent::grammar::Grammar;
    ///
    /// let grammar = Grammar::new(
    ///     [("S", vec!["zero", "S", "one"]), ("S", vec![])],
    ///     "S",
    /// )
    /// .unwrap();
    /// assert_eq!(grammar.alternatives(grammar.start()).count(), 2);
    /// ```
    pub fn new<I, H, B, S>(rules: I, start: &str) -> Result<Self, GrammarError>
    where
        I: IntoIterator<Item = (H, B)>,
        H: Into<String>,
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder().rules(rules).start(start).build()
    }

    /// Parses the `Head -> a B | c` notation; see [`notation`].
    pub fn from_notation(text: &str) -> Result<Self, GrammarError> {
        Self::builder().notation(text)?.build()
    }

    pub fn start(&self) -> SymbolId {
        self.start
    }

    pub fn start_name(&self) -> &str {
        self.symbols.name(self.start)
    }

    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    pub fn symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbols.get(name)
    }

    pub fn name(&self, id: SymbolId) -> &str {
        self.symbols.name(id)
    }

    pub fn kind(&self, id: SymbolId) -> SymbolKind {
        self.symbols.kind(id)
    }

    pub fn is_terminal(&self, id: SymbolId) -> bool {
        self.kind(id).is_terminal()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The productions for `head`, in the order they are tried.
    pub fn alternatives(&self, head: SymbolId) -> impl Iterator<Item = &Rule> + '_ {
        self.alternatives[head.index()]
            .iter()
            .map(move |&rule| &self.rules[rule])
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols
            .iter()
            .filter(|&(_, _, kind)| kind == SymbolKind::Nonterminal)
            .map(|(id, _, _)| id)
    }

    /// Every symbol matched directly: token kinds, literals and `EOF`.
    pub fn terminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols
            .iter()
            .filter(|&(_, _, kind)| kind.is_terminal())
            .map(|(id, _, _)| id)
    }

    /// Texts of the quoted literals, in reverse lexicographic order so that a
    /// literal is tried before any of its prefixes.
    pub fn keywords(&self) -> Vec<&str> {
        let mut keywords: Vec<&str> = self
            .symbols
            .iter()
            .filter(|&(_, _, kind)| kind == SymbolKind::Literal)
            .filter_map(|(_, name, _)| literal_text(name))
            .collect();
        keywords.sort_unstable_by(|a, b| b.cmp(a));
        keywords
    }

    /// Nonterminals that are referenced but have no rule. Parsing them always fails.
    pub fn undefined_nonterminals(&self) -> Vec<&str> {
        self.nonterminals()
            .filter(|id| self.alternatives[id.index()].is_empty())
            .map(|id| self.name(id))
            .collect()
    }

    /// Renders one rule as `Head -> a b`.
    pub fn display_rule(&self, rule: &Rule) -> String {
        let body: Vec<&str> = rule.body.iter().map(|&symbol| self.name(symbol)).collect();
        if body.is_empty() {
            format!("{} -> {}", self.name(rule.head), notation::EMPTY)
        } else {
            format!("{} -> {}", self.name(rule.head), body.join(" "))
        }
    }
}

/// Prints the grammar back in notation form, one head per line.
impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut heads: Vec<SymbolId> = Vec::new();
        for rule in &self.rules {
            if !heads.contains(&rule.head) {
                heads.push(rule.head);
            }
        }
        for head in heads {
            let bodies: Vec<String> = self
                .alternatives(head)
                .map(|rule| match rule.body.as_slice() {
                    [] => notation::EMPTY.to_string(),
                    body => body
                        .iter()
                        .map(|&symbol| self.name(symbol))
                        .collect::<Vec<_>>()
                        .join(" "),
                })
                .collect();
            writeln!(f, "{} -> {}", self.name(head), bodies.join(" | "))?;
        }
        Ok(())
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Collects productions before interning them into a [`Grammar`].
#[derive(Debug, Clone, Default)]
pub struct GrammarBuilder {
    rules: Vec<(String, Vec<String>)>,
    start: Option<String>,
    predicate: TerminalPredicate,
}

impl GrammarBuilder {
    pub fn rule<B, S>(mut self, head: impl Into<String>, body: B) -> Self
    where
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules
            .push((head.into(), body.into_iter().map(Into::into).collect()));
        self
    }

    pub fn rules<I, H, B, S>(self, rules: I) -> Self
    where
        I: IntoIterator<Item = (H, B)>,
        H: Into<String>,
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        rules
            .into_iter()
            .fold(self, |builder, (head, body)| builder.rule(head, body))
    }

    /// Adds every production written in `text`.
    pub fn notation(self, text: &str) -> Result<Self, GrammarError> {
        Ok(self.rules(notation::parse_rules(text)?))
    }

    /// Defaults to the head of the first rule.
    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    pub fn predicate(mut self, predicate: TerminalPredicate) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        let start_name = match (&self.start, self.rules.first()) {
            (Some(start), _) => start.clone(),
            (None, Some((head, _))) => head.clone(),
            (None, None) => return Err(GrammarError::Empty),
        };

        let mut symbols = SymbolTable::default();
        let mut rules = Vec::with_capacity(self.rules.len());
        for (index, (head, body)) in self.rules.iter().enumerate() {
            if head.is_empty() {
                return Err(GrammarError::EmptyHead { rule: index });
            }
            if self.kind_of(head).is_terminal() {
                return Err(GrammarError::TerminalHead { head: head.clone() });
            }
            let head = symbols.intern(head, SymbolKind::Nonterminal);
            let body = body
                .iter()
                .filter(|symbol| !symbol.is_empty())
                .map(|symbol| symbols.intern(symbol, self.kind_of(symbol)))
                .collect();
            rules.push(Rule { head, body });
        }

        let start = symbols
            .get(&start_name)
            .ok_or(GrammarError::UnknownStart { start: start_name })?;

        let mut alternatives = vec![Vec::new(); symbols.len()];
        for (index, rule) in rules.iter().enumerate() {
            alternatives[rule.head.index()].push(index);
        }

        Ok(Grammar {
            symbols: Arc::new(symbols),
            rules,
            alternatives,
            start,
        })
    }

    fn kind_of(&self, name: &str) -> SymbolKind {
        if name == END_OF_INPUT {
            SymbolKind::EndOfInput
        } else if literal_text(name).is_some() {
            SymbolKind::Literal
        } else if self.predicate.is_terminal(name) {
            SymbolKind::Terminal
        } else {
            SymbolKind::Nonterminal
        }
    }
}
