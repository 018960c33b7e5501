//! Descent Error Handling
//!
//! Every failure the engine can surface is one of the enums in this module.
//! All of them are `miette` diagnostics with stable codes, so callers can either
//! match on the variants or hand them to a [`miette::Report`] for rendering.
//!
//! Parse *failures* during alternative exploration are not errors: they are
//! plain values inside the parser (see [`crate::parser::Failure`]) and only
//! become a [`ParseError`] when they escape the top-level call.

use miette::{Diagnostic, NamedSource, Report, SourceSpan};
use thiserror::Error;

use crate::ast::Span;

// ============================================================================
// LEXING
// ============================================================================

/// Raised by the tokenizer. Fatal to tokenization.
///
/// Spans are byte offsets into the tokenized text; pass the error through
/// [`render`] with that text to get a labelled snippet.
#[derive(Debug, Error, Diagnostic)]
pub enum LexError {
    #[error("Lex error: no token pattern matches at line {line}, column {column}: {preview:?}")]
    #[diagnostic(
        code(descent::lex::no_match),
        help("add a token pattern that recognizes this text, or a catch-all pattern such as `.`")
    )]
    NoMatch {
        /// Byte offset of the first unrecognized character.
        position: usize,
        line: usize,
        column: usize,
        /// A bounded preview of the unmatched remainder.
        preview: String,
        #[label("unrecognized input")]
        span: SourceSpan,
    },

    #[error("Lex error: invalid pattern {pattern:?} for token kind '{kind}'")]
    #[diagnostic(code(descent::lex::invalid_pattern))]
    InvalidPattern {
        kind: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl LexError {
    /// Byte offset of the failure, when the error is tied to the input text.
    pub fn position(&self) -> Option<usize> {
        match self {
            LexError::NoMatch { position, .. } => Some(*position),
            LexError::InvalidPattern { .. } => None,
        }
    }
}

// ============================================================================
// PARSING
// ============================================================================

/// A parse that could not derive the requested symbol.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ParseError {
    #[error(
        "Parse error: cannot derive '{target}': expected {} at token {position}, found {}",
        one_of(.expected),
        found_or_end(.found)
    )]
    #[diagnostic(code(descent::parse::no_match))]
    NoMatch {
        target: String,
        /// Furthest token index at which a terminal was attempted.
        position: usize,
        /// Terminal names attempted at `position`, sorted.
        expected: Vec<String>,
        /// The token found at `position`, if any.
        found: Option<String>,
        #[label("parsing stopped here")]
        span: SourceSpan,
    },

    #[error("Parse error: '{target}' matched {consumed} of {total} tokens; unexpected {found}")]
    #[diagnostic(
        code(descent::parse::incomplete),
        help("the start symbol matched a prefix of the input; the grammar has no rule for the rest")
    )]
    Incomplete {
        target: String,
        consumed: usize,
        total: usize,
        found: String,
        #[label("trailing input")]
        span: SourceSpan,
    },

    #[error("Parse error: unknown symbol '{symbol}'")]
    #[diagnostic(code(descent::parse::unknown_symbol))]
    UnknownSymbol { symbol: String },

    #[error("Parse error: start position {position} is past the end of {len} tokens")]
    #[diagnostic(code(descent::parse::position_out_of_range))]
    PositionOutOfRange { position: usize, len: usize },
}

fn one_of(expected: &[String]) -> String {
    match expected {
        [] => "nothing".to_string(),
        [only] => format!("'{only}'"),
        many => format!(
            "one of {}",
            many.iter()
                .map(|name| format!("'{name}'"))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn found_or_end(found: &Option<String>) -> String {
    found.clone().unwrap_or_else(|| "end of input".to_string())
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Raised by the expression evaluator. Always surfaced, never defaulted.
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum EvaluationError {
    #[error("Evaluation error: failed to handle node {symbol} {text:?}")]
    #[diagnostic(
        code(descent::eval::unhandled_node),
        help("supply a leaf handler or name resolver for this kind of node")
    )]
    UnhandledNode { symbol: String, text: String, span: Span },

    #[error("Evaluation error: no operator before operand {operand:?} in {expression:?}")]
    #[diagnostic(
        code(descent::eval::missing_operator),
        help("the tree does not have the expected operator-chain shape; this is an internal error")
    )]
    MissingOperator { operand: String, expression: String },

    #[error("Evaluation error: unknown operator {operator:?}")]
    #[diagnostic(code(descent::eval::unknown_operator))]
    UnknownOperator { operator: String },

    #[error("Evaluation error: invalid {kind} literal {text:?}")]
    #[diagnostic(code(descent::eval::invalid_literal))]
    InvalidLiteral { kind: String, text: String },

    #[error("Evaluation error: division by zero")]
    #[diagnostic(code(descent::eval::division_by_zero))]
    DivisionByZero,

    #[error("Evaluation error: integer overflow in {operation}")]
    #[diagnostic(code(descent::eval::overflow))]
    Overflow { operation: String },

    #[error("Evaluation error: unbound name '{name}'")]
    #[diagnostic(code(descent::eval::unbound_name))]
    UnboundName { name: String },
}

// ============================================================================
// GRAMMARS AND LANGUAGE DEFINITIONS
// ============================================================================

/// Raised while building a [`crate::grammar::Grammar`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum GrammarError {
    #[error("Grammar error: grammar has no rules and no start symbol")]
    #[diagnostic(code(descent::grammar::empty))]
    Empty,

    #[error("Grammar error: rule {rule} has an empty head")]
    #[diagnostic(code(descent::grammar::empty_head))]
    EmptyHead { rule: usize },

    #[error("Grammar error: rule head '{head}' is classified as a terminal")]
    #[diagnostic(
        code(descent::grammar::terminal_head),
        help("by default lowercase-initial names are terminals; capitalize the head or supply a terminal predicate")
    )]
    TerminalHead { head: String },

    #[error("Grammar error: start symbol '{start}' does not appear in any rule")]
    #[diagnostic(code(descent::grammar::unknown_start))]
    UnknownStart { start: String },

    #[error("Grammar error: line {line}: {message}")]
    #[diagnostic(code(descent::grammar::notation))]
    Notation { line: usize, message: String },
}

/// Raised while loading or running a [`crate::language::Language`].
#[derive(Debug, Error, Diagnostic)]
pub enum LanguageError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error("Language error: invalid YAML definition: {0}")]
    #[diagnostic(code(descent::language::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Language error: invalid JSON definition: {0}")]
    #[diagnostic(code(descent::language::json))]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Wraps any engine error in a `miette::Report` with `source` attached.
///
/// Errors only carry offsets; attaching the original text lets the report
/// render a labelled snippet.
pub fn render<E>(error: E, name: &str, source: &str) -> Report
where
    E: Diagnostic + Send + Sync + 'static,
{
    Report::new(error).with_source_code(NamedSource::new(name, source.to_string()))
}
