//! Descent: a grammar-driven, backtracking recursive-descent parser with
//! packrat memoization, a prioritized regex tokenizer, and an evaluator for
//! right-recursive arithmetic trees.
//!
//! Pipeline: [`Tokenizer`] → [`TokenStream`] → [`Parser`] or [`PackratParser`]
//! → [`ParseTree`] → [`Evaluator`].

pub use crate::ast::{AstNode, NodeId, ParseTree, Span};
pub use crate::errors::{EvaluationError, GrammarError, LanguageError, LexError, ParseError};
pub use crate::eval::{evaluate_expression, Evaluator, ExpressionShape, Number};
pub use crate::grammar::{Grammar, SymbolId, TerminalPredicate};
pub use crate::language::{CompiledLanguage, Language};
pub use crate::lexer::{Token, TokenStream, TokenTransform, Tokenizer};
pub use crate::parser::{
    parse_with_options, PackratParser, ParseOptions, ParseSession, ParseStats, Parser,
};

pub mod ast;
pub mod errors;
pub mod eval;
pub mod grammar;
pub mod language;
pub mod lexer;
pub mod parser;
