//! Descent Language Definitions
//!
//! A [`Language`] bundles everything needed to go from text to a parse tree:
//! an ordered token table, the token kinds to drop before parsing, a grammar
//! in notation form, and a set of named example inputs. Definitions are plain
//! serde data and can be loaded from YAML or JSON:
//!
//! ```yaml
//! name: Sums
//! tokens:
//!   - { kind: ws, pattern: '\s+' }
//!   - { kind: plus, pattern: '\+' }
//!   - { kind: int, pattern: '[0-9]+' }
//! skip: [ws]
//! grammar: |
//!   Sum -> int plus Sum | int
//! examples:
//!   three: "1 + 2 + 3"
//! ```
//!
//! Quoted literals in the grammar (`'let'`) become keyword patterns tried
//! ahead of the token table.
//!
//! [`Language::compile`] validates the definition once; the resulting
//! [`CompiledLanguage`] can then tokenize and parse any number of inputs.
//! Token rewrites that a grammar cannot express are attached to the compiled
//! language with [`CompiledLanguage::with_transform`].

pub mod builtin;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::ParseTree;
use crate::errors::{LanguageError, LexError, ParseError};
use crate::grammar::Grammar;
use crate::lexer::{TokenPattern, TokenStream, TokenTransform, Tokenizer};
use crate::parser::{parse_with_options, ParseOptions, ParseStats};

// ============================================================================
// DEFINITIONS
// ============================================================================

/// One entry of a token table. Order in the table is priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDef {
    pub kind: String,
    pub pattern: String,
}

impl TokenDef {
    pub fn new(kind: &str, pattern: &str) -> Self {
        Self {
            kind: kind.to_string(),
            pattern: pattern.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub name: String,
    pub tokens: Vec<TokenDef>,
    /// Token kinds removed before parsing.
    #[serde(default)]
    pub skip: Vec<String>,
    /// Rules in `Head -> a B | c` notation.
    pub grammar: String,
    /// Defaults to the head of the first rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default)]
    pub examples: BTreeMap<String, String>,
}

impl Language {
    pub fn from_yaml_str(text: &str) -> Result<Self, LanguageError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, LanguageError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The token table alone, without keywords from the grammar's literals.
    pub fn tokenizer(&self) -> Result<Tokenizer, LexError> {
        let patterns = self
            .tokens
            .iter()
            .map(|def| TokenPattern::new(def.kind.as_str(), def.pattern.as_str()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Tokenizer::from_patterns(patterns).with_skip(self.skip.iter().cloned()))
    }

    pub fn grammar(&self) -> Result<Grammar, LanguageError> {
        let mut builder = Grammar::builder().notation(&self.grammar)?;
        if let Some(start) = &self.start {
            builder = builder.start(start.as_str());
        }
        Ok(builder.build()?)
    }

    pub fn compile(&self) -> Result<CompiledLanguage, LanguageError> {
        let grammar = self.grammar()?;
        let tokenizer = self.tokenizer()?.with_keywords(grammar.keywords())?;
        Ok(CompiledLanguage {
            name: self.name.clone(),
            tokenizer,
            grammar,
            examples: self.examples.clone(),
            transforms: Vec::new(),
        })
    }
}

// ============================================================================
// COMPILED LANGUAGES
// ============================================================================

/// A validated [`Language`], ready to parse.
#[derive(Debug, Clone)]
pub struct CompiledLanguage {
    name: String,
    tokenizer: Tokenizer,
    grammar: Grammar,
    examples: BTreeMap<String, String>,
    transforms: Vec<TokenTransform>,
}

impl CompiledLanguage {
    /// Adds a rewrite applied to every token stream before parsing, after
    /// skip kinds are dropped. Rewrites run in the order they were added.
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(TokenStream) -> TokenStream + Send + Sync + 'static,
    {
        self.transforms.push(TokenTransform::new(transform));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn examples(&self) -> &BTreeMap<String, String> {
        &self.examples
    }

    pub fn example(&self, name: &str) -> Option<&str> {
        self.examples.get(name).map(String::as_str)
    }

    /// Tokenizes `text`, dropping skip kinds and applying the transforms.
    pub fn tokenize(&self, text: &str) -> Result<TokenStream, LexError> {
        let tokens = self.tokenizer.tokenize(text)?;
        Ok(self
            .transforms
            .iter()
            .fold(tokens, |tokens, transform| transform.apply(tokens)))
    }

    /// Tokenizes `text` and derives the start symbol from the first token.
    pub fn parse(&self, text: &str, options: ParseOptions) -> Result<ParseTree, LanguageError> {
        let tokens = self.tokenize(text)?;
        let (result, _) = self.parse_with_stats(&tokens, options);
        Ok(result?)
    }

    /// Parses already tokenized input, reporting parser statistics.
    pub fn parse_with_stats(
        &self,
        tokens: &TokenStream,
        options: ParseOptions,
    ) -> (Result<ParseTree, ParseError>, ParseStats) {
        parse_with_options(
            &self.grammar,
            tokens,
            self.grammar.start_name(),
            0,
            options,
        )
    }
}
