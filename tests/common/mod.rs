//! # Descent Test Helpers
//!
//! Shared loaders for the integration tests. YAML fixtures live under
//! `tests/fixtures` and are discovered with `walkdir`.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use descent::errors::EvaluationError;
use descent::eval::{Evaluator, Number};
use descent::language::{builtin, CompiledLanguage};
use descent::lexer::{Token, TokenStream};
use descent::ParseTree;
use serde::Deserialize;
use walkdir::WalkDir;

// =============================================================================
// FIXTURES
// =============================================================================

/// One evaluation case from `tests/fixtures/eval/*.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EvalCase {
    pub name: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub input: String,
    #[serde(default)]
    pub values: BTreeMap<String, Number>,
    pub expected: Option<Number>,
    /// Substring of the expected error message.
    pub expect_error: Option<String>,
    #[serde(default)]
    pub skip: bool,
}

fn default_language() -> String {
    "expression".to_string()
}

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// All `.yaml` files under `tests/fixtures/<subdir>`, sorted.
pub fn discover_yaml_files(subdir: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(fixtures_dir().join(subdir))
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "yaml" || ext == "yml"))
        .collect();
    files.sort();
    files
}

pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}

pub fn load_eval_cases(path: &Path) -> Vec<EvalCase> {
    serde_yaml::from_str(&read(path))
        .unwrap_or_else(|e| panic!("invalid eval fixture {}: {e}", path.display()))
}

// =============================================================================
// LANGUAGES AND TREES
// =============================================================================

/// A bundled language by fixture name.
pub fn language(name: &str) -> CompiledLanguage {
    let language = match name {
        "expression" => builtin::expression(),
        "slow_expression" => builtin::slow_expression(),
        "fp" => builtin::fp_language(),
        other => panic!("unknown bundled language '{other}'"),
    };
    language.compile().expect("bundled language compiles")
}

pub fn expression() -> CompiledLanguage {
    language("expression")
}

/// Evaluates `tree`, resolving variables from `values`.
pub fn evaluate_with(tree: &ParseTree, values: &BTreeMap<String, Number>) -> Result<Number, EvaluationError> {
    Evaluator::arithmetic()
        .with_names(|name| {
            values
                .get(name)
                .copied()
                .ok_or_else(|| EvaluationError::UnboundName { name: name.to_string() })
        })
        .evaluate(tree.root())
}

pub fn values(pairs: &[(&str, i64)]) -> BTreeMap<String, Number> {
    pairs
        .iter()
        .map(|&(name, value)| (name.to_string(), Number::Int(value)))
        .collect()
}

/// A stream of tokens whose text equals their kind, one byte apart.
pub fn stream(kinds: &[&str]) -> TokenStream {
    let mut offset = 0;
    kinds
        .iter()
        .map(|kind| {
            let token = Token {
                kind: kind.to_string(),
                text: kind.to_string(),
                start: offset,
                end: offset + kind.len(),
                line: 1,
                column: offset + 1,
            };
            offset = token.end;
            token
        })
        .collect()
}
