//! Bundled language definitions.
//!
//! - [`expression`]: arithmetic over variables and literals, each precedence
//!   level right-recursive.
//! - [`slow_expression`]: the same language with the multiplicative level
//!   recursing into the additive level. Alternatives then share long prefixes
//!   and the unmemoized parser takes exponential time on `x * x * ... * x`.
//! - [`fp_language`]: a small functional language with `let` bindings,
//!   lambdas, application and `if`/`else`.

use std::collections::BTreeMap;

use super::{Language, TokenDef};

const ARITHMETIC_TOKENS: &[(&str, &str)] = &[
    ("ws", r"\s+"),
    ("add_op", r"\+|-"),
    ("mul_op", r"\*|/"),
    ("lbrace", r"\("),
    ("rbrace", r"\)"),
    ("var", r"[a-zA-Z_]+"),
    // Floats first: `int` would otherwise claim the integer part.
    ("float", r"(0|[1-9][0-9]*)\.[0-9]*|\.[0-9]+"),
    ("int", r"0|[1-9][0-9]*"),
];

const EXPRESSION_GRAMMAR: &str = "\
AddExpr -> MulExpr add_op AddExpr | MulExpr
MulExpr -> Factor mul_op MulExpr | Factor
Factor  -> lbrace AddExpr rbrace | var | int | float
";

const SLOW_EXPRESSION_GRAMMAR: &str = "\
AddExpr -> MulExpr add_op AddExpr | MulExpr
MulExpr -> Factor mul_op AddExpr | Factor
Factor  -> lbrace AddExpr rbrace | var | int | float
";

const FP_TOKENS: &[(&str, &str)] = &[
    ("ws", r"\s+"),
    ("right_arrow", r"->"),
    ("let", r"let\b"),
    ("if", r"if\b"),
    ("else", r"else\b"),
    ("semicolon", r";"),
    ("comparison_op", r"<=|>=|==|!=|<|>"),
    ("assignment_op", r"="),
    ("add_op", r"\+|-"),
    ("mul_op", r"\*|/"),
    ("lbrace", r"\("),
    ("rbrace", r"\)"),
    ("identifier", r"[a-zA-Z_]+"),
    ("float", r"(0|[1-9][0-9]*)\.[0-9]*|\.[0-9]+"),
    ("int", r"0|[1-9][0-9]*"),
];

const FP_GRAMMAR: &str = "\
Program              -> Statements Expression | Expression
Statements           -> Statement Statements | Statement
Statement            -> let identifier assignment_op Expression semicolon
Expression           -> IfElseExpression | Abstraction | Application | SubExpression | ComparisonExpression
Abstraction          -> identifier right_arrow Expression
Application          -> FunctionIdentifier Application | FunctionIdentifier Args
FunctionIdentifier   -> identifier | BracedExpression
Args                 -> identifier | SubExpression
BracedExpression     -> lbrace Expression rbrace
ComparisonExpression -> SubExpression comparison_op Expression
IfElseExpression     -> if lbrace ComparisonExpression rbrace Expression else Expression
SubExpression        -> BracedExpression | AddExpr
AddExpr              -> MulExpr add_op AddExpr | MulExpr
MulExpr              -> Factor mul_op MulExpr | Factor
Factor               -> Application | lbrace AddExpr rbrace | identifier | int | float
";

fn token_table(table: &[(&str, &str)]) -> Vec<TokenDef> {
    table
        .iter()
        .map(|&(kind, pattern)| TokenDef::new(kind, pattern))
        .collect()
}

/// `simple` plus `ugly_2` through `ugly_20`: `x * x * ... * x`.
fn expression_examples() -> BTreeMap<String, String> {
    let mut examples = BTreeMap::new();
    examples.insert("simple".to_string(), "x * y + z * ( x + y )".to_string());
    for n in (2..=20).step_by(2) {
        examples.insert(format!("ugly_{n}"), repeated_product(n));
    }
    examples
}

/// `x * x * ... * x` with `n` operands.
pub fn repeated_product(n: usize) -> String {
    vec!["x"; n].join(" * ")
}

pub fn expression() -> Language {
    Language {
        name: "Expressions".to_string(),
        tokens: token_table(ARITHMETIC_TOKENS),
        skip: vec!["ws".to_string()],
        grammar: EXPRESSION_GRAMMAR.to_string(),
        start: Some("AddExpr".to_string()),
        examples: expression_examples(),
    }
}

pub fn slow_expression() -> Language {
    Language {
        name: "Slow-Expressions".to_string(),
        grammar: SLOW_EXPRESSION_GRAMMAR.to_string(),
        ..expression()
    }
}

pub fn fp_language() -> Language {
    let examples = [
        ("application", "(x -> x - 1) 1"),
        ("statement", "let f = x -> x + 1; f 2"),
        ("higher-order-fns", "((f -> x -> f (f x)) (x -> x * x)) 3"),
        ("if-else", "let x = 1; if (x < 0) 1 else 2"),
        (
            "statements",
            "let Y = f_ -> ((x -> f_ (x x)) (x -> f_ (x x)));\n\
             let fact_ = f -> n -> if (n == 0) 1 else n * (f (n - 1));\n\
             let fact = Y fact_;\n\
             fact 7",
        ),
        ("hfn", "(f -> x -> f x) (x -> x - 2) 2"),
    ];
    Language {
        name: "fpLang".to_string(),
        tokens: token_table(FP_TOKENS),
        skip: vec!["ws".to_string()],
        grammar: FP_GRAMMAR.to_string(),
        start: Some("Program".to_string()),
        examples: examples
            .iter()
            .map(|&(name, text)| (name.to_string(), text.to_string()))
            .collect(),
    }
}

/// Every bundled language, in the order above.
pub fn all() -> Vec<Language> {
    vec![expression(), slow_expression(), fp_language()]
}
