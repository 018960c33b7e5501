//! Textual grammar notation.
//!
//! One rule per line:
//!
//! ```text
//! # comments run to the end of the line
//! AddExpr -> MulExpr add_op AddExpr | MulExpr
//! Opt     -> item | ε
//! ```
//!
//! `|` separates alternatives. `ε`, or an alternative with no symbols,
//! is the empty production.
//!
//! A symbol in single quotes is a literal, matched by token text:
//!
//! ```text
//! Statement -> 'let' identifier '=' Expression ';' | Expression EOF
//! ```
//!
//! `#` and `|` inside quotes are part of the literal. Literals cannot contain
//! whitespace.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::GrammarError;
use crate::grammar::literal_text;

/// Marker for the empty production.
pub const EMPTY: &str = "ε";

const ARROW: &str = "->";

const QUOTE: char = '\'';

static HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_']*$").expect("head pattern is valid"));

/// A `(head, body)` production as written.
pub type Production = (String, Vec<String>);

/// Parses notation text into productions, in order.
pub fn parse_rules(text: &str) -> Result<Vec<Production>, GrammarError> {
    let mut rules = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        let number = index + 1;
        let (head, bodies) = line.split_once(ARROW).ok_or_else(|| GrammarError::Notation {
            line: number,
            message: format!("expected `{ARROW}` in {line:?}"),
        })?;
        let head = head.trim();
        if !HEAD.is_match(head) {
            return Err(GrammarError::Notation {
                line: number,
                message: format!("invalid rule head {head:?}"),
            });
        }
        for alternative in split_unquoted(bodies, '|') {
            let body = parse_body(alternative, number)?;
            rules.push((head.to_string(), body));
        }
    }
    Ok(rules)
}

fn parse_body(alternative: &str, line: usize) -> Result<Vec<String>, GrammarError> {
    let symbols: Vec<&str> = alternative.split_whitespace().collect();
    match symbols.as_slice() {
        [only] if *only == EMPTY => Ok(Vec::new()),
        symbols if symbols.contains(&EMPTY) => Err(GrammarError::Notation {
            line,
            message: format!("`{EMPTY}` must stand alone in an alternative"),
        }),
        symbols if symbols.contains(&ARROW) => Err(GrammarError::Notation {
            line,
            message: format!("more than one `{ARROW}` on a line"),
        }),
        symbols => symbols
            .iter()
            .map(|&symbol| check_quotes(symbol, line))
            .collect(),
    }
}

fn check_quotes(symbol: &str, line: usize) -> Result<String, GrammarError> {
    if symbol.starts_with(QUOTE) && literal_text(symbol).is_none() {
        return Err(GrammarError::Notation {
            line,
            message: format!("malformed literal {symbol:?}"),
        });
    }
    Ok(symbol.to_string())
}

/// Splits on `separator` wherever it is not inside single quotes. A quote
/// only opens a literal at the start of a symbol, so primed names like `E'`
/// are left alone.
fn split_unquoted(text: &str, separator: char) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    let mut previous: Option<char> = None;
    for (index, c) in text.char_indices() {
        if quoted {
            quoted = c != QUOTE;
        } else if c == QUOTE {
            quoted = previous.map_or(true, |p| p.is_whitespace() || p == separator);
        } else if c == separator {
            pieces.push(&text[start..index]);
            start = index + c.len_utf8();
        }
        previous = Some(c);
    }
    pieces.push(&text[start..]);
    pieces
}

fn strip_comment(line: &str) -> &str {
    split_unquoted(line, '#')[0]
}
