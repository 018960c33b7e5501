//! Descent Expression Evaluator
//!
//! Computes the value of an arithmetic parse tree whose grammar encodes
//! precedence by nesting and each precedence level as a *right*-recursive rule:
//!
//! ```text
//! AddExpr -> MulExpr add_op AddExpr | MulExpr
//! MulExpr -> Factor mul_op MulExpr | Factor
//! ```
//!
//! Walking such a tree top-down applies operators right to left, so
//! `1 - 1 + 1` would come out as `-1`. The evaluator instead flattens each
//! maximal same-level chain into `(operand, operator)` pairs and folds them
//! left to right, giving the conventional `(1 - 1) + 1 = 1`.
//!
//! Leaves that are not numeric literals go to caller-supplied handlers, so
//! the same evaluator can look up variables or embed another language's
//! values.

pub mod number;

use log::trace;
use serde::{Deserialize, Serialize};

pub use number::{BinaryOp, Number};

use crate::ast::AstNode;
use crate::errors::EvaluationError;

// ============================================================================
// EXPRESSION SHAPE
// ============================================================================

/// One precedence level: `head -> operand operator head | operand`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorLevel {
    pub head: String,
    pub operand: String,
    pub operator: String,
}

impl OperatorLevel {
    pub fn new(head: &str, operand: &str, operator: &str) -> Self {
        Self {
            head: head.to_string(),
            operand: operand.to_string(),
            operator: operator.to_string(),
        }
    }
}

/// A bracketing rule `X -> open Inner close`; evaluates to `Inner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grouping {
    pub open: String,
    pub close: String,
}

/// Which symbols of a grammar play which role in an expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionShape {
    pub levels: Vec<OperatorLevel>,
    pub groupings: Vec<Grouping>,
    pub int_kinds: Vec<String>,
    pub float_kinds: Vec<String>,
    /// Token kinds resolved through the name resolver.
    pub name_kinds: Vec<String>,
}

impl ExpressionShape {
    /// The shape of the bundled expression and functional-language grammars.
    pub fn arithmetic() -> Self {
        Self {
            levels: vec![
                OperatorLevel::new("AddExpr", "MulExpr", "add_op"),
                OperatorLevel::new("MulExpr", "Factor", "mul_op"),
            ],
            groupings: vec![Grouping {
                open: "lbrace".to_string(),
                close: "rbrace".to_string(),
            }],
            int_kinds: vec!["int".to_string()],
            float_kinds: vec!["float".to_string()],
            name_kinds: vec!["var".to_string(), "identifier".to_string()],
        }
    }

    /// The level `node` is a binary step of, if any.
    fn binary_level(&self, node: AstNode<'_>) -> Option<&OperatorLevel> {
        if node.child_count() != 3 {
            return None;
        }
        let (operand, operator) = (node.child(0)?, node.child(1)?);
        self.levels.iter().find(|level| {
            node.symbol() == level.head
                && operand.symbol() == level.operand
                && operator.symbol() == level.operator
        })
    }

    fn is_grouping(&self, node: AstNode<'_>) -> bool {
        match (node.child_count(), node.child(0), node.child(2)) {
            (3, Some(open), Some(close)) => self
                .groupings
                .iter()
                .any(|group| open.symbol() == group.open && close.symbol() == group.close),
            _ => false,
        }
    }
}

impl Default for ExpressionShape {
    fn default() -> Self {
        Self::arithmetic()
    }
}

// ============================================================================
// EVALUATOR
// ============================================================================

type LeafHandler<'h> = Box<dyn FnMut(AstNode<'_>) -> Result<Number, EvaluationError> + 'h>;
type NameResolver<'h> = Box<dyn FnMut(&str) -> Result<Number, EvaluationError> + 'h>;

/// Flatten-then-fold evaluator over one [`ExpressionShape`].
pub struct Evaluator<'h> {
    shape: ExpressionShape,
    leaf: Option<LeafHandler<'h>>,
    names: Option<NameResolver<'h>>,
}

impl<'h> Evaluator<'h> {
    pub fn new(shape: ExpressionShape) -> Self {
        Self {
            shape,
            leaf: None,
            names: None,
        }
    }

    pub fn arithmetic() -> Self {
        Self::new(ExpressionShape::arithmetic())
    }

    pub fn shape(&self) -> &ExpressionShape {
        &self.shape
    }

    /// Handles any node the evaluator does not recognize itself.
    pub fn with_leaf_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(AstNode<'_>) -> Result<Number, EvaluationError> + 'h,
    {
        self.leaf = Some(Box::new(handler));
        self
    }

    /// Resolves tokens of the shape's name kinds.
    pub fn with_names<F>(mut self, resolver: F) -> Self
    where
        F: FnMut(&str) -> Result<Number, EvaluationError> + 'h,
    {
        self.names = Some(Box::new(resolver));
        self
    }

    pub fn evaluate(&mut self, node: AstNode<'_>) -> Result<Number, EvaluationError> {
        if node.child_count() == 1 {
            if let Some(only) = node.child(0) {
                return self.evaluate(only);
            }
        }
        if let Some(level) = self.shape.binary_level(node) {
            let head = level.head.clone();
            return self.fold_chain(node, &head);
        }
        if self.shape.is_grouping(node) {
            if let Some(inner) = node.child(1) {
                return self.evaluate(inner);
            }
        }
        if let Some(token) = node.token() {
            if self.shape.int_kinds.contains(&token.kind) {
                return parse_int_literal(&token.kind, &token.text);
            }
            if self.shape.float_kinds.contains(&token.kind) {
                return parse_literal::<f64>(&token.kind, &token.text).map(Number::Float);
            }
            if self.shape.name_kinds.contains(&token.kind) {
                if let Some(resolve) = self.names.as_mut() {
                    return resolve(&token.text);
                }
            }
        }
        match self.leaf.as_mut() {
            Some(handle) => handle(node),
            None => Err(unhandled(node)),
        }
    }

    /// Folds the chain of `head`-level steps starting at `node`, left to right.
    fn fold_chain(&mut self, node: AstNode<'_>, head: &str) -> Result<Number, EvaluationError> {
        let chain = self.flatten(node, head);
        let mut steps = chain.into_iter();
        let Some((first, mut pending)) = steps.next() else {
            return Err(unhandled(node));
        };
        let mut acc = self.evaluate(first)?;
        for (operand, next) in steps {
            let Some(operator) = pending else {
                return Err(EvaluationError::MissingOperator {
                    operand: operand.text(),
                    expression: node.text(),
                });
            };
            let rhs = self.evaluate(operand)?;
            let op = BinaryOp::from_symbol(&operator)?;
            trace!("fold {acc} {op} {rhs}");
            acc = op.apply(acc, rhs)?;
            pending = next;
        }
        Ok(acc)
    }

    /// Walks down the right recursion of one level collecting operands and the
    /// operator text following each.
    fn flatten<'t>(&self, node: AstNode<'t>, head: &str) -> Vec<(AstNode<'t>, Option<String>)> {
        let mut chain = Vec::new();
        let mut current = node;
        loop {
            let step = self
                .shape
                .binary_level(current)
                .filter(|level| level.head == head)
                .and_then(|_| Some((current.child(0)?, current.child(1)?, current.child(2)?)));
            match step {
                Some((operand, operator, rest)) => {
                    chain.push((operand, Some(operator.text())));
                    current = rest;
                }
                None => {
                    chain.push((current, None));
                    return chain;
                }
            }
        }
    }
}

impl Default for Evaluator<'_> {
    fn default() -> Self {
        Self::arithmetic()
    }
}

impl std::fmt::Debug for Evaluator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("shape", &self.shape)
            .field("leaf", &self.leaf.is_some())
            .field("names", &self.names.is_some())
            .finish()
    }
}

/// Evaluates a tree of literals with the arithmetic shape and no handlers.
pub fn evaluate_expression(node: AstNode<'_>) -> Result<Number, EvaluationError> {
    Evaluator::arithmetic().evaluate(node)
}

/// Integers beyond `i64` are read as floats rather than rejected.
fn parse_int_literal(kind: &str, text: &str) -> Result<Number, EvaluationError> {
    match text.parse::<i64>() {
        Ok(value) => Ok(Number::Int(value)),
        Err(_) => parse_literal::<f64>(kind, text).map(Number::Float),
    }
}

fn parse_literal<T: std::str::FromStr>(kind: &str, text: &str) -> Result<T, EvaluationError> {
    text.parse().map_err(|_| EvaluationError::InvalidLiteral {
        kind: kind.to_string(),
        text: text.to_string(),
    })
}

fn unhandled(node: AstNode<'_>) -> EvaluationError {
    EvaluationError::UnhandledNode {
        symbol: node.symbol().to_string(),
        text: node.text(),
        span: node.span(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::builtin;
    use crate::parser::ParseOptions;

    fn eval(text: &str) -> Result<Number, EvaluationError> {
        let language = builtin::expression().compile().unwrap();
        let tree = language.parse(text, ParseOptions::default()).unwrap();
        evaluate_expression(tree.root())
    }

    #[test]
    fn subtraction_chains_fold_left() {
        assert_eq!(eval("10 - 4 - 3"), Ok(Number::Int(3)));
    }

    #[test]
    fn groupings_override_precedence() {
        assert_eq!(eval("2 * (3 + 4)"), Ok(Number::Int(14)));
        assert_eq!(eval("2 * 3 + 4"), Ok(Number::Int(10)));
    }

    #[test]
    fn oversized_integer_literals_become_floats() {
        assert_eq!(eval("100000000000000000000 * 2"), Ok(Number::Float(2e20)));
        assert_eq!(eval("9223372036854775807"), Ok(Number::Int(i64::MAX)));
    }

    #[test]
    fn names_without_a_resolver_are_unhandled() {
        let err = eval("1 + x").unwrap_err();
        assert!(matches!(err, EvaluationError::UnhandledNode { ref symbol, .. } if symbol == "var"));
    }
}
