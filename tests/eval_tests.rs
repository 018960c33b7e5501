// tests/eval_tests.rs

mod common;

use common::{evaluate_with, expression, language, values};
use descent::errors::EvaluationError;
use descent::eval::{BinaryOp, Evaluator, ExpressionShape, Number, OperatorLevel};
use descent::grammar::Grammar;
use descent::lexer::Tokenizer;
use descent::{evaluate_expression, ParseOptions, Parser, Span};

fn eval(text: &str, bindings: &[(&str, i64)]) -> Result<Number, EvaluationError> {
    let tree = expression().parse(text, ParseOptions::default()).unwrap();
    evaluate_with(&tree, &values(bindings))
}

// ---
// Associativity and precedence
// ---

#[test]
fn test_left_associativity_over_right_recursion() {
    let xyz = [("x", 1), ("y", 1), ("z", 1)];
    assert_eq!(eval("x - y + z", &xyz), Ok(Number::Int(1)));
    assert_eq!(eval("x - y - z", &xyz), Ok(Number::Int(-1)));
}

#[test]
fn test_multiplication_binds_tighter() {
    assert_eq!(
        eval("x * y + z", &[("x", 0), ("y", 1), ("z", 2)]),
        Ok(Number::Int(2))
    );
    assert_eq!(
        eval("x * y + z * ( x + y )", &[("x", 1), ("y", 2), ("z", 3)]),
        Ok(Number::Int(11))
    );
}

#[test]
fn test_division_chains_fold_left() {
    assert_eq!(eval("8 / 4 / 2", &[]), Ok(Number::Float(1.0)));
    assert_eq!(eval("8 / 4 * 2", &[]), Ok(Number::Float(4.0)));
}

#[test]
fn test_float_literals() {
    assert_eq!(eval("1.5 * 2", &[]), Ok(Number::Float(3.0)));
    assert_eq!(eval(".5 + 1.", &[]), Ok(Number::Float(1.5)));
}

#[test]
fn test_slow_grammar_evaluates_products() {
    let language = language("slow_expression");
    let tree = language.parse("x * x * x", ParseOptions::default()).unwrap();
    assert_eq!(evaluate_with(&tree, &values(&[("x", 2)])), Ok(Number::Int(8)));
}

// ---
// Leaves and handlers
// ---

#[test]
fn test_literals_need_no_handler() {
    let tree = expression().parse("(1 + 2) * 3", ParseOptions::default()).unwrap();
    assert_eq!(evaluate_expression(tree.root()), Ok(Number::Int(9)));
}

#[test]
fn test_unresolved_leaf_is_reported() {
    let tree = expression().parse("1 + x", ParseOptions::default()).unwrap();
    let err = evaluate_expression(tree.root()).unwrap_err();
    assert_eq!(
        err,
        EvaluationError::UnhandledNode {
            symbol: "var".to_string(),
            text: "x".to_string(),
            span: Span::new(2, 3),
        }
    );
}

#[test]
fn test_unbound_name_from_resolver() {
    let err = eval("x + y", &[("x", 1)]).unwrap_err();
    assert_eq!(err, EvaluationError::UnboundName { name: "y".to_string() });
}

#[test]
fn test_leaf_handler_sees_unrecognized_nodes() {
    let language = language("fp");
    let tree = language.parse("f 2 + 1", ParseOptions::default()).unwrap();
    let mut seen = Vec::new();
    let result = Evaluator::arithmetic()
        .with_leaf_handler(|node| {
            seen.push(node.symbol().to_string());
            let args = node.child(1).expect("application has arguments");
            let argument = Evaluator::arithmetic().evaluate(args)?;
            BinaryOp::Mul.apply(argument, Number::Int(2))
        })
        .evaluate(tree.root());
    assert_eq!(result, Ok(Number::Int(6)));
    assert_eq!(seen, ["Application"]);
}

#[test]
fn test_functional_language_arithmetic() {
    let language = language("fp");
    let tree = language.parse("1 + 2 * 3", ParseOptions::default()).unwrap();
    assert_eq!(evaluate_expression(tree.root()), Ok(Number::Int(7)));
}

// ---
// Arithmetic errors
// ---

#[test]
fn test_division_by_zero() {
    assert_eq!(
        eval("1 / (x - x)", &[("x", 3)]),
        Err(EvaluationError::DivisionByZero)
    );
}

#[test]
fn test_integer_overflow_is_an_error() {
    let err = eval("x * x", &[("x", i64::MAX)]).unwrap_err();
    assert!(matches!(err, EvaluationError::Overflow { .. }));
}

#[test]
fn test_unknown_operator_text() {
    let grammar = Grammar::from_notation("Sum -> num op Sum | num").unwrap();
    let tokens = Tokenizer::new([("num", "[0-9]+"), ("op", "[%^]")])
        .unwrap()
        .tokenize("1%2")
        .unwrap();
    let tree = Parser::new(&grammar).parse_complete(&tokens).unwrap();
    let shape = ExpressionShape {
        levels: vec![OperatorLevel::new("Sum", "num", "op")],
        groupings: Vec::new(),
        int_kinds: vec!["num".to_string()],
        float_kinds: Vec::new(),
        name_kinds: Vec::new(),
    };
    let err = Evaluator::new(shape).evaluate(tree.root()).unwrap_err();
    assert_eq!(err, EvaluationError::UnknownOperator { operator: "%".to_string() });
}

// ---
// Custom shapes
// ---

#[test]
fn test_custom_shape_over_custom_grammar() {
    let grammar = Grammar::from_notation(
        "Diff -> Term minus Diff | Term\nTerm -> Atom times Term | Atom\nAtom -> open Diff close | num",
    )
    .unwrap();
    let tokens = Tokenizer::new([
        ("ws", r"\s+"),
        ("minus", "-"),
        ("times", r"\*"),
        ("open", r"\["),
        ("close", r"\]"),
        ("num", "[0-9]+"),
    ])
    .unwrap()
    .with_skip(["ws"])
    .tokenize("10 - 4 - [3 - 1] * 2")
    .unwrap();
    let tree = Parser::new(&grammar).parse_complete(&tokens).unwrap();
    let shape = ExpressionShape {
        levels: vec![
            OperatorLevel::new("Diff", "Term", "minus"),
            OperatorLevel::new("Term", "Atom", "times"),
        ],
        groupings: vec![descent::eval::Grouping {
            open: "open".to_string(),
            close: "close".to_string(),
        }],
        int_kinds: vec!["num".to_string()],
        float_kinds: Vec::new(),
        name_kinds: Vec::new(),
    };
    assert_eq!(Evaluator::new(shape).evaluate(tree.root()), Ok(Number::Int(2)));
}
