//! Property-based tests for the tokenizer, the packrat cache and the evaluator
//!
//! These check the invariants that must hold for any input: tokens tile the
//! source, memoization never changes a result, and evaluation follows the usual
//! precedence and left-to-right associativity.

mod common;

use common::expression;
use descent::eval::{evaluate_expression, Number};
use descent::grammar::Grammar;
use descent::language::TokenDef;
use descent::lexer::{Token, Tokenizer};
use descent::{PackratParser, ParseOptions, Parser};
use proptest::prelude::*;

/// The expression token table plus a catch-all, so every input tokenizes.
fn total_tokenizer() -> Tokenizer {
    let mut language = descent::language::builtin::expression();
    language.tokens.push(TokenDef::new("other", "(?s)."));
    language.tokenizer().unwrap()
}

fn source_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9+*/() .\n\t$é-]{0,40}"
}

fn operand_chain() -> impl Strategy<Value = (Vec<i64>, Vec<char>)> {
    (1usize..7).prop_flat_map(|n| {
        (
            prop::collection::vec(0i64..100, n),
            prop::collection::vec(prop::sample::select(vec!['+', '-', '*']), n - 1),
        )
    })
}

/// Standard precedence: sum of left-folded products.
fn reference_value(operands: &[i64], operators: &[char]) -> i64 {
    let mut sum = 0;
    let mut sign = 1;
    let mut product = operands[0];
    for (operator, &operand) in operators.iter().zip(&operands[1..]) {
        match operator {
            '*' => product *= operand,
            op => {
                sum += sign * product;
                sign = if *op == '-' { -1 } else { 1 };
                product = operand;
            }
        }
    }
    sum + sign * product
}

proptest! {
    #[test]
    fn test_tokens_tile_the_input(input in source_strategy()) {
        let tokens: Vec<Token> = total_tokenizer()
            .tokens(&input)
            .collect::<Result<_, _>>()
            .unwrap();
        let mut cursor = 0;
        for token in &tokens {
            prop_assert_eq!(token.start, cursor);
            prop_assert_eq!(token.end - token.start, token.text.len());
            prop_assert!(!token.text.is_empty());
            cursor = token.end;
        }
        prop_assert_eq!(cursor, input.len());
        let joined: String = tokens.iter().map(|token| token.text.as_str()).collect();
        prop_assert_eq!(&joined, &input);
    }

    #[test]
    fn test_retokenizing_the_concatenation_is_stable(input in source_strategy()) {
        let tokenizer = total_tokenizer();
        let first: Vec<Token> = tokenizer.tokens(&input).collect::<Result<_, _>>().unwrap();
        let joined: String = first.iter().map(|token| token.text.as_str()).collect();
        let second: Vec<Token> = tokenizer.tokens(&joined).collect::<Result<_, _>>().unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_positions_match_the_source_prefix(input in source_strategy()) {
        for token in total_tokenizer().tokens(&input) {
            let token = token.unwrap();
            let prefix = &input[..token.start];
            let line = prefix.matches('\n').count() + 1;
            let column = prefix.rsplit('\n').next().unwrap_or("").chars().count() + 1;
            prop_assert_eq!((token.line, token.column), (line, column));
        }
    }

    #[test]
    fn test_memoization_never_changes_results(input in "[ab]{0,12}") {
        let grammar = Grammar::from_notation("S -> A S | A\nA -> a b | a | b a | b").unwrap();
        let tokens = Tokenizer::new([("a", "a"), ("b", "b")]).unwrap().tokenize(&input).unwrap();
        for target in ["S", "A", "a", "b"] {
            for position in 0..=tokens.len() {
                let plain = Parser::new(&grammar).parse(&tokens, target, position);
                let memoized = PackratParser::new(&grammar).parse(&tokens, target, position);
                prop_assert_eq!(plain, memoized);
            }
        }
    }

    #[test]
    fn test_evaluation_follows_precedence((operands, operators) in operand_chain()) {
        let mut text = operands[0].to_string();
        for (operator, operand) in operators.iter().zip(&operands[1..]) {
            text.push_str(&format!(" {operator} {operand}"));
        }
        let tree = expression().parse(&text, ParseOptions::default()).unwrap();
        prop_assert_eq!(tree.span().end, tree.tokens().len());
        prop_assert_eq!(
            evaluate_expression(tree.root()),
            Ok(Number::Int(reference_value(&operands, &operators)))
        );
    }
}
