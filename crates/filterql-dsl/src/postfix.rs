//! Shunting-yard conversion to postfix (spec §4.2 step 2).
//!
//! Precedence: `!` (3) > `&` (2) > `|` (1), all left-associative — except
//! `!` itself, which is a unary prefix operator and therefore effectively
//! right-associative; nothing ever has higher precedence to pop it first.

use crate::token::Token;
use filterql_core::{Error, Result};

fn precedence(op: &Token) -> u8 {
    match op {
        Token::Not => 3,
        Token::And => 2,
        Token::Or => 1,
        _ => 0,
    }
}

/// Convert an infix token stream into postfix (RPN), validating operand/
/// operator adjacency and parenthesis balance along the way.
pub fn to_postfix(tokens: &[Token]) -> Result<Vec<Token>> {
    let mut output: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut ops: Vec<Token> = Vec::new();
    // true when the next token must be an operand (ident, `!`, or `(`).
    let mut expect_operand = true;

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Ident(_) => {
                if !expect_operand {
                    return Err(Error::dsl_syntax(
                        "missing_operand",
                        format!("unexpected identifier '{token}' with no operator before it"),
                    ));
                }
                output.push(token.clone());
                expect_operand = false;
            }
            Token::Not => {
                if !expect_operand {
                    return Err(Error::dsl_syntax(
                        "missing_operand",
                        "'!' cannot directly follow an operand",
                    ));
                }
                ops.push(Token::Not);
                // still expecting an operand after a unary `!`
            }
            Token::LParen => {
                if !expect_operand {
                    return Err(Error::dsl_syntax(
                        "missing_operand",
                        "'(' cannot directly follow an operand",
                    ));
                }
                ops.push(Token::LParen);
            }
            Token::RParen => {
                if expect_operand {
                    return Err(Error::dsl_syntax(
                        "missing_operand",
                        "')' found where an operand was expected",
                    ));
                }
                let mut found_lparen = false;
                while let Some(top) = ops.pop() {
                    if matches!(top, Token::LParen) {
                        found_lparen = true;
                        break;
                    }
                    output.push(top);
                }
                if !found_lparen {
                    return Err(Error::dsl_syntax("mismatched_parentheses", "unmatched ')'"));
                }
                // a completed parenthesized group, or a unary `!` still
                // pending on the stack, both count as a completed operand
                while matches!(ops.last(), Some(Token::Not)) {
                    output.push(ops.pop().unwrap());
                }
                expect_operand = false;
            }
            Token::And | Token::Or => {
                if expect_operand {
                    let rule = if i == 0 { "leading_binary_operator" } else { "missing_operand" };
                    return Err(Error::dsl_syntax(
                        rule,
                        format!("binary operator '{token}' has no left operand"),
                    ));
                }
                while let Some(top) = ops.last() {
                    if matches!(top, Token::LParen) {
                        break;
                    }
                    if precedence(top) >= precedence(token) {
                        output.push(ops.pop().unwrap());
                    } else {
                        break;
                    }
                }
                ops.push(token.clone());
                expect_operand = true;
            }
        }
    }

    if expect_operand {
        let rule = match ops.last() {
            Some(Token::And) | Some(Token::Or) => "trailing_binary_operator",
            _ => "missing_operand",
        };
        return Err(Error::dsl_syntax(rule, "expression ends with an operator expecting an operand"));
    }

    while let Some(top) = ops.pop() {
        if matches!(top, Token::LParen) {
            return Err(Error::dsl_syntax("mismatched_parentheses", "unmatched '('"));
        }
        output.push(top);
    }

    Ok(output)
}
