//! Algebraic simplification over a postfix stream (spec §4.2 step 3):
//! `!!x -> x`, `x&x -> x`, `x|x -> x`. A single linear pass with a working
//! stack, mirroring the way `to_postfix` itself evaluates the stream.

use crate::token::Token;

/// Simplify a postfix token stream by folding the three redundancy laws.
/// Operates structurally on the stack of already-simplified sub-expressions,
/// so nested redundancies (`!!!!x`, `(x&x)&x`) collapse in one pass.
pub fn simplify(postfix: &[Token]) -> Vec<Token> {
    // each stack entry is a simplified sub-expression, represented as its
    // own postfix slice so we can compare and re-fold it structurally.
    let mut stack: Vec<Vec<Token>> = Vec::new();

    for token in postfix {
        match token {
            Token::Ident(_) => stack.push(vec![token.clone()]),
            Token::Not => {
                let inner = stack.pop().expect("well-formed postfix: NOT needs one operand");
                if let [Token::Not, rest @ ..] = inner.as_slice() {
                    // !!x -> x
                    stack.push(rest.to_vec());
                } else {
                    let mut folded = inner;
                    folded.push(Token::Not);
                    stack.push(folded);
                }
            }
            Token::And | Token::Or => {
                let right = stack.pop().expect("well-formed postfix: binary op needs right operand");
                let left = stack.pop().expect("well-formed postfix: binary op needs left operand");
                if left == right {
                    // x&x -> x, x|x -> x
                    stack.push(left);
                } else {
                    let mut folded = left;
                    folded.extend(right);
                    folded.push(token.clone());
                    stack.push(folded);
                }
            }
            Token::LParen | Token::RParen => unreachable!("postfix streams never contain parentheses"),
        }
    }

    stack.pop().unwrap_or_default()
}
