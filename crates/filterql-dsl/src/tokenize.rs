//! Tokenizing the combinator DSL (spec §4.2 step 1).
//!
//! Grounded on `postrust_core::api_request::query_params`'s nom-combinator
//! style (small focused parse functions chained with `alt`/`many0`) —
//! adapted here from URL-query-parameter parsing to a small Boolean-DSL
//! scanner, since both are the same kind of job: turn a flat string into a
//! token stream, one character class at a time.

use crate::token::Token;
use filterql_core::{DslPolicy, Error, Result};
use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{map, value},
    multi::many0,
    IResult,
};

/// Tokenize `input` under `policy`. Rejects blank input and input longer
/// than `policy.max_expression_length` before attempting to scan.
pub fn tokenize(input: &str, policy: &DslPolicy) -> Result<Vec<Token>> {
    if input.trim().is_empty() {
        return Err(Error::dsl_syntax("empty_expression", "DSL expression must not be blank"));
    }
    if input.len() > policy.max_expression_length {
        return Err(Error::dsl_syntax(
            "expression_too_long",
            format!(
                "DSL expression length {} exceeds the configured maximum of {}",
                input.len(),
                policy.max_expression_length
            ),
        ));
    }

    let mut tokens = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            break;
        }
        let (next, token) = scan_one(trimmed, policy)?;
        tokens.push(token);
        rest = next;
    }
    Ok(tokens)
}

fn scan_one<'a>(input: &'a str, policy: &DslPolicy) -> Result<(&'a str, Token)> {
    if let Ok((rest, tok)) = scan_symbol(input) {
        return Ok((rest, tok));
    }
    scan_ident(input, policy)
}

fn scan_symbol(input: &str) -> IResult<&str, Token> {
    alt((
        value(Token::And, char('&')),
        value(Token::Or, char('|')),
        value(Token::Not, char('!')),
        value(Token::LParen, char('(')),
        value(Token::RParen, char(')')),
    ))(input)
}

/// `IDENT = [^ &|!()]+` (or the strict-mode identifier pattern).
fn scan_ident<'a>(input: &'a str, policy: &DslPolicy) -> Result<(&'a str, Token)> {
    let result: IResult<&str, &str> = map(
        take_while1(|c: char| !c.is_whitespace() && !"&|!()".contains(c)),
        |s: &str| s,
    )(input);

    let (rest, raw) = result
        .map_err(|_| Error::dsl_syntax("invalid_identifier", format!("could not scan an identifier from '{input}'")))?;

    if policy.strict_identifiers && !is_strict_identifier(raw) {
        return Err(Error::dsl_syntax(
            "invalid_identifier",
            format!("'{raw}' is not a valid identifier under strict mode"),
        ));
    }

    Ok((rest, Token::Ident(raw.to_string())))
}

fn is_strict_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
