//! Target-construct detection.
//!
//! Works on the token stream, so an idiom spelled out inside a string literal
//! or a comment never counts.

use super::lexer::{split_string_literal, tokenize, Token, TokenKind};
use crate::types::ConstructType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comprehension {
    List,
    Dict,
    Set,
    Generator,
}

/// Whether `code` uses `construct`. Code that does not tokenize uses nothing.
pub fn detect_construct(code: &str, construct: ConstructType) -> bool {
    let tokens: Vec<Token> = match tokenize(code) {
        Ok(tokens) => tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Comment)
            .collect(),
        Err(err) => {
            tracing::debug!(%err, "construct detection skipped");
            return false;
        }
    };

    match construct {
        ConstructType::Slice => has_slice(&tokens),
        ConstructType::Comprehension => !comprehensions(&tokens).is_empty(),
        ConstructType::ListComprehension => comprehensions(&tokens).contains(&Comprehension::List),
        ConstructType::DictComprehension => comprehensions(&tokens).contains(&Comprehension::Dict),
        ConstructType::SetComprehension => comprehensions(&tokens).contains(&Comprehension::Set),
        ConstructType::GeneratorExpression => {
            comprehensions(&tokens).contains(&Comprehension::Generator)
        }
        ConstructType::FString => tokens.iter().any(|t| {
            t.kind == TokenKind::Str
                && split_string_literal(&t.text)
                    .0
                    .to_ascii_lowercase()
                    .contains('f')
        }),
        ConstructType::Enumerate => calls(&tokens, "enumerate"),
        ConstructType::Zip => calls(&tokens, "zip"),
        ConstructType::Lambda => tokens.iter().any(|t| is_name(t, "lambda")),
        ConstructType::Ternary => has_ternary(&tokens),
        ConstructType::Walrus => tokens.iter().any(|t| is_op(t, ":=")),
        ConstructType::With => tokens.iter().enumerate().any(|(i, t)| {
            is_name(t, "with")
                && (t.line_start || i.checked_sub(1).is_some_and(|p| is_name(&tokens[p], "async")))
        }),
    }
}

fn is_name(token: &Token, name: &str) -> bool {
    token.kind == TokenKind::Name && token.text == name
}

fn is_op(token: &Token, op: &str) -> bool {
    token.kind == TokenKind::Op && token.text == op
}

/// Tokens strictly inside the bracket opened at `open`.
fn group_body(tokens: &[Token], open: usize) -> &[Token] {
    let depth = tokens[open].depth;
    let close = tokens[open + 1..]
        .iter()
        .position(|t| t.depth == depth && t.kind == TokenKind::Op && matches!(t.text.as_str(), ")" | "]" | "}"))
        .map(|offset| open + 1 + offset)
        .unwrap_or(tokens.len());
    &tokens[open + 1..close]
}

fn has_slice(tokens: &[Token]) -> bool {
    tokens.iter().enumerate().any(|(i, t)| {
        if !is_op(t, "[") || i == 0 {
            return false;
        }
        let previous = &tokens[i - 1];
        let subscript = match previous.kind {
            TokenKind::Name => !matches!(previous.text.as_str(), "in" | "return" | "yield" | "else"),
            TokenKind::Str => true,
            TokenKind::Op => previous.text == ")" || previous.text == "]",
            _ => false,
        };
        subscript
            && group_body(tokens, i)
                .iter()
                .any(|inner| inner.depth == t.depth + 1 && is_op(inner, ":"))
    })
}

fn comprehensions(tokens: &[Token]) -> Vec<Comprehension> {
    let mut found = Vec::new();
    for (i, t) in tokens.iter().enumerate() {
        if t.kind != TokenKind::Op {
            continue;
        }
        let top_level: Vec<&Token> = match t.text.as_str() {
            "(" | "[" | "{" => group_body(tokens, i)
                .iter()
                .filter(|inner| inner.depth == t.depth + 1)
                .collect(),
            _ => continue,
        };
        let Some(for_at) = top_level.iter().position(|inner| is_name(inner, "for")) else {
            continue;
        };
        found.push(match t.text.as_str() {
            "[" => Comprehension::List,
            "(" => Comprehension::Generator,
            _ if top_level[..for_at].iter().any(|inner| is_op(inner, ":")) => Comprehension::Dict,
            _ => Comprehension::Set,
        });
    }
    found
}

fn calls(tokens: &[Token], name: &str) -> bool {
    tokens
        .windows(2)
        .any(|pair| is_name(&pair[0], name) && is_op(&pair[1], "("))
}

/// `a if cond else b`: an `if` inside an expression with an `else` at the
/// same depth on the same logical line.
fn has_ternary(tokens: &[Token]) -> bool {
    tokens.iter().enumerate().any(|(i, t)| {
        is_name(t, "if")
            && !t.line_start
            && tokens[i + 1..]
                .iter()
                .take_while(|next| next.kind != TokenKind::Newline)
                .any(|next| next.depth == t.depth && is_name(next, "else"))
    })
}
