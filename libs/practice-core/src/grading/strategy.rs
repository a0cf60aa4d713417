//! Strategy resolution and the in-process matchers.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::lexer::{split_string_literal, tokenize, LexError, Token, TokenKind};
use super::normalize::normalize_code;
use crate::types::{Exercise, ExerciseType, GradingStrategy};

/// Primary grading strategy and the one used when the primary cannot run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyPlan {
    pub primary: GradingStrategy,
    pub fallback: Option<GradingStrategy>,
}

/// Decide how an exercise is graded.
///
/// An explicit `grading_strategy` wins, then a verification script or the
/// legacy `verify_by_execution` flag, then the exercise type default:
/// fill-in is exact, write is structural with exact fallback, predict is
/// executed with exact fallback.
pub fn resolve_strategy(exercise: &Exercise) -> StrategyPlan {
    let fallback_for = |primary: GradingStrategy| match primary {
        GradingStrategy::Exact => None,
        _ => Some(GradingStrategy::Exact),
    };

    if let Some(primary) = exercise.grading_strategy {
        return StrategyPlan {
            primary,
            fallback: fallback_for(primary),
        };
    }
    if exercise.verification_script.is_some() || exercise.verify_by_execution {
        return StrategyPlan {
            primary: GradingStrategy::Execution,
            fallback: Some(GradingStrategy::Exact),
        };
    }

    let primary = match exercise.exercise_type {
        ExerciseType::FillIn => GradingStrategy::Exact,
        ExerciseType::Write => GradingStrategy::Ast,
        ExerciseType::Predict => GradingStrategy::Execution,
    };
    StrategyPlan {
        primary,
        fallback: fallback_for(primary),
    }
}

/// How an answer matched a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Equal after whitespace normalization or token for token.
    Literal,
    /// Equal only after structural canonicalization.
    Structural,
}

/// Compare `answer` with one candidate using an in-process strategy.
///
/// `Execution` is not an in-process strategy; it compares like `Exact`.
pub fn match_answer(strategy: GradingStrategy, answer: &str, candidate: &str) -> Option<MatchKind> {
    if normalize_code(answer) == normalize_code(candidate) {
        return Some(MatchKind::Literal);
    }
    match strategy {
        GradingStrategy::Exact | GradingStrategy::Execution => None,
        GradingStrategy::Token => tokens_equal(answer, candidate).then_some(MatchKind::Literal),
        GradingStrategy::Ast => {
            if tokens_equal(answer, candidate) {
                Some(MatchKind::Literal)
            } else if structure_equal(answer, candidate) {
                Some(MatchKind::Structural)
            } else {
                None
            }
        }
    }
}

/// Lexical equality: same tokens on the same indentation levels, comments
/// ignored.
pub fn tokens_equal(a: &str, b: &str) -> bool {
    match (lexical_pieces(a), lexical_pieces(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Structural equality: like [`tokens_equal`] after canonicalizing quote
/// style, string prefixes, numeric separators and trailing commas.
pub fn structure_equal(a: &str, b: &str) -> bool {
    match (canonical_pieces(a), canonical_pieces(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Indent(usize),
    Token(TokenKind, String),
}

/// Names after which a bracket opens a literal rather than a call.
const KEYWORDS: [&str; 20] = [
    "and", "as", "assert", "await", "del", "elif", "else", "for", "from", "if", "import", "in",
    "is", "lambda", "not", "or", "return", "while", "with", "yield",
];

fn code_tokens(source: &str) -> Result<Vec<Token>, LexError> {
    Ok(tokenize(source)?
        .into_iter()
        .filter(|t| t.kind != TokenKind::Comment)
        .collect())
}

fn with_indent_levels(tokens: Vec<Token>, mut piece: impl FnMut(&Token) -> Piece) -> Vec<Piece> {
    let widths: BTreeSet<usize> = tokens
        .iter()
        .filter(|t| t.line_start)
        .map(|t| t.indent)
        .collect();

    let mut pieces = Vec::with_capacity(tokens.len());
    for token in &tokens {
        if token.line_start {
            let level = widths.iter().position(|w| *w == token.indent).unwrap_or(0);
            pieces.push(Piece::Indent(level));
        }
        pieces.push(piece(token));
    }
    pieces
}

fn lexical_pieces(source: &str) -> Result<Vec<Piece>, LexError> {
    let tokens = code_tokens(source)?;
    Ok(with_indent_levels(tokens, |t| {
        Piece::Token(t.kind, t.text.clone())
    }))
}

struct Group {
    opener: String,
    is_call: bool,
    commas: usize,
}

fn canonical_pieces(source: &str) -> Result<Vec<Piece>, LexError> {
    let tokens = code_tokens(source)?;
    let mut kept: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut groups: Vec<Group> = Vec::new();

    for token in tokens {
        match (token.kind, token.text.as_str()) {
            (TokenKind::Op, "(" | "[" | "{") => {
                groups.push(Group {
                    opener: token.text.clone(),
                    is_call: kept.last().is_some_and(opens_call),
                    commas: 0,
                });
            }
            (TokenKind::Op, ")" | "]" | "}") => {
                let group = groups.pop();
                let trailing_comma = kept
                    .last()
                    .is_some_and(|t| t.kind == TokenKind::Op && t.text == ",");
                if trailing_comma {
                    let single_tuple = group
                        .is_some_and(|g| g.opener == "(" && !g.is_call && g.commas == 1);
                    if !single_tuple {
                        kept.pop();
                    }
                }
            }
            (TokenKind::Op, ",") => {
                if let Some(group) = groups.last_mut() {
                    group.commas += 1;
                }
            }
            _ => {}
        }
        kept.push(token);
    }

    Ok(with_indent_levels(kept, |t| match t.kind {
        TokenKind::Str => Piece::Token(TokenKind::Str, canonical_string(&t.text)),
        TokenKind::Number => Piece::Token(
            TokenKind::Number,
            t.text.replace('_', "").to_ascii_lowercase(),
        ),
        kind => Piece::Token(kind, t.text.clone()),
    }))
}

fn opens_call(previous: &Token) -> bool {
    match previous.kind {
        TokenKind::Name => !KEYWORDS.contains(&previous.text.as_str()),
        TokenKind::Str => true,
        TokenKind::Op => previous.text == ")" || previous.text == "]",
        _ => false,
    }
}

/// `'a'`, `"a"`, `u"a"` and `'''a'''` all canonicalize alike.
fn canonical_string(literal: &str) -> String {
    let (prefix, body) = split_string_literal(literal);
    let mut prefix: Vec<char> = prefix
        .to_ascii_lowercase()
        .chars()
        .filter(|c| *c != 'u')
        .collect();
    prefix.sort_unstable();
    let prefix: String = prefix.into_iter().collect();
    let body = if prefix.contains('r') {
        body.to_string()
    } else {
        body.replace("\\'", "'").replace("\\\"", "\"")
    };
    format!("{prefix}:{body}")
}
