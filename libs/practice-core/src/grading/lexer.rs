//! Tokenizer for the Python subset learners type into exercises.
//!
//! Produces one flat token stream with implicit line joining inside brackets
//! and backslash continuations. String literals are kept whole, so nothing
//! downstream ever looks inside them by accident.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unterminated string starting at line {line}")]
    UnterminatedString { line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Name,
    Number,
    Str,
    Op,
    Comment,
    /// End of a logical line.
    Newline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    /// Bracket nesting the token sits in; brackets carry their outer depth.
    pub depth: usize,
    /// Indentation width (in columns) of the token's logical line.
    pub indent: usize,
    /// First token of its logical line.
    pub line_start: bool,
}

const THREE_CHAR_OPS: [&str; 5] = ["**=", "//=", ">>=", "<<=", "..."];
const TWO_CHAR_OPS: [&str; 19] = [
    "**", "//", "<<", ">>", "<=", ">=", "==", "!=", "->", ":=", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "@=",
];
const STRING_PREFIXES: [&str; 8] = ["r", "u", "b", "f", "br", "rb", "fr", "rf"];
const TAB_WIDTH: usize = 4;

/// Tokenize `source`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(source);
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    depth: usize,
    indent: usize,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            depth: 0,
            indent: 0,
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn run(&mut self) -> Result<(), LexError> {
        while let Some(c) = self.peek(0) {
            if self.at_line_start && self.depth == 0 {
                self.indent = self.measure_indent();
                self.at_line_start = false;
                continue;
            }

            match c {
                '\n' => self.newline(),
                ' ' | '\t' | '\r' | '\x0c' => self.pos += 1,
                '\\' if self.peek(1) == Some('\n') => {
                    self.pos += 2;
                    self.line += 1;
                }
                '\\' if self.peek(1) == Some('\r') && self.peek(2) == Some('\n') => {
                    self.pos += 3;
                    self.line += 1;
                }
                '#' => self.comment(),
                '"' | '\'' => self.string(0)?,
                c if c.is_ascii_digit() => self.number(),
                '.' if self.peek(1).is_some_and(|n| n.is_ascii_digit()) => self.number(),
                c if c.is_alphabetic() || c == '_' => {
                    let prefix_len = self.string_prefix_len();
                    if prefix_len > 0 {
                        self.string(prefix_len)?;
                    } else {
                        self.name();
                    }
                }
                _ => self.op(),
            }
        }
        self.end_logical_line();
        Ok(())
    }

    fn measure_indent(&mut self) -> usize {
        let mut width = 0;
        while let Some(c) = self.peek(0) {
            match c {
                ' ' => width += 1,
                '\t' => width += TAB_WIDTH,
                '\x0c' => width = 0,
                _ => break,
            }
            self.pos += 1;
        }
        width
    }

    fn push(&mut self, kind: TokenKind, text: String, line: usize) {
        let line_start = kind != TokenKind::Comment
            && !self
                .tokens
                .iter()
                .rev()
                .find(|t| t.kind != TokenKind::Comment)
                .is_some_and(|t| t.kind != TokenKind::Newline);
        self.tokens.push(Token {
            kind,
            text,
            line,
            depth: self.depth,
            indent: self.indent,
            line_start,
        });
    }

    fn end_logical_line(&mut self) {
        let has_code = self
            .tokens
            .iter()
            .rev()
            .find(|t| t.kind != TokenKind::Comment)
            .is_some_and(|t| t.kind != TokenKind::Newline);
        if has_code {
            self.push(TokenKind::Newline, String::new(), self.line);
        }
    }

    fn newline(&mut self) {
        self.pos += 1;
        if self.depth == 0 {
            self.end_logical_line();
            self.at_line_start = true;
        }
        self.line += 1;
    }

    fn comment(&mut self) {
        let start = self.pos;
        while self.peek(0).is_some_and(|c| c != '\n') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::Comment, text, self.line);
    }

    /// Length of a string prefix (`f`, `rb`, ...) directly followed by a quote.
    fn string_prefix_len(&self) -> usize {
        for len in [2, 1] {
            let candidate: String = (0..len)
                .filter_map(|i| self.peek(i))
                .collect::<String>()
                .to_ascii_lowercase();
            if candidate.chars().count() == len
                && STRING_PREFIXES.contains(&candidate.as_str())
                && matches!(self.peek(len), Some('"') | Some('\''))
            {
                return len;
            }
        }
        0
    }

    fn string(&mut self, prefix_len: usize) -> Result<(), LexError> {
        let start = self.pos;
        let start_line = self.line;
        self.pos += prefix_len;

        let quote = self.peek(0).unwrap_or('"');
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        self.pos += if triple { 3 } else { 1 };

        loop {
            match self.peek(0) {
                None => return Err(LexError::UnterminatedString { line: start_line }),
                Some('\\') => {
                    if self.peek(1) == Some('\n') {
                        self.line += 1;
                    }
                    self.pos += 2;
                }
                Some('\n') if !triple => {
                    return Err(LexError::UnterminatedString { line: start_line })
                }
                Some('\n') => {
                    self.line += 1;
                    self.pos += 1;
                }
                Some(c) if c == quote => {
                    if !triple {
                        self.pos += 1;
                        break;
                    }
                    if self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                        self.pos += 3;
                        break;
                    }
                    self.pos += 1;
                }
                Some(_) => self.pos += 1,
            }
        }

        let end = self.pos.min(self.chars.len());
        let text: String = self.chars[start..end].iter().collect();
        self.push(TokenKind::Str, text, start_line);
        Ok(())
    }

    fn number(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek(0) {
            let exponent_sign = (c == '+' || c == '-')
                && self.pos > start
                && matches!(self.chars[self.pos - 1], 'e' | 'E')
                && !self.chars[start..self.pos]
                    .iter()
                    .any(|d| matches!(d, 'x' | 'X'));
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::Number, text, self.line);
    }

    fn name(&mut self) {
        let start = self.pos;
        while self
            .peek(0)
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.push(TokenKind::Name, text, self.line);
    }

    fn op(&mut self) {
        let rest = |len: usize| -> String { (0..len).filter_map(|i| self.peek(i)).collect() };
        let three = rest(3);
        let two = rest(2);
        let text = if THREE_CHAR_OPS.contains(&three.as_str()) {
            three
        } else if TWO_CHAR_OPS.contains(&two.as_str()) {
            two
        } else {
            rest(1)
        };
        self.pos += text.chars().count();

        match text.as_str() {
            "(" | "[" | "{" => {
                self.push(TokenKind::Op, text, self.line);
                self.depth += 1;
            }
            ")" | "]" | "}" => {
                self.depth = self.depth.saturating_sub(1);
                self.push(TokenKind::Op, text, self.line);
            }
            _ => self.push(TokenKind::Op, text, self.line),
        }
    }
}

/// Split a string literal into (prefix, body) with the quotes removed.
pub fn split_string_literal(text: &str) -> (&str, &str) {
    let quote_at = text.find(|c| c == '"' || c == '\'').unwrap_or(0);
    let (prefix, quoted) = text.split_at(quote_at);
    let quote = quoted.chars().next().unwrap_or('"');
    let triple: String = std::iter::repeat(quote).take(3).collect();
    let body = if quoted.len() >= 6 && quoted.starts_with(&triple) && quoted.ends_with(&triple) {
        &quoted[3..quoted.len() - 3]
    } else if quoted.len() >= 2 {
        &quoted[1..quoted.len() - 1]
    } else {
        ""
    };
    (prefix, body)
}
