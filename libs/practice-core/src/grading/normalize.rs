//! Answer normalization for literal comparison.
//!
//! Outside string literals: trailing whitespace and blank lines go away,
//! runs of spaces collapse, spaces next to punctuation are dropped and
//! indentation is rewritten to four spaces per nesting level. Inside string
//! literals every character is kept verbatim.

use std::collections::BTreeSet;

const PUNCTUATION: &str = "()[]{},:;.=+-*/%<>!&|^~@";

/// Normalize a code answer for comparison.
pub fn normalize_code(source: &str) -> String {
    let lines = split_logical_lines(source);

    let widths: BTreeSet<usize> = lines.iter().map(|l| l.indent).collect();
    let level_of = |indent: usize| widths.iter().position(|w| *w == indent).unwrap_or(0);

    lines
        .iter()
        .map(|line| format!("{}{}", "    ".repeat(level_of(line.indent)), line.content))
        .collect::<Vec<_>>()
        .join("\n")
}

struct Line {
    indent: usize,
    content: String,
}

#[derive(Clone, Copy)]
struct Quote {
    ch: char,
    triple: bool,
}

fn split_logical_lines(source: &str) -> Vec<Line> {
    let chars: Vec<char> = source.chars().collect();
    let mut lines = Vec::new();
    let mut content = String::new();
    let mut indent = 0;
    let mut at_line_start = true;
    let mut pending_space = false;
    let mut quote: Option<Quote> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(q) = quote {
            content.push(c);
            if c == '\\' {
                if let Some(next) = chars.get(i + 1) {
                    content.push(*next);
                }
                i += 2;
                continue;
            }
            if c == q.ch {
                if !q.triple {
                    quote = None;
                } else if chars.get(i + 1) == Some(&q.ch) && chars.get(i + 2) == Some(&q.ch) {
                    content.push(q.ch);
                    content.push(q.ch);
                    i += 2;
                    quote = None;
                }
            } else if c == '\n' && !q.triple {
                // Unterminated single-quoted string; resume normal scanning.
                content.pop();
                quote = None;
                continue;
            }
            i += 1;
            continue;
        }

        if at_line_start {
            let mut width = 0;
            while let Some(w) = chars.get(i) {
                match w {
                    ' ' => width += 1,
                    '\t' => width += 4,
                    '\r' => {}
                    _ => break,
                }
                i += 1;
            }
            indent = width;
            at_line_start = false;
            continue;
        }

        match c {
            '\n' => {
                if !content.is_empty() {
                    lines.push(Line {
                        indent,
                        content: std::mem::take(&mut content),
                    });
                }
                pending_space = false;
                at_line_start = true;
            }
            ' ' | '\t' | '\r' => pending_space = true,
            _ => {
                if pending_space && needs_space(content.chars().last(), c) {
                    content.push(' ');
                }
                pending_space = false;
                content.push(c);
                if c == '"' || c == '\'' {
                    let triple = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
                    if triple {
                        content.push(c);
                        content.push(c);
                        i += 2;
                    }
                    quote = Some(Quote { ch: c, triple });
                }
            }
        }
        i += 1;
    }

    if !content.is_empty() {
        lines.push(Line { indent, content });
    }
    lines
}

fn needs_space(prev: Option<char>, next: char) -> bool {
    match prev {
        None => false,
        Some(p) => !PUNCTUATION.contains(p) && !PUNCTUATION.contains(next),
    }
}
