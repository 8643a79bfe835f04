//! SQL script splitting
//!
//! Stage scripts are executed one statement at a time, so a script is cut at every `;`
//! that is not inside a string literal, a quoted identifier, a comment, or a
//! dollar-quoted body (`$$ ... $$`, `$fn$ ... $fn$`). Comments are dropped.
//!
//! Backslash escapes are honoured only in `E'...'` strings. A `$` that continues an
//! identifier (`a$b$c`) never opens a dollar quote.

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuoted { escapes: bool },
    DoubleQuoted,
    LineComment,
    BlockComment(usize),
    DollarQuoted(String),
}

/// Split a SQL script into trimmed, non-empty statements without their trailing `;`
#[must_use]
pub fn split_statements(script: &str) -> Vec<String> {
    let chars: Vec<char> = script.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match &state {
            State::Normal => match c {
                ';' => {
                    push_statement(&mut statements, &mut current);
                }
                '\'' => {
                    current.push(c);
                    state = State::SingleQuoted {
                        escapes: is_escape_prefix(&chars, i),
                    };
                }
                '"' => {
                    current.push(c);
                    state = State::DoubleQuoted;
                }
                '-' if next == Some('-') => {
                    state = State::LineComment;
                    i += 1;
                }
                '/' if next == Some('*') => {
                    current.push(' ');
                    state = State::BlockComment(1);
                    i += 1;
                }
                '$' if i > 0 && is_identifier_char(chars[i - 1]) => current.push(c),
                '$' => {
                    if let Some(tag) = dollar_tag(&chars, i) {
                        current.push_str(&tag);
                        i += tag.chars().count();
                        state = State::DollarQuoted(tag);
                        continue;
                    }
                    current.push(c);
                }
                _ => current.push(c),
            },
            State::SingleQuoted { escapes } => {
                current.push(c);
                if *escapes && c == '\\' {
                    if let Some(escaped) = next {
                        current.push(escaped);
                        i += 1;
                    }
                } else if c == '\'' {
                    if next == Some('\'') {
                        current.push('\'');
                        i += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                current.push(c);
                if c == '"' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    current.push('\n');
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                let depth = *depth;
                if c == '*' && next == Some('/') {
                    i += 1;
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                } else if c == '/' && next == Some('*') {
                    i += 1;
                    state = State::BlockComment(depth + 1);
                }
            }
            State::DollarQuoted(tag) => {
                if c == '$' && matches_at(&chars, i, tag) {
                    let len = tag.chars().count();
                    current.push_str(tag);
                    i += len;
                    state = State::Normal;
                    continue;
                }
                current.push(c);
            }
        }
        i += 1;
    }

    push_statement(&mut statements, &mut current);
    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let statement = current.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
    current.clear();
}

fn is_identifier_char(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphanumeric()
}

/// `E'...'` or `e'...'`, where the `E` is not the tail of a longer word
fn is_escape_prefix(chars: &[char], quote: usize) -> bool {
    match quote.checked_sub(1).map(|p| chars[p]) {
        Some('E' | 'e') => quote < 2 || !is_identifier_char(chars[quote - 2]),
        _ => false,
    }
}

/// The full opening tag (`$$` or `$name$`) starting at `start`, if there is one.
/// `$1`-style parameters are not tags.
fn dollar_tag(chars: &[char], start: usize) -> Option<String> {
    let mut end = start + 1;
    while let Some(&c) = chars.get(end) {
        if c == '$' {
            let tag: String = chars[start..=end].iter().collect();
            return Some(tag);
        }
        let valid = c == '_' || c.is_alphabetic() || (end > start + 1 && c.is_ascii_digit());
        if !valid {
            return None;
        }
        end += 1;
    }
    None
}

fn matches_at(chars: &[char], start: usize, tag: &str) -> bool {
    tag.chars()
        .enumerate()
        .all(|(offset, t)| chars.get(start + offset) == Some(&t))
}
