//! Tokenizer for filter expressions

use crate::core::error::{LoggerError, Result};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "'{}'", name),
            TokenKind::Str(value) => write!(f, "string {:?}", value),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::Comma => write!(f, "','"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character
    pub position: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '.'
}

/// Split `input` into tokens, skipping whitespace
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(position, c)) = chars.peek() {
        let kind = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '"' => {
                chars.next();
                let value = read_string(&mut chars, position)?;
                tokens.push(Token {
                    kind: TokenKind::Str(value),
                    position,
                });
                continue;
            }
            c if is_ident_start(c) => {
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if !is_ident_part(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(name),
                    position,
                });
                continue;
            }
            other => {
                return Err(LoggerError::parse(
                    position,
                    format!("unexpected character '{}'", other),
                ))
            }
        };
        chars.next();
        tokens.push(Token { kind, position });
    }

    Ok(tokens)
}

/// Read the body of a string literal; the opening quote is already consumed
fn read_string(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    start: usize,
) -> Result<String> {
    let mut value = String::new();
    loop {
        match chars.next() {
            None => return Err(LoggerError::parse(start, "unterminated string")),
            Some((_, '"')) => return Ok(value),
            Some((escape_at, '\\')) => {
                let escaped = match chars.next() {
                    Some((_, '\\')) => '\\',
                    Some((_, '"')) => '"',
                    Some((_, '\'')) => '\'',
                    Some((_, 'b')) => '\u{8}',
                    Some((_, 'f')) => '\u{c}',
                    Some((_, 'n')) => '\n',
                    Some((_, 'r')) => '\r',
                    Some((_, 't')) => '\t',
                    Some((_, other)) => {
                        return Err(LoggerError::parse(
                            escape_at,
                            format!("invalid escape sequence '\\{}'", other),
                        ))
                    }
                    None => return Err(LoggerError::parse(start, "unterminated string")),
                };
                value.push(escaped);
            }
            Some((_, c)) => value.push(c),
        }
    }
}
