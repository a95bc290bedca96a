//! Recursive descent parser for filter expressions

use super::tokenizer::{tokenize, Token, TokenKind};
use super::NameResolver;
use crate::core::error::{LoggerError, Result};
use crate::core::filter::Filter;
use crate::core::level::Level;

/// Deepest accepted nesting of sub-expressions. Filters are evaluated,
/// rendered and dropped recursively, so the bound also caps their stack use.
pub(crate) const MAX_NESTING: usize = 64;

pub(crate) struct Parser<'a, R: NameResolver + ?Sized> {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
    depth: usize,
    resolver: &'a R,
}

impl<'a, R: NameResolver + ?Sized> Parser<'a, R> {
    pub(crate) fn new(input: &str, resolver: &'a R) -> Result<Self> {
        Ok(Self {
            tokens: tokenize(input)?,
            pos: 0,
            end: input.len(),
            depth: 0,
            resolver,
        })
    }

    /// Parse one complete expression; leftover tokens are an error
    pub(crate) fn parse(mut self) -> Result<Filter> {
        let filter = self.expr()?;
        match self.tokens.get(self.pos) {
            None => Ok(filter),
            Some(token) => Err(LoggerError::parse(
                token.position,
                format!("unexpected trailing input {}", token.kind),
            )),
        }
    }

    fn expr(&mut self) -> Result<Filter> {
        if self.depth == MAX_NESTING {
            return Err(LoggerError::parse(
                self.position(),
                "expression nested too deeply",
            ));
        }
        self.depth += 1;
        let filter = self.term();
        self.depth -= 1;
        filter
    }

    fn term(&mut self) -> Result<Filter> {
        let (name, position) = self.ident("filter expression")?;
        match name.as_str() {
            "accept" => Ok(Filter::Accept),
            "deny" => Ok(Filter::Deny),
            "not" => {
                self.expect(TokenKind::LParen)?;
                let inner = self.expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(Filter::not(inner))
            }
            "all" => Ok(Filter::All(self.list(Self::expr)?)),
            "any" => Ok(Filter::Any(self.list(Self::expr)?)),
            "levels" => Ok(Filter::Levels(self.list(Self::level)?)),
            "levelRange" => {
                let min_inclusive = match self.next("'[' or '('")? {
                    Token { kind: TokenKind::LBracket, .. } => true,
                    Token { kind: TokenKind::LParen, .. } => false,
                    token => return Err(unexpected(&token, "'[' or '('")),
                };
                let min = self.level()?;
                self.expect(TokenKind::Comma)?;
                let max = self.level()?;
                let max_inclusive = match self.next("']' or ')'")? {
                    Token { kind: TokenKind::RBracket, .. } => true,
                    Token { kind: TokenKind::RParen, .. } => false,
                    token => return Err(unexpected(&token, "']' or ')'")),
                };
                Ok(Filter::level_range(min, min_inclusive, max, max_inclusive))
            }
            "levelChange" => {
                self.expect(TokenKind::LParen)?;
                let level = self.level()?;
                self.expect(TokenKind::RParen)?;
                Ok(Filter::LevelChange(level))
            }
            "match" => {
                self.expect(TokenKind::LParen)?;
                let (pattern, at) = self.string()?;
                self.expect(TokenKind::RParen)?;
                Filter::match_pattern(&pattern).map_err(|e| invalid_pattern(at, e))
            }
            "substitute" | "substituteAll" => {
                self.expect(TokenKind::LParen)?;
                let (pattern, at) = self.string()?;
                self.expect(TokenKind::Comma)?;
                let (replacement, _) = self.string()?;
                self.expect(TokenKind::RParen)?;
                Filter::substitute(&pattern, replacement, name == "substituteAll")
                    .map_err(|e| invalid_pattern(at, e))
            }
            other => match self.resolver.filter(other) {
                Some(filter) => Ok(filter.registered_as(other)),
                None => Err(LoggerError::parse(
                    position,
                    format!("unknown filter '{}'", other),
                )),
            },
        }
    }

    /// `'(' item (',' item)* ')'`
    fn list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
        self.expect(TokenKind::LParen)?;
        let mut items = vec![item(self)?];
        loop {
            match self.next("',' or ')'")? {
                Token { kind: TokenKind::Comma, .. } => items.push(item(self)?),
                Token { kind: TokenKind::RParen, .. } => return Ok(items),
                token => return Err(unexpected(&token, "',' or ')'")),
            }
        }
    }

    fn level(&mut self) -> Result<Level> {
        let (name, position) = self.ident("level name")?;
        self.resolver.level(&name).map_err(|_| {
            LoggerError::parse(position, format!("unknown level '{}'", name))
        })
    }

    fn ident(&mut self, expected: &str) -> Result<(String, usize)> {
        match self.next(expected)? {
            Token {
                kind: TokenKind::Ident(name),
                position,
            } => Ok((name, position)),
            token => Err(unexpected(&token, expected)),
        }
    }

    fn string(&mut self) -> Result<(String, usize)> {
        match self.next("string")? {
            Token {
                kind: TokenKind::Str(value),
                position,
            } => Ok((value, position)),
            token => Err(unexpected(&token, "string")),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<()> {
        let expected = kind.to_string();
        let token = self.next(&expected)?;
        if token.kind == kind {
            Ok(())
        } else {
            Err(unexpected(&token, &expected))
        }
    }

    /// Offset of the next token, or the input length at the end
    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |token| token.position)
    }

    fn next(&mut self, expected: &str) -> Result<Token> {
        let token = self.tokens.get(self.pos).cloned().ok_or_else(|| {
            LoggerError::parse(
                self.end,
                format!("expected {} but reached end of expression", expected),
            )
        })?;
        self.pos += 1;
        Ok(token)
    }
}

fn unexpected(token: &Token, expected: &str) -> LoggerError {
    LoggerError::parse(
        token.position,
        format!("expected {} but found {}", expected, token.kind),
    )
}

fn invalid_pattern(position: usize, error: LoggerError) -> LoggerError {
    let message = match error {
        LoggerError::InvalidConfiguration { message, .. } => message,
        other => other.to_string(),
    };
    LoggerError::parse(position, format!("invalid pattern: {}", message))
}
