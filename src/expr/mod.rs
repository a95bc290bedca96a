//! Filter expression language
//!
//! ```text
//! expr := 'accept' | 'deny' | 'not' '(' expr ')'
//!       | 'all' '(' expr (',' expr)* ')'
//!       | 'any' '(' expr (',' expr)* ')'
//!       | 'levels' '(' level (',' level)* ')'
//!       | 'levelRange' ('[' | '(') level ',' level (']' | ')')
//!       | 'levelChange' '(' level ')'
//!       | 'match' '(' string ')'
//!       | 'substitute' '(' string ',' string ')'
//!       | 'substituteAll' '(' string ',' string ')'
//!       | identifier
//! ```
//!
//! A bare identifier names a filter registered with the resolver. Any
//! tokenizer or grammar failure aborts the parse; no partial filter is
//! returned. Expressions nested more than 64 levels deep are rejected.

mod parser;
pub mod tokenizer;

use crate::core::error::Result;
use crate::core::filter::Filter;
use crate::core::level::Level;

/// Resolves names appearing in an expression
pub trait NameResolver {
    fn level(&self, name: &str) -> Result<Level>;

    fn filter(&self, name: &str) -> Option<Filter>;
}

/// Compile `expression` into a [`Filter`]
pub fn parse<R: NameResolver + ?Sized>(expression: &str, resolver: &R) -> Result<Filter> {
    parser::Parser::new(expression, resolver)?.parse()
}
