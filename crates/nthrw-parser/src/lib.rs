//! nthrw surface syntax
//!
//! Lexer and recursive-descent parser for the term language used in problem
//! files and rewrite rules. The output is an untyped [`SurfaceExpr`] with
//! named binders; the elaborator turns it into kernel terms.

pub mod grammar;
pub mod lexer;
pub mod surface;

pub use grammar::Parser;
pub use surface::{BinOp, Span, SurfaceBinder, SurfaceExpr, SurfaceLit, SurfaceRule, UniverseExpr};

use thiserror::Error;

/// Parser errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected character '{ch}' at {pos}")]
    UnexpectedChar { pos: usize, ch: char },

    #[error("unterminated string literal starting at {pos}")]
    UnterminatedString { pos: usize },

    #[error("numeric literal out of range at {pos}")]
    NumericOverflow { pos: usize },

    #[error("unexpected token at {col}: {message}")]
    UnexpectedToken { col: usize, message: String },

    #[error("unexpected end of input")]
    UnexpectedEof,
}

/// Parse a single expression, requiring the whole input to be consumed.
///
/// # Errors
///
/// Returns an error if tokenization or parsing fails.
pub fn parse_expr(input: &str) -> Result<SurfaceExpr, ParseError> {
    Parser::parse_expr(input)
}

/// Parse a rewrite rule: a term optionally prefixed by `←` (or `<-`).
///
/// # Errors
///
/// Returns an error if tokenization or parsing fails.
pub fn parse_rule(input: &str) -> Result<SurfaceRule, ParseError> {
    Parser::parse_rule(input)
}
