//! Recursive descent parser
//!
//! Parses tokens into a surface syntax AST. Precedence, lowest first:
//! `↔` (20), `→` (25, right-associative), `=` (50), `+` (65), `*` (70),
//! application. Binder forms (`∀`, `fun`) extend as far right as possible.

use crate::lexer::{Lexer, Token, TokenKind};
use crate::surface::{
    BinOp, Span, SurfaceBinder, SurfaceExpr, SurfaceLit, SurfaceRule, UniverseExpr,
};
use crate::ParseError;

/// Parser state
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// # Errors
    ///
    /// Returns an error if tokenization fails.
    pub fn new(input: &str) -> Result<Self, ParseError> {
        Ok(Self {
            tokens: Lexer::tokenize(input)?,
            pos: 0,
        })
    }

    /// Parse an expression
    ///
    /// # Errors
    ///
    /// Returns an error if tokenization or parsing fails, or if input
    /// remains after the expression.
    pub fn parse_expr(input: &str) -> Result<SurfaceExpr, ParseError> {
        let mut parser = Parser::new(input)?;
        let expr = parser.expr()?;
        parser.finish()?;
        Ok(expr)
    }

    /// Parse a rewrite rule: `[←] term`
    ///
    /// # Errors
    ///
    /// Returns an error if tokenization or parsing fails.
    pub fn parse_rule(input: &str) -> Result<SurfaceRule, ParseError> {
        let mut parser = Parser::new(input)?;
        let start = parser.current_span();
        let reversed = parser.eat(&TokenKind::LeftArrow);
        let term = parser.expr()?;
        parser.finish()?;
        Ok(SurfaceRule {
            span: start.merge(term.span()),
            reversed,
            term,
        })
    }

    fn finish(&self) -> Result<(), ParseError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    // Token access

    fn current(&self) -> &Token {
        // `tokenize` always yields a trailing Eof and `advance` never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn current_span(&self) -> Span {
        self.current().span
    }

    fn advance(&mut self) -> &Token {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[self.pos.saturating_sub(1)]
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Span, ParseError> {
        if self.check(kind) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(&format!("{kind:?}")))
        }
    }

    fn at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        if self.at_end() {
            return ParseError::UnexpectedEof;
        }
        ParseError::UnexpectedToken {
            col: self.current_span().start,
            message: format!("expected {expected}, got {:?}", self.current_kind()),
        }
    }

    // Parsing

    /// Parse an expression
    fn expr(&mut self) -> Result<SurfaceExpr, ParseError> {
        self.iff_expr()
    }

    /// Iff expressions: A ↔ B (precedence 20)
    fn iff_expr(&mut self) -> Result<SurfaceExpr, ParseError> {
        let mut left = self.arrow_expr()?;

        while self.eat(&TokenKind::Iff) {
            let right = self.arrow_expr()?;
            left = binop(BinOp::Iff, left, right);
        }

        Ok(left)
    }

    /// Arrow: A → B (precedence 25, right-associative)
    fn arrow_expr(&mut self) -> Result<SurfaceExpr, ParseError> {
        let left = self.eq_expr()?;

        if self.eat(&TokenKind::Arrow) {
            let right = self.arrow_expr()?;
            let span = left.span().merge(right.span());
            return Ok(SurfaceExpr::Arrow(span, Box::new(left), Box::new(right)));
        }

        Ok(left)
    }

    /// Equality: a = b (precedence 50, non-associative)
    fn eq_expr(&mut self) -> Result<SurfaceExpr, ParseError> {
        let left = self.add_expr()?;

        if self.eat(&TokenKind::Eq) {
            let right = self.add_expr()?;
            return Ok(binop(BinOp::Eq, left, right));
        }

        Ok(left)
    }

    /// Addition: a + b (precedence 65, left-associative)
    fn add_expr(&mut self) -> Result<SurfaceExpr, ParseError> {
        let mut left = self.mul_expr()?;

        while self.eat(&TokenKind::Plus) {
            let right = self.mul_expr()?;
            left = binop(BinOp::Add, left, right);
        }

        Ok(left)
    }

    /// Multiplication: a * b (precedence 70, left-associative)
    fn mul_expr(&mut self) -> Result<SurfaceExpr, ParseError> {
        let mut left = self.app_expr()?;

        while self.eat(&TokenKind::Star) {
            let right = self.app_expr()?;
            left = binop(BinOp::Mul, left, right);
        }

        Ok(left)
    }

    /// Application by juxtaposition
    fn app_expr(&mut self) -> Result<SurfaceExpr, ParseError> {
        let head = self.atom_expr()?;
        let mut args = Vec::new();

        while self.is_atom_start() {
            let arg = self.atom_expr()?;
            // A binder argument swallows the rest of the input
            let is_binder = matches!(arg, SurfaceExpr::Lambda(..) | SurfaceExpr::Pi(..));
            args.push(arg);
            if is_binder {
                break;
            }
        }

        if args.is_empty() {
            return Ok(head);
        }
        let span = args
            .iter()
            .fold(head.span(), |span, arg| span.merge(arg.span()));
        Ok(SurfaceExpr::App(span, Box::new(head), args))
    }

    fn is_atom_start(&self) -> bool {
        matches!(
            self.current_kind(),
            TokenKind::Ident(_)
                | TokenKind::NatLit(_)
                | TokenKind::StrLit(_)
                | TokenKind::LParen
                | TokenKind::Forall
                | TokenKind::Fun
        )
    }

    fn atom_expr(&mut self) -> Result<SurfaceExpr, ParseError> {
        let span = self.current_span();
        match self.current_kind().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(match name.as_str() {
                    "Prop" => SurfaceExpr::Universe(span, UniverseExpr::Prop),
                    "Type" => SurfaceExpr::Universe(span, UniverseExpr::Type),
                    _ => SurfaceExpr::Ident(span, name),
                })
            }
            TokenKind::NatLit(n) => {
                self.advance();
                Ok(SurfaceExpr::Lit(span, SurfaceLit::Nat(n)))
            }
            TokenKind::StrLit(s) => {
                self.advance();
                Ok(SurfaceExpr::Lit(span, SurfaceLit::String(s)))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.expr()?;
                let end = self.expect(&TokenKind::RParen)?;
                Ok(SurfaceExpr::Paren(span.merge(end), Box::new(inner)))
            }
            TokenKind::Forall => {
                self.advance();
                self.forall_body(span)
            }
            TokenKind::Fun => {
                self.advance();
                self.lambda_body(span)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Parse forall body: (x : T) (y : U), B
    fn forall_body(&mut self, start_span: Span) -> Result<SurfaceExpr, ParseError> {
        let binders = self.binders()?;
        self.expect(&TokenKind::Comma)?;
        let body = self.expr()?;
        let span = start_span.merge(body.span());
        Ok(SurfaceExpr::Pi(span, binders, Box::new(body)))
    }

    /// Parse lambda body: (x : T) => e
    fn lambda_body(&mut self, start_span: Span) -> Result<SurfaceExpr, ParseError> {
        let binders = self.binders()?;
        self.expect(&TokenKind::FatArrow)?;
        let body = self.expr()?;
        let span = start_span.merge(body.span());
        Ok(SurfaceExpr::Lambda(span, binders, Box::new(body)))
    }

    /// Binder groups: `(x y : T) (z : U)` or a single bare group `x y : T`
    fn binders(&mut self) -> Result<Vec<SurfaceBinder>, ParseError> {
        let mut binders = Vec::new();

        if !self.check(&TokenKind::LParen) {
            let names = self.binder_names()?;
            self.expect(&TokenKind::Colon)?;
            let ty = self.arrow_expr()?;
            binders.extend(group(names, &ty));
            return Ok(binders);
        }

        while self.eat(&TokenKind::LParen) {
            let names = self.binder_names()?;
            self.expect(&TokenKind::Colon)?;
            let ty = self.expr()?;
            self.expect(&TokenKind::RParen)?;
            binders.extend(group(names, &ty));
        }

        Ok(binders)
    }

    fn binder_names(&mut self) -> Result<Vec<(Span, String)>, ParseError> {
        let mut names = Vec::new();
        loop {
            let span = self.current_span();
            match self.current_kind().clone() {
                TokenKind::Ident(name) => {
                    self.advance();
                    names.push((span, name));
                }
                TokenKind::Underscore => {
                    self.advance();
                    names.push((span, "_".to_string()));
                }
                _ => break,
            }
        }
        if names.is_empty() {
            return Err(self.unexpected("binder name"));
        }
        Ok(names)
    }
}

fn binop(op: BinOp, left: SurfaceExpr, right: SurfaceExpr) -> SurfaceExpr {
    let span = left.span().merge(right.span());
    SurfaceExpr::BinOp(span, op, Box::new(left), Box::new(right))
}

fn group(names: Vec<(Span, String)>, ty: &SurfaceExpr) -> impl Iterator<Item = SurfaceBinder> + '_ {
    names.into_iter().map(move |(span, name)| SurfaceBinder {
        span,
        name,
        ty: Box::new(ty.clone()),
    })
}
