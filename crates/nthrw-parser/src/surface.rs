//! Surface syntax AST
//!
//! The AST produced by the parser, before elaboration.
//! Named bindings, mandatory binder types, no de Bruijn indices.

/// Span in source text for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A binder in surface syntax: `(x : T)`
#[derive(Debug, Clone)]
pub struct SurfaceBinder {
    pub span: Span,
    /// Binder name (can be "_" for anonymous)
    pub name: String,
    pub ty: Box<SurfaceExpr>,
}

impl SurfaceBinder {
    pub fn new(name: impl Into<String>, ty: SurfaceExpr) -> Self {
        Self {
            span: ty.span(),
            name: name.into(),
            ty: Box::new(ty),
        }
    }
}

/// Universe expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniverseExpr {
    /// Prop = Sort 0
    Prop,
    /// Type = Sort 1
    Type,
}

/// Literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceLit {
    Nat(u64),
    String(String),
}

/// Built-in infix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    /// `a = b`
    Eq,
    /// `a ↔ b`
    Iff,
    /// `a + b`
    Add,
    /// `a * b`
    Mul,
}

/// Surface expression (before elaboration)
#[derive(Debug, Clone)]
pub enum SurfaceExpr {
    /// Identifier: `foo`, `Nat.succ`
    Ident(Span, String),

    /// Universe: `Type`, `Prop`
    Universe(Span, UniverseExpr),

    /// Application: `f x y`
    App(Span, Box<SurfaceExpr>, Vec<SurfaceExpr>),

    /// Lambda: `fun (x : T) => e`
    Lambda(Span, Vec<SurfaceBinder>, Box<SurfaceExpr>),

    /// Pi/forall: `∀ (x : A), B`
    Pi(Span, Vec<SurfaceBinder>, Box<SurfaceExpr>),

    /// Arrow (non-dependent): `A → B`
    Arrow(Span, Box<SurfaceExpr>, Box<SurfaceExpr>),

    /// Infix operator: `a = b`, `p ↔ q`, `a + b`, `a * b`
    BinOp(Span, BinOp, Box<SurfaceExpr>, Box<SurfaceExpr>),

    /// Literal: `42`, `"hello"`
    Lit(Span, SurfaceLit),

    /// Parenthesized expression
    Paren(Span, Box<SurfaceExpr>),
}

impl SurfaceExpr {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            SurfaceExpr::Ident(span, _)
            | SurfaceExpr::Universe(span, _)
            | SurfaceExpr::App(span, _, _)
            | SurfaceExpr::Lambda(span, _, _)
            | SurfaceExpr::Pi(span, _, _)
            | SurfaceExpr::Arrow(span, _, _)
            | SurfaceExpr::BinOp(span, _, _, _)
            | SurfaceExpr::Lit(span, _)
            | SurfaceExpr::Paren(span, _) => *span,
        }
    }

    /// Drop redundant parentheses at the top level
    #[must_use]
    pub fn unparen(&self) -> &SurfaceExpr {
        match self {
            SurfaceExpr::Paren(_, inner) => inner.unparen(),
            _ => self,
        }
    }
}

/// A rewrite rule as written by the user: `h`, `← h`, `foo a b`
#[derive(Debug, Clone)]
pub struct SurfaceRule {
    pub span: Span,
    /// Rewrite right-to-left
    pub reversed: bool,
    pub term: SurfaceExpr,
}
