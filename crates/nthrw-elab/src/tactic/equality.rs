//! Equations and equivalences
//!
//! Recognising `Eq α a b` and `Iff a b`, rebuilding them with new sides, and
//! comparing terms modulo metadata.

use nthrw_kernel::{Expr, Level, Name};
use serde::Serialize;
use std::fmt;

/// The two relations `nth_rewrite` understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Relation {
    Eq,
    Iff,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Eq => write!(f, "="),
            Relation::Iff => write!(f, "↔"),
        }
    }
}

/// A binary relation `R lhs rhs` taken apart.
///
/// `carrier` is the type of both sides and `level` the universe argument an
/// `Eq` between two sides would take (`Prop` and `1` for `Iff`).
#[derive(Debug, Clone, PartialEq)]
pub struct RelationView {
    pub relation: Relation,
    pub level: Level,
    pub carrier: Expr,
    pub lhs: Expr,
    pub rhs: Expr,
}

impl RelationView {
    /// The same relation with new sides
    pub fn rebuild(&self, lhs: Expr, rhs: Expr) -> Expr {
        match self.relation {
            Relation::Eq => make_eq(self.level.clone(), self.carrier.clone(), lhs, rhs),
            Relation::Iff => make_iff(lhs, rhs),
        }
    }

    pub fn to_expr(&self) -> Expr {
        self.rebuild(self.lhs.clone(), self.rhs.clone())
    }
}

/// Decompose `Eq α a b` or `Iff a b`, looking through metadata
pub fn match_relation(expr: &Expr) -> Option<RelationView> {
    let expr = expr.strip_mdata();
    if let Some(args) = expr.app_of("Eq", 3) {
        let level = match expr.get_app_fn() {
            Expr::Const(_, levels) if levels.len() == 1 => levels[0].clone(),
            _ => return None,
        };
        return Some(RelationView {
            relation: Relation::Eq,
            level,
            carrier: args[0].clone(),
            lhs: args[1].clone(),
            rhs: args[2].clone(),
        });
    }
    if let Some(args) = expr.app_of("Iff", 2) {
        return Some(RelationView {
            relation: Relation::Iff,
            level: Level::one(),
            carrier: Expr::prop(),
            lhs: args[0].clone(),
            rhs: args[1].clone(),
        });
    }
    None
}

/// `@Eq.{level} ty a b`
pub fn make_eq(level: Level, ty: Expr, a: Expr, b: Expr) -> Expr {
    Expr::mk_app(
        Expr::const_(Name::from_string("Eq"), vec![level]),
        [ty, a, b],
    )
}

/// `a ↔ b`
pub fn make_iff(a: Expr, b: Expr) -> Expr {
    Expr::mk_app(Expr::const_(Name::from_string("Iff"), vec![]), [a, b])
}

/// Structural equality ignoring `MData` wrappers
pub fn eq_mod_mdata(a: &Expr, b: &Expr) -> bool {
    stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
        match (a.strip_mdata(), b.strip_mdata()) {
            (Expr::App(f1, a1), Expr::App(f2, a2)) => eq_mod_mdata(f1, f2) && eq_mod_mdata(a1, a2),
            (Expr::Lam(_, t1, b1), Expr::Lam(_, t2, b2))
            | (Expr::Pi(_, t1, b1), Expr::Pi(_, t2, b2)) => {
                eq_mod_mdata(t1, t2) && eq_mod_mdata(b1, b2)
            }
            (Expr::Let(t1, v1, b1), Expr::Let(t2, v2, b2)) => {
                eq_mod_mdata(t1, t2) && eq_mod_mdata(v1, v2) && eq_mod_mdata(b1, b2)
            }
            (Expr::Sort(l1), Expr::Sort(l2)) => l1.simplify() == l2.simplify(),
            (x, y) => x == y,
        }
    })
}
