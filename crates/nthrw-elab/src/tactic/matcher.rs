//! Occurrence matching
//!
//! First-order structural matching of a rule's pattern against every
//! subterm of a host expression. Subterms are visited in pre-order: a node
//! before its function part, the function part before the argument, a
//! binder's type before its body. Subterms with loose bound variables (those
//! mentioning a binder of the host) are never matched, and `MData` nodes are
//! looked through rather than matched themselves. A structural match counts
//! only if every pattern variable is bound to a term of the variable's type.

use super::conv::{ConvPath, ConvPosition};
use super::equality::eq_mod_mdata;
use super::rule::RewriteRule;
use nthrw_kernel::{Expr, TypeChecker};

/// One occurrence of a rule's pattern
#[derive(Debug, Clone)]
pub struct Match {
    /// Position from the root of the host
    pub path: ConvPath,
    /// The matched subterm
    pub subterm: Expr,
    /// Values of the rule's pattern variables, outermost first. `None` for
    /// variables the pattern does not mention.
    pub subst: Vec<Option<Expr>>,
}

/// Finds occurrences of a rule in a host expression
pub trait Matcher {
    /// All matches of `rule`'s pattern in `host`, in traversal order.
    /// `tc` types subterms of `host` in the context `host` lives in.
    fn find_matches(&self, rule: &RewriteRule, host: &Expr, tc: &TypeChecker<'_>) -> Vec<Match>;
}

/// Syntactic matcher up to metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralMatcher {
    max_depth: Option<usize>,
}

impl StructuralMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not look deeper than `depth` steps below the root
    #[must_use]
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    fn visit(
        &self,
        rule: &RewriteRule,
        tc: &TypeChecker<'_>,
        expr: &Expr,
        path: &mut ConvPath,
        out: &mut Vec<Match>,
    ) {
        if self.max_depth.is_some_and(|max| path.len() > max) {
            return;
        }
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
            if let Expr::MData(_, inner) = expr {
                return self.visit(rule, tc, inner, path, out);
            }

            if !expr.has_loose_bvars() {
                if let Some(subst) =
                    match_pattern(rule, expr).filter(|subst| well_typed(rule, subst, tc))
                {
                    out.push(Match {
                        path: path.clone(),
                        subterm: expr.clone(),
                        subst,
                    });
                }
            }

            let mut step = |pos: ConvPosition, child: &Expr, out: &mut Vec<Match>| {
                path.push(pos);
                self.visit(rule, tc, child, path, out);
                path.pop();
            };
            match expr {
                Expr::App(f, a) => {
                    step(ConvPosition::AppFn, f, out);
                    step(ConvPosition::AppArg, a, out);
                }
                Expr::Lam(_, ty, body) | Expr::Pi(_, ty, body) => {
                    step(ConvPosition::BinderType, ty, out);
                    step(ConvPosition::BinderBody, body, out);
                }
                Expr::Let(ty, val, body) => {
                    step(ConvPosition::LetType, ty, out);
                    step(ConvPosition::LetValue, val, out);
                    step(ConvPosition::LetBody, body, out);
                }
                _ => {}
            }
        });
    }
}

impl Matcher for StructuralMatcher {
    fn find_matches(&self, rule: &RewriteRule, host: &Expr, tc: &TypeChecker<'_>) -> Vec<Match> {
        let mut out = Vec::new();
        self.visit(rule, tc, host, &mut Vec::new(), &mut out);
        out
    }
}

/// Match `rule`'s pattern against a closed term, returning the pattern
/// variable assignment on success.
pub fn match_pattern(rule: &RewriteRule, term: &Expr) -> Option<Vec<Option<Expr>>> {
    let mut subst = vec![None; rule.num_vars()];
    go(rule.pattern(), term, 0, &mut subst).then_some(subst)
}

/// Whether each bound pattern variable's value has the variable's type,
/// with the variables before it substituted. A type that mentions an
/// unbound variable is not checked.
pub fn well_typed(rule: &RewriteRule, subst: &[Option<Expr>], tc: &TypeChecker<'_>) -> bool {
    rule.var_types.iter().enumerate().all(|(k, ty)| {
        let Some(value) = &subst[k] else {
            return true;
        };
        // Variable `j` is `BVar(k - 1 - j)` in the type of variable `k`
        let open = (0..k).any(|j| {
            let idx = (k - 1 - j) as u32;
            subst[j].is_none() && ty.has_loose_bvar_in_range(idx, idx + 1)
        });
        if open {
            return true;
        }
        let earlier: Vec<Expr> = subst[..k]
            .iter()
            .map(|v| v.clone().unwrap_or_else(Expr::prop))
            .collect();
        let expected = ty.instantiate_rev(&earlier);
        tc.infer_type(value)
            .is_ok_and(|actual| tc.is_def_eq(&actual, &expected))
    })
}

/// `depth` counts binders entered inside the pattern (and, in lockstep,
/// inside the term). Pattern `BVar`s at or above `depth` are pattern
/// variables.
fn go(pattern: &Expr, term: &Expr, depth: u32, subst: &mut [Option<Expr>]) -> bool {
    stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
        match (pattern.strip_mdata(), term.strip_mdata()) {
            (Expr::BVar(i), t) if *i >= depth => {
                let n = subst.len();
                let k = (*i - depth) as usize;
                if k >= n {
                    return false;
                }
                // Matched terms are closed at the root, so a value that does
                // not mention the binders entered here is closed as well
                if t.has_loose_bvars() {
                    return false;
                }
                let value = t.clone();
                let slot = &mut subst[n - 1 - k];
                match slot {
                    Some(existing) => eq_mod_mdata(existing, &value),
                    None => {
                        *slot = Some(value);
                        true
                    }
                }
            }
            (Expr::App(pf, pa), Expr::App(tf, ta)) => {
                go(pf, tf, depth, subst) && go(pa, ta, depth, subst)
            }
            (Expr::Lam(_, pt, pb), Expr::Lam(_, tt, tb))
            | (Expr::Pi(_, pt, pb), Expr::Pi(_, tt, tb)) => {
                go(pt, tt, depth, subst) && go(pb, tb, depth + 1, subst)
            }
            (Expr::Let(pt, pv, pb), Expr::Let(tt, tv, tb)) => {
                go(pt, tt, depth, subst) && go(pv, tv, depth, subst) && go(pb, tb, depth + 1, subst)
            }
            (Expr::Sort(l1), Expr::Sort(l2)) => l1.simplify() == l2.simplify(),
            (Expr::Const(n1, l1), Expr::Const(n2, l2)) => {
                n1 == n2
                    && l1.len() == l2.len()
                    && l1.iter().zip(l2.iter()).all(|(a, b)| a.simplify() == b.simplify())
            }
            (p, t) => p == t,
        }
    })
}
