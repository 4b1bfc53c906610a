//! Rewrite rules
//!
//! A rule is a proof of `∀ x₁ … xₙ, lhs = rhs` (or `↔`). Elaboration peels the
//! leading binders into pattern variables, which stay in `lhs`/`rhs` as loose
//! bound variables: `BVar(i)` stands for `xₙ₋ᵢ`.

use super::equality::{match_relation, Relation};
use super::nth_rewrite::RewriteError;
use super::{Goal, ProofState};
use nthrw_kernel::{Expr, Level};
use nthrw_parser::{parse_rule, SurfaceExpr};
use tracing::debug;

/// How the rule term was given
#[derive(Debug, Clone)]
pub enum RuleTerm {
    /// Source text, optionally prefixed by `←`
    Text(String),
    /// Already parsed
    Surface(SurfaceExpr),
    /// Already elaborated
    Expr(Expr),
}

/// A rule as supplied by the caller: a term and a direction
#[derive(Debug, Clone)]
pub struct RuleSpec {
    pub term: RuleTerm,
    pub reversed: bool,
}

impl RuleSpec {
    /// A rule from source text. A leading `←` is honoured at elaboration.
    pub fn parse(text: impl Into<String>) -> Self {
        RuleSpec {
            term: RuleTerm::Text(text.into()),
            reversed: false,
        }
    }

    pub fn surface(term: SurfaceExpr) -> Self {
        RuleSpec {
            term: RuleTerm::Surface(term),
            reversed: false,
        }
    }

    pub fn expr(term: Expr) -> Self {
        RuleSpec {
            term: RuleTerm::Expr(term),
            reversed: false,
        }
    }

    /// Flip the direction
    #[must_use]
    pub fn rev(mut self) -> Self {
        self.reversed = !self.reversed;
        self
    }

    fn describe(&self) -> String {
        let arrow = if self.reversed { "← " } else { "" };
        match &self.term {
            RuleTerm::Text(text) => format!("{arrow}{text}"),
            RuleTerm::Surface(_) => format!("{arrow}<term>"),
            RuleTerm::Expr(e) => format!("{arrow}{e}"),
        }
    }
}

/// An elaborated rule
#[derive(Debug, Clone)]
pub struct RewriteRule {
    /// Proof of the (quantified) statement
    pub proof: Expr,
    /// Types of the pattern variables, outermost first
    pub var_types: Vec<Expr>,
    pub relation: Relation,
    /// Universe argument of `Eq` for this rule (`1` for `Iff`)
    pub level: Level,
    /// Type of both sides, under the pattern binders
    pub carrier: Expr,
    pub lhs: Expr,
    pub rhs: Expr,
    /// Rewrite right-to-left
    pub reversed: bool,
    /// How the rule was written, for messages
    pub source: String,
}

impl RewriteRule {
    /// Build a rule from a proof and its type
    ///
    /// # Errors
    ///
    /// Fails if the statement, after its leading `∀` binders, is neither an
    /// equation nor an equivalence.
    pub fn from_proof(
        proof: Expr,
        ty: &Expr,
        reversed: bool,
        source: impl Into<String>,
    ) -> Result<Self, String> {
        let mut var_types = Vec::new();
        let mut body = ty.strip_mdata();
        while let Expr::Pi(_, dom, inner) = body {
            var_types.push((**dom).clone());
            body = inner.strip_mdata();
        }

        let view = match_relation(body)
            .ok_or_else(|| format!("not an equation or equivalence: {ty}"))?;

        Ok(RewriteRule {
            proof,
            var_types,
            relation: view.relation,
            level: view.level,
            carrier: view.carrier,
            lhs: view.lhs,
            rhs: view.rhs,
            reversed,
            source: source.into(),
        })
    }

    pub fn num_vars(&self) -> usize {
        self.var_types.len()
    }

    /// The side that is searched for
    pub fn pattern(&self) -> &Expr {
        if self.reversed {
            &self.rhs
        } else {
            &self.lhs
        }
    }
}

/// Elaborate rule specifications in the context of `goal`.
///
/// Leaves the proof state untouched.
///
/// # Errors
///
/// Returns [`RewriteError::Elaboration`] for the first rule that fails to
/// parse, resolve, type check, or state an equation.
pub fn elaborate_rules(
    state: &ProofState,
    goal: &Goal,
    specs: &[RuleSpec],
) -> Result<Vec<RewriteRule>, RewriteError> {
    specs
        .iter()
        .map(|spec| elaborate_rule(state, goal, spec))
        .collect()
}

fn elaborate_rule(
    state: &ProofState,
    goal: &Goal,
    spec: &RuleSpec,
) -> Result<RewriteRule, RewriteError> {
    let source = spec.describe();
    let fail = |message: String| RewriteError::Elaboration {
        rule: source.clone(),
        message,
    };

    let (proof, reversed) = match &spec.term {
        RuleTerm::Text(text) => {
            let parsed = parse_rule(text).map_err(|e| fail(e.to_string()))?;
            let proof = state
                .elab_ctx(goal)
                .elaborate(&parsed.term)
                .map_err(|e| fail(e.to_string()))?;
            (proof, spec.reversed != parsed.reversed)
        }
        RuleTerm::Surface(term) => {
            let proof = state
                .elab_ctx(goal)
                .elaborate(term)
                .map_err(|e| fail(e.to_string()))?;
            (proof, spec.reversed)
        }
        RuleTerm::Expr(e) => (e.clone(), spec.reversed),
    };

    let ty = state
        .infer_type(goal, &proof)
        .map_err(|e| fail(e.to_string()))?;
    let rule = RewriteRule::from_proof(proof, &ty, reversed, source.clone()).map_err(fail)?;

    debug!(
        rule = %source,
        relation = %rule.relation,
        vars = rule.num_vars(),
        reversed = rule.reversed,
        "elaborated rewrite rule"
    );
    Ok(rule)
}
