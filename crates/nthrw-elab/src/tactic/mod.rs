//! Tactic framework
//!
//! Provides a proof state and the tactics that operate on it.
//! Tactics operate on goals (holes in a proof term) and produce proof terms.
//!
//! # Architecture
//!
//! - A `Goal` represents an unproven proposition with local context
//! - A `ProofState` maintains a list of goals and metavariable assignments
//! - Tactics transform proof states, closing goals or creating new ones
//!
//! # Tactics
//!
//! - `rfl_reducible` - Close `a = a` or `p ↔ p` when the sides agree without
//!   unfolding definitions
//! - `nth_rewrite n [rules] at loc` - Rewrite only the n-th occurrence of the
//!   rules' left-hand sides (see [`nth_rewrite`])

use crate::elab::ElabCtx;
use crate::meta::{MetaId, MetaState};
use hashbrown::HashMap;
use nthrw_kernel::{
    Environment, Expr, FVarId, LocalContext, Name, Printer, Transparency, TypeChecker,
};
use std::fmt;

pub mod conv;
pub mod equality;
pub mod matcher;
pub mod nth_rewrite;
pub mod proof;
pub mod rule;
pub mod store;

#[cfg(test)]
mod tests;

pub use conv::{ConvPath, ConvPosition};
pub use equality::{match_relation, Relation, RelationView};
pub use matcher::{Match, Matcher, StructuralMatcher};
pub use nth_rewrite::{
    nth_rewrite, nth_rewrite_with_config, occurrences, NthRewriteConfig, NthRewriter,
    Occurrence, RewriteError, RewriteOutcome, Side, SkippedLocation, TrackedRewrite,
};
pub use proof::{KernelProofBuilder, ProofBuilder, ProofError, RelProof};
pub use rule::{elaborate_rules, RewriteRule, RuleSpec};
pub use store::{GoalStore, Location, Site};

/// A goal in the proof state
#[derive(Debug, Clone)]
pub struct Goal {
    /// Unique identifier for this goal (corresponds to a metavariable)
    pub meta_id: MetaId,
    /// The type to prove (target)
    pub target: Expr,
    /// Local context (hypotheses available)
    pub local_ctx: Vec<LocalDecl>,
}

impl Goal {
    /// Hypothesis by display name (latest wins)
    pub fn find_hyp(&self, name: &str) -> Option<&LocalDecl> {
        self.local_ctx.iter().rev().find(|d| d.name == name)
    }

    /// Display names for the free variables of this goal
    pub fn fvar_names(&self) -> HashMap<FVarId, Name> {
        self.local_ctx
            .iter()
            .map(|d| (d.fvar, Name::from_string(&d.name)))
            .collect()
    }

    /// Print a term with this goal's hypothesis names
    pub fn pretty(&self, expr: &Expr) -> String {
        let names = self.fvar_names();
        Printer::with_fvar_names(&names).print(expr)
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for decl in &self.local_ctx {
            writeln!(f, "{} : {}", decl.name, self.pretty(&decl.ty))?;
        }
        write!(f, "⊢ {}", self.pretty(&self.target))
    }
}

/// A local declaration in the goal context
#[derive(Debug, Clone)]
pub struct LocalDecl {
    /// Free variable id
    pub fvar: FVarId,
    /// Name for display
    pub name: String,
    /// Type of this hypothesis
    pub ty: Expr,
    /// Optional value (for let-bindings and rewritten hypotheses)
    pub value: Option<Expr>,
}

impl LocalDecl {
    pub fn new(fvar: FVarId, name: impl Into<String>, ty: Expr) -> Self {
        LocalDecl {
            fvar,
            name: name.into(),
            ty,
            value: None,
        }
    }
}

/// The proof state containing all goals
#[derive(Debug, Clone)]
pub struct ProofState {
    /// The environment
    env: Environment,
    /// All goals (first is the main goal)
    goals: Vec<Goal>,
    /// Metavariable state for tracking assignments
    metas: MetaState,
    /// Next fresh free variable id
    next_fvar: u64,
    /// Values of hypotheses introduced by rewriting, newest last
    hyp_values: Vec<(FVarId, Expr)>,
}

impl ProofState {
    /// Create a new proof state for a goal type
    pub fn new(env: Environment, target: Expr) -> Self {
        Self::with_context(env, target, Vec::new())
    }

    /// Create a new proof state with an existing local context
    pub fn with_context(env: Environment, target: Expr, ctx: Vec<LocalDecl>) -> Self {
        let mut metas = MetaState::new();
        let meta_id = metas.fresh(target.clone());

        // Fresh fvars start past every id already in the context
        let next_fvar = ctx.iter().map(|d| d.fvar.0 + 1).max().unwrap_or(0);

        let main_goal = Goal {
            meta_id,
            target,
            local_ctx: ctx,
        };

        ProofState {
            env,
            goals: vec![main_goal],
            metas,
            next_fvar,
            hyp_values: Vec::new(),
        }
    }

    /// Get the current (first) goal
    pub fn current_goal(&self) -> Option<&Goal> {
        self.goals.first()
    }

    /// Get all remaining goals
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// Check if the proof is complete (no goals remain)
    pub fn is_complete(&self) -> bool {
        self.goals.is_empty()
    }

    /// Get the proof term (only valid when complete)
    pub fn proof_term(&self) -> Option<Expr> {
        if !self.is_complete() {
            return None;
        }

        // First created meta is the main goal
        self.metas.get_assignment(MetaId(0)).cloned()
    }

    /// Get the instantiated proof term with all metavariables resolved and
    /// rewritten hypotheses expanded to their definitions
    pub fn instantiated_proof(&self) -> Option<Expr> {
        let proof = self.metas.instantiate(&self.proof_term()?);
        Some(self.unfold_hyp_values(&proof))
    }

    /// The proof of the main goal built so far, with open goals left as
    /// metavariables. `None` until a tactic has assigned the main goal.
    pub fn partial_proof(&self) -> Option<Expr> {
        let root = self.metas.get_assignment(MetaId(0))?;
        Some(self.unfold_hyp_values(&self.metas.instantiate(root)))
    }

    /// Replace rewritten hypotheses by their definitions in terms of the
    /// original ones
    pub fn unfold_hyp_values(&self, expr: &Expr) -> Expr {
        self.hyp_values
            .iter()
            .rev()
            .fold(expr.clone(), |acc, (fvar, value)| acc.subst_fvar(*fvar, value))
    }

    /// Get the metavariable state
    pub fn metas(&self) -> &MetaState {
        &self.metas
    }

    /// Get the environment
    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Create a fresh free variable
    pub(crate) fn fresh_fvar(&mut self) -> FVarId {
        let id = FVarId(self.next_fvar);
        self.next_fvar += 1;
        id
    }

    /// Build a kernel LocalContext from a goal's local context
    pub fn build_local_ctx(&self, goal: &Goal) -> LocalContext {
        let mut ctx = LocalContext::new();
        for decl in &goal.local_ctx {
            ctx.push_with_id(
                decl.fvar,
                Name::from_string(&decl.name),
                self.metas.instantiate(&decl.ty),
            );
        }
        // Also add metavariables to context
        for (meta_id, meta) in self.metas.iter() {
            let name = Name::from_string(&format!("?m{}", meta_id.0));
            ctx.push_with_id(
                MetaState::to_fvar(meta_id),
                name,
                self.metas.instantiate(&meta.ty),
            );
        }
        ctx
    }

    /// An elaborator that sees the goal's hypotheses by name
    pub fn elab_ctx(&self, goal: &Goal) -> ElabCtx<'_> {
        let mut ctx = LocalContext::new();
        for decl in &goal.local_ctx {
            ctx.push_with_id(
                decl.fvar,
                Name::from_string(&decl.name),
                self.metas.instantiate(&decl.ty),
            );
        }
        ElabCtx::with_context(&self.env, ctx)
    }

    /// Infer the type of an expression in the goal's context
    pub fn infer_type(&self, goal: &Goal, expr: &Expr) -> Result<Expr, TacticError> {
        let ctx = self.build_local_ctx(goal);
        let tc = TypeChecker::with_context(&self.env, ctx);
        let instantiated = self.metas.instantiate(expr);
        tc.infer_type(&instantiated)
            .map(|ty| self.metas.instantiate(&ty))
            .map_err(|e| TacticError::TypeCheckFailed(e.to_string()))
    }

    /// Definitional equality at the given transparency
    pub fn is_def_eq_with(&self, goal: &Goal, a: &Expr, b: &Expr, transparency: Transparency) -> bool {
        let ctx = self.build_local_ctx(goal);
        let tc = TypeChecker::with_context(&self.env, ctx);
        let a_inst = self.metas.instantiate(a);
        let b_inst = self.metas.instantiate(b);
        tc.is_def_eq_with(&a_inst, &b_inst, transparency)
    }

    /// Close the current goal with a proof term
    fn close_goal(&mut self, proof: Expr) -> Result<(), TacticError> {
        if self.goals.is_empty() {
            return Err(TacticError::NoGoals);
        }
        let goal = self.goals.remove(0);
        self.metas.assign(goal.meta_id, proof);
        Ok(())
    }
}

impl fmt::Display for ProofState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.goals.is_empty() {
            return write!(f, "no goals");
        }
        for (i, goal) in self.goals.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
                writeln!(f)?;
            }
            write!(f, "{goal}")?;
        }
        Ok(())
    }
}

/// Result type for tactic execution
pub type TacticResult = Result<(), TacticError>;

/// Errors that can occur during tactic execution
#[derive(Debug, Clone)]
pub enum TacticError {
    /// No goals to operate on
    NoGoals,
    /// Cannot apply tactic to this goal shape
    GoalMismatch(String),
    /// Type checking failed
    TypeCheckFailed(String),
    /// Other error
    Other(String),
}

impl fmt::Display for TacticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TacticError::NoGoals => write!(f, "no goals"),
            TacticError::GoalMismatch(msg) => write!(f, "goal mismatch: {msg}"),
            TacticError::TypeCheckFailed(msg) => write!(f, "type check failed: {msg}"),
            TacticError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for TacticError {}

// =============================================================================
// Tactics
// =============================================================================

/// Close a goal `a = b` or `a ↔ b` at reducible transparency: the sides must
/// agree after metadata stripping, beta and let reduction, without unfolding
/// definitions.
pub fn rfl_reducible(state: &mut ProofState) -> TacticResult {
    let goal = state.current_goal().ok_or(TacticError::NoGoals)?.clone();
    let target = state.metas.instantiate(&goal.target);
    let view = match_relation(&target).ok_or_else(|| {
        TacticError::GoalMismatch(format!("rfl: not an equation: {}", goal.pretty(&target)))
    })?;

    if !state.is_def_eq_with(&goal, &view.lhs, &view.rhs, Transparency::Reducible) {
        return Err(TacticError::GoalMismatch(format!(
            "rfl: sides differ: {} and {}",
            goal.pretty(&view.lhs),
            goal.pretty(&view.rhs)
        )));
    }

    let (refl, args) = match view.relation {
        Relation::Eq => ("Eq.refl", vec![view.carrier.clone(), view.lhs.clone()]),
        Relation::Iff => ("Iff.refl", vec![view.lhs.clone()]),
    };
    let info = state
        .env
        .get_const(&Name::from_string(refl))
        .ok_or_else(|| TacticError::Other(format!("rfl: {refl} not in environment")))?;
    let levels = match view.relation {
        Relation::Eq if info.level_params.len() == 1 => vec![view.level.clone()],
        _ => vec![],
    };
    state.close_goal(Expr::mk_app(Expr::const_(Name::from_string(refl), levels), args))
}
