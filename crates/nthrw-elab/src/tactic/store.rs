//! Goal and hypothesis store
//!
//! [`GoalStore`] is the view of the proof state a rewrite needs: read the
//! statement at a location, and replace it given a proof that the old
//! statement equals the new one. [`ProofState`] implements it for its main
//! goal.
//!
//! A [`Location`] names what the user asked for; a [`Site`] is the single
//! statement it resolves to. Hypotheses are addressed by free variable so
//! that shadowed names stay reachable.

use super::equality::eq_mod_mdata;
use super::nth_rewrite::RewriteError;
use super::proof::{ProofBuilder, RelProof};
use super::{Goal, LocalDecl, ProofState};
use crate::meta::MetaState;
use nthrw_kernel::{Environment, Expr, FVarId, TypeChecker};
use serde::Serialize;
use std::fmt;
use tracing::trace;

/// Where a rewrite applies
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// The target of the main goal
    Goal,
    /// A hypothesis of the main goal, by name
    Hyp(String),
    /// Every hypothesis, then the goal
    Wildcard,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Goal => write!(f, "⊢"),
            Location::Hyp(name) => write!(f, "{name}"),
            Location::Wildcard => write!(f, "*"),
        }
    }
}

/// One statement of the main goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    Goal,
    Hyp(FVarId),
}

/// Statements that can be read and replaced
pub trait GoalStore {
    fn env(&self) -> &Environment;

    /// The single statement a location names. A hypothesis name resolves to
    /// the latest hypothesis with that name.
    fn resolve(&self, location: &Location) -> Result<Site, RewriteError>;

    fn get_target(&self, site: Site) -> Result<Expr, RewriteError>;

    /// Hypotheses of the main goal in context order
    fn hypotheses(&self) -> Vec<(String, FVarId)>;

    /// A type checker over the main goal's context
    fn type_checker(&self) -> Result<TypeChecker<'_>, RewriteError>;

    /// Replace the statement at `site` by `rewrite.rhs`.
    ///
    /// `rewrite` must prove `old = new` where `old` is the current statement.
    /// Either the replacement happens in full or the store is unchanged.
    fn replace(
        &mut self,
        site: Site,
        rewrite: &RelProof,
        builder: &dyn ProofBuilder,
    ) -> Result<(), RewriteError>;
}

impl ProofState {
    fn main_goal(&self) -> Result<&Goal, RewriteError> {
        self.goals.first().ok_or(RewriteError::NoGoals)
    }

    fn replace_goal_target(
        &mut self,
        rewrite: &RelProof,
        builder: &dyn ProofBuilder,
    ) -> Result<(), RewriteError> {
        let goal = self.main_goal()?;
        let target = self.metas.instantiate(&goal.target);
        if !eq_mod_mdata(&rewrite.lhs, &target) {
            return Err(RewriteError::Replacement(format!(
                "proof rewrites {}, but the goal is {}",
                goal.pretty(&rewrite.lhs),
                goal.pretty(&target)
            )));
        }

        let new_id = self.metas.next_id();
        let proof = builder
            .replace_goal_proof(&self.env, rewrite, &MetaState::mk_meta(new_id))
            .map_err(|e| RewriteError::Replacement(e.to_string()))?;

        // Nothing below can fail
        let old_id = goal.meta_id;
        let local_ctx = goal.local_ctx.clone();
        let fresh = self.metas.fresh(rewrite.rhs.clone());
        debug_assert_eq!(fresh, new_id);
        self.goals[0] = Goal {
            meta_id: fresh,
            target: rewrite.rhs.clone(),
            local_ctx,
        };
        self.metas.assign(old_id, proof);
        trace!(old = old_id.0, new = fresh.0, "replaced goal");
        Ok(())
    }

    fn hyp_position(&self, fvar: FVarId) -> Result<usize, RewriteError> {
        self.main_goal()?
            .local_ctx
            .iter()
            .position(|d| d.fvar == fvar)
            .ok_or_else(|| RewriteError::HypothesisNotFound(format!("_fvar.{}", fvar.0)))
    }

    fn replace_hyp(
        &mut self,
        fvar: FVarId,
        rewrite: &RelProof,
        builder: &dyn ProofBuilder,
    ) -> Result<(), RewriteError> {
        let pos = self.hyp_position(fvar)?;
        let goal = self.main_goal()?;
        let old = &goal.local_ctx[pos];
        let name = old.name.clone();
        let ty = self.metas.instantiate(&old.ty);
        if !eq_mod_mdata(&rewrite.lhs, &ty) {
            return Err(RewriteError::Replacement(format!(
                "proof rewrites {}, but {name} : {}",
                goal.pretty(&rewrite.lhs),
                goal.pretty(&ty)
            )));
        }

        let referenced = goal
            .local_ctx
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != pos)
            .any(|(_, d)| {
                d.ty.has_fvar(old.fvar) || d.value.as_ref().is_some_and(|v| v.has_fvar(old.fvar))
            })
            || goal.target.has_fvar(old.fvar);
        if referenced {
            return Err(RewriteError::Replacement(format!(
                "{name} is referenced by the goal or by another hypothesis"
            )));
        }

        let value = builder
            .replace_hyp_proof(&self.env, rewrite, &Expr::fvar(old.fvar))
            .map_err(|e| RewriteError::Replacement(e.to_string()))?;

        let new_fvar = self.fresh_fvar();
        trace!(hyp = %name, old = fvar.0, new = new_fvar.0, "replaced hypothesis");
        let mut decl = LocalDecl::new(new_fvar, name, rewrite.rhs.clone());
        decl.value = Some(value.clone());
        self.goals[0].local_ctx[pos] = decl;
        self.hyp_values.push((new_fvar, value));
        Ok(())
    }
}

impl GoalStore for ProofState {
    fn env(&self) -> &Environment {
        &self.env
    }

    fn resolve(&self, location: &Location) -> Result<Site, RewriteError> {
        let goal = self.main_goal()?;
        match location {
            Location::Goal => Ok(Site::Goal),
            Location::Hyp(name) => goal
                .find_hyp(name)
                .map(|d| Site::Hyp(d.fvar))
                .ok_or_else(|| RewriteError::HypothesisNotFound(name.clone())),
            Location::Wildcard => Err(RewriteError::Replacement(
                "the wildcard location has no single statement".to_string(),
            )),
        }
    }

    fn get_target(&self, site: Site) -> Result<Expr, RewriteError> {
        let goal = self.main_goal()?;
        match site {
            Site::Goal => Ok(self.metas.instantiate(&goal.target)),
            Site::Hyp(fvar) => {
                let pos = self.hyp_position(fvar)?;
                Ok(self.metas.instantiate(&goal.local_ctx[pos].ty))
            }
        }
    }

    fn hypotheses(&self) -> Vec<(String, FVarId)> {
        self.goals
            .first()
            .map(|g| g.local_ctx.iter().map(|d| (d.name.clone(), d.fvar)).collect())
            .unwrap_or_default()
    }

    fn type_checker(&self) -> Result<TypeChecker<'_>, RewriteError> {
        let goal = self.main_goal()?;
        Ok(TypeChecker::with_context(&self.env, self.build_local_ctx(goal)))
    }

    fn replace(
        &mut self,
        site: Site,
        rewrite: &RelProof,
        builder: &dyn ProofBuilder,
    ) -> Result<(), RewriteError> {
        match site {
            Site::Goal => self.replace_goal_target(rewrite, builder),
            Site::Hyp(fvar) => self.replace_hyp(fvar, rewrite, builder),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tactic::equality::make_eq;
    use crate::tactic::proof::KernelProofBuilder;
    use nthrw_kernel::{Level, Name};

    fn c(name: &str) -> Expr {
        Expr::const_(Name::from_string(name), vec![])
    }

    fn setup() -> ProofState {
        let mut env = Environment::with_prelude().unwrap();
        env.add_axiom("p", Expr::prop()).unwrap();
        env.add_axiom("q", Expr::prop()).unwrap();
        env.add_axiom("e", make_eq(Level::one(), Expr::prop(), c("p"), c("q")))
            .unwrap();
        let ctx = vec![LocalDecl::new(FVarId(0), "hp", c("p"))];
        ProofState::with_context(env, c("p"), ctx)
    }

    fn p_eq_q() -> RelProof {
        RelProof {
            level: Level::one(),
            carrier: Expr::prop(),
            lhs: c("p"),
            rhs: c("q"),
            proof: c("e"),
        }
    }

    #[test]
    fn test_replace_goal_creates_new_goal() {
        let mut state = setup();
        let old = state.current_goal().unwrap().meta_id;
        state
            .replace(Site::Goal, &p_eq_q(), &KernelProofBuilder)
            .unwrap();
        let goal = state.current_goal().unwrap();
        assert_eq!(goal.target, c("q"));
        assert_ne!(goal.meta_id, old);
        assert!(state.metas().is_assigned(old));
    }

    #[test]
    fn test_replace_hyp_keeps_name_and_position() {
        let mut state = setup();
        state
            .replace(Site::Hyp(FVarId(0)), &p_eq_q(), &KernelProofBuilder)
            .unwrap();
        let decl = &state.current_goal().unwrap().local_ctx[0];
        assert_eq!(decl.name, "hp");
        assert_eq!(decl.ty, c("q"));
        assert_ne!(decl.fvar, FVarId(0));
        assert!(decl.value.is_some());
    }

    #[test]
    fn test_replace_rejects_wrong_statement() {
        let mut state = setup();
        let mut wrong = p_eq_q();
        wrong.lhs = c("q");
        let err = state
            .replace(Site::Goal, &wrong, &KernelProofBuilder)
            .unwrap_err();
        assert!(matches!(err, RewriteError::Replacement(_)));
        assert_eq!(state.current_goal().unwrap().target, c("p"));
        assert_eq!(state.metas().len(), 1);
    }

    #[test]
    fn test_unknown_hypothesis() {
        let state = setup();
        let err = state.resolve(&Location::Hyp("nope".into())).unwrap_err();
        assert!(matches!(err, RewriteError::HypothesisNotFound(n) if n == "nope"));
        assert!(state.get_target(Site::Hyp(FVarId(7))).is_err());
    }

    #[test]
    fn test_shadowed_hypotheses_are_addressed_by_fvar() {
        let base = setup();
        let mut ctx = base.current_goal().unwrap().local_ctx.clone();
        ctx.push(LocalDecl::new(FVarId(1), "hp", c("p")));
        let mut state = ProofState::with_context(base.env().clone(), c("p"), ctx);

        assert_eq!(
            state.resolve(&Location::Hyp("hp".into())).unwrap(),
            Site::Hyp(FVarId(1))
        );
        state
            .replace(Site::Hyp(FVarId(0)), &p_eq_q(), &KernelProofBuilder)
            .unwrap();
        let ctx = &state.current_goal().unwrap().local_ctx;
        assert_eq!(ctx[0].ty, c("q"));
        assert_eq!(ctx[1].fvar, FVarId(1));
        assert_eq!(ctx[1].ty, c("p"));
    }

    #[test]
    fn test_location_display() {
        assert_eq!(Location::Goal.to_string(), "⊢");
        assert_eq!(Location::Hyp("h".into()).to_string(), "h");
        assert_eq!(Location::Wildcard.to_string(), "*");
    }
}
