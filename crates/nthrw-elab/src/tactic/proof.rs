//! Proof construction for rewriting
//!
//! Rewriting a single occurrence produces three kinds of proof terms:
//!
//! - the instantiated rule, oriented so that it proves `pattern = replacement`
//! - a congruence step lifting that equation through the surrounding term
//!   (`congrArg`)
//! - the cast that replaces a goal or hypothesis by its rewritten form
//!   (`Eq.mpr` / `Eq.mp`)
//!
//! Equivalences are turned into equations between propositions with
//! `propext`, so everything past the rule is plain `Eq`.

use super::equality::make_eq;
use super::rule::RewriteRule;
use super::Relation;
use nthrw_kernel::{Environment, Expr, Level, Name};
use thiserror::Error;

/// Failure to build a proof term
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProofError {
    /// A prelude constant the proof needs is not declared
    #[error("constant {0} is not declared")]
    MissingConstant(String),

    /// A pattern variable was not fixed by the match
    #[error("pattern variable #{0} is not determined by the match")]
    UndeterminedVariable(usize),

    /// Casting a goal or hypothesis needs an equation between propositions
    #[error("expected an equation between propositions")]
    ExpectedEquality,

    /// The term handed in as a motive is not a lambda
    #[error("not a motive: {0}")]
    NotAMotive(String),
}

/// A proof of `lhs = rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct RelProof {
    /// Universe argument of `Eq`
    pub level: Level,
    /// Type of both sides
    pub carrier: Expr,
    pub lhs: Expr,
    pub rhs: Expr,
    pub proof: Expr,
}

impl RelProof {
    /// The proven statement
    pub fn statement(&self) -> Expr {
        make_eq(
            self.level.clone(),
            self.carrier.clone(),
            self.lhs.clone(),
            self.rhs.clone(),
        )
    }
}

/// Builds the proof terms a rewrite is assembled from
pub trait ProofBuilder {
    /// Instantiate `rule` with `subst` and orient it from pattern to
    /// replacement
    fn rule_proof(
        &self,
        env: &Environment,
        rule: &RewriteRule,
        subst: &[Option<Expr>],
    ) -> Result<RelProof, ProofError>;

    /// Lift `local : a = b` to `motive a = motive b`.
    ///
    /// `motive` is `fun (x : α) => body` and `codomain` the type of `body`
    /// together with its universe level.
    fn congruence(
        &self,
        env: &Environment,
        motive: &Expr,
        codomain: (&Expr, &Level),
        local: &RelProof,
    ) -> Result<RelProof, ProofError>;

    /// Proof of the old goal from `eq : old = new` and a proof of `new`
    fn replace_goal_proof(
        &self,
        env: &Environment,
        eq: &RelProof,
        new_goal: &Expr,
    ) -> Result<Expr, ProofError>;

    /// Proof of the new hypothesis from `eq : old = new` and the old one
    fn replace_hyp_proof(
        &self,
        env: &Environment,
        eq: &RelProof,
        old_hyp: &Expr,
    ) -> Result<Expr, ProofError>;
}

/// Proof builder over the prelude constants of [`Environment::with_prelude`]
#[derive(Debug, Default, Clone, Copy)]
pub struct KernelProofBuilder;

impl KernelProofBuilder {
    pub fn new() -> Self {
        KernelProofBuilder
    }
}

/// A prelude constant, after checking it is declared
fn constant(env: &Environment, name: &str, levels: Vec<Level>) -> Result<Expr, ProofError> {
    if !env.contains(name) {
        return Err(ProofError::MissingConstant(name.to_string()));
    }
    Ok(Expr::const_(Name::from_string(name), levels))
}

impl ProofBuilder for KernelProofBuilder {
    fn rule_proof(
        &self,
        env: &Environment,
        rule: &RewriteRule,
        subst: &[Option<Expr>],
    ) -> Result<RelProof, ProofError> {
        let vals = subst
            .iter()
            .enumerate()
            .map(|(i, v)| v.clone().ok_or(ProofError::UndeterminedVariable(i)))
            .collect::<Result<Vec<_>, _>>()?;

        let proof = Expr::mk_app(rule.proof.clone(), vals.iter().cloned());
        let lhs = rule.lhs.instantiate_rev(&vals);
        let rhs = rule.rhs.instantiate_rev(&vals);

        match rule.relation {
            Relation::Eq => {
                let carrier = rule.carrier.instantiate_rev(&vals);
                if rule.reversed {
                    let symm = constant(env, "Eq.symm", vec![rule.level.clone()])?;
                    let proof = Expr::mk_app(symm, [carrier.clone(), lhs.clone(), rhs.clone(), proof]);
                    Ok(RelProof {
                        level: rule.level.clone(),
                        carrier,
                        lhs: rhs,
                        rhs: lhs,
                        proof,
                    })
                } else {
                    Ok(RelProof {
                        level: rule.level.clone(),
                        carrier,
                        lhs,
                        rhs,
                        proof,
                    })
                }
            }
            Relation::Iff => {
                let propext = constant(env, "propext", vec![])?;
                let (from, to, iff_proof) = if rule.reversed {
                    let symm = constant(env, "Iff.symm", vec![])?;
                    let flipped = Expr::mk_app(symm, [lhs.clone(), rhs.clone(), proof]);
                    (rhs, lhs, flipped)
                } else {
                    (lhs, rhs, proof)
                };
                Ok(RelProof {
                    level: Level::one(),
                    carrier: Expr::prop(),
                    proof: Expr::mk_app(propext, [from.clone(), to.clone(), iff_proof]),
                    lhs: from,
                    rhs: to,
                })
            }
        }
    }

    fn congruence(
        &self,
        env: &Environment,
        motive: &Expr,
        codomain: (&Expr, &Level),
        local: &RelProof,
    ) -> Result<RelProof, ProofError> {
        let Expr::Lam(_, _, body) = motive.strip_mdata() else {
            return Err(ProofError::NotAMotive(motive.to_string()));
        };
        let (beta, v) = codomain;
        let congr = constant(env, "congrArg", vec![local.level.clone(), v.clone()])?;
        let proof = Expr::mk_app(
            congr,
            [
                local.carrier.clone(),
                beta.clone(),
                local.lhs.clone(),
                local.rhs.clone(),
                motive.clone(),
                local.proof.clone(),
            ],
        );
        Ok(RelProof {
            level: v.clone(),
            carrier: beta.clone(),
            lhs: body.instantiate(&local.lhs),
            rhs: body.instantiate(&local.rhs),
            proof,
        })
    }

    fn replace_goal_proof(
        &self,
        env: &Environment,
        eq: &RelProof,
        new_goal: &Expr,
    ) -> Result<Expr, ProofError> {
        if !eq.carrier.is_prop() {
            return Err(ProofError::ExpectedEquality);
        }
        let mpr = constant(env, "Eq.mpr", vec![Level::zero()])?;
        Ok(Expr::mk_app(
            mpr,
            [eq.lhs.clone(), eq.rhs.clone(), eq.proof.clone(), new_goal.clone()],
        ))
    }

    fn replace_hyp_proof(
        &self,
        env: &Environment,
        eq: &RelProof,
        old_hyp: &Expr,
    ) -> Result<Expr, ProofError> {
        if !eq.carrier.is_prop() {
            return Err(ProofError::ExpectedEquality);
        }
        let mp = constant(env, "Eq.mp", vec![Level::zero()])?;
        Ok(Expr::mk_app(
            mp,
            [eq.lhs.clone(), eq.rhs.clone(), eq.proof.clone(), old_hyp.clone()],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tactic::equality::make_iff;
    use nthrw_kernel::{BinderInfo, TypeChecker};

    fn c(name: &str) -> Expr {
        Expr::const_(Name::from_string(name), vec![])
    }

    fn nat() -> Expr {
        c("Nat")
    }

    /// Prelude plus `f : Nat → Nat`, `a b : Nat`, `p q : Prop` and
    /// `h : a = b`, `hpq : p ↔ q`, `comm : ∀ x y, x + y = y + x`
    fn setup_env() -> Environment {
        let mut env = Environment::with_prelude().unwrap();
        env.add_axiom("f", Expr::arrow(nat(), nat())).unwrap();
        env.add_axiom("a", nat()).unwrap();
        env.add_axiom("b", nat()).unwrap();
        env.add_axiom("p", Expr::prop()).unwrap();
        env.add_axiom("q", Expr::prop()).unwrap();
        env.add_axiom("h", make_eq(Level::one(), nat(), c("a"), c("b")))
            .unwrap();
        env.add_axiom("hpq", make_iff(c("p"), c("q"))).unwrap();
        let add = |x: Expr, y: Expr| {
            Expr::mk_app(
                Expr::const_(Name::from_string("Add.add"), vec![Level::one()]),
                [nat(), x, y],
            )
        };
        let comm = Expr::pi(
            BinderInfo::Default,
            nat(),
            Expr::pi(
                BinderInfo::Default,
                nat(),
                make_eq(
                    Level::one(),
                    nat(),
                    add(Expr::bvar(1), Expr::bvar(0)),
                    add(Expr::bvar(0), Expr::bvar(1)),
                ),
            ),
        );
        env.add_axiom("comm", comm).unwrap();
        env
    }

    fn rule_for(env: &Environment, name: &str, reversed: bool) -> RewriteRule {
        let ty = env.get_const(&Name::from_string(name)).unwrap().type_.clone();
        RewriteRule::from_proof(c(name), &ty, reversed, name).unwrap()
    }

    fn assert_proves(env: &Environment, rel: &RelProof) {
        let tc = TypeChecker::new(env);
        let ty = tc.infer_type(&rel.proof).unwrap();
        assert!(
            tc.is_def_eq(&ty, &rel.statement()),
            "proof has type {ty}, expected {}",
            rel.statement()
        );
    }

    #[test]
    fn test_forward_and_reversed_equation() {
        let env = setup_env();
        let builder = KernelProofBuilder::new();

        let fwd = builder.rule_proof(&env, &rule_for(&env, "h", false), &[]).unwrap();
        assert_eq!((fwd.lhs.clone(), fwd.rhs.clone()), (c("a"), c("b")));
        assert_proves(&env, &fwd);

        let rev = builder.rule_proof(&env, &rule_for(&env, "h", true), &[]).unwrap();
        assert_eq!((rev.lhs.clone(), rev.rhs.clone()), (c("b"), c("a")));
        assert_proves(&env, &rev);
    }

    #[test]
    fn test_instantiates_pattern_variables() {
        let env = setup_env();
        let rule = rule_for(&env, "comm", false);
        let rel = KernelProofBuilder
            .rule_proof(&env, &rule, &[Some(c("a")), Some(c("b"))])
            .unwrap();
        assert_proves(&env, &rel);
        assert!(!rel.lhs.has_loose_bvars());
    }

    #[test]
    fn test_undetermined_variable() {
        let env = setup_env();
        let rule = rule_for(&env, "comm", false);
        let err = KernelProofBuilder
            .rule_proof(&env, &rule, &[Some(c("a")), None])
            .unwrap_err();
        assert_eq!(err, ProofError::UndeterminedVariable(1));
    }

    #[test]
    fn test_iff_lifted_by_propext() {
        let env = setup_env();
        for reversed in [false, true] {
            let rel = KernelProofBuilder
                .rule_proof(&env, &rule_for(&env, "hpq", reversed), &[])
                .unwrap();
            assert!(rel.carrier.is_prop());
            assert_proves(&env, &rel);
        }
    }

    #[test]
    fn test_congruence_through_function() {
        let env = setup_env();
        let local = KernelProofBuilder
            .rule_proof(&env, &rule_for(&env, "h", false), &[])
            .unwrap();
        // fun x => f x = b
        let motive = Expr::lam(
            BinderInfo::Default,
            nat(),
            make_eq(Level::one(), nat(), Expr::app(c("f"), Expr::bvar(0)), c("b")),
        );
        let lifted = KernelProofBuilder
            .congruence(&env, &motive, (&Expr::prop(), &Level::one()), &local)
            .unwrap();
        assert_eq!(
            lifted.rhs,
            make_eq(Level::one(), nat(), Expr::app(c("f"), c("b")), c("b"))
        );
        assert_proves(&env, &lifted);
    }

    #[test]
    fn test_congruence_needs_lambda() {
        let env = setup_env();
        let local = KernelProofBuilder
            .rule_proof(&env, &rule_for(&env, "h", false), &[])
            .unwrap();
        let err = KernelProofBuilder
            .congruence(&env, &c("f"), (&nat(), &Level::one()), &local)
            .unwrap_err();
        assert!(matches!(err, ProofError::NotAMotive(_)));
    }

    #[test]
    fn test_missing_prelude_constant() {
        let mut env = Environment::new();
        env.add_axiom("p", Expr::prop()).unwrap();
        env.add_axiom("q", Expr::prop()).unwrap();
        let ty = make_iff(c("p"), c("q"));
        let rule = RewriteRule::from_proof(c("hpq"), &ty, false, "hpq").unwrap();
        let err = KernelProofBuilder.rule_proof(&env, &rule, &[]).unwrap_err();
        assert_eq!(err, ProofError::MissingConstant("propext".into()));
    }

    #[test]
    fn test_goal_cast_rejects_non_propositions() {
        let env = setup_env();
        let eq = KernelProofBuilder
            .rule_proof(&env, &rule_for(&env, "h", false), &[])
            .unwrap();
        let err = KernelProofBuilder
            .replace_goal_proof(&env, &eq, &c("p"))
            .unwrap_err();
        assert_eq!(err, ProofError::ExpectedEquality);
    }
}
