use super::*;

fn rw(
    state: &mut ProofState,
    index: usize,
    rules: &[&str],
    location: &Location,
) -> Result<RewriteOutcome, RewriteError> {
    let rules: Vec<_> = rules.iter().map(|r| RuleSpec::parse(*r)).collect();
    nth_rewrite(state, None, index, &rules, location)
}

// Occurrence selection
// =========================================================================

#[test]
fn test_first_occurrence_of_repeated_variable() {
    let initial = state_with(&[("h", "x = f x")], "g x x");
    let mut state = initial.clone();
    rw(&mut state, 0, &["h"], &Location::Goal).unwrap();
    assert_eq!(target(&state), "g (f x) x");
    assert_goal_proof_checks(&initial, &state);
}

#[test]
fn test_second_occurrence_of_repeated_variable() {
    let initial = state_with(&[("h", "x = f x")], "g x x");
    let mut state = initial.clone();
    rw(&mut state, 1, &["h"], &Location::Goal).unwrap();
    assert_eq!(target(&state), "g x (f x)");
    assert_goal_proof_checks(&initial, &state);
}

#[test]
fn test_index_runs_through_rules_in_order() {
    let hyps = [("ha", "a = c"), ("hb", "b = c")];
    let expected = ["k c a b", "k a c b", "k a a c"];
    for (index, want) in expected.iter().enumerate() {
        let initial = state_with(&hyps, "k a a b");
        let mut state = initial.clone();
        rw(&mut state, index, &["ha", "hb"], &Location::Goal).unwrap();
        assert_eq!(target(&state), *want, "index {index}");
        assert_goal_proof_checks(&initial, &state);
    }

    let mut state = state_with(&hyps, "k a a b");
    let err = rw(&mut state, 3, &["ha", "hb"], &Location::Goal).unwrap_err();
    assert!(matches!(
        err.innermost(),
        RewriteError::NoMatch {
            requested: 3,
            found: 3
        }
    ));
}

#[test]
fn test_rule_order_changes_indexing() {
    let hyps = [("ha", "a = c"), ("hb", "b = c")];
    let mut state = state_with(&hyps, "k a a b");
    rw(&mut state, 0, &["hb", "ha"], &Location::Goal).unwrap();
    assert_eq!(target(&state), "k a a c");
}

#[test]
fn test_out_of_range_leaves_state_untouched() {
    let mut state = state_with(&[("h", "x = f x")], "g x x");
    let err = rw(&mut state, 5, &["h"], &Location::Goal).unwrap_err();
    assert!(matches!(
        err,
        RewriteError::AtLocation {
            location: Location::Goal,
            ..
        }
    ));
    assert!(matches!(
        err.innermost(),
        RewriteError::NoMatch {
            requested: 5,
            found: 2
        }
    ));
    assert_eq!(target(&state), "g x x");
    assert_eq!(state.metas().len(), 1);
}

#[test]
fn test_pattern_variables_instantiated_per_occurrence() {
    // Pre-order visits `x + y` before `y + x`
    let initial = state_with(&[], "x + y = y + x");
    let mut state = initial.clone();
    rw(&mut state, 0, &["add_comm"], &Location::Goal).unwrap();
    // `y + x = y + x` is closed by rfl
    assert!(state.is_complete());
    assert_goal_proof_checks(&initial, &state);

    let mut state = initial.clone();
    rw(&mut state, 1, &["add_comm"], &Location::Goal).unwrap();
    assert!(state.is_complete());
}

#[test]
fn test_pattern_variable_matches_only_terms_of_its_type() {
    // `g a b`, `g a` and `g` fit the bare pattern `n` structurally but are
    // not of type `Nat`
    let initial = state_with(&[("h", "∀ (n : Nat), n = f n")], "g a b");
    let goal = initial.current_goal().unwrap();
    let found = occurrences(&initial, None, &[RuleSpec::parse("h")], &Location::Goal).unwrap();
    let subterms: Vec<_> = found.iter().map(|o| goal.pretty(&o.subterm)).collect();
    assert_eq!(subterms, vec!["a", "b"]);

    let mut state = initial.clone();
    rw(&mut state, 0, &["h"], &Location::Goal).unwrap();
    assert_eq!(target(&state), "g (f a) b");
    assert_goal_proof_checks(&initial, &state);

    let mut state = initial.clone();
    rw(&mut state, 1, &["h"], &Location::Goal).unwrap();
    assert_eq!(target(&state), "g a (f b)");

    let mut state = initial.clone();
    let err = rw(&mut state, 2, &["h"], &Location::Goal).unwrap_err();
    assert!(matches!(
        err.innermost(),
        RewriteError::NoMatch {
            requested: 2,
            found: 2
        }
    ));
}

// Direction
// =========================================================================

#[test]
fn test_reversed_rule_round_trip() {
    let initial = state_with(&[("h", "x = f x")], "g x x");
    let mut state = initial.clone();
    rw(&mut state, 1, &["h"], &Location::Goal).unwrap();
    assert_eq!(target(&state), "g x (f x)");
    rw(&mut state, 0, &["← h"], &Location::Goal).unwrap();
    assert_eq!(target(&state), "g x x");
    assert_goal_proof_checks(&initial, &state);
}

#[test]
fn test_reversed_flag_on_rule_spec() {
    let mut state = state_with(&[("h", "x = y")], "g y x");
    let rules = [RuleSpec::parse("h").rev()];
    nth_rewrite(&mut state, None, 0, &rules, &Location::Goal).unwrap();
    assert_eq!(target(&state), "g x x");
}

#[test]
fn test_equivalence_rule() {
    let initial = state_with(&[("hpq", "p ↔ q")], "p ↔ p");
    let mut state = initial.clone();
    rw(&mut state, 1, &["hpq"], &Location::Goal).unwrap();
    assert_eq!(target(&state), "p ↔ q");
    assert_goal_proof_checks(&initial, &state);
}

// Side restriction
// =========================================================================

#[test]
fn test_lhs_restriction_leaves_rhs_identical() {
    let initial = state_with(&[("hc", "c = x")], "a + c = c");
    let rhs_before = match_relation(&initial.current_goal().unwrap().target)
        .unwrap()
        .rhs;

    let mut state = initial.clone();
    let rules = [RuleSpec::parse("hc")];
    nth_rewrite(&mut state, Some(Side::Lhs), 0, &rules, &Location::Goal).unwrap();
    assert_eq!(target(&state), "a + x = c");
    let rhs_after = match_relation(&state.current_goal().unwrap().target)
        .unwrap()
        .rhs;
    assert_eq!(rhs_after, rhs_before);
    assert_goal_proof_checks(&initial, &state);

    // Only one occurrence on the left
    let mut state = initial.clone();
    let err = nth_rewrite(&mut state, Some(Side::Lhs), 1, &rules, &Location::Goal).unwrap_err();
    assert!(matches!(
        err.innermost(),
        RewriteError::NoMatch {
            requested: 1,
            found: 1
        }
    ));
}

#[test]
fn test_rhs_restriction() {
    let initial = state_with(&[("hc", "c = x")], "a + c = c");
    let mut state = initial.clone();
    let rules = [RuleSpec::parse("hc")];
    nth_rewrite(&mut state, Some(Side::Rhs), 0, &rules, &Location::Goal).unwrap();
    assert_eq!(target(&state), "a + c = x");
    assert_goal_proof_checks(&initial, &state);
}

#[test]
fn test_side_of_non_relation() {
    let mut state = state_with(&[("h", "x = f x")], "g x x");
    let rules = [RuleSpec::parse("h")];
    let err = nth_rewrite(&mut state, Some(Side::Lhs), 0, &rules, &Location::Goal).unwrap_err();
    assert!(matches!(
        err.innermost(),
        RewriteError::NotARelation { side: Side::Lhs, .. }
    ));
}

// Locations
// =========================================================================

#[test]
fn test_rewrite_hypothesis() {
    let initial = state_with(&[("h", "x = y"), ("hg", "g x x")], "P a");
    let mut state = initial.clone();
    rw(&mut state, 1, &["h"], &Location::Hyp("hg".into())).unwrap();
    assert_eq!(hyp(&state, "hg"), "g x y");
    assert_eq!(target(&state), "P a");
    assert_hyp_value_checks(&initial, &state, "hg");
}

#[test]
fn test_unknown_hypothesis() {
    let mut state = state_with(&[("h", "x = y")], "P a");
    let err = rw(&mut state, 0, &["h"], &Location::Hyp("nope".into())).unwrap_err();
    assert!(matches!(err.innermost(), RewriteError::HypothesisNotFound(n) if n == "nope"));
}

#[test]
fn test_wildcard_skips_non_matching_hypothesis() {
    let initial = state_with(&[("ha", "a = c"), ("h1", "P a"), ("h2", "q")], "P b");
    let mut state = initial.clone();
    let outcome = rw(&mut state, 0, &["ha"], &Location::Wildcard).unwrap();

    assert_eq!(outcome.rewritten, vec![Location::Hyp("h1".into())]);
    let skipped: Vec<_> = outcome.skipped.iter().map(|s| s.location.clone()).collect();
    assert_eq!(
        skipped,
        vec![
            Location::Hyp("ha".into()),
            Location::Hyp("h2".into()),
            Location::Goal
        ]
    );
    assert_eq!(hyp(&state, "h1"), "P c");
    assert_eq!(hyp(&state, "h2"), "q");
    assert_eq!(hyp(&state, "ha"), "a = c");
    assert_eq!(target(&state), "P b");
    assert_hyp_value_checks(&initial, &state, "h1");
}

#[test]
fn test_wildcard_rewrites_hypotheses_and_goal() {
    let initial = state_with(&[("h", "x = y"), ("h1", "g x a")], "P x");
    let mut state = initial.clone();
    let outcome = rw(&mut state, 0, &["h"], &Location::Wildcard).unwrap();
    assert_eq!(
        outcome.rewritten,
        vec![Location::Hyp("h1".into()), Location::Goal]
    );
    assert_eq!(hyp(&state, "h1"), "g y a");
    assert_eq!(target(&state), "P y");
    assert_goal_proof_checks(&initial, &state);
}

#[test]
fn test_wildcard_reaches_shadowed_hypotheses() {
    let initial = state_with(&[("hx", "a = b"), ("h1", "P a"), ("h1", "P a")], "q");
    let mut state = initial.clone();
    let outcome = rw(&mut state, 0, &["hx"], &Location::Wildcard).unwrap();

    assert_eq!(
        outcome.rewritten,
        vec![Location::Hyp("h1".into()), Location::Hyp("h1".into())]
    );
    let skipped: Vec<_> = outcome.skipped.iter().map(|s| s.location.clone()).collect();
    assert_eq!(skipped, vec![Location::Hyp("hx".into()), Location::Goal]);

    let goal = state.current_goal().unwrap();
    let types: Vec<_> = goal.local_ctx.iter().map(|d| goal.pretty(&d.ty)).collect();
    assert_eq!(types, vec!["a = b", "P b", "P b"]);
    assert!(goal.local_ctx[1..].iter().all(|d| d.value.is_some()));
    assert_hyp_value_checks(&initial, &state, "h1");
}

#[test]
fn test_named_location_picks_latest_shadowed_hypothesis() {
    let mut state = state_with(&[("hx", "a = b"), ("h1", "P a"), ("h1", "P a")], "q");
    rw(&mut state, 0, &["hx"], &Location::Hyp("h1".into())).unwrap();
    let goal = state.current_goal().unwrap();
    let types: Vec<_> = goal.local_ctx.iter().map(|d| goal.pretty(&d.ty)).collect();
    assert_eq!(types, vec!["a = b", "P a", "P b"]);
}

#[test]
fn test_wildcard_with_nothing_to_rewrite() {
    let mut state = state_with(&[("h", "x = y"), ("h1", "q")], "P a");
    let err = rw(&mut state, 0, &["h"], &Location::Wildcard).unwrap_err();
    assert!(matches!(err, RewriteError::NothingRewritten));
}

// Closing and errors
// =========================================================================

#[test]
fn test_rfl_closes_goal() {
    let initial = state_with(&[("h", "x = y")], "f x = f y");
    let mut state = initial.clone();
    rw(&mut state, 0, &["h"], &Location::Goal).unwrap();
    assert!(state.is_complete());

    let proof = state.instantiated_proof().unwrap();
    let tc = TypeChecker::with_context(state.env(), initial.build_local_ctx(initial.current_goal().unwrap()));
    let ty = tc.infer_type(&proof).unwrap();
    assert!(tc.is_def_eq(&ty, &initial.current_goal().unwrap().target));
}

#[test]
fn test_rfl_can_be_disabled() {
    let mut state = state_with(&[("h", "x = y")], "f x = f y");
    let rules = [RuleSpec::parse("h")];
    let config = NthRewriteConfig::new().with_try_rfl(false);
    nth_rewrite_with_config(&mut state, None, 0, &rules, &Location::Goal, &config).unwrap();
    assert!(!state.is_complete());
    assert_eq!(target(&state), "f y = f y");
}

#[test]
fn test_unknown_rule() {
    let mut state = state_with(&[], "g x x");
    let err = rw(&mut state, 0, &["nope"], &Location::Goal).unwrap_err();
    assert!(matches!(err, RewriteError::Elaboration { ref rule, .. } if rule == "nope"));
}

#[test]
fn test_rule_that_is_not_an_equation() {
    let mut state = state_with(&[("hp", "p")], "g x x");
    let err = rw(&mut state, 0, &["hp"], &Location::Goal).unwrap_err();
    assert!(matches!(err, RewriteError::Elaboration { .. }));
}

/// Delegates to the kernel builder but cannot build congruences
struct NoCongruence;

impl ProofBuilder for NoCongruence {
    fn rule_proof(
        &self,
        env: &Environment,
        rule: &RewriteRule,
        subst: &[Option<Expr>],
    ) -> Result<RelProof, ProofError> {
        KernelProofBuilder.rule_proof(env, rule, subst)
    }

    fn congruence(
        &self,
        _env: &Environment,
        _motive: &Expr,
        _codomain: (&Expr, &nthrw_kernel::Level),
        _local: &RelProof,
    ) -> Result<RelProof, ProofError> {
        Err(ProofError::MissingConstant("congrArg".into()))
    }

    fn replace_goal_proof(
        &self,
        env: &Environment,
        eq: &RelProof,
        new_goal: &Expr,
    ) -> Result<Expr, ProofError> {
        KernelProofBuilder.replace_goal_proof(env, eq, new_goal)
    }

    fn replace_hyp_proof(
        &self,
        env: &Environment,
        eq: &RelProof,
        old_hyp: &Expr,
    ) -> Result<Expr, ProofError> {
        KernelProofBuilder.replace_hyp_proof(env, eq, old_hyp)
    }
}

fn elaborated(state: &ProofState, rules: &[&str]) -> Vec<RewriteRule> {
    let specs: Vec<_> = rules.iter().map(|r| RuleSpec::parse(*r)).collect();
    elaborate_rules(state, state.current_goal().unwrap(), &specs).unwrap()
}

#[test]
fn test_congruence_failure_is_atomic() {
    // The whole left side matches, so only the lift through `=` needs
    // congruence
    let mut state = state_with(&[("ha", "a = c")], "a = b");
    let rules = elaborated(&state, &["ha"]);
    let matcher = StructuralMatcher::new();
    let builder = NoCongruence;
    let err = NthRewriter::new(&matcher, &builder)
        .rewrite(&mut state, Some(Side::Lhs), 0, &rules, &Location::Goal)
        .unwrap_err();
    assert!(matches!(
        err.innermost(),
        RewriteError::CongruenceConstruction { side: Side::Lhs, .. }
    ));
    assert_eq!(target(&state), "a = b");
    assert_eq!(state.metas().len(), 1);
    assert!(!state.metas().is_assigned(MetaId(0)));
}

#[test]
fn test_evaluation_failure_is_atomic() {
    let mut state = state_with(&[("h", "x = y"), ("hg", "g x x")], "P a");
    let rules = elaborated(&state, &["h"]);
    let matcher = StructuralMatcher::new();
    let builder = NoCongruence;
    let err = NthRewriter::new(&matcher, &builder)
        .rewrite(&mut state, None, 1, &rules, &Location::Hyp("hg".into()))
        .unwrap_err();
    assert!(matches!(
        err.innermost(),
        RewriteError::Evaluation { index: 1, .. }
    ));
    assert_eq!(hyp(&state, "hg"), "g x x");
}

#[test]
fn test_occurrences_listing() {
    let state = state_with(&[("ha", "a = c"), ("hb", "b = c")], "k a a b");
    let rules = [RuleSpec::parse("ha"), RuleSpec::parse("hb")];
    let found = occurrences(&state, None, &rules, &Location::Goal).unwrap();
    let summary: Vec<_> = found
        .iter()
        .map(|o| (o.index, o.rule, conv::format_path(&o.path)))
        .collect();
    assert_eq!(
        summary,
        vec![
            (0, 0, "fn/fn/arg".to_string()),
            (1, 0, "fn/arg".to_string()),
            (2, 1, "arg".to_string()),
        ]
    );
}
