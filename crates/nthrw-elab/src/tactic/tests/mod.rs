use super::*;
use nthrw_kernel::Declaration;
use nthrw_parser::parse_expr;

/// Prelude plus a few constants to rewrite with:
/// `a b c x y : Nat`, `f : Nat → Nat`, `g : Nat → Nat → Prop`,
/// `k : Nat → Nat → Nat → Prop`, `P : Nat → Prop`, `p q : Prop` and
/// `add_comm : ∀ (m n : Nat), m + n = n + m`.
pub(super) fn setup_env() -> Environment {
    let mut env = Environment::with_prelude().unwrap();
    let nat = || Expr::const_(Name::from_string("Nat"), vec![]);

    for name in ["a", "b", "c", "x", "y"] {
        env.add_axiom(name, nat()).unwrap();
    }
    env.add_axiom("f", Expr::arrow(nat(), nat())).unwrap();
    env.add_axiom("g", Expr::arrow(nat(), Expr::arrow(nat(), Expr::prop())))
        .unwrap();
    env.add_axiom(
        "k",
        Expr::arrow(nat(), Expr::arrow(nat(), Expr::arrow(nat(), Expr::prop()))),
    )
    .unwrap();
    env.add_axiom("P", Expr::arrow(nat(), Expr::prop())).unwrap();
    env.add_axiom("p", Expr::prop()).unwrap();
    env.add_axiom("q", Expr::prop()).unwrap();

    let comm = elab_closed(&env, "∀ (m n : Nat), m + n = n + m");
    env.add_decl(Declaration::Axiom {
        name: Name::from_string("add_comm"),
        level_params: vec![],
        type_: comm,
    })
    .unwrap();

    env
}

fn elab_closed(env: &Environment, text: &str) -> Expr {
    let surface = parse_expr(text).unwrap();
    ElabCtx::new(env).elaborate(&surface).unwrap()
}

/// A proof state with hypotheses given as source text, elaborated in order
/// so later ones may mention earlier ones
pub(super) fn state_with(hyps: &[(&str, &str)], goal: &str) -> ProofState {
    let env = setup_env();
    let mut ctx = LocalContext::new();
    let mut decls = Vec::new();
    for (i, (name, ty)) in hyps.iter().enumerate() {
        let fvar = FVarId(i as u64);
        let surface = parse_expr(ty).unwrap();
        let ty = ElabCtx::with_context(&env, ctx.clone())
            .elaborate(&surface)
            .unwrap();
        ctx.push_with_id(fvar, Name::from_string(name), ty.clone());
        decls.push(LocalDecl::new(fvar, *name, ty));
    }
    let surface = parse_expr(goal).unwrap();
    let target = ElabCtx::with_context(&env, ctx).elaborate(&surface).unwrap();
    ProofState::with_context(env, target, decls)
}

/// The main goal's target, printed
pub(super) fn target(state: &ProofState) -> String {
    let goal = state.current_goal().unwrap();
    goal.pretty(&goal.target)
}

/// A hypothesis of the main goal, printed
pub(super) fn hyp(state: &ProofState, name: &str) -> String {
    let goal = state.current_goal().unwrap();
    goal.pretty(&goal.find_hyp(name).unwrap().ty)
}

/// Kernel context with the hypotheses of `initial` and every
/// metavariable of `after`
fn checking_context(initial: &ProofState, after: &ProofState) -> LocalContext {
    let mut ctx = LocalContext::new();
    for decl in &initial.current_goal().unwrap().local_ctx {
        ctx.push_with_id(decl.fvar, Name::from_string(&decl.name), decl.ty.clone());
    }
    for (id, meta) in after.metas().iter() {
        ctx.push_with_id(
            MetaState::to_fvar(id),
            Name::from_string(&format!("?m{}", id.0)),
            after.metas().instantiate(&meta.ty),
        );
    }
    ctx
}

/// The proof built for the main goal type checks against the original
/// target, with open goals as holes
pub(super) fn assert_goal_proof_checks(initial: &ProofState, after: &ProofState) {
    let proof = after.partial_proof().expect("main goal not assigned");
    let tc = TypeChecker::with_context(after.env(), checking_context(initial, after));
    let ty = tc.infer_type(&proof).unwrap();
    let expected = &initial.current_goal().unwrap().target;
    assert!(tc.is_def_eq(&ty, expected), "proof proves {ty}, not {expected}");
}

/// The value of a rewritten hypothesis type checks against its new type
pub(super) fn assert_hyp_value_checks(initial: &ProofState, after: &ProofState, name: &str) {
    let decl = after.current_goal().unwrap().find_hyp(name).unwrap();
    let value = after.unfold_hyp_values(&Expr::fvar(decl.fvar));
    let tc = TypeChecker::with_context(after.env(), checking_context(initial, after));
    let ty = tc.infer_type(&value).unwrap();
    assert!(tc.is_def_eq(&ty, &decl.ty), "value proves {ty}, not {}", decl.ty);
}

mod nth_rewrite;
