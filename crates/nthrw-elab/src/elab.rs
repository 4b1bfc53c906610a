//! Elaboration of surface syntax into kernel terms
//!
//! Binders are opened with fresh free variables while their bodies are
//! elaborated and abstracted again afterwards, so type inference for
//! operators (`=`, `+`, `*`) always sees closed terms.
//!
//! Names resolve innermost binder first, then local hypotheses, then
//! constants of the environment. Application is explicit: no implicit
//! arguments are inserted. Universe parameters of a constant are solved
//! from explicit type arguments (`Eq.refl Nat a`) and default to `1`.

use crate::ElabError;
use nthrw_kernel::{
    BinderInfo, Environment, Expr, FVarId, Level, LocalContext, Name, TypeChecker,
};
use nthrw_parser::{BinOp, SurfaceBinder, SurfaceExpr, SurfaceLit, UniverseExpr};

/// First free variable id used for binders opened during elaboration
const ELAB_FVAR_BASE: u64 = 1 << 61;

/// Elaboration context
pub struct ElabCtx<'env> {
    env: &'env Environment,
    ctx: LocalContext,
    next_fvar: u64,
}

impl<'env> ElabCtx<'env> {
    pub fn new(env: &'env Environment) -> Self {
        Self::with_context(env, LocalContext::new())
    }

    /// Context whose local hypotheses are visible by name
    pub fn with_context(env: &'env Environment, ctx: LocalContext) -> Self {
        ElabCtx {
            env,
            ctx,
            next_fvar: ELAB_FVAR_BASE,
        }
    }

    /// Elaborate a surface expression
    ///
    /// # Errors
    ///
    /// Fails on unknown identifiers and on operator operands whose type
    /// cannot be inferred.
    pub fn elaborate(&mut self, surface: &SurfaceExpr) -> Result<Expr, ElabError> {
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || self.elab(surface))
    }

    /// Elaborate and check that the result is a proposition
    ///
    /// # Errors
    ///
    /// Fails if elaboration fails or the term is not a `Prop`.
    pub fn elaborate_prop(&mut self, surface: &SurfaceExpr) -> Result<Expr, ElabError> {
        let expr = self.elaborate(surface)?;
        let ty = self.infer(&expr)?;
        let tc = TypeChecker::with_context(self.env, self.ctx.clone());
        if !tc.whnf(&ty).is_prop() {
            return Err(ElabError::TypeMismatch {
                expected: "Prop".to_string(),
                actual: ty.to_string(),
            });
        }
        Ok(expr)
    }

    /// Infer the type of an elaborated term in this context
    ///
    /// # Errors
    ///
    /// Returns the kernel's complaint as [`ElabError::CannotInfer`].
    pub fn infer(&self, expr: &Expr) -> Result<Expr, ElabError> {
        TypeChecker::with_context(self.env, self.ctx.clone())
            .infer_type(expr)
            .map_err(|e| ElabError::CannotInfer(e.to_string()))
    }

    fn sort_level(&self, ty: &Expr) -> Result<Level, ElabError> {
        TypeChecker::with_context(self.env, self.ctx.clone())
            .ensure_sort(ty)
            .map_err(|e| ElabError::CannotInfer(e.to_string()))
    }

    fn fresh_fvar(&mut self) -> FVarId {
        let id = FVarId(self.next_fvar);
        self.next_fvar += 1;
        id
    }

    fn elab(&mut self, surface: &SurfaceExpr) -> Result<Expr, ElabError> {
        match surface {
            SurfaceExpr::Ident(_, name) => self.resolve(name, &[]),
            SurfaceExpr::Universe(_, UniverseExpr::Prop) => Ok(Expr::prop()),
            SurfaceExpr::Universe(_, UniverseExpr::Type) => Ok(Expr::type_()),
            SurfaceExpr::Lit(_, SurfaceLit::Nat(n)) => Ok(Expr::nat_lit(*n)),
            SurfaceExpr::Lit(_, SurfaceLit::String(s)) => Ok(Expr::str_lit(s)),
            SurfaceExpr::Paren(_, inner) => self.elaborate(inner),
            SurfaceExpr::App(_, head, args) => {
                let args = args
                    .iter()
                    .map(|a| self.elaborate(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let head = match head.unparen() {
                    SurfaceExpr::Ident(_, name) => self.resolve(name, &args)?,
                    other => self.elaborate(other)?,
                };
                Ok(Expr::mk_app(head, args))
            }
            SurfaceExpr::Arrow(_, dom, cod) => {
                let dom = self.elaborate(dom)?;
                let cod = self.elaborate(cod)?;
                Ok(Expr::arrow(dom, cod))
            }
            SurfaceExpr::Pi(_, binders, body) => self.elab_binders(binders, body, Expr::pi),
            SurfaceExpr::Lambda(_, binders, body) => self.elab_binders(binders, body, Expr::lam),
            SurfaceExpr::BinOp(_, op, lhs, rhs) => {
                let lhs = self.elaborate(lhs)?;
                let rhs = self.elaborate(rhs)?;
                self.elab_binop(*op, lhs, rhs)
            }
        }
    }

    fn elab_binop(&self, op: BinOp, lhs: Expr, rhs: Expr) -> Result<Expr, ElabError> {
        let const_name = match op {
            BinOp::Iff => {
                return Ok(Expr::mk_app(
                    Expr::const_(Name::from_string("Iff"), vec![]),
                    [lhs, rhs],
                ))
            }
            BinOp::Eq => "Eq",
            BinOp::Add => "Add.add",
            BinOp::Mul => "Mul.mul",
        };
        if !self.env.contains(const_name) {
            return Err(ElabError::UnknownIdent(const_name.to_string()));
        }
        let ty = self.infer(&lhs)?;
        let level = self.sort_level(&ty)?;
        Ok(Expr::mk_app(
            Expr::const_(Name::from_string(const_name), vec![level]),
            [ty, lhs, rhs],
        ))
    }

    fn elab_binders(
        &mut self,
        binders: &[SurfaceBinder],
        body: &SurfaceExpr,
        mk: fn(BinderInfo, Expr, Expr) -> Expr,
    ) -> Result<Expr, ElabError> {
        let Some((first, rest)) = binders.split_first() else {
            return self.elaborate(body);
        };
        let ty = self.elaborate(&first.ty)?;
        self.sort_level(&ty)?;

        let x = self.fresh_fvar();
        self.ctx
            .push_with_id(x, Name::from_string(&first.name), ty.clone());
        let inner = self.elab_binders(rest, body, mk);
        self.ctx.pop();

        Ok(mk(BinderInfo::Default, ty, inner?.abstract_fvar(x)))
    }

    /// Resolve an identifier, solving universe parameters from `args`
    fn resolve(&self, name: &str, args: &[Expr]) -> Result<Expr, ElabError> {
        if name != "_" {
            if let Some(local) = self.ctx.find_by_name(name) {
                return Ok(Expr::fvar(local.fvar));
            }
        }
        let const_name = Name::from_string(name);
        let info = self
            .env
            .get_const(&const_name)
            .ok_or_else(|| ElabError::UnknownIdent(name.to_string()))?;
        if info.level_params.is_empty() {
            return Ok(Expr::const_(const_name, vec![]));
        }

        // Universe parameters appear as `Sort u` domains; read them off the
        // explicit arguments supplied for those binders.
        let mut solved: Vec<Option<Level>> = vec![None; info.level_params.len()];
        let mut ty = &info.type_;
        for arg in args {
            let Expr::Pi(_, dom, body) = ty else { break };
            if let Expr::Sort(Level::Param(p)) = dom.as_ref() {
                if let Some(i) = info.level_params.iter().position(|q| q == p) {
                    if solved[i].is_none() {
                        solved[i] = Some(self.sort_level(arg)?);
                    }
                }
            }
            ty = body;
        }
        let levels: Vec<Level> = solved
            .into_iter()
            .map(|l| l.unwrap_or_else(Level::one))
            .collect();
        Ok(Expr::const_(const_name, levels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nthrw_parser::parse_expr;

    fn env() -> Environment {
        let mut env = Environment::with_prelude().unwrap();
        let nat = Expr::const_(Name::from_string("Nat"), vec![]);
        env.add_axiom("a", nat.clone()).unwrap();
        env.add_axiom("b", nat.clone()).unwrap();
        env.add_axiom("f", Expr::arrow(nat.clone(), nat)).unwrap();
        env
    }

    fn elab(env: &Environment, input: &str) -> Result<Expr, ElabError> {
        let surface = parse_expr(input).map_err(|e| ElabError::ParseError(e.to_string()))?;
        ElabCtx::new(env).elaborate(&surface)
    }

    #[test]
    fn test_elab_equation_infers_carrier() {
        let env = env();
        let e = elab(&env, "f a = b").unwrap();
        let args = e.app_of("Eq", 3).unwrap();
        assert_eq!(args[0], &Expr::const_(Name::from_string("Nat"), vec![]));
        assert_eq!(e.to_string(), "f a = b");
    }

    #[test]
    fn test_elab_forall_abstracts_binder() {
        let env = env();
        let e = elab(&env, "∀ (x : Nat), f x = x").unwrap();
        let Expr::Pi(_, _, body) = &e else {
            panic!("expected pi, got {e:?}");
        };
        let args = body.app_of("Eq", 3).unwrap();
        assert_eq!(args[2], &Expr::bvar(0));
        assert!(!e.has_loose_bvars());
    }

    #[test]
    fn test_elab_binder_shadows_constant() {
        let env = env();
        let e = elab(&env, "fun (a : Nat) => a").unwrap();
        assert_eq!(
            e,
            Expr::lam(
                BinderInfo::Default,
                Expr::const_(Name::from_string("Nat"), vec![]),
                Expr::bvar(0)
            )
        );
    }

    #[test]
    fn test_elab_unknown_ident() {
        let env = env();
        assert!(matches!(
            elab(&env, "g a"),
            Err(ElabError::UnknownIdent(ref n)) if n == "g"
        ));
    }

    #[test]
    fn test_elab_solves_universe_from_type_argument() {
        let env = env();
        let e = elab(&env, "Eq.refl Prop (a = a)").unwrap();
        let Expr::Const(_, levels) = e.get_app_fn() else {
            panic!("expected constant head");
        };
        assert_eq!(levels.as_slice(), &[Level::succ(Level::zero())]);
    }

    #[test]
    fn test_elab_prop_rejects_terms() {
        let env = env();
        let surface = parse_expr("f a").unwrap();
        assert!(matches!(
            ElabCtx::new(&env).elaborate_prop(&surface),
            Err(ElabError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_elab_local_hypothesis() {
        let env = env();
        let mut ctx = LocalContext::new();
        let nat = Expr::const_(Name::from_string("Nat"), vec![]);
        ctx.push_with_id(FVarId(0), Name::from_string("x"), nat);
        let surface = parse_expr("x + x").unwrap();
        let e = ElabCtx::with_context(&env, ctx).elaborate(&surface).unwrap();
        assert_eq!(e.app_of("Add.add", 3).unwrap()[1], &Expr::fvar(FVarId(0)));
    }
}
