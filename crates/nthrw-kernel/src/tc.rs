//! Type checker
//!
//! Type inference, weak-head normalisation and definitional equality for the
//! kernel's term language. Binders are opened with fresh free variables drawn
//! from a range no elaborator or proof state allocates from.

use crate::env::Environment;
use crate::error::{KernelError, KernelResult};
use crate::expr::{Expr, FVarId, Literal};
use crate::level::Level;
use crate::name::Name;
use std::cell::Cell;

/// First free variable id used for binders opened by the type checker.
const TC_FVAR_BASE: u64 = 1 << 62;

/// How far `whnf` may unfold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transparency {
    /// Beta, zeta and metadata only
    Reducible,
    /// Also unfold definitions
    All,
}

/// A local hypothesis known to the type checker
#[derive(Debug, Clone)]
pub struct LocalEntry {
    pub fvar: FVarId,
    pub name: Name,
    pub ty: Expr,
}

/// Local context of free variables and their types
#[derive(Debug, Clone, Default)]
pub struct LocalContext {
    entries: Vec<LocalEntry>,
}

impl LocalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a free variable with a given id
    pub fn push_with_id(&mut self, fvar: FVarId, name: Name, ty: Expr) {
        self.entries.push(LocalEntry { fvar, name, ty });
    }

    /// Type of a free variable (latest declaration wins)
    pub fn get(&self, fvar: FVarId) -> Option<&LocalEntry> {
        self.entries.iter().rev().find(|e| e.fvar == fvar)
    }

    /// Free variable by display name (latest declaration wins)
    pub fn find_by_name(&self, name: &str) -> Option<&LocalEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.name.to_string() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocalEntry> {
        self.entries.iter()
    }

    /// Drop the most recent entry
    pub fn pop(&mut self) {
        self.entries.pop();
    }
}

/// Type checker over an environment and a local context
pub struct TypeChecker<'env> {
    env: &'env Environment,
    ctx: LocalContext,
    next_fvar: Cell<u64>,
}

impl<'env> TypeChecker<'env> {
    pub fn new(env: &'env Environment) -> Self {
        Self::with_context(env, LocalContext::new())
    }

    pub fn with_context(env: &'env Environment, ctx: LocalContext) -> Self {
        TypeChecker {
            env,
            ctx,
            next_fvar: Cell::new(TC_FVAR_BASE),
        }
    }

    pub fn env(&self) -> &Environment {
        self.env
    }

    fn fresh_fvar(&self) -> FVarId {
        let id = self.next_fvar.get();
        self.next_fvar.set(id + 1);
        FVarId(id)
    }

    /// Infer the type of a closed (no loose bound variables) expression
    pub fn infer_type(&self, expr: &Expr) -> KernelResult<Expr> {
        let mut ctx = self.ctx.clone();
        self.infer_in(expr, &mut ctx)
    }

    /// Check that `expr` is a type and return its universe level
    pub fn ensure_sort(&self, expr: &Expr) -> KernelResult<Level> {
        let mut ctx = self.ctx.clone();
        self.sort_of(expr, &mut ctx)
    }

    fn sort_of(&self, expr: &Expr, ctx: &mut LocalContext) -> KernelResult<Level> {
        let ty = self.infer_in(expr, ctx)?;
        match self.whnf_with(&ty, Transparency::All) {
            Expr::Sort(l) => Ok(l),
            other => Err(KernelError::NotASort(format!("{expr} : {other}"))),
        }
    }

    fn infer_in(&self, expr: &Expr, ctx: &mut LocalContext) -> KernelResult<Expr> {
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || self.infer_in_impl(expr, ctx))
    }

    fn infer_in_impl(&self, expr: &Expr, ctx: &mut LocalContext) -> KernelResult<Expr> {
        match expr {
            Expr::BVar(idx) => Err(KernelError::LooseBVar(*idx)),
            Expr::FVar(id) => ctx
                .get(*id)
                .map(|e| e.ty.clone())
                .ok_or(KernelError::UnknownFVar(*id)),
            Expr::Sort(l) => Ok(Expr::sort(Level::succ(l.clone()))),
            Expr::Const(name, levels) => {
                let info = self
                    .env
                    .get_const(name)
                    .ok_or_else(|| KernelError::UnknownConstant(name.clone()))?;
                info.instantiate_type(levels)
            }
            Expr::Lit(Literal::Nat(_)) => Ok(Expr::const_(Name::from_string("Nat"), vec![])),
            Expr::Lit(Literal::String(_)) => {
                Ok(Expr::const_(Name::from_string("String"), vec![]))
            }
            Expr::MData(_, inner) => self.infer_in(inner, ctx),
            Expr::App(f, a) => {
                let f_ty = self.infer_in(f, ctx)?;
                match self.whnf_with(&f_ty, Transparency::All) {
                    Expr::Pi(_, dom, body) => {
                        let a_ty = self.infer_in(a, ctx)?;
                        if !self.is_def_eq(&a_ty, &dom) {
                            return Err(KernelError::TypeMismatch {
                                expected: format!("{dom}"),
                                actual: format!("{a_ty}"),
                            });
                        }
                        Ok(body.instantiate(a))
                    }
                    other => Err(KernelError::NotAFunction(format!("{other}"))),
                }
            }
            Expr::Lam(bi, ty, body) => {
                self.sort_of(ty, ctx)?;
                let x = self.fresh_fvar();
                ctx.push_with_id(x, Name::from_string("x"), (**ty).clone());
                let body_ty = self.infer_in(&body.instantiate(&Expr::fvar(x)), ctx);
                ctx.pop();
                Ok(Expr::pi(*bi, (**ty).clone(), body_ty?.abstract_fvar(x)))
            }
            Expr::Pi(_, ty, body) => {
                let l1 = self.sort_of(ty, ctx)?;
                let x = self.fresh_fvar();
                ctx.push_with_id(x, Name::from_string("x"), (**ty).clone());
                let l2 = self.sort_of(&body.instantiate(&Expr::fvar(x)), ctx);
                ctx.pop();
                Ok(Expr::sort(Level::imax(l1, l2?).simplify()))
            }
            Expr::Let(ty, val, body) => {
                self.sort_of(ty, ctx)?;
                let val_ty = self.infer_in(val, ctx)?;
                if !self.is_def_eq(&val_ty, ty) {
                    return Err(KernelError::TypeMismatch {
                        expected: format!("{ty}"),
                        actual: format!("{val_ty}"),
                    });
                }
                self.infer_in(&body.instantiate(val), ctx)
            }
        }
    }

    /// Weak-head normal form, unfolding definitions
    pub fn whnf(&self, expr: &Expr) -> Expr {
        self.whnf_with(expr, Transparency::All)
    }

    /// Weak-head normal form at the given transparency
    pub fn whnf_with(&self, expr: &Expr, transparency: Transparency) -> Expr {
        let mut curr = expr.clone();
        loop {
            let next = match &curr {
                Expr::MData(_, inner) => (**inner).clone(),
                Expr::Let(_, val, body) => body.instantiate(val),
                Expr::App(_, _) => {
                    let head = curr.get_app_fn();
                    let head = self.whnf_with(head, transparency);
                    let args: Vec<Expr> = curr.get_app_args().into_iter().cloned().collect();
                    match head {
                        Expr::Lam(_, _, body) => match args.split_first() {
                            Some((first, rest)) => {
                                Expr::mk_app(body.instantiate(first), rest.iter().cloned())
                            }
                            None => return curr,
                        },
                        Expr::Const(..) if transparency == Transparency::All => {
                            match self.unfold_const(&head) {
                                Some(value) => Expr::mk_app(value, args),
                                None => return curr,
                            }
                        }
                        _ => return curr,
                    }
                }
                Expr::Const(..) if transparency == Transparency::All => {
                    match self.unfold_const(&curr) {
                        Some(value) => value,
                        None => return curr,
                    }
                }
                _ => return curr,
            };
            curr = next;
        }
    }

    fn unfold_const(&self, expr: &Expr) -> Option<Expr> {
        let Expr::Const(name, levels) = expr else {
            return None;
        };
        self.env
            .get_const(name)?
            .instantiate_value(levels)
            .ok()
            .flatten()
    }

    /// Definitional equality, by reduction to weak-head normal form and
    /// structural comparison.
    pub fn is_def_eq(&self, a: &Expr, b: &Expr) -> bool {
        self.is_def_eq_with(a, b, Transparency::All)
    }

    /// Definitional equality at the given transparency
    pub fn is_def_eq_with(&self, a: &Expr, b: &Expr, transparency: Transparency) -> bool {
        if a == b {
            return true;
        }
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
            let a = self.whnf_with(a, transparency);
            let b = self.whnf_with(b, transparency);
            match (&a, &b) {
                (Expr::Sort(l1), Expr::Sort(l2)) => l1.simplify() == l2.simplify(),
                (Expr::Const(n1, l1), Expr::Const(n2, l2)) => {
                    n1 == n2
                        && l1.len() == l2.len()
                        && l1.iter().zip(l2.iter()).all(|(x, y)| x.simplify() == y.simplify())
                }
                (Expr::App(f1, a1), Expr::App(f2, a2)) => {
                    self.is_def_eq_with(f1, f2, transparency)
                        && self.is_def_eq_with(a1, a2, transparency)
                }
                (Expr::Lam(_, t1, b1), Expr::Lam(_, t2, b2))
                | (Expr::Pi(_, t1, b1), Expr::Pi(_, t2, b2)) => {
                    self.is_def_eq_with(t1, t2, transparency)
                        && self.is_def_eq_with(b1, b2, transparency)
                }
                _ => a == b,
            }
        })
    }
}
