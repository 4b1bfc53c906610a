//! Expression representation
//!
//! The core term type shared by the kernel, the elaborator and the tactics.
//! Bound variables use de Bruijn indices; free variables are opaque ids
//! owned by whoever created them (local hypotheses, metavariables).

use crate::level::Level;
use crate::name::Name;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::sync::Arc;

/// Minimum stack space to reserve before recursive calls (32 KB).
const MIN_STACK_RED_ZONE: usize = 32 * 1024;

/// Stack size to grow to when running low (1 MB).
const STACK_GROWTH_SIZE: usize = 1024 * 1024;

/// Universe level lists in `Expr::Const`. Almost every constant has at
/// most two universe parameters.
pub type LevelVec = SmallVec<[Level; 2]>;

/// Binder information (how a variable is bound)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinderInfo {
    /// Regular explicit binding
    Default,
    /// Implicit binding `{x : T}`
    Implicit,
    /// Instance implicit `[x : T]`
    InstImplicit,
}

/// Literal values
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    /// Natural number literal
    Nat(u64),
    /// String literal
    String(Arc<str>),
}

/// Metadata value for MData expressions
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MDataValue {
    Bool(bool),
    Nat(u64),
    String(Arc<str>),
    Name(Name),
}

/// Key-value metadata map for MData expressions
pub type MDataMap = Vec<(Name, MDataValue)>;

/// Unique identifier for free variables
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FVarId(pub u64);

/// Core expression type
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Bound variable (de Bruijn index, 0 = innermost)
    BVar(u32),
    /// Free variable
    FVar(FVarId),
    /// Sort (Prop, Type u)
    Sort(Level),
    /// Constant with universe level instantiation
    Const(Name, LevelVec),
    /// Function application
    App(Arc<Expr>, Arc<Expr>),
    /// Lambda abstraction: λ (x : A), body
    Lam(BinderInfo, Arc<Expr>, Arc<Expr>),
    /// Pi/forall type: (x : A) → B
    Pi(BinderInfo, Arc<Expr>, Arc<Expr>),
    /// Let binding: let x : A := val in body
    Let(Arc<Expr>, Arc<Expr>, Arc<Expr>),
    /// Literal value
    Lit(Literal),
    /// Metadata wrapper, transparent to typing and matching
    MData(MDataMap, Arc<Expr>),
}

impl Expr {
    /// Create a bound variable
    pub fn bvar(idx: u32) -> Self {
        Expr::BVar(idx)
    }

    /// Create a free variable
    pub fn fvar(id: FVarId) -> Self {
        Expr::FVar(id)
    }

    /// Create a sort
    pub fn sort(level: Level) -> Self {
        Expr::Sort(level)
    }

    /// Create Prop (Sort 0)
    pub fn prop() -> Self {
        Expr::Sort(Level::zero())
    }

    /// Create Type (Sort 1)
    pub fn type_() -> Self {
        Expr::Sort(Level::one())
    }

    /// Create a constant reference
    pub fn const_(name: Name, levels: impl Into<LevelVec>) -> Self {
        Expr::Const(name, levels.into())
    }

    /// Create an application
    pub fn app(func: Expr, arg: Expr) -> Self {
        Expr::App(Arc::new(func), Arc::new(arg))
    }

    /// Apply `func` to each of `args` in order
    pub fn mk_app(func: Expr, args: impl IntoIterator<Item = Expr>) -> Self {
        args.into_iter().fold(func, Expr::app)
    }

    /// Create a lambda
    pub fn lam(bi: BinderInfo, ty: Expr, body: Expr) -> Self {
        Expr::Lam(bi, Arc::new(ty), Arc::new(body))
    }

    /// Create a pi type
    pub fn pi(bi: BinderInfo, ty: Expr, body: Expr) -> Self {
        Expr::Pi(bi, Arc::new(ty), Arc::new(body))
    }

    /// Create an arrow type (non-dependent pi)
    pub fn arrow(from: Expr, to: Expr) -> Self {
        Expr::Pi(BinderInfo::Default, Arc::new(from), Arc::new(to.lift(1)))
    }

    /// Create a let binding
    pub fn let_(ty: Expr, val: Expr, body: Expr) -> Self {
        Expr::Let(Arc::new(ty), Arc::new(val), Arc::new(body))
    }

    /// Create a natural number literal
    pub fn nat_lit(n: u64) -> Self {
        Expr::Lit(Literal::Nat(n))
    }

    /// Create a string literal
    pub fn str_lit(s: impl AsRef<str>) -> Self {
        Expr::Lit(Literal::String(Arc::from(s.as_ref())))
    }

    /// Create a metadata wrapper
    pub fn mdata(metadata: MDataMap, expr: Expr) -> Self {
        Expr::MData(metadata, Arc::new(expr))
    }

    /// Get the inner expression if this is an MData, otherwise self
    pub fn strip_mdata(&self) -> &Expr {
        match self {
            Expr::MData(_, inner) => inner.strip_mdata(),
            _ => self,
        }
    }

    /// Check if this is Prop
    pub fn is_prop(&self) -> bool {
        matches!(self, Expr::Sort(l) if l.simplify().is_zero())
    }

    /// Name of the constant, if this is one
    pub fn const_name(&self) -> Option<&Name> {
        match self {
            Expr::Const(name, _) => Some(name),
            _ => None,
        }
    }

    /// Get the head of an application spine
    pub fn get_app_fn(&self) -> &Expr {
        match self {
            Expr::App(f, _) => f.get_app_fn(),
            _ => self,
        }
    }

    /// Get all arguments of an application spine
    pub fn get_app_args(&self) -> Vec<&Expr> {
        let mut args = Vec::new();
        let mut curr = self;
        while let Expr::App(f, a) = curr {
            args.push(a.as_ref());
            curr = f.as_ref();
        }
        args.reverse();
        args
    }

    /// If this is `c a₁ … aₙ` for the constant `c` with exactly `arity`
    /// arguments, return the arguments.
    pub fn app_of(&self, name: &str, arity: usize) -> Option<Vec<&Expr>> {
        let head = self.get_app_fn();
        match head {
            Expr::Const(n, _) if *n == Name::from_string(name) => {
                let args = self.get_app_args();
                (args.len() == arity).then_some(args)
            }
            _ => None,
        }
    }

    /// Number of nodes in the expression tree
    pub fn size(&self) -> usize {
        match self {
            Expr::BVar(_) | Expr::FVar(_) | Expr::Sort(_) | Expr::Const(_, _) | Expr::Lit(_) => 1,
            Expr::App(f, a) => 1 + f.size() + a.size(),
            Expr::Lam(_, ty, body) | Expr::Pi(_, ty, body) => 1 + ty.size() + body.size(),
            Expr::Let(ty, val, body) => 1 + ty.size() + val.size() + body.size(),
            Expr::MData(_, inner) => 1 + inner.size(),
        }
    }

    /// Substitute bound variable 0 with the given expression
    #[must_use]
    pub fn instantiate(&self, val: &Expr) -> Expr {
        self.instantiate_at(val, 0)
    }

    fn instantiate_at(&self, val: &Expr, depth: u32) -> Expr {
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || {
            self.instantiate_at_impl(val, depth)
        })
    }

    fn instantiate_at_impl(&self, val: &Expr, depth: u32) -> Expr {
        match self {
            Expr::BVar(idx) => {
                use std::cmp::Ordering;
                match idx.cmp(&depth) {
                    Ordering::Equal => val.lift(depth),
                    Ordering::Greater => Expr::BVar(idx - 1),
                    Ordering::Less => Expr::BVar(*idx),
                }
            }
            Expr::FVar(_) | Expr::Sort(_) | Expr::Const(_, _) | Expr::Lit(_) => self.clone(),
            Expr::App(f, a) => Expr::App(
                Arc::new(f.instantiate_at(val, depth)),
                Arc::new(a.instantiate_at(val, depth)),
            ),
            Expr::Lam(bi, ty, body) => Expr::Lam(
                *bi,
                Arc::new(ty.instantiate_at(val, depth)),
                Arc::new(body.instantiate_at(val, depth + 1)),
            ),
            Expr::Pi(bi, ty, body) => Expr::Pi(
                *bi,
                Arc::new(ty.instantiate_at(val, depth)),
                Arc::new(body.instantiate_at(val, depth + 1)),
            ),
            Expr::Let(ty, v, body) => Expr::Let(
                Arc::new(ty.instantiate_at(val, depth)),
                Arc::new(v.instantiate_at(val, depth)),
                Arc::new(body.instantiate_at(val, depth + 1)),
            ),
            Expr::MData(meta, inner) => {
                Expr::MData(meta.clone(), Arc::new(inner.instantiate_at(val, depth)))
            }
        }
    }

    /// Instantiate the `vals.len()` outermost loose bound variables at once.
    ///
    /// `vals[0]` replaces the variable bound by the outermost binder, so for a
    /// body taken from under `n` binders, `BVar(i)` becomes `vals[n - 1 - i]`.
    #[must_use]
    pub fn instantiate_rev(&self, vals: &[Expr]) -> Expr {
        if vals.is_empty() {
            return self.clone();
        }
        self.instantiate_rev_at(vals, 0)
    }

    fn instantiate_rev_at(&self, vals: &[Expr], depth: u32) -> Expr {
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || {
            let n = vals.len() as u32;
            match self {
                Expr::BVar(idx) if *idx < depth => self.clone(),
                Expr::BVar(idx) if *idx - depth < n => {
                    vals[(n - 1 - (*idx - depth)) as usize].lift(depth)
                }
                Expr::BVar(idx) => Expr::BVar(idx - n),
                Expr::FVar(_) | Expr::Sort(_) | Expr::Const(_, _) | Expr::Lit(_) => self.clone(),
                Expr::App(f, a) => Expr::App(
                    Arc::new(f.instantiate_rev_at(vals, depth)),
                    Arc::new(a.instantiate_rev_at(vals, depth)),
                ),
                Expr::Lam(bi, ty, body) => Expr::Lam(
                    *bi,
                    Arc::new(ty.instantiate_rev_at(vals, depth)),
                    Arc::new(body.instantiate_rev_at(vals, depth + 1)),
                ),
                Expr::Pi(bi, ty, body) => Expr::Pi(
                    *bi,
                    Arc::new(ty.instantiate_rev_at(vals, depth)),
                    Arc::new(body.instantiate_rev_at(vals, depth + 1)),
                ),
                Expr::Let(ty, v, body) => Expr::Let(
                    Arc::new(ty.instantiate_rev_at(vals, depth)),
                    Arc::new(v.instantiate_rev_at(vals, depth)),
                    Arc::new(body.instantiate_rev_at(vals, depth + 1)),
                ),
                Expr::MData(meta, inner) => {
                    Expr::MData(meta.clone(), Arc::new(inner.instantiate_rev_at(vals, depth)))
                }
            }
        })
    }

    /// Lift loose bound variables by `amount`
    #[must_use]
    pub fn lift(&self, amount: u32) -> Expr {
        self.lift_at(0, amount)
    }

    /// Lift loose bound variables >= `start` by `amount`
    #[must_use]
    pub fn lift_at(&self, start: u32, amount: u32) -> Expr {
        if amount == 0 || !self.has_loose_bvar_in_range(start, u32::MAX) {
            return self.clone();
        }
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || {
            self.lift_at_impl(start, amount)
        })
    }

    fn lift_at_impl(&self, start: u32, amount: u32) -> Expr {
        match self {
            Expr::BVar(idx) => {
                if *idx >= start {
                    Expr::BVar(idx + amount)
                } else {
                    Expr::BVar(*idx)
                }
            }
            Expr::FVar(_) | Expr::Sort(_) | Expr::Const(_, _) | Expr::Lit(_) => self.clone(),
            Expr::App(f, a) => Expr::App(
                Arc::new(f.lift_at(start, amount)),
                Arc::new(a.lift_at(start, amount)),
            ),
            Expr::Lam(bi, ty, body) => Expr::Lam(
                *bi,
                Arc::new(ty.lift_at(start, amount)),
                Arc::new(body.lift_at(start + 1, amount)),
            ),
            Expr::Pi(bi, ty, body) => Expr::Pi(
                *bi,
                Arc::new(ty.lift_at(start, amount)),
                Arc::new(body.lift_at(start + 1, amount)),
            ),
            Expr::Let(ty, val, body) => Expr::Let(
                Arc::new(ty.lift_at(start, amount)),
                Arc::new(val.lift_at(start, amount)),
                Arc::new(body.lift_at(start + 1, amount)),
            ),
            Expr::MData(meta, inner) => {
                Expr::MData(meta.clone(), Arc::new(inner.lift_at(start, amount)))
            }
        }
    }

    /// Check if expression has any loose bound variables
    pub fn has_loose_bvars(&self) -> bool {
        self.has_loose_bvar_in_range(0, u32::MAX)
    }

    /// Check if expression has loose bound variables in range [start, end)
    pub fn has_loose_bvar_in_range(&self, start: u32, end: u32) -> bool {
        match self {
            Expr::BVar(idx) => *idx >= start && *idx < end,
            Expr::FVar(_) | Expr::Sort(_) | Expr::Const(_, _) | Expr::Lit(_) => false,
            Expr::App(f, a) => {
                f.has_loose_bvar_in_range(start, end) || a.has_loose_bvar_in_range(start, end)
            }
            Expr::Lam(_, ty, body) | Expr::Pi(_, ty, body) => {
                ty.has_loose_bvar_in_range(start, end)
                    || body.has_loose_bvar_in_range(start + 1, end.saturating_add(1))
            }
            Expr::Let(ty, val, body) => {
                ty.has_loose_bvar_in_range(start, end)
                    || val.has_loose_bvar_in_range(start, end)
                    || body.has_loose_bvar_in_range(start + 1, end.saturating_add(1))
            }
            Expr::MData(_, inner) => inner.has_loose_bvar_in_range(start, end),
        }
    }

    /// Abstract: replace FVar(id) with BVar(0), shifting other bound variables up
    #[must_use]
    pub fn abstract_fvar(&self, id: FVarId) -> Expr {
        self.abstract_fvar_at(id, 0)
    }

    fn abstract_fvar_at(&self, id: FVarId, depth: u32) -> Expr {
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || match self {
            Expr::FVar(fid) if *fid == id => Expr::BVar(depth),
            Expr::FVar(_) | Expr::Sort(_) | Expr::Const(_, _) | Expr::Lit(_) => self.clone(),
            Expr::BVar(idx) => {
                if *idx >= depth {
                    Expr::BVar(idx + 1)
                } else {
                    Expr::BVar(*idx)
                }
            }
            Expr::App(f, a) => Expr::App(
                Arc::new(f.abstract_fvar_at(id, depth)),
                Arc::new(a.abstract_fvar_at(id, depth)),
            ),
            Expr::Lam(bi, ty, body) => Expr::Lam(
                *bi,
                Arc::new(ty.abstract_fvar_at(id, depth)),
                Arc::new(body.abstract_fvar_at(id, depth + 1)),
            ),
            Expr::Pi(bi, ty, body) => Expr::Pi(
                *bi,
                Arc::new(ty.abstract_fvar_at(id, depth)),
                Arc::new(body.abstract_fvar_at(id, depth + 1)),
            ),
            Expr::Let(ty, val, body) => Expr::Let(
                Arc::new(ty.abstract_fvar_at(id, depth)),
                Arc::new(val.abstract_fvar_at(id, depth)),
                Arc::new(body.abstract_fvar_at(id, depth + 1)),
            ),
            Expr::MData(meta, inner) => {
                Expr::MData(meta.clone(), Arc::new(inner.abstract_fvar_at(id, depth)))
            }
        })
    }

    /// Substitute a free variable with an expression
    #[must_use]
    pub fn subst_fvar(&self, id: FVarId, replacement: &Expr) -> Expr {
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || match self {
            Expr::FVar(fid) if *fid == id => replacement.clone(),
            Expr::BVar(_) | Expr::FVar(_) | Expr::Sort(_) | Expr::Const(_, _) | Expr::Lit(_) => {
                self.clone()
            }
            Expr::App(f, a) => Expr::App(
                Arc::new(f.subst_fvar(id, replacement)),
                Arc::new(a.subst_fvar(id, replacement)),
            ),
            Expr::Lam(bi, ty, body) => Expr::Lam(
                *bi,
                Arc::new(ty.subst_fvar(id, replacement)),
                Arc::new(body.subst_fvar(id, replacement)),
            ),
            Expr::Pi(bi, ty, body) => Expr::Pi(
                *bi,
                Arc::new(ty.subst_fvar(id, replacement)),
                Arc::new(body.subst_fvar(id, replacement)),
            ),
            Expr::Let(ty, val, body) => Expr::Let(
                Arc::new(ty.subst_fvar(id, replacement)),
                Arc::new(val.subst_fvar(id, replacement)),
                Arc::new(body.subst_fvar(id, replacement)),
            ),
            Expr::MData(meta, inner) => {
                Expr::MData(meta.clone(), Arc::new(inner.subst_fvar(id, replacement)))
            }
        })
    }

    /// Check whether the free variable `id` occurs anywhere in the expression
    pub fn has_fvar(&self, id: FVarId) -> bool {
        match self {
            Expr::FVar(fid) => *fid == id,
            Expr::BVar(_) | Expr::Sort(_) | Expr::Const(_, _) | Expr::Lit(_) => false,
            Expr::App(f, a) => f.has_fvar(id) || a.has_fvar(id),
            Expr::Lam(_, ty, body) | Expr::Pi(_, ty, body) => ty.has_fvar(id) || body.has_fvar(id),
            Expr::Let(ty, val, body) => ty.has_fvar(id) || val.has_fvar(id) || body.has_fvar(id),
            Expr::MData(_, inner) => inner.has_fvar(id),
        }
    }

    /// Substitute universe parameters
    #[must_use]
    pub fn instantiate_level_params(&self, subst: &[(Name, Level)]) -> Expr {
        if subst.is_empty() {
            return self.clone();
        }
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || match self {
            Expr::BVar(_) | Expr::FVar(_) | Expr::Lit(_) => self.clone(),
            Expr::Sort(l) => Expr::Sort(l.instantiate_params(subst)),
            Expr::Const(name, levels) => Expr::Const(
                name.clone(),
                levels.iter().map(|l| l.instantiate_params(subst)).collect(),
            ),
            Expr::App(f, a) => Expr::App(
                Arc::new(f.instantiate_level_params(subst)),
                Arc::new(a.instantiate_level_params(subst)),
            ),
            Expr::Lam(bi, ty, body) => Expr::Lam(
                *bi,
                Arc::new(ty.instantiate_level_params(subst)),
                Arc::new(body.instantiate_level_params(subst)),
            ),
            Expr::Pi(bi, ty, body) => Expr::Pi(
                *bi,
                Arc::new(ty.instantiate_level_params(subst)),
                Arc::new(body.instantiate_level_params(subst)),
            ),
            Expr::Let(ty, val, body) => Expr::Let(
                Arc::new(ty.instantiate_level_params(subst)),
                Arc::new(val.instantiate_level_params(subst)),
                Arc::new(body.instantiate_level_params(subst)),
            ),
            Expr::MData(meta, inner) => {
                Expr::MData(meta.clone(), Arc::new(inner.instantiate_level_params(subst)))
            }
        })
    }
}
