//! Metavariables
//!
//! Goals are metavariables: holes in the proof term that tactics fill in.
//! A metavariable appears inside terms as a free variable drawn from a
//! reserved id range, so the kernel can type check partial proofs without
//! knowing about holes.

use nthrw_kernel::{Expr, FVarId};
use std::sync::Arc;

/// First free variable id used to represent metavariables
const META_FVAR_BASE: u64 = 1 << 40;

/// Metavariable identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetaId(pub u64);

/// A metavariable: its type and, once solved, its assignment
#[derive(Debug, Clone)]
pub struct MetaVar {
    pub ty: Expr,
    pub assignment: Option<Expr>,
}

/// All metavariables of a proof
#[derive(Debug, Clone, Default)]
pub struct MetaState {
    metas: Vec<MetaVar>,
}

impl MetaState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unassigned metavariable of the given type
    pub fn fresh(&mut self, ty: Expr) -> MetaId {
        let id = MetaId(self.metas.len() as u64);
        self.metas.push(MetaVar {
            ty,
            assignment: None,
        });
        id
    }

    pub fn get(&self, id: MetaId) -> Option<&MetaVar> {
        self.metas.get(id.0 as usize)
    }

    pub fn assign(&mut self, id: MetaId, value: Expr) {
        if let Some(meta) = self.metas.get_mut(id.0 as usize) {
            meta.assignment = Some(value);
        }
    }

    pub fn get_assignment(&self, id: MetaId) -> Option<&Expr> {
        self.get(id).and_then(|m| m.assignment.as_ref())
    }

    pub fn is_assigned(&self, id: MetaId) -> bool {
        self.get_assignment(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetaId, &MetaVar)> {
        self.metas
            .iter()
            .enumerate()
            .map(|(i, m)| (MetaId(i as u64), m))
    }

    pub fn len(&self) -> usize {
        self.metas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    /// The id the next call to [`MetaState::fresh`] will return
    pub fn next_id(&self) -> MetaId {
        MetaId(self.metas.len() as u64)
    }

    /// The free variable standing for a metavariable inside terms
    pub fn to_fvar(id: MetaId) -> FVarId {
        FVarId(META_FVAR_BASE + id.0)
    }

    /// Inverse of [`MetaState::to_fvar`]
    pub fn from_fvar(fvar: FVarId) -> Option<MetaId> {
        fvar.0.checked_sub(META_FVAR_BASE).map(MetaId)
    }

    /// Metavariable as a term
    pub fn mk_meta(id: MetaId) -> Expr {
        Expr::fvar(Self::to_fvar(id))
    }

    /// Replace every assigned metavariable by its (instantiated) value
    pub fn instantiate(&self, expr: &Expr) -> Expr {
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || match expr {
            Expr::FVar(fvar) => match Self::from_fvar(*fvar).and_then(|m| self.get_assignment(m)) {
                Some(value) => self.instantiate(value),
                None => expr.clone(),
            },
            Expr::BVar(_) | Expr::Sort(_) | Expr::Const(_, _) | Expr::Lit(_) => expr.clone(),
            Expr::App(f, a) => Expr::App(Arc::new(self.instantiate(f)), Arc::new(self.instantiate(a))),
            Expr::Lam(bi, ty, body) => Expr::Lam(
                *bi,
                Arc::new(self.instantiate(ty)),
                Arc::new(self.instantiate(body)),
            ),
            Expr::Pi(bi, ty, body) => Expr::Pi(
                *bi,
                Arc::new(self.instantiate(ty)),
                Arc::new(self.instantiate(body)),
            ),
            Expr::Let(ty, val, body) => Expr::Let(
                Arc::new(self.instantiate(ty)),
                Arc::new(self.instantiate(val)),
                Arc::new(self.instantiate(body)),
            ),
            Expr::MData(meta, inner) => Expr::MData(meta.clone(), Arc::new(self.instantiate(inner))),
        })
    }
}
