//! Universe levels
//!
//! `Sort 0` is `Prop`, `Sort 1` is `Type`. Levels are only tracked far enough
//! to print terms and to tell propositions from data.

use crate::name::Name;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Universe level
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    /// Level zero (Prop)
    Zero,
    /// Successor level
    Succ(Arc<Level>),
    /// Maximum of two levels
    Max(Arc<Level>, Arc<Level>),
    /// Impredicative maximum: `imax u 0 = 0`
    IMax(Arc<Level>, Arc<Level>),
    /// Universe parameter
    Param(Name),
}

impl Level {
    pub fn zero() -> Self {
        Level::Zero
    }

    pub fn one() -> Self {
        Level::succ(Level::Zero)
    }

    pub fn succ(l: Level) -> Self {
        Level::Succ(Arc::new(l))
    }

    pub fn max(a: Level, b: Level) -> Self {
        Level::Max(Arc::new(a), Arc::new(b))
    }

    pub fn imax(a: Level, b: Level) -> Self {
        Level::IMax(Arc::new(a), Arc::new(b))
    }

    pub fn param(name: Name) -> Self {
        Level::Param(name)
    }

    /// Check if this level is syntactically zero
    pub fn is_zero(&self) -> bool {
        matches!(self, Level::Zero)
    }

    /// Normalise closed `max`/`imax`/`succ` chains into a simpler level.
    ///
    /// Only levels without parameters are fully evaluated; anything else is
    /// returned with its closed sub-parts simplified.
    #[must_use]
    pub fn simplify(&self) -> Level {
        match self {
            Level::Zero | Level::Param(_) => self.clone(),
            Level::Succ(l) => Level::succ(l.simplify()),
            Level::Max(a, b) => {
                let (a, b) = (a.simplify(), b.simplify());
                match (a.to_nat(), b.to_nat()) {
                    (Some(x), Some(y)) => Level::from_nat(x.max(y)),
                    _ if a.is_zero() => b,
                    _ if b.is_zero() => a,
                    _ if a == b => a,
                    _ => Level::max(a, b),
                }
            }
            Level::IMax(a, b) => {
                let (a, b) = (a.simplify(), b.simplify());
                if b.is_zero() {
                    return Level::Zero;
                }
                match (a.to_nat(), b.to_nat()) {
                    (Some(x), Some(y)) => Level::from_nat(x.max(y)),
                    _ => Level::imax(a, b),
                }
            }
        }
    }

    /// Closed level as a number
    pub fn to_nat(&self) -> Option<u32> {
        match self {
            Level::Zero => Some(0),
            Level::Succ(l) => l.to_nat().map(|n| n + 1),
            _ => None,
        }
    }

    pub fn from_nat(n: u32) -> Level {
        (0..n).fold(Level::Zero, |acc, _| Level::succ(acc))
    }

    /// Substitute universe parameters
    #[must_use]
    pub fn instantiate_params(&self, subst: &[(Name, Level)]) -> Level {
        match self {
            Level::Zero => Level::Zero,
            Level::Succ(l) => Level::succ(l.instantiate_params(subst)),
            Level::Max(a, b) => Level::max(a.instantiate_params(subst), b.instantiate_params(subst)),
            Level::IMax(a, b) => {
                Level::imax(a.instantiate_params(subst), b.instantiate_params(subst))
            }
            Level::Param(name) => subst
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, l)| l.clone())
                .unwrap_or_else(|| self.clone()),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(n) = self.to_nat() {
            return write!(f, "{n}");
        }
        match self {
            Level::Zero => write!(f, "0"),
            Level::Succ(l) => write!(f, "{l}+1"),
            Level::Max(a, b) => write!(f, "max {a} {b}"),
            Level::IMax(a, b) => write!(f, "imax {a} {b}"),
            Level::Param(n) => write!(f, "{n}"),
        }
    }
}
