//! nthrw kernel
//!
//! Terms, universe levels, the global environment and a small type checker.
//! Everything the tactic layer builds (rewritten goals, congruence proofs) is
//! an [`Expr`] checked against an [`Environment`].

pub mod env;
pub mod error;
pub mod expr;
pub mod level;
pub mod name;
pub mod pretty;
pub mod tc;

pub use env::{ConstantInfo, Declaration, Environment};
pub use error::{KernelError, KernelResult};
pub use expr::{BinderInfo, Expr, FVarId, Literal, MDataMap, MDataValue};
pub use level::Level;
pub use name::Name;
pub use pretty::Printer;
pub use tc::{LocalContext, Transparency, TypeChecker};
