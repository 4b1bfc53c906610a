//! nthrw elaborator and tactics
//!
//! Converts surface syntax to kernel terms and runs tactics over a proof
//! state:
//! - Named to de Bruijn conversion
//! - Universe levels solved from explicit type arguments
//! - Goals as metavariables
//! - `nth_rewrite`, followed by reflexivity
//!
//! # Example
//!
//! ```
//! use nthrw_elab::{elaborate, ElabCtx};
//! use nthrw_kernel::Environment;
//! use nthrw_parser::parse_expr;
//!
//! let env = Environment::with_prelude().unwrap();
//! let mut ctx = ElabCtx::new(&env);
//! let surface = parse_expr("fun (x : Nat) => x + x").unwrap();
//! let kernel_expr = ctx.elaborate(&surface).unwrap();
//! ```

pub mod elab;
pub mod meta;
pub mod tactic;

pub use elab::ElabCtx;
pub use meta::{MetaId, MetaState, MetaVar};
pub use tactic::{
    nth_rewrite, nth_rewrite_with_config, occurrences, rfl_reducible, Goal, LocalDecl,
    Location, NthRewriteConfig, Occurrence, ProofState, RewriteError, RewriteOutcome, RuleSpec,
    Side, TacticError, TacticResult,
};

/// Elaborate surface syntax to kernel expression
pub fn elaborate(
    env: &nthrw_kernel::Environment,
    surface: &nthrw_parser::SurfaceExpr,
) -> Result<nthrw_kernel::Expr, ElabError> {
    let mut ctx = ElabCtx::new(env);
    ctx.elaborate(surface)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ElabError {
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("Unknown identifier: {0}")]
    UnknownIdent(String),
    #[error("Cannot infer type: {0}")]
    CannotInfer(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}
