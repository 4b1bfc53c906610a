//! Kernel error types

use crate::expr::FVarId;
use crate::name::Name;
use thiserror::Error;

/// Result type for kernel operations
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors raised by the environment and the type checker
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// Constant is not declared in the environment
    #[error("unknown constant: {0}")]
    UnknownConstant(Name),

    /// Constant declared twice
    #[error("constant already declared: {0}")]
    AlreadyDeclared(Name),

    /// Free variable not present in the local context
    #[error("unknown free variable: {0:?}")]
    UnknownFVar(FVarId),

    /// Loose bound variable reached the type checker
    #[error("loose bound variable #{0}")]
    LooseBVar(u32),

    /// Universe level arguments do not match the declaration
    #[error("constant {name} expects {expected} universe levels, got {actual}")]
    LevelArity {
        name: Name,
        expected: usize,
        actual: usize,
    },

    /// Application of something that is not a function
    #[error("function expected, got term of type {0}")]
    NotAFunction(String),

    /// A type was expected
    #[error("type expected, got {0}")]
    NotASort(String),

    /// Argument or declaration type mismatch
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Declaration contains loose bound variables or free variables
    #[error("declaration {0} is not closed")]
    NotClosed(Name),
}
