//! Problem files
//!
//! A problem is a JSON document naming the constants to declare on top of
//! the prelude, the hypotheses in scope and the goal, all as surface terms:
//!
//! ```json
//! {
//!   "constants": [{ "name": "g", "type": "Nat → Nat → Prop" }],
//!   "hypotheses": [{ "name": "h", "type": "x = f x" }],
//!   "goal": "g x x"
//! }
//! ```

use anyhow::Context;
use nthrw_elab::{ElabCtx, LocalDecl, ProofState};
use nthrw_kernel::{Environment, FVarId, LocalContext, Name};
use nthrw_parser::parse_expr;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A named surface term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(default)]
    pub constants: Vec<Item>,
    #[serde(default)]
    pub hypotheses: Vec<Item>,
    pub goal: String,
}

impl Problem {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("invalid problem file")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Declare the constants and build the initial proof state.
    ///
    /// Hypotheses get free variables `0..n` in order and may mention the
    /// ones before them.
    pub fn to_state(&self) -> anyhow::Result<ProofState> {
        let mut env = Environment::with_prelude().context("cannot build the prelude")?;
        for item in &self.constants {
            let surface = parse_expr(&item.ty)
                .with_context(|| format!("in the type of constant {}", item.name))?;
            let ty = ElabCtx::new(&env)
                .elaborate(&surface)
                .with_context(|| format!("in the type of constant {}", item.name))?;
            env.add_axiom(&item.name, ty)
                .with_context(|| format!("cannot declare {}", item.name))?;
        }

        let mut ctx = LocalContext::new();
        let mut decls = Vec::with_capacity(self.hypotheses.len());
        for (i, item) in self.hypotheses.iter().enumerate() {
            let fvar = FVarId(i as u64);
            let surface = parse_expr(&item.ty)
                .with_context(|| format!("in hypothesis {}", item.name))?;
            let ty = ElabCtx::with_context(&env, ctx.clone())
                .elaborate(&surface)
                .with_context(|| format!("in hypothesis {}", item.name))?;
            ctx.push_with_id(fvar, Name::from_string(&item.name), ty.clone());
            decls.push(LocalDecl::new(fvar, item.name.clone(), ty));
        }

        let surface = parse_expr(&self.goal).context("in the goal")?;
        let target = ElabCtx::with_context(&env, ctx)
            .elaborate_prop(&surface)
            .context("in the goal")?;
        Ok(ProofState::with_context(env, target, decls))
    }
}
