//! Global environment of declarations
//!
//! Holds axioms and definitions by name. The `init_*` helpers declare the
//! small prelude the tactic layer builds proofs from (`Eq`, `Iff`,
//! `congrArg`, `propext`, `Eq.mpr`, ...).

use crate::error::{KernelError, KernelResult};
use crate::expr::{BinderInfo, Expr};
use crate::level::Level;
use crate::name::Name;
use crate::tc::TypeChecker;
use hashbrown::HashMap;

/// A declaration to be added to the environment
#[derive(Debug, Clone)]
pub enum Declaration {
    /// Constant with a type and no value
    Axiom {
        name: Name,
        level_params: Vec<Name>,
        type_: Expr,
    },
    /// Constant with a type and a value that may be unfolded
    Definition {
        name: Name,
        level_params: Vec<Name>,
        type_: Expr,
        value: Expr,
    },
}

impl Declaration {
    pub fn name(&self) -> &Name {
        match self {
            Declaration::Axiom { name, .. } | Declaration::Definition { name, .. } => name,
        }
    }
}

/// Information stored for a declared constant
#[derive(Debug, Clone)]
pub struct ConstantInfo {
    pub name: Name,
    pub level_params: Vec<Name>,
    pub type_: Expr,
    pub value: Option<Expr>,
}

impl ConstantInfo {
    /// Type with the universe parameters replaced by `levels`
    pub fn instantiate_type(&self, levels: &[Level]) -> KernelResult<Expr> {
        let subst = self.level_subst(levels)?;
        Ok(self.type_.instantiate_level_params(&subst))
    }

    /// Value with the universe parameters replaced by `levels`
    pub fn instantiate_value(&self, levels: &[Level]) -> KernelResult<Option<Expr>> {
        let subst = self.level_subst(levels)?;
        Ok(self
            .value
            .as_ref()
            .map(|v| v.instantiate_level_params(&subst)))
    }

    fn level_subst(&self, levels: &[Level]) -> KernelResult<Vec<(Name, Level)>> {
        if levels.len() != self.level_params.len() {
            return Err(KernelError::LevelArity {
                name: self.name.clone(),
                expected: self.level_params.len(),
                actual: levels.len(),
            });
        }
        Ok(self
            .level_params
            .iter()
            .cloned()
            .zip(levels.iter().cloned())
            .collect())
    }
}

/// The global environment
#[derive(Debug, Clone, Default)]
pub struct Environment {
    constants: HashMap<Name, ConstantInfo>,
    /// Declaration order, for deterministic listing
    order: Vec<Name>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration after checking that its type (and value) are
    /// well formed.
    pub fn add_decl(&mut self, decl: Declaration) -> KernelResult<()> {
        let name = decl.name().clone();
        if self.constants.contains_key(&name) {
            return Err(KernelError::AlreadyDeclared(name));
        }

        let (level_params, type_, value) = match decl {
            Declaration::Axiom {
                level_params,
                type_,
                ..
            } => (level_params, type_, None),
            Declaration::Definition {
                level_params,
                type_,
                value,
                ..
            } => (level_params, type_, Some(value)),
        };

        if type_.has_loose_bvars() || value.as_ref().is_some_and(Expr::has_loose_bvars) {
            return Err(KernelError::NotClosed(name));
        }

        {
            let tc = TypeChecker::new(self);
            tc.ensure_sort(&type_)?;
            if let Some(value) = &value {
                let value_ty = tc.infer_type(value)?;
                if !tc.is_def_eq(&value_ty, &type_) {
                    return Err(KernelError::TypeMismatch {
                        expected: format!("{type_}"),
                        actual: format!("{value_ty}"),
                    });
                }
            }
        }

        self.order.push(name.clone());
        self.constants.insert(
            name.clone(),
            ConstantInfo {
                name,
                level_params,
                type_,
                value,
            },
        );
        Ok(())
    }

    /// Declare an axiom without universe parameters
    pub fn add_axiom(&mut self, name: &str, type_: Expr) -> KernelResult<()> {
        self.add_decl(Declaration::Axiom {
            name: Name::from_string(name),
            level_params: vec![],
            type_,
        })
    }

    /// Look up a constant
    pub fn get_const(&self, name: &Name) -> Option<&ConstantInfo> {
        self.constants.get(name)
    }

    /// Check whether a constant is declared
    pub fn contains(&self, name: &str) -> bool {
        self.constants.contains_key(&Name::from_string(name))
    }

    /// All constants in declaration order
    pub fn constants(&self) -> impl Iterator<Item = &ConstantInfo> {
        self.order.iter().filter_map(|n| self.constants.get(n))
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Declare `Eq`, `Eq.refl`, `Eq.symm`, `Eq.mp`, `Eq.mpr` and `congrArg`.
    pub fn init_eq(&mut self) -> KernelResult<()> {
        let u = Name::from_string("u");
        let v = Name::from_string("v");
        let sort_u = Expr::sort(Level::param(u.clone()));
        let sort_v = Expr::sort(Level::param(v.clone()));
        let eq_at = |level: Level, ty: Expr, a: Expr, b: Expr| {
            Expr::mk_app(Expr::const_(Name::from_string("Eq"), vec![level]), [ty, a, b])
        };
        let pu = || Level::param(Name::from_string("u"));
        let pv = || Level::param(Name::from_string("v"));
        let imp = BinderInfo::Implicit;
        let def = BinderInfo::Default;

        // Eq.{u} : {α : Sort u} → α → α → Prop
        self.add_decl(Declaration::Axiom {
            name: Name::from_string("Eq"),
            level_params: vec![u.clone()],
            type_: Expr::pi(
                imp,
                sort_u.clone(),
                Expr::pi(def, Expr::bvar(0), Expr::pi(def, Expr::bvar(1), Expr::prop())),
            ),
        })?;

        // Eq.refl.{u} : {α : Sort u} → (a : α) → a = a
        self.add_decl(Declaration::Axiom {
            name: Name::from_string("Eq.refl"),
            level_params: vec![u.clone()],
            type_: Expr::pi(
                imp,
                sort_u.clone(),
                Expr::pi(
                    def,
                    Expr::bvar(0),
                    eq_at(pu(), Expr::bvar(1), Expr::bvar(0), Expr::bvar(0)),
                ),
            ),
        })?;

        // Eq.symm.{u} : {α : Sort u} → {a b : α} → a = b → b = a
        self.add_decl(Declaration::Axiom {
            name: Name::from_string("Eq.symm"),
            level_params: vec![u.clone()],
            type_: Expr::pi(
                imp,
                sort_u.clone(),
                Expr::pi(
                    imp,
                    Expr::bvar(0),
                    Expr::pi(
                        imp,
                        Expr::bvar(1),
                        Expr::pi(
                            def,
                            eq_at(pu(), Expr::bvar(2), Expr::bvar(1), Expr::bvar(0)),
                            eq_at(pu(), Expr::bvar(3), Expr::bvar(1), Expr::bvar(2)),
                        ),
                    ),
                ),
            ),
        })?;

        // Eq.mpr.{u} : {α β : Sort u} → α = β → β → α
        // Eq.mp.{u}  : {α β : Sort u} → α = β → α → β
        let sort_eq = |a: u32, b: u32| {
            eq_at(
                Level::succ(pu()),
                Expr::sort(pu()),
                Expr::bvar(a),
                Expr::bvar(b),
            )
        };
        self.add_decl(Declaration::Axiom {
            name: Name::from_string("Eq.mpr"),
            level_params: vec![u.clone()],
            type_: Expr::pi(
                imp,
                sort_u.clone(),
                Expr::pi(
                    imp,
                    sort_u.clone(),
                    Expr::pi(
                        def,
                        sort_eq(1, 0),
                        Expr::pi(def, Expr::bvar(1), Expr::bvar(3)),
                    ),
                ),
            ),
        })?;
        self.add_decl(Declaration::Axiom {
            name: Name::from_string("Eq.mp"),
            level_params: vec![u.clone()],
            type_: Expr::pi(
                imp,
                sort_u.clone(),
                Expr::pi(
                    imp,
                    sort_u.clone(),
                    Expr::pi(
                        def,
                        sort_eq(1, 0),
                        Expr::pi(def, Expr::bvar(2), Expr::bvar(2)),
                    ),
                ),
            ),
        })?;

        // congrArg.{u,v} : {α : Sort u} → {β : Sort v} → {a₁ a₂ : α} →
        //   (f : α → β) → a₁ = a₂ → f a₁ = f a₂
        self.add_decl(Declaration::Axiom {
            name: Name::from_string("congrArg"),
            level_params: vec![u, v],
            type_: Expr::pi(
                imp,
                sort_u,
                Expr::pi(
                    imp,
                    sort_v,
                    Expr::pi(
                        imp,
                        Expr::bvar(1),
                        Expr::pi(
                            imp,
                            Expr::bvar(2),
                            Expr::pi(
                                def,
                                Expr::arrow(Expr::bvar(3), Expr::bvar(2)),
                                Expr::pi(
                                    def,
                                    eq_at(pu(), Expr::bvar(4), Expr::bvar(2), Expr::bvar(1)),
                                    eq_at(
                                        pv(),
                                        Expr::bvar(4),
                                        Expr::app(Expr::bvar(1), Expr::bvar(3)),
                                        Expr::app(Expr::bvar(1), Expr::bvar(2)),
                                    ),
                                ),
                            ),
                        ),
                    ),
                ),
            ),
        })?;

        Ok(())
    }

    /// Declare `Iff`, `Iff.refl`, `Iff.symm` and `propext`. Requires `init_eq`.
    pub fn init_iff(&mut self) -> KernelResult<()> {
        let iff = |a: Expr, b: Expr| Expr::mk_app(Expr::const_(Name::from_string("Iff"), vec![]), [a, b]);
        let imp = BinderInfo::Implicit;
        let def = BinderInfo::Default;

        self.add_axiom("Iff", Expr::arrow(Expr::prop(), Expr::arrow(Expr::prop(), Expr::prop())))?;
        self.add_axiom(
            "Iff.refl",
            Expr::pi(def, Expr::prop(), iff(Expr::bvar(0), Expr::bvar(0))),
        )?;
        self.add_axiom(
            "Iff.symm",
            Expr::pi(
                imp,
                Expr::prop(),
                Expr::pi(
                    imp,
                    Expr::prop(),
                    Expr::pi(def, iff(Expr::bvar(1), Expr::bvar(0)), iff(Expr::bvar(1), Expr::bvar(2))),
                ),
            ),
        )?;
        // propext : {a b : Prop} → (a ↔ b) → a = b
        self.add_axiom(
            "propext",
            Expr::pi(
                imp,
                Expr::prop(),
                Expr::pi(
                    imp,
                    Expr::prop(),
                    Expr::pi(
                        def,
                        iff(Expr::bvar(1), Expr::bvar(0)),
                        Expr::mk_app(
                            Expr::const_(Name::from_string("Eq"), vec![Level::one()]),
                            [Expr::prop(), Expr::bvar(2), Expr::bvar(1)],
                        ),
                    ),
                ),
            ),
        )?;
        Ok(())
    }

    /// Declare `Nat`, `String`, `Add.add` and `Mul.mul`.
    ///
    /// `Add.add.{u} : {α : Sort u} → α → α → α` stands in for the usual
    /// type-class operators; the elaborator maps `+` and `*` onto these.
    pub fn init_arith(&mut self) -> KernelResult<()> {
        self.add_axiom("Nat", Expr::type_())?;
        self.add_axiom("String", Expr::type_())?;
        let nat = Expr::const_(Name::from_string("Nat"), vec![]);
        self.add_axiom("Nat.zero", nat.clone())?;
        self.add_axiom("Nat.succ", Expr::arrow(nat.clone(), nat))?;

        for op in ["Add.add", "Mul.mul"] {
            let u = Name::from_string("u");
            self.add_decl(Declaration::Axiom {
                name: Name::from_string(op),
                level_params: vec![u.clone()],
                type_: Expr::pi(
                    BinderInfo::Implicit,
                    Expr::sort(Level::param(u)),
                    Expr::arrow(Expr::bvar(0), Expr::arrow(Expr::bvar(0), Expr::bvar(0))),
                ),
            })?;
        }
        Ok(())
    }

    /// Environment with the whole prelude declared
    pub fn with_prelude() -> KernelResult<Self> {
        let mut env = Environment::new();
        env.init_eq()?;
        env.init_iff()?;
        env.init_arith()?;
        Ok(env)
    }
}
