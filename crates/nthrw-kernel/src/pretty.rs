//! Pretty printing
//!
//! Renders expressions in the same surface syntax the parser accepts, so a
//! printed goal can be pasted back as input. Bound variables get generated
//! names; free variables print by the name supplied by the caller, or as
//! `_fvar.N` when none is known.

use crate::expr::{Expr, FVarId, Literal};
use crate::level::Level;
use crate::name::Name;
use hashbrown::HashMap;
use std::fmt;

const PREC_BINDER: u32 = 0;
const PREC_IFF: u32 = 20;
const PREC_ARROW: u32 = 25;
const PREC_EQ: u32 = 50;
const PREC_ADD: u32 = 65;
const PREC_MUL: u32 = 70;
const PREC_APP: u32 = 1024;
const PREC_ARG: u32 = 1025;

/// Expression printer with optional names for free variables
pub struct Printer<'a> {
    fvar_names: Option<&'a HashMap<FVarId, Name>>,
    binders: Vec<String>,
}

impl<'a> Printer<'a> {
    pub fn new() -> Self {
        Printer {
            fvar_names: None,
            binders: Vec::new(),
        }
    }

    pub fn with_fvar_names(names: &'a HashMap<FVarId, Name>) -> Self {
        Printer {
            fvar_names: Some(names),
            binders: Vec::new(),
        }
    }

    pub fn print(mut self, expr: &Expr) -> String {
        let mut out = String::new();
        self.write(expr, PREC_BINDER, &mut out);
        out
    }

    fn fresh_binder(&self) -> String {
        match self.binders.len() {
            0 => "x".to_string(),
            n => format!("x_{n}"),
        }
    }

    fn write(&mut self, expr: &Expr, prec: u32, out: &mut String) {
        stacker::maybe_grow(32 * 1024, 1024 * 1024, || self.write_impl(expr, prec, out));
    }

    fn write_paren(
        &mut self,
        own: u32,
        prec: u32,
        out: &mut String,
        body: impl FnOnce(&mut Self, &mut String),
    ) {
        let paren = own < prec;
        if paren {
            out.push('(');
        }
        body(self, out);
        if paren {
            out.push(')');
        }
    }

    fn write_infix(
        &mut self,
        op: &str,
        own: u32,
        (lp, rp): (u32, u32),
        (lhs, rhs): (&Expr, &Expr),
        prec: u32,
        out: &mut String,
    ) {
        self.write_paren(own, prec, out, |p, out| {
            p.write(lhs, lp, out);
            out.push(' ');
            out.push_str(op);
            out.push(' ');
            p.write(rhs, rp, out);
        });
    }

    fn write_impl(&mut self, expr: &Expr, prec: u32, out: &mut String) {
        if let Some(args) = expr.app_of("Eq", 3) {
            return self.write_infix("=", PREC_EQ, (PREC_EQ + 1, PREC_EQ + 1), (args[1], args[2]), prec, out);
        }
        if let Some(args) = expr.app_of("Iff", 2) {
            return self.write_infix("↔", PREC_IFF, (PREC_IFF + 1, PREC_IFF + 1), (args[0], args[1]), prec, out);
        }
        if let Some(args) = expr.app_of("Add.add", 3) {
            return self.write_infix("+", PREC_ADD, (PREC_ADD, PREC_ADD + 1), (args[1], args[2]), prec, out);
        }
        if let Some(args) = expr.app_of("Mul.mul", 3) {
            return self.write_infix("*", PREC_MUL, (PREC_MUL, PREC_MUL + 1), (args[1], args[2]), prec, out);
        }

        match expr {
            Expr::BVar(idx) => {
                let depth = self.binders.len();
                match depth.checked_sub(*idx as usize + 1) {
                    Some(pos) => out.push_str(&self.binders[pos]),
                    None => out.push_str(&format!("#{idx}")),
                }
            }
            Expr::FVar(id) => match self.fvar_names.and_then(|names| names.get(id)) {
                Some(name) => out.push_str(&name.to_string()),
                None => out.push_str(&format!("_fvar.{}", id.0)),
            },
            Expr::Sort(level) => write_sort(level, prec, out),
            Expr::Const(name, _) => out.push_str(&name.to_string()),
            Expr::Lit(Literal::Nat(n)) => out.push_str(&n.to_string()),
            Expr::Lit(Literal::String(s)) => out.push_str(&format!("{s:?}")),
            Expr::MData(_, inner) => self.write(inner, prec, out),
            Expr::App(f, a) => self.write_paren(PREC_APP, prec, out, |p, out| {
                p.write(f, PREC_APP, out);
                out.push(' ');
                p.write(a, PREC_ARG, out);
            }),
            Expr::Pi(_, ty, body) if !body.has_loose_bvar_in_range(0, 1) => {
                self.write_paren(PREC_ARROW, prec, out, |p, out| {
                    p.write(ty, PREC_ARROW + 1, out);
                    out.push_str(" → ");
                    // The codomain sits under a binder it does not use
                    p.binders.push(String::from("_"));
                    p.write(body, PREC_ARROW, out);
                    p.binders.pop();
                });
            }
            Expr::Pi(_, ty, body) => self.write_binder("∀", ", ", ty, body, prec, out),
            Expr::Lam(_, ty, body) => self.write_binder("fun", " => ", ty, body, prec, out),
            Expr::Let(ty, val, body) => self.write_paren(PREC_BINDER, prec, out, |p, out| {
                let name = p.fresh_binder();
                out.push_str(&format!("let {name} : "));
                p.write(ty, PREC_BINDER, out);
                out.push_str(" := ");
                p.write(val, PREC_BINDER, out);
                out.push_str("; ");
                p.binders.push(name);
                p.write(body, PREC_BINDER, out);
                p.binders.pop();
            }),
        }
    }

    fn write_binder(
        &mut self,
        keyword: &str,
        sep: &str,
        ty: &Expr,
        body: &Expr,
        prec: u32,
        out: &mut String,
    ) {
        self.write_paren(PREC_BINDER + 1, prec + 1, out, |p, out| {
            let name = p.fresh_binder();
            out.push_str(&format!("{keyword} ({name} : "));
            p.write(ty, PREC_BINDER, out);
            out.push(')');
            out.push_str(sep);
            p.binders.push(name);
            p.write(body, PREC_BINDER, out);
            p.binders.pop();
        });
    }
}

impl Default for Printer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

fn write_sort(level: &Level, prec: u32, out: &mut String) {
    let level = level.simplify();
    match level.to_nat() {
        Some(0) => out.push_str("Prop"),
        Some(1) => out.push_str("Type"),
        _ => {
            let text = match &level {
                Level::Succ(inner) => format!("Type {inner}"),
                other => format!("Sort {other}"),
            };
            if prec > PREC_APP {
                out.push_str(&format!("({text})"));
            } else {
                out.push_str(&text);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Printer::new().print(self))
    }
}
