//! Positions inside expressions
//!
//! A [`ConvPath`] records how to walk from the root of an expression to one
//! of its subterms. Paths look through `MData` wrappers without a step of
//! their own, so a path found on a term is valid on the same term with its
//! metadata stripped or kept.

use nthrw_kernel::Expr;
use serde::Serialize;
use std::fmt;

/// One step into an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConvPosition {
    /// Function in application (f x) - go to f
    AppFn,
    /// Argument in application (f x) - go to x
    AppArg,
    /// Type of lambda/forall (λ x : T, body / ∀ x : T, body)
    BinderType,
    /// Body of lambda/forall (λ x, body / ∀ x, body)
    BinderBody,
    /// Type in let binding (let x : T := v in body)
    LetType,
    /// Value in let binding (let x := v in body)
    LetValue,
    /// Body in let binding (let x := v in body)
    LetBody,
}

impl fmt::Display for ConvPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConvPosition::AppFn => "fn",
            ConvPosition::AppArg => "arg",
            ConvPosition::BinderType => "type",
            ConvPosition::BinderBody => "body",
            ConvPosition::LetType => "let-type",
            ConvPosition::LetValue => "let-value",
            ConvPosition::LetBody => "let-body",
        };
        f.write_str(s)
    }
}

/// A path through an expression tree
pub type ConvPath = Vec<ConvPosition>;

/// Render a path as `fn/arg/...`, `.` for the root
pub fn format_path(path: &[ConvPosition]) -> String {
    if path.is_empty() {
        return ".".to_string();
    }
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("/")
}

/// The subterm at `path`
pub fn subterm_at<'e>(expr: &'e Expr, path: &[ConvPosition]) -> Option<&'e Expr> {
    let Some((head, rest)) = path.split_first() else {
        return Some(expr.strip_mdata());
    };
    match (head, expr) {
        (_, Expr::MData(_, inner)) => subterm_at(inner, path),
        (ConvPosition::AppFn, Expr::App(f, _)) => subterm_at(f, rest),
        (ConvPosition::AppArg, Expr::App(_, a)) => subterm_at(a, rest),
        (ConvPosition::BinderType, Expr::Lam(_, ty, _) | Expr::Pi(_, ty, _))
        | (ConvPosition::LetType, Expr::Let(ty, _, _)) => subterm_at(ty, rest),
        (ConvPosition::BinderBody, Expr::Lam(_, _, body) | Expr::Pi(_, _, body))
        | (ConvPosition::LetBody, Expr::Let(_, _, body)) => subterm_at(body, rest),
        (ConvPosition::LetValue, Expr::Let(_, val, _)) => subterm_at(val, rest),
        _ => None,
    }
}

/// Replace the subterm at `path` by `replacement`.
///
/// `replacement` must not have loose bound variables; it is inserted as is
/// under whatever binders the path crosses.
pub fn replace_at_position(expr: &Expr, path: &[ConvPosition], replacement: &Expr) -> Option<Expr> {
    replace_at_depth(expr, path, 0, &|_| replacement.clone())
}

/// Abstract the subterm at `path`: the result is the body of a motive
/// `λ x, expr[path := x]`, with `x` as a loose `BVar` at the root.
pub fn abstract_at(expr: &Expr, path: &[ConvPosition]) -> Option<Expr> {
    replace_at_depth(&expr.lift(1), path, 0, &Expr::bvar)
}

fn replace_at_depth(
    expr: &Expr,
    path: &[ConvPosition],
    depth: u32,
    make: &dyn Fn(u32) -> Expr,
) -> Option<Expr> {
    stacker::maybe_grow(32 * 1024, 1024 * 1024, || {
        if let Expr::MData(meta, inner) = expr {
            let new_inner = replace_at_depth(inner, path, depth, make)?;
            return Some(Expr::mdata(meta.clone(), new_inner));
        }
        let Some((head, rest)) = path.split_first() else {
            return Some(make(depth));
        };
        match (head, expr) {
            (ConvPosition::AppFn, Expr::App(f, a)) => {
                let new_f = replace_at_depth(f, rest, depth, make)?;
                Some(Expr::app(new_f, (**a).clone()))
            }
            (ConvPosition::AppArg, Expr::App(f, a)) => {
                let new_a = replace_at_depth(a, rest, depth, make)?;
                Some(Expr::app((**f).clone(), new_a))
            }
            (ConvPosition::BinderType, Expr::Lam(bi, ty, body)) => {
                let new_ty = replace_at_depth(ty, rest, depth, make)?;
                Some(Expr::lam(*bi, new_ty, (**body).clone()))
            }
            (ConvPosition::BinderType, Expr::Pi(bi, ty, body)) => {
                let new_ty = replace_at_depth(ty, rest, depth, make)?;
                Some(Expr::pi(*bi, new_ty, (**body).clone()))
            }
            (ConvPosition::BinderBody, Expr::Lam(bi, ty, body)) => {
                let new_body = replace_at_depth(body, rest, depth + 1, make)?;
                Some(Expr::lam(*bi, (**ty).clone(), new_body))
            }
            (ConvPosition::BinderBody, Expr::Pi(bi, ty, body)) => {
                let new_body = replace_at_depth(body, rest, depth + 1, make)?;
                Some(Expr::pi(*bi, (**ty).clone(), new_body))
            }
            (ConvPosition::LetType, Expr::Let(ty, val, body)) => {
                let new_ty = replace_at_depth(ty, rest, depth, make)?;
                Some(Expr::let_(new_ty, (**val).clone(), (**body).clone()))
            }
            (ConvPosition::LetValue, Expr::Let(ty, val, body)) => {
                let new_val = replace_at_depth(val, rest, depth, make)?;
                Some(Expr::let_((**ty).clone(), new_val, (**body).clone()))
            }
            (ConvPosition::LetBody, Expr::Let(ty, val, body)) => {
                let new_body = replace_at_depth(body, rest, depth + 1, make)?;
                Some(Expr::let_((**ty).clone(), (**val).clone(), new_body))
            }
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nthrw_kernel::{BinderInfo, Name};

    fn c(name: &str) -> Expr {
        Expr::const_(Name::from_string(name), vec![])
    }

    #[test]
    fn test_subterm_and_replace() {
        // g x x
        let e = Expr::mk_app(c("g"), [c("x"), c("x")]);
        let first = vec![ConvPosition::AppFn, ConvPosition::AppArg];
        let second = vec![ConvPosition::AppArg];
        assert_eq!(subterm_at(&e, &first), Some(&c("x")));

        let fx = Expr::app(c("f"), c("x"));
        assert_eq!(
            replace_at_position(&e, &first, &fx).unwrap(),
            Expr::mk_app(c("g"), [fx.clone(), c("x")])
        );
        assert_eq!(
            replace_at_position(&e, &second, &fx).unwrap(),
            Expr::mk_app(c("g"), [c("x"), fx])
        );
    }

    #[test]
    fn test_invalid_path() {
        assert!(subterm_at(&c("a"), &[ConvPosition::AppFn]).is_none());
        assert!(replace_at_position(&c("a"), &[ConvPosition::BinderBody], &c("b")).is_none());
    }

    #[test]
    fn test_abstract_under_binder() {
        // fun (y : A) => f a
        let e = Expr::lam(BinderInfo::Default, c("A"), Expr::app(c("f"), c("a")));
        let path = vec![ConvPosition::BinderBody, ConvPosition::AppArg];
        let body = abstract_at(&e, &path).unwrap();
        // The motive variable is one binder further out than `y`
        assert_eq!(
            body,
            Expr::lam(BinderInfo::Default, c("A"), Expr::app(c("f"), Expr::bvar(1)))
        );
        assert_eq!(body.instantiate(&c("b")), Expr::lam(BinderInfo::Default, c("A"), Expr::app(c("f"), c("b"))));
    }

    #[test]
    fn test_paths_look_through_mdata() {
        let e = Expr::app(c("f"), Expr::mdata(vec![], c("a")));
        assert_eq!(subterm_at(&e, &[ConvPosition::AppArg]), Some(&c("a")));
        let out = replace_at_position(&e, &[ConvPosition::AppArg], &c("b")).unwrap();
        assert_eq!(out, Expr::app(c("f"), Expr::mdata(vec![], c("b"))));
    }

    #[test]
    fn test_format_path() {
        assert_eq!(format_path(&[]), ".");
        assert_eq!(
            format_path(&[ConvPosition::AppFn, ConvPosition::AppArg]),
            "fn/arg"
        );
    }
}
