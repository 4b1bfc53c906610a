//! `nth_rewrite`: rewrite one chosen occurrence
//!
//! Every rule is matched against the target (or one side of it), the
//! matches are concatenated in rule order, and only the occurrence at the
//! requested zero-based index is rewritten. The rewrite is justified by
//! `congrArg` over a motive that abstracts exactly that occurrence, so other
//! occurrences of the same pattern are left alone.
//!
//! ```text
//! h : x = f x
//! ⊢ g x x
//!
//! nth_rewrite 0 [h]   ⊢ g (f x) x
//! nth_rewrite 1 [h]   ⊢ g x (f x)
//! ```
//!
//! With a location of `*` the rewrite is attempted at every hypothesis and
//! then at the goal; locations where it does not apply are skipped.

use super::conv::{abstract_at, format_path, ConvPath};
use super::equality::{match_relation, RelationView};
use super::matcher::{Match, Matcher, StructuralMatcher};
use super::proof::{KernelProofBuilder, ProofBuilder, ProofError, RelProof};
use super::rule::{elaborate_rules, RewriteRule, RuleSpec};
use super::store::{GoalStore, Location, Site};
use super::{rfl_reducible, ProofState};
use nthrw_kernel::{BinderInfo, Environment, Expr, Level, TypeChecker};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, trace};

/// Side of an equation or equivalence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Lhs,
    Rhs,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Lhs => write!(f, "lhs"),
            Side::Rhs => write!(f, "rhs"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lhs" | "left" => Ok(Side::Lhs),
            "rhs" | "right" => Ok(Side::Rhs),
            other => Err(format!("expected `lhs` or `rhs`, got `{other}`")),
        }
    }
}

/// Errors from `nth_rewrite`
#[derive(Debug, Clone, Error)]
pub enum RewriteError {
    /// A rule failed to parse, resolve, or state an equation
    #[error("cannot use rule `{rule}`: {message}")]
    Elaboration { rule: String, message: String },

    /// A side was requested but the target is not a relation
    #[error("cannot select the {side} side of {target}: not an equation or equivalence")]
    NotARelation { side: Side, target: String },

    /// Fewer occurrences than requested
    #[error("occurrence {requested} requested, but the rules only match {found} time(s)")]
    NoMatch { requested: usize, found: usize },

    /// The selected match could not be turned into a proof
    #[error("cannot rewrite occurrence {index}: {source}")]
    Evaluation {
        index: usize,
        #[source]
        source: ProofError,
    },

    /// The rewrite could not be lifted through the relation
    #[error("cannot lift the rewrite through the {side} side: {source}")]
    CongruenceConstruction {
        side: Side,
        #[source]
        source: ProofError,
    },

    /// The store refused the new statement
    #[error("cannot replace statement: {0}")]
    Replacement(String),

    /// A wildcard rewrite applied nowhere
    #[error("nothing to rewrite: no hypothesis and not the goal")]
    NothingRewritten,

    /// No hypothesis of the main goal has this name
    #[error("hypothesis not found: {0}")]
    HypothesisNotFound(String),

    /// The proof state has no goal to rewrite in
    #[error("no goals")]
    NoGoals,

    /// Error at a particular location
    #[error("at {location}: {source}")]
    AtLocation {
        location: Location,
        #[source]
        source: Box<RewriteError>,
    },
}

impl RewriteError {
    /// The error with location context removed
    pub fn innermost(&self) -> &RewriteError {
        match self {
            RewriteError::AtLocation { source, .. } => source.innermost(),
            other => other,
        }
    }

    /// Whether the rewrite simply did not apply, as opposed to failing
    pub fn is_no_match(&self) -> bool {
        matches!(
            self.innermost(),
            RewriteError::NoMatch { .. } | RewriteError::NotARelation { .. }
        )
    }

    fn at(self, location: &Location) -> RewriteError {
        RewriteError::AtLocation {
            location: location.clone(),
            source: Box::new(self),
        }
    }
}

/// Options for [`nth_rewrite_with_config`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NthRewriteConfig {
    /// Try to close the goal by reflexivity afterwards
    pub try_rfl: bool,
    /// Maximum depth below the root at which occurrences are looked for
    pub max_depth: Option<usize>,
}

impl Default for NthRewriteConfig {
    fn default() -> Self {
        NthRewriteConfig {
            try_rfl: true,
            max_depth: None,
        }
    }
}

impl NthRewriteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_try_rfl(mut self, try_rfl: bool) -> Self {
        self.try_rfl = try_rfl;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// A location that a wildcard rewrite passed over
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLocation {
    pub location: Location,
    pub reason: String,
}

/// Where a rewrite happened
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteOutcome {
    pub rewritten: Vec<Location>,
    pub skipped: Vec<SkippedLocation>,
}

/// One occurrence, as reported by [`occurrences`]
#[derive(Debug, Clone)]
pub struct Occurrence {
    pub location: Location,
    /// Index to pass to `nth_rewrite` to rewrite this occurrence
    pub index: usize,
    /// Position of the rule in the rule list
    pub rule: usize,
    /// Position in the searched expression
    pub path: ConvPath,
    pub subterm: Expr,
}

/// The expression searched at one location, and how to get back from a
/// rewrite of it to a rewrite of the whole statement
#[derive(Debug, Clone)]
pub struct SearchScope {
    pub host: Expr,
    /// Type of `host`
    pub host_ty: Expr,
    /// Universe argument of `Eq` over `host_ty`
    pub host_level: Level,
    relation: Option<(Side, RelationView)>,
}

/// Restrict the search to one side of `target`, or to all of it
///
/// # Errors
///
/// [`RewriteError::NotARelation`] if a side is requested and `target` is
/// neither an equation nor an equivalence.
pub fn select_side(target: &Expr, side: Option<Side>) -> Result<SearchScope, RewriteError> {
    let Some(side) = side else {
        return Ok(SearchScope {
            host: target.clone(),
            host_ty: Expr::prop(),
            host_level: Level::one(),
            relation: None,
        });
    };
    let view = match_relation(target).ok_or_else(|| RewriteError::NotARelation {
        side,
        target: target.to_string(),
    })?;
    let host = match side {
        Side::Lhs => view.lhs.clone(),
        Side::Rhs => view.rhs.clone(),
    };
    Ok(SearchScope {
        host,
        host_ty: view.carrier.clone(),
        host_level: view.level.clone(),
        relation: Some((side, view)),
    })
}

/// A match whose proof has not been built yet
#[derive(Debug, Clone)]
pub struct TrackedRewrite<'a> {
    pub rule: &'a RewriteRule,
    pub found: Match,
    scope: &'a SearchScope,
}

impl<'a> TrackedRewrite<'a> {
    pub fn new(rule: &'a RewriteRule, scope: &'a SearchScope, found: Match) -> Self {
        TrackedRewrite { rule, found, scope }
    }

    /// Prove `host = host[path := replacement]`
    pub fn eval(&self, env: &Environment, builder: &dyn ProofBuilder) -> Result<RelProof, ProofError> {
        let local = builder.rule_proof(env, self.rule, &self.found.subst)?;
        if self.found.path.is_empty() {
            return Ok(local);
        }
        let body = abstract_at(&self.scope.host, &self.found.path).ok_or_else(|| {
            ProofError::NotAMotive(format!(
                "no subterm at {} of {}",
                format_path(&self.found.path),
                self.scope.host
            ))
        })?;
        let motive = Expr::lam(BinderInfo::Default, local.carrier.clone(), body);
        builder.congruence(
            env,
            &motive,
            (&self.scope.host_ty, &self.scope.host_level),
            &local,
        )
    }
}

/// The rewriting procedure over arbitrary collaborators
pub struct NthRewriter<'a> {
    matcher: &'a dyn Matcher,
    builder: &'a dyn ProofBuilder,
}

impl<'a> NthRewriter<'a> {
    pub fn new(matcher: &'a dyn Matcher, builder: &'a dyn ProofBuilder) -> Self {
        NthRewriter { matcher, builder }
    }

    /// All matches of all rules in `host`, tagged with the rule index
    pub fn find_all(
        &self,
        rules: &[RewriteRule],
        host: &Expr,
        tc: &TypeChecker<'_>,
    ) -> Vec<(usize, Match)> {
        rules
            .iter()
            .enumerate()
            .flat_map(|(i, rule)| {
                self.matcher
                    .find_matches(rule, host, tc)
                    .into_iter()
                    .map(move |m| (i, m))
            })
            .collect()
    }

    /// Rewrite occurrence `index` at `location`.
    ///
    /// # Errors
    ///
    /// At a single location any failure is returned, wrapped in
    /// [`RewriteError::AtLocation`], and the store is unchanged. At
    /// [`Location::Wildcard`], failing hypotheses are skipped; the call fails
    /// if the goal fails for a reason other than not matching, or if nothing
    /// was rewritten.
    pub fn rewrite<S: GoalStore + ?Sized>(
        &self,
        store: &mut S,
        side: Option<Side>,
        index: usize,
        rules: &[RewriteRule],
        location: &Location,
    ) -> Result<RewriteOutcome, RewriteError> {
        if *location != Location::Wildcard {
            let site = store.resolve(location).map_err(|e| e.at(location))?;
            self.rewrite_at(store, side, index, rules, site, location)
                .map_err(|e| e.at(location))?;
            return Ok(RewriteOutcome {
                rewritten: vec![location.clone()],
                skipped: Vec::new(),
            });
        }

        let mut outcome = RewriteOutcome::default();
        for (name, fvar) in store.hypotheses() {
            let loc = Location::Hyp(name);
            if rules.iter().any(|r| r.proof.has_fvar(fvar)) {
                trace!(location = %loc, "skipping hypothesis used by a rule");
                outcome.skipped.push(SkippedLocation {
                    location: loc,
                    reason: "used by a rewrite rule".to_string(),
                });
                continue;
            }
            match self.rewrite_at(store, side, index, rules, Site::Hyp(fvar), &loc) {
                Ok(()) => outcome.rewritten.push(loc),
                Err(e) => {
                    trace!(location = %loc, error = %e, "skipping hypothesis");
                    outcome.skipped.push(SkippedLocation {
                        location: loc,
                        reason: e.to_string(),
                    });
                }
            }
        }

        match self.rewrite_at(store, side, index, rules, Site::Goal, &Location::Goal) {
            Ok(()) => outcome.rewritten.push(Location::Goal),
            Err(e) if e.is_no_match() => {
                trace!(error = %e, "skipping goal");
                outcome.skipped.push(SkippedLocation {
                    location: Location::Goal,
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e.at(&Location::Goal)),
        }

        if outcome.rewritten.is_empty() {
            return Err(RewriteError::NothingRewritten);
        }
        Ok(outcome)
    }

    fn rewrite_at<S: GoalStore + ?Sized>(
        &self,
        store: &mut S,
        side: Option<Side>,
        index: usize,
        rules: &[RewriteRule],
        site: Site,
        location: &Location,
    ) -> Result<(), RewriteError> {
        let target = store.get_target(site)?;
        let scope = select_side(&target, side)?;

        let found = {
            let tc = store.type_checker()?;
            self.find_all(rules, &scope.host, &tc)
        };
        let total = found.len();
        let Some((rule_idx, selected)) = found.into_iter().nth(index) else {
            return Err(RewriteError::NoMatch {
                requested: index,
                found: total,
            });
        };
        let rule = &rules[rule_idx];
        debug!(
            %location,
            index,
            total,
            rule = %rule.source,
            path = %format_path(&selected.path),
            "selected occurrence"
        );

        let tracked = TrackedRewrite::new(rule, &scope, selected);
        let local = tracked
            .eval(store.env(), self.builder)
            .map_err(|source| RewriteError::Evaluation { index, source })?;

        let whole = match &scope.relation {
            None => local,
            Some((side, view)) => self
                .lift_through(store.env(), *side, view, &local)
                .map_err(|source| RewriteError::CongruenceConstruction { side: *side, source })?,
        };

        store.replace(site, &whole, self.builder)
    }

    /// `(R lhs rhs) = (R lhs' rhs)` from `lhs = lhs'`, or the same on the
    /// right
    fn lift_through(
        &self,
        env: &Environment,
        side: Side,
        view: &RelationView,
        local: &RelProof,
    ) -> Result<RelProof, ProofError> {
        let body = match side {
            Side::Lhs => view.rebuild(Expr::bvar(0), view.rhs.clone()),
            Side::Rhs => view.rebuild(view.lhs.clone(), Expr::bvar(0)),
        };
        let motive = Expr::lam(BinderInfo::Default, view.carrier.clone(), body);
        self.builder
            .congruence(env, &motive, (&Expr::prop(), &Level::one()), local)
    }
}

/// Rewrite occurrence `index` of `rules` at `location`, then try `rfl`.
///
/// # Errors
///
/// See [`NthRewriter::rewrite`]; rule elaboration errors are reported as
/// [`RewriteError::Elaboration`].
pub fn nth_rewrite(
    state: &mut ProofState,
    side: Option<Side>,
    index: usize,
    rules: &[RuleSpec],
    location: &Location,
) -> Result<RewriteOutcome, RewriteError> {
    nth_rewrite_with_config(state, side, index, rules, location, &NthRewriteConfig::default())
}

/// [`nth_rewrite`] with explicit options
pub fn nth_rewrite_with_config(
    state: &mut ProofState,
    side: Option<Side>,
    index: usize,
    rules: &[RuleSpec],
    location: &Location,
    config: &NthRewriteConfig,
) -> Result<RewriteOutcome, RewriteError> {
    let goal = state.current_goal().ok_or(RewriteError::NoGoals)?.clone();
    let rules = elaborate_rules(state, &goal, rules)?;

    info!(index, side = ?side, %location, rules = rules.len(), "nth_rewrite");

    let matcher = StructuralMatcher::new().with_max_depth(config.max_depth);
    let builder = KernelProofBuilder::new();
    let outcome = NthRewriter::new(&matcher, &builder).rewrite(state, side, index, &rules, location)?;

    if config.try_rfl && rfl_reducible(state).is_ok() {
        debug!("goal closed by rfl");
    }
    Ok(outcome)
}

/// List the occurrences `nth_rewrite` would index, per location
///
/// # Errors
///
/// Rule elaboration errors, an unknown hypothesis, or a side requested on a
/// statement that is not a relation (except under the wildcard, where such
/// locations are left out).
pub fn occurrences(
    state: &ProofState,
    side: Option<Side>,
    rules: &[RuleSpec],
    location: &Location,
) -> Result<Vec<Occurrence>, RewriteError> {
    let goal = state.current_goal().ok_or(RewriteError::NoGoals)?;
    let rules = elaborate_rules(state, goal, rules)?;
    let matcher = StructuralMatcher::new();
    let builder = KernelProofBuilder::new();
    let rewriter = NthRewriter::new(&matcher, &builder);

    let sites: Vec<(Location, Site)> = match location {
        Location::Wildcard => state
            .hypotheses()
            .into_iter()
            .filter(|(_, fvar)| !rules.iter().any(|r| r.proof.has_fvar(*fvar)))
            .map(|(name, fvar)| (Location::Hyp(name), Site::Hyp(fvar)))
            .chain(std::iter::once((Location::Goal, Site::Goal)))
            .collect(),
        single => vec![(single.clone(), state.resolve(single).map_err(|e| e.at(single))?)],
    };

    let tc = state.type_checker()?;
    let mut out = Vec::new();
    for (loc, site) in sites {
        let target = state.get_target(site).map_err(|e| e.at(&loc))?;
        let scope = match select_side(&target, side) {
            Ok(scope) => scope,
            Err(_) if *location == Location::Wildcard => continue,
            Err(e) => return Err(e.at(&loc)),
        };
        out.extend(
            rewriter
                .find_all(&rules, &scope.host, &tc)
                .into_iter()
                .enumerate()
                .map(|(index, (rule, m))| Occurrence {
                    location: loc.clone(),
                    index,
                    rule,
                    path: m.path,
                    subterm: m.subterm,
                }),
        );
    }
    Ok(out)
}
