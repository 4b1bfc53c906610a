//! nthrw CLI
//!
//! Command-line driver for the `nth_rewrite` tactic.
//!
//! # Commands
//!
//! - `nthrw rewrite <problem.json> -n <index> -r <rule>...` - Rewrite one occurrence
//! - `nthrw occurrences <problem.json> -r <rule>...` - List the occurrences the index counts
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

mod problem;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use nthrw_elab::tactic::conv::format_path;
use nthrw_elab::{
    nth_rewrite_with_config, occurrences, Location, NthRewriteConfig, ProofState, RuleSpec, Side,
};
use problem::Problem;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nthrw")]
#[command(about = "Rewrite the n-th occurrence of an equation in a goal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite one occurrence and print the new proof state
    Rewrite {
        #[command(flatten)]
        target: TargetArgs,
        /// Zero-based occurrence index, counted across all rules
        #[arg(short = 'n', long, default_value = "0")]
        index: usize,
        /// Do not try to close the goal by reflexivity afterwards
        #[arg(long)]
        no_rfl: bool,
        /// Do not look for occurrences deeper than this
        #[arg(long)]
        max_depth: Option<usize>,
    },
    /// List the occurrences `rewrite` would count
    Occurrences {
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// What to rewrite, and where
#[derive(Args, Debug, Clone)]
struct TargetArgs {
    /// Problem file (JSON)
    file: PathBuf,
    /// Rewrite rule, e.g. `h` or `← h`; repeat for several rules
    #[arg(short = 'r', long = "rule", required = true)]
    rules: Vec<String>,
    /// Only look at one side of the equation (`lhs` or `rhs`)
    #[arg(long)]
    side: Option<Side>,
    /// `goal`, a hypothesis name, or `*` for every hypothesis and the goal
    #[arg(long = "at", default_value = "goal", value_parser = parse_location)]
    location: Location,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

fn parse_location(s: &str) -> Result<Location, String> {
    match s {
        "" => Err("empty location".to_string()),
        "goal" | "⊢" => Ok(Location::Goal),
        "*" => Ok(Location::Wildcard),
        name => Ok(Location::Hyp(name.to_string())),
    }
}

impl TargetArgs {
    fn load(&self) -> anyhow::Result<ProofState> {
        Problem::load(&self.file)?.to_state()
    }

    fn rule_specs(&self) -> Vec<RuleSpec> {
        self.rules.iter().map(RuleSpec::parse).collect()
    }
}

#[derive(Serialize)]
struct RewriteReport {
    rewritten: Vec<Location>,
    skipped: Vec<nthrw_elab::tactic::SkippedLocation>,
    goals: Vec<String>,
    complete: bool,
}

#[derive(Serialize)]
struct OccurrenceReport {
    location: Location,
    index: usize,
    rule: usize,
    path: String,
    subterm: String,
}

fn rewrite_file(
    target: &TargetArgs,
    index: usize,
    config: &NthRewriteConfig,
) -> anyhow::Result<String> {
    let mut state = target.load()?;
    info!(file = %target.file.display(), index, "rewriting");
    let outcome = nth_rewrite_with_config(
        &mut state,
        target.side,
        index,
        &target.rule_specs(),
        &target.location,
        config,
    )
    .context("nth_rewrite failed")?;

    if target.json {
        let report = RewriteReport {
            rewritten: outcome.rewritten,
            skipped: outcome.skipped,
            goals: state.goals().iter().map(ToString::to_string).collect(),
            complete: state.is_complete(),
        };
        return Ok(serde_json::to_string_pretty(&report)?);
    }

    let mut out = String::new();
    let rewritten: Vec<_> = outcome.rewritten.iter().map(ToString::to_string).collect();
    writeln!(out, "rewrote at: {}", rewritten.join(", "))?;
    for skipped in &outcome.skipped {
        writeln!(out, "skipped {}: {}", skipped.location, skipped.reason)?;
    }
    writeln!(out)?;
    write!(out, "{state}")?;
    Ok(out)
}

fn list_occurrences(target: &TargetArgs) -> anyhow::Result<String> {
    let state = target.load()?;
    let found = occurrences(&state, target.side, &target.rule_specs(), &target.location)
        .context("cannot list occurrences")?;
    let goal = state
        .current_goal()
        .context("the problem has no goal")?;

    let reports: Vec<_> = found
        .into_iter()
        .map(|o| OccurrenceReport {
            subterm: goal.pretty(&o.subterm),
            path: format_path(&o.path),
            location: o.location,
            index: o.index,
            rule: o.rule,
        })
        .collect();

    if target.json {
        return Ok(serde_json::to_string_pretty(&reports)?);
    }
    let mut out = String::new();
    for r in &reports {
        writeln!(
            out,
            "{} #{}  rule {}  at {}: {}",
            r.location, r.index, r.rule, r.path, r.subterm
        )?;
    }
    if reports.is_empty() {
        writeln!(out, "no occurrences")?;
    }
    Ok(out)
}

fn run(cli: Cli) -> anyhow::Result<String> {
    match cli.command {
        Commands::Rewrite {
            target,
            index,
            no_rfl,
            max_depth,
        } => {
            let config = NthRewriteConfig::new()
                .with_try_rfl(!no_rfl)
                .with_max_depth(max_depth);
            rewrite_file(&target, index, &config)
        }
        Commands::Occurrences { target } => list_occurrences(&target),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = run(cli)?;
    println!("{}", output.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests;
