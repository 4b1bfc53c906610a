use super::*;
use std::fs;

const PROBLEM: &str = r#"{
    "constants": [
        { "name": "g", "type": "Nat → Nat → Prop" },
        { "name": "x", "type": "Nat" },
        { "name": "f", "type": "Nat → Nat" }
    ],
    "hypotheses": [
        { "name": "h", "type": "x = f x" },
        { "name": "hg", "type": "g x x" }
    ],
    "goal": "g x (f x)"
}"#;

fn write_problem(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let path = dir.path().join("problem.json");
    fs::write(&path, contents).expect("write should succeed");
    (dir, path)
}

fn cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("nthrw").chain(args.iter().copied()))
        .expect("arguments should parse")
}

// ========== argument parsing ==========

#[test]
fn parse_rewrite_arguments() {
    let cli = cli(&[
        "rewrite", "p.json", "-n", "2", "-r", "h", "-r", "← h2", "--side", "rhs", "--at", "*",
        "--no-rfl",
    ]);
    match cli.command {
        Commands::Rewrite {
            target,
            index,
            no_rfl,
            max_depth,
        } => {
            assert_eq!(index, 2);
            assert!(no_rfl);
            assert_eq!(max_depth, None);
            assert_eq!(target.rules, vec!["h".to_string(), "← h2".to_string()]);
            assert_eq!(target.side, Some(Side::Rhs));
            assert_eq!(target.location, Location::Wildcard);
        }
        Commands::Occurrences { .. } => panic!("expected rewrite"),
    }
}

#[test]
fn parse_defaults_to_goal_and_first_occurrence() {
    let cli = cli(&["rewrite", "p.json", "-r", "h"]);
    let Commands::Rewrite { target, index, .. } = cli.command else {
        panic!("expected rewrite");
    };
    assert_eq!(index, 0);
    assert_eq!(target.location, Location::Goal);
    assert_eq!(target.side, None);
}

#[test]
fn parse_hypothesis_location() {
    let cli = cli(&["occurrences", "p.json", "-r", "h", "--at", "hg"]);
    let Commands::Occurrences { target } = cli.command else {
        panic!("expected occurrences");
    };
    assert_eq!(target.location, Location::Hyp("hg".into()));
}

#[test]
fn parse_rejects_missing_rule_and_bad_side() {
    assert!(Cli::try_parse_from(["nthrw", "rewrite", "p.json"]).is_err());
    assert!(Cli::try_parse_from(["nthrw", "rewrite", "p.json", "-r", "h", "--side", "up"]).is_err());
}

// ========== problem files ==========

#[test]
fn problem_builds_state() {
    let problem = Problem::from_json(PROBLEM).unwrap();
    assert_eq!(problem.hypotheses.len(), 2);
    let state = problem.to_state().unwrap();
    assert_eq!(state.to_string(), "h : x = f x\nhg : g x x\n⊢ g x (f x)");
}

#[test]
fn problem_with_unknown_identifier_fails() {
    let problem = Problem::from_json(r#"{ "goal": "g x x" }"#).unwrap();
    let err = problem.to_state().unwrap_err();
    assert!(format!("{err:#}").contains("in the goal"));
}

#[test]
fn problem_file_must_exist() {
    assert!(Problem::load(&PathBuf::from("/nonexistent/problem.json")).is_err());
}

// ========== commands ==========

#[test]
fn rewrite_goal_occurrence() {
    let (_dir, path) = write_problem(PROBLEM);
    let path = path.to_str().unwrap();
    let out = run(cli(&["rewrite", path, "-n", "0", "-r", "h"])).unwrap();
    assert!(out.starts_with("rewrote at: ⊢"), "{out}");
    assert!(out.ends_with("⊢ g (f x) (f x)"), "{out}");
}

#[test]
fn rewrite_hypothesis_as_json() {
    let (_dir, path) = write_problem(PROBLEM);
    let path = path.to_str().unwrap();
    let out = run(cli(&["rewrite", path, "-n", "1", "-r", "h", "--at", "hg", "--json"])).unwrap();
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json["rewritten"], serde_json::json!([{ "hyp": "hg" }]));
    assert_eq!(json["complete"], serde_json::json!(false));
    let goal = json["goals"][0].as_str().unwrap();
    assert!(goal.contains("hg : g x (f x)"), "{goal}");
}

#[test]
fn rewrite_wildcard_reports_skipped() {
    let (_dir, path) = write_problem(PROBLEM);
    let path = path.to_str().unwrap();
    let out = run(cli(&["rewrite", path, "-n", "1", "-r", "h", "--at", "*"])).unwrap();
    assert!(out.starts_with("rewrote at: hg, ⊢"), "{out}");
    assert!(out.contains("skipped h: used by a rewrite rule"), "{out}");
}

#[test]
fn rewrite_out_of_range_fails() {
    let (_dir, path) = write_problem(PROBLEM);
    let path = path.to_str().unwrap();
    let err = run(cli(&["rewrite", path, "-n", "7", "-r", "h"])).unwrap_err();
    assert!(format!("{err:#}").contains("occurrence 7 requested"), "{err:#}");
}

#[test]
fn list_goal_occurrences() {
    let (_dir, path) = write_problem(PROBLEM);
    let path = path.to_str().unwrap();
    let out = run(cli(&["occurrences", path, "-r", "h"])).unwrap();
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(
        lines,
        vec![
            "⊢ #0  rule 0  at fn/arg: x",
            "⊢ #1  rule 0  at arg/arg: x",
        ]
    );
}

#[test]
fn list_occurrences_as_json() {
    let (_dir, path) = write_problem(PROBLEM);
    let path = path.to_str().unwrap();
    let out = run(cli(&["occurrences", path, "-r", "← h", "--json"])).unwrap();
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["subterm"], serde_json::json!("f x"));
    assert_eq!(json[0]["location"], serde_json::json!("goal"));
}
