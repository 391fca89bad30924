use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use anyhow::Result;
use basketgraph_cli::commands::CommandResult;
use basketgraph_cli::{execute, Cli};
use clap::Parser;
use serde_json::Value;
use tempfile::TempDir;

const MARKET_BASKETS: &str = "\
transaction_id,items
Bread,Milk,Eggs
Bread,Butter
Milk,Eggs
Bread,Milk,Butter
Bread,Eggs
";

#[test]
fn info_summarizes_the_built_graph() -> Result<()> {
    with_env(&[], || -> Result<()> {
        let (_dir, input) = write_input(MARKET_BASKETS)?;
        let result = run_cli(&["--input", path_str(&input), "info"])?;
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "info");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["data"]["num_nodes"], 4);
        assert_eq!(payload["data"]["num_edges"], 5);
        let summary = payload["data"]["summary"].as_str().unwrap_or_default();
        assert!(summary.starts_with("CoOccurrenceGraph(nodes=4, edges=5"));
        Ok(())
    })
}

#[test]
fn stats_skip_the_header_row() -> Result<()> {
    with_env(&[], || -> Result<()> {
        let (_dir, input) = write_input(MARKET_BASKETS)?;
        let result = run_cli(&["--input", path_str(&input), "stats"])?;

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["stats"]["total_transactions"], 5);
        assert_eq!(payload["data"]["stats"]["unique_items"], 4);
        assert_eq!(payload["data"]["stats"]["most_common_items"][0]["item"], "Bread");
        Ok(())
    })
}

#[test]
fn unknown_items_give_neutral_traversal_results() -> Result<()> {
    with_env(&[], || -> Result<()> {
        let (_dir, input) = write_input(MARKET_BASKETS)?;

        let result = run_cli(&["--input", path_str(&input), "path", "Bread", "Caviar"])?;
        let path = parse_payload(&result.output);
        assert_eq!(path["status"], "ok");
        assert_eq!(path["data"]["connected"], false);
        assert!(path["data"]["path"].is_null());

        let result = run_cli(&["--input", path_str(&input), "bfs", "Caviar"])?;
        let bfs = parse_payload(&result.output);
        assert_eq!(bfs["data"]["order"], Value::Array(Vec::new()));
        Ok(())
    })
}

#[test]
fn rules_respect_support_and_confidence_flags() -> Result<()> {
    with_env(&[], || -> Result<()> {
        let (_dir, input) = write_input(MARKET_BASKETS)?;
        let result = run_cli(&[
            "--input",
            path_str(&input),
            "rules",
            "--min-support",
            "0.4",
            "--min-confidence",
            "0.6",
        ])?;
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let rules = payload["data"]["rules"].as_array().cloned().unwrap_or_default();
        assert!(!rules.is_empty());
        assert_eq!(rules[0]["antecedent"], "Butter");
        assert_eq!(rules[0]["consequent"], "Bread");
        assert_eq!(rules[0]["confidence"], 1.0);
        Ok(())
    })
}

#[test]
fn out_of_range_parameters_are_analysis_failures() -> Result<()> {
    with_env(&[], || -> Result<()> {
        let (_dir, input) = write_input(MARKET_BASKETS)?;

        let rules = run_cli(&["--input", path_str(&input), "rules", "--min-confidence", "1.5"])?;
        assert_eq!(rules.exit_code, 4, "expected analysis failure code");
        let payload = parse_payload(&rules.output);
        assert_eq!(payload["command"], "rules");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_parameter");

        let bundles = run_cli(&["--input", path_str(&input), "bundles", "--min-size", "0"])?;
        assert_eq!(bundles.exit_code, 4);
        Ok(())
    })
}

#[test]
fn basket_recommendations_add_scores_across_items() -> Result<()> {
    with_env(&[], || -> Result<()> {
        let (_dir, input) = write_input(MARKET_BASKETS)?;
        let result = run_cli(&["--input", path_str(&input), "basket", "Bread", "Milk"])?;

        let payload = parse_payload(&result.output);
        let recommendations = &payload["data"]["recommendations"];
        assert_eq!(recommendations[0]["item"], "Eggs");
        assert_eq!(recommendations[0]["score"], 4);
        assert_eq!(recommendations[1]["item"], "Butter");
        assert_eq!(recommendations[1]["score"], 3);
        Ok(())
    })
}

#[test]
fn duplicate_policy_and_delimiter_flags_reach_the_graph() -> Result<()> {
    with_env(&[], || -> Result<()> {
        let (_dir, input) = write_input("Milk\tBread\tMilk\nBread\tMilk\n")?;
        let base = ["--input", path_str(&input), "--delimiter", "tab"];

        let counted = run_cli(&[&base[..], &["pairs", "--min-support", "0"][..]].concat())?;
        let counted = parse_payload(&counted.output);
        assert_eq!(counted["data"]["pairs"][0]["count"], 3);

        let collapsed = run_cli(
            &[&base[..], &["--duplicates", "collapse", "pairs", "--min-support", "0"][..]].concat(),
        )?;
        let collapsed = parse_payload(&collapsed.output);
        assert_eq!(collapsed["data"]["pairs"][0]["count"], 2);
        Ok(())
    })
}

#[test]
fn missing_input_is_an_input_failure() -> Result<()> {
    with_env(&[], || -> Result<()> {
        let result = run_cli(&["components"])?;
        assert_eq!(result.exit_code, 3, "expected input failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "components");
        assert_eq!(payload["error_class"], "input_missing");

        let dir = TempDir::new()?;
        let absent = dir.path().join("absent.csv");
        let result = run_cli(&["--input", path_str(&absent), "components"])?;
        assert_eq!(parse_payload(&result.output)["error_class"], "input_read");
        Ok(())
    })
}

#[test]
fn config_failures_use_the_config_exit_code() -> Result<()> {
    with_env(&[("BASKETGRAPH_MINING_MIN_SUPPORT", "2.0")], || -> Result<()> {
        let (_dir, input) = write_input(MARKET_BASKETS)?;
        let result = run_cli(&["--input", path_str(&input), "info"])?;
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "info");
        assert_eq!(payload["error_class"], "config_validation");
        Ok(())
    })?;

    with_env(&[], || -> Result<()> {
        let dir = TempDir::new()?;
        let missing = dir.path().join("basketgraph.toml");
        let result = run_cli(&["--config", path_str(&missing), "config"])?;
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_missing");
        Ok(())
    })
}

#[test]
fn config_reports_value_sources() -> Result<()> {
    with_env(&[("BASKETGRAPH_RECOMMEND_LIMIT", "7")], || -> Result<()> {
        let dir = TempDir::new()?;
        let config_path = dir.path().join("basketgraph.toml");
        fs::write(&config_path, "[mining]\nmax_k = 2\n")?;

        let result = run_cli(&["--config", path_str(&config_path), "config"])?;
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let fields = payload["data"]["fields"].as_array().cloned().unwrap_or_default();
        let field = |key: &str| {
            fields.iter().find(|field| field["key"] == key).cloned().unwrap_or(Value::Null)
        };

        assert_eq!(field("recommend.limit")["value"], "7");
        assert_eq!(field("recommend.limit")["source"], "env (BASKETGRAPH_RECOMMEND_LIMIT)");
        assert_eq!(field("mining.max_k")["value"], "2");
        assert!(field("mining.max_k")["source"].as_str().unwrap_or_default().starts_with("file"));
        assert_eq!(field("mining.min_support")["source"], "default");
        Ok(())
    })
}

#[test]
fn config_attributes_flag_values_to_overrides() -> Result<()> {
    with_env(&[("BASKETGRAPH_LOG_FORMAT", "  ")], || -> Result<()> {
        let result = run_cli(&["--log-level", "debug", "--delimiter", ";", "config"])?;
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let fields = payload["data"]["fields"].as_array().cloned().unwrap_or_default();
        let field = |key: &str| {
            fields.iter().find(|field| field["key"] == key).cloned().unwrap_or(Value::Null)
        };

        assert_eq!(field("logging.level")["value"], "debug");
        assert_eq!(field("logging.level")["source"], "override");
        assert_eq!(field("ingest.delimiter")["value"], ";");
        assert_eq!(field("ingest.delimiter")["source"], "override");
        // A blank variable is ignored when loading, so it is not the source either.
        assert_eq!(field("logging.format")["source"], "default");
        assert_eq!(field("graph.duplicate_items")["source"], "default");
        Ok(())
    })
}

fn run_cli(args: &[&str]) -> Result<CommandResult> {
    let cli = Cli::try_parse_from(std::iter::once("basketgraph").chain(args.iter().copied()))?;
    Ok(execute(cli))
}

fn write_input(contents: &str) -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let path = dir.path().join("baskets.csv");
    fs::write(&path, contents)?;
    Ok((dir, path))
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap_or_default()
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env<T>(vars: &[(&str, &str)], test_fn: impl FnOnce() -> T) -> T {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "BASKETGRAPH_INGEST_DELIMITER",
        "BASKETGRAPH_GRAPH_DUPLICATE_ITEMS",
        "BASKETGRAPH_MINING_MIN_SUPPORT",
        "BASKETGRAPH_MINING_MIN_CONFIDENCE",
        "BASKETGRAPH_MINING_MAX_K",
        "BASKETGRAPH_RECOMMEND_LIMIT",
        "BASKETGRAPH_RECOMMEND_BASKET_CANDIDATE_CAP",
        "BASKETGRAPH_RECOMMEND_BUNDLE_MIN_SIZE",
        "BASKETGRAPH_RECOMMEND_BUNDLE_MAX_SIZE",
        "BASKETGRAPH_RECOMMEND_BUNDLE_TOP_N",
        "BASKETGRAPH_LOGGING_LEVEL",
        "BASKETGRAPH_LOGGING_FORMAT",
        "BASKETGRAPH_LOG_LEVEL",
        "BASKETGRAPH_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    let outcome = test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
    outcome
}
