use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use basketgraph_core::config::DEFAULT_CONFIG_FILE;
use basketgraph_core::{AnalysisConfig, ConfigOverrides};
use serde::Serialize;
use toml::Value;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigField {
    key: &'static str,
    value: String,
    source: String,
}

#[derive(Debug, Serialize)]
struct ConfigPayload {
    precedence: &'static str,
    config_file: Option<String>,
    fields: Vec<ConfigField>,
}

/// Effective configuration with the layer each value came from.
pub fn run(
    config: &AnalysisConfig,
    overrides: &ConfigOverrides,
    explicit_path: Option<&Path>,
) -> CommandResult {
    let config_file_path = detect_config_path(explicit_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key: &'static str, env_keys: &[&str]| {
        if is_overridden(overrides, key) {
            return "override".to_string();
        }
        field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let recommend = &config.recommend;
    let entries: [(&'static str, String, &[&str]); 12] = [
        (
            "ingest.delimiter",
            config.ingest.delimiter.escape_default().to_string(),
            &["BASKETGRAPH_INGEST_DELIMITER"],
        ),
        (
            "graph.duplicate_items",
            format!("{:?}", config.graph.duplicate_items).to_ascii_lowercase(),
            &["BASKETGRAPH_GRAPH_DUPLICATE_ITEMS"],
        ),
        (
            "mining.min_support",
            config.mining.min_support.to_string(),
            &["BASKETGRAPH_MINING_MIN_SUPPORT"],
        ),
        (
            "mining.min_confidence",
            config.mining.min_confidence.to_string(),
            &["BASKETGRAPH_MINING_MIN_CONFIDENCE"],
        ),
        ("mining.max_k", config.mining.max_k.to_string(), &["BASKETGRAPH_MINING_MAX_K"]),
        ("recommend.limit", recommend.limit.to_string(), &["BASKETGRAPH_RECOMMEND_LIMIT"]),
        (
            "recommend.basket_candidate_cap",
            recommend.basket_candidate_cap.to_string(),
            &["BASKETGRAPH_RECOMMEND_BASKET_CANDIDATE_CAP"],
        ),
        (
            "recommend.bundle_min_size",
            recommend.bundle_min_size.to_string(),
            &["BASKETGRAPH_RECOMMEND_BUNDLE_MIN_SIZE"],
        ),
        (
            "recommend.bundle_max_size",
            recommend.bundle_max_size.to_string(),
            &["BASKETGRAPH_RECOMMEND_BUNDLE_MAX_SIZE"],
        ),
        (
            "recommend.bundle_top_n",
            recommend.bundle_top_n.to_string(),
            &["BASKETGRAPH_RECOMMEND_BUNDLE_TOP_N"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["BASKETGRAPH_LOGGING_LEVEL", "BASKETGRAPH_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["BASKETGRAPH_LOGGING_FORMAT", "BASKETGRAPH_LOG_FORMAT"],
        ),
    ];

    let fields = entries
        .into_iter()
        .map(|(key, value, env_keys)| ConfigField { key, value, source: source(key, env_keys) })
        .collect();

    CommandResult::success(
        "config",
        ConfigPayload {
            precedence: "override > env > file > default",
            config_file: config_file_path.map(|path| path.display().to_string()),
            fields,
        },
    )
}

fn is_overridden(overrides: &ConfigOverrides, key_path: &str) -> bool {
    match key_path {
        "ingest.delimiter" => overrides.delimiter.is_some(),
        "graph.duplicate_items" => overrides.duplicate_items.is_some(),
        "mining.min_support" => overrides.min_support.is_some(),
        "mining.min_confidence" => overrides.min_confidence.is_some(),
        "mining.max_k" => overrides.max_k.is_some(),
        "recommend.limit" => overrides.limit.is_some(),
        "logging.level" => overrides.log_level.is_some(),
        "logging.format" => overrides.log_format.is_some(),
        _ => false,
    }
}

fn detect_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then(|| path.to_path_buf());
    }

    let root = PathBuf::from(DEFAULT_CONFIG_FILE);
    if root.exists() {
        return Some(root);
    }
    let nested = Path::new("config").join(DEFAULT_CONFIG_FILE);
    if nested.exists() {
        return Some(nested);
    }
    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env_is_set(key)) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            return format!("file ({})", display_path(config_file_path));
        }
    }

    "default".to_string()
}

fn env_is_set(key: &str) -> bool {
    env::var(key).ok().filter(|value| !value.trim().is_empty()).is_some()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn display_path(path: Option<&Path>) -> String {
    path.map(|path| path.display().to_string()).unwrap_or_else(|| "config file".to_string())
}
