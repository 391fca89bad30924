use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transactions::DuplicateItems;

pub const DEFAULT_CONFIG_FILE: &str = "basketgraph.toml";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisConfig {
    pub ingest: IngestConfig,
    pub graph: GraphConfig,
    pub mining: MiningConfig,
    pub recommend: RecommendConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IngestConfig {
    pub delimiter: char,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GraphConfig {
    pub duplicate_items: DuplicateItems,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MiningConfig {
    pub min_support: f64,
    pub min_confidence: f64,
    pub max_k: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecommendConfig {
    pub limit: usize,
    pub basket_candidate_cap: usize,
    pub bundle_min_size: usize,
    pub bundle_max_size: usize,
    pub bundle_top_n: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub delimiter: Option<char>,
    pub duplicate_items: Option<DuplicateItems>,
    pub min_support: Option<f64>,
    pub min_confidence: Option<f64>,
    pub max_k: Option<usize>,
    pub limit: Option<usize>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } | Self::ParseFile { .. } => "config_file",
            Self::MissingConfigFile(_) => "config_missing",
            Self::MissingEnvInterpolation { .. } | Self::UnterminatedInterpolation => {
                "config_interpolation"
            }
            Self::InvalidEnvOverride { .. } => "config_env",
            Self::Validation(_) => "config_validation",
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            ingest: IngestConfig { delimiter: ',' },
            graph: GraphConfig { duplicate_items: DuplicateItems::Count },
            mining: MiningConfig { min_support: 0.01, min_confidence: 0.5, max_k: 3 },
            recommend: RecommendConfig {
                limit: 5,
                basket_candidate_cap: 20,
                bundle_min_size: 2,
                bundle_max_size: 3,
                bundle_top_n: 10,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AnalysisConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(ingest) = patch.ingest {
            if let Some(delimiter) = ingest.delimiter {
                self.ingest.delimiter = delimiter;
            }
        }

        if let Some(graph) = patch.graph {
            if let Some(duplicate_items) = graph.duplicate_items {
                self.graph.duplicate_items = duplicate_items;
            }
        }

        if let Some(mining) = patch.mining {
            if let Some(min_support) = mining.min_support {
                self.mining.min_support = min_support;
            }
            if let Some(min_confidence) = mining.min_confidence {
                self.mining.min_confidence = min_confidence;
            }
            if let Some(max_k) = mining.max_k {
                self.mining.max_k = max_k;
            }
        }

        if let Some(recommend) = patch.recommend {
            if let Some(limit) = recommend.limit {
                self.recommend.limit = limit;
            }
            if let Some(cap) = recommend.basket_candidate_cap {
                self.recommend.basket_candidate_cap = cap;
            }
            if let Some(min_size) = recommend.bundle_min_size {
                self.recommend.bundle_min_size = min_size;
            }
            if let Some(max_size) = recommend.bundle_max_size {
                self.recommend.bundle_max_size = max_size;
            }
            if let Some(top_n) = recommend.bundle_top_n {
                self.recommend.bundle_top_n = top_n;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BASKETGRAPH_INGEST_DELIMITER") {
            self.ingest.delimiter = parse_delimiter("BASKETGRAPH_INGEST_DELIMITER", &value)?;
        }

        if let Some(value) = read_env("BASKETGRAPH_GRAPH_DUPLICATE_ITEMS") {
            self.graph.duplicate_items = value.parse()?;
        }

        if let Some(value) = read_env("BASKETGRAPH_MINING_MIN_SUPPORT") {
            self.mining.min_support = parse_f64("BASKETGRAPH_MINING_MIN_SUPPORT", &value)?;
        }
        if let Some(value) = read_env("BASKETGRAPH_MINING_MIN_CONFIDENCE") {
            self.mining.min_confidence = parse_f64("BASKETGRAPH_MINING_MIN_CONFIDENCE", &value)?;
        }
        if let Some(value) = read_env("BASKETGRAPH_MINING_MAX_K") {
            self.mining.max_k = parse_usize("BASKETGRAPH_MINING_MAX_K", &value)?;
        }

        if let Some(value) = read_env("BASKETGRAPH_RECOMMEND_LIMIT") {
            self.recommend.limit = parse_usize("BASKETGRAPH_RECOMMEND_LIMIT", &value)?;
        }
        if let Some(value) = read_env("BASKETGRAPH_RECOMMEND_BASKET_CANDIDATE_CAP") {
            self.recommend.basket_candidate_cap =
                parse_usize("BASKETGRAPH_RECOMMEND_BASKET_CANDIDATE_CAP", &value)?;
        }
        if let Some(value) = read_env("BASKETGRAPH_RECOMMEND_BUNDLE_MIN_SIZE") {
            self.recommend.bundle_min_size =
                parse_usize("BASKETGRAPH_RECOMMEND_BUNDLE_MIN_SIZE", &value)?;
        }
        if let Some(value) = read_env("BASKETGRAPH_RECOMMEND_BUNDLE_MAX_SIZE") {
            self.recommend.bundle_max_size =
                parse_usize("BASKETGRAPH_RECOMMEND_BUNDLE_MAX_SIZE", &value)?;
        }
        if let Some(value) = read_env("BASKETGRAPH_RECOMMEND_BUNDLE_TOP_N") {
            self.recommend.bundle_top_n =
                parse_usize("BASKETGRAPH_RECOMMEND_BUNDLE_TOP_N", &value)?;
        }

        let log_level =
            read_env("BASKETGRAPH_LOGGING_LEVEL").or_else(|| read_env("BASKETGRAPH_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BASKETGRAPH_LOGGING_FORMAT").or_else(|| read_env("BASKETGRAPH_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(delimiter) = overrides.delimiter {
            self.ingest.delimiter = delimiter;
        }
        if let Some(duplicate_items) = overrides.duplicate_items {
            self.graph.duplicate_items = duplicate_items;
        }
        if let Some(min_support) = overrides.min_support {
            self.mining.min_support = min_support;
        }
        if let Some(min_confidence) = overrides.min_confidence {
            self.mining.min_confidence = min_confidence;
        }
        if let Some(max_k) = overrides.max_k {
            self.mining.max_k = max_k;
        }
        if let Some(limit) = overrides.limit {
            self.recommend.limit = limit;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_ingest(&self.ingest)?;
        validate_mining(&self.mining)?;
        validate_recommend(&self.recommend)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_ingest(ingest: &IngestConfig) -> Result<(), ConfigError> {
    if matches!(ingest.delimiter, '\n' | '\r') {
        return Err(ConfigError::Validation(
            "ingest.delimiter must not be a line break".to_string(),
        ));
    }
    Ok(())
}

fn validate_mining(mining: &MiningConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&mining.min_support) {
        return Err(ConfigError::Validation(
            "mining.min_support must be in range 0.0..=1.0".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&mining.min_confidence) {
        return Err(ConfigError::Validation(
            "mining.min_confidence must be in range 0.0..=1.0".to_string(),
        ));
    }
    if mining.max_k == 0 {
        return Err(ConfigError::Validation(
            "mining.max_k must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_recommend(recommend: &RecommendConfig) -> Result<(), ConfigError> {
    if recommend.limit == 0 {
        return Err(ConfigError::Validation(
            "recommend.limit must be greater than zero".to_string(),
        ));
    }
    if recommend.basket_candidate_cap == 0 {
        return Err(ConfigError::Validation(
            "recommend.basket_candidate_cap must be greater than zero".to_string(),
        ));
    }
    if recommend.bundle_min_size == 0 || recommend.bundle_max_size < 2 {
        return Err(ConfigError::Validation(
            "recommend.bundle_min_size must be at least 1 and bundle_max_size at least 2"
                .to_string(),
        ));
    }
    if recommend.bundle_min_size > recommend.bundle_max_size {
        return Err(ConfigError::Validation(
            "recommend.bundle_min_size must not exceed bundle_max_size".to_string(),
        ));
    }
    if recommend.bundle_top_n == 0 {
        return Err(ConfigError::Validation(
            "recommend.bundle_top_n must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f64(key: &str, value: &str) -> Result<f64, ConfigError> {
    value.trim().parse::<f64>().map_err(|_| invalid_override(key, value))
}

/// Accepts a single character, or `tab` for a tab-separated file.
pub fn parse_delimiter(key: &str, value: &str) -> Result<char, ConfigError> {
    if value.eq_ignore_ascii_case("tab") || value == "\\t" {
        return Ok('\t');
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(delimiter), None) => Ok(delimiter),
        _ => Err(invalid_override(key, value)),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    ingest: Option<IngestPatch>,
    graph: Option<GraphPatch>,
    mining: Option<MiningPatch>,
    recommend: Option<RecommendPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct IngestPatch {
    delimiter: Option<char>,
}

#[derive(Debug, Default, Deserialize)]
struct GraphPatch {
    duplicate_items: Option<DuplicateItems>,
}

#[derive(Debug, Default, Deserialize)]
struct MiningPatch {
    min_support: Option<f64>,
    min_confidence: Option<f64>,
    max_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RecommendPatch {
    limit: Option<usize>,
    basket_candidate_cap: Option<usize>,
    bundle_min_size: Option<usize>,
    bundle_max_size: Option<usize>,
    bundle_top_n: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
