pub mod config;
pub mod graph;
pub mod mine;
pub mod recommend;

use std::path::Path;

use basketgraph_core::{AnalysisConfig, AnalysisError, CoOccurrenceGraph, GraphBuilder, Transaction};
use serde::Serialize;
use serde_json::Value;

use crate::ingest::{load_transactions, IngestError};

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_ANALYSIS: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, data: impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(error) => return Self::failure(command, "serialization", error.to_string(), 1),
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: None,
            data: Some(data),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: Some(message.into()),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_ingest_error(command: &str, error: &IngestError) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), EXIT_INPUT)
    }

    pub fn from_analysis_error(command: &str, error: &AnalysisError) -> Self {
        Self::failure(
            command,
            error.error_class(),
            format!("{} ({error})", error.user_message()),
            EXIT_ANALYSIS,
        )
    }
}

/// Transactions and the graph built from them, shared by every analysis command.
#[derive(Debug)]
pub struct Workspace {
    pub config: AnalysisConfig,
    pub transactions: Vec<Transaction>,
    pub graph: CoOccurrenceGraph,
}

impl Workspace {
    pub fn load(input: Option<&Path>, config: AnalysisConfig) -> Result<Self, IngestError> {
        let input = input.ok_or(IngestError::MissingInput)?;
        let transactions = load_transactions(input, config.ingest.delimiter)?;
        Ok(Self::from_transactions(transactions, config))
    }

    pub fn from_transactions(transactions: Vec<Transaction>, config: AnalysisConfig) -> Self {
        let graph =
            GraphBuilder::new().with_duplicates(config.graph.duplicate_items).build(&transactions);
        Self { config, transactions, graph }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
