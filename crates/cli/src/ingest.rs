use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use basketgraph_core::Transaction;
use thiserror::Error;
use tracing::info;

const HEADER_CELLS: [&str; 4] = ["transaction", "items", "basket", "transaction_id"];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("no input file given; pass --input <file>")]
    MissingInput,
    #[error("could not open input file `{path}`: {source}")]
    Open { path: PathBuf, source: std::io::Error },
    #[error("could not read line {line} of `{path}`: {source}")]
    Read { path: PathBuf, line: usize, source: std::io::Error },
}

impl IngestError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::MissingInput => "input_missing",
            Self::Open { .. } | Self::Read { .. } => "input_read",
        }
    }
}

/// Reads one transaction per non-empty line.
pub fn load_transactions(path: &Path, delimiter: char) -> Result<Vec<Transaction>, IngestError> {
    let file = File::open(path)
        .map_err(|source| IngestError::Open { path: path.to_path_buf(), source })?;
    let reader = BufReader::new(file);

    let mut transactions = Vec::new();
    let mut header_checked = false;
    for (number, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| IngestError::Read {
            path: path.to_path_buf(),
            line: number + 1,
            source,
        })?;
        let items = parse_line(&line, delimiter);
        if items.is_empty() {
            continue;
        }
        if !header_checked {
            header_checked = true;
            if is_header(&items[0]) {
                continue;
            }
        }
        transactions.push(items);
    }

    info!(
        event_name = "basket.ingest.loaded",
        path = %path.display(),
        transactions = transactions.len(),
        "transactions loaded"
    );
    Ok(transactions)
}

fn parse_line(line: &str, delimiter: char) -> Transaction {
    line.split(delimiter)
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_header(first_cell: &str) -> bool {
    HEADER_CELLS.iter().any(|header| first_cell.eq_ignore_ascii_case(header))
}
