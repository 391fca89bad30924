use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// One purchase event: the items in the basket, in the order they were recorded.
pub type Transaction = Vec<String>;

/// How repeated items inside a single transaction are counted.
///
/// `Count` keeps every occurrence, so a basket listing `Milk` twice counts the
/// `(Bread, Milk)` pair twice. `Collapse` keeps only the first occurrence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateItems {
    #[default]
    Count,
    Collapse,
}

impl std::str::FromStr for DuplicateItems {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(Self::Count),
            "collapse" => Ok(Self::Collapse),
            other => Err(ConfigError::Validation(format!(
                "unsupported duplicate item policy `{other}` (expected count|collapse)"
            ))),
        }
    }
}

impl DuplicateItems {
    pub(crate) fn apply<'t>(self, transaction: &'t [String]) -> Vec<&'t str> {
        match self {
            Self::Count => transaction.iter().map(String::as_str).collect(),
            Self::Collapse => {
                let mut seen = HashSet::with_capacity(transaction.len());
                transaction
                    .iter()
                    .map(String::as_str)
                    .filter(|item| seen.insert(*item))
                    .collect()
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCount {
    pub item: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub total_transactions: usize,
    pub unique_items: usize,
    pub avg_transaction_size: f64,
    pub min_transaction_size: usize,
    pub max_transaction_size: usize,
    pub most_common_items: Vec<ItemCount>,
}

pub const MOST_COMMON_ITEMS: usize = 10;

/// Read-only view over a transaction list.
#[derive(Clone, Copy, Debug)]
pub struct TransactionSet<'t> {
    transactions: &'t [Transaction],
}

impl<'t> TransactionSet<'t> {
    pub fn new(transactions: &'t [Transaction]) -> Self {
        Self { transactions }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn as_slice(&self) -> &'t [Transaction] {
        self.transactions
    }

    /// Summary statistics, or `None` when there is nothing to summarize.
    ///
    /// Item counts are per occurrence; most common items are ordered by count and
    /// then by first appearance.
    pub fn stats(&self) -> Option<TransactionStats> {
        if self.transactions.is_empty() {
            return None;
        }

        let mut first_seen: HashMap<&str, usize> = HashMap::new();
        let mut counts: Vec<ItemCount> = Vec::new();
        for item in self.transactions.iter().flatten() {
            match first_seen.get(item.as_str()) {
                Some(&slot) => counts[slot].count += 1,
                None => {
                    first_seen.insert(item, counts.len());
                    counts.push(ItemCount { item: item.clone(), count: 1 });
                }
            }
        }
        let unique_items = counts.len();
        counts.sort_by(|left, right| right.count.cmp(&left.count));
        counts.truncate(MOST_COMMON_ITEMS);

        let sizes = self.transactions.iter().map(Vec::len);
        let total_size: usize = sizes.clone().sum();

        Some(TransactionStats {
            total_transactions: self.transactions.len(),
            unique_items,
            avg_transaction_size: total_size as f64 / self.transactions.len() as f64,
            min_transaction_size: sizes.clone().min().unwrap_or(0),
            max_transaction_size: sizes.max().unwrap_or(0),
            most_common_items: counts,
        })
    }

    pub fn containing(&self, item: &str) -> Vec<&'t Transaction> {
        let matches = self
            .transactions
            .iter()
            .filter(|transaction| transaction.iter().any(|candidate| candidate == item))
            .collect::<Vec<_>>();
        tracing::debug!(
            event_name = "basket.transactions.filtered",
            item,
            matches = matches.len(),
            "filtered transactions by item"
        );
        matches
    }
}
