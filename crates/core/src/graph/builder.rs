use tracing::info;

use super::CoOccurrenceGraph;
use crate::transactions::{DuplicateItems, Transaction};

/// Builds a [`CoOccurrenceGraph`] from transactions.
///
/// Every item becomes a node, including items that were only ever bought alone.
/// Each pair of positions `i < j` in a transaction holding different items adds
/// one to their edge; the same item listed twice never forms a self-loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct GraphBuilder {
    duplicates: DuplicateItems,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duplicates(mut self, duplicates: DuplicateItems) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn build(&self, transactions: &[Transaction]) -> CoOccurrenceGraph {
        let mut graph = CoOccurrenceGraph::new();
        for transaction in transactions {
            self.add_transaction(&mut graph, transaction);
        }

        info!(
            event_name = "basket.graph.built",
            transactions = transactions.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "co-occurrence graph built"
        );
        graph
    }

    pub fn add_transaction(&self, graph: &mut CoOccurrenceGraph, transaction: &[String]) {
        let items = self.duplicates.apply(transaction);
        for item in &items {
            graph.add_node(item);
        }

        for (position, left) in items.iter().enumerate() {
            for right in &items[position + 1..] {
                if left != right {
                    graph.add_edge(left, right, 1);
                }
            }
        }
    }
}
