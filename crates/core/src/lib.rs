pub mod config;
pub mod errors;
pub mod graph;
pub mod item;
pub mod mining;
pub mod recommend;
pub mod transactions;
pub mod traversal;

pub use config::{AnalysisConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use errors::{AnalysisError, AnalysisResult};
pub use graph::{CoOccurrenceGraph, GraphBuilder, GraphInfo, GraphView, Neighbor, Weight};
pub use item::{ItemArena, ItemIndex};
pub use mining::{AssociationRule, FrequentItemsets, FrequentPair, Itemset, ItemsetMiner};
pub use recommend::{Bundle, Recommender, ScoredItem, SimilarItem};
pub use transactions::{
    DuplicateItems, ItemCount, Transaction, TransactionSet, TransactionStats,
};
pub use traversal::GraphTraversal;
