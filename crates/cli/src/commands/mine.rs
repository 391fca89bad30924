use basketgraph_core::{AssociationRule, FrequentPair, ItemsetMiner};
use serde::Serialize;

use super::{CommandResult, Workspace};

#[derive(Debug, Serialize)]
struct ItemsetRow<'a> {
    items: &'a [String],
    count: usize,
    support: f64,
}

#[derive(Debug, Serialize)]
struct LevelPayload<'a> {
    k: usize,
    itemsets: Vec<ItemsetRow<'a>>,
}

#[derive(Debug, Serialize)]
struct ItemsetsPayload<'a> {
    min_support: f64,
    min_support_count: usize,
    levels: Vec<LevelPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct PairsPayload {
    min_support: f64,
    min_support_count: usize,
    pairs: Vec<FrequentPair>,
}

#[derive(Debug, Serialize)]
struct RulesPayload {
    min_support: f64,
    min_confidence: f64,
    rules: Vec<AssociationRule>,
}

fn miner<'t>(
    command: &str,
    workspace: &'t Workspace,
    min_support: f64,
) -> Result<ItemsetMiner<'t>, CommandResult> {
    ItemsetMiner::with_duplicates(
        &workspace.transactions,
        min_support,
        workspace.config.graph.duplicate_items,
    )
    .map_err(|error| CommandResult::from_analysis_error(command, &error))
}

pub fn itemsets(workspace: &Workspace, min_support: f64, max_k: usize) -> CommandResult {
    let miner = match miner("itemsets", workspace, min_support) {
        Ok(miner) => miner,
        Err(result) => return result,
    };
    let levels = match miner.apriori(max_k) {
        Ok(levels) => levels,
        Err(error) => return CommandResult::from_analysis_error("itemsets", &error),
    };

    let levels = levels
        .iter()
        .map(|(k, level)| LevelPayload {
            k: *k,
            itemsets: level
                .iter()
                .map(|(itemset, count)| ItemsetRow {
                    items: itemset.items(),
                    count: *count,
                    support: miner.support(*count),
                })
                .collect(),
        })
        .collect();

    CommandResult::success(
        "itemsets",
        ItemsetsPayload { min_support, min_support_count: miner.min_support_count(), levels },
    )
}

pub fn pairs(workspace: &Workspace, min_support: f64, top: Option<usize>) -> CommandResult {
    let miner = match miner("pairs", workspace, min_support) {
        Ok(miner) => miner,
        Err(result) => return result,
    };
    let pairs = match top {
        Some(n) => miner.top_pairs(n),
        None => miner.frequent_pairs(),
    };

    CommandResult::success(
        "pairs",
        PairsPayload { min_support, min_support_count: miner.min_support_count(), pairs },
    )
}

pub fn rules(workspace: &Workspace, min_support: f64, min_confidence: f64) -> CommandResult {
    let miner = match miner("rules", workspace, min_support) {
        Ok(miner) => miner,
        Err(result) => return result,
    };
    match miner.association_rules(min_confidence) {
        Ok(rules) => {
            CommandResult::success("rules", RulesPayload { min_support, min_confidence, rules })
        }
        Err(error) => CommandResult::from_analysis_error("rules", &error),
    }
}
