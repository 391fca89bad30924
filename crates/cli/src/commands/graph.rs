use std::collections::BTreeSet;

use basketgraph_core::{GraphInfo, GraphTraversal, TransactionSet, TransactionStats};
use serde::Serialize;

use super::{CommandResult, Workspace};

#[derive(Debug, Serialize)]
struct InfoPayload {
    summary: String,
    #[serde(flatten)]
    info: GraphInfo,
}

#[derive(Debug, Serialize)]
struct StatsPayload {
    stats: Option<TransactionStats>,
}

#[derive(Debug, Serialize)]
struct TraversalPayload<'a> {
    start: &'a str,
    max_depth: Option<usize>,
    order: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct PathPayload<'a> {
    from: &'a str,
    to: &'a str,
    connected: bool,
    path: Option<Vec<&'a str>>,
}

#[derive(Debug, Serialize)]
struct ComponentsPayload<'a> {
    count: usize,
    components: Vec<BTreeSet<&'a str>>,
}

#[derive(Debug, Serialize)]
struct NeighborhoodPayload<'a> {
    item: &'a str,
    distance: usize,
    items: BTreeSet<&'a str>,
}

#[derive(Debug, Serialize)]
struct ClusteringPayload<'a> {
    item: &'a str,
    clustering_coefficient: f64,
}

pub fn info(workspace: &Workspace) -> CommandResult {
    let graph = &workspace.graph;
    let payload = InfoPayload { summary: graph.to_string(), info: graph.graph_info() };
    CommandResult::success("info", payload)
}

pub fn stats(workspace: &Workspace) -> CommandResult {
    let stats = TransactionSet::new(&workspace.transactions).stats();
    CommandResult::success("stats", StatsPayload { stats })
}

pub fn bfs(workspace: &Workspace, item: &str, max_depth: Option<usize>) -> CommandResult {
    let order = GraphTraversal::new(&workspace.graph).bfs(item, max_depth);
    CommandResult::success("bfs", TraversalPayload { start: item, max_depth, order })
}

pub fn dfs(workspace: &Workspace, item: &str, max_depth: Option<usize>) -> CommandResult {
    let order = GraphTraversal::new(&workspace.graph).dfs(item, max_depth);
    CommandResult::success("dfs", TraversalPayload { start: item, max_depth, order })
}

pub fn path(workspace: &Workspace, from: &str, to: &str) -> CommandResult {
    let path = GraphTraversal::new(&workspace.graph).find_path(from, to);
    CommandResult::success("path", PathPayload { from, to, connected: path.is_some(), path })
}

pub fn components(workspace: &Workspace) -> CommandResult {
    let components = GraphTraversal::new(&workspace.graph).connected_components();
    CommandResult::success("components", ComponentsPayload { count: components.len(), components })
}

pub fn neighborhood(workspace: &Workspace, item: &str, distance: usize) -> CommandResult {
    let items = GraphTraversal::new(&workspace.graph).items_within_distance(item, distance);
    CommandResult::success("neighborhood", NeighborhoodPayload { item, distance, items })
}

pub fn clustering(workspace: &Workspace, item: &str) -> CommandResult {
    let clustering_coefficient =
        GraphTraversal::new(&workspace.graph).clustering_coefficient(item);
    CommandResult::success("clustering", ClusteringPayload { item, clustering_coefficient })
}
