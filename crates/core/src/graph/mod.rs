//! Undirected, weighted co-occurrence graph over interned items.
//!
//! Edge weights count how often two items were bought together. Every lookup
//! on an unknown item returns an empty or zero result instead of failing.

mod builder;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::item::{ItemArena, ItemIndex};

pub use builder::GraphBuilder;

pub type Weight = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Neighbor {
    pub index: ItemIndex,
    pub weight: Weight,
}

/// Read access the traversal algorithms need from a graph.
///
/// Neighbor slices are in insertion order; traversal results are reproducible
/// because of it.
pub trait GraphView {
    /// Upper bound (exclusive) of every index this view hands out.
    fn index_space(&self) -> usize;
    fn index_of(&self, item: &str) -> Option<ItemIndex>;
    fn name_of(&self, index: ItemIndex) -> &str;
    /// Live nodes in insertion order.
    fn node_indices(&self) -> &[ItemIndex];
    fn adjacent(&self, index: ItemIndex) -> &[Neighbor];

    fn has_edge_between(&self, left: ItemIndex, right: ItemIndex) -> bool {
        self.adjacent(left).iter().any(|neighbor| neighbor.index == right)
    }
}

#[derive(Clone, Debug, Default)]
struct NeighborList {
    entries: Vec<Neighbor>,
    slots: HashMap<ItemIndex, usize>,
}

impl NeighborList {
    fn add(&mut self, index: ItemIndex, weight: Weight) {
        match self.slots.get(&index) {
            Some(&slot) => self.entries[slot].weight += weight,
            None => {
                self.slots.insert(index, self.entries.len());
                self.entries.push(Neighbor { index, weight });
            }
        }
    }

    fn weight(&self, index: ItemIndex) -> Option<Weight> {
        self.slots.get(&index).map(|&slot| self.entries[slot].weight)
    }

    fn remove(&mut self, index: ItemIndex) {
        let Some(slot) = self.slots.remove(&index) else {
            return;
        };
        self.entries.remove(slot);
        for (offset, entry) in self.entries[slot..].iter().enumerate() {
            self.slots.insert(entry.index, slot + offset);
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.slots.clear();
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphInfo {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    pub min_degree: usize,
    pub density: f64,
}

#[derive(Clone, Debug, Default)]
pub struct CoOccurrenceGraph {
    arena: ItemArena,
    adjacency: Vec<NeighborList>,
    nodes: Vec<ItemIndex>,
}

impl CoOccurrenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `item` if it is not already a node and returns its index either way.
    pub fn add_node(&mut self, item: &str) -> ItemIndex {
        if let Some(index) = self.arena.get(item) {
            return index;
        }

        let index = self.arena.intern(item);
        if index.as_usize() >= self.adjacency.len() {
            self.adjacency.resize_with(index.as_usize() + 1, NeighborList::default);
        }
        self.nodes.push(index);
        index
    }

    /// Adds `weight` to the edge between `left` and `right`, creating nodes and the
    /// edge as needed. Both directions are updated together.
    ///
    /// A self-loop (`left == right`) is one adjacency entry that receives both
    /// increments, so it carries `2 * weight`. It has no meaning for the analysis
    /// and [`GraphBuilder`] never creates one. A zero weight only ensures the nodes
    /// exist.
    pub fn add_edge(&mut self, left: &str, right: &str, weight: Weight) {
        let left = self.add_node(left);
        let right = self.add_node(right);
        if weight == 0 {
            return;
        }

        self.adjacency[left.as_usize()].add(right, weight);
        self.adjacency[right.as_usize()].add(left, weight);
    }

    pub fn contains(&self, item: &str) -> bool {
        self.arena.get(item).is_some()
    }

    /// Neighbors of `item` with edge weights, in the order the edges were first added.
    pub fn neighbors(&self, item: &str) -> Vec<(&str, Weight)> {
        self.arena
            .get(item)
            .map(|index| self.named(self.adjacent(index).iter().copied()))
            .unwrap_or_default()
    }

    pub fn edge_weight(&self, left: &str, right: &str) -> Weight {
        match (self.arena.get(left), self.arena.get(right)) {
            (Some(left), Some(right)) => {
                self.adjacency[left.as_usize()].weight(right).unwrap_or(0)
            }
            _ => 0,
        }
    }

    pub fn has_edge(&self, left: &str, right: &str) -> bool {
        self.edge_weight(left, right) > 0
    }

    pub fn degree(&self, item: &str) -> usize {
        self.arena.get(item).map(|index| self.adjacent(index).len()).unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Half the total adjacency size, rounded down. A self-loop holds a single
    /// entry, so it is not counted as a whole edge.
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|index| self.adjacent(*index).len()).sum::<usize>() / 2
    }

    /// Live nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(|index| self.arena.resolve(*index))
    }

    /// The `n` heaviest edges of `item`. Equal weights keep insertion order.
    pub fn top_connections(&self, item: &str, n: usize) -> Vec<(&str, Weight)> {
        match self.arena.get(item) {
            Some(index) => self.named(self.top_neighbors(index, n)),
            None => Vec::new(),
        }
    }

    fn top_neighbors(&self, index: ItemIndex, n: usize) -> Vec<Neighbor> {
        let mut ranked = self.adjacent(index).to_vec();
        ranked.sort_by(|left, right| right.weight.cmp(&left.weight));
        ranked.truncate(n);
        ranked
    }

    pub fn graph_info(&self) -> GraphInfo {
        let num_nodes = self.node_count();
        if num_nodes == 0 {
            return GraphInfo {
                num_nodes: 0,
                num_edges: 0,
                avg_degree: 0.0,
                max_degree: 0,
                min_degree: 0,
                density: 0.0,
            };
        }

        let degrees = self.nodes.iter().map(|index| self.adjacent(*index).len());
        let total_degree: usize = degrees.clone().sum();
        let num_edges = self.edge_count();
        let density = if num_nodes > 1 {
            (2 * num_edges) as f64 / (num_nodes * (num_nodes - 1)) as f64
        } else {
            0.0
        };

        GraphInfo {
            num_nodes,
            num_edges,
            avg_degree: total_degree as f64 / num_nodes as f64,
            max_degree: degrees.clone().max().unwrap_or(0),
            min_degree: degrees.min().unwrap_or(0),
            density,
        }
    }

    /// Removes `item` and every edge touching it. Unknown items are ignored.
    pub fn remove_node(&mut self, item: &str) {
        let Some(index) = self.arena.forget(item) else {
            return;
        };

        let neighbors = self.adjacency[index.as_usize()]
            .entries
            .iter()
            .map(|neighbor| neighbor.index)
            .collect::<Vec<_>>();
        for neighbor in neighbors {
            self.adjacency[neighbor.as_usize()].remove(index);
        }
        self.adjacency[index.as_usize()].clear();
        self.nodes.retain(|node| *node != index);
    }

    fn named(&self, neighbors: impl IntoIterator<Item = Neighbor>) -> Vec<(&str, Weight)> {
        neighbors
            .into_iter()
            .map(|neighbor| (self.arena.resolve(neighbor.index), neighbor.weight))
            .collect()
    }
}

impl GraphView for CoOccurrenceGraph {
    fn index_space(&self) -> usize {
        self.adjacency.len()
    }

    fn index_of(&self, item: &str) -> Option<ItemIndex> {
        self.arena.get(item)
    }

    fn name_of(&self, index: ItemIndex) -> &str {
        self.arena.resolve(index)
    }

    fn node_indices(&self) -> &[ItemIndex] {
        &self.nodes
    }

    fn adjacent(&self, index: ItemIndex) -> &[Neighbor] {
        &self.adjacency[index.as_usize()].entries
    }

    fn has_edge_between(&self, left: ItemIndex, right: ItemIndex) -> bool {
        self.adjacency[left.as_usize()].weight(right).is_some()
    }
}

impl fmt::Display for CoOccurrenceGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.graph_info();
        write!(
            f,
            "CoOccurrenceGraph(nodes={}, edges={}, avg_degree={:.2})",
            info.num_nodes, info.num_edges, info.avg_degree
        )
    }
}
