//! Breadth-first and depth-first exploration of a [`GraphView`].
//!
//! Neighbor order comes from the view (edge insertion order for
//! [`CoOccurrenceGraph`]), so identical input sequences always produce identical
//! traversals. Depth is measured in edges from the start item.

use std::collections::{BTreeSet, VecDeque};

use tracing::debug;

use crate::graph::{CoOccurrenceGraph, GraphView, Weight};
use crate::item::ItemIndex;

#[derive(Clone, Debug)]
pub struct GraphTraversal<'g, G: GraphView = CoOccurrenceGraph> {
    graph: &'g G,
}

impl<'g, G: GraphView> GraphTraversal<'g, G> {
    pub fn new(graph: &'g G) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'g G {
        self.graph
    }

    /// Items reachable from `start` in breadth-first order, `start` first.
    ///
    /// With `max_depth`, only items whose shortest distance is within the limit
    /// are visited. An unknown start yields an empty list.
    pub fn bfs(&self, start: &str, max_depth: Option<usize>) -> Vec<&'g str> {
        let Some(start) = self.lookup(start, "bfs") else {
            return Vec::new();
        };
        self.names(self.bfs_indices(start, max_depth))
    }

    /// Items reachable from `start` in depth-first preorder.
    ///
    /// Visits items in the same order a recursive walk over each item's neighbors
    /// would. A neighbor first reached beyond `max_depth` is skipped there but can
    /// still be visited through a shorter branch explored later.
    pub fn dfs(&self, start: &str, max_depth: Option<usize>) -> Vec<&'g str> {
        let Some(start) = self.lookup(start, "dfs") else {
            return Vec::new();
        };

        let mut visited = vec![false; self.graph.index_space()];
        let mut ordered = Vec::new();
        let mut stack = vec![(start, 0usize)];

        while let Some((current, depth)) = stack.pop() {
            if visited[current.as_usize()] || exceeds(depth, max_depth) {
                continue;
            }
            visited[current.as_usize()] = true;
            ordered.push(current);

            for neighbor in self.graph.adjacent(current).iter().rev() {
                if !visited[neighbor.index.as_usize()] {
                    stack.push((neighbor.index, depth + 1));
                }
            }
        }

        self.names(ordered)
    }

    /// A path with the fewest edges from `start` to `end`, both ends included.
    pub fn find_path(&self, start: &str, end: &str) -> Option<Vec<&'g str>> {
        let start = self.lookup(start, "find_path")?;
        let end = self.lookup(end, "find_path")?;
        if start == end {
            return Some(vec![self.graph.name_of(start)]);
        }

        let mut parent: Vec<Option<ItemIndex>> = vec![None; self.graph.index_space()];
        let mut visited = vec![false; self.graph.index_space()];
        let mut queue = VecDeque::from([start]);
        visited[start.as_usize()] = true;

        while let Some(current) = queue.pop_front() {
            for neighbor in self.graph.adjacent(current) {
                let next = neighbor.index;
                if visited[next.as_usize()] {
                    continue;
                }
                visited[next.as_usize()] = true;
                parent[next.as_usize()] = Some(current);

                if next == end {
                    let mut path = vec![end];
                    let mut cursor = current;
                    path.push(cursor);
                    while let Some(previous) = parent[cursor.as_usize()] {
                        path.push(previous);
                        cursor = previous;
                    }
                    path.reverse();
                    return Some(self.names(path));
                }
                queue.push_back(next);
            }
        }

        None
    }

    /// Partitions every node into connected components, in node insertion order.
    pub fn connected_components(&self) -> Vec<BTreeSet<&'g str>> {
        let mut visited = vec![false; self.graph.index_space()];
        let mut components = Vec::new();

        for &node in self.graph.node_indices() {
            if visited[node.as_usize()] {
                continue;
            }
            let members = self.bfs_indices(node, None);
            for member in &members {
                visited[member.as_usize()] = true;
            }
            components.push(members.into_iter().map(|index| self.graph.name_of(index)).collect());
        }

        components
    }

    pub fn is_connected(&self, left: &str, right: &str) -> bool {
        self.find_path(left, right).is_some()
    }

    /// Every item within `distance` edges of `start`, including `start`.
    pub fn items_within_distance(&self, start: &str, distance: usize) -> BTreeSet<&'g str> {
        match self.lookup(start, "items_within_distance") {
            Some(start) => self
                .bfs_indices(start, Some(distance))
                .into_iter()
                .map(|index| self.graph.name_of(index))
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Fraction of neighbor pairs of `item` that are themselves connected.
    pub fn clustering_coefficient(&self, item: &str) -> f64 {
        let Some(index) = self.graph.index_of(item) else {
            return 0.0;
        };
        let neighbors = self
            .graph
            .adjacent(index)
            .iter()
            .map(|neighbor| neighbor.index)
            .filter(|neighbor| *neighbor != index)
            .collect::<Vec<_>>();
        if neighbors.len() < 2 {
            return 0.0;
        }

        let mut linked = 0usize;
        for (position, &left) in neighbors.iter().enumerate() {
            for &right in &neighbors[position + 1..] {
                if self.graph.has_edge_between(left, right) {
                    linked += 1;
                }
            }
        }

        let possible = neighbors.len() * (neighbors.len() - 1) / 2;
        linked as f64 / possible as f64
    }

    /// The `n` heaviest edges of `item`; equal weights keep insertion order.
    pub fn strongest_connections(&self, item: &str, n: usize) -> Vec<(&'g str, Weight)> {
        let Some(index) = self.graph.index_of(item) else {
            return Vec::new();
        };
        let mut ranked = self.graph.adjacent(index).to_vec();
        ranked.sort_by(|left, right| right.weight.cmp(&left.weight));
        ranked
            .into_iter()
            .take(n)
            .map(|neighbor| (self.graph.name_of(neighbor.index), neighbor.weight))
            .collect()
    }

    fn bfs_indices(&self, start: ItemIndex, max_depth: Option<usize>) -> Vec<ItemIndex> {
        let mut visited = vec![false; self.graph.index_space()];
        let mut ordered = Vec::new();
        let mut queue = VecDeque::from([(start, 0usize)]);

        while let Some((current, depth)) = queue.pop_front() {
            if visited[current.as_usize()] {
                continue;
            }
            visited[current.as_usize()] = true;
            ordered.push(current);

            if exceeds(depth + 1, max_depth) {
                continue;
            }
            for neighbor in self.graph.adjacent(current) {
                if !visited[neighbor.index.as_usize()] {
                    queue.push_back((neighbor.index, depth + 1));
                }
            }
        }

        ordered
    }

    fn lookup(&self, item: &str, operation: &'static str) -> Option<ItemIndex> {
        let index = self.graph.index_of(item);
        if index.is_none() {
            debug!(
                event_name = "basket.traversal.unknown_item",
                operation,
                item,
                "item not found in graph"
            );
        }
        index
    }

    fn names(&self, indices: Vec<ItemIndex>) -> Vec<&'g str> {
        indices.into_iter().map(|index| self.graph.name_of(index)).collect()
    }
}

fn exceeds(depth: usize, max_depth: Option<usize>) -> bool {
    max_depth.is_some_and(|limit| depth > limit)
}
