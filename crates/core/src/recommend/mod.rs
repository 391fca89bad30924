//! Co-purchase recommendations built on the co-occurrence graph.
//!
//! Scores are raw edge weights (or sums of them), so they read as "bought
//! together N times" rather than as probabilities.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::errors::{ensure_positive, AnalysisError, AnalysisResult};
use crate::graph::{CoOccurrenceGraph, GraphView, Weight};
use crate::item::ItemIndex;
use crate::traversal::GraphTraversal;

/// Neighbors considered per basket item before scores are combined.
pub const DEFAULT_BASKET_CANDIDATE_CAP: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScoredItem<'g> {
    pub item: &'g str,
    pub score: Weight,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimilarItem<'g> {
    pub item: &'g str,
    pub similarity: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Bundle<'g> {
    /// Bundle members in lexicographic order.
    pub items: Vec<&'g str>,
    pub score: Weight,
}

#[derive(Clone, Debug)]
pub struct Recommender<'g> {
    graph: &'g CoOccurrenceGraph,
    traversal: GraphTraversal<'g>,
    basket_candidate_cap: usize,
}

impl<'g> Recommender<'g> {
    pub fn new(graph: &'g CoOccurrenceGraph) -> Self {
        Self {
            graph,
            traversal: GraphTraversal::new(graph),
            basket_candidate_cap: DEFAULT_BASKET_CANDIDATE_CAP,
        }
    }

    pub fn with_basket_candidate_cap(mut self, cap: usize) -> Self {
        self.basket_candidate_cap = cap;
        self
    }

    /// Items most often bought with `item`, heaviest first.
    pub fn recommend_for_item(&self, item: &str, n: usize) -> Vec<ScoredItem<'g>> {
        self.recommend_for_item_excluding(item, n, &[] as &[&str])
    }

    pub fn recommend_for_item_excluding<S: AsRef<str>>(
        &self,
        item: &str,
        n: usize,
        exclude: &[S],
    ) -> Vec<ScoredItem<'g>> {
        let Some(index) = self.lookup(item, "recommend_for_item") else {
            return Vec::new();
        };
        let exclude = self.indices(exclude);
        self.ranked_neighbors(index, &exclude, n)
            .into_iter()
            .map(|(neighbor, score)| ScoredItem { item: self.graph.name_of(neighbor), score })
            .collect()
    }

    /// Same ranking as [`Recommender::recommend_for_item`]: items that complement `item`.
    pub fn get_complementary_items(&self, item: &str, n: usize) -> Vec<ScoredItem<'g>> {
        self.recommend_for_item(item, n)
    }

    /// Items to add to `basket`, scored by summing their edge weights to every
    /// basket item. An item tied strongly to several basket items outranks one
    /// tied strongly to a single item. Unknown basket items are ignored.
    pub fn recommend_for_basket<S: AsRef<str>>(
        &self,
        basket: &[S],
        n: usize,
    ) -> Vec<ScoredItem<'g>> {
        let exclude = self.indices(basket);
        let mut order: Vec<ItemIndex> = Vec::new();
        let mut scores: HashMap<ItemIndex, Weight> = HashMap::new();

        for item in basket {
            let Some(index) = self.lookup(item.as_ref(), "recommend_for_basket") else {
                continue;
            };
            for (candidate, weight) in
                self.ranked_neighbors(index, &exclude, self.basket_candidate_cap)
            {
                let score = scores.entry(candidate).or_insert_with(|| {
                    order.push(candidate);
                    0
                });
                *score += weight;
            }
        }

        let mut ranked = order
            .into_iter()
            .map(|candidate| (candidate, scores[&candidate]))
            .collect::<Vec<_>>();
        ranked.sort_by(|left, right| right.1.cmp(&left.1));
        ranked
            .into_iter()
            .take(n)
            .map(|(candidate, score)| ScoredItem { item: self.graph.name_of(candidate), score })
            .collect()
    }

    /// Candidate bundles made of each item plus its `max_size - 1` strongest
    /// connections, scored by the sum of those edge weights.
    ///
    /// This is a greedy neighborhood heuristic: a bundle that is frequent as a
    /// whole but never forms any single item's top connections is not found.
    /// Identical bundles keep their best score; ties order by bundle members.
    pub fn find_product_bundles(
        &self,
        min_size: usize,
        max_size: usize,
        top_n: usize,
    ) -> AnalysisResult<Vec<Bundle<'g>>> {
        ensure_positive("min_size", min_size)?;
        if max_size < 2 {
            return Err(AnalysisError::invalid("max_size", "bundles need at least two items"));
        }
        if min_size > max_size {
            return Err(AnalysisError::invalid(
                "min_size",
                format!("must not exceed max_size ({min_size} > {max_size})"),
            ));
        }

        let mut best: HashMap<Vec<&'g str>, Weight> = HashMap::new();
        for &index in self.graph.node_indices() {
            let node = self.graph.name_of(index);
            let connections = self.traversal.strongest_connections(node, max_size - 1);
            if connections.len() < min_size - 1 {
                continue;
            }

            let score = connections.iter().map(|(_, weight)| *weight).sum::<Weight>();
            let mut items = connections.into_iter().map(|(item, _)| item).collect::<Vec<_>>();
            items.push(node);
            items.sort_unstable();

            let entry = best.entry(items).or_insert(score);
            *entry = (*entry).max(score);
        }

        let mut bundles =
            best.into_iter().map(|(items, score)| Bundle { items, score }).collect::<Vec<_>>();
        bundles.sort_by(|left, right| {
            right.score.cmp(&left.score).then_with(|| left.items.cmp(&right.items))
        });
        bundles.truncate(top_n);
        Ok(bundles)
    }

    /// Items whose neighbor sets overlap most with `item`'s, by Jaccard similarity.
    ///
    /// Items without neighbors are skipped and `item` never appears in its own
    /// list. Equal similarities keep node insertion order.
    pub fn get_similar_items(&self, item: &str, n: usize) -> Vec<SimilarItem<'g>> {
        let Some(index) = self.lookup(item, "get_similar_items") else {
            return Vec::new();
        };
        let target = self.neighbor_set(index);
        if target.is_empty() {
            return Vec::new();
        }

        let mut similar = Vec::new();
        for &other in self.graph.node_indices() {
            if other == index {
                continue;
            }
            let candidate = self.neighbor_set(other);
            if candidate.is_empty() {
                continue;
            }

            let intersection = target.intersection(&candidate).count();
            let union = target.len() + candidate.len() - intersection;
            similar.push(SimilarItem {
                item: self.graph.name_of(other),
                similarity: intersection as f64 / union as f64,
            });
        }

        similar.sort_by(|left, right| right.similarity.total_cmp(&left.similarity));
        similar.truncate(n);
        similar
    }

    fn ranked_neighbors(
        &self,
        index: ItemIndex,
        exclude: &HashSet<ItemIndex>,
        n: usize,
    ) -> Vec<(ItemIndex, Weight)> {
        let mut ranked = self
            .graph
            .adjacent(index)
            .iter()
            .filter(|neighbor| !exclude.contains(&neighbor.index))
            .map(|neighbor| (neighbor.index, neighbor.weight))
            .collect::<Vec<_>>();
        ranked.sort_by(|left, right| right.1.cmp(&left.1));
        ranked.truncate(n);
        ranked
    }

    fn neighbor_set(&self, index: ItemIndex) -> HashSet<ItemIndex> {
        self.graph
            .adjacent(index)
            .iter()
            .map(|neighbor| neighbor.index)
            .filter(|neighbor| *neighbor != index)
            .collect()
    }

    fn indices<S: AsRef<str>>(&self, items: &[S]) -> HashSet<ItemIndex> {
        items.iter().filter_map(|item| self.graph.index_of(item.as_ref())).collect()
    }

    fn lookup(&self, item: &str, operation: &'static str) -> Option<ItemIndex> {
        let index = self.graph.index_of(item);
        if index.is_none() {
            debug!(
                event_name = "basket.recommend.unknown_item",
                operation,
                item,
                "item not found in graph"
            );
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::{Bundle, Recommender, ScoredItem};
    use crate::graph::CoOccurrenceGraph;

    fn store_graph() -> CoOccurrenceGraph {
        let mut graph = CoOccurrenceGraph::new();
        graph.add_edge("Bread", "Milk", 10);
        graph.add_edge("Bread", "Butter", 7);
        graph.add_edge("Milk", "Eggs", 8);
        graph.add_edge("Bread", "Eggs", 5);
        graph.add_edge("Butter", "Eggs", 3);
        graph
    }

    fn scored(items: &[(&'static str, u64)]) -> Vec<ScoredItem<'static>> {
        items.iter().map(|&(item, score)| ScoredItem { item, score }).collect()
    }

    #[test]
    fn item_recommendations_rank_direct_neighbors() {
        let graph = store_graph();
        let recommender = Recommender::new(&graph);

        assert_eq!(
            recommender.recommend_for_item("Bread", 2),
            scored(&[("Milk", 10), ("Butter", 7)])
        );
        assert_eq!(
            recommender.recommend_for_item_excluding("Bread", 5, &["Milk"]),
            scored(&[("Butter", 7), ("Eggs", 5)])
        );
        assert_eq!(
            recommender.get_complementary_items("Eggs", 5),
            recommender.recommend_for_item("Eggs", 5)
        );
        assert!(recommender.recommend_for_item("Caviar", 3).is_empty());
    }

    #[test]
    fn basket_scores_add_up_across_basket_items() {
        let graph = store_graph();
        let recommender = Recommender::new(&graph);

        // Eggs: 5 via Bread + 8 via Milk; Butter: 7 via Bread only.
        assert_eq!(
            recommender.recommend_for_basket(&["Bread", "Milk"], 5),
            scored(&[("Eggs", 13), ("Butter", 7)])
        );
        assert_eq!(
            recommender.recommend_for_basket(&["Butter", "Caviar"], 1),
            scored(&[("Bread", 7)])
        );
        assert!(recommender.recommend_for_basket(&[] as &[&str], 3).is_empty());
    }

    #[test]
    fn basket_candidate_cap_limits_neighbors_per_item() {
        let graph = store_graph();
        let recommender = Recommender::new(&graph).with_basket_candidate_cap(1);

        assert_eq!(recommender.recommend_for_basket(&["Bread"], 5), scored(&[("Milk", 10)]));
    }

    #[test]
    fn bundles_are_deduplicated_and_ranked() {
        let graph = store_graph();
        let recommender = Recommender::new(&graph);
        let bundles = recommender.find_product_bundles(2, 3, 10).expect("bundles");

        assert_eq!(
            bundles,
            vec![
                Bundle { items: vec!["Bread", "Eggs", "Milk"], score: 18 },
                Bundle { items: vec!["Bread", "Butter", "Milk"], score: 17 },
                Bundle { items: vec!["Bread", "Butter", "Eggs"], score: 10 },
            ]
        );
        assert_eq!(recommender.find_product_bundles(2, 3, 1).expect("bundles").len(), 1);
    }

    #[test]
    fn bundle_size_preconditions_are_enforced() {
        let graph = store_graph();
        let recommender = Recommender::new(&graph);

        assert!(recommender.find_product_bundles(0, 3, 5).is_err());
        assert!(recommender.find_product_bundles(2, 1, 5).is_err());
        assert!(recommender.find_product_bundles(4, 3, 5).is_err());
    }

    #[test]
    fn items_with_too_few_neighbors_form_no_bundle() {
        let mut graph = CoOccurrenceGraph::new();
        graph.add_edge("Tea", "Lemon", 2);
        let recommender = Recommender::new(&graph);

        assert!(recommender.find_product_bundles(3, 3, 5).expect("bundles").is_empty());
        assert_eq!(
            recommender.find_product_bundles(2, 2, 5).expect("bundles"),
            vec![Bundle { items: vec!["Lemon", "Tea"], score: 2 }]
        );
    }

    #[test]
    fn similar_items_use_jaccard_over_neighbor_sets() {
        let graph = store_graph();
        let recommender = Recommender::new(&graph);
        let similar = recommender.get_similar_items("Milk", 5);

        // N(Milk) = {Bread, Eggs}; N(Butter) = {Bread, Eggs}: identical.
        assert_eq!(similar[0].item, "Butter");
        assert_eq!(similar[0].similarity, 1.0);
        assert!(similar.iter().all(|entry| entry.item != "Milk"));
        assert!(similar.iter().all(|entry| (0.0..=1.0).contains(&entry.similarity)));
        assert_eq!(similar.len(), 3);
    }

    #[test]
    fn results_serialize_with_plain_field_names() {
        let graph = store_graph();
        let recommender = Recommender::new(&graph);

        let item = recommender.recommend_for_item("Butter", 1);
        let item = serde_json::to_value(&item).expect("json");
        assert_eq!(item, serde_json::json!([{ "item": "Bread", "score": 7 }]));

        let bundle = Bundle { items: vec!["Bread", "Milk"], score: 10 };
        let bundle = serde_json::to_value(&bundle).expect("json");
        assert_eq!(bundle, serde_json::json!({ "items": ["Bread", "Milk"], "score": 10 }));
    }

    #[test]
    fn isolated_or_unknown_items_have_no_similar_items() {
        let mut graph = store_graph();
        graph.add_node("Saffron");
        let recommender = Recommender::new(&graph);

        assert!(recommender.get_similar_items("Saffron", 5).is_empty());
        assert!(recommender.get_similar_items("Caviar", 5).is_empty());
        let bread = recommender.get_similar_items("Bread", 10);
        assert!(bread.iter().all(|entry| entry.item != "Saffron"));
    }
}
