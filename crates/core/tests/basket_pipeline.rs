use std::collections::{BTreeSet, HashSet};

use basketgraph_core::{
    CoOccurrenceGraph, GraphBuilder, GraphTraversal, Itemset, ItemsetMiner, Recommender,
    Transaction, TransactionSet,
};

fn transactions(raw: &[&[&str]]) -> Vec<Transaction> {
    raw.iter().map(|basket| basket.iter().map(|item| item.to_string()).collect()).collect()
}

fn market_baskets() -> Vec<Transaction> {
    transactions(&[
        &["Bread", "Milk", "Eggs"],
        &["Bread", "Butter"],
        &["Milk", "Eggs"],
        &["Bread", "Milk", "Butter"],
        &["Bread", "Eggs"],
    ])
}

fn wider_baskets() -> Vec<Transaction> {
    transactions(&[
        &["Bread", "Milk", "Eggs", "Butter"],
        &["Bread", "Milk", "Eggs"],
        &["Bread", "Milk"],
        &["Coffee", "Sugar", "Cream"],
        &["Coffee", "Sugar"],
        &["Coffee", "Cream", "Milk"],
        &["Tea"],
        &["Bread", "Butter", "Jam"],
        &["Eggs", "Bacon"],
        &["Bread", "Milk", "Eggs", "Bacon"],
    ])
}

#[test]
fn grocery_graph_matches_hand_counts() {
    let mut graph = CoOccurrenceGraph::new();
    graph.add_edge("Bread", "Milk", 5);
    graph.add_edge("Bread", "Butter", 3);
    graph.add_edge("Milk", "Eggs", 4);
    graph.add_edge("Bread", "Eggs", 2);
    let traversal = GraphTraversal::new(&graph);

    assert_eq!(graph.top_connections("Bread", 2), vec![("Milk", 5), ("Butter", 3)]);

    let visited = traversal.bfs("Bread", None);
    assert_eq!(visited[0], "Bread");
    assert_eq!(
        visited.iter().copied().collect::<BTreeSet<_>>(),
        BTreeSet::from(["Bread", "Butter", "Eggs", "Milk"])
    );
    assert!(traversal.is_connected("Bread", "Eggs"));
}

#[test]
fn five_transaction_mining_counts() {
    let baskets = market_baskets();
    let miner = ItemsetMiner::new(&baskets, 0.4).expect("miner");

    assert_eq!(miner.min_support_count(), 2);
    let singles = miner.frequent_1_itemsets();
    assert_eq!(singles[&Itemset::from(["Bread"])], 4);
    assert_eq!(singles[&Itemset::from(["Milk"])], 3);

    let bread_milk = miner
        .frequent_pairs()
        .into_iter()
        .find(|pair| pair.first == "Bread" && pair.second == "Milk")
        .expect("bread and milk are a frequent pair");
    assert_eq!(bread_milk.count, 2);
}

#[test]
fn built_graph_is_symmetric_and_agrees_with_pair_counts() {
    let baskets = wider_baskets();
    let graph = GraphBuilder::new().build(&baskets);
    let miner = ItemsetMiner::new(&baskets, 0.0).expect("miner");

    for item in graph.nodes() {
        for (neighbor, weight) in graph.neighbors(item) {
            assert_eq!(graph.edge_weight(neighbor, item), weight);
        }
    }
    for pair in miner.frequent_pairs() {
        assert_eq!(graph.edge_weight(&pair.first, &pair.second), pair.count as u64);
    }
    assert!(graph.contains("Tea"));
    assert_eq!(graph.degree("Tea"), 0);
}

#[test]
fn traversal_properties_hold_on_built_graph() {
    let baskets = wider_baskets();
    let graph = GraphBuilder::new().build(&baskets);
    let traversal = GraphTraversal::new(&graph);

    for start in graph.nodes() {
        for order in [traversal.bfs(start, None), traversal.dfs(start, None)] {
            assert_eq!(order[0], start);
            assert_eq!(order.iter().collect::<HashSet<_>>().len(), order.len());
            assert!(order.len() <= graph.node_count());
        }
    }

    let components = traversal.connected_components();
    let covered = components.iter().map(BTreeSet::len).sum::<usize>();
    let union = components.iter().flatten().copied().collect::<BTreeSet<_>>();
    assert_eq!(covered, graph.node_count());
    assert_eq!(union, graph.nodes().collect::<BTreeSet<_>>());
    assert!(components.contains(&BTreeSet::from(["Tea"])));

    for left in graph.nodes() {
        for right in graph.nodes() {
            let path = traversal.find_path(left, right);
            assert_eq!(path.is_some(), traversal.is_connected(left, right));
            if let Some(path) = path {
                assert_eq!(path.first(), Some(&left));
                assert_eq!(path.last(), Some(&right));
                assert!(path.windows(2).all(|step| graph.has_edge(step[0], step[1])));
            }
        }
    }
}

#[test]
fn apriori_matches_naive_enumeration() {
    let baskets = wider_baskets();
    let miner = ItemsetMiner::new(&baskets, 0.2).expect("miner");
    let levels = miner.apriori(3).expect("apriori");

    let items = baskets.iter().flatten().cloned().collect::<BTreeSet<_>>();
    let items = items.into_iter().collect::<Vec<_>>();
    let support = |candidate: &[&str]| {
        baskets
            .iter()
            .filter(|basket| candidate.iter().all(|item| basket.iter().any(|b| b == item)))
            .count()
    };

    let mut naive_triples = 0;
    for (a, first) in items.iter().enumerate() {
        for (b, second) in items.iter().enumerate().skip(a + 1) {
            for third in items.iter().skip(b + 1) {
                let candidate = [first.as_str(), second.as_str(), third.as_str()];
                let count = support(&candidate[..]);
                if count >= miner.min_support_count() {
                    naive_triples += 1;
                    let triples = levels.get(&3).expect("a frequent triple exists");
                    assert_eq!(triples.get(&Itemset::from(candidate)), Some(&count));
                }
            }
        }
    }
    assert_eq!(levels.get(&3).map_or(0, |level| level.len()), naive_triples);

    // Every subset of a frequent itemset is frequent with at least its count.
    for (k, level) in &levels {
        if *k == 1 {
            continue;
        }
        for (itemset, count) in level {
            for subset in itemset.subsets_one_smaller() {
                let smaller = &levels[&(k - 1)];
                assert!(smaller[&subset] >= *count);
            }
        }
    }
}

#[test]
fn rules_are_bounded_and_consistent_with_counts() {
    let baskets = wider_baskets();
    let miner = ItemsetMiner::new(&baskets, 0.2).expect("miner");
    let singles = miner.frequent_1_itemsets();

    for rule in miner.association_rules(0.0).expect("rules") {
        let antecedent = singles[&Itemset::from([rule.antecedent.as_str()])];
        assert!((0.0..=1.0).contains(&rule.support));
        assert!((0.0..=1.0).contains(&rule.confidence));
        assert!(rule.lift > 0.0);
        assert!((rule.confidence - rule.count as f64 / antecedent as f64).abs() < 1e-12);
    }
}

#[test]
fn recommendations_stay_within_the_graph() {
    let baskets = wider_baskets();
    let graph = GraphBuilder::new().build(&baskets);
    let recommender = Recommender::new(&graph);

    let basket = ["Bread", "Milk"];
    let suggestions = recommender.recommend_for_basket(&basket, 5);
    assert!(!suggestions.is_empty());
    assert!(suggestions.iter().all(|entry| !basket.contains(&entry.item)));
    assert!(suggestions.windows(2).all(|pair| pair[0].score >= pair[1].score));

    for item in graph.nodes() {
        let similar = recommender.get_similar_items(item, 20);
        assert!(similar.iter().all(|entry| entry.item != item));
        assert!(similar.iter().all(|entry| (0.0..=1.0).contains(&entry.similarity)));
    }

    let bundles = recommender.find_product_bundles(2, 3, 5).expect("bundles");
    assert!(bundles.len() <= 5);
    assert!(bundles.iter().all(|bundle| (2..=3).contains(&bundle.items.len())));
}

#[test]
fn transaction_stats_summarize_the_input() {
    let baskets = market_baskets();
    let stats = TransactionSet::new(&baskets).stats().expect("stats");

    assert_eq!(stats.total_transactions, 5);
    assert_eq!(stats.unique_items, 4);
    assert_eq!(stats.min_transaction_size, 2);
    assert_eq!(stats.max_transaction_size, 3);
    assert_eq!(stats.most_common_items[0].item, "Bread");
    assert_eq!(stats.most_common_items[0].count, 4);
}
