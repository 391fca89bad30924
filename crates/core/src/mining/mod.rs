//! Apriori-style frequent itemset mining over the raw transaction list.
//!
//! Items are interned in lexicographic order, so an itemset key is simply the
//! sorted slice of its item indices and reads back as a sorted list of names.
//! Counting enumerates every k-combination of each transaction; with the
//! default [`DuplicateItems::Count`] policy an item listed twice in one basket
//! contributes once per position, which can push a pair's count above the
//! count of one of its members.

mod rules;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{ensure_fraction, ensure_positive, AnalysisResult};
use crate::item::{ItemArena, ItemIndex};
use crate::transactions::{DuplicateItems, Transaction};

pub use rules::AssociationRule;

type ItemsetKey = Box<[ItemIndex]>;

/// An unordered set of items, stored sorted.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Itemset(Vec<String>);

impl Itemset {
    pub fn new<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut items = items.into_iter().map(Into::into).collect::<Vec<String>>();
        items.sort();
        items.dedup();
        Self(items)
    }

    pub fn items(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, item: &str) -> bool {
        self.0.binary_search_by(|candidate| candidate.as_str().cmp(item)).is_ok()
    }

    /// Every subset with exactly one item removed.
    pub fn subsets_one_smaller(&self) -> Vec<Itemset> {
        (0..self.0.len())
            .map(|skip| {
                Itemset(
                    self.0
                        .iter()
                        .enumerate()
                        .filter(|(position, _)| *position != skip)
                        .map(|(_, item)| item.clone())
                        .collect(),
                )
            })
            .collect()
    }
}

impl<const N: usize> From<[&str; N]> for Itemset {
    fn from(items: [&str; N]) -> Self {
        Self::new(items)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequentPair {
    pub first: String,
    pub second: String,
    pub count: usize,
}

pub type FrequentItemsets = BTreeMap<Itemset, usize>;

#[derive(Clone, Debug)]
pub struct ItemsetMiner<'t> {
    transactions: &'t [Transaction],
    arena: ItemArena,
    encoded: Vec<Vec<ItemIndex>>,
    min_support: f64,
    min_support_count: usize,
}

impl<'t> ItemsetMiner<'t> {
    pub fn new(transactions: &'t [Transaction], min_support: f64) -> AnalysisResult<Self> {
        Self::with_duplicates(transactions, min_support, DuplicateItems::default())
    }

    pub fn with_duplicates(
        transactions: &'t [Transaction],
        min_support: f64,
        duplicates: DuplicateItems,
    ) -> AnalysisResult<Self> {
        ensure_fraction("min_support", min_support)?;

        let arena = ItemArena::sorted(transactions.iter().flatten().map(String::as_str));
        let encoded = transactions
            .iter()
            .map(|transaction| {
                let mut indices = duplicates
                    .apply(transaction)
                    .into_iter()
                    .filter_map(|item| arena.get(item))
                    .collect::<Vec<_>>();
                indices.sort_unstable();
                indices
            })
            .collect();
        let min_support_count =
            ((min_support * transactions.len() as f64).floor() as usize).max(1);

        debug!(
            event_name = "basket.mining.configured",
            transactions = transactions.len(),
            min_support,
            min_support_count,
            "itemset miner ready"
        );

        Ok(Self { transactions, arena, encoded, min_support, min_support_count })
    }

    pub fn num_transactions(&self) -> usize {
        self.transactions.len()
    }

    pub fn min_support(&self) -> f64 {
        self.min_support
    }

    /// Smallest count an itemset needs to be frequent; never below one.
    pub fn min_support_count(&self) -> usize {
        self.min_support_count
    }

    /// Fraction of transactions a count represents.
    pub fn support(&self, count: usize) -> f64 {
        if self.transactions.is_empty() {
            0.0
        } else {
            count as f64 / self.transactions.len() as f64
        }
    }

    pub fn frequent_1_itemsets(&self) -> FrequentItemsets {
        self.named_level(1)
    }

    /// Frequent pairs with their first item lexicographically smaller, sorted by
    /// count descending and then by pair.
    pub fn frequent_pairs(&self) -> Vec<FrequentPair> {
        let pairs = self
            .ranked_pairs()
            .into_iter()
            .map(|(key, count)| FrequentPair {
                first: self.arena.resolve(key[0]).to_owned(),
                second: self.arena.resolve(key[1]).to_owned(),
                count,
            })
            .collect::<Vec<_>>();
        info!(event_name = "basket.mining.pairs", frequent = pairs.len(), "frequent pairs mined");
        pairs
    }

    pub fn top_pairs(&self, n: usize) -> Vec<FrequentPair> {
        let mut pairs = self.frequent_pairs();
        pairs.truncate(n);
        pairs
    }

    pub fn frequent_k_itemsets(&self, k: usize) -> AnalysisResult<FrequentItemsets> {
        ensure_positive("k", k)?;
        Ok(self.named_level(k))
    }

    /// Frequent itemsets for every size from one to `max_k`, stopping at the first
    /// size with no frequent itemset since no larger one can be frequent either.
    pub fn apriori(&self, max_k: usize) -> AnalysisResult<BTreeMap<usize, FrequentItemsets>> {
        ensure_positive("max_k", max_k)?;

        let mut levels = BTreeMap::new();
        for k in 1..=max_k {
            let level = self.named_level(k);
            if level.is_empty() {
                info!(event_name = "basket.mining.apriori_stopped", k, "no frequent itemsets");
                break;
            }
            levels.insert(k, level);
        }
        Ok(levels)
    }

    fn named_level(&self, k: usize) -> FrequentItemsets {
        let level = self
            .frequent_counts(k)
            .into_iter()
            .map(|(key, count)| {
                let items = key.iter().map(|index| self.arena.resolve(*index).to_owned()).collect();
                (Itemset(items), count)
            })
            .collect::<FrequentItemsets>();
        info!(event_name = "basket.mining.level", k, frequent = level.len(), "itemsets mined");
        level
    }

    fn ranked_pairs(&self) -> Vec<(ItemsetKey, usize)> {
        let mut pairs = self.frequent_counts(2).into_iter().collect::<Vec<_>>();
        pairs.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
        pairs
    }

    fn frequent_counts(&self, k: usize) -> HashMap<ItemsetKey, usize> {
        let mut counts: HashMap<ItemsetKey, usize> = HashMap::new();
        for transaction in self.encoded.iter().filter(|transaction| transaction.len() >= k) {
            for_each_combination(transaction, k, |combination| {
                if combination.windows(2).any(|window| window[0] == window[1]) {
                    return;
                }
                match counts.get_mut(combination) {
                    Some(count) => *count += 1,
                    None => {
                        counts.insert(combination.into(), 1);
                    }
                }
            });
        }

        counts.retain(|_, count| *count >= self.min_support_count);
        counts
    }
}

/// Calls `visit` with every k-combination of `items`, preserving their order.
fn for_each_combination(items: &[ItemIndex], k: usize, mut visit: impl FnMut(&[ItemIndex])) {
    let n = items.len();
    if k == 0 || k > n {
        return;
    }

    let mut positions = (0..k).collect::<Vec<_>>();
    let mut combination = Vec::with_capacity(k);
    'combinations: loop {
        combination.clear();
        combination.extend(positions.iter().map(|&position| items[position]));
        visit(&combination);

        for slot in (0..k).rev() {
            if positions[slot] < slot + n - k {
                positions[slot] += 1;
                for next in slot + 1..k {
                    positions[next] = positions[next - 1] + 1;
                }
                continue 'combinations;
            }
        }
        return;
    }
}
