use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::ItemsetMiner;
use crate::errors::{ensure_fraction, AnalysisResult};
use crate::item::ItemIndex;
#[cfg(doc)]
use crate::transactions::DuplicateItems;

/// A directional rule `antecedent -> consequent` derived from a frequent pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    pub antecedent: String,
    pub consequent: String,
    /// Transactions containing both items.
    pub count: usize,
    /// Within `[0, 1]` under [`DuplicateItems::Collapse`]. Under the default
    /// [`DuplicateItems::Count`] a basket listing an item twice counts twice, and
    /// this can exceed 1.
    pub support: f64,
    /// Within `[0, 1]` under [`DuplicateItems::Collapse`] only, as for `support`.
    pub confidence: f64,
    pub lift: f64,
}

impl<'t> ItemsetMiner<'t> {
    /// Rules from frequent pairs, sorted by confidence descending.
    ///
    /// Each pair is evaluated in both directions. A direction whose antecedent or
    /// consequent is not a frequent single item is skipped, as lift would be
    /// undefined.
    ///
    /// Support and confidence stay within `[0, 1]` only when the miner collapses
    /// repeated items. With [`DuplicateItems::Count`] they can exceed 1; such rules
    /// are still returned and a `basket.mining.rule_out_of_bounds` warning is logged
    /// for each one.
    pub fn association_rules(&self, min_confidence: f64) -> AnalysisResult<Vec<AssociationRule>> {
        ensure_fraction("min_confidence", min_confidence)?;

        let singles = self
            .frequent_counts(1)
            .into_iter()
            .map(|(key, count)| (key[0], count))
            .collect::<HashMap<ItemIndex, usize>>();

        let mut rules = Vec::new();
        for (pair, count) in self.ranked_pairs() {
            for (antecedent, consequent) in [(pair[0], pair[1]), (pair[1], pair[0])] {
                if let Some(rule) =
                    self.rule(antecedent, consequent, count, &singles, min_confidence)
                {
                    rules.push(rule);
                }
            }
        }
        rules.sort_by(|left, right| right.confidence.total_cmp(&left.confidence));

        info!(
            event_name = "basket.mining.rules",
            rules = rules.len(),
            min_confidence,
            "association rules derived"
        );
        Ok(rules)
    }

    fn rule(
        &self,
        antecedent: ItemIndex,
        consequent: ItemIndex,
        count: usize,
        singles: &HashMap<ItemIndex, usize>,
        min_confidence: f64,
    ) -> Option<AssociationRule> {
        let antecedent_count = singles.get(&antecedent).copied().filter(|count| *count > 0)?;
        let consequent_count = singles.get(&consequent).copied().filter(|count| *count > 0)?;

        let confidence = count as f64 / antecedent_count as f64;
        if confidence < min_confidence {
            return None;
        }

        let support = self.support(count);
        let lift = support / (self.support(antecedent_count) * self.support(consequent_count));
        let antecedent = self.arena.resolve(antecedent);
        let consequent = self.arena.resolve(consequent);
        if support > 1.0 || confidence > 1.0 {
            warn!(
                event_name = "basket.mining.rule_out_of_bounds",
                antecedent,
                consequent,
                support,
                confidence,
                "rule metric above 1; repeated items are counted per occurrence"
            );
        }
        Some(AssociationRule {
            antecedent: antecedent.to_owned(),
            consequent: consequent.to_owned(),
            count,
            support,
            confidence,
            lift,
        })
    }
}
