use crate::document::{DocId, Field};
use crate::index::SubIndex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Exclusive lower bounds on a term's total occurrence count.
///
/// A term goes to the first tier when its count is `> first`, to the second
/// when it is `> second`, otherwise to the third.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub first: u64,
    pub second: u64,
}

impl TierThresholds {
    pub fn new(first: u64, second: u64) -> Self {
        Self { first, second }
    }

    /// Per-field defaults. Cast names repeat rarely, genres almost always,
    /// summary words in between.
    pub fn for_field(field: Field) -> Self {
        match field {
            Field::Stars => Self::new(3, 2),
            Field::Genres => Self::new(1, 0),
            Field::Summaries => Self::new(10, 5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    First,
    Second,
    Third,
}

/// Snapshot partition of one sub-index's terms into three tiers.
///
/// Built from the index as it was at construction time: later adds or
/// removes on the source index are not reflected until it is rebuilt.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TieredIndex {
    pub first_tier: SubIndex,
    pub second_tier: SubIndex,
    pub third_tier: SubIndex,
}

impl TieredIndex {
    pub fn build(sub_index: &SubIndex, thresholds: TierThresholds) -> Self {
        let mut tiered = Self::default();
        for (term, postings) in sub_index {
            let total: u64 = postings.values().map(|&tf| u64::from(tf)).sum();
            let tier = if total > thresholds.first {
                &mut tiered.first_tier
            } else if total > thresholds.second {
                &mut tiered.second_tier
            } else {
                &mut tiered.third_tier
            };
            tier.insert(term.clone(), postings.clone());
        }
        tracing::debug!(
            first = tiered.first_tier.len(),
            second = tiered.second_tier.len(),
            third = tiered.third_tier.len(),
            "built tiered index"
        );
        tiered
    }

    pub fn tier(&self, tier: Tier) -> &SubIndex {
        match tier {
            Tier::First => &self.first_tier,
            Tier::Second => &self.second_tier,
            Tier::Third => &self.third_tier,
        }
    }

    pub fn tier_of(&self, term: &str) -> Option<Tier> {
        [Tier::First, Tier::Second, Tier::Third]
            .into_iter()
            .find(|&tier| self.tier(tier).contains_key(term))
    }

    pub fn num_terms(&self) -> usize {
        self.first_tier.len() + self.second_tier.len() + self.third_tier.len()
    }

    /// Documents matching any of `terms`, probing the first tier and only
    /// dropping to lower tiers while fewer than `min_candidates` were found.
    pub fn candidates<S: AsRef<str>>(&self, terms: &[S], min_candidates: usize) -> BTreeSet<DocId> {
        let mut found = BTreeSet::new();
        for tier in [Tier::First, Tier::Second, Tier::Third] {
            let postings = self.tier(tier);
            for term in terms {
                if let Some(list) = postings.get(term.as_ref()) {
                    found.extend(list.keys().cloned());
                }
            }
            if found.len() >= min_candidates {
                break;
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PostingList;

    fn postings(counts: &[(&str, u32)]) -> PostingList {
        counts.iter().map(|(id, tf)| (id.to_string(), *tf)).collect()
    }

    #[test]
    fn ties_at_threshold_fall_to_lower_tier() {
        let mut sub_index = SubIndex::new();
        sub_index.insert("drama".into(), postings(&[("a", 1), ("b", 1)]));
        sub_index.insert("crime".into(), postings(&[("a", 1)]));
        sub_index.insert("noir".into(), postings(&[("c", 3)]));

        let tiered = TieredIndex::build(&sub_index, TierThresholds::new(2, 1));
        assert_eq!(tiered.tier_of("noir"), Some(Tier::First));
        assert_eq!(tiered.tier_of("drama"), Some(Tier::Second));
        assert_eq!(tiered.tier_of("crime"), Some(Tier::Third));
        assert_eq!(tiered.tier_of("western"), None);
    }

    #[test]
    fn falls_back_only_when_short() {
        let mut sub_index = SubIndex::new();
        sub_index.insert("heist".into(), postings(&[("a", 4)]));
        sub_index.insert("bank".into(), postings(&[("b", 1)]));
        let tiered = TieredIndex::build(&sub_index, TierThresholds::new(2, 1));

        let terms = ["heist", "bank"];
        assert_eq!(tiered.candidates(&terms, 1).len(), 1);
        assert_eq!(tiered.candidates(&terms, 2).len(), 2);
    }
}
