use crate::similarity::{jaccard, shingle};
use std::collections::{HashMap, HashSet};

pub const SHINGLE_WIDTH: usize = 2;
pub const MAX_CANDIDATES: usize = 5;

/// Shingle-based spelling correction against a fixed token corpus.
///
/// Built once; later corpus changes need a new corrector.
#[derive(Debug, Clone, Default)]
pub struct SpellCorrector {
    // Distinct tokens in first-seen order, each with its shingle set.
    vocabulary: Vec<(String, HashSet<String>)>,
    counts: HashMap<String, u64>,
}

impl SpellCorrector {
    /// Build from whitespace-separated texts.
    pub fn new<I, S>(corpus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut corrector = Self::default();
        for text in corpus {
            for word in text.as_ref().split_whitespace() {
                let count = corrector.counts.entry(word.to_string()).or_insert(0);
                if *count == 0 {
                    corrector.vocabulary.push((word.to_string(), shingle(word, SHINGLE_WIDTH)));
                }
                *count += 1;
            }
        }
        tracing::debug!(vocabulary = corrector.vocabulary.len(), "built spell corrector");
        corrector
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Occurrences of `word` in the corpus.
    pub fn word_count(&self, word: &str) -> u64 {
        self.counts.get(word).copied().unwrap_or(0)
    }

    /// Up to five corpus words most similar to `word`, best first, each with
    /// its Jaccard score. Words with zero similarity are never returned; ties
    /// keep corpus order.
    pub fn scored_candidates(&self, word: &str) -> Vec<(&str, f64)> {
        let shingles = shingle(word, SHINGLE_WIDTH);
        let mut candidates: Vec<(&str, f64)> = self
            .vocabulary
            .iter()
            .map(|(candidate, candidate_shingles)| {
                (candidate.as_str(), jaccard(&shingles, candidate_shingles))
            })
            .filter(|&(_, score)| score > 0.0)
            .collect();
        // Stable sort so equal scores stay in insertion order.
        candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
        candidates.truncate(MAX_CANDIDATES);
        candidates
    }

    pub fn nearest_candidates(&self, word: &str) -> Vec<&str> {
        self.scored_candidates(word).into_iter().map(|(candidate, _)| candidate).collect()
    }

    /// Replace every token by its best candidate, keeping tokens with no
    /// candidate as they are. Tokens are re-joined with single spaces.
    pub fn correct(&self, query: &str) -> String {
        query
            .split_whitespace()
            .map(|word| self.nearest_candidates(word).first().copied().unwrap_or(word))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_occurrences() {
        let corrector = SpellCorrector::new(["the shawshank redemption", "the godfather"]);
        assert_eq!(corrector.word_count("the"), 2);
        assert_eq!(corrector.word_count("batman"), 0);
        assert_eq!(corrector.vocabulary_size(), 4);
    }

    #[test]
    fn exact_word_ranks_first() {
        let corrector = SpellCorrector::new(["drama dram drams"]);
        let candidates = corrector.scored_candidates("drama");
        assert_eq!(candidates[0], ("drama", 1.0));
        assert!(candidates.iter().all(|&(_, score)| score > 0.0));
    }

    #[test]
    fn keeps_at_most_five() {
        let corrector = SpellCorrector::new(["ab abc abd abe abf abg abh"]);
        assert_eq!(corrector.nearest_candidates("ab").len(), MAX_CANDIDATES);
        assert_eq!(corrector.nearest_candidates("ab")[0], "ab");
    }

    #[test]
    fn ties_keep_corpus_order() {
        let corrector = SpellCorrector::new(["abx aby"]);
        assert_eq!(corrector.nearest_candidates("ab"), ["abx", "aby"]);
    }
}
