//! Relevance scoring over one field sub-index.
//!
//! Three models are supported: SMART-weighted vector space, Okapi BM25 and a
//! unigram query-likelihood model with three smoothing strategies. Only
//! documents that hold at least one query term are scored, and nothing is
//! sorted here; see [`rank`] for top-k selection.

use crate::document::DocId;
use crate::error::{Error, Result};
use crate::index::SubIndex;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

pub const BM25_K1: f64 = 1.5;
pub const BM25_B: f64 = 0.75;

/// Term-frequency component of a SMART code (first letter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TfWeight {
    /// `n`: raw count.
    Natural,
    /// `l`: `1 + ln(tf)` for positive counts, 0 otherwise.
    Logarithm,
}

/// Document-frequency component of a SMART code (second letter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdfWeight {
    /// `n`
    None,
    /// `t`: `ln(N / df)`
    Idf,
}

/// Normalisation component (third letter). Parsed but not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    None,
    Cosine,
}

/// Weighting for one side (document or query), e.g. `ltc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SideScheme {
    pub tf: TfWeight,
    pub idf: IdfWeight,
    pub normalization: Normalization,
}

impl SideScheme {
    fn weight(&self, tf: u32, idf: impl FnOnce() -> f64) -> f64 {
        let tf = match self.tf {
            TfWeight::Natural => f64::from(tf),
            TfWeight::Logarithm if tf > 0 => 1.0 + f64::from(tf).ln(),
            TfWeight::Logarithm => 0.0,
        };
        let idf = match self.idf {
            IdfWeight::None => 1.0,
            IdfWeight::Idf => idf(),
        };
        tf * idf
    }
}

impl FromStr for SideScheme {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self> {
        let invalid = || Error::InvalidWeightingScheme(code.to_string());
        let chars: Vec<char> = code.chars().collect();
        let [tf, idf, norm] = chars[..] else {
            return Err(invalid());
        };
        let tf = match tf {
            'n' => TfWeight::Natural,
            'l' => TfWeight::Logarithm,
            _ => return Err(invalid()),
        };
        let idf = match idf {
            'n' => IdfWeight::None,
            't' => IdfWeight::Idf,
            _ => return Err(invalid()),
        };
        let normalization = match norm {
            'n' => Normalization::None,
            'c' => Normalization::Cosine,
            _ => return Err(invalid()),
        };
        Ok(Self { tf, idf, normalization })
    }
}

impl fmt::Display for SideScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tf = match self.tf {
            TfWeight::Natural => 'n',
            TfWeight::Logarithm => 'l',
        };
        let idf = match self.idf {
            IdfWeight::None => 'n',
            IdfWeight::Idf => 't',
        };
        let norm = match self.normalization {
            Normalization::None => 'n',
            Normalization::Cosine => 'c',
        };
        write!(f, "{tf}{idf}{norm}")
    }
}

/// A `document.query` pair of SMART codes such as `lnc.ltc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmartScheme {
    pub document: SideScheme,
    pub query: SideScheme,
}

impl FromStr for SmartScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (document, query) = s
            .split_once('.')
            .ok_or_else(|| Error::InvalidWeightingScheme(s.to_string()))?;
        Ok(Self { document: document.parse()?, query: query.parse()? })
    }
}

impl fmt::Display for SmartScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.document, self.query)
    }
}

/// Smoothing for the unigram language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Smoothing {
    /// Maximum likelihood `tf / |d|`; unseen terms get probability 0.
    Naive,
    /// Dirichlet-style `(tf + α) / (|d| + α·|V|)`.
    Bayes,
    /// `λ·tf/|d| + (1-λ)·cf/|C|`.
    Mixture,
}

impl FromStr for Smoothing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "naive" => Ok(Smoothing::Naive),
            "bayes" => Ok(Smoothing::Bayes),
            "mixture" => Ok(Smoothing::Mixture),
            _ => Err(Error::UnknownSmoothing(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnigramParams {
    pub alpha: f64,
    pub lambda: f64,
}

impl Default for UnigramParams {
    fn default() -> Self {
        Self { alpha: 0.5, lambda: 0.5 }
    }
}

/// A ranking model selected by name.
///
/// Accepted forms: `lnc.ltc` (any SMART pair), `bm25` / `okapibm25`, and
/// `unigram:naive|bayes|mixture`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetrievalMethod {
    VectorSpace(SmartScheme),
    OkapiBm25,
    Unigram(Smoothing),
}

impl FromStr for RetrievalMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "bm25" | "okapibm25" | "okapi_bm25" | "okapi-bm25" => {
                return Ok(RetrievalMethod::OkapiBm25);
            }
            _ => {}
        }
        if let Some(smoothing) = lower.strip_prefix("unigram:") {
            return smoothing.parse().map(RetrievalMethod::Unigram);
        }
        if lower.contains('.') {
            return lower.parse().map(RetrievalMethod::VectorSpace);
        }
        Err(Error::UnknownMethod(s.to_string()))
    }
}

/// Scores documents of one sub-index against term queries.
///
/// idf values are cached per term for the life of the scorer. The cache sits
/// behind a lock so one scorer can serve several threads.
pub struct Scorer<'a> {
    index: &'a SubIndex,
    num_documents: usize,
    idf: RwLock<HashMap<String, f64>>,
}

impl<'a> Scorer<'a> {
    pub fn new(index: &'a SubIndex, num_documents: usize) -> Self {
        Self { index, num_documents, idf: RwLock::new(HashMap::new()) }
    }

    /// Union of the postings of every query term found in the index.
    pub fn candidate_documents<S: AsRef<str>>(&self, query: &[S]) -> HashSet<DocId> {
        query
            .iter()
            .filter_map(|term| self.index.get(term.as_ref()))
            .flat_map(|postings| postings.keys().cloned())
            .collect()
    }

    /// `ln(N / df)`; `None` for terms the index does not hold.
    pub fn idf(&self, term: &str) -> Option<f64> {
        if let Some(&idf) = self.idf.read().get(term) {
            return Some(idf);
        }
        // Present terms always have df >= 1.
        let df = self.index.get(term)?.len();
        let idf = (self.num_documents as f64 / df as f64).ln();
        self.idf.write().insert(term.to_string(), idf);
        Some(idf)
    }

    fn query_term_frequencies<'q, S: AsRef<str>>(query: &'q [S]) -> HashMap<&'q str, u32> {
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for term in query {
            *counts.entry(term.as_ref()).or_insert(0) += 1;
        }
        counts
    }

    /// Sums `w(d, t) * w(q, t)` over every query token, so a repeated term
    /// contributes once per occurrence on top of its query tf weight.
    pub fn compute_scores_with_vector_space_model<S: AsRef<str>>(
        &self,
        query: &[S],
        scheme: SmartScheme,
    ) -> HashMap<DocId, f64> {
        let query_tfs = Self::query_term_frequencies(query);
        self.candidate_documents(query)
            .into_iter()
            .map(|doc_id| {
                let score = self.vector_space_score(query, &query_tfs, &doc_id, scheme);
                (doc_id, score)
            })
            .collect()
    }

    fn vector_space_score<S: AsRef<str>>(
        &self,
        query: &[S],
        query_tfs: &HashMap<&str, u32>,
        doc_id: &str,
        scheme: SmartScheme,
    ) -> f64 {
        let mut score = 0.0;
        for term in query {
            let term = term.as_ref();
            let Some(postings) = self.index.get(term) else {
                continue;
            };
            let tf = postings.get(doc_id).copied().unwrap_or(0);
            let query_tf = query_tfs.get(term).copied().unwrap_or(0);
            let idf = || self.idf(term).unwrap_or(0.0);
            let doc_weight = scheme.document.weight(tf, idf);
            let query_weight = scheme.query.weight(query_tf, idf);
            score += doc_weight * query_weight;
        }
        score
    }

    /// Okapi BM25 with `k1 = 1.5`, `b = 0.75`.
    ///
    /// `document_lengths` and `average_length` are taken as given, so any
    /// field's length table can be used. Ids missing from the table have
    /// length 0.
    pub fn compute_scores_with_okapi_bm25<S: AsRef<str>>(
        &self,
        query: &[S],
        average_length: f64,
        document_lengths: &HashMap<DocId, f64>,
    ) -> Result<HashMap<DocId, f64>> {
        if !average_length.is_finite() || average_length <= 0.0 {
            return Err(Error::NonPositiveAverageLength(average_length));
        }
        let scores = self
            .candidate_documents(query)
            .into_iter()
            .map(|doc_id| {
                let doc_len = document_lengths.get(&doc_id).copied().unwrap_or(0.0);
                let score = self.okapi_bm25_score(query, &doc_id, doc_len, average_length);
                (doc_id, score)
            })
            .collect();
        Ok(scores)
    }

    fn okapi_bm25_score<S: AsRef<str>>(
        &self,
        query: &[S],
        doc_id: &str,
        doc_len: f64,
        average_length: f64,
    ) -> f64 {
        let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * (doc_len / average_length));
        let mut score = 0.0;
        for term in query {
            let term = term.as_ref();
            let Some(postings) = self.index.get(term) else {
                continue;
            };
            let tf = f64::from(postings.get(doc_id).copied().unwrap_or(0));
            let idf = self.idf(term).unwrap_or(0.0);
            score += idf * (tf * (BM25_K1 + 1.0)) / (tf + norm);
        }
        score
    }

    /// Query log-likelihood under a smoothed unigram model of each document.
    ///
    /// Terms whose smoothed probability is not positive add nothing instead
    /// of `ln(0)`.
    pub fn compute_scores_with_unigram_model<S: AsRef<str>>(
        &self,
        query: &[S],
        smoothing: Smoothing,
        document_lengths: &HashMap<DocId, f64>,
        params: UnigramParams,
    ) -> HashMap<DocId, f64> {
        let collection_size: f64 = document_lengths.values().sum();
        let collection_tfs: HashMap<&str, f64> = query
            .iter()
            .map(|term| {
                let term = term.as_ref();
                let cf = self
                    .index
                    .get(term)
                    .map(|postings| {
                        postings
                            .iter()
                            .filter(|(doc_id, _)| document_lengths.contains_key(*doc_id))
                            .map(|(_, &tf)| f64::from(tf))
                            .sum::<f64>()
                    })
                    .unwrap_or(0.0);
                (term, cf)
            })
            .collect();
        let model = UnigramModel {
            smoothing,
            params,
            vocabulary_size: self.index.len() as f64,
            collection_size,
            collection_tfs,
        };

        self.candidate_documents(query)
            .into_iter()
            .map(|doc_id| {
                let doc_len = document_lengths.get(&doc_id).copied().unwrap_or(0.0);
                let score: f64 = query
                    .iter()
                    .map(|term| {
                        let term = term.as_ref();
                        let tf = self
                            .index
                            .get(term)
                            .and_then(|postings| postings.get(&doc_id))
                            .copied()
                            .unwrap_or(0);
                        let p = model.probability(term, f64::from(tf), doc_len);
                        if p > 0.0 {
                            p.ln()
                        } else {
                            0.0
                        }
                    })
                    .sum();
                (doc_id, score)
            })
            .collect()
    }

    /// Dispatch on a parsed [`RetrievalMethod`].
    pub fn score<S: AsRef<str>>(
        &self,
        query: &[S],
        method: RetrievalMethod,
        document_lengths: &HashMap<DocId, f64>,
        average_length: f64,
        params: UnigramParams,
    ) -> Result<HashMap<DocId, f64>> {
        match method {
            RetrievalMethod::VectorSpace(scheme) => {
                Ok(self.compute_scores_with_vector_space_model(query, scheme))
            }
            RetrievalMethod::OkapiBm25 => {
                self.compute_scores_with_okapi_bm25(query, average_length, document_lengths)
            }
            RetrievalMethod::Unigram(smoothing) => {
                let lengths = document_lengths;
                Ok(self.compute_scores_with_unigram_model(query, smoothing, lengths, params))
            }
        }
    }
}

struct UnigramModel<'q> {
    smoothing: Smoothing,
    params: UnigramParams,
    vocabulary_size: f64,
    collection_size: f64,
    collection_tfs: HashMap<&'q str, f64>,
}

impl UnigramModel<'_> {
    fn probability(&self, term: &str, tf: f64, doc_len: f64) -> f64 {
        let document_estimate = if doc_len > 0.0 { tf / doc_len } else { 0.0 };
        match self.smoothing {
            Smoothing::Naive => document_estimate,
            Smoothing::Bayes => {
                let denominator = doc_len + self.params.alpha * self.vocabulary_size;
                if denominator > 0.0 {
                    (tf + self.params.alpha) / denominator
                } else {
                    0.0
                }
            }
            Smoothing::Mixture => {
                let cf = self.collection_tfs.get(term).copied().unwrap_or(0.0);
                let collection_estimate =
                    if self.collection_size > 0.0 { cf / self.collection_size } else { 0.0 };
                let lambda = self.params.lambda;
                lambda * document_estimate + (1.0 - lambda) * collection_estimate
            }
        }
    }
}

/// Top `k` documents by descending score; equal scores order by id.
pub fn rank(scores: &HashMap<DocId, f64>, k: usize) -> Vec<(DocId, f64)> {
    let mut ranked: Vec<(DocId, f64)> = scores.iter().map(|(id, &s)| (id.clone(), s)).collect();
    ranked.sort_by(|a, b| match b.1.total_cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_smart_codes() {
        let scheme: SmartScheme = "lnc.ltc".parse().unwrap();
        assert_eq!(scheme.document.tf, TfWeight::Logarithm);
        assert_eq!(scheme.document.idf, IdfWeight::None);
        assert_eq!(scheme.query.idf, IdfWeight::Idf);
        assert_eq!(scheme.to_string(), "lnc.ltc");

        for bad in ["lnc", "lnc.lt", "xnc.ltc", "lnc.ltcc", "lnq.ltc"] {
            let parsed = bad.parse::<SmartScheme>();
            assert!(matches!(parsed, Err(Error::InvalidWeightingScheme(_))), "{bad}");
        }
    }

    #[test]
    fn parses_methods() {
        assert_eq!("OkapiBM25".parse::<RetrievalMethod>().unwrap(), RetrievalMethod::OkapiBm25);
        assert_eq!(
            "unigram:mixture".parse::<RetrievalMethod>().unwrap(),
            RetrievalMethod::Unigram(Smoothing::Mixture)
        );
        let parse = |s: &str| s.parse::<RetrievalMethod>();
        assert!(matches!(parse("unigram:laplace"), Err(Error::UnknownSmoothing(_))));
        assert!(matches!(parse("tfidf"), Err(Error::UnknownMethod(_))));
        assert!(matches!(parse("ltn.lnn"), Ok(RetrievalMethod::VectorSpace(_))));
    }

    #[test]
    fn log_tf_of_zero_is_zero() {
        let side: SideScheme = "lnn".parse().unwrap();
        assert_eq!(side.weight(0, || 1.0), 0.0);
        assert_eq!(side.weight(1, || 1.0), 1.0);
        let natural: SideScheme = "ntn".parse().unwrap();
        assert_eq!(natural.weight(3, || 2.0), 6.0);
    }

    #[test]
    fn rank_breaks_ties_by_id() {
        let scores: HashMap<DocId, f64> = [("b", 1.0), ("a", 1.0), ("c", 2.0)]
            .into_iter()
            .map(|(id, score)| (id.to_string(), score))
            .collect();
        let ids: Vec<DocId> = rank(&scores, 2).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, ["c", "a"]);
    }
}
