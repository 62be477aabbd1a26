//! MinHash signatures and banded LSH for near-duplicate detection.
//!
//! Signatures are computed per run from random permutations of the shingle
//! universe; nothing here is maintained incrementally. Each hash row is drawn
//! from its own RNG stream derived from the run seed, so the matrix does not
//! depend on the order rows are computed in (with or without `parallel`).

use crate::error::{Error, Result};
use crate::similarity::{jaccard, shingle};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use sha1::{Digest, Sha1};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Signature value of a document with no shingles.
pub const EMPTY_SIGNATURE: u32 = u32::MAX;

const RANDOM_COMPARISONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LshParams {
    pub num_hashes: usize,
    pub bands: usize,
    pub rows_per_band: usize,
    pub shingle_width: usize,
    /// Fixed seed for reproducible runs; `None` draws a fresh one.
    pub seed: Option<u64>,
}

impl Default for LshParams {
    fn default() -> Self {
        Self { num_hashes: 100, bands: 10, rows_per_band: 10, shingle_width: 2, seed: None }
    }
}

impl LshParams {
    /// `num_hashes` split into `bands` equal bands.
    pub fn with_bands(num_hashes: usize, bands: usize) -> Self {
        let rows_per_band = if bands == 0 { 0 } else { num_hashes / bands };
        Self { num_hashes, bands, rows_per_band, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        check_banding(self.num_hashes, self.bands, self.rows_per_band)?;
        if self.shingle_width == 0 {
            return Err(Error::ZeroParameter("shingle_width"));
        }
        Ok(())
    }
}

fn check_banding(num_hashes: usize, bands: usize, rows_per_band: usize) -> Result<()> {
    if num_hashes == 0 {
        return Err(Error::ZeroParameter("num_hashes"));
    }
    if bands == 0 {
        return Err(Error::ZeroParameter("bands"));
    }
    if rows_per_band == 0 {
        return Err(Error::ZeroParameter("rows_per_band"));
    }
    if bands.checked_mul(rows_per_band) != Some(num_hashes) {
        return Err(Error::BandMismatch { bands, rows_per_band, num_hashes });
    }
    Ok(())
}

/// One row per hash function, one column per document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMatrix {
    rows: Vec<Vec<u32>>,
    num_documents: usize,
}

impl SignatureMatrix {
    pub fn num_hashes(&self) -> usize {
        self.rows.len()
    }

    pub fn num_documents(&self) -> usize {
        self.num_documents
    }

    pub fn column(&self, document: usize) -> Vec<u32> {
        self.rows.iter().map(|row| row[document]).collect()
    }

    /// Fraction of rows on which two columns agree; estimates Jaccard similarity.
    pub fn estimated_similarity(&self, a: usize, b: usize) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        let agree = self
            .rows
            .iter()
            .filter(|row| row[a] == row[b] && row[a] != EMPTY_SIGNATURE)
            .count();
        agree as f64 / self.rows.len() as f64
    }
}

/// MinHash signatures over `shingle_sets` with `num_hashes` random permutations.
pub fn signature_matrix(
    shingle_sets: &[HashSet<String>],
    num_hashes: usize,
    seed: u64,
) -> Result<SignatureMatrix> {
    if num_hashes == 0 {
        return Err(Error::ZeroParameter("num_hashes"));
    }
    let universe: BTreeSet<&str> = shingle_sets.iter().flatten().map(String::as_str).collect();
    let positions: HashMap<&str, u32> =
        universe.iter().enumerate().map(|(i, s)| (*s, i as u32)).collect();
    let members: Vec<Vec<u32>> = shingle_sets
        .iter()
        .map(|set| set.iter().map(|s| positions[s.as_str()]).collect())
        .collect();
    let universe_size = universe.len() as u32;

    let row = |hash: usize| signature_row(row_seed(seed, hash), universe_size, &members);
    #[cfg(feature = "parallel")]
    let rows: Vec<Vec<u32>> = (0..num_hashes).into_par_iter().map(row).collect();
    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Vec<u32>> = (0..num_hashes).map(row).collect();

    tracing::debug!(
        num_hashes,
        num_documents = shingle_sets.len(),
        universe_size,
        "computed minhash signatures"
    );
    Ok(SignatureMatrix { rows, num_documents: shingle_sets.len() })
}

fn row_seed(seed: u64, hash: usize) -> u64 {
    seed ^ (hash as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn signature_row(seed: u64, universe_size: u32, members: &[Vec<u32>]) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut permutation: Vec<u32> = (0..universe_size).collect();
    permutation.shuffle(&mut rng);
    members
        .iter()
        .map(|shingles| {
            shingles
                .iter()
                .map(|&s| permutation[s as usize])
                .min()
                .unwrap_or(EMPTY_SIGNATURE)
        })
        .collect()
}

/// Bucket key of one band: the band's values in decimal, comma separated,
/// SHA-1 hashed and hex encoded.
pub fn band_key(values: &[u32]) -> String {
    let joined = values.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One bucket table per band: band key -> document indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LshBuckets {
    bands: Vec<HashMap<String, Vec<usize>>>,
}

impl LshBuckets {
    pub fn num_bands(&self) -> usize {
        self.bands.len()
    }

    /// Every bucket of every band.
    pub fn buckets(&self) -> impl Iterator<Item = &[usize]> {
        self.bands.iter().flat_map(|band| band.values().map(Vec::as_slice))
    }

    /// Document pairs `(a, b)` with `a < b` that share at least one bucket.
    pub fn candidate_pairs(&self) -> BTreeSet<(usize, usize)> {
        let mut pairs = BTreeSet::new();
        for bucket in self.buckets() {
            for (i, &a) in bucket.iter().enumerate() {
                for &b in &bucket[i + 1..] {
                    if a != b {
                        pairs.insert((a.min(b), a.max(b)));
                    }
                }
            }
        }
        pairs
    }

    pub fn share_bucket(&self, a: usize, b: usize) -> bool {
        self.buckets().any(|bucket| bucket.contains(&a) && bucket.contains(&b))
    }

    /// Candidate near-duplicates of `document`, sorted.
    pub fn neighbours(&self, document: usize) -> Vec<usize> {
        let mut found: BTreeSet<usize> = BTreeSet::new();
        for bucket in self.buckets().filter(|bucket| bucket.contains(&document)) {
            found.extend(bucket.iter().copied().filter(|&d| d != document));
        }
        found.into_iter().collect()
    }
}

/// Split each signature column into `bands` slices of `rows_per_band` rows
/// and group documents with equal slices.
///
/// Documents without shingles are left out of every bucket.
pub fn lsh_buckets(
    signature: &SignatureMatrix,
    bands: usize,
    rows_per_band: usize,
) -> Result<LshBuckets> {
    check_banding(signature.num_hashes(), bands, rows_per_band)?;
    let mut tables: Vec<HashMap<String, Vec<usize>>> = vec![HashMap::new(); bands];
    for document in 0..signature.num_documents() {
        let column = signature.column(document);
        if column.iter().all(|&v| v == EMPTY_SIGNATURE) {
            continue;
        }
        for (band, values) in column.chunks(rows_per_band).enumerate() {
            tables[band].entry(band_key(values)).or_default().push(document);
        }
    }
    tracing::debug!(
        bands,
        rows_per_band,
        buckets = tables.iter().map(HashMap::len).sum::<usize>(),
        "assigned lsh buckets"
    );
    Ok(LshBuckets { bands: tables })
}

/// Near-duplicate detector over a fixed list of raw document texts.
pub struct MinHashLsh {
    documents: Vec<String>,
    shingles: Vec<HashSet<String>>,
    params: LshParams,
    seed: u64,
}

impl MinHashLsh {
    pub fn new(documents: Vec<String>, params: LshParams) -> Result<Self> {
        params.validate()?;
        let shingles = documents.iter().map(|doc| shingle(doc, params.shingle_width)).collect();
        let seed = params.seed.unwrap_or_else(rand::random);
        Ok(Self { documents, shingles, params, seed })
    }

    pub fn jaccard_score(&self, a: usize, b: usize) -> f64 {
        match (self.shingles.get(a), self.shingles.get(b)) {
            (Some(a), Some(b)) => jaccard(a, b),
            _ => 0.0,
        }
    }

    pub fn min_hash_signature(&self) -> Result<SignatureMatrix> {
        signature_matrix(&self.shingles, self.params.num_hashes, self.seed)
    }

    pub fn perform_lsh(&self) -> Result<LshBuckets> {
        let signature = self.min_hash_signature()?;
        lsh_buckets(&signature, self.params.bands, self.params.rows_per_band)
    }

    /// Offline calibration of a bucketing.
    ///
    /// For every pair of documents sharing a bucket, draws five documents from
    /// outside that bucket and checks whether the pair's true Jaccard
    /// similarity beats all five. Returns the fraction of pairs that do, or
    /// `None` when no pair could be checked.
    pub fn jaccard_similarity_test<R: Rng + ?Sized>(
        &self,
        buckets: &LshBuckets,
        rng: &mut R,
    ) -> Option<f64> {
        let mut checked = 0usize;
        let mut correct = 0usize;
        for bucket in buckets.buckets() {
            let members: BTreeSet<usize> = bucket.iter().copied().collect();
            if members.len() < 2 {
                continue;
            }
            let outsiders: Vec<usize> =
                (0..self.documents.len()).filter(|d| !members.contains(d)).collect();
            if outsiders.is_empty() {
                continue;
            }
            let members: Vec<usize> = members.into_iter().collect();
            for (i, &first) in members.iter().enumerate() {
                for &second in &members[i + 1..] {
                    checked += 1;
                    let near = self.jaccard_score(first, second);
                    let beats_all = (0..RANDOM_COMPARISONS).all(|_| {
                        let other = outsiders.choose(&mut *rng).copied().unwrap_or(first);
                        near > self.jaccard_score(first, other)
                    });
                    if beats_all {
                        correct += 1;
                    }
                }
            }
        }
        if checked == 0 {
            return None;
        }
        let score = correct as f64 / checked as f64;
        tracing::info!(checked, correct, score, "near-duplicate calibration");
        Some(score)
    }
}

fn find(parent: &mut BTreeMap<usize, usize>, x: usize) -> usize {
    let p = *parent.entry(x).or_insert(x);
    if p == x {
        return x;
    }
    let root = find(parent, p);
    parent.insert(x, root);
    root
}

/// Group candidate pairs into connected clusters of near-duplicates.
pub fn duplicate_clusters(pairs: &BTreeSet<(usize, usize)>) -> Vec<Vec<usize>> {
    let mut parent: BTreeMap<usize, usize> = BTreeMap::new();
    for &(a, b) in pairs {
        let ra = find(&mut parent, a);
        let rb = find(&mut parent, b);
        if ra != rb {
            parent.insert(ra.max(rb), ra.min(rb));
        }
    }
    let nodes: Vec<usize> = parent.keys().copied().collect();
    let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for node in nodes {
        let root = find(&mut parent, node);
        clusters.entry(root).or_default().push(node);
    }
    clusters.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_uneven_banding() {
        let params =
            LshParams { num_hashes: 100, bands: 7, rows_per_band: 14, ..LshParams::default() };
        assert!(matches!(params.validate(), Err(Error::BandMismatch { .. })));
        assert!(matches!(
            LshParams::with_bands(100, 0).validate(),
            Err(Error::ZeroParameter("bands"))
        ));
        assert!(LshParams::with_bands(100, 20).validate().is_ok());
    }

    #[test]
    fn same_seed_same_signature() {
        let sets = vec![shingle("the quick brown fox", 2), shingle("a lazy dog", 2)];
        let a = signature_matrix(&sets, 16, 7).unwrap();
        let b = signature_matrix(&sets, 16, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.num_hashes(), 16);
        assert_eq!(a.num_documents(), 2);
    }

    #[test]
    fn band_key_is_stable() {
        assert_eq!(band_key(&[1, 2, 3]), band_key(&[1, 2, 3]));
        assert_ne!(band_key(&[1, 2, 3]), band_key(&[12, 3]));
        assert_eq!(band_key(&[1, 2, 3]).len(), 40);
    }

    #[test]
    fn clusters_join_transitively() {
        let pairs: BTreeSet<(usize, usize)> = [(0, 1), (1, 4), (2, 3)].into_iter().collect();
        assert_eq!(duplicate_clusters(&pairs), vec![vec![0, 1, 4], vec![2, 3]]);
    }
}
