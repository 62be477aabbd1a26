/// Configuration and domain errors raised by the indexing core.
///
/// File I/O goes through [`crate::persist`] and reports `anyhow` errors instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A SMART weighting code was not of the form `(n|l)(n|t)(n|c)`.
    #[error("invalid weighting scheme: {0:?}")]
    InvalidWeightingScheme(String),
    /// Smoothing name was not one of `naive`, `bayes`, `mixture`.
    #[error("unknown smoothing method: {0:?}")]
    UnknownSmoothing(String),
    /// Retrieval method string could not be parsed.
    #[error("unknown retrieval method: {0:?}")]
    UnknownMethod(String),
    /// Field or sub-index name not recognised.
    #[error("unknown field: {0:?}")]
    UnknownField(String),
    /// LSH banding does not cover the signature exactly.
    #[error("{bands} bands of {rows_per_band} rows do not cover {num_hashes} hashes")]
    BandMismatch {
        bands: usize,
        rows_per_band: usize,
        num_hashes: usize,
    },
    /// A count parameter that must be positive was zero.
    #[error("{0} must be greater than zero")]
    ZeroParameter(&'static str),
    /// Averages over an empty collection are undefined.
    #[error("collection is empty")]
    EmptyCollection,
    /// BM25 length normalisation needs a positive average length.
    #[error("average field length must be positive, got {0}")]
    NonPositiveAverageLength(f64),
}

pub type Result<T> = std::result::Result<T, Error>;
