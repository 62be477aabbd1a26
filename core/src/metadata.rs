use crate::document::{DocId, Document, Field};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::format_description::well_known::Rfc3339;

pub const METADATA_VERSION: u32 = 1;

/// Mean number of values per document for each indexed field.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AverageLengths {
    pub stars: f64,
    pub genres: f64,
    pub summaries: f64,
}

impl AverageLengths {
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Stars => self.stars,
            Field::Genres => self.genres,
            Field::Summaries => self.summaries,
        }
    }
}

/// Collection statistics needed by length-normalised scoring.
///
/// A snapshot: it goes stale if the source index changes afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataIndex {
    pub document_count: usize,
    pub average_document_length: AverageLengths,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub version: u32,
}

impl MetadataIndex {
    pub fn build(documents: &HashMap<DocId, Document>) -> Result<Self> {
        if documents.is_empty() {
            return Err(Error::EmptyCollection);
        }
        let average = |field: Field| {
            let total: usize = documents.values().map(|doc| doc.field(field).len()).sum();
            total as f64 / documents.len() as f64
        };
        Ok(Self {
            document_count: documents.len(),
            average_document_length: AverageLengths {
                stars: average(Field::Stars),
                genres: average(Field::Genres),
                summaries: average(Field::Summaries),
            },
            created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
            version: METADATA_VERSION,
        })
    }

    pub fn average_length(&self, field: Field) -> f64 {
        self.average_document_length.get(field)
    }
}

/// What a document's field length counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthUnit {
    /// Number of values (e.g. number of listed stars). Matches [`MetadataIndex`] averages.
    #[default]
    Elements,
    /// Number of whitespace tokens across all values.
    Tokens,
}

/// Length of `field` for every document; absent fields count as 0.
pub fn field_lengths(
    documents: &HashMap<DocId, Document>,
    field: Field,
    unit: LengthUnit,
) -> HashMap<DocId, f64> {
    documents
        .iter()
        .map(|(id, doc)| {
            let len = match unit {
                LengthUnit::Elements => doc.field(field).len(),
                LengthUnit::Tokens => doc.terms(field).count(),
            };
            (id.clone(), len as f64)
        })
        .collect()
}

/// Mean of a length table; zero-sized tables are an error.
pub fn average_length(lengths: &HashMap<DocId, f64>) -> Result<f64> {
    if lengths.is_empty() {
        return Err(Error::EmptyCollection);
    }
    Ok(lengths.values().sum::<f64>() / lengths.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(docs: Vec<Document>) -> HashMap<DocId, Document> {
        docs.into_iter().map(|d| (d.id.clone(), d)).collect()
    }

    #[test]
    fn absent_fields_count_in_denominator() {
        let docs = store(vec![
            Document::new("a").with_field(Field::Stars, &["x", "y", "z"]),
            Document::new("b").with_field(Field::Stars, &["w"]),
            Document::new("c"),
            Document::new("d").with_field(Field::Genres, &[]),
        ]);
        let meta = MetadataIndex::build(&docs).unwrap();
        assert_eq!(meta.document_count, 4);
        assert_eq!(meta.average_length(Field::Stars), 1.0);
        assert_eq!(meta.average_length(Field::Genres), 0.0);
        assert_eq!(meta.version, METADATA_VERSION);
    }

    #[test]
    fn empty_collection_is_an_error() {
        assert_eq!(MetadataIndex::build(&HashMap::new()), Err(Error::EmptyCollection));
        assert!(average_length(&HashMap::new()).is_err());
    }

    #[test]
    fn token_lengths_split_values() {
        let docs = store(vec![Document::new("a").with_field(Field::Summaries, &["a b c", "d"])]);
        assert_eq!(field_lengths(&docs, Field::Summaries, LengthUnit::Elements)["a"], 2.0);
        assert_eq!(field_lengths(&docs, Field::Summaries, LengthUnit::Tokens)["a"], 4.0);
    }
}
