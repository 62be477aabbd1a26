use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type DocId = String;

/// A normalized document as produced by preprocessing.
///
/// Only `stars`, `genres` and `summaries` are indexed. Everything else the
/// input carries is kept in `extra` and written back out unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stars: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summaries: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(id: impl Into<DocId>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    pub fn with_field(mut self, field: Field, values: &[&str]) -> Self {
        let values = Some(values.iter().map(|v| v.to_string()).collect());
        match field {
            Field::Stars => self.stars = values,
            Field::Genres => self.genres = values,
            Field::Summaries => self.summaries = values,
        }
        self
    }

    /// Values of `field`, empty when the field is absent.
    pub fn field(&self, field: Field) -> &[String] {
        let values = match field {
            Field::Stars => &self.stars,
            Field::Genres => &self.genres,
            Field::Summaries => &self.summaries,
        };
        values.as_deref().unwrap_or(&[])
    }

    /// Whitespace tokens of every value of `field`, in order.
    ///
    /// Building, adding and removing all go through this, so a document
    /// always contributes the same terms to its sub-index.
    pub fn terms(&self, field: Field) -> impl Iterator<Item = &str> {
        self.field(field).iter().flat_map(|value| value.split_whitespace())
    }
}

/// Indexed multi-valued field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Stars,
    Genres,
    Summaries,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Stars, Field::Genres, Field::Summaries];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Stars => "stars",
            Field::Genres => "genres",
            Field::Summaries => "summaries",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stars" => Ok(Field::Stars),
            "genres" => Ok(Field::Genres),
            "summaries" => Ok(Field::Summaries),
            _ => Err(Error::UnknownField(s.to_string())),
        }
    }
}

/// The closed set of sub-indexes kept per collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndexKind {
    Documents,
    Stars,
    Genres,
    Summaries,
}

impl IndexKind {
    pub const ALL: [IndexKind; 4] = [
        IndexKind::Documents,
        IndexKind::Stars,
        IndexKind::Genres,
        IndexKind::Summaries,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IndexKind::Documents => "documents",
            IndexKind::Stars => "stars",
            IndexKind::Genres => "genres",
            IndexKind::Summaries => "summaries",
        }
    }

    /// The indexed field behind this sub-index; `None` for the document store.
    pub fn field(self) -> Option<Field> {
        match self {
            IndexKind::Documents => None,
            IndexKind::Stars => Some(Field::Stars),
            IndexKind::Genres => Some(Field::Genres),
            IndexKind::Summaries => Some(Field::Summaries),
        }
    }
}

impl From<Field> for IndexKind {
    fn from(field: Field) -> Self {
        match field {
            Field::Stars => IndexKind::Stars,
            Field::Genres => IndexKind::Genres,
            Field::Summaries => IndexKind::Summaries,
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("documents") {
            return Ok(IndexKind::Documents);
        }
        s.parse::<Field>().map(IndexKind::from)
    }
}
