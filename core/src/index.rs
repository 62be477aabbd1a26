use crate::document::{DocId, Document, Field, IndexKind};
use std::collections::HashMap;

/// Document id -> number of occurrences of the term in that document's field.
///
/// Only documents that contain the term are keys; a zero count never exists.
pub type PostingList = HashMap<DocId, u32>;

/// Term -> posting list for one field. A term is present iff its posting list
/// is non-empty.
pub type SubIndex = HashMap<String, PostingList>;

/// The document store plus one inverted sub-index per indexed field.
///
/// Mutation is single-writer: there is no internal locking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvertedIndex {
    documents: HashMap<DocId, Document>,
    stars: SubIndex,
    genres: SubIndex,
    summaries: SubIndex,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a whole collection in one pass.
    pub fn build<I>(documents: I) -> Self
    where
        I: IntoIterator<Item = Document>,
    {
        let mut index = Self::new();
        for doc in documents {
            index.add_document(doc);
        }
        tracing::info!(
            num_docs = index.documents.len(),
            stars = index.stars.len(),
            genres = index.genres.len(),
            summaries = index.summaries.len(),
            "built inverted index"
        );
        index
    }

    pub fn documents(&self) -> &HashMap<DocId, Document> {
        &self.documents
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn num_documents(&self) -> usize {
        self.documents.len()
    }

    pub fn sub_index(&self, field: Field) -> &SubIndex {
        match field {
            Field::Stars => &self.stars,
            Field::Genres => &self.genres,
            Field::Summaries => &self.summaries,
        }
    }

    fn sub_index_mut(&mut self, field: Field) -> &mut SubIndex {
        match field {
            Field::Stars => &mut self.stars,
            Field::Genres => &mut self.genres,
            Field::Summaries => &mut self.summaries,
        }
    }

    /// Swap in a whole sub-index, e.g. one read back from disk.
    pub fn set_sub_index(&mut self, field: Field, sub_index: SubIndex) {
        *self.sub_index_mut(field) = sub_index;
    }

    pub fn set_documents(&mut self, documents: HashMap<DocId, Document>) {
        self.documents = documents;
    }

    pub fn postings(&self, term: &str, field: Field) -> Option<&PostingList> {
        self.sub_index(field).get(term)
    }

    pub fn term_frequency(&self, term: &str, field: Field, doc_id: &str) -> u32 {
        self.postings(term, field)
            .and_then(|postings| postings.get(doc_id))
            .copied()
            .unwrap_or(0)
    }

    /// Ids of the documents holding `term` in `kind`, sorted; empty when the
    /// term is unknown.
    ///
    /// For [`IndexKind::Documents`] the term is looked up as a document id.
    pub fn posting_list(&self, term: &str, kind: IndexKind) -> Vec<DocId> {
        let Some(field) = kind.field() else {
            return self
                .documents
                .get_key_value(term)
                .map(|(id, _)| vec![id.clone()])
                .unwrap_or_default();
        };
        let mut ids: Vec<DocId> = self
            .postings(term, field)
            .map(|postings| postings.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Store `doc` and count its terms into every field sub-index.
    ///
    /// An id that is already indexed is replaced: its old postings are
    /// removed first.
    pub fn add_document(&mut self, doc: Document) {
        if self.documents.contains_key(&doc.id) {
            tracing::debug!(id = %doc.id, "replacing indexed document");
            self.remove_document(&doc.id);
        }
        for field in Field::ALL {
            let sub_index = self.sub_index_mut(field);
            for term in doc.terms(field) {
                let postings = sub_index.entry(term.to_string()).or_default();
                *postings.entry(doc.id.clone()).or_insert(0) += 1;
            }
        }
        self.documents.insert(doc.id.clone(), doc);
    }

    /// Drop a document and all of its postings. Unknown ids are a no-op.
    pub fn remove_document(&mut self, id: &str) -> Option<Document> {
        let doc = self.documents.remove(id)?;
        for field in Field::ALL {
            let sub_index = self.sub_index_mut(field);
            for term in doc.terms(field) {
                let now_empty = match sub_index.get_mut(term) {
                    Some(postings) => {
                        postings.remove(id);
                        postings.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    sub_index.remove(term);
                }
            }
        }
        Some(doc)
    }

    /// Linear scan of the store for documents whose `field` contains `term`.
    /// Slow; used to cross-check posting lists.
    pub fn documents_containing(&self, term: &str, field: Field) -> Vec<DocId> {
        let mut ids: Vec<DocId> = self
            .documents
            .values()
            .filter(|doc| doc.terms(field).any(|t| t == term))
            .map(|doc| doc.id.clone())
            .collect();
        ids.sort();
        ids
    }
}
