use crate::document::{DocId, Document, Field, IndexKind};
use crate::index::{InvertedIndex, SubIndex};
use crate::metadata::MetadataIndex;
use crate::tiered::TieredIndex;
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Layout of an index directory.
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn sub_index(&self, kind: IndexKind) -> PathBuf { self.root.join(format!("{kind}.json")) }
    pub fn metadata(&self) -> PathBuf { self.root.join("documents_metadata.json") }
    pub fn tiered(&self, field: Field) -> PathBuf { self.root.join(format!("{field}_tiered.json")) }
}

fn write_json<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut w = BufWriter::new(f);
    if pretty {
        serde_json::to_writer_pretty(&mut w, value)?;
    } else {
        serde_json::to_writer(&mut w, value)?;
    }
    w.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let value = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(value)
}

pub fn save_documents(paths: &IndexPaths, documents: &HashMap<DocId, Document>) -> Result<()> {
    write_json(&paths.sub_index(IndexKind::Documents), documents, false)
}

pub fn load_documents(paths: &IndexPaths) -> Result<HashMap<DocId, Document>> {
    read_json(&paths.sub_index(IndexKind::Documents))
}

pub fn save_sub_index(paths: &IndexPaths, field: Field, sub_index: &SubIndex) -> Result<()> {
    write_json(&paths.sub_index(field.into()), sub_index, false)
}

/// Read one field sub-index, rejecting empty posting lists and zero counts.
pub fn load_sub_index(paths: &IndexPaths, field: Field) -> Result<SubIndex> {
    let path = paths.sub_index(field.into());
    let sub_index: SubIndex = read_json(&path)?;
    for (term, postings) in &sub_index {
        if postings.is_empty() {
            bail!("{}: term {term:?} has an empty posting list", path.display());
        }
        if let Some((doc_id, _)) = postings.iter().find(|(_, &tf)| tf == 0) {
            bail!("{}: term {term:?} has a zero count for {doc_id}", path.display());
        }
    }
    Ok(sub_index)
}

/// Write the document store and all three field sub-indexes.
pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    save_documents(paths, index.documents())?;
    for field in Field::ALL {
        save_sub_index(paths, field, index.sub_index(field))?;
    }
    tracing::info!(root = %paths.root.display(), num_docs = index.num_documents(), "stored index");
    Ok(())
}

/// Outcome of [`load_index`]: which sub-indexes were read and which were
/// skipped, with the reason.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<IndexKind>,
    pub skipped: Vec<(IndexKind, String)>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Read every sub-index file under `paths` into `index`.
///
/// A missing or unreadable file is logged and skipped; that sub-index keeps
/// whatever `index` held before.
pub fn load_index(paths: &IndexPaths, index: &mut InvertedIndex) -> LoadReport {
    let mut report = LoadReport::default();
    for kind in IndexKind::ALL {
        let outcome = match kind.field() {
            None => load_documents(paths).map(|docs| index.set_documents(docs)),
            Some(field) => load_sub_index(paths, field).map(|sub| index.set_sub_index(field, sub)),
        };
        match outcome {
            Ok(()) => report.loaded.push(kind),
            Err(err) => {
                let error = format!("{err:#}");
                tracing::warn!(sub_index = %kind, %error, "skipping sub-index");
                report.skipped.push((kind, error));
            }
        }
    }
    tracing::info!(loaded = report.loaded.len(), skipped = report.skipped.len(), "loaded index");
    report
}

pub fn save_metadata(paths: &IndexPaths, metadata: &MetadataIndex) -> Result<()> {
    write_json(&paths.metadata(), metadata, true)
}

pub fn load_metadata(paths: &IndexPaths) -> Result<MetadataIndex> {
    read_json(&paths.metadata())
}

pub fn save_tiered(paths: &IndexPaths, field: Field, tiered: &TieredIndex) -> Result<()> {
    write_json(&paths.tiered(field), tiered, true)
}

pub fn load_tiered(paths: &IndexPaths, field: Field) -> Result<TieredIndex> {
    read_json(&paths.tiered(field))
}
