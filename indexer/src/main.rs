use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use search_core::lsh::duplicate_clusters;
use search_core::metadata::{average_length, field_lengths, LengthUnit, MetadataIndex};
use search_core::persist::{
    load_index, load_tiered, save_index, save_metadata, save_tiered, IndexPaths,
};
use search_core::scorer::rank;
use search_core::{
    Document, Field, InvertedIndex, LshParams, MinHashLsh, RetrievalMethod, Scorer, SpellCorrector,
    TierThresholds, TieredIndex, UnigramParams,
};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, query and deduplicate a movie-collection index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the inverted, metadata and tiered indexes from JSON/JSONL documents
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Tier thresholds for stars as FIRST,SECOND
        #[arg(long, value_parser = parse_thresholds)]
        stars_tiers: Option<TierThresholds>,
        /// Tier thresholds for genres as FIRST,SECOND
        #[arg(long, value_parser = parse_thresholds)]
        genres_tiers: Option<TierThresholds>,
        /// Tier thresholds for summaries as FIRST,SECOND
        #[arg(long, value_parser = parse_thresholds)]
        summaries_tiers: Option<TierThresholds>,
    },
    /// Rank documents of a stored index against a query
    Search {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        /// Query text (already normalized terms)
        #[arg(long)]
        query: String,
        /// Field to search: stars, genres or summaries
        #[arg(long, default_value = "summaries")]
        field: Field,
        /// Retrieval method: a SMART pair like lnc.ltc, bm25, or unigram:naive|bayes|mixture
        #[arg(long, default_value = "ltn.lnn")]
        method: RetrievalMethod,
        /// Number of results to print
        #[arg(long, default_value_t = 10)]
        k: usize,
        /// Spell-correct the query against the indexed summaries first
        #[arg(long, default_value_t = false)]
        correct: bool,
        /// Restrict scoring to candidates from the tiered index
        #[arg(long, default_value_t = false)]
        tiered: bool,
        /// Dirichlet prior for unigram:bayes
        #[arg(long, default_value_t = 0.5)]
        alpha: f64,
        /// Interpolation weight for unigram:mixture
        #[arg(long, default_value_t = 0.5)]
        lambda: f64,
    },
    /// Find near-duplicate documents by MinHash/LSH over their summaries
    Dedup {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        #[arg(long, default_value_t = 100)]
        num_hashes: usize,
        #[arg(long, default_value_t = 10)]
        bands: usize,
        #[arg(long, default_value_t = 2)]
        shingle_width: usize,
        /// Seed for reproducible buckets; random when omitted
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Spell-correct a query against the indexed summaries
    Correct {
        /// Index directory
        #[arg(long, default_value = "./index")]
        index: String,
        #[arg(long)]
        query: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, stars_tiers, genres_tiers, summaries_tiers } => {
            let thresholds = |field: Field, given: Option<TierThresholds>| {
                given.unwrap_or_else(|| TierThresholds::for_field(field))
            };
            build_index(
                &input,
                &output,
                [
                    (Field::Stars, thresholds(Field::Stars, stars_tiers)),
                    (Field::Genres, thresholds(Field::Genres, genres_tiers)),
                    (Field::Summaries, thresholds(Field::Summaries, summaries_tiers)),
                ],
            )
        }
        Commands::Search { index, query, field, method, k, correct, tiered, alpha, lambda } => {
            let params = UnigramParams { alpha, lambda };
            search(&index, &query, field, method, k, correct, tiered, params)
        }
        Commands::Dedup { input, num_hashes, bands, shingle_width, seed } => {
            let rows_per_band = if bands == 0 { 0 } else { num_hashes / bands };
            dedup(&input, LshParams { num_hashes, bands, rows_per_band, shingle_width, seed })
        }
        Commands::Correct { index, query } => {
            let index = open_index(&index)?;
            println!("{}", summaries_corrector(&index).correct(&query));
            Ok(())
        }
    }
}

fn parse_thresholds(s: &str) -> Result<TierThresholds, String> {
    let (first, second) =
        s.split_once(',').ok_or_else(|| format!("expected FIRST,SECOND, got {s:?}"))?;
    let first = first.trim().parse().map_err(|e| format!("first threshold: {e}"))?;
    let second = second.trim().parse().map_err(|e| format!("second threshold: {e}"))?;
    Ok(TierThresholds::new(first, second))
}

fn build_index(input: &str, output: &str, thresholds: [(Field, TierThresholds); 3]) -> Result<()> {
    let documents = read_collection(Path::new(input))?;
    let paths = IndexPaths::new(output);

    let index = InvertedIndex::build(documents);
    save_index(&paths, &index)?;

    let metadata =
        MetadataIndex::build(index.documents()).context("computing collection metadata")?;
    save_metadata(&paths, &metadata)?;

    for (field, field_thresholds) in thresholds {
        let tiered = TieredIndex::build(index.sub_index(field), field_thresholds);
        save_tiered(&paths, field, &tiered)?;
    }

    tracing::info!(output, num_docs = metadata.document_count, "index build complete");
    Ok(())
}

fn open_index(dir: &str) -> Result<InvertedIndex> {
    let mut index = InvertedIndex::new();
    let report = load_index(&IndexPaths::new(dir), &mut index);
    if report.loaded.is_empty() {
        bail!("no index files could be read from {dir}");
    }
    Ok(index)
}

fn summaries_corrector(index: &InvertedIndex) -> SpellCorrector {
    let summaries = index.documents().values().flat_map(|doc| doc.field(Field::Summaries).iter());
    SpellCorrector::new(summaries)
}

#[allow(clippy::too_many_arguments)]
fn search(
    dir: &str,
    query: &str,
    field: Field,
    method: RetrievalMethod,
    k: usize,
    correct: bool,
    tiered: bool,
    params: UnigramParams,
) -> Result<()> {
    let index = open_index(dir)?;
    let query = if correct {
        let corrected = summaries_corrector(&index).correct(query);
        tracing::info!(original = query, corrected = %corrected, "corrected query");
        corrected
    } else {
        query.to_string()
    };
    let terms: Vec<&str> = query.split_whitespace().collect();

    let lengths = field_lengths(index.documents(), field, LengthUnit::Tokens);
    let average = average_length(&lengths)?;
    let scorer = Scorer::new(index.sub_index(field), index.num_documents());
    let mut scores = scorer.score(&terms, method, &lengths, average, params)?;

    if tiered {
        let paths = IndexPaths::new(dir);
        let tiers = load_tiered(&paths, field).unwrap_or_else(|err| {
            let error = format!("{err:#}");
            tracing::warn!(%error, %field, "rebuilding tiered index in memory");
            TieredIndex::build(index.sub_index(field), TierThresholds::for_field(field))
        });
        let candidates = tiers.candidates(&terms, k);
        scores.retain(|id, _| candidates.contains(id));
    }

    tracing::info!(query = %query, %field, hits = scores.len(), "scored query");
    for (position, (id, score)) in rank(&scores, k).into_iter().enumerate() {
        let title = index.document(&id).and_then(|doc| doc.title.as_deref()).unwrap_or("");
        println!("{}\t{}\t{:.4}\t{}", position + 1, id, score, title);
    }
    Ok(())
}

fn dedup(input: &str, params: LshParams) -> Result<()> {
    let documents = read_collection(Path::new(input))?;
    let texts: Vec<String> =
        documents.iter().map(|doc| doc.field(Field::Summaries).join(" ")).collect();
    let lsh = MinHashLsh::new(texts, params)?;
    let buckets = lsh.perform_lsh()?;
    let pairs = buckets.candidate_pairs();
    tracing::info!(num_docs = documents.len(), pairs = pairs.len(), "lsh complete");

    for (a, b) in &pairs {
        println!("{}\t{}\t{:.3}", documents[*a].id, documents[*b].id, lsh.jaccard_score(*a, *b));
    }
    for cluster in duplicate_clusters(&pairs).into_iter().filter(|c| c.len() > 2) {
        let ids: Vec<&str> = cluster.iter().map(|&d| documents[d].id.as_str()).collect();
        println!("cluster\t{}", ids.join(","));
    }

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    match lsh.jaccard_similarity_test(&buckets, &mut rng) {
        Some(score) => println!("near-duplicate score: {score:.3}"),
        None => println!("near-duplicate score: n/a (no bucket pairs)"),
    }
    Ok(())
}

fn read_collection(input_path: &Path) -> Result<Vec<Document>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        files.sort();
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        bail!("input path {} does not exist", input_path.display());
    }

    let mut documents = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut documents)?;
        } else {
            read_json(&file, &mut documents)?;
        }
    }
    tracing::info!(num_docs = documents.len(), "read documents");
    Ok(documents)
}

fn read_jsonl(file: &Path, documents: &mut Vec<Document>) -> Result<()> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: Document = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), line_no + 1))?;
        documents.push(doc);
    }
    Ok(())
}

fn read_json(file: &Path, documents: &mut Vec<Document>) -> Result<()> {
    let f = File::open(file)?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                documents.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => documents.push(serde_json::from_value(json)?),
        _ => tracing::warn!(file = %file.display(), "skipping file without an object or array"),
    }
    Ok(())
}
