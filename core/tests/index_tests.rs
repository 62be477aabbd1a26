use proptest::prelude::*;
use search_core::metadata::MetadataIndex;
use search_core::{Document, Field, IndexKind, InvertedIndex, Tier, TierThresholds, TieredIndex};
use std::collections::HashSet;

fn collection() -> Vec<Document> {
    vec![
        Document::new("tt0111161")
            .with_field(Field::Stars, &["tim robbins", "morgan freeman", "bob gunton"])
            .with_field(Field::Genres, &["drama"])
            .with_field(
                Field::Summaries,
                &["two imprisoned men bond over years", "hope and redemption"],
            ),
        Document::new("tt0068646")
            .with_field(Field::Stars, &["marlon brando", "al pacino", "james caan"])
            .with_field(Field::Genres, &["crime", "drama"])
            .with_field(Field::Summaries, &["the aging patriarch of an organized crime dynasty"]),
        Document::new("tt0468569")
            .with_field(Field::Stars, &["christian bale", "heath ledger"])
            .with_field(Field::Genres, &["action", "crime", "drama"]),
        Document::new("tt0000001"),
    ]
}

#[test]
fn add_then_remove_restores_index() {
    let mut index = InvertedIndex::build(collection());
    let before = index.clone();

    let dummy = Document::new("100")
        .with_field(Field::Stars, &["tim", "henry"])
        .with_field(Field::Genres, &["drama", "crime"])
        .with_field(Field::Summaries, &["good"]);
    index.add_document(dummy.clone());

    assert_eq!(index.document("100"), Some(&dummy));
    let added_terms = [
        ("tim", Field::Stars),
        ("henry", Field::Stars),
        ("drama", Field::Genres),
        ("good", Field::Summaries),
    ];
    for (term, field) in added_terms {
        let after: HashSet<String> = index.posting_list(term, field.into()).into_iter().collect();
        let prior: HashSet<String> = before.posting_list(term, field.into()).into_iter().collect();
        let added: HashSet<String> = after.difference(&prior).cloned().collect();
        assert_eq!(added, HashSet::from(["100".to_string()]), "{term}");
    }

    index.remove_document("100");
    assert_eq!(index, before);
}

#[test]
fn removing_unknown_id_is_a_noop() {
    let mut index = InvertedIndex::build(collection());
    let before = index.clone();
    assert!(index.remove_document("tt9999999").is_none());
    assert_eq!(index, before);
}

#[test]
fn postings_match_brute_force_scan() {
    let index = InvertedIndex::build(collection());
    for field in Field::ALL {
        for (term, postings) in index.sub_index(field) {
            assert!(!postings.is_empty());
            assert!(postings.values().all(|&tf| tf > 0));
            let listed = index.posting_list(term, field.into());
            assert_eq!(listed, index.documents_containing(term, field), "{field}:{term}");
        }
    }
    assert_eq!(index.posting_list("crime", IndexKind::Genres), vec!["tt0068646", "tt0468569"]);
}

#[test]
fn metadata_counts_documents_without_fields() {
    let index = InvertedIndex::build(collection());
    let meta = MetadataIndex::build(index.documents()).unwrap();
    assert_eq!(meta.document_count, 4);
    assert_eq!(meta.average_length(Field::Stars), 8.0 / 4.0);
    assert_eq!(meta.average_length(Field::Genres), 6.0 / 4.0);
    assert_eq!(meta.average_length(Field::Summaries), 3.0 / 4.0);
}

#[test]
fn tiered_snapshot_goes_stale_until_rebuilt() {
    let mut index = InvertedIndex::build(collection());
    let thresholds = TierThresholds::for_field(Field::Genres);
    let tiered = TieredIndex::build(index.sub_index(Field::Genres), thresholds);
    assert!(tiered.first_tier.contains_key("drama"));

    index.add_document(Document::new("x").with_field(Field::Genres, &["western"]));
    assert_eq!(tiered.tier_of("western"), None);
    let rebuilt = TieredIndex::build(index.sub_index(Field::Genres), thresholds);
    assert!(matches!(rebuilt.tier_of("western"), Some(Tier::Second | Tier::Third)));
}

fn word() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["tim", "henry", "drama", "crime", "good", "bad", "men", "hope"])
        .prop_map(String::from)
}

fn phrase() -> impl Strategy<Value = String> {
    prop::collection::vec(word(), 1..4).prop_map(|words| words.join(" "))
}

fn document(id: String) -> impl Strategy<Value = Document> {
    (
        prop::option::of(prop::collection::vec(phrase(), 0..3)),
        prop::option::of(prop::collection::vec(word(), 0..3)),
        prop::option::of(prop::collection::vec(phrase(), 0..3)),
    )
        .prop_map(move |(stars, genres, summaries)| Document {
            id: id.clone(),
            stars,
            genres,
            summaries,
            ..Document::default()
        })
}

fn documents() -> impl Strategy<Value = Vec<Document>> {
    (0usize..6).prop_flat_map(|n| (0..n).map(|i| document(format!("d{i}"))).collect::<Vec<_>>())
}

proptest! {
    #[test]
    fn add_remove_round_trip(docs in documents(), extra in document("extra".to_string())) {
        let mut index = InvertedIndex::build(docs);
        let before = index.clone();
        index.add_document(extra);
        index.remove_document("extra");
        prop_assert_eq!(index, before);
    }

    #[test]
    fn tiers_partition_terms(docs in documents(), first in 0u64..6, second in 0u64..6) {
        let index = InvertedIndex::build(docs);
        for field in Field::ALL {
            let source = index.sub_index(field);
            let tiered = TieredIndex::build(source, TierThresholds::new(first, second));
            prop_assert_eq!(tiered.num_terms(), source.len());
            for term in source.keys() {
                let hits = [&tiered.first_tier, &tiered.second_tier, &tiered.third_tier]
                    .iter()
                    .filter(|tier| tier.contains_key(term))
                    .count();
                prop_assert_eq!(hits, 1);
            }
        }
    }

    #[test]
    fn degenerate_thresholds_still_partition(docs in documents()) {
        let index = InvertedIndex::build(docs);
        let source = index.sub_index(Field::Summaries);
        let tiered = TieredIndex::build(source, TierThresholds::new(0, 0));
        prop_assert!(tiered.second_tier.is_empty());
        prop_assert!(tiered.third_tier.is_empty());
        prop_assert_eq!(tiered.first_tier.len(), source.len());
    }

    #[test]
    fn postings_have_no_false_hits(docs in documents()) {
        let index = InvertedIndex::build(docs);
        for field in Field::ALL {
            for term in index.sub_index(field).keys() {
                prop_assert_eq!(
                    index.posting_list(term, field.into()),
                    index.documents_containing(term, field)
                );
            }
        }
    }
}
