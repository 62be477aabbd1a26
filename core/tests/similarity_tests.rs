use proptest::prelude::*;
use search_core::similarity::{jaccard, shingle};

proptest! {
    #[test]
    fn jaccard_is_symmetric_and_bounded(a in ".{0,24}", b in ".{0,24}", k in 1usize..4) {
        let (a, b) = (shingle(&a, k), shingle(&b, k));
        let score = jaccard(&a, &b);
        prop_assert!((0.0..=1.0).contains(&score));
        prop_assert_eq!(score, jaccard(&b, &a));
    }

    #[test]
    fn identical_texts_score_one(text in "[a-z ]{4,24}", k in 1usize..4) {
        let shingles = shingle(&text, k);
        prop_assert!(!shingles.is_empty());
        prop_assert_eq!(jaccard(&shingles, &shingle(&text, k)), 1.0);
    }

    #[test]
    fn disjoint_alphabets_score_zero(a in "[a-m]{1,24}", b in "[n-z]{1,24}", k in 1usize..4) {
        prop_assert_eq!(jaccard(&shingle(&a, k), &shingle(&b, k)), 0.0);
    }
}
