//! Normalizer invariants: idempotence, totality, tokenization shape.

use proptest::prelude::*;
use talpa::{normalize, tokenize, tokenize_with_offsets};

proptest! {
    #[test]
    fn normalize_is_idempotent(input in ".*", preserve in any::<bool>()) {
        let once = normalize(&input, preserve);
        prop_assert_eq!(normalize(&once, preserve), once);
    }

    #[test]
    fn normalize_never_panics(input in "\\PC*", preserve in any::<bool>()) {
        let _ = normalize(&input, preserve);
        let _ = tokenize(&input, preserve);
    }

    #[test]
    fn tokens_are_alphanumeric_runs(input in ".*", preserve in any::<bool>()) {
        for token in tokenize(&input, preserve) {
            prop_assert!(!token.is_empty());
            prop_assert!(token.chars().all(char::is_alphanumeric));
        }
    }

    #[test]
    fn tokens_appear_at_their_offsets(input in "[a-zA-Z0-9 .,!-]{0,80}") {
        let normalized = normalize(&input, true);
        let chars: Vec<char> = normalized.chars().collect();
        for (token, offset) in tokenize_with_offsets(&input, true) {
            let found: String = chars[offset..offset + token.chars().count()]
                .iter()
                .collect();
            prop_assert_eq!(found, token);
        }
    }

    #[test]
    fn folding_strips_combining_marks(input in "\\PC{0,40}") {
        let folded = normalize(&input, false);
        prop_assert!(!folded.chars().any(|c| ('\u{0300}'..='\u{036F}').contains(&c)), "combining mark found after folding");
    }

    #[test]
    fn tokenization_is_stable_under_normalization(input in ".*", preserve in any::<bool>()) {
        let normalized = normalize(&input, preserve);
        prop_assert_eq!(
            tokenize(&input, preserve),
            tokenize(&normalized, preserve)
        );
    }
}
