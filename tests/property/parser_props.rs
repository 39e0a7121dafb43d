//! Parser invariants: totality, determinism, structural guarantees.

use proptest::prelude::*;
use talpa::{parse, parse_with_errors, QueryMode, Settings};

proptest! {
    #[test]
    fn parser_is_total(input in "\\PC*") {
        // Any input produces a structure without panicking
        let _ = parse(&input, &Settings::default());
    }

    #[test]
    fn parser_is_deterministic(input in ".*") {
        let settings = Settings::default();
        let (first, first_errors) = parse_with_errors(&input, &settings);
        let (second, second_errors) = parse_with_errors(&input, &settings);
        prop_assert_eq!(first, second);
        prop_assert_eq!(first_errors, second_errors);
    }

    #[test]
    fn raw_is_preserved_verbatim(input in ".*") {
        let query = parse(&input, &Settings::default());
        prop_assert_eq!(query.raw, input);
    }

    #[test]
    fn or_groups_always_have_at_least_two_members(
        input in "[a-z]{1,6}( (OR|[a-z]{1,6})){0,8}",
    ) {
        let query = parse(&input, &Settings::default());
        for group in &query.or_groups {
            prop_assert!(group.len() >= 2, "group {:?} in {:?}", group, input);
        }
    }

    #[test]
    fn commands_mode_swallows_all_syntax(rest in "[ -~]{0,40}") {
        let raw = format!(">{rest}");
        let query = parse(&raw, &Settings::default());
        prop_assert_eq!(query.mode, QueryMode::Commands);
        prop_assert!(query.phrases.is_empty());
        prop_assert!(query.excludes.is_empty());
        prop_assert!(query.or_groups.is_empty());
        prop_assert!(query.regex.is_none());
        prop_assert!(query.terms.len() <= 1);
    }

    #[test]
    fn stored_regex_always_compiles(input in ".*") {
        let query = parse(&input, &Settings::default());
        if let Some(clause) = &query.regex {
            // The parser only retains clauses that compiled
            prop_assert!(talpa::parse(&format!("/{}/{}", clause.source, clause.flags),
                &Settings::default()).regex.is_some(), "re-parsed regex clause did not compile");
        }
    }

    #[test]
    fn excludes_are_never_empty_strings(input in ".*") {
        let query = parse(&input, &Settings::default());
        for exclude in &query.excludes {
            prop_assert!(!exclude.is_empty());
        }
        for tag in &query.filters.tags {
            prop_assert!(!tag.is_empty());
        }
    }

    #[test]
    fn phrases_come_from_quoted_regions(input in "[a-z \"]{0,60}") {
        let query = parse(&input, &Settings::default());
        for phrase in &query.phrases {
            prop_assert!(!phrase.is_empty());
            prop_assert!(input.contains(phrase.as_str()));
        }
    }
}
