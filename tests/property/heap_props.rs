//! Bounded min-heap invariants against a sort-based oracle.

use proptest::prelude::*;
use talpa::TopK;

proptest! {
    #[test]
    fn keeps_exactly_the_k_largest(
        mut values in prop::collection::vec(any::<i32>(), 0..200),
        k in 1usize..20,
    ) {
        let mut heap = TopK::new(k);
        for &v in &values {
            heap.push(v);
        }

        let mut kept = heap.extract_all();
        values.sort_unstable();
        let expected: Vec<i32> = values.iter().rev().take(k).rev().copied().collect();

        prop_assert_eq!(kept.len(), expected.len());
        kept.sort_unstable();
        let mut expected_sorted = expected;
        expected_sorted.sort_unstable();
        prop_assert_eq!(kept, expected_sorted);
    }

    #[test]
    fn extract_all_is_sorted_ascending(
        values in prop::collection::vec(any::<i32>(), 0..100),
        k in 0usize..20,
    ) {
        let mut heap = TopK::new(k);
        for &v in &values {
            heap.push(v);
        }
        let drained = heap.extract_all();
        prop_assert!(drained.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn unbounded_heap_accepts_everything(
        values in prop::collection::vec(any::<i32>(), 0..100),
    ) {
        let mut heap = TopK::new(0);
        for &v in &values {
            prop_assert!(heap.push(v));
        }
        prop_assert_eq!(heap.len(), values.len());
    }

    #[test]
    fn push_accepts_iff_it_beats_the_minimum(
        values in prop::collection::vec(any::<i32>(), 1..100),
        probe in any::<i32>(),
        k in 1usize..10,
    ) {
        let mut heap = TopK::new(k);
        for &v in &values {
            heap.push(v);
        }
        let full = heap.len() == k;
        let min = *heap.peek().expect("non-empty");
        let accepted = heap.push(probe);
        if full {
            prop_assert_eq!(accepted, probe > min);
        } else {
            prop_assert!(accepted);
        }
    }

    #[test]
    fn snapshot_matches_contents(
        values in prop::collection::vec(any::<i32>(), 0..60),
        k in 1usize..10,
    ) {
        let mut heap = TopK::new(k);
        for &v in &values {
            heap.push(v);
        }
        let mut snapshot = heap.snapshot();
        snapshot.sort_unstable();
        let drained = heap.extract_all();
        prop_assert_eq!(snapshot, drained);
    }
}
