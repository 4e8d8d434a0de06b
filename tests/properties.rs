//! Property-based tests for the algebraic laws named in the operator
//! runtime's testable-properties section, plus table-driven fixtures for
//! the prefix/suffix length laws at several `n`.

use proptest::prelude::*;
use reactive_core::prelude::*;
use rstest::rstest;
use std::sync::Arc;

fn collect_values<T: 'static + Send + Clone>(signal: &Signal<T, Never>) -> Vec<T> {
    let received = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let received2 = Arc::clone(&received);
    signal.observe_next(move |v| received2.lock().push(v));
    Arc::try_unwrap(received).unwrap().into_inner()
}

proptest! {
    /// scan seed law: the first value `scan(seed, f)` emits is always
    /// `seed`, regardless of what upstream produces.
    #[test]
    fn scan_first_emission_is_always_the_seed(seed in any::<i32>(), values in prop::collection::vec(any::<i32>(), 0..20)) {
        let s = Signal::<i32, Never>::sequence(values).scan(seed, |acc, x| acc.wrapping_add(x));
        let out = collect_values(&s);
        prop_assert_eq!(out[0], seed);
    }

    /// scan's remaining emissions are the left-fold of upstream with `f`
    /// starting from `seed`.
    #[test]
    fn scan_emissions_after_the_seed_are_a_left_fold(seed in any::<i32>(), values in prop::collection::vec(-100i32..100, 0..20)) {
        let s = Signal::<i32, Never>::sequence(values.clone()).scan(seed, |acc, x| acc.wrapping_add(x));
        let out = collect_values(&s);
        let mut expected = vec![seed];
        let mut acc = seed;
        for v in values {
            acc = acc.wrapping_add(v);
            expected.push(acc);
        }
        prop_assert_eq!(out, expected);
    }

    /// merge is symmetric up to ordering for two independent, synchronous
    /// sources: the multiset of values does not depend on argument order.
    #[test]
    fn merge_is_order_independent_as_a_multiset(a in prop::collection::vec(any::<i32>(), 0..15), b in prop::collection::vec(any::<i32>(), 0..15)) {
        let forward = Signal::<i32, Never>::sequence(a.clone()).merge(Signal::sequence(b.clone()));
        let backward = Signal::<i32, Never>::sequence(b).merge(Signal::sequence(a));

        let mut forward_values = collect_values(&forward);
        let mut backward_values = collect_values(&backward);
        forward_values.sort();
        backward_values.sort();
        prop_assert_eq!(forward_values, backward_values);
    }

    /// prefix/suffix laws: `prefix(n)` never emits more than `n` values;
    /// `suffix(n)` on a finite upstream of length `m` emits exactly
    /// `min(n, m)` values, namely its tail.
    #[test]
    fn prefix_and_suffix_bounds_hold(values in prop::collection::vec(any::<i32>(), 0..30), n in 0usize..10) {
        let upstream: Vec<i32> = values.clone();
        let prefixed = Signal::<i32, Never>::sequence(upstream.clone()).prefix(n);
        let prefix_out = collect_values(&prefixed);
        prop_assert!(prefix_out.len() <= n);
        prop_assert_eq!(&prefix_out[..], &upstream[..prefix_out.len()]);

        let suffixed = Signal::<i32, Never>::sequence(upstream.clone()).suffix(n);
        let suffix_out = collect_values(&suffixed);
        let expected_len = n.min(upstream.len());
        prop_assert_eq!(suffix_out.len(), expected_len);
        prop_assert_eq!(&suffix_out[..], &upstream[upstream.len() - expected_len..]);
    }
}

#[rstest]
#[case(vec![1, 2, 3, 4, 5], 0, vec![])]
#[case(vec![1, 2, 3, 4, 5], 1, vec![1])]
#[case(vec![1, 2, 3, 4, 5], 3, vec![1, 2, 3])]
#[case(vec![1, 2, 3, 4, 5], 10, vec![1, 2, 3, 4, 5])]
fn prefix_length_table(#[case] upstream: Vec<i32>, #[case] n: usize, #[case] expected: Vec<i32>) {
    let s = Signal::<i32, Never>::sequence(upstream).prefix(n);
    assert_eq!(collect_values(&s), expected);
}

#[rstest]
#[case(vec![1, 2, 3, 4, 5], 0, vec![])]
#[case(vec![1, 2, 3, 4, 5], 1, vec![5])]
#[case(vec![1, 2, 3, 4, 5], 3, vec![3, 4, 5])]
#[case(vec![1, 2, 3, 4, 5], 10, vec![1, 2, 3, 4, 5])]
fn suffix_length_table(#[case] upstream: Vec<i32>, #[case] n: usize, #[case] expected: Vec<i32>) {
    let s = Signal::<i32, Never>::sequence(upstream).suffix(n);
    assert_eq!(collect_values(&s), expected);
}
