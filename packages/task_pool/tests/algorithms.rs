//! Correctness of the data-parallel algorithms.

use std::num::NonZero;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use new_zealand::nz;
use rand::Rng;
use task_pool::{Partitioner, PoolError, TaskPool};

fn random_ints(count: usize) -> Vec<i32> {
    let mut rng = rand::rng();

    (0..count)
        .map(|_| rng.random_range(-1_000_000_000..=1_000_000_000))
        .collect()
}

#[test]
fn sort_produces_the_same_permutation_as_the_standard_sort() {
    let pool = TaskPool::new();

    // Large enough to force the parallel path and several merge levels.
    let mut data = random_ints(200_000);
    let mut expected = data.clone();

    pool.sort(&mut data).unwrap();
    expected.sort_unstable();

    assert_eq!(data, expected);
}

#[test]
fn sort_below_the_cutoff_is_still_correct() {
    let pool = TaskPool::new();

    let mut data = random_ints(1000);
    let mut expected = data.clone();

    pool.sort(&mut data).unwrap();
    expected.sort_unstable();

    assert_eq!(data, expected);
}

#[test]
fn sort_handles_degenerate_inputs() {
    let pool = TaskPool::new();

    let mut empty: Vec<i32> = Vec::new();
    pool.sort(&mut empty).unwrap();
    assert!(empty.is_empty());

    let mut single = vec![42];
    pool.sort(&mut single).unwrap();
    assert_eq!(single, vec![42]);

    let mut sorted: Vec<i32> = (0..100_000).collect();
    pool.sort(&mut sorted).unwrap();
    assert!(sorted.is_sorted());

    let mut constant = vec![7; 50_000];
    pool.sort(&mut constant).unwrap();
    assert_eq!(constant, vec![7; 50_000]);
}

#[test]
fn sort_by_honors_the_comparator() {
    let pool = TaskPool::new();

    let mut data = random_ints(50_000);
    pool.sort_by(&mut data, |a, b| b.cmp(a)).unwrap();

    assert!(data.is_sorted_by(|a, b| a >= b));
}

#[test]
fn reduce_minimum_is_partition_count_independent() {
    let pool = TaskPool::new();
    let data = random_ints(1_000_000);
    let expected = data.iter().copied().min().unwrap();

    for partitions in [1_usize, 2, 7, 16] {
        let minimum = pool
            .reduce(
                &data,
                i32::MAX,
                |a, b| a.min(b),
                Partitioner::equal_count(NonZero::new(partitions).unwrap()),
            )
            .unwrap();

        assert_eq!(minimum, expected, "{partitions} partitions");
    }
}

#[test]
fn reduce_with_a_fixed_step_partitioner() {
    let pool = TaskPool::new();
    let data: Vec<i64> = (1..=10_000).collect();

    let sum = pool
        .reduce(&data, 0, |a, b| a + b, Partitioner::fixed_step(nz!(777)))
        .unwrap();

    assert_eq!(sum, 50_005_000);
}

#[test]
fn reduce_over_an_empty_slice_yields_the_initial_value() {
    let pool = TaskPool::new();
    let data: Vec<i64> = Vec::new();

    let result = pool
        .reduce(&data, 99, |a, b| a + b, Partitioner::equal_count(nz!(4)))
        .unwrap();

    assert_eq!(result, 99);
}

#[test]
fn transform_reduce_sums_transformed_elements() {
    let pool = TaskPool::new();
    let data: Vec<i64> = (1..=1000).collect();

    let sum_of_squares = pool
        .transform_reduce(
            &data,
            0,
            |a, b| a + b,
            |&x| x * x,
            Partitioner::equal_count(nz!(8)),
        )
        .unwrap();

    let expected: i64 = data.iter().map(|&x| x * x).sum();
    assert_eq!(sum_of_squares, expected);
}

#[test]
fn join_order_is_partition_order_for_non_commutative_operators() {
    let pool = TaskPool::new();
    let data: Vec<String> = (0..100).map(|i| format!("{i},")).collect();

    // String concatenation is associative but not commutative; the result
    // must still equal the sequential fold because partials are joined in
    // partition order.
    let concatenated = pool
        .transform_reduce(
            &data,
            String::new(),
            |a, b| a + &b,
            Clone::clone,
            Partitioner::equal_count(nz!(7)),
        )
        .unwrap();

    assert_eq!(concatenated, data.concat());
}

#[test]
fn for_each_visits_every_element_once() {
    let pool = TaskPool::new();
    let data: Vec<usize> = (0..500).collect();
    let visited = Arc::new(AtomicUsize::new(0));
    let sum = Arc::new(AtomicUsize::new(0));

    pool.for_each(&data, |&value| {
        visited.fetch_add(1, Ordering::SeqCst);
        sum.fetch_add(value, Ordering::SeqCst);
    })
    .unwrap();

    assert_eq!(visited.load(Ordering::SeqCst), 500);
    assert_eq!(sum.load(Ordering::SeqCst), (0..500).sum::<usize>());
}

#[test]
fn algorithms_fail_cleanly_on_a_stopped_pool() {
    let pool = TaskPool::new();
    pool.shutdown();

    let data: Vec<i32> = (0..100_000).collect();
    let result = pool.reduce(&data, 0, |a, b| a + b, Partitioner::equal_count(nz!(4)));
    assert_eq!(result.unwrap_err(), PoolError::Stopped);

    let mut data = data;
    assert_eq!(pool.sort(&mut data).unwrap_err(), PoolError::Stopped);
}

#[test]
fn a_panic_in_an_algorithm_propagates_to_the_caller() {
    let pool = TaskPool::new();
    let data: Vec<i32> = (0..64).collect();

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        pool.for_each(&data, |&value| {
            assert!(value < 32, "unexpected value");
        })
    }));

    assert!(result.is_err());

    // The pool must remain usable afterwards.
    assert_eq!(pool.enqueue(|| 5).unwrap().wait().unwrap(), 5);
}
