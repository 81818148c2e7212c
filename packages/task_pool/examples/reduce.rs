//! Finds the minimum of a large random array with a parallel reduce and
//! compares the timing against a sequential scan.

use std::time::Instant;

use new_zealand::nz;
use rand::Rng;
use task_pool::{Partitioner, TaskPool};

const ELEMENT_COUNT: usize = 10_000_000;

fn main() {
    tracing_subscriber::fmt::init();

    let mut rng = rand::rng();
    let data: Vec<i32> = (0..ELEMENT_COUNT)
        .map(|_| rng.random_range(-100..i32::MAX))
        .collect();

    let started = Instant::now();
    let sequential_min = data.iter().copied().min().expect("data is non-empty");
    let sequential_elapsed = started.elapsed();

    println!(
        "sequential({ELEMENT_COUNT}): {:.3} ms, min = {sequential_min}",
        sequential_elapsed.as_secs_f64() * 1000.0
    );

    let pool = TaskPool::new();

    let started = Instant::now();
    let pool_min = pool
        .reduce(
            &data,
            i32::MAX,
            |a, b| a.min(b),
            Partitioner::equal_count(nz!(16)),
        )
        .expect("pool accepts work");
    let pool_elapsed = started.elapsed();

    println!(
        "pool({ELEMENT_COUNT}): {:.3} ms, min = {pool_min}",
        pool_elapsed.as_secs_f64() * 1000.0
    );

    assert_eq!(pool_min, sequential_min);
    pool.shutdown();
}
