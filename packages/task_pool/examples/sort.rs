//! Sorts increasingly large random arrays on the pool and compares the
//! timing against the standard library's sequential sort.

use std::time::Instant;

use rand::Rng;
use task_pool::TaskPool;

fn main() {
    tracing_subscriber::fmt::init();

    let pool = TaskPool::new();
    let mut rng = rand::rng();

    println!(
        "{:>12} {:>12} {:>8} {:>12}",
        "size", "pool (ms)", "sorted", "std (ms)"
    );

    let mut size = 10_usize;

    while size <= 10_000_000 {
        let data: Vec<i32> = (0..size)
            .map(|_| rng.random_range(i32::MIN + 1..i32::MAX))
            .collect();

        let mut pool_sorted = data.clone();
        let started = Instant::now();
        pool.sort(&mut pool_sorted).expect("pool accepts work");
        let pool_elapsed = started.elapsed();

        let mut std_sorted = data;
        let started = Instant::now();
        std_sorted.sort_unstable();
        let std_elapsed = started.elapsed();

        println!(
            "{size:>12} {:>12.3} {:>8} {:>12.3}",
            pool_elapsed.as_secs_f64() * 1000.0,
            pool_sorted.is_sorted(),
            std_elapsed.as_secs_f64() * 1000.0,
        );

        size *= 10;
    }

    pool.shutdown();
}
