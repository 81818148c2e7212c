//! Counts primes below a bound with a parallel transform-reduce.

use std::num::NonZero;
use std::time::Instant;

use task_pool::{Partitioner, TaskPool};

const UPPER_BOUND: u32 = 2_000_000;

fn is_prime(n: u32) -> bool {
    if n < 2 {
        return false;
    }

    let mut divisor = 2;
    while divisor * divisor <= n {
        if n % divisor == 0 {
            return false;
        }
        divisor += 1;
    }

    true
}

fn main() {
    tracing_subscriber::fmt::init();

    let pool = TaskPool::new();
    let candidates: Vec<u32> = (0..UPPER_BOUND).collect();

    // More partitions than workers, so faster partitions (small numbers)
    // do not leave workers idle while the slow ones finish.
    let partitions = NonZero::new(pool.worker_count().get() * 4).expect("worker count is non-zero");

    let started = Instant::now();
    let prime_count = pool
        .transform_reduce(
            &candidates,
            0_u64,
            |a, b| a + b,
            |&n| u64::from(is_prime(n)),
            Partitioner::equal_count(partitions),
        )
        .expect("pool accepts work");
    let elapsed = started.elapsed();

    println!(
        "{prime_count} primes below {UPPER_BOUND} ({:.3} ms)",
        elapsed.as_secs_f64() * 1000.0
    );

    pool.shutdown();
}
