//! Real-world scenario benchmarks.
//!
//! These model a player hammering a full pool: every note past the pool size
//! steals a voice, and every stolen voice tears down a generation.

mod pool;

pub use pool::bench_pool;
