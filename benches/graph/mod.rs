//! Benchmarks for graph building blocks.

mod envelope;
mod restartable;

pub use envelope::bench_envelope;
pub use restartable::bench_restartable;
