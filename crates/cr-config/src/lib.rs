//! Process-wide configuration shared by the char-rnn crates: deterministic
//! seeding of random sources and the tracing subscriber.

pub mod determinism;
pub mod tracing;

pub use self::determinism::{configure, rng_from_label, rng_from_optional, DeterminismConfig};
pub use self::tracing::{flush_tracing, init_tracing, init_tracing_with, InitError, TracingOptions};
