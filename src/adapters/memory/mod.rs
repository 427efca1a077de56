//! In-memory store adapters
//!
//! Map-backed implementations of the store traits. They mirror the
//! PostgreSQL adapters' contracts closely enough that the engine tests
//! and rehearsal runs exercise the same code paths end to end.

pub mod source;
pub mod target;

pub use source::MemorySource;
pub use target::MemoryTarget;
