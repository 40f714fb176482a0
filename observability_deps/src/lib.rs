//! Observability ecosystem dependencies, re-exported so the rest of the
//! workspace depends on a single, version-pinned facade rather than on
//! `tracing` directly.

pub use tracing;
