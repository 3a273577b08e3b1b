//! Parley conversation broker SDK facade.
//!
//! Depend on this crate via `cargo add parley`. It bundles the broker crates
//! behind feature flags so embedders can pull in only the primitives when
//! they implement their own coordination layer.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use parley_primitives as primitives;

/// Coordination broker (enabled by the `broker` feature).
#[cfg(feature = "broker")]
pub use parley_broker as broker;
