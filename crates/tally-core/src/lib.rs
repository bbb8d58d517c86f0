//! Tally core: transport-agnostic metric primitives, exposition text, and errors.
//!
//! This crate defines the instruments (counter, gauge, histogram), the
//! registry that renders them in the Prometheus text exposition format, and
//! the error surface shared with the server crate. It carries no runtime or
//! HTTP dependencies so the instruments can be exercised in isolation.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Instruments are mutated from every request task, and a poisoned or
//! panicking instrument would take the request path down with it.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metrics;

/// Shared result type.
pub use error::{Result, TallyError};
