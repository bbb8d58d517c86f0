//! Tally server library entry.
//!
//! Wires config, shared state, the instrumented router, and log shipping.
//! Consumed by the binary (`main.rs`) and by integration tests.

pub mod api;
pub mod app_state;
pub mod config;
pub mod obs;
pub mod ops;
pub mod router;
pub mod sim;
pub mod telemetry;
