//! Simulated workloads behind the demo routes.

pub mod heavy_task;

pub use heavy_task::{HeavyTask, SimulatedHeavyTask};
