//! Workload simulation: delay, CPU, I/O, payload and memory ballast.

pub mod memory;
pub mod simulator;

pub use memory::MemoryBallast;
pub use simulator::{synthesize_payload, WorkloadSimulator};
