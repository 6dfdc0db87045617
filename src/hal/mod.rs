// src/hal/mod.rs
//! Sample transports and the sample type they deliver

pub mod traits;
pub mod types;
pub mod simulator;
pub mod serial_driver;

pub use traits::*;
pub use types::*;
pub use serial_driver::{LineTransport, SerialLineTransport, TransportStats};
pub use simulator::{ImuSimulator, SimulatedMotion, SimulatorConfig};
