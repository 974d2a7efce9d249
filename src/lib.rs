//! Hard disk shock protection.
//!
//! Samples the laptop's built-in accelerometer, decides whether the machine
//! is moving hard enough to risk a head crash, and parks the disk heads via
//! the block layer's `protect` attribute until things calm down.

pub mod analyzer;
pub mod config;
pub mod controller;
pub mod daemon;
pub mod error;
pub mod health_monitor;
pub mod live_status;
pub mod pause;
pub mod platform;
pub mod protect;
pub mod sensors;
pub mod startup;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use analyzer::{MotionAnalyzer, MotionState};
pub use config::Config;
pub use controller::{ProtectionController, ProtectionState, Transition};
pub use daemon::Daemon;
pub use error::{GuardError, GuardResult};
pub use types::{Position, Sample};
