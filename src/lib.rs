//! Local Energy Community simulator.

pub mod config;
pub mod data;
mod error;
/// Result serialization to files.
pub mod io;
pub mod log;
pub mod result;
/// Simulation engine, market, battery, and aggregation modules.
pub mod sim;

pub use error::SimError;
