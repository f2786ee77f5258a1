//! Simulation core: aggregation, demand shifting, battery pass, market
//! clearing, and metric derivation.

/// Temporal and spatial aggregation of raw meter data.
pub mod aggregate;
/// Per-participant battery storage model.
pub mod battery;
/// Simulation orchestration.
pub mod engine;
/// Per-timestep peer-to-peer market clearing.
pub mod market;
/// Post-simulation metric derivation.
pub mod metrics;
/// Smart-device demand shifting.
pub mod shifting;

pub use engine::SimulationEngine;
