//! Result serialization to files.

/// JSON and CSV export of simulation results.
pub mod export;
