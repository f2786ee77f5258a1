//! Raw community data: per-meter matrices and their sources.

/// CSV import of per-meter matrices.
pub mod csv_import;
/// Time-indexed matrix types.
pub mod matrix;
/// Seeded synthetic community generator.
pub mod synthetic;

use std::path::Path;

pub use matrix::{SimTimestamp, TimeMatrix};

use crate::error::SimError;

/// Raw per-meter community dataset, before any aggregation.
///
/// `production` holds one column per building meter; `consumption` holds
/// one column per household, `block_size` times as many. Both share one
/// time axis.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityData {
    /// Per-building PV generation (kWh per timestep).
    pub production: TimeMatrix,
    /// Per-household load (kWh per timestep).
    pub consumption: TimeMatrix,
}

impl CommunityData {
    /// Generates a synthetic dataset; see [`synthetic::generate`].
    pub fn synthetic(n_buildings: usize, block_size: usize, seed: u64) -> Self {
        synthetic::generate(n_buildings, block_size, seed)
    }

    /// Loads production and consumption matrices from CSV files and checks
    /// that their time axes match.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be read or parsed, or if the
    /// two time axes differ.
    pub fn from_csv_files(production: &Path, consumption: &Path) -> Result<Self, SimError> {
        let production = csv_import::read_matrix_csv(production)?;
        let consumption = csv_import::read_matrix_csv(consumption)?;
        if production.timestamps() != consumption.timestamps() {
            return Err(SimError::DataShape(
                "production and consumption matrices have different time axes".to_string(),
            ));
        }
        Ok(Self {
            production,
            consumption,
        })
    }

    /// Number of building meters.
    pub fn buildings(&self) -> usize {
        self.production.cols()
    }

    /// Number of raw households.
    pub fn households(&self) -> usize {
        self.consumption.cols()
    }
}
