//! Seeded synthetic community data.
//!
//! Stands in for the external metering data source: one sinusoid-plus-noise
//! load profile per household and one daylight half-cosine PV profile per
//! building, generated hour-by-hour over a full calendar year from a single
//! seeded generator.

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::CommunityData;
use super::matrix::{SimTimestamp, TimeMatrix};

/// Days per calendar month (non-leap year).
const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Relative PV yield per calendar month (January first).
const MONTHLY_PV_FACTOR: [f64; 12] = [
    0.30, 0.40, 0.55, 0.70, 0.85, 0.95, 1.0, 0.95, 0.75, 0.55, 0.35, 0.28,
];

/// First daylight hour (inclusive).
const SUNRISE_HOUR: u32 = 6;
/// Last daylight hour (exclusive).
const SUNSET_HOUR: u32 = 18;

/// Gaussian noise via the Box-Muller transform.
fn gaussian_noise(rng: &mut StdRng, std_dev: f64) -> f64 {
    if std_dev <= 0.0 {
        return 0.0;
    }
    let u1: f64 = rng.random::<f64>().clamp(1e-6, 1.0);
    let u2: f64 = rng.random::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev
}

/// A household consumption profile: daily sinusoid plus Gaussian noise.
#[derive(Debug, Clone)]
struct HouseholdLoad {
    /// Average hourly consumption (kWh).
    base_kwh: f64,
    /// Amplitude of the daily variation (kWh).
    amp_kwh: f64,
    /// Phase offset of the daily pattern (radians).
    phase_rad: f64,
    /// Standard deviation of the per-hour noise (kWh).
    noise_std: f64,
}

impl HouseholdLoad {
    /// Draws randomized household parameters.
    fn sample(rng: &mut StdRng) -> Self {
        Self {
            base_kwh: 0.2 + 0.5 * rng.random::<f64>(),
            amp_kwh: 0.1 + 0.5 * rng.random::<f64>(),
            phase_rad: 2.0 * std::f64::consts::PI * rng.random::<f64>(),
            noise_std: 0.05,
        }
    }

    /// Consumption for one hour of the day. Never negative.
    fn energy_kwh(&self, hour: u32, rng: &mut StdRng) -> f64 {
        let day_pos = f64::from(hour) / 24.0;
        let angle = 2.0 * std::f64::consts::PI * day_pos + self.phase_rad;
        let kwh = self.base_kwh + self.amp_kwh * angle.sin() + gaussian_noise(rng, self.noise_std);
        kwh.max(0.0)
    }
}

/// A rooftop PV profile: half-cosine daylight bell scaled by month.
#[derive(Debug, Clone)]
struct RooftopPv {
    /// Peak hourly generation under the best summer conditions (kWh).
    kwh_peak: f64,
    /// Standard deviation of weather noise as a fraction of output.
    noise_std: f64,
}

impl RooftopPv {
    /// Draws randomized array parameters. Peak sizes vary widely so that
    /// buildings straddle their own load at shoulder hours.
    fn sample(rng: &mut StdRng) -> Self {
        Self {
            kwh_peak: 10.0 + 15.0 * rng.random::<f64>(),
            noise_std: 0.05,
        }
    }

    /// Generation for one hour of the given month. Zero outside daylight,
    /// never negative.
    fn energy_kwh(&self, month: u32, hour: u32, rng: &mut StdRng) -> f64 {
        if hour < SUNRISE_HOUR || hour >= SUNSET_HOUR {
            return 0.0;
        }
        let span = f64::from(SUNSET_HOUR - SUNRISE_HOUR);
        let pos = f64::from(hour - SUNRISE_HOUR) / span; // [0,1)
        // half-cosine bell peaking at solar noon
        let bell = 0.5 * (1.0 - (2.0 * std::f64::consts::PI * pos).cos());
        let seasonal = MONTHLY_PV_FACTOR[(month - 1) as usize];
        let kwh = self.kwh_peak * seasonal * bell;
        (kwh * (1.0 + gaussian_noise(rng, self.noise_std))).max(0.0)
    }
}

/// Full-year hourly time axis (non-leap calendar).
fn year_axis() -> Vec<SimTimestamp> {
    let mut axis = Vec::with_capacity(8760);
    for month in 1..=12u32 {
        for day in 1..=DAYS_IN_MONTH[(month - 1) as usize] {
            for hour in 0..24 {
                axis.push(SimTimestamp::new(month, day, hour));
            }
        }
    }
    axis
}

/// Generates a raw community dataset: one production column per building
/// and `block_size` consumption columns per building, over one full year
/// of hourly values. Deterministic for a fixed seed.
pub fn generate(n_buildings: usize, block_size: usize, seed: u64) -> CommunityData {
    let mut rng = StdRng::seed_from_u64(seed);
    let axis = year_axis();
    let n_households = n_buildings * block_size;

    let households: Vec<HouseholdLoad> = (0..n_households)
        .map(|_| HouseholdLoad::sample(&mut rng))
        .collect();
    let arrays: Vec<RooftopPv> = (0..n_buildings)
        .map(|_| RooftopPv::sample(&mut rng))
        .collect();

    let mut consumption = TimeMatrix::zeros(axis.clone(), n_households);
    let mut production = TimeMatrix::zeros(axis.clone(), n_buildings);
    for (t, ts) in axis.iter().enumerate() {
        for (i, household) in households.iter().enumerate() {
            consumption.set(t, i, household.energy_kwh(ts.hour, &mut rng));
        }
        for (i, pv) in arrays.iter().enumerate() {
            production.set(t, i, pv.energy_kwh(ts.month, ts.hour, &mut rng));
        }
    }

    CommunityData {
        production,
        consumption,
    }
}
