//! Temporal and spatial aggregation of raw meter data.
//!
//! Turns per-meter matrices into a community-scale dataset: samples the
//! requested number of buildings, groups raw households into fixed-size
//! blocks, filters to one season, zeroes production for the non-PV share,
//! and reduces the time axis to a representative day per season month by
//! averaging same-(month, hour) readings.

use rand::rngs::StdRng;

use crate::config::Season;
use crate::data::{CommunityData, SimTimestamp, TimeMatrix};
use crate::error::SimError;

/// Community-scale matrices ready for simulation, plus reporting profiles.
#[derive(Debug, Clone)]
pub struct AggregatedCommunity {
    /// Per-building production on the reduced time axis (kWh).
    pub production: TimeMatrix,
    /// Per-building consumption on the reduced time axis (kWh).
    pub consumption: TimeMatrix,
    /// Whether each building kept its PV installation.
    pub has_pv: Vec<bool>,
    /// Mean community consumption per hour of day, pre-reduction (kWh).
    pub load_profile: Vec<f64>,
    /// Mean community production per hour of day, pre-reduction (kWh).
    pub gen_profile: Vec<f64>,
}

/// Builds an [`AggregatedCommunity`] from raw meter data.
#[derive(Debug, Clone)]
pub struct TimeSeriesAggregator {
    community_size: usize,
    pv_percentage: u32,
    season: Season,
    block_size: usize,
}

impl TimeSeriesAggregator {
    pub fn new(community_size: usize, pv_percentage: u32, season: Season, block_size: usize) -> Self {
        Self {
            community_size,
            pv_percentage,
            season,
            block_size,
        }
    }

    /// Runs the full aggregation pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DataShape`] when the household count is not a
    /// whole number of blocks, when the time axes differ, when the data
    /// holds fewer buildings than the requested community size, or when
    /// the season is absent from the time axis.
    pub fn aggregate(
        &self,
        data: &CommunityData,
        rng: &mut StdRng,
    ) -> Result<AggregatedCommunity, SimError> {
        if data.production.timestamps() != data.consumption.timestamps() {
            return Err(SimError::DataShape(
                "production and consumption matrices have different time axes".to_string(),
            ));
        }
        if data.households() != data.buildings() * self.block_size {
            return Err(SimError::DataShape(format!(
                "{} households cannot be split into blocks of {} over {} buildings",
                data.households(),
                self.block_size,
                data.buildings()
            )));
        }
        if data.buildings() < self.community_size {
            return Err(SimError::DataShape(format!(
                "requested {} buildings but data holds only {}",
                self.community_size,
                data.buildings()
            )));
        }

        // sample buildings and the households forming their blocks
        let building_cols =
            rand::seq::index::sample(rng, data.buildings(), self.community_size).into_vec();
        let household_cols = rand::seq::index::sample(
            rng,
            data.households(),
            self.community_size * self.block_size,
        )
        .into_vec();

        let mut production = data.production.select_columns(&building_cols);
        let consumption = block_sums(&data.consumption, &household_cols, self.block_size);

        // drop PV for the buildings outside the adoption percentage
        let without_pv = self.community_size
            - self.community_size * self.pv_percentage as usize / 100;
        let mut has_pv = vec![true; self.community_size];
        for i in rand::seq::index::sample(rng, self.community_size, without_pv).into_vec() {
            production.zero_column(i);
            has_pv[i] = false;
        }

        let season = self.season;
        let production = production.filter_rows(|ts| season.contains_month(ts.month));
        let consumption = consumption.filter_rows(|ts| season.contains_month(ts.month));
        if production.rows() == 0 {
            return Err(SimError::DataShape(format!(
                "time axis holds no data for season \"{season}\""
            )));
        }

        let load_profile = hourly_profile(&consumption);
        let gen_profile = hourly_profile(&production);

        let production = self.reduce(&production);
        let consumption = self.reduce(&consumption);

        Ok(AggregatedCommunity {
            production,
            consumption,
            has_pv,
            load_profile,
            gen_profile,
        })
    }

    /// Collapses the season to one representative day per month: all rows
    /// sharing a `(month, hour)` pair are averaged into one row. The
    /// representative days are numbered by the month's position in the
    /// season so day arithmetic downstream stays meaningful.
    fn reduce(&self, matrix: &TimeMatrix) -> TimeMatrix {
        let mut timestamps = Vec::new();
        let mut rows = Vec::new();
        for (ordinal, &month) in self.season.months().iter().enumerate() {
            for hour in 0..24u32 {
                let mut sum = vec![0.0; matrix.cols()];
                let mut count = 0usize;
                for (t, ts) in matrix.timestamps().iter().enumerate() {
                    if ts.month == month && ts.hour == hour {
                        for (acc, v) in sum.iter_mut().zip(matrix.row(t)) {
                            *acc += v;
                        }
                        count += 1;
                    }
                }
                if count == 0 {
                    continue;
                }
                for acc in &mut sum {
                    *acc /= count as f64;
                }
                timestamps.push(SimTimestamp::new(month, ordinal as u32 + 1, hour));
                rows.push(sum);
            }
        }
        TimeMatrix::from_rows(timestamps, rows)
    }
}

/// Sums sampled household columns into building blocks: block `j` is the
/// sum of columns `households[j*block_size .. (j+1)*block_size]`.
fn block_sums(consumption: &TimeMatrix, households: &[usize], block_size: usize) -> TimeMatrix {
    let n_blocks = households.len() / block_size;
    let mut out = TimeMatrix::zeros(consumption.timestamps().to_vec(), n_blocks);
    for t in 0..consumption.rows() {
        for (j, block) in households.chunks(block_size).enumerate() {
            let kwh: f64 = block.iter().map(|&i| consumption.get(t, i)).sum();
            out.set(t, j, kwh);
        }
    }
    out
}

/// Mean community total per hour of day.
fn hourly_profile(matrix: &TimeMatrix) -> Vec<f64> {
    let mut sums = vec![0.0; 24];
    let mut counts = vec![0usize; 24];
    for (t, ts) in matrix.timestamps().iter().enumerate() {
        sums[ts.hour as usize] += matrix.row_total(t);
        counts[ts.hour as usize] += 1;
    }
    sums.iter()
        .zip(&counts)
        .map(|(&s, &c)| if c == 0 { 0.0 } else { s / c as f64 })
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn sample_data(buildings: usize, block_size: usize) -> CommunityData {
        CommunityData::synthetic(buildings, block_size, 17)
    }

    fn aggregator(size: usize) -> TimeSeriesAggregator {
        TimeSeriesAggregator::new(size, 100, Season::Summer, 6)
    }

    #[test]
    fn reduced_axis_has_one_day_per_season_month() {
        let data = sample_data(12, 6);
        let mut rng = StdRng::seed_from_u64(1);
        let agg = aggregator(10).aggregate(&data, &mut rng).expect("aggregation");
        assert_eq!(agg.production.rows(), 3 * 24);
        assert_eq!(agg.consumption.rows(), 3 * 24);
        assert_eq!(agg.production.timestamps(), agg.consumption.timestamps());
        let first = agg.production.timestamps()[0];
        assert_eq!((first.month, first.day, first.hour), (6, 1, 0));
        let last = agg.production.timestamps()[71];
        assert_eq!((last.month, last.day, last.hour), (8, 3, 23));
    }

    #[test]
    fn winter_reduction_leads_with_december() {
        let data = sample_data(8, 6);
        let mut rng = StdRng::seed_from_u64(2);
        let agg = TimeSeriesAggregator::new(5, 100, Season::Winter, 6)
            .aggregate(&data, &mut rng)
            .expect("aggregation");
        let months: Vec<u32> = agg.production.timestamps().iter().map(|ts| ts.month).collect();
        assert_eq!(months[0], 12);
        assert_eq!(months[24], 1);
        assert_eq!(months[48], 2);
    }

    #[test]
    fn community_size_bounds_columns() {
        let data = sample_data(20, 6);
        let mut rng = StdRng::seed_from_u64(3);
        let agg = aggregator(7).aggregate(&data, &mut rng).expect("aggregation");
        assert_eq!(agg.production.cols(), 7);
        assert_eq!(agg.consumption.cols(), 7);
        assert_eq!(agg.has_pv.len(), 7);
    }

    #[test]
    fn pv_percentage_zeroes_production_columns() {
        let data = sample_data(10, 6);
        let mut rng = StdRng::seed_from_u64(4);
        let agg = TimeSeriesAggregator::new(10, 40, Season::Summer, 6)
            .aggregate(&data, &mut rng)
            .expect("aggregation");
        let with_pv = agg.has_pv.iter().filter(|&&p| p).count();
        assert_eq!(with_pv, 4);
        for (i, &has_pv) in agg.has_pv.iter().enumerate() {
            let total = agg.production.column_total(i);
            if has_pv {
                assert!(total > 0.0);
            } else {
                assert_eq!(total, 0.0);
            }
        }
    }

    #[test]
    fn zero_pv_percentage_kills_all_production() {
        let data = sample_data(8, 6);
        let mut rng = StdRng::seed_from_u64(5);
        let agg = TimeSeriesAggregator::new(8, 0, Season::Summer, 6)
            .aggregate(&data, &mut rng)
            .expect("aggregation");
        assert_eq!(agg.production.total(), 0.0);
        assert!(agg.has_pv.iter().all(|&p| !p));
    }

    #[test]
    fn indivisible_block_size_is_rejected() {
        let data = sample_data(10, 6);
        let mut rng = StdRng::seed_from_u64(6);
        let result = TimeSeriesAggregator::new(10, 100, Season::Summer, 7).aggregate(&data, &mut rng);
        assert!(matches!(result, Err(SimError::DataShape(_))));
    }

    #[test]
    fn oversized_community_is_rejected() {
        let data = sample_data(5, 6);
        let mut rng = StdRng::seed_from_u64(7);
        let result = aggregator(10).aggregate(&data, &mut rng);
        assert!(matches!(result, Err(SimError::DataShape(_))));
    }

    #[test]
    fn profiles_cover_every_hour() {
        let data = sample_data(6, 6);
        let mut rng = StdRng::seed_from_u64(8);
        let agg = aggregator(6).aggregate(&data, &mut rng).expect("aggregation");
        assert_eq!(agg.load_profile.len(), 24);
        assert_eq!(agg.gen_profile.len(), 24);
        assert!(agg.load_profile.iter().all(|&v| v > 0.0));
        // no generation before sunrise
        assert_eq!(agg.gen_profile[0], 0.0);
        assert!(agg.gen_profile[12] > 0.0);
    }

    #[test]
    fn same_seed_aggregates_identically() {
        let data = sample_data(10, 6);
        let mut rng_a = StdRng::seed_from_u64(9);
        let mut rng_b = StdRng::seed_from_u64(9);
        let a = aggregator(6).aggregate(&data, &mut rng_a).expect("aggregation");
        let b = aggregator(6).aggregate(&data, &mut rng_b).expect("aggregation");
        assert_eq!(a.production, b.production);
        assert_eq!(a.consumption, b.consumption);
        assert_eq!(a.has_pv, b.has_pv);
    }
}
