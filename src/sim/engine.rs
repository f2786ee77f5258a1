//! Simulation orchestration.
//!
//! Runs one scenario end to end: validates the configuration, aggregates
//! the raw data, applies demand shifting and the battery pass, clears the
//! market timestep by timestep, and derives the final metrics. One seeded
//! generator is threaded through every randomized stage so identical
//! inputs and seed reproduce the result bit for bit.

use log::{debug, info};
use rand::{SeedableRng, rngs::StdRng};

use crate::config::ScenarioConfig;
use crate::data::{CommunityData, TimeMatrix};
use crate::error::SimError;
use crate::result::{Profiles, SimulationResult, TradingNetwork};
use crate::sim::aggregate::TimeSeriesAggregator;
use crate::sim::battery::Battery;
use crate::sim::market::{MarketSolution, TradeLedger};
use crate::sim::metrics::MetricsAggregator;
use crate::sim::shifting::DemandShifter;

/// Runs one scenario over one raw dataset.
pub struct SimulationEngine {
    config: ScenarioConfig,
}

impl SimulationEngine {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    /// Runs the full simulation.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidScenario`] when the configuration fails
    /// validation and [`SimError::DataShape`] when the raw data does not
    /// fit the scenario. No partial computation happens in either case.
    pub fn simulate(&self, data: &CommunityData) -> Result<SimulationResult, SimError> {
        let errors = self.config.validate();
        if !errors.is_empty() {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SimError::InvalidScenario(joined));
        }

        let sim = &self.config.simulation;
        info!(
            "simulating {} buildings, season {}, pv {}%, sd {}%, battery {}",
            sim.community_size, sim.season, sim.pv_percentage, sim.sd_percentage, sim.with_battery
        );
        let mut rng = StdRng::seed_from_u64(sim.seed);

        let aggregator = TimeSeriesAggregator::new(
            sim.community_size,
            sim.pv_percentage,
            sim.season,
            self.config.community.block_size,
        );
        let mut community = aggregator.aggregate(data, &mut rng)?;
        debug!(
            "aggregated to {} timesteps x {} buildings",
            community.production.rows(),
            community.production.cols()
        );

        DemandShifter::new(sim.sd_percentage).shift(
            &mut community.consumption,
            &community.production,
            &mut rng,
        );

        let (mut supply, mut demand) = net_positions(&community.production, &community.consumption);

        let n = sim.community_size;
        let mut charge_per_member = vec![0.0; n];
        let mut discharge_per_member = vec![0.0; n];
        if sim.with_battery {
            self.run_batteries(
                &mut supply,
                &mut demand,
                &mut charge_per_member,
                &mut discharge_per_member,
            );
            debug!(
                "batteries absorbed {:.2} kWh, released {:.2} kWh",
                charge_per_member.iter().sum::<f64>(),
                discharge_per_member.iter().sum::<f64>()
            );
        }

        let mut ledger = TradeLedger::new();
        let solutions: Vec<MarketSolution> = (0..supply.rows())
            .map(|t| MarketSolution::clear(supply.row(t), demand.row(t), &mut ledger))
            .collect();

        let metrics = MetricsAggregator::new(
            &community.production,
            &community.consumption,
            &supply,
            &demand,
            &solutions,
            &community.has_pv,
            &charge_per_member,
            &discharge_per_member,
            &self.config.prices,
        );
        debug!(
            "cleared {} timesteps, total trade {:.2} kWh ({:.0}% of offered supply)",
            solutions.len(),
            ledger.total_kwh(),
            metrics.supply_sold_ratio() * 100.0
        );

        Ok(SimulationResult {
            energy: metrics.energy(),
            individual: metrics.individual(),
            costs: metrics.costs(),
            profiles: Profiles {
                load_profile: community.load_profile,
                gen_profile: community.gen_profile,
            },
            trading_network: TradingNetwork::from_ledger(&ledger, n),
        })
    }

    /// One battery per participant: surplus charges it before the market,
    /// deficit discharges it, and the matrices shrink by the moved energy.
    fn run_batteries(
        &self,
        supply: &mut TimeMatrix,
        demand: &mut TimeMatrix,
        charge_per_member: &mut [f64],
        discharge_per_member: &mut [f64],
    ) {
        let dt = self.config.community.timestep_hours;
        let mut batteries: Vec<Battery> = (0..supply.cols())
            .map(|_| Battery::new(self.config.battery.capacity_kwh, dt, &self.config.battery))
            .collect();
        for t in 0..supply.rows() {
            for (i, battery) in batteries.iter_mut().enumerate() {
                if supply.get(t, i) > 0.0 {
                    let drawn = battery.charge(supply.get(t, i));
                    charge_per_member[i] += drawn;
                    supply.add(t, i, -drawn);
                } else if demand.get(t, i) > 0.0 {
                    let delivered = battery.discharge(demand.get(t, i));
                    discharge_per_member[i] += delivered;
                    demand.add(t, i, -delivered);
                }
            }
        }
    }
}

/// Splits production and consumption into non-negative net positions. At
/// most one of supply and demand is nonzero per cell.
fn net_positions(production: &TimeMatrix, consumption: &TimeMatrix) -> (TimeMatrix, TimeMatrix) {
    let axis = production.timestamps().to_vec();
    let mut supply = TimeMatrix::zeros(axis.clone(), production.cols());
    let mut demand = TimeMatrix::zeros(axis, production.cols());
    for t in 0..production.rows() {
        for i in 0..production.cols() {
            let net = production.get(t, i) - consumption.get(t, i);
            if net > 0.0 {
                supply.set(t, i, net);
            } else {
                demand.set(t, i, -net);
            }
        }
    }
    (supply, demand)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SimTimestamp;

    #[test]
    fn net_positions_are_mutually_exclusive() {
        let axis = vec![SimTimestamp::new(6, 1, 12)];
        let production = TimeMatrix::from_rows(axis.clone(), vec![vec![3.0, 0.5, 1.0]]);
        let consumption = TimeMatrix::from_rows(axis, vec![vec![1.0, 2.5, 1.0]]);
        let (supply, demand) = net_positions(&production, &consumption);
        assert_eq!(supply.row(0), &[2.0, 0.0, 0.0]);
        assert_eq!(demand.row(0), &[0.0, 2.0, 0.0]);
        for i in 0..3 {
            assert!(supply.get(0, i) == 0.0 || demand.get(0, i) == 0.0);
        }
    }

    #[test]
    fn invalid_scenario_fails_before_any_work() {
        let mut config = ScenarioConfig::baseline();
        config.simulation.community_size = 3;
        let engine = SimulationEngine::new(config);
        let data = CommunityData::synthetic(5, 6, 1);
        let err = engine.simulate(&data).expect_err("must fail validation");
        assert!(matches!(err, SimError::InvalidScenario(_)));
    }

    #[test]
    fn invalid_scenario_lists_every_violation() {
        let mut config = ScenarioConfig::baseline();
        config.simulation.community_size = 3;
        config.simulation.pv_percentage = 150;
        let engine = SimulationEngine::new(config);
        let data = CommunityData::synthetic(5, 6, 1);
        match engine.simulate(&data) {
            Err(SimError::InvalidScenario(message)) => {
                assert!(message.contains("community_size"));
                assert!(message.contains("pv_percentage"));
            }
            other => panic!("expected invalid scenario, got {other:?}"),
        }
    }
}
