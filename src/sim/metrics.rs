//! Post-simulation metric derivation.
//!
//! Pure bookkeeping over the already-simulated matrices, the per-timestep
//! market solutions, and the battery volumes. Supply and demand are the
//! post-battery values that entered the market, so production minus total
//! supply is exactly the energy producers consumed themselves.

use crate::config::PriceConfig;
use crate::data::TimeMatrix;
use crate::result::{CostMetrics, EnergyMetrics, IndividualMetrics};
use crate::sim::market::MarketSolution;

/// Derives summary metrics from one finished simulation.
pub struct MetricsAggregator<'a> {
    production: &'a TimeMatrix,
    consumption: &'a TimeMatrix,
    supply: &'a TimeMatrix,
    demand: &'a TimeMatrix,
    solutions: &'a [MarketSolution],
    has_pv: &'a [bool],
    charge_per_member: &'a [f64],
    discharge_per_member: &'a [f64],
    prices: &'a PriceConfig,
}

impl<'a> MetricsAggregator<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        production: &'a TimeMatrix,
        consumption: &'a TimeMatrix,
        supply: &'a TimeMatrix,
        demand: &'a TimeMatrix,
        solutions: &'a [MarketSolution],
        has_pv: &'a [bool],
        charge_per_member: &'a [f64],
        discharge_per_member: &'a [f64],
        prices: &'a PriceConfig,
    ) -> Self {
        Self {
            production,
            consumption,
            supply,
            demand,
            solutions,
            has_pv,
            charge_per_member,
            discharge_per_member,
            prices,
        }
    }

    fn members(&self) -> usize {
        self.production.cols()
    }

    fn trading_volume(&self) -> f64 {
        self.solutions.iter().map(MarketSolution::trading_volume).sum()
    }

    fn self_consumption(&self) -> f64 {
        self.production.total() - self.supply.total()
    }

    /// Share of the supply offered to the market that found a buyer.
    /// Zero when nothing was offered. The denominator sums the
    /// per-timestep market totals, the same figure the clearing used.
    pub fn supply_sold_ratio(&self) -> f64 {
        let offered: f64 = self
            .solutions
            .iter()
            .map(MarketSolution::supply_volume)
            .sum();
        if offered == 0.0 {
            0.0
        } else {
            self.trading_volume() / offered
        }
    }

    /// Community-wide energy volumes. Grid flows are clamped at zero from
    /// below since physical flows cannot be negative.
    pub fn energy(&self) -> EnergyMetrics {
        let production = self.production.total();
        let consumption = self.consumption.total();
        let self_consumption = self.self_consumption();
        let trading = self.trading_volume();
        let charge: f64 = self.charge_per_member.iter().sum();
        let discharge: f64 = self.discharge_per_member.iter().sum();

        EnergyMetrics {
            production_kwh: production,
            consumption_kwh: consumption,
            self_consumption_kwh: self_consumption,
            trading_volume_kwh: trading,
            charge_volume_kwh: charge,
            discharge_volume_kwh: discharge,
            grid_import_kwh: (consumption - self_consumption - trading - discharge).max(0.0),
            grid_export_kwh: (production - self_consumption - trading - charge).max(0.0),
        }
    }

    /// Per-member breakdown of the energy volumes.
    pub fn individual(&self) -> IndividualMetrics {
        let n = self.members();
        let mut metrics = IndividualMetrics {
            has_pv: self.has_pv.to_vec(),
            supply_kwh: Vec::with_capacity(n),
            demand_kwh: Vec::with_capacity(n),
            sold_kwh: Vec::with_capacity(n),
            purchased_kwh: Vec::with_capacity(n),
            charge_kwh: self.charge_per_member.to_vec(),
            discharge_kwh: self.discharge_per_member.to_vec(),
            self_consumption_kwh: Vec::with_capacity(n),
            grid_import_kwh: Vec::with_capacity(n),
            grid_export_kwh: Vec::with_capacity(n),
        };
        for i in 0..n {
            let supply = self.supply.column_total(i);
            let demand = self.demand.column_total(i);
            let sold: f64 = self.solutions.iter().map(|s| s.quantity_sold_by(i)).sum();
            let purchased: f64 = self
                .solutions
                .iter()
                .map(|s| s.quantity_purchased_by(i))
                .sum();
            metrics
                .self_consumption_kwh
                .push(self.production.column_total(i) - supply);
            metrics.grid_import_kwh.push((demand - purchased).max(0.0));
            metrics.grid_export_kwh.push((supply - sold).max(0.0));
            metrics.supply_kwh.push(supply);
            metrics.demand_kwh.push(demand);
            metrics.sold_kwh.push(sold);
            metrics.purchased_kwh.push(purchased);
        }
        metrics
    }

    /// Total member cost with and without peer-to-peer trading. Tariffs
    /// are cents per kWh; the totals are divided down to currency units.
    pub fn costs(&self) -> CostMetrics {
        CostMetrics {
            cost_with_lec: self.cost_per_member(true).iter().sum::<f64>() / 100.0,
            cost_without_lec: self.cost_per_member(false).iter().sum::<f64>() / 100.0,
        }
    }

    /// Per-member cost over the horizon (cents). With trading disabled all
    /// exchange settles against the grid tariffs.
    fn cost_per_member(&self, with_trading: bool) -> Vec<f64> {
        let mut costs = vec![0.0; self.members()];
        for (t, solution) in self.solutions.iter().enumerate() {
            for (i, cost) in costs.iter_mut().enumerate() {
                let required = self.demand.get(t, i);
                let from_market = if with_trading {
                    solution.quantity_purchased_by(i)
                } else {
                    0.0
                };
                let buy_cost = (required - from_market) * self.prices.grid_buy
                    + from_market * self.prices.p2p;

                let offered = self.supply.get(t, i);
                let to_market = if with_trading {
                    solution.quantity_sold_by(i)
                } else {
                    0.0
                };
                let sell_profit = (offered - to_market) * self.prices.grid_sell
                    + to_market * self.prices.p2p;

                *cost += buy_cost - sell_profit;
            }
        }
        costs
    }
}
