//! Simulation result types.
//!
//! The terminal, read-only output of one run: aggregate energy volumes,
//! per-member breakdowns, cost totals with and without trading, the
//! representative daily profiles, and the accumulated trading network as a
//! node/edge list. Everything serializes to JSON for downstream consumers.

use std::fmt;

use serde::Serialize;

use crate::sim::market::TradeLedger;

/// Community-wide energy volumes over the simulated horizon (kWh).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergyMetrics {
    pub production_kwh: f64,
    pub consumption_kwh: f64,
    /// Production consumed by its own producer without entering the market.
    pub self_consumption_kwh: f64,
    /// Total realized peer-to-peer trade.
    pub trading_volume_kwh: f64,
    pub charge_volume_kwh: f64,
    pub discharge_volume_kwh: f64,
    pub grid_import_kwh: f64,
    pub grid_export_kwh: f64,
}

/// Per-member energy volumes, indexed by participant (kWh).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndividualMetrics {
    /// Whether the member kept its PV installation.
    pub has_pv: Vec<bool>,
    pub supply_kwh: Vec<f64>,
    pub demand_kwh: Vec<f64>,
    pub sold_kwh: Vec<f64>,
    pub purchased_kwh: Vec<f64>,
    pub charge_kwh: Vec<f64>,
    pub discharge_kwh: Vec<f64>,
    pub self_consumption_kwh: Vec<f64>,
    pub grid_import_kwh: Vec<f64>,
    pub grid_export_kwh: Vec<f64>,
}

/// Total member cost over the horizon, in currency units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostMetrics {
    /// Total cost with peer-to-peer trading active.
    pub cost_with_lec: f64,
    /// Total cost with all exchange settled against the grid.
    pub cost_without_lec: f64,
}

/// Representative community-wide daily curves (kWh per hour of day).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profiles {
    pub load_profile: Vec<f64>,
    pub gen_profile: Vec<f64>,
}

/// One participant in the trading network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeNode {
    pub id: usize,
}

/// Cumulative realized trade from one seller to one buyer (kWh).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeEdge {
    pub source: usize,
    pub target: usize,
    pub value: f64,
}

/// The run's accumulated trading graph as a node and edge list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradingNetwork {
    pub nodes: Vec<TradeNode>,
    pub edges: Vec<TradeEdge>,
}

impl TradingNetwork {
    /// Serializes a trade ledger over `n_members` participants. Every
    /// member appears as a node, traded or not; edges come out ordered by
    /// seller then buyer.
    pub fn from_ledger(ledger: &TradeLedger, n_members: usize) -> Self {
        let nodes = (0..n_members).map(|id| TradeNode { id }).collect();
        let edges = ledger
            .sorted_edges()
            .into_iter()
            .map(|(source, target, value)| TradeEdge {
                source,
                target,
                value,
            })
            .collect();
        Self { nodes, edges }
    }
}

/// Complete output of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub energy: EnergyMetrics,
    pub individual: IndividualMetrics,
    pub costs: CostMetrics,
    pub profiles: Profiles,
    pub trading_network: TradingNetwork,
}

impl fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.energy;
        writeln!(f, "energy volumes (kWh)")?;
        writeln!(f, "  production        {:>10.2}", e.production_kwh)?;
        writeln!(f, "  consumption       {:>10.2}", e.consumption_kwh)?;
        writeln!(f, "  self-consumption  {:>10.2}", e.self_consumption_kwh)?;
        writeln!(f, "  trading volume    {:>10.2}", e.trading_volume_kwh)?;
        writeln!(f, "  battery charge    {:>10.2}", e.charge_volume_kwh)?;
        writeln!(f, "  battery discharge {:>10.2}", e.discharge_volume_kwh)?;
        writeln!(f, "  grid import       {:>10.2}", e.grid_import_kwh)?;
        writeln!(f, "  grid export       {:>10.2}", e.grid_export_kwh)?;
        writeln!(f, "costs")?;
        writeln!(f, "  with trading      {:>10.2}", self.costs.cost_with_lec)?;
        writeln!(f, "  without trading   {:>10.2}", self.costs.cost_without_lec)?;
        write!(
            f,
            "trading network: {} members, {} edges",
            self.trading_network.nodes.len(),
            self.trading_network.edges.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_lists_every_member_and_orders_edges() {
        let mut ledger = TradeLedger::new();
        crate::sim::market::MarketSolution::clear(
            &[2.0, 0.0, 1.0],
            &[0.0, 3.0, 0.0],
            &mut ledger,
        );
        let network = TradingNetwork::from_ledger(&ledger, 3);
        assert_eq!(network.nodes.len(), 3);
        assert!(!network.edges.is_empty());
        for pair in network.edges.windows(2) {
            assert!((pair[0].source, pair[0].target) < (pair[1].source, pair[1].target));
        }
    }

    #[test]
    fn empty_ledger_yields_nodes_without_edges() {
        let network = TradingNetwork::from_ledger(&TradeLedger::new(), 4);
        assert_eq!(network.nodes.len(), 4);
        assert!(network.edges.is_empty());
    }
}
