//! Per-timestep peer-to-peer market clearing.
//!
//! Each timestep builds a fairness-scaled bipartite flow network from the
//! participants' net supply and demand and solves a maximum flow from a
//! synthetic source to a synthetic sink. The max-flow value is the realized
//! trading volume; per-edge flows give the realized allocation. Interior
//! producer-to-consumer flows are overlaid into a run-scoped
//! [`TradeLedger`].

use std::collections::HashMap;

/// Reserved source node id.
const SOURCE: usize = 0;
/// Reserved sink node id.
const SINK: usize = 1;
/// Stand-in for an unbounded interior edge capacity.
const UNBOUNDED: f64 = f64::MAX / 4.0;
/// Flows below this are treated as zero.
const EPS: f64 = 1e-7;

/// Maps a participant index to its network node id.
///
/// # Panics
///
/// Panics if the mapped id collides with the reserved source or sink id.
fn participant_node(member: usize) -> usize {
    let node = member + 2;
    assert!(node != SOURCE && node != SINK);
    node
}

#[derive(Debug, Clone)]
struct FlowEdge {
    to: usize,
    cap: f64,
    flow: f64,
}

/// A directed flow network with paired residual edges, solved with Dinic's
/// blocking-flow algorithm.
#[derive(Debug, Clone)]
struct FlowNetwork {
    edges: Vec<FlowEdge>,
    /// Outgoing edge ids per node.
    adjacency: Vec<Vec<usize>>,
}

impl FlowNetwork {
    fn new(n_nodes: usize) -> Self {
        Self {
            edges: Vec::new(),
            adjacency: vec![Vec::new(); n_nodes],
        }
    }

    /// Adds a forward edge and its zero-capacity residual twin. Returns the
    /// forward edge id; the twin is always `id ^ 1`.
    fn add_edge(&mut self, from: usize, to: usize, cap: f64) -> usize {
        let id = self.edges.len();
        self.edges.push(FlowEdge { to, cap, flow: 0.0 });
        self.edges.push(FlowEdge {
            to: from,
            cap: 0.0,
            flow: 0.0,
        });
        self.adjacency[from].push(id);
        self.adjacency[to].push(id + 1);
        id
    }

    fn residual(&self, edge: usize) -> f64 {
        self.edges[edge].cap - self.edges[edge].flow
    }

    /// Net flow on a forward edge.
    fn flow(&self, edge: usize) -> f64 {
        self.edges[edge].flow
    }

    /// BFS level graph over residual edges.
    fn levels(&self, source: usize) -> Vec<Option<u32>> {
        let mut levels = vec![None; self.adjacency.len()];
        levels[source] = Some(0);
        let mut queue = std::collections::VecDeque::from([source]);
        while let Some(node) = queue.pop_front() {
            let next = levels[node].unwrap_or(0) + 1;
            for &edge in &self.adjacency[node] {
                let to = self.edges[edge].to;
                if levels[to].is_none() && self.residual(edge) > EPS {
                    levels[to] = Some(next);
                    queue.push_back(to);
                }
            }
        }
        levels
    }

    /// DFS for one augmenting path in the level graph; `iters` tracks the
    /// next unexplored edge per node so dead ends are not revisited.
    fn augment(
        &mut self,
        node: usize,
        sink: usize,
        pushed: f64,
        levels: &[Option<u32>],
        iters: &mut [usize],
    ) -> f64 {
        if node == sink {
            return pushed;
        }
        while iters[node] < self.adjacency[node].len() {
            let edge = self.adjacency[node][iters[node]];
            let to = self.edges[edge].to;
            let advances = match (levels[node], levels[to]) {
                (Some(a), Some(b)) => b == a + 1,
                _ => false,
            };
            if advances && self.residual(edge) > EPS {
                let amount = pushed.min(self.residual(edge));
                let sent = self.augment(to, sink, amount, levels, iters);
                if sent > EPS {
                    self.edges[edge].flow += sent;
                    self.edges[edge ^ 1].flow -= sent;
                    return sent;
                }
            }
            iters[node] += 1;
        }
        0.0
    }

    /// Computes the maximum flow from `source` to `sink`.
    fn max_flow(&mut self, source: usize, sink: usize) -> f64 {
        let mut total = 0.0;
        loop {
            let levels = self.levels(source);
            if levels[sink].is_none() {
                return total;
            }
            let mut iters = vec![0; self.adjacency.len()];
            loop {
                let sent = self.augment(source, sink, f64::MAX, &levels, &mut iters);
                if sent <= EPS {
                    break;
                }
                total += sent;
            }
        }
    }
}

/// Cumulative producer-to-consumer trades over a whole simulation run.
///
/// Created fresh for every run; one [`MarketSolution`] per timestep overlays
/// its realized interior flows into it.
#[derive(Debug, Clone, Default)]
pub struct TradeLedger {
    flows: HashMap<(usize, usize), f64>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a realized trade from `seller` to `buyer`.
    fn record(&mut self, seller: usize, buyer: usize, kwh: f64) {
        *self.flows.entry((seller, buyer)).or_insert(0.0) += kwh;
    }

    /// Total energy traded over the run (kWh).
    pub fn total_kwh(&self) -> f64 {
        self.flows.values().sum()
    }

    /// All (seller, buyer, kWh) entries, ordered by seller then buyer.
    pub fn sorted_edges(&self) -> Vec<(usize, usize, f64)> {
        let mut edges: Vec<_> = self
            .flows
            .iter()
            .map(|(&(seller, buyer), &kwh)| (seller, buyer, kwh))
            .collect();
        edges.sort_by_key(|&(seller, buyer, _)| (seller, buyer));
        edges
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

/// The cleared market for a single timestep.
///
/// Immutable after construction; retained for per-participant queries by
/// the metrics stage.
#[derive(Debug, Clone)]
pub struct MarketSolution {
    trading_volume: f64,
    supply_volume: f64,
    sold: Vec<f64>,
    purchased: Vec<f64>,
}

impl MarketSolution {
    /// Clears the market for one timestep.
    ///
    /// Builds the fairness-scaled network, runs max-flow, and overlays the
    /// interior flows into `ledger`. `supply` and `demand` are indexed by
    /// participant and must have the same length.
    pub fn clear(supply: &[f64], demand: &[f64], ledger: &mut TradeLedger) -> Self {
        assert_eq!(supply.len(), demand.len());
        let n = supply.len();
        let total_supply: f64 = supply.iter().sum();
        let total_demand: f64 = demand.iter().sum();

        // scale the larger side so both sides offer equal aggregate capacity
        let mut supply_ratio = 1.0;
        let mut demand_ratio = 1.0;
        if total_supply > total_demand {
            supply_ratio = total_demand / total_supply;
        } else if total_demand != 0.0 {
            demand_ratio = total_supply / total_demand;
        }

        let mut network = FlowNetwork::new(n + 2);
        let mut producers = Vec::new();
        let mut consumers = Vec::new();
        let mut supply_edges = vec![None; n];
        let mut demand_edges = vec![None; n];
        for i in 0..n {
            let node = participant_node(i);
            if supply[i] > 0.0 {
                producers.push(i);
                supply_edges[i] = Some(network.add_edge(SOURCE, node, supply[i] * supply_ratio));
            } else if demand[i] > 0.0 {
                consumers.push(i);
                demand_edges[i] = Some(network.add_edge(node, SINK, demand[i] * demand_ratio));
            }
        }
        let mut interior = Vec::with_capacity(producers.len() * consumers.len());
        for &seller in &producers {
            for &buyer in &consumers {
                let edge = network.add_edge(
                    participant_node(seller),
                    participant_node(buyer),
                    UNBOUNDED,
                );
                interior.push((seller, buyer, edge));
            }
        }

        let max_flow = network.max_flow(SOURCE, SINK);
        // the scaling can drift a hair above the true supply bound
        let trading_volume = max_flow.min(total_supply);

        let sold = supply_edges
            .iter()
            .map(|edge| edge.map_or(0.0, |e| network.flow(e)))
            .collect();
        let purchased = demand_edges
            .iter()
            .map(|edge| edge.map_or(0.0, |e| network.flow(e)))
            .collect();
        for &(seller, buyer, edge) in &interior {
            let kwh = network.flow(edge);
            if kwh > EPS {
                ledger.record(seller, buyer, kwh);
            }
        }

        Self {
            trading_volume,
            supply_volume: total_supply,
            sold,
            purchased,
        }
    }

    /// Realized trading volume this timestep (kWh).
    pub fn trading_volume(&self) -> f64 {
        self.trading_volume
    }

    /// Unscaled total supply offered this timestep (kWh).
    pub fn supply_volume(&self) -> f64 {
        self.supply_volume
    }

    /// Energy sold by a participant this timestep (kWh).
    pub fn quantity_sold_by(&self, member: usize) -> f64 {
        self.sold[member]
    }

    /// Energy purchased by a participant this timestep (kWh).
    pub fn quantity_purchased_by(&self, member: usize) -> f64 {
        self.purchased[member]
    }
}
