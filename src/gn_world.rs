// The simulation world: nodes, clock, network and event dispatch.
//
// Everything that happens during a run is a SimEvent popped off the shared
// queue and handled here. The epoch scheduler drives the world through the
// EpochDriver seam; it never touches events directly.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::gn_chain::Block;
use crate::gn_clock::EventQueue;
use crate::gn_config::SimConfig;
use crate::gn_interface::{EpochDriver, NodeId, Role, SimError, SimTime, TxId};
use crate::gn_network::Network;
use crate::gn_node::Node;
use crate::gn_population::{plan_population, PopulationPlan};
use crate::gn_report::{report_node_chains, ReportSink};
use crate::gn_scheduler::EpochScheduler;
use crate::gn_topology::TopologyBuilder;
use crate::gn_transactions::{generate_batch, Transaction, TransactionBatchSpec};

// ============================================================================
// Mining parameters
// ============================================================================

/// Block production model. A miner's wake interval is the base interval
/// scaled down by its hash-rate relative to the reference, with +/-50%
/// jitter per wake.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MiningConfig {
    /// Mean block interval at the reference hash-rate.
    pub base_interval: SimTime,

    /// Maximum transactions drained into one block.
    pub block_capacity: usize,

    pub reference_hashrate: u64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            base_interval: 600,
            block_capacity: 200,
            reference_hashrate: 20,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

/// Everything that can happen inside the world, dispatched in clock order.
enum SimEvent {
    TransactionArrival { node: NodeId, tx: Transaction },
    BlockArrival { node: NodeId, block: Block },
    MineWake { node: NodeId },
    Heartbeat,
}

// ============================================================================
// World
// ============================================================================

pub struct SimWorld {
    pub nodes: Vec<Node>,
    pub network: Network,
    /// Shared report data. Empty until after the clock has fully advanced.
    pub data: ReportSink,

    clock: EventQueue<SimEvent>,
    rng: StdRng,
    duration: SimTime,
    started_at: u64,
    mining: MiningConfig,
    blocks_mined: u64,
}

impl SimWorld {
    pub fn new(config: &SimConfig, network: Network, seed: Option<[u8; 32]>) -> Self {
        let seed = seed.unwrap_or_else(|| {
            let mut seed = [0u8; 32];
            rand::thread_rng().fill(&mut seed);
            seed
        });
        let started_at = config.start_time.unwrap_or_else(wall_clock_secs);

        Self {
            nodes: Vec::new(),
            network,
            data: ReportSink::new(),
            clock: EventQueue::new(),
            rng: StdRng::from_seed(seed),
            duration: config.duration,
            started_at,
            mining: config.mining.clone(),
            blocks_mined: 0,
        }
    }

    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    pub fn duration(&self) -> SimTime {
        self.duration
    }

    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    pub fn blocks_mined(&self) -> u64 {
        self.blocks_mined
    }

    /// Highest chain head across all nodes.
    pub fn max_height(&self) -> u64 {
        self.nodes
            .iter()
            .filter_map(|n| n.chain.head())
            .map(|b| b.header.number)
            .max()
            .unwrap_or(0)
    }

    /// Instantiate every node in the plan, miners first, each with a chain
    /// seeded with the (shared) genesis block. Addresses are
    /// `<location>-<n>` with a per-location counter.
    pub fn provision_nodes(&mut self, plan: &PopulationPlan) {
        let mut counters: HashMap<String, usize> = HashMap::new();
        let mut miners = 0;

        for (location, alloc) in &plan.miners {
            for _ in 0..alloc.count {
                let hashrate = self
                    .rng
                    .gen_range(alloc.hashrate_range.0..=alloc.hashrate_range.1);
                self.spawn_node(location, Role::Miner { hashrate }, &mut counters);
                miners += 1;
            }
        }
        for (location, &count) in &plan.non_miners {
            for _ in 0..count {
                self.spawn_node(location, Role::NonMiner, &mut counters);
            }
        }

        info!(
            "provisioned {} nodes ({} miners) across {} locations",
            self.nodes.len(),
            miners,
            plan.non_miners.len()
        );
    }

    fn spawn_node(&mut self, location: &str, role: Role, counters: &mut HashMap<String, usize>) {
        let id = self.nodes.len();
        let seq = counters.entry(location.to_string()).or_insert(0);
        let address = format!("{}-{}", location.to_lowercase(), *seq);
        *seq += 1;

        let mut node = Node::new(id, address, location.to_string(), role);
        node.chain.seed_genesis(0);
        self.nodes.push(node);
    }

    /// Generate the connected peer graph and wire every node to it.
    pub fn wire_topology(&mut self, builder: &TopologyBuilder) -> Result<(), SimError> {
        let graph = builder.build(self.nodes.len(), &mut self.rng)?;
        TopologyBuilder::wire(&graph, &mut self.nodes);
        Ok(())
    }

    /// Start the background processes: the network heartbeat and one mining
    /// wake per miner. Must run after topology wiring, before the epoch
    /// loop.
    pub fn start_processes(&mut self) {
        if self.network.heartbeat_interval <= self.duration {
            self.clock
                .schedule(self.network.heartbeat_interval, SimEvent::Heartbeat);
        }

        let miners: Vec<(NodeId, u64)> = self
            .nodes
            .iter()
            .filter_map(|n| match n.role {
                Role::Miner { hashrate } => Some((n.id, hashrate)),
                Role::NonMiner => None,
            })
            .collect();
        for (node, hashrate) in miners {
            let delay = self.mining_delay(hashrate);
            self.clock.schedule(delay, SimEvent::MineWake { node });
        }
    }

    /// Deliver a transaction to its origin node at the current virtual
    /// time; gossip fan-out happens on arrival.
    pub fn inject_transaction(&mut self, tx: Transaction) {
        let at = self.clock.now();
        let node = tx.origin;
        self.clock.schedule(at, SimEvent::TransactionArrival { node, tx });
    }

    fn handle_event(&mut self, event: SimEvent) {
        match event {
            SimEvent::TransactionArrival { node, tx } => {
                if self.nodes[node].accept_transaction(&tx) && tx.ttl > 0 {
                    let mut relay = tx;
                    relay.ttl -= 1;
                    self.gossip_transaction(node, &relay);
                }
            }
            SimEvent::BlockArrival { node, block } => {
                if self.nodes[node].accept_block(&block) {
                    self.gossip_block(node, &block);
                }
            }
            SimEvent::MineWake { node } => self.mine(node),
            SimEvent::Heartbeat => self.heartbeat(),
        }
    }

    fn mine(&mut self, miner: NodeId) {
        let hashrate = match self.nodes[miner].role {
            Role::Miner { hashrate } => hashrate,
            Role::NonMiner => return,
        };
        let now = self.clock.now();

        let (parent_number, parent_hash) = match self.nodes[miner].chain.head() {
            Some(head) => (head.header.number, head.header.hash.clone()),
            None => {
                warn!("miner {} has no chain head, skipping", self.nodes[miner].address);
                return;
            }
        };

        let txs = self.nodes[miner].take_block_transactions(self.mining.block_capacity);
        let tx_ids: Vec<TxId> = txs.iter().map(|t| t.id).collect();
        let block = Block::new(
            parent_number + 1,
            parent_hash,
            now,
            self.nodes[miner].address.clone(),
            tx_ids,
        );

        self.nodes[miner].accept_block(&block);
        self.blocks_mined += 1;
        debug!(
            "t={} {} mined block #{} ({} txs)",
            now,
            self.nodes[miner].address,
            block.header.number,
            block.transactions.len()
        );
        self.gossip_block(miner, &block);

        let delay = self.mining_delay(hashrate);
        self.clock.schedule(now + delay, SimEvent::MineWake { node: miner });
    }

    fn mining_delay(&mut self, hashrate: u64) -> SimTime {
        let mean = (self.mining.base_interval * self.mining.reference_hashrate
            / hashrate.max(1))
        .max(2);
        self.rng.gen_range(mean / 2..=mean * 3 / 2).max(1)
    }

    fn gossip_transaction(&mut self, from: NodeId, tx: &Transaction) {
        let now = self.clock.now();
        let from_location = self.nodes[from].location.clone();
        let peers: Vec<NodeId> = self.nodes[from].peers.iter().copied().collect();
        for peer in peers {
            let delay =
                self.network
                    .delivery_delay(&from_location, &self.nodes[peer].location, tx.size);
            self.clock.schedule(
                now + delay,
                SimEvent::TransactionArrival {
                    node: peer,
                    tx: tx.clone(),
                },
            );
        }
    }

    fn gossip_block(&mut self, from: NodeId, block: &Block) {
        let now = self.clock.now();
        let from_location = self.nodes[from].location.clone();
        let peers: Vec<NodeId> = self.nodes[from].peers.iter().copied().collect();
        for peer in peers {
            let delay = self.network.delivery_delay(
                &from_location,
                &self.nodes[peer].location,
                block.size(),
            );
            self.clock.schedule(
                now + delay,
                SimEvent::BlockArrival {
                    node: peer,
                    block: block.clone(),
                },
            );
        }
    }

    fn heartbeat(&mut self) {
        let now = self.clock.now();
        debug!(
            "{} heartbeat t={}: {} events pending, max height {}",
            self.network.name,
            now,
            self.clock.len(),
            self.max_height()
        );
        let next = now + self.network.heartbeat_interval;
        if next <= self.duration {
            self.clock.schedule(next, SimEvent::Heartbeat);
        }
    }
}

impl EpochDriver for SimWorld {
    fn broadcast_transactions(&mut self, spec: &TransactionBatchSpec) -> usize {
        let now = self.clock.now();
        let batch = generate_batch(spec, self.nodes.len(), now, &mut self.rng);
        let count = batch.len();
        for tx in batch {
            self.inject_transaction(tx);
        }
        count
    }

    fn advance_clock(&mut self, bound: SimTime) {
        while let Some((_, event)) = self.clock.pop_until(bound) {
            self.handle_event(event);
        }
        self.clock.advance_now(bound);
    }
}

fn wall_clock_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Run one full simulation: plan the population, provision and wire the
/// nodes, start the background processes, drive every epoch, then collect
/// the per-node chain reports into the world's sink. The caller decides
/// when to serialize the sink, so a failed write can be retried without
/// recomputing anything.
pub fn run_simulation(config: &SimConfig, seed: Option<[u8; 32]>) -> Result<SimWorld, SimError> {
    // all parameter validation happens before any simulated time advances
    let scheduler = EpochScheduler::new(config.duration, config.epochs, config.transactions.clone())?;
    let plan = plan_population(
        &config.location_names(),
        &config.miner_ratios(),
        config.total_nodes,
        config.hashrate_range,
    )?;
    let network = Network::from_settings(&config.network)?;

    let mut world = SimWorld::new(config, network, seed);
    info!(
        "{}: starting at wall-clock {}s, duration {} over {} epochs",
        world.network.name,
        world.started_at(),
        config.duration,
        config.epochs
    );

    world.provision_nodes(&plan);
    let builder = TopologyBuilder::new(config.topology.degree, config.topology.rewire_probability);
    world.wire_topology(&builder)?;
    world.start_processes();

    scheduler.run(&mut world);
    info!(
        "simulation complete: {} blocks mined, max height {}",
        world.blocks_mined(),
        world.max_height()
    );

    report_node_chains(&world.nodes, &mut world.data)?;
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gn_config::LocationSpec;
    use crate::gn_report::write_report_to;

    fn line_world(n: usize) -> SimWorld {
        let mut config = SimConfig::default();
        config.duration = 10_000;
        config.network.input_dir = None;
        let network = Network::from_settings(&config.network).unwrap();

        let mut world = SimWorld::new(&config, network, Some([1u8; 32]));
        for i in 0..n {
            let mut node = Node::new(
                i,
                format!("n-{}", i),
                "Ohio".to_string(),
                Role::NonMiner,
            );
            node.chain.seed_genesis(0);
            world.nodes.push(node);
        }
        for i in 0..n.saturating_sub(1) {
            world.nodes[i].connect_peer(i + 1);
            world.nodes[i + 1].connect_peer(i);
        }
        world
    }

    fn tx_with_ttl(id: TxId, ttl: u32) -> Transaction {
        Transaction {
            id,
            origin: 0,
            size: 4,
            timestamp: 0,
            ttl,
        }
    }

    #[test]
    fn test_gossip_stops_when_ttl_expires() {
        let mut world = line_world(3);

        world.inject_transaction(tx_with_ttl(11, 1));
        world.advance_clock(10_000);

        // one hop of budget reaches the middle node and no further
        assert!(world.nodes[0].knows_transaction(11));
        assert!(world.nodes[1].knows_transaction(11));
        assert!(!world.nodes[2].knows_transaction(11));
    }

    #[test]
    fn test_zero_ttl_transaction_is_stored_but_not_relayed() {
        let mut world = line_world(2);

        world.inject_transaction(tx_with_ttl(12, 0));
        world.advance_clock(10_000);

        assert!(world.nodes[0].knows_transaction(12));
        assert!(!world.nodes[1].knows_transaction(12));
    }

    #[test]
    fn test_full_run_report_satisfies_chain_invariant() {
        let mut config = SimConfig::default();
        config.duration = 4000;
        config.epochs = 4;
        config.total_nodes = 12;
        config.locations = vec![
            LocationSpec {
                name: "A".to_string(),
                miner_ratio: 0.5,
            },
            LocationSpec {
                name: "B".to_string(),
                miner_ratio: 0.0,
            },
        ];
        config.topology.degree = 4;
        config.topology.rewire_probability = 0.2;
        config.transactions = TransactionBatchSpec {
            min_count: 5,
            max_count: 10,
            max_size: 8,
            ttl: 3,
        };
        config.mining = MiningConfig {
            base_interval: 400,
            block_capacity: 50,
            reference_hashrate: 20,
        };
        config.network.input_dir = None;
        config.start_time = Some(1_700_000_000);

        let world = run_simulation(&config, Some([7u8; 32])).unwrap();

        // base share 6: A gets 3 miners + 3 non-miners, B gets 6 non-miners
        assert_eq!(world.nodes.len(), 12);
        assert!(world.blocks_mined() > 0);
        assert_eq!(world.data.len(), 12);

        let dir = std::env::temp_dir().join(format!("gn-world-{}", std::process::id()));
        let path = dir.join("report.json");
        write_report_to(&world.data, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();
        let document: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let entries = document.as_object().unwrap();

        for node in &world.nodes {
            let entry = &entries[&format!("{}_chain", node.address)];
            let blocks = entry["number_of_blocks"].as_u64().unwrap();
            let chain_list = entry["chain_list"].as_array().unwrap();
            assert_eq!(chain_list.len() as u64, blocks + 1);
            assert_eq!(
                entry["head_block_hash"].as_str().unwrap(),
                format!(
                    "{}#{}",
                    &node.chain.head().unwrap().header.hash[..8],
                    node.chain.head().unwrap().header.number
                )
            );
        }
    }
}
