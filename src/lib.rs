//! # GossipNet - Blockchain Network Simulator
//!
//! A discrete-event simulation of a peer-to-peer blockchain network: mining
//! and non-mining nodes spread across geographic locations, wired into a
//! randomized small-world topology, exchanging gossiped transactions and
//! blocks under one shared virtual clock.
//!
//! ## Core Components
//!
//! - **Population planning**: per-location miner/non-miner counts from a
//!   total node count and index-aligned miner ratios
//! - **Topology**: connected Watts-Strogatz peer graph, retried with fresh
//!   randomization until connectivity holds
//! - **Epoch scheduling**: the total duration is partitioned into epochs;
//!   each injects one randomized transaction batch, then advances the clock
//!   to the epoch boundary
//! - **Chain reporting**: per-node chain traversal from genesis to head,
//!   serialized as one JSON document
//!
//! ## Running
//!
//! The `gossip-net` binary runs one full simulation with the fixed built-in
//! configuration and writes `output/report.json`. The `scenario_runner`
//! binary loads the same configuration surface from YAML files:
//!
//! ```no_run
//! use gn_rust::{run_simulation, write_report, SimConfig};
//!
//! let config = SimConfig::default();
//! let world = run_simulation(&config, None).unwrap();
//! write_report(&world.data).unwrap();
//! ```
//!
//! Execution is logically single-threaded over virtual time: every mutation
//! of node/chain state happens inside a clock-ordered event callback, so
//! there is no locking anywhere.

pub mod gn_chain;
pub mod gn_clock;
pub mod gn_config;
pub mod gn_interface;
pub mod gn_network;
pub mod gn_node;
pub mod gn_population;
pub mod gn_report;
pub mod gn_scheduler;
pub mod gn_topology;
pub mod gn_transactions;
pub mod gn_world;

// Re-export commonly used types
pub use gn_chain::{Block, BlockHeader, Chain};
pub use gn_config::{LocationSpec, SimConfig, TopologyConfig};
pub use gn_interface::{EpochDriver, NodeId, Role, SimError, SimTime};
pub use gn_network::{Network, NetworkSettings};
pub use gn_node::Node;
pub use gn_population::{plan_population, MinerAllocation, PopulationPlan};
pub use gn_report::{
    report_node_chains, write_report, write_report_to, ChainReportEntry, ReportSink, REPORT_PATH,
};
pub use gn_scheduler::EpochScheduler;
pub use gn_topology::{PeerGraph, TopologyBuilder};
pub use gn_transactions::{Transaction, TransactionBatchSpec};
pub use gn_world::{run_simulation, MiningConfig, SimWorld};
