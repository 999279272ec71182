// Simulation configuration surface.
//
// One struct enumerates everything a run needs: duration, start time,
// population, topology, epochs, transaction bounds, network and mining
// parameters. The default values are the fixed configuration the main
// binary runs; scenario YAML files deserialize into the same struct.

use serde::Deserialize;

use crate::gn_interface::SimTime;
use crate::gn_network::NetworkSettings;
use crate::gn_transactions::TransactionBatchSpec;
use crate::gn_world::MiningConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct LocationSpec {
    pub name: String,
    pub miner_ratio: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Target degree k of the small-world graph. Even, >= 2, below the
    /// node count.
    pub degree: usize,
    /// Probability of rewiring each lattice edge, in [0, 1).
    pub rewire_probability: f64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            degree: 4,
            rewire_probability: 0.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Total simulated duration in virtual-time units.
    pub duration: SimTime,

    /// Wall-clock epoch seconds the run nominally starts at. Defaults to
    /// the current time.
    pub start_time: Option<u64>,

    /// Requested node population, split equally across locations.
    pub total_nodes: usize,

    /// Locations with their miner ratios, in order.
    pub locations: Vec<LocationSpec>,

    /// Hash-rate sampling range for provisioned miners (mega-hash units).
    pub hashrate_range: (u64, u64),

    pub topology: TopologyConfig,

    /// Number of epochs the duration is partitioned into.
    pub epochs: usize,

    /// Per-epoch transaction injection bounds.
    pub transactions: TransactionBatchSpec,

    pub network: NetworkSettings,

    pub mining: MiningConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            duration: 36000,
            start_time: None,
            total_nodes: 150,
            locations: vec![
                LocationSpec {
                    name: "Ohio".to_string(),
                    miner_ratio: 0.1,
                },
                LocationSpec {
                    name: "Tokyo".to_string(),
                    miner_ratio: 0.04,
                },
                LocationSpec {
                    name: "Ireland".to_string(),
                    miner_ratio: 0.04,
                },
            ],
            hashrate_range: (20, 40),
            topology: TopologyConfig::default(),
            epochs: 10,
            transactions: TransactionBatchSpec::default(),
            network: NetworkSettings::default(),
            mining: MiningConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn location_names(&self) -> Vec<String> {
        self.locations.iter().map(|l| l.name.clone()).collect()
    }

    pub fn miner_ratios(&self) -> Vec<f64> {
        self.locations.iter().map(|l| l.miner_ratio).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_yaml_overrides_defaults() {
        let yaml = r#"
duration: 7200
total_nodes: 24
locations:
  - { name: Ohio, miner_ratio: 0.5 }
  - { name: Tokyo, miner_ratio: 0.0 }
topology:
  degree: 6
epochs: 4
transactions:
  min_count: 10
  max_count: 20
"#;
        let config: SimConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.duration, 7200);
        assert_eq!(config.total_nodes, 24);
        assert_eq!(config.location_names(), ["Ohio", "Tokyo"]);
        assert_eq!(config.miner_ratios(), [0.5, 0.0]);
        assert_eq!(config.topology.degree, 6);
        // unset fields keep their defaults
        assert_eq!(config.topology.rewire_probability, 0.3);
        assert_eq!(config.epochs, 4);
        assert_eq!(config.transactions.min_count, 10);
        assert_eq!(config.transactions.max_count, 20);
        assert_eq!(config.transactions.max_size, 15);
        assert_eq!(config.hashrate_range, (20, 40));
    }
}
