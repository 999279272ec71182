// Network link model: per-location latency, transfer times, heartbeat.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;

use crate::gn_interface::{SimError, SimTime};

// ============================================================================
// Settings
// ============================================================================

/// Network model parameters. Per-location figures can be refined by files
/// in `input_dir` (read once at world construction); everything else falls
/// back to these built-in values.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Network name, used in logs only.
    pub name: String,

    /// Latency between locations with no entry in the latency table.
    pub default_latency: SimTime,

    /// Link throughput in size units per time unit.
    pub throughput: u64,

    /// Fixed per-hop processing delay.
    pub processing_delay: SimTime,

    /// Period of the network heartbeat log.
    pub heartbeat_interval: SimTime,

    /// Directory of per-location parameter files. A missing directory is
    /// not an error.
    pub input_dir: Option<PathBuf>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            name: "simnet".to_string(),
            default_latency: 50,
            throughput: 10,
            processing_delay: 5,
            heartbeat_interval: 1000,
            input_dir: Some(PathBuf::from("input-parameters")),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DelayFile {
    #[serde(default)]
    processing: Option<SimTime>,
}

// ============================================================================
// Network
// ============================================================================

type LatencyTable = IndexMap<String, IndexMap<String, SimTime>>;

/// The link model shared by all nodes. Read-only after construction.
pub struct Network {
    pub name: String,
    pub heartbeat_interval: SimTime,
    latency: LatencyTable,
    default_latency: SimTime,
    throughput: u64,
    processing_delay: SimTime,
}

impl Network {
    /// Build the network from settings, refining with the input-parameter
    /// files when the configured directory exists.
    pub fn from_settings(settings: &NetworkSettings) -> Result<Self, SimError> {
        let mut network = Self {
            name: settings.name.clone(),
            heartbeat_interval: settings.heartbeat_interval,
            latency: LatencyTable::new(),
            default_latency: settings.default_latency,
            throughput: settings.throughput.max(1),
            processing_delay: settings.processing_delay,
        };

        match &settings.input_dir {
            Some(dir) if dir.is_dir() => network.load_input_dir(dir)?,
            _ => debug!("network {}: using built-in link parameters", network.name),
        }

        Ok(network)
    }

    fn load_input_dir(&mut self, dir: &Path) -> Result<(), SimError> {
        if let Some(table) = read_input_file::<LatencyTable>(&dir.join("latency.yaml"))? {
            self.latency = table;
        }
        if let Some(throughput) = read_input_file::<u64>(&dir.join("throughput.yaml"))? {
            self.throughput = throughput.max(1);
        }
        if let Some(delays) = read_input_file::<DelayFile>(&dir.join("delays.yaml"))? {
            if let Some(processing) = delays.processing {
                self.processing_delay = processing;
            }
        }
        debug!(
            "network {}: loaded link parameters from {}",
            self.name,
            dir.display()
        );
        Ok(())
    }

    /// Virtual-time delay for delivering a message of `size` units between
    /// two locations. The latency table is treated as symmetric.
    pub fn delivery_delay(&self, from: &str, to: &str, size: u64) -> SimTime {
        let latency = self
            .lookup_latency(from, to)
            .or_else(|| self.lookup_latency(to, from))
            .unwrap_or(self.default_latency);
        latency + self.processing_delay + size / self.throughput
    }

    fn lookup_latency(&self, from: &str, to: &str) -> Option<SimTime> {
        self.latency.get(from).and_then(|row| row.get(to)).copied()
    }
}

fn read_input_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, SimError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(SimError::Io(err)),
    };
    let value = serde_yaml::from_str(&raw).map_err(|err| {
        SimError::Configuration(format!("invalid input file {}: {}", path.display(), err))
    })?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_network() -> Network {
        let mut settings = NetworkSettings::default();
        settings.input_dir = None;
        settings.default_latency = 100;
        settings.throughput = 10;
        settings.processing_delay = 5;
        let mut network = Network::from_settings(&settings).unwrap();

        let mut row = IndexMap::new();
        row.insert("Tokyo".to_string(), 150);
        network.latency.insert("Ohio".to_string(), row);
        network
    }

    #[test]
    fn test_delivery_delay_uses_latency_table() {
        let network = test_network();
        // 150 latency + 5 processing + 20/10 transfer
        assert_eq!(network.delivery_delay("Ohio", "Tokyo", 20), 157);
    }

    #[test]
    fn test_latency_table_is_symmetric() {
        let network = test_network();
        assert_eq!(
            network.delivery_delay("Tokyo", "Ohio", 20),
            network.delivery_delay("Ohio", "Tokyo", 20)
        );
    }

    #[test]
    fn test_unknown_pair_falls_back_to_default() {
        let network = test_network();
        // 100 default + 5 processing + 0 transfer
        assert_eq!(network.delivery_delay("Ohio", "Ireland", 5), 105);
    }
}
