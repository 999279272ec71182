// Randomized transaction injection.

use rand::rngs::StdRng;
use rand::{Rng, RngCore};
use serde::Deserialize;

use crate::gn_interface::{NodeId, SimError, SimTime, TxId};

/// A gossiped transaction. Contents are opaque to the simulation; only the
/// size (transfer time) and the hop budget matter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub id: TxId,
    pub origin: NodeId,
    pub size: u64,
    pub timestamp: SimTime,
    /// Remaining gossip hops. Decremented per relay; an expired copy is
    /// stored but not forwarded.
    pub ttl: u32,
}

/// Bounds of one randomized injection batch. One batch is injected per
/// epoch; nothing persists between batches.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransactionBatchSpec {
    pub min_count: usize,
    pub max_count: usize,
    pub max_size: u64,
    pub ttl: u32,
}

impl Default for TransactionBatchSpec {
    fn default() -> Self {
        Self {
            min_count: 100,
            max_count: 400,
            max_size: 15,
            ttl: 6,
        }
    }
}

impl TransactionBatchSpec {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.max_count == 0 {
            return Err(SimError::Configuration(
                "transaction batch max_count must be positive".to_string(),
            ));
        }
        if self.min_count > self.max_count {
            return Err(SimError::Configuration(format!(
                "transaction batch min_count {} exceeds max_count {}",
                self.min_count, self.max_count
            )));
        }
        if self.max_size == 0 {
            return Err(SimError::Configuration(
                "transaction batch max_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Generate one batch: a random count in [min_count, max_count], each
/// transaction with a random size in [1, max_size] and a uniformly chosen
/// origin node, timestamped `now`.
pub fn generate_batch(
    spec: &TransactionBatchSpec,
    node_count: usize,
    now: SimTime,
    rng: &mut StdRng,
) -> Vec<Transaction> {
    if node_count == 0 {
        return Vec::new();
    }

    let count = rng.gen_range(spec.min_count..=spec.max_count);
    let mut batch = Vec::with_capacity(count);
    for _ in 0..count {
        batch.push(Transaction {
            id: rng.next_u64(),
            origin: rng.gen_range(0..node_count),
            size: rng.gen_range(1..=spec.max_size),
            timestamp: now,
            ttl: spec.ttl,
        });
    }
    batch
}
