// Shared types for the simulation core.

use std::fmt;
use std::io;

use crate::gn_transactions::TransactionBatchSpec;

// all simulated activity is ordered by one virtual clock of this type
pub type SimTime = u64;

// nodes are addressed by their index in the world's node list
pub type NodeId = usize;

pub type TxId = u64;

/// Role of a participant in the network.
///
/// Miners carry a hash-rate parameter (mega-hash units) that scales their
/// block production interval; non-miners only relay and store.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Role {
    Miner { hashrate: u64 },
    NonMiner,
}

impl Role {
    pub fn is_miner(&self) -> bool {
        matches!(self, Role::Miner { .. })
    }
}

/// Seam between the epoch scheduler and the simulation world.
///
/// The scheduler only ever does two things per epoch: inject one randomized
/// transaction batch, then drive the shared clock forward to the epoch
/// boundary. Both calls are synchronous; `advance_clock` returns once every
/// event scheduled at or before `bound` has run.
pub trait EpochDriver {
    /// Inject one randomized transaction batch at the current virtual time.
    /// Returns the number of transactions injected.
    fn broadcast_transactions(&mut self, spec: &TransactionBatchSpec) -> usize;

    /// Run every pending event with time <= `bound`, in clock order, and
    /// leave the clock exactly at `bound`.
    fn advance_clock(&mut self, bound: SimTime);
}

/// Errors raised by the simulation core.
#[derive(Debug)]
pub enum SimError {
    /// Invalid population ratios/counts, epoch count, duration, topology
    /// parameters or transaction-batch bounds. Raised before any simulated
    /// time advances.
    Configuration(String),

    /// A connected peer graph could not be produced within the attempt bound.
    TopologyGeneration { attempts: usize },

    /// A node's chain lacks a head at reporting time.
    UninitializedState { address: String },

    /// Output directory or report file could not be created or written.
    Io(io::Error),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::Configuration(msg) => write!(f, "configuration error: {}", msg),
            SimError::TopologyGeneration { attempts } => write!(
                f,
                "no connected topology after {} generation attempts",
                attempts
            ),
            SimError::UninitializedState { address } => {
                write!(f, "node {} has no chain head", address)
            }
            SimError::Io(err) => write!(f, "i/o error: {}", err),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SimError {
    fn from(err: io::Error) -> Self {
        SimError::Io(err)
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Io(io::Error::new(io::ErrorKind::InvalidData, err))
    }
}
