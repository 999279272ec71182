// Simulation participant: address, role, peer set and local chain state.

use hashbrown::HashSet;
use indexmap::IndexSet;

use crate::gn_chain::{Block, Chain};
use crate::gn_interface::{NodeId, Role, TxId};
use crate::gn_transactions::Transaction;

/// An addressable participant in the simulated network.
///
/// Created once by the provisioner, mutated by peer wiring and by chain
/// growth during the run, never destroyed. Peer connections live in an
/// ordered set, so connecting the same pair twice (once from each endpoint
/// of an edge) is a no-op.
pub struct Node {
    pub id: NodeId,
    pub address: String,
    pub location: String,
    pub role: Role,
    pub peers: IndexSet<NodeId>,
    pub chain: Chain,

    // gossip state
    pending: Vec<Transaction>,
    seen_txs: HashSet<TxId>,
    seen_blocks: HashSet<String>,
}

impl Node {
    pub fn new(id: NodeId, address: String, location: String, role: Role) -> Self {
        Self {
            id,
            address,
            location,
            role,
            peers: IndexSet::new(),
            chain: Chain::new(),
            pending: Vec::new(),
            seen_txs: HashSet::new(),
            seen_blocks: HashSet::new(),
        }
    }

    /// Establish a connection to `peer`. Idempotent: re-adding an existing
    /// peer changes nothing. Self-connections are ignored.
    pub fn connect_peer(&mut self, peer: NodeId) -> bool {
        if peer == self.id {
            return false;
        }
        self.peers.insert(peer)
    }

    pub fn num_peers(&self) -> usize {
        self.peers.len()
    }

    /// Take delivery of a gossiped transaction. Returns true on first
    /// sight (the caller relays it on); duplicates are dropped.
    pub fn accept_transaction(&mut self, tx: &Transaction) -> bool {
        if !self.seen_txs.insert(tx.id) {
            return false;
        }
        self.pending.push(tx.clone());
        true
    }

    /// Take delivery of a gossiped block. Appends it when it extends the
    /// local head (first-seen rule) and drops its transactions from the
    /// pending pool. Returns true on first sight.
    pub fn accept_block(&mut self, block: &Block) -> bool {
        if !self.seen_blocks.insert(block.header.hash.clone()) {
            return false;
        }
        if self.chain.append(block.clone()) && !block.transactions.is_empty() {
            let included: HashSet<TxId> = block.transactions.iter().copied().collect();
            self.pending.retain(|tx| !included.contains(&tx.id));
        }
        true
    }

    /// Drain up to `max` pending transactions for inclusion in a new block.
    pub fn take_block_transactions(&mut self, max: usize) -> Vec<Transaction> {
        let n = max.min(self.pending.len());
        self.pending.drain(..n).collect()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn knows_transaction(&self, id: TxId) -> bool {
        self.seen_txs.contains(&id)
    }
}
