// Blocks and the per-node chain store.

use std::fmt;

use crate::gn_interface::{SimTime, TxId};

// message-size accounting for gossip transfer times
pub const BLOCK_HEADER_SIZE: u64 = 80;
pub const BLOCK_TX_SIZE: u64 = 16;

const GENESIS_PARENT: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// Header of a block. The textual form (`Display`) is what chain reports
/// carry, so it stays on one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp: SimTime,
    pub miner: String,
    pub tx_count: usize,
}

impl fmt::Display for BlockHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<block #{} {} parent={} txs={} time={}>",
            self.number,
            &self.hash[..12],
            &self.parent_hash[..12],
            self.tx_count,
            self.timestamp
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<TxId>,
}

impl Block {
    pub fn new(
        number: u64,
        parent_hash: String,
        timestamp: SimTime,
        miner: String,
        transactions: Vec<TxId>,
    ) -> Self {
        let hash = block_hash(number, &parent_hash, timestamp, &miner, &transactions);
        Self {
            header: BlockHeader {
                number,
                hash,
                parent_hash,
                timestamp,
                miner,
                tx_count: transactions.len(),
            },
            transactions,
        }
    }

    pub fn genesis(timestamp: SimTime) -> Self {
        Self::new(
            0,
            GENESIS_PARENT.to_string(),
            timestamp,
            "genesis".to_string(),
            Vec::new(),
        )
    }

    pub fn size(&self) -> u64 {
        BLOCK_HEADER_SIZE + BLOCK_TX_SIZE * self.transactions.len() as u64
    }
}

fn block_hash(
    number: u64,
    parent_hash: &str,
    timestamp: SimTime,
    miner: &str,
    transactions: &[TxId],
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&number.to_le_bytes());
    hasher.update(parent_hash.as_bytes());
    hasher.update(&timestamp.to_le_bytes());
    hasher.update(miner.as_bytes());
    for tx in transactions {
        hasher.update(&tx.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// In-memory chain owned by one node.
///
/// Blocks live in an ordered store indexed by ordinal number, so random
/// access by number is a plain index lookup. A chain starts empty and is
/// seeded with a genesis block by the provisioner.
#[derive(Debug, Default)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Seed the chain with a genesis block. No-op if already seeded.
    pub fn seed_genesis(&mut self, timestamp: SimTime) {
        if self.blocks.is_empty() {
            self.blocks.push(Block::genesis(timestamp));
        }
    }

    /// The most recently accepted block, if any.
    pub fn head(&self) -> Option<&Block> {
        self.blocks.last()
    }

    pub fn get_block_by_number(&self, number: u64) -> Option<&Block> {
        self.blocks.get(number as usize)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Append `block` iff it extends the current head. Returns whether the
    /// block was accepted.
    pub fn append(&mut self, block: Block) -> bool {
        let extends = match self.blocks.last() {
            Some(head) => {
                block.header.number == head.header.number + 1
                    && block.header.parent_hash == head.header.hash
            }
            None => false,
        };
        if extends {
            self.blocks.push(block);
        }
        extends
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extend(chain: &Chain, miner: &str, txs: Vec<TxId>, at: SimTime) -> Block {
        let head = chain.head().unwrap();
        Block::new(
            head.header.number + 1,
            head.header.hash.clone(),
            at,
            miner.to_string(),
            txs,
        )
    }

    #[test]
    fn test_genesis_seeding() {
        let mut chain = Chain::new();
        assert!(chain.head().is_none());

        chain.seed_genesis(0);
        let head = chain.head().unwrap();
        assert_eq!(head.header.number, 0);
        assert_eq!(head.header.parent_hash, GENESIS_PARENT);

        // seeding twice does not add a second genesis
        chain.seed_genesis(7);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn test_append_extends_head_only() {
        let mut chain = Chain::new();
        chain.seed_genesis(0);

        let b1 = extend(&chain, "miner-a", vec![1, 2], 100);
        assert!(chain.append(b1.clone()));
        assert_eq!(chain.head().unwrap().header.number, 1);

        // a competing block at the same height no longer extends the head
        assert!(!chain.append(b1));

        // wrong parent is rejected even with the right number
        let stale = Block::new(2, "ff".repeat(32), 200, "miner-b".to_string(), vec![]);
        assert!(!chain.append(stale));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_random_access_by_number() {
        let mut chain = Chain::new();
        chain.seed_genesis(0);
        let b1 = extend(&chain, "m", vec![9], 50);
        chain.append(b1);

        assert_eq!(chain.get_block_by_number(0).unwrap().header.number, 0);
        assert_eq!(chain.get_block_by_number(1).unwrap().header.number, 1);
        assert!(chain.get_block_by_number(2).is_none());
    }

    #[test]
    fn test_header_display_is_one_line() {
        let block = Block::genesis(0);
        let text = block.header.to_string();
        assert!(text.starts_with("<block #0 "));
        assert!(!text.contains('\n'));
        assert!(text.contains(&block.header.hash[..12]));
    }
}
