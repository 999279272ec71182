// Chain reporting: per-node chain summaries and the shared report sink.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use log::info;
use serde::Serialize;

use crate::gn_interface::SimError;
use crate::gn_node::Node;

/// Well-known output location of the serialized report.
pub const REPORT_PATH: &str = "output/report.json";

/// Per-node chain summary.
///
/// `chain_list` holds the textual block headers from genesis to head, so
/// its length is always `number_of_blocks + 1` (the head's ordinal counts
/// the blocks below it).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChainReportEntry {
    pub head_block_hash: String,
    pub number_of_blocks: u64,
    pub chain_list: Vec<String>,
}

/// Shared, process-wide report data.
///
/// Created empty at world start, passed by reference to whoever produces
/// report data, and serialized exactly once at the end of the run. Writes
/// happen only after the clock has fully advanced, so no locking is needed
/// in the single-threaded design. Key order is insertion order.
#[derive(Debug, Default)]
pub struct ReportSink {
    data: IndexMap<String, serde_json::Value>,
}

impl ReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Serialize>(&mut self, key: String, value: &T) -> Result<(), SimError> {
        let value = serde_json::to_value(value)?;
        self.data.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }
}

/// Traverse every node's chain from genesis to head and write one
/// `<address>_chain` entry per node into the sink.
///
/// Every node must have a chain head (at minimum a genesis block). A node
/// without one aborts the whole reporting phase with
/// `SimError::UninitializedState`; nothing is skipped silently.
pub fn report_node_chains(nodes: &[Node], sink: &mut ReportSink) -> Result<(), SimError> {
    for node in nodes {
        let head = node.chain.head().ok_or_else(|| SimError::UninitializedState {
            address: node.address.clone(),
        })?;

        let mut chain_list = Vec::with_capacity(head.header.number as usize + 1);
        let mut number_of_blocks = 0;
        for ordinal in 0..head.header.number {
            let block =
                node.chain
                    .get_block_by_number(ordinal)
                    .ok_or_else(|| SimError::UninitializedState {
                        address: node.address.clone(),
                    })?;
            chain_list.push(block.header.to_string());
            number_of_blocks += 1;
        }
        chain_list.push(head.header.to_string());

        let entry = ChainReportEntry {
            head_block_hash: format!("{}#{}", &head.header.hash[..8], head.header.number),
            number_of_blocks,
            chain_list,
        };
        sink.insert(format!("{}_chain", node.address), &entry)?;
    }
    Ok(())
}

/// Serialize the whole sink to the well-known output location.
pub fn write_report(sink: &ReportSink) -> Result<(), SimError> {
    write_report_to(sink, Path::new(REPORT_PATH))
}

/// Serialize the whole sink (all entries, not only chain entries) as one
/// JSON document, creating the containing directory if needed and
/// overwriting any prior document. A failed write leaves the in-memory
/// sink untouched, so the write alone can be retried.
pub fn write_report_to(sink: &ReportSink, path: &Path) -> Result<(), SimError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    let document = serde_json::to_string(&sink.data)?;
    fs::write(path, document)?;
    info!("report with {} entries written to {}", sink.len(), path.display());
    Ok(())
}
