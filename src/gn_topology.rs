// Small-world peer topology.
//
// Classic Watts-Strogatz construction: a ring lattice where every vertex
// connects to its k nearest neighbors, with each lattice edge rewired to a
// random target with probability p. Generation retries with fresh
// randomization until the graph comes out connected; the retry count is
// bounded, never open-ended.

use std::collections::VecDeque;

use indexmap::IndexSet;
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;

use crate::gn_interface::{NodeId, SimError};
use crate::gn_node::Node;

const DEFAULT_MAX_ATTEMPTS: usize = 100;

// ============================================================================
// Peer Graph
// ============================================================================

/// Undirected graph over node indices 0..N-1. Built once before any
/// simulated time advances; read-only afterwards.
#[derive(Clone, Debug)]
pub struct PeerGraph {
    adjacency: Vec<IndexSet<NodeId>>,
}

impl PeerGraph {
    fn ring_lattice(n: usize, k: usize) -> Self {
        let mut graph = Self {
            adjacency: vec![IndexSet::new(); n],
        };
        for u in 0..n {
            for offset in 1..=k / 2 {
                graph.add_edge(u, (u + offset) % n);
            }
        }
        graph
    }

    fn add_edge(&mut self, u: NodeId, v: NodeId) {
        self.adjacency[u].insert(v);
        self.adjacency[v].insert(u);
    }

    fn remove_edge(&mut self, u: NodeId, v: NodeId) {
        self.adjacency[u].swap_remove(&v);
        self.adjacency[v].swap_remove(&u);
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn degree(&self, u: NodeId) -> usize {
        self.adjacency[u].len()
    }

    pub fn min_degree(&self) -> usize {
        self.adjacency.iter().map(|n| n.len()).min().unwrap_or(0)
    }

    pub fn neighbors(&self, u: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency[u].iter().copied()
    }

    pub fn is_connected(&self) -> bool {
        let n = self.adjacency.len();
        if n == 0 {
            return true;
        }
        let mut visited = vec![false; n];
        let mut queue = VecDeque::from([0]);
        visited[0] = true;
        let mut reached = 1;

        while let Some(u) = queue.pop_front() {
            for &v in &self.adjacency[u] {
                if !visited[v] {
                    visited[v] = true;
                    reached += 1;
                    queue.push_back(v);
                }
            }
        }
        reached == n
    }

    /// Longest shortest path between any two vertices. `None` when the
    /// graph is disconnected. Observability only.
    pub fn diameter(&self) -> Option<usize> {
        let n = self.adjacency.len();
        let mut diameter = 0;

        for start in 0..n {
            let mut dist = vec![usize::MAX; n];
            let mut queue = VecDeque::from([start]);
            dist[start] = 0;

            while let Some(u) = queue.pop_front() {
                for &v in &self.adjacency[u] {
                    if dist[v] == usize::MAX {
                        dist[v] = dist[u] + 1;
                        queue.push_back(v);
                    }
                }
            }

            for d in dist {
                if d == usize::MAX {
                    return None;
                }
                diameter = diameter.max(d);
            }
        }
        Some(diameter)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Generates a connected small-world graph and wires nodes to it.
#[derive(Clone, Debug)]
pub struct TopologyBuilder {
    degree: usize,
    rewire_probability: f64,
    max_attempts: usize,
}

impl TopologyBuilder {
    pub fn new(degree: usize, rewire_probability: f64) -> Self {
        Self {
            degree,
            rewire_probability,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Generate a connected graph over `n` vertices. Connectivity is a hard
    /// postcondition: generation repeats with fresh randomization up to the
    /// attempt bound and fails rather than return a disconnected graph.
    pub fn build(&self, n: usize, rng: &mut StdRng) -> Result<PeerGraph, SimError> {
        self.validate(n)?;

        for attempt in 1..=self.max_attempts {
            let mut graph = PeerGraph::ring_lattice(n, self.degree);
            self.rewire(&mut graph, rng);

            if graph.is_connected() {
                debug!(
                    "topology: n={} k={} p={} connected on attempt {}",
                    n, self.degree, self.rewire_probability, attempt
                );
                return Ok(graph);
            }
        }

        Err(SimError::TopologyGeneration {
            attempts: self.max_attempts,
        })
    }

    fn validate(&self, n: usize) -> Result<(), SimError> {
        if self.degree >= n {
            return Err(SimError::Configuration(format!(
                "topology degree {} must be below the node count {}",
                self.degree, n
            )));
        }
        if self.degree < 2 || self.degree % 2 != 0 {
            return Err(SimError::Configuration(format!(
                "topology degree {} must be an even integer >= 2",
                self.degree
            )));
        }
        if !(0.0..1.0).contains(&self.rewire_probability) {
            return Err(SimError::Configuration(format!(
                "rewiring probability {} is outside [0, 1)",
                self.rewire_probability
            )));
        }
        Ok(())
    }

    fn rewire(&self, graph: &mut PeerGraph, rng: &mut StdRng) {
        let n = graph.len();
        for u in 0..n {
            for offset in 1..=self.degree / 2 {
                if !rng.gen_bool(self.rewire_probability) {
                    continue;
                }
                // a saturated vertex has nowhere left to rewire to
                if graph.degree(u) >= n - 1 {
                    continue;
                }
                let v = (u + offset) % n;
                let w = loop {
                    let candidate = rng.gen_range(0..n);
                    if candidate != u && !graph.adjacency[u].contains(&candidate) {
                        break candidate;
                    }
                };
                graph.remove_edge(u, v);
                graph.add_edge(u, w);
            }
        }
    }

    /// Instruct every node to connect to its neighbors in the final graph.
    /// Both directions of each edge are issued; `connect_peer` is
    /// idempotent, so the double call is harmless.
    pub fn wire(graph: &PeerGraph, nodes: &mut [Node]) {
        for u in 0..graph.len() {
            let neighbors: Vec<NodeId> = graph.neighbors(u).collect();
            for v in neighbors {
                nodes[u].connect_peer(v);
                nodes[v].connect_peer(u);
            }
        }

        if let Some(diameter) = graph.diameter() {
            debug!("topology: wired {} nodes, diameter {}", graph.len(), diameter);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gn_interface::Role;
    use rand::SeedableRng;

    #[test]
    fn test_connected_with_structural_minimum_degree_across_seeds() {
        let builder = TopologyBuilder::new(4, 0.25);

        for seed in 0..50u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let graph = builder.build(10, &mut rng).unwrap();

            assert!(graph.is_connected(), "disconnected graph for seed {}", seed);
            // every vertex keeps its k/2 lattice slots through rewiring
            assert!(
                graph.min_degree() >= 2,
                "degree below structural minimum for seed {}",
                seed
            );
            assert!(graph.diameter().is_some());
        }
    }

    #[test]
    fn test_degree_must_be_below_node_count() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = TopologyBuilder::new(4, 0.25).build(3, &mut rng);
        assert!(matches!(err, Err(SimError::Configuration(_))));
    }

    #[test]
    fn test_invalid_degree_and_probability_are_rejected() {
        let mut rng = StdRng::seed_from_u64(0);

        let odd = TopologyBuilder::new(3, 0.25).build(10, &mut rng);
        assert!(matches!(odd, Err(SimError::Configuration(_))));

        let tiny = TopologyBuilder::new(0, 0.25).build(10, &mut rng);
        assert!(matches!(tiny, Err(SimError::Configuration(_))));

        let p = TopologyBuilder::new(4, 1.0).build(10, &mut rng);
        assert!(matches!(p, Err(SimError::Configuration(_))));
    }

    #[test]
    fn test_unrewired_lattice_is_connected_first_try() {
        let mut rng = StdRng::seed_from_u64(0);
        let graph = TopologyBuilder::new(4, 0.0).build(12, &mut rng).unwrap();

        assert!(graph.is_connected());
        for u in 0..graph.len() {
            assert_eq!(graph.degree(u), 4);
        }
    }

    #[test]
    fn test_wire_connects_both_endpoints() {
        let mut rng = StdRng::seed_from_u64(7);
        let graph = TopologyBuilder::new(2, 0.0).build(4, &mut rng).unwrap();

        let mut nodes: Vec<Node> = (0..4)
            .map(|i| Node::new(i, format!("n-{}", i), "A".to_string(), Role::NonMiner))
            .collect();
        TopologyBuilder::wire(&graph, &mut nodes);

        for u in 0..4 {
            assert_eq!(nodes[u].num_peers(), graph.degree(u));
            for v in graph.neighbors(u) {
                assert!(nodes[v].peers.contains(&u));
            }
        }
    }
}
