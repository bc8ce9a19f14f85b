//! Flat edge-relaxation kernel.
//!
//! This is the device-offload seam: the graph is snapshotted as parallel
//! edge-pair and weight arrays, and one invocation relaxes every edge once
//! against the current distance view. Iterating the kernel reaches a local
//! fixpoint without changing the result of the surrounding engine.

use crate::graph::Graph;

#[derive(Debug, Clone, Default)]
pub struct EdgeKernel {
    pairs: Vec<(usize, usize)>,
    weights: Vec<f32>,
}

impl EdgeKernel {
    /// Snapshots the adjacency as flat arrays. Rebuild after every batch of
    /// graph mutations.
    pub fn from_graph(graph: &Graph) -> Self {
        let edges = graph.collect_edges();
        let mut pairs = Vec::with_capacity(edges.len());
        let mut weights = Vec::with_capacity(edges.len());
        for e in &edges {
            pairs.push((e.u, e.v));
            weights.push(e.weight);
        }
        EdgeKernel { pairs, weights }
    }

    pub fn num_edges(&self) -> usize {
        self.pairs.len()
    }

    /// One relaxation pass over every edge in both directions. Returns true
    /// if any distance was lowered.
    pub fn sweep(&self, dist: &mut [f32], parent: &mut [Option<usize>]) -> bool {
        let mut changed = false;
        for (&(u, v), &w) in self.pairs.iter().zip(&self.weights) {
            let via_u = dist[u] + w;
            if via_u < dist[v] {
                dist[v] = via_u;
                parent[v] = Some(u);
                changed = true;
            }
            let via_v = dist[v] + w;
            if via_v < dist[u] {
                dist[u] = via_v;
                parent[u] = Some(v);
                changed = true;
            }
        }
        changed
    }

    /// Iterates the kernel until no edge relaxes. Any seeded distance field
    /// settles within one pass per tree level, so the pass count is bounded
    /// by the vertex count.
    pub fn run_to_fixpoint(&self, dist: &mut [f32], parent: &mut [Option<usize>]) -> bool {
        let mut any = false;
        for _ in 0..dist.len().max(1) {
            if !self.sweep(dist, parent) {
                break;
            }
            any = true;
        }
        any
    }
}
