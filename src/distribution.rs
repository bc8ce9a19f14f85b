//! Per-rank derivation of local and ghost vertex sets from the partition map.

use std::collections::HashSet;

use crate::graph::Graph;

/// The vertex footprint of one rank: the vertices it owns, and the ghosts it
/// reads but never authors.
#[derive(Debug, Clone, Default)]
pub struct Distribution {
    pub rank: usize,
    pub local_vertices: Vec<usize>,
    pub ghost_vertices: Vec<usize>,
    owned: Vec<bool>,
}

impl Distribution {
    /// One pass over the rank's local vertices, collecting cross-partition
    /// neighbors as ghosts.
    pub fn new(graph: &Graph, part: &[usize], rank: usize) -> Self {
        let mut owned = vec![false; graph.num_vertices()];
        let mut local_vertices = Vec::new();
        for v in 0..graph.num_vertices() {
            if part[v] == rank {
                owned[v] = true;
                local_vertices.push(v);
            }
        }

        let mut ghosts = HashSet::new();
        for &v in &local_vertices {
            for &(u, _) in graph.neighbors(v) {
                if !owned[u] {
                    ghosts.insert(u);
                }
            }
        }
        let mut ghost_vertices: Vec<usize> = ghosts.into_iter().collect();
        ghost_vertices.sort_unstable();

        Distribution {
            rank,
            local_vertices,
            ghost_vertices,
            owned,
        }
    }

    pub fn is_local(&self, v: usize) -> bool {
        self.owned[v]
    }

    /// True if any local vertex is flagged in `affected`.
    pub fn any_local_affected(&self, affected: &[bool]) -> bool {
        self.local_vertices.iter().any(|&v| affected[v])
    }
}
