//! SSSP state and the two-phase incremental update engine.
//!
//! Phase one ingests a classified update batch: insertions may immediately
//! lower one endpoint, and deleting a tree edge cuts the child's whole
//! subtree loose. Phase two is a bounded-asynchrony relaxation that
//! reconverges the distance field; across PEs its blocks are stitched
//! together by the min-reduction in `collective`.

use log::warn;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use std::collections::HashSet;
use std::fmt;

use crate::distribution::Distribution;
use crate::graph::{Edge, Graph};
use crate::kernel::EdgeKernel;
use crate::updates::UpdateBatch;

/// A changed-distance record carried by the min-reduction: vertex, candidate
/// distance, and the parent that produced it.
pub type DistEntry = (usize, f32, Option<usize>);

#[derive(Debug, Clone, Copy)]
pub struct RelaxConfig {
    /// Local relaxation sub-iterations per global synchronization round.
    pub async_level: usize,
    /// Parallelize the inner sweep over the work set.
    pub use_parallel: bool,
    /// Route each round through the flat edge-relaxation kernel.
    pub use_device: bool,
}

impl Default for RelaxConfig {
    fn default() -> Self {
        RelaxConfig {
            async_level: 1,
            use_parallel: false,
            use_device: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidSource {
    pub source: usize,
    pub num_vertices: usize,
}

impl fmt::Display for InvalidSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "source vertex {} is out of range (0 to {})",
            self.source,
            self.num_vertices.saturating_sub(1)
        )
    }
}

impl std::error::Error for InvalidSource {}

/// Per-vertex shortest-path state, full-size on every PE. Only entries for
/// the PE's local vertices are authoritative.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SsspState {
    pub dist: Vec<f32>,
    pub parent: Vec<Option<usize>>,
    pub affected: Vec<bool>,
    pub affected_del: Vec<bool>,
}

impl SsspState {
    pub fn new(num_vertices: usize) -> Self {
        SsspState {
            dist: vec![f32::INFINITY; num_vertices],
            parent: vec![None; num_vertices],
            affected: vec![false; num_vertices],
            affected_del: vec![false; num_vertices],
        }
    }

    /// Resets to a fresh source. The source is marked affected so the engine
    /// has an initial work set.
    pub fn initialize(&mut self, source: usize) -> Result<(), InvalidSource> {
        let n = self.dist.len();
        if source >= n {
            return Err(InvalidSource {
                source,
                num_vertices: n,
            });
        }
        self.dist.fill(f32::INFINITY);
        self.parent.fill(None);
        self.affected.fill(false);
        self.affected_del.fill(false);
        self.dist[source] = 0.0;
        self.affected[source] = true;
        Ok(())
    }

    /// Ingests a classified batch against the post-update graph: deletions
    /// of tree edges invalidate their subtrees, then insertions seed any
    /// immediate improvements.
    pub fn ingest_batch(&mut self, batch: &UpdateBatch, use_parallel: bool) {
        self.ingest_deletes(&batch.deletes);
        if use_parallel {
            self.ingest_inserts_parallel(&batch.inserts);
        } else {
            self.ingest_inserts(&batch.inserts);
        }
    }

    fn ingest_deletes(&mut self, deletes: &[Edge]) {
        let n = self.dist.len();
        let mut roots = Vec::new();
        for e in deletes {
            if e.u >= n || e.v >= n {
                warn!("invalid vertex indices in deletion: {} {}", e.u, e.v);
                continue;
            }
            // only a tree edge invalidates anything; the child endpoint
            // loses its path
            let child = if self.parent[e.v] == Some(e.u) {
                Some(e.v)
            } else if self.parent[e.u] == Some(e.v) {
                Some(e.u)
            } else {
                None
            };
            if let Some(c) = child {
                self.dist[c] = f32::INFINITY;
                self.parent[c] = None;
                self.affected_del[c] = true;
                self.affected[c] = true;
                roots.push(c);
            }
        }
        if !roots.is_empty() {
            self.invalidate_subtrees(&roots);
        }
    }

    /// Cuts loose every descendant of the given roots in the current tree.
    /// The children index is derived on demand by one pass over `parent`.
    fn invalidate_subtrees(&mut self, roots: &[usize]) {
        let n = self.dist.len();
        let mut children = vec![Vec::new(); n];
        for v in 0..n {
            if let Some(p) = self.parent[v] {
                children[p].push(v);
            }
        }
        let mut stack = roots.to_vec();
        while let Some(v) = stack.pop() {
            for &c in &children[v] {
                self.dist[c] = f32::INFINITY;
                self.parent[c] = None;
                self.affected_del[c] = true;
                self.affected[c] = true;
                stack.push(c);
            }
        }
    }

    fn ingest_inserts(&mut self, inserts: &[Edge]) {
        let n = self.dist.len();
        for e in inserts {
            if e.u >= n || e.v >= n {
                warn!("invalid vertex indices in insertion: {} {}", e.u, e.v);
                continue;
            }
            let (x, y) = if self.dist[e.u] <= self.dist[e.v] {
                (e.u, e.v)
            } else {
                (e.v, e.u)
            };
            let candidate = self.dist[x] + e.weight;
            if candidate < self.dist[y] {
                self.dist[y] = candidate;
                self.parent[y] = Some(x);
                self.affected[y] = true;
            }
        }
    }

    /// Runs one bounded block of relaxation sub-iterations over the rank's
    /// local work set. Returns every vertex whose distance was lowered
    /// during the block, for the min-reduction wave.
    pub fn relax_block(
        &mut self,
        graph: &Graph,
        layout: &Distribution,
        cfg: &RelaxConfig,
        kernel: Option<&EdgeKernel>,
    ) -> Vec<usize> {
        if let Some(kernel) = kernel {
            return self.relax_block_device(layout, kernel);
        }

        let mut changed = HashSet::new();
        let mut work: Vec<usize> = layout
            .local_vertices
            .iter()
            .copied()
            .filter(|&v| self.affected[v])
            .collect();

        for _ in 0..cfg.async_level.max(1) {
            if work.is_empty() {
                break;
            }
            work = if cfg.use_parallel {
                self.sweep_parallel(graph, &work, &mut changed)
            } else {
                self.sweep_serial(graph, &work, &mut changed)
            };
        }

        let mut changed: Vec<usize> = changed.into_iter().collect();
        changed.sort_unstable();
        changed
    }

    /// One sub-iteration. Each work vertex relaxes all incident edges in
    /// both directions; strictly smaller candidates commit together with
    /// their parent. Infinite-distance vertices still get scanned so an
    /// invalidated subtree can reconnect through a finite neighbor.
    fn sweep_serial(
        &mut self,
        graph: &Graph,
        work: &[usize],
        changed: &mut HashSet<usize>,
    ) -> Vec<usize> {
        let mut next = HashSet::new();
        for &v in work {
            self.affected[v] = false;
            for &(u, w) in graph.neighbors(v) {
                let via_v = self.dist[v] + w;
                if via_v < self.dist[u] {
                    self.dist[u] = via_v;
                    self.parent[u] = Some(v);
                    self.affected[u] = true;
                    changed.insert(u);
                    next.insert(u);
                } else {
                    let via_u = self.dist[u] + w;
                    if via_u < self.dist[v] {
                        self.dist[v] = via_u;
                        self.parent[v] = Some(u);
                        self.affected[v] = true;
                        changed.insert(v);
                        next.insert(v);
                    }
                }
            }
        }
        next.into_iter().collect()
    }

    /// Parallel flavor of the sub-iteration: candidates are proposed against
    /// a frozen view of the distances and committed sequentially with the
    /// same strictly-less rule, so double-buffered staleness only delays
    /// convergence.
    fn sweep_parallel(
        &mut self,
        graph: &Graph,
        work: &[usize],
        changed: &mut HashSet<usize>,
    ) -> Vec<usize> {
        let dist = &self.dist;
        let proposals: Vec<DistEntry> = work
            .par_iter()
            .flat_map_iter(|&v| {
                let mut out = Vec::new();
                for &(u, w) in graph.neighbors(v) {
                    let via_v = dist[v] + w;
                    if via_v < dist[u] {
                        out.push((u, via_v, Some(v)));
                    } else {
                        let via_u = dist[u] + w;
                        if via_u < dist[v] {
                            out.push((v, via_u, Some(u)));
                        }
                    }
                }
                out.into_iter()
            })
            .collect();

        for &v in work {
            self.affected[v] = false;
        }
        let mut next = HashSet::new();
        for (v, d, p) in proposals {
            if d < self.dist[v] {
                self.dist[v] = d;
                self.parent[v] = p;
                self.affected[v] = true;
                changed.insert(v);
                next.insert(v);
            }
        }
        next.into_iter().collect()
    }

    /// Device-offload flavor: one kernel invocation relaxes every edge
    /// against a snapshot; iterating it reaches the local fixpoint, so
    /// nothing stays pending locally afterwards.
    fn relax_block_device(&mut self, layout: &Distribution, kernel: &EdgeKernel) -> Vec<usize> {
        if !layout.any_local_affected(&self.affected) {
            return Vec::new();
        }
        let before = self.dist.clone();
        kernel.run_to_fixpoint(&mut self.dist, &mut self.parent);
        for &v in &layout.local_vertices {
            self.affected[v] = false;
        }
        let changed: Vec<usize> = (0..before.len())
            .filter(|&v| self.dist[v] < before[v])
            .collect();
        for &v in &changed {
            self.affected[v] = false;
        }
        changed
    }

    /// Commits remote distance candidates: strictly smaller wins, the
    /// parent rides along. Lowered vertices are re-flagged so their owner
    /// keeps relaxing from the newer value next round.
    ///
    /// Equal distances settle on the lowest-numbered parent instead. Every
    /// commit is eventually rebroadcast, so this keeps the tree copies on
    /// all ranks identical, which deletion classification depends on; it
    /// also keeps the reduction commutative and associative.
    pub fn commit_remote(&mut self, entries: &[DistEntry], mark_affected: bool) {
        let n = self.dist.len();
        for &(v, d, p) in entries {
            if v >= n {
                continue;
            }
            if d < self.dist[v] {
                self.dist[v] = d;
                self.parent[v] = p;
                if mark_affected {
                    self.affected[v] = true;
                }
            } else if d == self.dist[v] && parent_rank(p) < parent_rank(self.parent[v]) {
                self.parent[v] = p;
            }
        }
    }

    /// Packages the given vertices as reduction records.
    pub fn collect_entries(&self, vertices: &[usize]) -> Vec<DistEntry> {
        vertices
            .iter()
            .map(|&v| (v, self.dist[v], self.parent[v]))
            .collect()
    }

    /// Relaxes to the global fixpoint for a worker that owns every vertex.
    /// This is the whole engine at partition count one, and the
    /// initial-computation path on a fresh state.
    pub fn reconverge_local(&mut self, graph: &Graph, cfg: &RelaxConfig) {
        let part = vec![0; graph.num_vertices()];
        let layout = Distribution::new(graph, &part, 0);
        let kernel = if cfg.use_device {
            Some(EdgeKernel::from_graph(graph))
        } else {
            None
        };
        let max_rounds = 10 * graph.num_vertices() + 10;
        for _ in 0..max_rounds {
            self.relax_block(graph, &layout, cfg, kernel.as_ref());
            if !layout.any_local_affected(&self.affected) {
                break;
            }
        }
    }

    /// Propose in parallel against a frozen view, then commit sequentially
    /// with strictly-less wins. Records touching the same vertex reconcile
    /// at commit time.
    fn ingest_inserts_parallel(&mut self, inserts: &[Edge]) {
        let n = self.dist.len();
        let dist = &self.dist;
        let proposals: Vec<DistEntry> = inserts
            .par_iter()
            .filter_map(|e| {
                if e.u >= n || e.v >= n {
                    warn!("invalid vertex indices in insertion: {} {}", e.u, e.v);
                    return None;
                }
                let (x, y) = if dist[e.u] <= dist[e.v] {
                    (e.u, e.v)
                } else {
                    (e.v, e.u)
                };
                let candidate = dist[x] + e.weight;
                (candidate < dist[y]).then_some((y, candidate, Some(x)))
            })
            .collect();
        for (y, d, p) in proposals {
            if d < self.dist[y] {
                self.dist[y] = d;
                self.parent[y] = p;
                self.affected[y] = true;
            }
        }
    }
}

fn parent_rank(p: Option<usize>) -> usize {
    p.unwrap_or(usize::MAX)
}
