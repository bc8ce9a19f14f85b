//! Lamellar collectives tying the per-PE engine together.
//!
//! Rank 0 broadcasts topology and update batches into per-PE receptacles;
//! each global round ends with a sparse min-reduction of changed distances
//! and a logical-OR wave deciding termination. Every collective is fenced
//! with `wait_all` plus `barrier`, so no PE observes the next round before
//! the previous reduction has fully landed.

use lamellar::active_messaging::prelude::*;
use lamellar::darc::prelude::*;
use serde::{Deserialize, Serialize};

use std::sync::atomic::{AtomicBool, Ordering};

use crate::distribution::Distribution;
use crate::graph::{Edge, Graph};
use crate::kernel::EdgeKernel;
use crate::sssp::{DistEntry, RelaxConfig, SsspState};

/// Per-PE receptacle for the broadcast graph topology and partition map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharedTopology {
    pub num_vertices: usize,
    pub edges: Vec<Edge>,
    pub part: Vec<usize>,
}

#[lamellar::AmData(Debug, Clone)]
struct BroadcastTopologyAm {
    num_vertices: usize,
    edges: Vec<Edge>,
    part: Vec<usize>,
    slot: LocalRwDarc<SharedTopology>,
}

#[lamellar::am]
impl LamellarAM for BroadcastTopologyAm {
    async fn exec(self) {
        let mut slot = self.slot.write().await;
        slot.num_vertices = self.num_vertices;
        slot.edges = self.edges.clone();
        slot.part = self.part.clone();
    }
}

#[lamellar::AmData(Debug, Clone)]
struct BroadcastUpdatesAm {
    updates: Vec<Edge>,
    slot: LocalRwDarc<Vec<Edge>>,
}

#[lamellar::am]
impl LamellarAM for BroadcastUpdatesAm {
    async fn exec(self) {
        let mut slot = self.slot.write().await;
        slot.clear();
        slot.extend(self.updates.iter().cloned());
    }
}

/// Carries changed `(vertex, dist, parent)` records to every PE; receivers
/// commit strictly smaller distances, which makes the wave an element-wise
/// min-reduction regardless of arrival order.
#[lamellar::AmData(Debug, Clone)]
struct ReduceDistAm {
    entries: Vec<DistEntry>,
    mark_affected: bool,
    state: LocalRwDarc<SsspState>,
}

#[lamellar::am]
impl LamellarAM for ReduceDistAm {
    async fn exec(self) {
        let mut state = self.state.write().await;
        state.commit_remote(&self.entries, self.mark_affected);
    }
}

#[lamellar::AmData(Debug, Clone)]
struct RaiseFlagAm {
    flag: Darc<AtomicBool>,
}

#[lamellar::am]
impl LamellarAM for RaiseFlagAm {
    async fn exec(self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

/// Broadcasts the topology from the rank holding a payload (rank 0). Every
/// PE must call this; it is a collective.
pub fn broadcast_topology(
    world: &lamellar::LamellarWorld,
    slot: &LocalRwDarc<SharedTopology>,
    payload: Option<(usize, Vec<Edge>, Vec<usize>)>,
) {
    if let Some((num_vertices, edges, part)) = payload {
        let _ = world.exec_am_all(BroadcastTopologyAm {
            num_vertices,
            edges,
            part,
            slot: slot.clone(),
        });
    }
    world.wait_all();
    world.barrier();
}

/// Broadcasts a raw update batch from the rank holding a payload. Every PE
/// must call this; it is a collective.
pub fn broadcast_updates(
    world: &lamellar::LamellarWorld,
    slot: &LocalRwDarc<Vec<Edge>>,
    payload: Option<Vec<Edge>>,
) {
    if let Some(updates) = payload {
        let _ = world.exec_am_all(BroadcastUpdatesAm {
            updates,
            slot: slot.clone(),
        });
    }
    world.wait_all();
    world.barrier();
}

/// Logical-OR all-reduce of "this rank is still active". Reset, fence, raise,
/// fence: no rank can observe a stale flag.
fn any_rank_active(
    world: &lamellar::LamellarWorld,
    flag: &Darc<AtomicBool>,
    local_active: bool,
) -> bool {
    flag.store(false, Ordering::Relaxed);
    world.barrier();
    if local_active {
        let _ = world.exec_am_all(RaiseFlagAm { flag: flag.clone() });
    }
    world.wait_all();
    world.barrier();
    flag.load(Ordering::Relaxed)
}

/// The distributed reconvergence loop: per round, a bounded local relaxation
/// block, a sparse min-reduction of everything it lowered, and a convergence
/// wave. Terminates when no rank holds an affected local vertex.
pub fn reconverge(
    world: &lamellar::LamellarWorld,
    state: &LocalRwDarc<SsspState>,
    flag: &Darc<AtomicBool>,
    graph: &Graph,
    layout: &Distribution,
    cfg: &RelaxConfig,
) {
    let kernel = if cfg.use_device {
        Some(EdgeKernel::from_graph(graph))
    } else {
        None
    };
    let max_rounds = 10 * graph.num_vertices() + 10;
    for _round in 0..max_rounds {
        let entries = {
            let mut guard = world.block_on(state.write());
            let changed = guard.relax_block(graph, layout, cfg, kernel.as_ref());
            guard.collect_entries(&changed)
        };
        if !entries.is_empty() {
            let _ = world.exec_am_all(ReduceDistAm {
                entries,
                mark_affected: true,
                state: state.clone(),
            });
        }
        world.wait_all();
        world.barrier();

        let local_active = {
            let guard = world.block_on(state.read());
            layout.any_local_affected(&guard.affected)
        };
        if !any_rank_active(world, flag, local_active) {
            break;
        }
    }
}

/// All-reduce min over the whole distance field: every PE contributes its
/// authoritative local entries and afterwards observes the global minimum.
pub fn gather_results(
    world: &lamellar::LamellarWorld,
    state: &LocalRwDarc<SsspState>,
    layout: &Distribution,
) {
    let entries = {
        let guard = world.block_on(state.read());
        guard.collect_entries(&layout.local_vertices)
    };
    if !entries.is_empty() {
        let _ = world.exec_am_all(ReduceDistAm {
            entries,
            mark_affected: false,
            state: state.clone(),
        });
    }
    world.wait_all();
    world.barrier();
}
