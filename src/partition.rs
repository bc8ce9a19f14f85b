//! K-way vertex partitioning.
//!
//! The partitioner grows regions breadth-first over a CSR view of the
//! adjacency and then runs one neighbor-majority refinement pass, trading a
//! soft vertex-count balance for a smaller edge cut. Partitions need not be
//! contiguous. Any failure falls back to round-robin assignment, which
//! cannot fail.

use log::{info, warn};
use sprs::{CsMat, TriMat};

use std::collections::VecDeque;
use std::fmt;

use crate::graph::Graph;

#[derive(Debug)]
pub struct PartitionError(String);

impl fmt::Display for PartitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "partitioning failed: {}", self.0)
    }
}

impl std::error::Error for PartitionError {}

/// Assembles the CSR pattern of the adjacency. Weights ride along but only
/// the sparsity structure is consulted.
pub fn adjacency_csr(graph: &Graph) -> CsMat<f32> {
    let n = graph.num_vertices();
    let mut rows = Vec::with_capacity(2 * graph.num_edges());
    let mut cols = Vec::with_capacity(2 * graph.num_edges());
    let mut weights = Vec::with_capacity(2 * graph.num_edges());
    for u in 0..n {
        for &(v, w) in graph.neighbors(u) {
            rows.push(u);
            cols.push(v);
            weights.push(w);
        }
    }
    TriMat::from_triplets((n, n), rows, cols, weights).to_csr()
}

/// Partitions the vertex set into `num_parts` parts. Clamps `num_parts` to
/// the vertex count and falls back to round-robin if the cut-minimizing
/// routine fails.
pub fn partition_graph(graph: &Graph, num_parts: usize) -> Vec<usize> {
    partition_graph_with(graph, num_parts, partition_kway)
}

/// Same contract with the cut-minimizing routine injectable, so callers and
/// tests can swap it out; any error it returns degrades to round-robin.
pub fn partition_graph_with<F>(graph: &Graph, num_parts: usize, kway: F) -> Vec<usize>
where
    F: Fn(&Graph, usize) -> Result<Vec<usize>, PartitionError>,
{
    let n = graph.num_vertices();
    if n == 0 || num_parts == 0 {
        return Vec::new();
    }
    let parts = if num_parts > n {
        warn!("more partitions than vertices, clamping {num_parts} to {n}");
        n
    } else {
        num_parts
    };

    match kway(graph, parts) {
        Ok(part) => {
            let mut sizes = vec![0usize; parts];
            for &p in &part {
                sizes[p] += 1;
            }
            info!(
                "partitioned {} vertices into {} parts, sizes {:?}, cut {}",
                n,
                parts,
                sizes,
                cut_edges(graph, &part)
            );
            part
        }
        Err(e) => {
            warn!("{e}; using round-robin vertex partitioning instead");
            round_robin(n, parts)
        }
    }
}

pub(crate) fn round_robin(num_vertices: usize, num_parts: usize) -> Vec<usize> {
    (0..num_vertices).map(|v| v % num_parts).collect()
}

/// Counts edges whose endpoints land in different parts.
pub fn cut_edges(graph: &Graph, part: &[usize]) -> usize {
    let mut cut = 0;
    for u in 0..graph.num_vertices() {
        for &(v, _) in graph.neighbors(u) {
            if u < v && part[u] != part[v] {
                cut += 1;
            }
        }
    }
    cut
}

/// BFS region growing plus one refinement pass. The validation at the end
/// guards against future routine swaps handing back a partial assignment.
pub fn partition_kway(graph: &Graph, num_parts: usize) -> Result<Vec<usize>, PartitionError> {
    let n = graph.num_vertices();
    let csr = adjacency_csr(graph);

    let mut part = vec![usize::MAX; n];
    let mut assigned = 0usize;

    // Grow one region at a time, restarting from a fresh seed whenever the
    // frontier dies out in a disconnected component.
    for k in 0..num_parts {
        let remaining_parts = num_parts - k;
        let target = (n - assigned).div_ceil(remaining_parts);
        let mut size = 0usize;
        let mut queue = VecDeque::new();

        while size < target {
            if queue.is_empty() {
                match next_seed(graph, &part) {
                    Some(seed) => queue.push_back(seed),
                    None => break,
                }
            }
            let Some(v) = queue.pop_front() else { break };
            if part[v] != usize::MAX {
                continue;
            }
            part[v] = k;
            size += 1;
            assigned += 1;
            let row = csr
                .outer_view(v)
                .ok_or_else(|| PartitionError(format!("missing CSR row for vertex {v}")))?;
            for (u, _) in row.iter() {
                if part[u] == usize::MAX {
                    queue.push_back(u);
                }
            }
        }
    }

    if assigned != n {
        return Err(PartitionError(format!(
            "{} of {} vertices left unassigned",
            n - assigned,
            n
        )));
    }

    refine(&csr, &mut part, num_parts);

    if part.iter().any(|&p| p >= num_parts) {
        return Err(PartitionError("partition index out of range".to_string()));
    }
    Ok(part)
}

/// Picks the unassigned vertex of maximum degree, lowest index on ties.
fn next_seed(graph: &Graph, part: &[usize]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for v in 0..graph.num_vertices() {
        if part[v] != usize::MAX {
            continue;
        }
        let d = graph.degree(v);
        match best {
            Some((_, bd)) if bd >= d => {}
            _ => best = Some((v, d)),
        }
    }
    best.map(|(v, _)| v)
}

/// One neighbor-majority pass: moves boundary vertices to the part most of
/// their neighbors live in, as long as the soft balance cap is respected.
fn refine(csr: &CsMat<f32>, part: &mut [usize], num_parts: usize) {
    let n = part.len();
    let cap = n.div_ceil(num_parts) + 1;
    let mut sizes = vec![0usize; num_parts];
    for &p in part.iter() {
        sizes[p] += 1;
    }

    let mut tally = vec![0usize; num_parts];
    for v in 0..n {
        let Some(row) = csr.outer_view(v) else { continue };
        tally.iter_mut().for_each(|t| *t = 0);
        for (u, _) in row.iter() {
            tally[part[u]] += 1;
        }
        let cur = part[v];
        let best = (0..num_parts).max_by_key(|&p| (tally[p], p == cur)).unwrap_or(cur);
        if best != cur && tally[best] > tally[cur] && sizes[best] + 1 <= cap {
            sizes[cur] -= 1;
            sizes[best] += 1;
            part[v] = best;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::random_graph;

    fn check_total(part: &[usize], n: usize, parts: usize) {
        assert_eq!(part.len(), n);
        assert!(part.iter().all(|&p| p < parts));
    }

    #[test]
    fn single_part_assigns_everything_to_zero() {
        let graph = random_graph(7, 20, 40);
        let part = partition_graph(&graph, 1);
        assert!(part.iter().all(|&p| p == 0));
    }

    #[test]
    fn every_vertex_gets_exactly_one_part() {
        let graph = random_graph(11, 50, 120);
        for parts in [2, 3, 4] {
            let part = partition_graph(&graph, parts);
            check_total(&part, 50, parts);
            let mut sizes = vec![0usize; parts];
            for &p in &part {
                sizes[p] += 1;
            }
            assert_eq!(sizes.iter().sum::<usize>(), 50);
        }
    }

    #[test]
    fn disconnected_graphs_partition_fully() {
        // two components plus isolated vertices
        let mut graph = Graph::new(8);
        graph.add_edge(0, 1, 1.0);
        graph.add_edge(1, 2, 1.0);
        graph.add_edge(4, 5, 1.0);
        let part = partition_graph(&graph, 3);
        check_total(&part, 8, 3);
    }

    #[test]
    fn clamps_when_more_parts_than_vertices() {
        let mut graph = Graph::new(3);
        graph.add_edge(0, 1, 1.0);
        let part = partition_graph(&graph, 8);
        check_total(&part, 3, 3);
    }

    #[test]
    fn round_robin_is_deterministic() {
        assert_eq!(round_robin(5, 2), vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn partitioner_failure_degrades_to_round_robin() {
        let graph = random_graph(13, 20, 50);
        let part = partition_graph_with(&graph, 3, |_, _| {
            Err(PartitionError("injected failure".to_string()))
        });
        assert_eq!(part, round_robin(20, 3));
        // the clamp applies before the failing routine is consulted
        let mut tiny = Graph::new(2);
        tiny.add_edge(0, 1, 1.0);
        let part = partition_graph_with(&tiny, 5, |_, parts| {
            assert_eq!(parts, 2);
            Err(PartitionError("injected failure".to_string()))
        });
        assert_eq!(part, round_robin(2, 2));
    }

    #[test]
    fn path_graph_cut_beats_round_robin() {
        let mut graph = Graph::new(40);
        for v in 0..39 {
            graph.add_edge(v, v + 1, 1.0);
        }
        let part = partition_graph(&graph, 4);
        check_total(&part, 40, 4);
        // region growth keeps chains contiguous; round-robin cuts every edge
        assert!(cut_edges(&graph, &part) < cut_edges(&graph, &round_robin(40, 4)));
    }
}
