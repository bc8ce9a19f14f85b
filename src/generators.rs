//! Seeded random graph and update-batch generators for tests and tooling.

use rand::prelude::*;

use std::collections::HashSet;

use crate::graph::{Edge, Graph};

/// A random connected undirected graph: a spanning path over a shuffled
/// vertex order plus dart-thrown extra edges, all pairs unique.
pub fn random_graph(seed: u64, num_vertices: usize, num_edges: usize) -> Graph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut graph = Graph::new(num_vertices);
    if num_vertices < 2 {
        return graph;
    }

    let mut order: Vec<usize> = (0..num_vertices).collect();
    order.shuffle(&mut rng);

    let mut used = HashSet::new();
    for pair in order.windows(2) {
        let (u, v) = (pair[0].min(pair[1]), pair[0].max(pair[1]));
        used.insert((u, v));
        graph.add_edge(u, v, random_weight(&mut rng));
    }

    while graph.num_edges() < num_edges {
        let u = rng.gen_range(0..num_vertices);
        let v = rng.gen_range(0..num_vertices);
        if u == v {
            continue;
        }
        let key = (u.min(v), u.max(v));
        if used.insert(key) {
            graph.add_edge(key.0, key.1, random_weight(&mut rng));
        }
        if used.len() >= num_vertices * (num_vertices - 1) / 2 {
            break;
        }
    }
    graph
}

/// A random update batch: deletions of existing edges and insertions of new
/// ones, touching each vertex pair at most once so the batch is invertible.
pub fn random_updates(seed: u64, graph: &Graph, count: usize) -> Vec<Edge> {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = graph.num_vertices();
    let mut updates = Vec::with_capacity(count);
    let mut touched = HashSet::new();

    let mut existing = graph.collect_edges();
    existing.shuffle(&mut rng);
    let deletions = count / 2;
    for e in existing.into_iter().take(deletions) {
        touched.insert((e.u.min(e.v), e.u.max(e.v)));
        updates.push(Edge::new(e.u, e.v, -1.0));
    }

    let mut attempts = 0;
    while updates.len() < count && attempts < 100 * count {
        attempts += 1;
        let u = rng.gen_range(0..n);
        let v = rng.gen_range(0..n);
        if u == v {
            continue;
        }
        let key = (u.min(v), u.max(v));
        if graph.edge_weight(u, v).is_some() || !touched.insert(key) {
            continue;
        }
        updates.push(Edge::new(key.0, key.1, random_weight(&mut rng)));
    }

    updates.shuffle(&mut rng);
    updates
}

fn random_weight(rng: &mut StdRng) -> f32 {
    0.5 + rng.gen::<f32>() * 9.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_graphs_are_connected_and_deduped() {
        let graph = random_graph(0, 30, 80);
        assert_eq!(graph.num_vertices(), 30);
        assert!(graph.num_edges() >= 29);

        let mut seen = HashSet::new();
        for e in graph.collect_edges() {
            assert!(e.u != e.v);
            assert!(seen.insert((e.u, e.v)), "duplicate pair {:?}", (e.u, e.v));
        }

        let (dist, _) = crate::baseline::dijkstra(&graph, 0);
        assert!(dist.iter().all(|d| d.is_finite()), "spanning path missing");
    }

    #[test]
    fn same_seed_same_graph() {
        let a = random_graph(123, 20, 50);
        let b = random_graph(123, 20, 50);
        assert_eq!(a.collect_edges().len(), b.collect_edges().len());
        for (x, y) in a.collect_edges().iter().zip(b.collect_edges().iter()) {
            assert_eq!((x.u, x.v, x.weight), (y.u, y.v, y.weight));
        }
    }

    #[test]
    fn update_batches_never_touch_a_pair_twice() {
        let graph = random_graph(2, 25, 60);
        let updates = random_updates(7, &graph, 20);
        let mut seen = HashSet::new();
        for e in &updates {
            assert!(seen.insert((e.u.min(e.v), e.u.max(e.v))));
            if e.is_deletion() {
                assert!(graph.edge_weight(e.u, e.v).is_some());
            } else {
                assert!(graph.edge_weight(e.u, e.v).is_none());
            }
        }
    }
}
