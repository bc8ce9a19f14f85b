//! Binary-heap Dijkstra: the full-recompute reference for the incremental
//! engine.

use ordered_float::OrderedFloat;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::graph::Graph;

#[derive(Debug, PartialEq, Eq)]
struct State {
    vertex: usize,
    cost: OrderedFloat<f32>,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.cmp(&self.cost)
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest-path distances and parents from `source` over the whole graph.
pub fn dijkstra(graph: &Graph, source: usize) -> (Vec<f32>, Vec<Option<usize>>) {
    let n = graph.num_vertices();
    let mut dist = vec![f32::INFINITY; n];
    let mut parent = vec![None; n];
    let mut heap = BinaryHeap::new();

    dist[source] = 0.0;
    heap.push(State {
        vertex: source,
        cost: OrderedFloat(0.0),
    });

    while let Some(State { vertex, cost }) = heap.pop() {
        if cost.0 > dist[vertex] {
            continue;
        }
        for &(next, weight) in graph.neighbors(vertex) {
            let candidate = cost.0 + weight;
            if candidate < dist[next] {
                dist[next] = candidate;
                parent[next] = Some(vertex);
                heap.push(State {
                    vertex: next,
                    cost: OrderedFloat(candidate),
                });
            }
        }
    }

    (dist, parent)
}
