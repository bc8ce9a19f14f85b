//! In-memory undirected graph with batched mutations.
//!
//! Every PE holds the full adjacency; ownership of vertices is decided by the
//! partition map, not by the storage. The text format is `V E` on the first
//! line followed by `u v w` edge lines; `#` starts a comment.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// One undirected edge record. A negative weight marks a deletion when the
/// record appears in an update batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub u: usize,
    pub v: usize,
    pub weight: f32,
}

impl Edge {
    pub fn new(u: usize, v: usize, weight: f32) -> Self {
        Edge { u, v, weight }
    }

    pub fn is_deletion(&self) -> bool {
        self.weight < 0.0
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    num_vertices: usize,
    num_edges: usize,
    adj: Vec<Vec<(usize, f32)>>,
}

impl Graph {
    pub fn new(num_vertices: usize) -> Self {
        Graph {
            num_vertices,
            num_edges: 0,
            adj: vec![Vec::new(); num_vertices],
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    pub fn neighbors(&self, v: usize) -> &[(usize, f32)] {
        &self.adj[v]
    }

    pub fn degree(&self, v: usize) -> usize {
        self.adj[v].len()
    }

    /// Looks up the weight of `{u, v}`, if present.
    pub fn edge_weight(&self, u: usize, v: usize) -> Option<f32> {
        if u >= self.num_vertices {
            return None;
        }
        self.adj[u].iter().find(|&&(n, _)| n == v).map(|&(_, w)| w)
    }

    fn valid_pair(&self, u: usize, v: usize) -> bool {
        u < self.num_vertices && v < self.num_vertices
    }

    /// Appends `{u, v, w}` in both directions. Callers ensure the pair is not
    /// already present.
    pub fn add_edge(&mut self, u: usize, v: usize, weight: f32) {
        if !self.valid_pair(u, v) {
            warn!("invalid vertex indices in edge: {} {}", u, v);
            return;
        }
        self.adj[u].push((v, weight));
        self.adj[v].push((u, weight));
        self.num_edges += 1;
    }

    fn remove_edge(&mut self, u: usize, v: usize) -> bool {
        let before = self.adj[u].len();
        self.adj[u].retain(|&(n, _)| n != v);
        let removed = before != self.adj[u].len();
        self.adj[v].retain(|&(n, _)| n != u);
        if removed {
            self.num_edges -= 1;
        }
        removed
    }

    /// Applies a batch of edge updates in order. Records with a negative
    /// weight delete the edge (deleting an absent edge is a no-op); others
    /// overwrite the weight of an existing edge or insert a new one.
    pub fn apply_updates(&mut self, updates: &[Edge]) {
        for e in updates {
            if !self.valid_pair(e.u, e.v) {
                warn!("invalid vertex indices in update: {} {}", e.u, e.v);
                continue;
            }
            if e.u == e.v {
                warn!("self-loop in update at vertex {}, ignoring", e.u);
                continue;
            }
            if e.is_deletion() {
                self.remove_edge(e.u, e.v);
            } else if self.edge_weight(e.u, e.v).is_some() {
                for entry in self.adj[e.u].iter_mut() {
                    if entry.0 == e.v {
                        entry.1 = e.weight;
                    }
                }
                for entry in self.adj[e.v].iter_mut() {
                    if entry.0 == e.u {
                        entry.1 = e.weight;
                    }
                }
            } else {
                self.add_edge(e.u, e.v, e.weight);
            }
        }
    }

    /// Extracts the canonical `u < v` edge list, e.g. for rebroadcast after a
    /// batch of updates.
    pub fn collect_edges(&self) -> Vec<Edge> {
        let mut edges = Vec::with_capacity(self.num_edges);
        for u in 0..self.num_vertices {
            for &(v, w) in &self.adj[u] {
                if u < v {
                    edges.push(Edge::new(u, v, w));
                }
            }
        }
        edges
    }

    /// Rebuilds a graph from a broadcast edge list.
    pub fn from_edge_list(num_vertices: usize, edges: &[Edge]) -> Self {
        let mut graph = Graph::new(num_vertices);
        for e in edges {
            graph.adj[e.u].push((e.v, e.weight));
            graph.adj[e.v].push((e.u, e.weight));
        }
        graph.num_edges = edges.len();
        graph
    }

    /// Loads a graph from the text format. Malformed or invalid lines are
    /// logged and skipped; lines past the declared edge count are appended as
    /// extra edges.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> io::Result<Graph> {
        let file = File::open(&path)?;
        let mut lines = BufReader::new(file).lines();

        let header = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    let trimmed = line.trim();
                    if !trimmed.is_empty() && !trimmed.starts_with('#') {
                        break trimmed.to_string();
                    }
                }
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "missing graph header",
                    ))
                }
            }
        };

        let mut parts = header.split_whitespace();
        let (num_vertices, declared_edges) = match (
            parts.next().and_then(|t| t.parse::<usize>().ok()),
            parts.next().and_then(|t| t.parse::<usize>().ok()),
        ) {
            (Some(v), Some(e)) if v > 0 => (v, e),
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid graph header: {header}"),
                ))
            }
        };

        let mut graph = Graph::new(num_vertices);
        for line in lines {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut tok = line.split_whitespace();
            let parsed = (
                tok.next().and_then(|t| t.parse::<usize>().ok()),
                tok.next().and_then(|t| t.parse::<usize>().ok()),
                tok.next().and_then(|t| t.parse::<f32>().ok()),
            );
            let (u, v, w) = match parsed {
                (Some(u), Some(v), Some(w)) => (u, v, w),
                _ => {
                    warn!("error parsing edge line: {line}");
                    continue;
                }
            };
            if u >= num_vertices || v >= num_vertices {
                warn!("invalid vertex indices in edge: {u} {v}");
                continue;
            }
            if u == v {
                warn!("self-loop found at vertex {u}, ignoring");
                continue;
            }
            if w < 0.0 {
                warn!("negative weight found in edge {u}-{v}, shortest paths may be wrong");
            }
            graph.add_edge(u, v, w);
        }

        if graph.num_edges < declared_edges {
            warn!(
                "expected {} edges but found only {}",
                declared_edges, graph.num_edges
            );
        }
        info!(
            "loaded graph with {} vertices and {} edges",
            graph.num_vertices, graph.num_edges
        );
        Ok(graph)
    }
}
