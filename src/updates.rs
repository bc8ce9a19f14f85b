//! Updates-file parsing and batch classification.

use log::{info, warn};

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::graph::{Edge, Graph};

/// A raw update batch split into insertions and deletions. Deletion records
/// carry the pre-deletion weight of the removed edge so the classifier can
/// recognize tree edges.
#[derive(Debug, Clone, Default)]
pub struct UpdateBatch {
    pub inserts: Vec<Edge>,
    pub deletes: Vec<Edge>,
}

/// Parses the updates text format: one `u v w` record per line, where `w` is
/// a non-negative weight or the literal `-` for a deletion (stored as -1).
/// Lines that are blank, start with `#`, or do not start with a digit are
/// skipped; malformed records are logged and skipped.
pub fn load_updates<P: AsRef<Path>>(path: P) -> io::Result<Vec<Edge>> {
    let file = File::open(&path)?;
    let mut updates = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || !line.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        let mut tok = line.split_whitespace();
        let pair = (
            tok.next().and_then(|t| t.parse::<usize>().ok()),
            tok.next().and_then(|t| t.parse::<usize>().ok()),
        );
        let (u, v) = match pair {
            (Some(u), Some(v)) => (u, v),
            _ => {
                warn!("malformed update line: {line}");
                continue;
            }
        };
        let weight = match tok.next() {
            Some("-") => -1.0,
            Some(tok) => match tok.parse::<f32>() {
                Ok(w) => w,
                Err(_) => {
                    warn!("error parsing weight in line: {line}");
                    continue;
                }
            },
            None => {
                warn!("malformed update line: {line}");
                continue;
            }
        };
        updates.push(Edge::new(u, v, weight));
    }

    info!("total updates loaded: {}", updates.len());
    Ok(updates)
}

/// Splits a raw batch into insertions and deletions, recovering each deleted
/// edge's weight from the adjacency. Must run against the *pre-mutation*
/// graph: applying the batch first would lose the old weights.
pub fn split_updates(graph: &Graph, updates: &[Edge]) -> UpdateBatch {
    let mut batch = UpdateBatch::default();
    for e in updates {
        if e.is_deletion() {
            let weight = graph.edge_weight(e.u, e.v).unwrap_or(-1.0);
            batch.deletes.push(Edge::new(e.u, e.v, weight));
        } else {
            batch.inserts.push(*e);
        }
    }
    batch
}
