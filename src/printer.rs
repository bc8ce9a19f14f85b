//! Result output: distance statistics, the per-vertex output file, and an
//! optional JSON run record.

use serde::Serialize;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistStats {
    pub reachable: usize,
    pub total: usize,
    pub max_dist: f32,
    pub avg_dist: f32,
}

pub fn dist_stats(dist: &[f32]) -> DistStats {
    let mut reachable = 0;
    let mut max_dist = 0.0f32;
    let mut sum = 0.0f32;
    for &d in dist {
        if d.is_finite() {
            reachable += 1;
            max_dist = max_dist.max(d);
            sum += d;
        }
    }
    DistStats {
        reachable,
        total: dist.len(),
        max_dist,
        avg_dist: if reachable > 0 {
            sum / reachable as f32
        } else {
            0.0
        },
    }
}

pub fn print_stats(dist: &[f32]) {
    let stats = dist_stats(dist);
    println!("SSSP Statistics:");
    println!("  Reachable vertices: {}/{}", stats.reachable, stats.total);
    println!("  Maximum distance: {}", stats.max_dist);
    println!("  Average distance: {}", stats.avg_dist);
}

/// Writes one `i dist_i` line per vertex, with unreachable vertices printed
/// as `inf`.
pub fn save_results<P: AsRef<Path>>(path: P, dist: &[f32]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for (i, &d) in dist.iter().enumerate() {
        if d.is_finite() {
            writeln!(out, "{i} {d:.2}")?;
        } else {
            writeln!(out, "{i} inf")?;
        }
    }
    out.flush()
}

/// One run's aggregate numbers, written as a single JSON object.
#[derive(Debug, Serialize)]
pub struct RunRecord {
    pub num_pes: usize,
    pub num_vertices: usize,
    pub num_edges: usize,
    pub num_inserts: usize,
    pub num_deletes: usize,
    pub update_seconds: f64,
    pub stats: DistStats,
}

pub fn write_run_record<P: AsRef<Path>>(path: P, record: &RunRecord) -> io::Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, record)?;
    Ok(())
}
