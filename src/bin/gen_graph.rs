//! Writes a seeded random graph and a companion update batch in the text
//! formats the driver consumes.

use anyhow::Result;
use clap::Parser;

use std::fs::File;
use std::io::{BufWriter, Write};

use dynamic_sssp::generators::{random_graph, random_updates};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Number of vertices
    #[arg(short, long, default_value_t = 100)]
    vertices: usize,

    /// Number of edges (at least vertices - 1; the graph is connected)
    #[arg(short, long, default_value_t = 300)]
    edges: usize,

    /// Random seed
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Number of update records
    #[arg(short, long, default_value_t = 20)]
    updates: usize,

    /// Graph output path
    #[arg(short, long, default_value = "graph.txt")]
    graph_out: String,

    /// Updates output path
    #[arg(long, default_value = "updates.txt")]
    updates_out: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let graph = random_graph(cli.seed, cli.vertices, cli.edges);
    let edges = graph.collect_edges();

    let mut out = BufWriter::new(File::create(&cli.graph_out)?);
    writeln!(out, "# seed {} random connected graph", cli.seed)?;
    writeln!(out, "{} {}", graph.num_vertices(), edges.len())?;
    for e in &edges {
        writeln!(out, "{} {} {:.3}", e.u, e.v, e.weight)?;
    }
    out.flush()?;
    println!(
        "wrote {} with {} vertices, {} edges",
        cli.graph_out,
        graph.num_vertices(),
        edges.len()
    );

    let batch = random_updates(cli.seed ^ 0x5eed, &graph, cli.updates);
    let mut out = BufWriter::new(File::create(&cli.updates_out)?);
    writeln!(out, "# seed {} updates", cli.seed)?;
    for e in &batch {
        if e.is_deletion() {
            writeln!(out, "{} {} -", e.u, e.v)?;
        } else {
            writeln!(out, "{} {} {:.3}", e.u, e.v, e.weight)?;
        }
    }
    out.flush()?;
    println!("wrote {} with {} records", cli.updates_out, batch.len());
    Ok(())
}
