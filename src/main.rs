//! Distributed incremental SSSP driver.
//!
//! Rank 0 loads and partitions the graph, broadcasts it, and every PE runs
//! the same phase sequence: initial reconvergence, update broadcast and
//! classification, graph mutation plus rebroadcast, batch ingestion, and a
//! second reconvergence, ending in a min-gather of the distance field.

use lamellar::active_messaging::prelude::*;
use lamellar::darc::prelude::*;

use clap::Parser;
use log::{error, warn};

use std::sync::atomic::AtomicBool;
use std::time::Instant;

use dynamic_sssp::collective::{self, SharedTopology};
use dynamic_sssp::distribution::Distribution;
use dynamic_sssp::graph::{Edge, Graph};
use dynamic_sssp::options::SsspCli;
use dynamic_sssp::partition;
use dynamic_sssp::printer::{self, RunRecord};
use dynamic_sssp::sssp::{RelaxConfig, SsspState};
use dynamic_sssp::updates;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = match SsspCli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    let world = lamellar::LamellarWorldBuilder::new().build();
    let my_pe = world.my_pe();
    let num_pes = world.num_pes();

    if my_pe == 0 {
        for flag in cli.unknown_flags() {
            warn!("unknown option '{flag}'");
        }
    }

    let source = match cli.source.parse::<usize>() {
        Ok(s) => s,
        Err(_) => {
            if my_pe == 0 {
                error!("source vertex must be a valid integer, got '{}'", cli.source);
            }
            std::process::exit(1);
        }
    };

    if my_pe == 0 {
        cli.describe(num_pes);
    }

    let cfg = RelaxConfig {
        async_level: cli.async_level,
        use_parallel: cli.openmp,
        use_device: cli.opencl,
    };

    let topology = LocalRwDarc::new(world.team(), SharedTopology::default()).unwrap();
    let updates_slot: LocalRwDarc<Vec<Edge>> = LocalRwDarc::new(world.team(), Vec::new()).unwrap();

    // rank 0 loads and partitions; the topology broadcast hands every PE the
    // full edge list and the partition map
    let payload = if my_pe == 0 {
        println!("Loading graph from {}", cli.graph_file);
        let graph = match Graph::load_from_file(&cli.graph_file) {
            Ok(graph) => graph,
            Err(e) => {
                error!("error opening graph file {}: {e}", cli.graph_file);
                Graph::default()
            }
        };
        println!(
            "Graph loaded: {} vertices, {} edges",
            graph.num_vertices(),
            graph.num_edges()
        );
        let part = partition::partition_graph(&graph, num_pes);
        Some((graph.num_vertices(), graph.collect_edges(), part))
    } else {
        None
    };
    collective::broadcast_topology(&world, &topology, payload);

    let (mut graph, part) = {
        let guard = world.block_on(topology.read());
        (
            Graph::from_edge_list(guard.num_vertices, &guard.edges),
            guard.part.to_vec(),
        )
    };
    let mut layout = Distribution::new(&graph, &part, my_pe);

    if my_pe == 0 {
        println!(
            "Graph distributed. Process 0 has {} local vertices and {} ghost vertices",
            layout.local_vertices.len(),
            layout.ghost_vertices.len()
        );
    }

    let state = LocalRwDarc::new(world.team(), SsspState::new(graph.num_vertices())).unwrap();
    let flag = Darc::new(&world, AtomicBool::new(false)).unwrap();

    {
        let mut guard = world.block_on(state.write());
        if let Err(e) = guard.initialize(source) {
            drop(guard);
            if my_pe == 0 {
                error!("{e}");
            }
            std::process::exit(1);
        }
    }

    if my_pe == 0 {
        println!("Running initial SSSP calculation from source {source}");
    }
    collective::reconverge(&world, &state, &flag, &graph, &layout, &cfg);
    world.barrier();
    collective::gather_results(&world, &state, &layout);

    if my_pe == 0 {
        let guard = world.block_on(state.read());
        println!("Initial SSSP completed. Statistics:");
        printer::print_stats(&guard.dist);
    }

    // update batch: loaded on rank 0, broadcast raw so every PE can classify
    // against its own pre-mutation adjacency
    let payload = if my_pe == 0 {
        println!("Loading updates from {}", cli.updates_file);
        let raw = match updates::load_updates(&cli.updates_file) {
            Ok(raw) => raw,
            Err(e) => {
                error!("error opening updates file {}: {e}", cli.updates_file);
                Vec::new()
            }
        };
        println!("Loaded {} updates", raw.len());
        Some(raw)
    } else {
        None
    };
    collective::broadcast_updates(&world, &updates_slot, payload);
    let raw_updates: Vec<Edge> = {
        let guard = world.block_on(updates_slot.read());
        guard.to_vec()
    };

    let timer = Instant::now();

    let batch = updates::split_updates(&graph, &raw_updates);
    if my_pe == 0 {
        println!(
            "Processing {} insertions and {} deletions",
            batch.inserts.len(),
            batch.deletes.len()
        );
    }

    graph.apply_updates(&raw_updates);

    // post-update rebroadcast keeps every PE's adjacency canonical
    let payload = if my_pe == 0 {
        Some((graph.num_vertices(), graph.collect_edges(), part.clone()))
    } else {
        None
    };
    collective::broadcast_topology(&world, &topology, payload);
    let graph = {
        let guard = world.block_on(topology.read());
        Graph::from_edge_list(guard.num_vertices, &guard.edges)
    };
    layout = Distribution::new(&graph, &part, my_pe);

    {
        let mut guard = world.block_on(state.write());
        guard.ingest_batch(&batch, cfg.use_parallel);
    }
    world.barrier();

    collective::reconverge(&world, &state, &flag, &graph, &layout, &cfg);
    world.barrier();
    collective::gather_results(&world, &state, &layout);

    let elapsed = timer.elapsed();

    if my_pe == 0 {
        let dist: Vec<f32> = {
            let guard = world.block_on(state.read());
            guard.dist.to_vec()
        };
        println!(
            "SSSP update completed in {:.6} seconds",
            elapsed.as_secs_f64()
        );
        printer::print_stats(&dist);

        if let Some(path) = cli.output_file() {
            match printer::save_results(path, &dist) {
                Ok(()) => println!("Results saved to {path}"),
                Err(e) => error!("error opening output file {path}: {e}"),
            }
        }

        if let Some(path) = &cli.stats_json {
            let record = RunRecord {
                num_pes,
                num_vertices: graph.num_vertices(),
                num_edges: graph.num_edges(),
                num_inserts: batch.inserts.len(),
                num_deletes: batch.deletes.len(),
                update_seconds: elapsed.as_secs_f64(),
                stats: printer::dist_stats(&dist),
            };
            if let Err(e) = printer::write_run_record(path, &record) {
                error!("error writing run record {path}: {e}");
            }
        }
    }

    world.barrier();
}
