//! Command-line surface of the distributed driver.

use clap::Parser;
use log::warn;

/// Invalid async levels are coerced to 1 instead of failing the parse.
fn parse_async_level(s: &str) -> Result<usize, std::convert::Infallible> {
    Ok(match s.parse::<usize>() {
        Ok(n) if n >= 1 => n,
        _ => {
            warn!("invalid async level '{s}', using default level 1");
            1
        }
    })
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct SsspCli {
    /// Graph file: a `V E` header line followed by `u v w` edge lines
    pub graph_file: String,

    /// Updates file: `u v w` records where `w` is a weight or `-` to delete
    pub updates_file: String,

    /// Source vertex
    pub source: String,

    /// Optional output file; unrecognized options land here too and are
    /// warned about rather than rejected
    #[arg(num_args = 0.., allow_hyphen_values = true)]
    pub extra: Vec<String>,

    /// Parallelize the inner relaxation sweep across threads
    #[arg(long = "openmp")]
    pub openmp: bool,

    /// Route each relaxation round through the flat edge kernel
    #[arg(long = "opencl")]
    pub opencl: bool,

    /// Local relaxation sub-iterations per global synchronization round
    #[arg(long = "async", default_value_t = 1, value_parser = parse_async_level)]
    pub async_level: usize,

    /// Write a JSON run record to this path (rank 0 only)
    #[arg(long = "stats-json")]
    pub stats_json: Option<String>,
}

impl SsspCli {
    /// The first extra argument that does not look like an option.
    pub fn output_file(&self) -> Option<&str> {
        self.extra
            .iter()
            .map(String::as_str)
            .find(|a| !a.starts_with("--"))
    }

    /// Extra arguments that look like options and were not recognized.
    pub fn unknown_flags(&self) -> impl Iterator<Item = &str> {
        self.extra
            .iter()
            .map(String::as_str)
            .filter(|a| a.starts_with("--"))
    }

    pub fn describe(&self, num_pes: usize) {
        println!("Configuration:");
        println!("  Graph file: {}", self.graph_file);
        println!("  Updates file: {}", self.updates_file);
        println!("  Source vertex: {}", self.source);
        println!(
            "  Output file: {}",
            self.output_file().unwrap_or("none")
        );
        println!("  Workers: {num_pes}");
        println!(
            "  Parallel sweep: {}",
            if self.openmp { "enabled" } else { "disabled" }
        );
        println!(
            "  Device kernel: {}",
            if self.opencl { "enabled" } else { "disabled" }
        );
        println!("  Async level: {}", self.async_level);
    }
}
