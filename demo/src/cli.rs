use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dungeon-architect-demo")]
#[command(about = "Generate and inspect dungeon levels")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate one or more levels and print them as text
    Gen {
        #[arg(short, long, default_value = "12345")]
        seed: u64,
        #[arg(short, long, default_value = "1")]
        depth: i32,
        /// Generate this many consecutive depths starting at --depth
        #[arg(short, long, default_value = "1")]
        count: i32,
        /// Print per-level statistics as JSON
        #[arg(long)]
        stats: bool,
        /// Suppress the map itself
        #[arg(long)]
        no_map: bool,
    },
    /// Generate many levels and report aggregate statistics
    Survey {
        #[arg(short, long, default_value = "1")]
        seed: u64,
        /// Number of seeds to sample per depth
        #[arg(short = 'n', long, default_value = "10")]
        samples: u64,
        #[arg(short, long, default_value = "26")]
        max_depth: i32,
    },
}
