//! Dungeon Architect demo CLI.

mod cli;
mod render;

use clap::Parser;
use cli::{Cli, Command};
use dungeon_architect::{dig_dungeon, GenerationContext};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Gen { seed, depth, count, stats, no_map } => {
            for d in depth..depth + count {
                let mut ctx = GenerationContext::new(seed, d);
                dig_dungeon(&mut ctx)?;
                if !no_map {
                    println!("seed {} depth {}:", seed, d);
                    print!("{}", render::render_text(&ctx));
                }
                if stats {
                    println!("{}", serde_json::to_string_pretty(&ctx.stats())?);
                }
            }
        }
        Command::Survey { seed, samples, max_depth } => {
            println!("depth  machines  items  monsters  lakes  bridges  secret");
            for d in 1..=max_depth {
                let mut machines = 0u64;
                let mut items = 0u64;
                let mut monsters = 0u64;
                let mut lakes = 0u64;
                let mut bridges = 0u64;
                let mut secret = 0u64;
                for s in 0..samples {
                    let mut ctx = GenerationContext::new(seed + s, d);
                    dig_dungeon(&mut ctx)?;
                    let st = ctx.stats();
                    machines += st.machines as u64;
                    items += st.items as u64;
                    monsters += st.monsters as u64;
                    lakes += st.lake_cells as u64;
                    bridges += st.bridge_cells as u64;
                    secret += st.secret_doors as u64;
                }
                let n = samples.max(1);
                println!(
                    "{:>5}  {:>8.1}  {:>5.1}  {:>8.1}  {:>5.1}  {:>7.1}  {:>6.1}",
                    d,
                    machines as f64 / n as f64,
                    items as f64 / n as f64,
                    monsters as f64 / n as f64,
                    lakes as f64 / n as f64,
                    bridges as f64 / n as f64,
                    secret as f64 / n as f64,
                );
            }
        }
    }
    Ok(())
}
