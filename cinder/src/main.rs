use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rayon::prelude::*;

use cinder_loader::{ChunkLoader, LoaderConfig, Registries};
use cinder_world::Chunk;

#[derive(Parser)]
#[command(name = "cinder", about = "Read and write chunks of Anvil worlds")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load one chunk and print what it contains
    Inspect {
        /// World directory (the one holding `region/`)
        #[arg(short, long, env = "CINDER_WORLD")]
        world: PathBuf,

        #[arg(short, long, allow_negative_numbers = true)]
        x: i32,

        #[arg(short, long, allow_negative_numbers = true)]
        z: i32,
    },
    /// Load every chunk of a rectangle and save it into another world
    Copy {
        #[arg(long)]
        from: PathBuf,

        #[arg(long)]
        to: PathBuf,

        #[arg(long, allow_negative_numbers = true)]
        min_x: i32,

        #[arg(long, allow_negative_numbers = true)]
        max_x: i32,

        #[arg(long, allow_negative_numbers = true)]
        min_z: i32,

        #[arg(long, allow_negative_numbers = true)]
        max_z: i32,

        /// Only resolve vanilla block and handler names
        #[arg(long)]
        strict: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = LoaderConfig::from_env();
    log::info!("Loader configuration: {}", config.summary());

    match args.command {
        Command::Inspect { world, x, z } => inspect(world, config, x, z),
        Command::Copy {
            from,
            to,
            min_x,
            max_x,
            min_z,
            max_z,
            strict,
        } => {
            if min_x > max_x || min_z > max_z {
                bail!("empty rectangle: x {min_x}..={max_x}, z {min_z}..={max_z}");
            }
            let registries = if strict { Registries::strict() } else { Registries::default() };
            copy(from, to, config, registries, (min_x, max_x), (min_z, max_z))
        }
    }
}

fn inspect(world: PathBuf, config: LoaderConfig, x: i32, z: i32) -> Result<()> {
    let loader = ChunkLoader::with_config(&world, config, Registries::default())
        .context("Invalid loader configuration")?;
    let chunk = loader
        .try_load_chunk(x, z)
        .with_context(|| format!("Failed to load chunk {x}, {z} from {}", world.display()))?;
    print_summary(&chunk);
    Ok(())
}

fn print_summary(chunk: &Chunk) {
    println!("Chunk ({}, {}), height {}", chunk.x(), chunk.z(), chunk.height());

    let mut counts = chunk.block_counts();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    println!("Blocks:");
    for (block, count) in counts {
        match block.handler() {
            Some(handler) => println!("  {:>6}  {} [{}]", count, block.name(), handler.namespace_id()),
            None => println!("  {:>6}  {}", count, block.name()),
        }
    }

    let mut biomes: Vec<&str> = chunk.biomes().iter().map(|b| b.name()).collect();
    biomes.sort_unstable();
    biomes.dedup();
    println!("Biomes: {}", biomes.join(", "));
}

fn copy(
    from: PathBuf,
    to: PathBuf,
    config: LoaderConfig,
    registries: Registries,
    (min_x, max_x): (i32, i32),
    (min_z, max_z): (i32, i32),
) -> Result<()> {
    let source = ChunkLoader::with_config(&from, config.clone(), registries.clone())
        .context("Invalid loader configuration")?;
    let target = ChunkLoader::with_config(&to, config, registries).context("Invalid loader configuration")?;

    let coords: Vec<(i32, i32)> = (min_x..=max_x)
        .flat_map(|x| (min_z..=max_z).map(move |z| (x, z)))
        .collect();
    println!("Copying {} chunks from {} to {}", coords.len(), from.display(), to.display());

    let copied = AtomicUsize::new(0);
    coords.par_iter().for_each(|&(x, z)| {
        source.load_chunk(x, z, |chunk| {
            target.save_chunk(&chunk, || {
                copied.fetch_add(1, Ordering::Relaxed);
            });
        });
    });

    println!("Copied {} of {} chunks", copied.load(Ordering::Relaxed), coords.len());
    println!("\nSource\n{}", source.metrics().generate_report());
    println!("Target\n{}", target.metrics().generate_report());
    Ok(())
}
