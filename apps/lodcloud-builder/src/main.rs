//! `lodcloud-build` -- builds a streamable LOD bundle from a PLY
//! point cloud.
//!
//! ```bash
//! lodcloud-build --input-ply scan.ply --cache-folder .cache --output-octree scan.bundle
//! ```
//!
//! Exits 0 on success, non-zero on any I/O or parse error.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use lodcloud_build::{BuildConfig, BuildPipeline};
use lodcloud_core::constants as defaults;
use tracing_subscriber::EnvFilter;

/// Build a streamable LOD bundle from a PLY point cloud.
#[derive(Debug, Parser)]
#[command(name = "lodcloud-build", version, about)]
struct Args {
    /// Input point cloud, binary-little-endian PLY.
    #[arg(long)]
    input_ply: PathBuf,

    /// Scratch directory for shard and per-level cache files. Wiped
    /// and recreated on every run.
    #[arg(long)]
    cache_folder: PathBuf,

    /// Output bundle path.
    #[arg(long)]
    output_octree: PathBuf,

    /// Size, in world units, of a level-0 (coarsest) voxel.
    #[arg(long, default_value_t = defaults::LEVEL0_VOXEL_SIZE)]
    level0_voxel_size: f64,

    /// Total averaging levels built per block before export
    /// truncation.
    #[arg(long, default_value_t = defaults::TOTAL_LEVELS)]
    total_levels: u32,

    /// Index of the first exported level; levels below this are
    /// built but never written to the bundle.
    #[arg(long, default_value_t = defaults::LEVEL_EXPORT)]
    level_export: u32,

    /// Points streamed through `add_samples` per chunk.
    #[arg(long, default_value_t = defaults::STREAMING_CHUNK_SIZE)]
    chunk_size: usize,

    /// Voxel size the structured shuffler buckets points at.
    #[arg(long, default_value_t = defaults::SHUFFLE_VOXEL_SIZE)]
    shuffle_voxel_size: f64,

    /// Worker threads used to fork-join one block's chunk. Defaults
    /// to the available parallelism.
    #[arg(long)]
    threads: Option<usize>,

    /// Seed the structured shuffler's RNG for a reproducible build.
    /// Unset uses an unseeded RNG.
    #[arg(long)]
    seed: Option<u64>,

    /// Load a `BuildConfig` from a TOML file, overriding every tuning
    /// flag above. Build one with `--save-config-to`.
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Write the resolved config (after `--config-file`, before
    /// running) to a TOML file and exit without building.
    #[arg(long)]
    save_config_to: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config_file {
        Some(path) => BuildConfig::load(path)?,
        None => BuildConfig {
            level0_voxel_size: args.level0_voxel_size,
            total_levels: args.total_levels,
            level_export: args.level_export,
            chunk_size: args.chunk_size,
            shuffle_voxel_size: args.shuffle_voxel_size,
            shuffle_seed: args.seed,
            ..BuildConfig::default()
        },
    };
    if let Some(threads) = args.threads {
        config.n_threads = threads;
    }

    if let Some(path) = &args.save_config_to {
        config.save(path)?;
        tracing::info!(path = %path.display(), "wrote build config");
        return Ok(());
    }

    let report = BuildPipeline::new(config).run(&args.input_ply, &args.cache_folder, &args.output_octree)?;

    tracing::info!(
        points = report.point_count,
        blocks = report.block_count,
        centroid = ?report.centroid,
        output = %args.output_octree.display(),
        "build complete",
    );
    Ok(())
}
