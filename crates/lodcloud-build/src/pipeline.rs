//! Orchestrates partition -> per-block level build -> bundle for one
//! full build run.

use std::fs;
use std::path::Path;

use glam::DVec3;
use lodcloud_voxel::BundleWriter;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{BuildError, Result};
use crate::level_builder::{LevelBuilder, LevelBuilderConfig, LEVEL_CACHE_SUBDIR};
use crate::partitioner::BlockPartitioner;

/// Tuning for a full build run. Mirrors the command surface's
/// `--total-levels --level-export --chunk-size --shuffle-voxel-size
/// --threads` flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Size of the L0 (coarsest) voxel.
    pub level0_voxel_size: f64,
    /// Total averaging levels built per block.
    pub total_levels: u32,
    /// Index of the first exported level.
    pub level_export: u32,
    /// Points streamed through `add_samples` per chunk.
    pub chunk_size: usize,
    /// Worker threads used to fork-join one block's chunk.
    pub n_threads: usize,
    /// Voxel size the structured shuffler buckets at.
    pub shuffle_voxel_size: f64,
    /// Seed for the structured shuffler's RNG. `None` uses an
    /// unseeded, non-reproducible RNG per block (the production
    /// default); `Some` derives a per-block seed for reproducible
    /// builds/tests.
    pub shuffle_seed: Option<u64>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let level_builder = LevelBuilderConfig::default();
        Self {
            level0_voxel_size: level_builder.level0_voxel_size,
            total_levels: level_builder.total_levels,
            level_export: level_builder.level_export,
            chunk_size: level_builder.chunk_size,
            n_threads: level_builder.n_threads,
            shuffle_voxel_size: level_builder.shuffle_voxel_size,
            shuffle_seed: None,
        }
    }
}

impl BuildConfig {
    fn level_builder_config(&self) -> LevelBuilderConfig {
        LevelBuilderConfig {
            level0_voxel_size: self.level0_voxel_size,
            total_levels: self.total_levels,
            level_export: self.level_export,
            chunk_size: self.chunk_size,
            n_threads: self.n_threads,
            shuffle_voxel_size: self.shuffle_voxel_size,
        }
    }

    /// Number of levels actually persisted into the bundle.
    #[must_use]
    pub fn exported_levels(&self) -> u32 {
        self.total_levels - self.level_export
    }

    /// Load a config from a TOML file, e.g. one written by
    /// [`Self::save`] or hand-edited alongside a build script.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Serialize this config as TOML to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}

/// Summary of a completed build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Centroid subtracted from the input before partitioning.
    pub centroid: DVec3,
    /// Total input point count.
    pub point_count: usize,
    /// Number of L0 blocks produced.
    pub block_count: usize,
}

/// Drives partition -> level-build -> bundle for a full run.
pub struct BuildPipeline {
    config: BuildConfig,
}

impl BuildPipeline {
    /// A pipeline using the given tuning.
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    /// Run the full pipeline: `input_ply` in, `output_octree` out,
    /// using `cache_dir` for intermediate shard and per-level files.
    ///
    /// The whole run is all-or-nothing: any I/O or parse error aborts
    /// and leaves `output_octree` unwritten.
    pub fn run(&self, input_ply: &Path, cache_dir: &Path, output_octree: &Path) -> Result<BuildReport> {
        if cache_dir.exists() {
            fs::remove_dir_all(cache_dir)?;
        }
        fs::create_dir_all(cache_dir)?;

        info!(input = %input_ply.display(), "partitioning input point cloud");
        let summary = BlockPartitioner::new(self.config.level0_voxel_size)
            .partition(input_ply, cache_dir)?;
        info!(blocks = summary.block_ids.len(), points = summary.point_count, "partitioned");

        let level_builder = LevelBuilder::new(self.config.level_builder_config());
        let base_seed = self.config.shuffle_seed;
        let results: Vec<Result<()>> = summary
            .block_ids
            .par_iter()
            .map(|&block_id| {
                let mut rng = match base_seed {
                    Some(seed) => StdRng::seed_from_u64(seed ^ block_id),
                    None => StdRng::from_entropy(),
                };
                level_builder.build_block(block_id, cache_dir, &mut rng)
            })
            .collect();
        for result in results {
            result?;
        }
        info!("built levels for every block");

        let cache_subdir = cache_dir.join(LEVEL_CACHE_SUBDIR);
        BundleWriter::write(&cache_subdir, self.config.exported_levels(), output_octree)
            .map_err(BuildError::from)?;
        info!(output = %output_octree.display(), "wrote bundle");

        Ok(BuildReport {
            centroid: summary.centroid,
            point_count: summary.point_count,
            block_count: summary.block_ids.len(),
        })
    }
}
