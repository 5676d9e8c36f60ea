//! Builds every averaging level for one block and exports the
//! shuffled tail of levels to the per-level cache.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read};
use std::path::Path;

use lodcloud_core::{PointRecord, Sample};
use lodcloud_voxel::AveragingVoxelMap;
use rand::Rng;
use rayon::prelude::*;

use crate::error::Result;
use crate::partitioner::SHARD_SUBDIR;
use crate::shuffler::StructuredShuffler;

/// Name of the per-run per-(level, block) cache subdirectory.
pub const LEVEL_CACHE_SUBDIR: &str = "octree_hash_files";

/// Tuning for [`LevelBuilder`].
#[derive(Debug, Clone, Copy)]
pub struct LevelBuilderConfig {
    /// Size of the L0 (coarsest) voxel.
    pub level0_voxel_size: f64,
    /// Total averaging levels built per block, `L0..L_{N-1}`.
    pub total_levels: u32,
    /// Index of the first exported level.
    pub level_export: u32,
    /// Points streamed through `add_samples` per chunk.
    pub chunk_size: usize,
    /// Worker threads used to fork-join one chunk.
    pub n_threads: usize,
    /// Voxel size the structured shuffler buckets at.
    pub shuffle_voxel_size: f64,
}

impl Default for LevelBuilderConfig {
    fn default() -> Self {
        use lodcloud_core::constants as c;
        Self {
            level0_voxel_size: c::LEVEL0_VOXEL_SIZE,
            total_levels: c::TOTAL_LEVELS,
            level_export: c::LEVEL_EXPORT,
            chunk_size: c::STREAMING_CHUNK_SIZE,
            n_threads: std::thread::available_parallelism().map_or(4, |n| n.get()),
            shuffle_voxel_size: c::SHUFFLE_VOXEL_SIZE,
        }
    }
}

/// Builds one block's level stack: `N` averaging maps at halving voxel
/// sizes, exporting the suffix at or below `level_export`.
pub struct LevelBuilder {
    config: LevelBuilderConfig,
}

impl LevelBuilder {
    /// A level builder using the given tuning.
    #[must_use]
    pub fn new(config: LevelBuilderConfig) -> Self {
        Self { config }
    }

    /// Build and export levels for `block_id`, reading its shard from
    /// `<cache_dir>/points_splitting_0/<block_id>.bin` and writing
    /// exported levels to `<cache_dir>/octree_hash_files/`.
    pub fn build_block<R: Rng>(
        &self,
        block_id: u64,
        cache_dir: &Path,
        shuffle_rng: &mut R,
    ) -> Result<()> {
        let shard_path = cache_dir.join(SHARD_SUBDIR).join(format!("{block_id}.bin"));
        let out_dir = cache_dir.join(LEVEL_CACHE_SUBDIR);
        fs::create_dir_all(&out_dir)?;

        let voxel_sizes: Vec<f64> = (0..self.config.total_levels)
            .map(|l| self.config.level0_voxel_size * 2f64.powi(-(l as i32)))
            .collect();
        let mut level_maps: Vec<AveragingVoxelMap> =
            voxel_sizes.iter().map(|&s| AveragingVoxelMap::new(s)).collect();

        let mut reader = BufReader::new(File::open(&shard_path)?);
        loop {
            let chunk = read_chunk(&mut reader, self.config.chunk_size)?;
            if chunk.is_empty() {
                break;
            }
            let is_last = chunk.len() < self.config.chunk_size;
            process_chunk_parallel(&mut level_maps, &chunk, self.config.n_threads)?;
            if is_last {
                break;
            }
        }

        for level in self.config.level_export..self.config.total_levels {
            let points = level_maps[level as usize].extract_points(0.0);
            let shuffled =
                StructuredShuffler::new(self.config.shuffle_voxel_size).shuffle(points, shuffle_rng);
            let exported_level = level - self.config.level_export;
            let out_path = out_dir.join(format!("{exported_level}{block_id}.bin"));
            let mut writer = BufWriter::new(File::create(out_path)?);
            for record in shuffled {
                record.write_to(&mut writer)?;
            }
            io::Write::flush(&mut writer)?;
        }
        Ok(())
    }
}

/// Read up to `max` point records, stopping early at end of file.
fn read_chunk<R: Read>(reader: &mut R, max: usize) -> io::Result<Vec<Sample>> {
    let mut out = Vec::with_capacity(max);
    for _ in 0..max {
        match PointRecord::read_from(reader) {
            Ok(record) => out.push(Sample::unit(record.position_f64(), record.color)),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

/// Fork-join one chunk across `n_threads`-worth of slices, each
/// building one submap per level on a rayon worker; submaps are
/// disjoint (no locks) and merged into `level_maps` sequentially once
/// every slice's map completes.
fn process_chunk_parallel(
    level_maps: &mut [AveragingVoxelMap],
    chunk: &[Sample],
    n_threads: usize,
) -> Result<()> {
    let n_threads = n_threads.max(1);
    let slice_len = chunk.len().div_ceil(n_threads).max(1);
    let voxel_sizes: Vec<f64> = level_maps.iter().map(|m| m.voxel_key().voxel_size()).collect();

    let thread_maps: Vec<Vec<AveragingVoxelMap>> = chunk
        .par_chunks(slice_len)
        .map(|slice| -> lodcloud_voxel::Result<Vec<AveragingVoxelMap>> {
            let mut maps: Vec<AveragingVoxelMap> =
                voxel_sizes.iter().map(|&s| AveragingVoxelMap::new(s)).collect();
            for sample in slice {
                for map in &mut maps {
                    map.insert(*sample)?;
                }
            }
            Ok(maps)
        })
        .collect::<lodcloud_voxel::Result<Vec<_>>>()?;

    for maps in &thread_maps {
        for (level_map, submap) in level_maps.iter_mut().zip(maps.iter()) {
            level_map.merge(submap);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use lodcloud_core::ColorRgb;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn write_shard(cache_dir: &Path, block_id: u64, points: &[(DVec3, ColorRgb)]) {
        let shard_dir = cache_dir.join(SHARD_SUBDIR);
        fs::create_dir_all(&shard_dir).unwrap();
        let mut writer = BufWriter::new(File::create(shard_dir.join(format!("{block_id}.bin"))).unwrap());
        for (pos, color) in points {
            PointRecord::new(*pos, *color).write_to(&mut writer).unwrap();
        }
        io::Write::flush(&mut writer).unwrap();
    }

    #[test]
    fn exports_every_configured_level() {
        let dir = tempfile::tempdir().unwrap();
        let points: Vec<(DVec3, ColorRgb)> = (0..500)
            .map(|i| {
                (
                    DVec3::new(f64::from(i) * 0.01, f64::from(i) * 0.02, 0.0),
                    ColorRgb::new(10, 20, 30),
                )
            })
            .collect();
        write_shard(dir.path(), 42, &points);

        let config = LevelBuilderConfig {
            total_levels: 4,
            level_export: 1,
            chunk_size: 64,
            n_threads: 2,
            ..LevelBuilderConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        LevelBuilder::new(config)
            .build_block(42, dir.path(), &mut rng)
            .unwrap();

        for exported in 0..(config.total_levels - config.level_export) {
            let path = dir
                .path()
                .join(LEVEL_CACHE_SUBDIR)
                .join(format!("{exported}42.bin"));
            assert!(path.exists(), "missing export for level {exported}");
        }
    }
}
