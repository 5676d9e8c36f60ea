//! Hashed voxel grid aggregation: the mapping from voxel id to a
//! [`Voxel`] aggregate, generic over the aggregation strategy.

use std::collections::VecDeque;

use hashbrown::HashMap;
use lodcloud_core::{constants::DEFAULT_HASH_RANGE, PointRecord, Sample, VoxelKey};

use crate::error::Result;
use crate::voxel::{AveragingVoxel, Voxel};

/// The six axis-aligned neighbour offsets used by [`AveragingVoxelMap::regional_insert`].
const NEIGHBOR_OFFSETS: [(i64, i64, i64); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// A hashed voxel grid at a fixed voxel size, mapping each occupied
/// voxel id to an aggregate value.
///
/// Generic over the voxel type so that strategies other than weighted
/// averaging could reuse the same grid, predicate-driven flood fill,
/// and merge/subtract machinery; the pipeline only ever instantiates
/// it at `V = AveragingVoxel`.
#[derive(Debug, Clone)]
pub struct AveragingVoxelMap<V: Voxel = AveragingVoxel> {
    key: VoxelKey,
    voxels: HashMap<u64, V>,
}

impl<V: Voxel> AveragingVoxelMap<V> {
    /// Create an empty map at the given voxel size, using the default
    /// hash range.
    #[must_use]
    pub fn new(voxel_size: f64) -> Self {
        Self::with_hash_range(voxel_size, DEFAULT_HASH_RANGE)
    }

    /// Create an empty map at the given voxel size and hash range.
    #[must_use]
    pub fn with_hash_range(voxel_size: f64, hash_range: i64) -> Self {
        Self {
            key: VoxelKey::with_hash_range(voxel_size, hash_range),
            voxels: HashMap::new(),
        }
    }

    /// The voxel identity scheme backing this map.
    #[must_use]
    pub fn voxel_key(&self) -> VoxelKey {
        self.key
    }

    /// Number of occupied voxels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    /// Whether the map holds no occupied voxels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    /// Insert one weighted sample, creating its voxel if absent.
    pub fn insert(&mut self, sample: Sample) -> Result<()> {
        let id = self.key.id_of(sample.position)?;
        self.voxels.entry(id).or_default().insert_sample(sample);
        Ok(())
    }

    /// Insert a batch of samples sequentially.
    ///
    /// Callers that want per-chunk thread parallelism (as the build
    /// pipeline's `LevelBuilder` does) should build one map per worker
    /// thread and [`Self::merge`] them, rather than sharing one map
    /// across threads.
    pub fn add_samples(&mut self, samples: &[Sample]) -> Result<()> {
        for sample in samples {
            self.insert(*sample)?;
        }
        Ok(())
    }

    /// Flood-fill insert: starting at `sample`'s own voxel, insert the
    /// sample into every voxel reachable through 6-neighbour adjacency
    /// for which `predicate(id)` holds, halting expansion through any
    /// voxel that fails it. Each voxel is visited at most once.
    pub fn regional_insert(
        &mut self,
        sample: Sample,
        predicate: impl Fn(u64) -> bool,
    ) -> Result<()> {
        let start = self.key.voxel_index(sample.position);
        let start_id = self.key.voxel_id_checked(start.0, start.1, start.2)?;

        let mut visited = hashbrown::HashSet::new();
        let mut frontier = VecDeque::new();
        if predicate(start_id) {
            visited.insert(start);
            frontier.push_back(start);
        }

        while let Some((i, j, k)) = frontier.pop_front() {
            let id = self.key.voxel_id_unchecked(i, j, k);
            self.voxels.entry(id).or_default().insert_sample(sample);

            for (di, dj, dk) in NEIGHBOR_OFFSETS {
                let neighbor = (i + di, j + dj, k + dk);
                if visited.contains(&neighbor) {
                    continue;
                }
                let Ok(neighbor_id) = self.key.voxel_id_checked(neighbor.0, neighbor.1, neighbor.2)
                else {
                    continue;
                };
                if predicate(neighbor_id) {
                    visited.insert(neighbor);
                    frontier.push_back(neighbor);
                }
            }
        }
        Ok(())
    }

    /// Fold every voxel of `other` into `self`.
    pub fn merge(&mut self, other: &Self) {
        for (id, voxel) in &other.voxels {
            self.voxels.entry(*id).or_default().merge_voxel(voxel);
        }
    }

    /// Subtract every voxel of `other` from the matching voxel in
    /// `self`, dropping any voxel whose weight falls below the zero
    /// threshold.
    pub fn subtract(&mut self, other: &Self) {
        for (id, voxel) in &other.voxels {
            let Some(existing) = self.voxels.get_mut(id) else {
                continue;
            };
            if existing.subtract_voxel(voxel) {
                self.voxels.remove(id);
            }
        }
    }

    /// Extract every voxel whose weight is at least `min_weight` as a
    /// point record, in unspecified order.
    #[must_use]
    pub fn extract_points(&self, min_weight: f64) -> Vec<PointRecord> {
        self.voxels
            .values()
            .filter(|v| v.weight() >= min_weight)
            .map(|v| PointRecord::new(v.position(), v.color()))
            .collect()
    }

    /// Iterate over every occupied voxel id.
    pub fn voxel_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.voxels.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use lodcloud_core::ColorRgb;

    fn sample(x: f64, y: f64, z: f64) -> Sample {
        Sample::unit(DVec3::new(x, y, z), ColorRgb::new(255, 0, 0))
    }

    #[test]
    fn insert_then_extract_yields_one_point_per_voxel() {
        let mut map = AveragingVoxelMap::<AveragingVoxel>::new(1.0);
        map.insert(sample(0.1, 0.1, 0.1)).unwrap();
        map.insert(sample(0.2, 0.2, 0.2)).unwrap();
        map.insert(sample(5.5, 5.5, 5.5)).unwrap();
        assert_eq!(map.len(), 2);
        let points = map.extract_points(0.0);
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn split_insert_matches_combined_insert() {
        let samples: Vec<Sample> = (0..50)
            .map(|i| sample(f64::from(i) * 0.3, f64::from(i) * 0.7, f64::from(i) * 1.1))
            .collect();

        let mut combined = AveragingVoxelMap::<AveragingVoxel>::new(2.0);
        combined.add_samples(&samples).unwrap();

        let mut first = AveragingVoxelMap::<AveragingVoxel>::new(2.0);
        first.add_samples(&samples[..20]).unwrap();
        let mut second = AveragingVoxelMap::<AveragingVoxel>::new(2.0);
        second.add_samples(&samples[20..]).unwrap();
        first.merge(&second);

        assert_eq!(first.len(), combined.len());
        let mut combined_points = combined.extract_points(0.0);
        let mut split_points = first.extract_points(0.0);
        combined_points.sort_by(|a, b| a.position.partial_cmp(&b.position).unwrap());
        split_points.sort_by(|a, b| a.position.partial_cmp(&b.position).unwrap());
        for (a, b) in combined_points.iter().zip(split_points.iter()) {
            assert!((a.position[0] - b.position[0]).abs() < 1e-5);
            assert!((a.position[1] - b.position[1]).abs() < 1e-5);
            assert!((a.position[2] - b.position[2]).abs() < 1e-5);
        }
    }

    #[test]
    fn merge_then_subtract_empties_map() {
        let samples: Vec<Sample> = (0..200)
            .map(|i| sample(f64::from(i) * 0.05, f64::from(i) * 0.03, f64::from(i) * 0.02))
            .collect();

        let mut base = AveragingVoxelMap::<AveragingVoxel>::new(1.0);
        let mut addition = AveragingVoxelMap::<AveragingVoxel>::new(1.0);
        addition.add_samples(&samples).unwrap();

        base.merge(&addition);
        base.subtract(&addition);
        assert!(base.is_empty());
    }

    #[test]
    fn regional_insert_stops_at_predicate_boundary() {
        let mut map = AveragingVoxelMap::<AveragingVoxel>::new(1.0);
        let center = sample(0.5, 0.5, 0.5);
        let key = map.voxel_key();
        let center_id = key.id_of(center.position).unwrap();
        map.regional_insert(center, |id| id == center_id).unwrap();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn regional_insert_fills_connected_region() {
        // A predicate must itself bound the region: an always-true
        // predicate over an unbounded grid would never terminate.
        let mut bounded = AveragingVoxelMap::<AveragingVoxel>::new(1.0);
        let center = sample(0.5, 0.5, 0.5);
        let key = bounded.voxel_key();
        let (ci, cj, ck) = key.voxel_index(center.position);
        bounded
            .regional_insert(center, |id| {
                let (i, j, k) = key.index_of_id(id);
                (i - ci).abs() <= 1 && (j - cj).abs() <= 1 && (k - ck).abs() <= 1
            })
            .unwrap();
        assert!(bounded.len() > 1);
        assert!(bounded.len() <= 27);
    }
}
