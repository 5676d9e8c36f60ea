//! Reorders a block's extracted points so that any prefix is a
//! spatially uniform subsample.

use hashbrown::HashMap;
use lodcloud_core::{PointRecord, VoxelKey};
use rand::seq::SliceRandom;
use rand::Rng;

/// Buckets points into a coarse voxel grid, shuffles within each
/// bucket, then round-robins across buckets so any prefix of the
/// output draws roughly evenly from every bucket.
pub struct StructuredShuffler {
    voxel_size: f64,
}

impl StructuredShuffler {
    /// A shuffler bucketing at `voxel_size`.
    #[must_use]
    pub fn new(voxel_size: f64) -> Self {
        Self { voxel_size }
    }

    /// Reorder `points` in place order, returning the reordered list.
    /// The multiset of points is preserved exactly.
    pub fn shuffle<R: Rng>(&self, points: Vec<PointRecord>, rng: &mut R) -> Vec<PointRecord> {
        let key = VoxelKey::new(self.voxel_size);
        let mut buckets: HashMap<u64, Vec<PointRecord>> = HashMap::new();
        for point in points {
            let id = key.id_of(point.position_f64()).unwrap_or(u64::MAX);
            buckets.entry(id).or_default().push(point);
        }

        let mut bucket_ids: Vec<u64> = buckets.keys().copied().collect();
        for id in &bucket_ids {
            buckets.get_mut(id).expect("bucket exists").shuffle(rng);
        }

        let mut out = Vec::new();
        loop {
            let mut emitted = false;
            for id in &bucket_ids {
                if let Some(bucket) = buckets.get_mut(id) {
                    if let Some(point) = bucket.pop() {
                        out.push(point);
                        emitted = true;
                    }
                }
            }
            bucket_ids.retain(|id| buckets.get(id).is_some_and(|b| !b.is_empty()));
            if !emitted {
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use lodcloud_core::ColorRgb;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record_at(x: f64, y: f64, z: f64) -> PointRecord {
        PointRecord::new(DVec3::new(x, y, z), ColorRgb::new(1, 1, 1))
    }

    #[test]
    fn preserves_the_multiset() {
        let points: Vec<PointRecord> = (0..100)
            .map(|i| record_at(f64::from(i) * 0.3, f64::from(i) * 0.1, 0.0))
            .collect();
        let mut rng = StdRng::seed_from_u64(7);
        let shuffled = StructuredShuffler::new(2.5).shuffle(points.clone(), &mut rng);
        assert_eq!(shuffled.len(), points.len());

        let mut original_sorted = points;
        let mut shuffled_sorted = shuffled;
        original_sorted.sort_by(|a, b| a.position.partial_cmp(&b.position).unwrap());
        shuffled_sorted.sort_by(|a, b| a.position.partial_cmp(&b.position).unwrap());
        assert_eq!(original_sorted, shuffled_sorted);
    }

    #[test]
    fn four_even_buckets_contribute_evenly_to_a_prefix() {
        // Four coarse buckets (voxel size 10), 25 points each, well
        // separated so they hash into distinct voxels.
        let mut points = Vec::new();
        for bucket in 0..4i64 {
            for i in 0..25 {
                points.push(record_at(
                    bucket as f64 * 100.0 + f64::from(i) * 0.1,
                    0.0,
                    0.0,
                ));
            }
        }
        let mut rng = StdRng::seed_from_u64(42);
        let shuffled = StructuredShuffler::new(10.0).shuffle(points, &mut rng);

        let key = VoxelKey::new(10.0);
        let mut counts: HashMap<u64, usize> = HashMap::new();
        for point in &shuffled[..40] {
            let id = key.id_of(point.position_f64()).unwrap();
            *counts.entry(id).or_insert(0) += 1;
        }
        assert_eq!(counts.len(), 4);
        for count in counts.values() {
            assert_eq!(*count, 10);
        }
    }
}
