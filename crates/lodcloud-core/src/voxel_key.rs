//! Voxel identity: the bijection between a world position and a 64-bit id.

use glam::DVec3;

use crate::constants::DEFAULT_HASH_RANGE;
use crate::error::{CoreError, Result};

/// Maps world positions to 64-bit voxel identifiers at a fixed voxel
/// size, and back.
///
/// Two voxel keys at different sizes never share an id space; the id
/// formula packs the three signed axis indices (each shifted into
/// `[0, 2R)`) into a single `u64`:
///
/// `id = (i + R) + 2R * (j + R) + (2R)^2 * (k + R)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelKey {
    voxel_size: f64,
    hash_range: i64,
}

impl VoxelKey {
    /// Create a voxel key with the default hash range
    /// ([`crate::constants::DEFAULT_HASH_RANGE`]).
    #[must_use]
    pub fn new(voxel_size: f64) -> Self {
        Self::with_hash_range(voxel_size, DEFAULT_HASH_RANGE)
    }

    /// Create a voxel key with an explicit hash range.
    #[must_use]
    pub fn with_hash_range(voxel_size: f64, hash_range: i64) -> Self {
        Self {
            voxel_size,
            hash_range,
        }
    }

    /// Voxel size this key operates at.
    #[must_use]
    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    /// Configured hash range `R`.
    #[must_use]
    pub fn hash_range(&self) -> i64 {
        self.hash_range
    }

    /// Floor-toward-negative-infinity index of a single coordinate.
    ///
    /// Implemented as truncation with a conditional correction rather
    /// than a floating-point floor, matching `int(p / size) + (p < 0 ?
    /// -1 : 0)` bit for bit.
    #[must_use]
    pub fn axis_index(&self, coordinate: f64) -> i64 {
        let scaled = coordinate / self.voxel_size;
        let truncated = scaled as i64;
        if scaled < 0.0 && (truncated as f64) != scaled {
            truncated - 1
        } else {
            truncated
        }
    }

    /// Voxel index `(i, j, k)` containing `p`.
    #[must_use]
    pub fn voxel_index(&self, p: DVec3) -> (i64, i64, i64) {
        (
            self.axis_index(p.x),
            self.axis_index(p.y),
            self.axis_index(p.z),
        )
    }

    /// Pack `(i, j, k)` into a 64-bit id, failing if any axis leaves
    /// `[-R, R)`.
    pub fn voxel_id_checked(&self, i: i64, j: i64, k: i64) -> Result<u64> {
        let r = self.hash_range;
        if i < -r || i >= r || j < -r || j >= r || k < -r || k >= r {
            return Err(CoreError::OutOfHashRange { i, j, k, range: r });
        }
        let span = 2 * r;
        let id = (i + r) + span * (j + r) + span * span * (k + r);
        Ok(id as u64)
    }

    /// Packs `(i, j, k)` into a 64-bit id without range checking.
    ///
    /// Callers must have already validated the index (e.g. via
    /// [`Self::voxel_id_checked`]); out-of-range indices still produce a
    /// value, but it may collide with an in-range voxel.
    #[must_use]
    pub fn voxel_id_unchecked(&self, i: i64, j: i64, k: i64) -> u64 {
        let r = self.hash_range;
        let span = 2 * r;
        ((i + r) + span * (j + r) + span * span * (k + r)) as u64
    }

    /// Voxel id containing world point `p`.
    pub fn id_of(&self, p: DVec3) -> Result<u64> {
        let (i, j, k) = self.voxel_index(p);
        self.voxel_id_checked(i, j, k)
    }

    /// Inverse of [`Self::voxel_id_checked`]: recovers `(i, j, k)` from an id.
    #[must_use]
    pub fn index_of_id(&self, id: u64) -> (i64, i64, i64) {
        let r = self.hash_range;
        let span = 2 * r;
        let id = id as i64;
        let i = id % span - r;
        let rest = id / span;
        let j = rest % span - r;
        let k = rest / span - r;
        (i, j, k)
    }

    /// World-space center of the voxel identified by `id`.
    #[must_use]
    pub fn voxel_center(&self, id: u64) -> DVec3 {
        let (i, j, k) = self.index_of_id(id);
        self.index_center(i, j, k)
    }

    /// World-space center of voxel `(i, j, k)`.
    #[must_use]
    pub fn index_center(&self, i: i64, j: i64, k: i64) -> DVec3 {
        DVec3::new(
            (i as f64 + 0.5) * self.voxel_size,
            (j as f64 + 0.5) * self.voxel_size,
            (k as f64 + 0.5) * self.voxel_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_index_floors_toward_negative_infinity() {
        let key = VoxelKey::new(10.0);
        assert_eq!(key.axis_index(0.0), 0);
        assert_eq!(key.axis_index(9.999), 0);
        assert_eq!(key.axis_index(10.0), 1);
        assert_eq!(key.axis_index(-0.001), -1);
        assert_eq!(key.axis_index(-10.0), -1);
        assert_eq!(key.axis_index(-10.001), -2);
    }

    #[test]
    fn id_roundtrips_through_index() {
        let key = VoxelKey::with_hash_range(2.5, 1000);
        for (i, j, k) in [(0, 0, 0), (-1, 2, -3), (999, -999, 500), (-1000, 0, 0)] {
            let id = key.voxel_id_checked(i, j, k).unwrap();
            assert_eq!(key.index_of_id(id), (i, j, k));
        }
    }

    #[test]
    fn out_of_range_is_rejected() {
        let key = VoxelKey::with_hash_range(1.0, 10);
        assert!(key.voxel_id_checked(10, 0, 0).is_err());
        assert!(key.voxel_id_checked(-11, 0, 0).is_err());
        assert!(key.voxel_id_checked(9, -10, 9).is_ok());
    }

    #[test]
    fn voxel_center_is_inside_voxel() {
        let key = VoxelKey::new(4.0);
        let p = DVec3::new(5.5, -1.2, 100.0);
        let id = key.id_of(p).unwrap();
        let center = key.voxel_center(id);
        let (i, j, k) = key.voxel_index(p);
        assert!((center.x - (i as f64 + 0.5) * 4.0).abs() < 1e-9);
        assert!((center.y - (j as f64 + 0.5) * 4.0).abs() < 1e-9);
        assert!((center.z - (k as f64 + 0.5) * 4.0).abs() < 1e-9);
    }

    #[test]
    fn different_voxel_sizes_do_not_alias_within_one_key() {
        let a = VoxelKey::new(10.0);
        let b = VoxelKey::new(5.0);
        assert_ne!(a.voxel_size(), b.voxel_size());
    }
}
