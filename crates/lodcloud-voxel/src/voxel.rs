//! The `Voxel` storage trait and the averaging voxel that implements it.

use glam::DVec3;
use lodcloud_core::{ColorRgb, Sample};

/// A single cell's storage contract inside an [`crate::AveragingVoxelMap`].
///
/// The map is generic over this trait rather than hard-coding the
/// averaging voxel so that other aggregation strategies (e.g. nearest-
/// sample, majority colour) could share the same hashed-grid machinery.
/// The core only ever needs [`AveragingVoxel`].
pub trait Voxel: Default + Clone {
    /// Fold one weighted sample into this voxel.
    fn insert_sample(&mut self, sample: Sample);

    /// Fold another voxel's aggregate into this one, as if its mean
    /// were a single sample carrying its full weight.
    fn merge_voxel(&mut self, other: &Self);

    /// Algebraic inverse of [`Self::merge_voxel`]. Returns `true` if the
    /// resulting weight dropped below the zero threshold, in which case
    /// the map drops this voxel entirely.
    fn subtract_voxel(&mut self, other: &Self) -> bool;

    /// Total accumulated weight.
    fn weight(&self) -> f64;

    /// Current mean position.
    fn position(&self) -> DVec3;

    /// Current mean colour.
    fn color(&self) -> ColorRgb;
}

/// Weight below which a voxel is considered empty and removed.
pub const ZERO_WEIGHT_EPSILON: f64 = lodcloud_core::constants::ZERO_WEIGHT_EPSILON;

/// A weighted running mean of position and colour.
///
/// Insertion of a sample `(xyz, rgb, w)` updates
/// `n <- n + w; mean <- mean + w/n * (xyz - mean)`, and likewise for
/// colour. Merging another voxel runs the same update with `(its mean,
/// its n)` in place of `(xyz, w)`. Subtraction is the algebraic
/// inverse, solved for the pre-update mean and weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AveragingVoxel {
    mean: DVec3,
    color_mean: DVec3,
    weight: f64,
}

impl Default for AveragingVoxel {
    fn default() -> Self {
        Self {
            mean: DVec3::ZERO,
            color_mean: DVec3::ZERO,
            weight: 0.0,
        }
    }
}

/// Forward running-mean update: fold a weighted sample into `(mean, n)`.
fn running_mean_insert(mean: DVec3, n: f64, sample: DVec3, w: f64) -> (DVec3, f64) {
    let n_new = n + w;
    if n_new <= 0.0 {
        return (mean, n_new);
    }
    (mean + (w / n_new) * (sample - mean), n_new)
}

/// Inverse of [`running_mean_insert`]: recover the pre-update `(mean, n)`
/// given the post-update `(mean', n')` and the sample that was added.
fn running_mean_subtract(mean_new: DVec3, n_new: f64, sample: DVec3, w: f64) -> (DVec3, f64) {
    let n = n_new - w;
    if n <= 0.0 {
        return (mean_new, n);
    }
    ((mean_new * n_new - sample * w) / n, n)
}

impl AveragingVoxel {
    /// Weighted mean position and colour directly, bypassing the
    /// `Sample`/`Voxel` trait plumbing. Used by tests and by callers
    /// that already hold an aggregate.
    #[must_use]
    pub fn new(mean: DVec3, color_mean: DVec3, weight: f64) -> Self {
        Self {
            mean,
            color_mean,
            weight,
        }
    }
}

impl Voxel for AveragingVoxel {
    fn insert_sample(&mut self, sample: Sample) {
        let color = DVec3::from_array(sample.color.to_f64());
        let (mean, n) = running_mean_insert(self.mean, self.weight, sample.position, sample.weight);
        let (color_mean, _) = running_mean_insert(self.color_mean, self.weight, color, sample.weight);
        self.mean = mean;
        self.color_mean = color_mean;
        self.weight = n;
    }

    fn merge_voxel(&mut self, other: &Self) {
        let (mean, n) = running_mean_insert(self.mean, self.weight, other.mean, other.weight);
        let (color_mean, _) =
            running_mean_insert(self.color_mean, self.weight, other.color_mean, other.weight);
        self.mean = mean;
        self.color_mean = color_mean;
        self.weight = n;
    }

    fn subtract_voxel(&mut self, other: &Self) -> bool {
        let (mean, n) = running_mean_subtract(self.mean, self.weight, other.mean, other.weight);
        let (color_mean, _) =
            running_mean_subtract(self.color_mean, self.weight, other.color_mean, other.weight);
        self.mean = mean;
        self.color_mean = color_mean;
        self.weight = n;
        n < ZERO_WEIGHT_EPSILON
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn position(&self) -> DVec3 {
        self.mean
    }

    fn color(&self) -> ColorRgb {
        ColorRgb::from_f64(self.color_mean.to_array())
    }
}
