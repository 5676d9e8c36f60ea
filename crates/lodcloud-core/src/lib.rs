//! Core types shared by the lodcloud build pipeline and streaming engine.
//!
//! This crate provides the foundational types used throughout the
//! workspace:
//! - The voxel identity scheme ([`VoxelKey`])
//! - Point/sample value types ([`point`])
//! - Common error types

pub mod error;
pub mod point;
pub mod voxel_key;

pub use error::{CoreError, Result};
pub use point::{ColorRgb, PointRecord, Sample};
pub use voxel_key::VoxelKey;

/// Tuning constants shared across the workspace.
pub mod constants {
    /// Size, in world units, of a level-0 (coarsest) voxel.
    pub const LEVEL0_VOXEL_SIZE: f64 = 10.0;
    /// Total number of averaging levels built per block before export
    /// truncation (`L0 .. L9`, halving each time).
    pub const TOTAL_LEVELS: u32 = 10;
    /// Index of the level that becomes level 0 of the exported bundle.
    pub const LEVEL_EXPORT: u32 = 3;
    /// Number of levels actually persisted into a bundle
    /// (`TOTAL_LEVELS - LEVEL_EXPORT`).
    pub const EXPORTED_LEVELS: u32 = TOTAL_LEVELS - LEVEL_EXPORT;
    /// Voxel size used by the structured shuffler when reordering a
    /// level's points into spatially uniform prefixes.
    pub const SHUFFLE_VOXEL_SIZE: f64 = 2.5;
    /// Number of points streamed through `add_samples` per chunk.
    pub const STREAMING_CHUNK_SIZE: usize = 10_000;
    /// Default hash range `R` for [`crate::VoxelKey`]; valid indices lie
    /// in `[-R, R)` on every axis.
    pub const DEFAULT_HASH_RANGE: i64 = 100_000;
    /// Voxel weight below which a voxel is considered empty and dropped.
    pub const ZERO_WEIGHT_EPSILON: f64 = 1e-4;

    /// Constant `C` in the distance-to-level selection law.
    pub const LOD_DISTANCE_CONSTANT: f64 = 1_638_570.0;
    /// `1 / ln(2)`, the slope of the logarithmic level law.
    pub const LOD_LOG2_SCALE: f64 = 0.721_347_5;
    /// Reference screen resolution the LOD law's resolution term is
    /// normalized against.
    pub const LOD_REFERENCE_PIXELS: f64 = 1920.0 * 1080.0;
    /// Number of LOD levels exposed at runtime (0 = coarsest resident
    /// level, 6 = finest).
    pub const RUNTIME_LOD_LEVELS: u32 = 7;
}
