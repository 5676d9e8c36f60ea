//! Voxel aggregation and the bundle file format for the lodcloud LOD
//! pipeline.
//!
//! This crate owns the two pieces that sit between raw points and a
//! streamable file: the hashed, weighted-average voxel
//! grid ([`AveragingVoxelMap`]) used to build every LOD level, and the
//! bundle header/reader/writer that packs per-(level, block) payloads
//! behind a random-access directory ([`BundleWriter`], [`BundleReader`]).

pub mod bundle;
pub mod error;
pub mod voxel;
pub mod voxel_map;

pub use bundle::{BundleReader, BundleWriter};
pub use error::{Result, VoxelError};
pub use voxel::{AveragingVoxel, Voxel, ZERO_WEIGHT_EPSILON};
pub use voxel_map::AveragingVoxelMap;
