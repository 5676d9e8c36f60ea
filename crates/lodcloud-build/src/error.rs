//! Error types for the offline build pipeline.

use thiserror::Error;

/// Errors raised while partitioning, leveling, shuffling, or bundling.
#[derive(Error, Debug)]
pub enum BuildError {
    /// I/O failure while reading/writing a shard, cache file, or
    /// bundle.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reading the input PLY.
    #[error(transparent)]
    Ply(#[from] lodcloud_ply::PlyError),

    /// Failure from the voxel map or bundle layer, including
    /// out-of-hash-range samples.
    #[error(transparent)]
    Voxel(#[from] lodcloud_voxel::VoxelError),

    /// A `BuildConfig` TOML file failed to parse.
    #[error("invalid build config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A `BuildConfig` failed to serialize to TOML.
    #[error("failed to serialize build config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Result type alias using [`BuildError`].
pub type Result<T> = std::result::Result<T, BuildError>;
