//! Error types shared by every lodcloud crate.

use thiserror::Error;

/// Errors that can arise from the core voxel-identity and point types.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A point's voxel index left the configured hash range on some axis.
    #[error("voxel index ({i}, {j}, {k}) is outside hash range [-{range}, {range})")]
    OutOfHashRange {
        /// Voxel index on the x axis.
        i: i64,
        /// Voxel index on the y axis.
        j: i64,
        /// Voxel index on the z axis.
        k: i64,
        /// The configured hash range `R`.
        range: i64,
    },
}

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;
