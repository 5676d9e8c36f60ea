//! Error types for voxel aggregation and the bundle format.

use thiserror::Error;

pub use lodcloud_core::CoreError;

/// Errors raised by `AveragingVoxelMap` and the bundle reader/writer.
#[derive(Error, Debug)]
pub enum VoxelError {
    /// A sample's voxel index left the configured hash range.
    #[error(transparent)]
    OutOfHashRange(#[from] CoreError),

    /// I/O failure while reading or writing a bundle or cache file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bundle header declared an offset/size pair that does not
    /// fit inside the file.
    #[error(
        "corrupt bundle: level {level} block {block_id} declares offset {offset} + size {size} \
         past end of file ({file_size} bytes)"
    )]
    CorruptBundle {
        /// Level the bad entry was found at.
        level: u32,
        /// Block id the bad entry belongs to.
        block_id: u64,
        /// Declared absolute offset.
        offset: u64,
        /// Declared payload size.
        size: u64,
        /// Actual file size.
        file_size: u64,
    },
}

/// Result type alias using [`VoxelError`].
pub type Result<T> = std::result::Result<T, VoxelError>;
