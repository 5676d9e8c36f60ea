//! Error types for the runtime streaming engine.

use thiserror::Error;

/// Errors raised while constructing or driving a [`crate::StreamingEngine`].
#[derive(Error, Debug)]
pub enum StreamError {
    /// The bundle header failed to parse, or declared an offset/size
    /// pair that does not fit inside the file. Fatal at construction.
    #[error(transparent)]
    CorruptBundle(#[from] lodcloud_voxel::VoxelError),

    /// I/O failure while resident-loading the level-0 aggregate at
    /// construction. Fatal; unlike a per-block refinement read later
    /// on, there is no prior level to fall back to for a block that
    /// has never loaded at all.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`StreamError`].
pub type Result<T> = std::result::Result<T, StreamError>;
