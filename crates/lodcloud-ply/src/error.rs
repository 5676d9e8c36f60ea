//! Error types for PLY reading and writing.

use thiserror::Error;

/// Errors raised while reading or writing a PLY file.
#[derive(Error, Debug)]
pub enum PlyError {
    /// I/O failure while reading or writing.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file's `format` line was not `binary_little_endian`.
    #[error("unsupported PLY format {0:?}; only binary_little_endian is accepted")]
    UnsupportedFormat(String),

    /// `element vertex` never declared a coordinate property (`x`).
    #[error("PLY file has no vertex coordinate properties")]
    MissingCoordinates,

    /// A coordinate/normal/intensity property declared a type other
    /// than `float` or `double`.
    #[error("unsupported PLY property type {0:?}; only float and double are accepted")]
    UnsupportedPropertyType(String),

    /// A vertex's alpha channel decoded to something other than 255.
    #[error("vertex {index} has alpha {alpha}, expected 255")]
    InvalidAlpha {
        /// Index of the offending vertex.
        index: usize,
        /// The alpha value actually read.
        alpha: u8,
    },

    /// A face's vertex-index list had a length other than 3.
    #[error("face {index} has {count} vertex indices, expected 3 (triangles only)")]
    NonTriangularFace {
        /// Index of the offending face.
        index: usize,
        /// The declared list length.
        count: u8,
    },

    /// The mesh being written mixes vertices that carry an optional
    /// channel (normal/colour/intensity) with vertices that don't.
    #[error("point cloud is not uniform: {0}")]
    NonUniformCloud(&'static str),
}

/// Result type alias using [`PlyError`].
pub type Result<T> = std::result::Result<T, PlyError>;
