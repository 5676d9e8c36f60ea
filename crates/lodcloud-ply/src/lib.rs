//! Binary-little-endian PLY reading and writing for coloured point
//! clouds.
//!
//! Scope: `element vertex` with at least `x y z` (float or double),
//! and optional `nx ny nz`, `red green blue` (+ 8-bit alpha, which
//! must be 255), `intensity_value`. ASCII PLY and non-triangular face
//! lists are rejected rather than transcoded.

pub mod error;
pub mod reader;
pub mod types;
pub mod writer;

pub use error::{PlyError, Result};
pub use reader::PlyReader;
pub use types::{PlyMesh, PlyVertex};
pub use writer::PlyWriter;
