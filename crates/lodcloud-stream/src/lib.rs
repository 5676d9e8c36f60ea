//! Runtime LOD selection and background payload streaming for the
//! lodcloud bundle format.
//!
//! [`StreamingEngine`] owns one open bundle: it resident-loads every
//! block's level-0 payload at construction, then runs a single
//! background loader thread that reads and decodes per-block
//! refinements as the viewer moves, handing them to the caller's
//! render loop through a lock-guarded [`block_table::BlockTable`].
//! The render side of this contract never blocks on I/O.

pub mod block_table;
pub mod engine;
pub mod error;
pub mod lod;
pub mod payload;

pub use block_table::{BlockState, BlockTable};
pub use engine::StreamingEngine;
pub use error::{Result, StreamError};
pub use lod::{level_f, select_level, MAX_LEVEL};
pub use payload::DecodedPayload;
