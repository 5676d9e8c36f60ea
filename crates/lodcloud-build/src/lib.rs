//! Offline build pipeline: partitions a PLY point cloud into spatial
//! blocks, builds a stack of averaged multi-resolution levels per
//! block, reorders each exported level into spatially-uniform
//! prefixes, and bundles every payload behind a random-access header.

pub mod error;
pub mod level_builder;
pub mod partitioner;
pub mod pipeline;
pub mod shuffler;

pub use error::{BuildError, Result};
pub use level_builder::{LevelBuilder, LevelBuilderConfig};
pub use partitioner::{BlockPartitioner, PartitionSummary};
pub use pipeline::{BuildConfig, BuildPipeline, BuildReport};
pub use shuffler::StructuredShuffler;
