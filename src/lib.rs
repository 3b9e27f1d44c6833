//! Tilestream - multi-level tile streaming with hierarchical visibility culling

pub mod core;
pub mod math;
pub mod streaming;
pub mod feature;

pub use crate::core::{Camera, ChunkerConfig, CullingMode, Error};
pub use crate::streaming::{Chunker, ChunkInstance, FrameStats};
