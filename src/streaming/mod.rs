//! Multi-level chunk streaming and visibility

pub mod pool;
pub mod level;
pub mod hierarchy;
pub mod engine;
pub mod culling;
pub mod chunker;

pub use pool::{Chunk, ChunkPool, SlotIndex};
pub use level::Level;
pub use engine::{LevelDelta, StreamingDelta, StreamingEngine, StreamingStats};
pub use culling::{CullingStats, VisibilityEngine};
pub use chunker::{Chunker, ChunkInstance, FrameStats, INSTANCE_VISIBLE};
