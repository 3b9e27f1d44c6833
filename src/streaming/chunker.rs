//! Chunker - per-frame facade over the streaming and visibility engines.
//!
//! Call [`Chunker::update`] once per frame with the observer position and
//! camera. Between updates the accessors expose read-only snapshots of the
//! active chunks for tile instantiators, renderers and debug drawers.

use bytemuck::{Pod, Zeroable};

use crate::core::camera::Camera;
use crate::core::config::{ChunkerConfig, CullingMode};
use crate::core::types::{Result, Vec3};
use crate::math::GridCoord;
use crate::streaming::culling::{CullingStats, VisibilityEngine};
use crate::streaming::engine::{StreamingDelta, StreamingEngine, StreamingStats};
use crate::streaming::level::Level;
use crate::streaming::pool::{Chunk, SlotIndex};

/// `ChunkInstance::flags` bit set when the chunk passed the last visibility pass
pub const INSTANCE_VISIBLE: u32 = 1;

/// Per-chunk record for GPU upload (32 bytes)
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ChunkInstance {
    /// World-space box center
    pub center: [f32; 3],
    /// Hierarchy level
    pub level: u32,
    /// World-space box half-extents
    pub half_extent: [f32; 3],
    /// Bit 0: visible
    pub flags: u32,
}

impl ChunkInstance {
    fn from_chunk(chunk: &Chunk, level: usize) -> Self {
        Self {
            center: chunk.bounds.center.to_array(),
            level: level as u32,
            half_extent: chunk.bounds.half_extent.to_array(),
            flags: if chunk.visible { INSTANCE_VISIBLE } else { 0 },
        }
    }
}

/// What happened during one frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    /// `None` when the observer stayed in the same level-0 cell
    pub streaming: Option<StreamingStats>,
    /// `None` when the camera was idle and the active set unchanged
    pub culling: Option<CullingStats>,
}

/// Multi-level tile streamer with visibility culling
pub struct Chunker {
    config: ChunkerConfig,
    streaming: StreamingEngine,
    visibility: VisibilityEngine,
    frame: u64,
}

impl Chunker {
    /// Validate the configuration and allocate the pool
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;
        if config.pool_headroom < 1.0 {
            log::warn!(
                "Pool headroom {} is below 1.0; distant candidates will be deferred",
                config.pool_headroom
            );
        }

        let streaming = StreamingEngine::new(&config);
        let visibility = VisibilityEngine::new(&config);

        log::info!(
            "Chunker ready: view {} + buffer {} tiles, branching {}, {} levels, culling {:?}",
            config.view_distance,
            config.buffer_distance,
            config.branching_factor,
            streaming.levels().len(),
            config.culling
        );

        Ok(Self {
            config,
            streaming,
            visibility,
            frame: 0,
        })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Stream around `observer`, then cull against `camera`.
    ///
    /// A visibility pass is forced whenever streaming changed the active set.
    pub fn update(&mut self, observer: Vec3, camera: &Camera) -> Result<FrameStats> {
        self.frame += 1;

        let streaming = self.update_streaming(observer)?;
        let force = !self.streaming.delta().is_empty();
        let culling = self.visibility.update(camera, &mut self.streaming, force);

        Ok(FrameStats {
            frame: self.frame,
            streaming,
            culling,
        })
    }

    /// Streaming only. Returns `None` if the observer's coarse cell is unchanged.
    pub fn update_streaming(&mut self, observer: Vec3) -> Result<Option<StreamingStats>> {
        self.streaming.update(observer)
    }

    /// Visibility only. Returns `None` if the camera is within tolerance.
    pub fn update_visibility(&mut self, camera: &Camera) -> Option<CullingStats> {
        self.visibility.update(camera, &mut self.streaming, false)
    }

    /// Switch culling strategy; takes effect on the next pass
    pub fn set_culling_mode(&mut self, mode: CullingMode) {
        self.visibility.set_mode(mode);
    }

    pub fn level_count(&self) -> usize {
        self.streaming.levels().len()
    }

    pub fn level(&self, index: usize) -> Option<&Level> {
        self.streaming.level(index)
    }

    /// Active slots at a level, in unspecified order
    pub fn active_slots(&self, level: usize) -> &[SlotIndex] {
        self.streaming.level(level).map(Level::active).unwrap_or_default()
    }

    pub fn active_count(&self, level: usize) -> usize {
        self.active_slots(level).len()
    }

    pub fn chunk(&self, slot: SlotIndex) -> &Chunk {
        self.streaming.chunk(slot)
    }

    /// Active slot at a level coordinate
    pub fn lookup(&self, level: usize, coord: GridCoord) -> Option<SlotIndex> {
        self.streaming.level(level)?.lookup(coord)
    }

    /// Observer's level-0 coordinate as of the last streaming update
    pub fn observer_coord(&self) -> Option<GridCoord> {
        self.streaming.observer()
    }

    /// Adds and removals from the most recent frame
    pub fn delta(&self) -> &StreamingDelta {
        self.streaming.delta()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn pool_capacity(&self) -> usize {
        self.streaming.pool().capacity()
    }

    pub fn free_slots(&self) -> usize {
        self.streaming.pool().free_count()
    }

    /// Visibility passes run so far
    pub fn culling_passes(&self) -> u64 {
        self.visibility.passes()
    }

    /// Instance records for the visible chunks at a level
    pub fn visible_instances(&self, level: usize) -> Vec<ChunkInstance> {
        self.active_slots(level)
            .iter()
            .map(|&slot| self.chunk(slot))
            .filter(|chunk| chunk.visible)
            .map(|chunk| ChunkInstance::from_chunk(chunk, level))
            .collect()
    }

    /// Check pool, map and hierarchy consistency
    pub fn check_invariants(&self) -> Result<()> {
        self.streaming.check_invariants()
    }
}
