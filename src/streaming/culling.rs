//! Visibility Engine - frustum and distance culling of active chunks.
//!
//! A pass runs when the camera moved beyond tolerance, its projection
//! changed, or the active set changed since the last pass. The pass writes
//! only each chunk's `visible` flag.

use rayon::prelude::*;

use crate::core::camera::{Camera, CameraPose};
use crate::core::config::{ChunkerConfig, CullingMode};
use crate::math::{Aabb, Frustum, GridCoord};
use crate::streaming::engine::StreamingEngine;
use crate::streaming::level::Level;
use crate::streaming::pool::{Chunk, SlotIndex};

/// Statistics from one visibility pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CullingStats {
    /// Chunks that went through the distance and frustum tests
    pub tested: usize,
    pub visible: usize,
    /// Chunks marked invisible because an ancestor was invisible
    pub pruned: usize,
    /// Pass was triggered by a change in the active set rather than the camera
    pub forced: bool,
}

/// Per-level observer position and squared view radius for the distance test
#[derive(Clone, Copy, Debug)]
struct ViewRange {
    observer: GridCoord,
    radius_sq: i64,
}

/// Decides which active chunks are visible
pub struct VisibilityEngine {
    mode: CullingMode,
    position_tolerance: f32,
    rotation_tolerance_degrees: f32,
    batch_size: usize,
    frustum: Frustum,
    last_pose: Option<CameraPose>,
    passes: u64,
}

impl VisibilityEngine {
    pub fn new(config: &ChunkerConfig) -> Self {
        Self {
            mode: config.culling,
            position_tolerance: config.position_tolerance,
            rotation_tolerance_degrees: config.rotation_tolerance_degrees,
            batch_size: config.batch_size,
            frustum: Frustum::default(),
            last_pose: None,
            passes: 0,
        }
    }

    pub fn mode(&self) -> CullingMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CullingMode) {
        self.mode = mode;
    }

    /// Frustum planes from the most recent pass
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Number of passes run so far
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Whether the camera has moved beyond tolerance since the last pass
    pub fn camera_moved(&self, camera: &Camera) -> bool {
        match &self.last_pose {
            Some(last) => last.moved_beyond(
                &camera.pose(),
                self.position_tolerance,
                self.rotation_tolerance_degrees,
            ),
            None => true,
        }
    }

    /// Run a pass if the camera moved or `force` is set.
    ///
    /// Returns `None` when the pass was skipped; visibility flags keep their
    /// previous values.
    pub fn update(
        &mut self,
        camera: &Camera,
        streaming: &mut StreamingEngine,
        force: bool,
    ) -> Option<CullingStats> {
        let moved = self.camera_moved(camera);
        if !moved && !force {
            return None;
        }

        self.frustum = Frustum::from_view_projection(&camera.view_projection());
        self.last_pose = Some(camera.pose());
        self.passes += 1;

        let mut stats = self.cull(streaming);
        stats.forced = !moved;

        log::trace!(
            "Visibility pass {}: {} tested, {} visible, {} pruned",
            self.passes,
            stats.tested,
            stats.visible,
            stats.pruned
        );
        Some(stats)
    }

    /// Re-evaluate every active chunk against the current frustum
    fn cull(&self, streaming: &mut StreamingEngine) -> CullingStats {
        let (levels, observer, chunks) = streaming.culling_view();
        let ranges = view_ranges(levels, observer);

        match self.mode {
            CullingMode::Flat => cull_flat(&self.frustum, &ranges, chunks, self.batch_size),
            CullingMode::Hierarchical => cull_hierarchical(&self.frustum, &ranges, levels, chunks),
        }
    }
}

fn view_ranges(levels: &[Level], observer: Option<GridCoord>) -> Vec<Option<ViewRange>> {
    levels
        .iter()
        .map(|level| {
            observer.map(|observer| {
                let radius = level.view_radius() as i64;
                ViewRange {
                    observer: level.rescale(observer),
                    radius_sq: radius * radius,
                }
            })
        })
        .collect()
}

/// Test every active chunk independently
fn cull_flat(
    frustum: &Frustum,
    ranges: &[Option<ViewRange>],
    chunks: &mut [Chunk],
    batch_size: usize,
) -> CullingStats {
    let (tested, visible) = chunks
        .par_iter_mut()
        .with_min_len(batch_size)
        .filter(|chunk| chunk.is_active())
        .map(|chunk| {
            chunk.visible = is_visible(chunk, frustum, range_of(ranges, chunk));
            (1, chunk.visible as usize)
        })
        .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1));

    CullingStats { tested, visible, ..Default::default() }
}

/// Walk each hierarchy top-down, marking descendants of invisible chunks
/// invisible without testing them
fn cull_hierarchical(
    frustum: &Frustum,
    ranges: &[Option<ViewRange>],
    levels: &[Level],
    chunks: &mut [Chunk],
) -> CullingStats {
    let mut stats = CullingStats::default();

    let mut stack: Vec<(SlotIndex, bool)> = levels
        .iter()
        .rev()
        .flat_map(|level| level.active().iter().copied())
        .filter(|slot| chunks[slot.index()].parent.is_none())
        .map(|slot| (slot, true))
        .collect();

    while let Some((slot, parent_visible)) = stack.pop() {
        let chunk = &mut chunks[slot.index()];
        chunk.visible = if parent_visible {
            stats.tested += 1;
            is_visible(chunk, frustum, range_of(ranges, chunk))
        } else {
            stats.pruned += 1;
            false
        };
        stats.visible += chunk.visible as usize;

        let visible = chunk.visible;
        stack.extend(chunk.children.iter().map(|&child| (child, visible)));
    }

    stats
}

fn range_of(ranges: &[Option<ViewRange>], chunk: &Chunk) -> Option<ViewRange> {
    chunk.level.and_then(|level| ranges.get(level as usize).copied().flatten())
}

fn is_visible(chunk: &Chunk, frustum: &Frustum, range: Option<ViewRange>) -> bool {
    if let Some(range) = range {
        // Plain grid distance, tighter than the padded loading metric
        if (chunk.coord - range.observer).length_sq() > range.radius_sq {
            return false;
        }
    }
    frustum.intersects_aabb(&chunk.bounds) && !is_occluded(&chunk.bounds)
}

/// Occlusion test hook. Nothing is treated as an occluder yet.
fn is_occluded(_bounds: &Aabb) -> bool {
    false
}
