//! Streaming Engine - incremental add/remove of chunks around the observer.
//!
//! Runs only when the observer's level-0 grid coordinate changes. Each run:
//! 1. scans every level for chunks outside the loading radius (parallel),
//! 2. removes them, detaching their hierarchy links and recycling their slots,
//! 3. scans every level's precomputed offsets for missing coordinates (parallel),
//! 4. adds them nearest-first until the level's free slots run out, linking
//!    each new chunk to its parent and adopting orphaned children.
//!
//! Levels are added coarsest-first so fine chunks find their parents in the
//! same update. A missing parent is never created eagerly; the coarser level's
//! own scan creates it, and it adopts its children when it arrives.

use rayon::prelude::*;

use crate::core::config::ChunkerConfig;
use crate::core::error::Error;
use crate::core::types::{Result, Vec3};
use crate::math::{GridBounds, GridCoord};
use crate::streaming::hierarchy;
use crate::streaming::level::Level;
use crate::streaming::pool::{Chunk, ChunkPool, SlotIndex};

/// Changes made to one level by a streaming update
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LevelDelta {
    /// Slots that became active
    pub added: Vec<SlotIndex>,
    /// Coordinates that were unloaded
    pub removed: Vec<GridCoord>,
    /// Candidates skipped because the level's slice was full
    pub deferred: usize,
}

/// Changes made by the most recent streaming update, per level
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamingDelta {
    pub levels: Vec<LevelDelta>,
}

impl StreamingDelta {
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(|l| l.added.is_empty() && l.removed.is_empty())
    }

    pub fn total_added(&self) -> usize {
        self.levels.iter().map(|l| l.added.len()).sum()
    }

    pub fn total_removed(&self) -> usize {
        self.levels.iter().map(|l| l.removed.len()).sum()
    }

    pub fn total_deferred(&self) -> usize {
        self.levels.iter().map(|l| l.deferred).sum()
    }
}

/// Statistics from one streaming update
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StreamingStats {
    /// Observer's level-0 coordinate
    pub observer: GridCoord,
    pub added: usize,
    pub removed: usize,
    pub deferred: usize,
    /// Parent/child links created
    pub linked: usize,
    /// Active chunks across all levels after the update
    pub active: usize,
}

/// Owns the chunk pool and level registry between frames
pub struct StreamingEngine {
    pool: ChunkPool,
    levels: Vec<Level>,
    branching_factor: i32,
    tile_size: Vec3,
    origin: Vec3,
    batch_size: usize,
    /// Level-0 coordinate of the last applied update
    observer: Option<GridCoord>,
    delta: StreamingDelta,
}

impl StreamingEngine {
    /// Build levels and size the pool. The configuration must already be validated.
    pub fn new(config: &ChunkerConfig) -> Self {
        let world = GridBounds::centered(config.grid_size);
        let levels: Vec<Level> = (0..config.level_count())
            .map(|index| {
                Level::new(
                    index,
                    config.scale(index),
                    config.loading_distance(),
                    config.view_distance,
                    world,
                )
            })
            .collect();

        let slice_sizes: Vec<usize> = levels
            .iter()
            .map(|level| {
                let wanted = (level.offsets().len() as f32 * config.pool_headroom).ceil() as usize;
                wanted.max(1)
            })
            .collect();

        let branching = config.branching_factor as usize;
        let pool = ChunkPool::new(&slice_sizes, branching * branching);

        log::info!(
            "Streaming engine: {} levels, pool capacity {} (per level {:?})",
            levels.len(),
            pool.capacity(),
            slice_sizes
        );

        Self {
            delta: StreamingDelta {
                levels: vec![LevelDelta::default(); levels.len()],
            },
            pool,
            levels,
            branching_factor: config.branching_factor as i32,
            tile_size: config.tile_size,
            origin: config.origin,
            batch_size: config.batch_size,
            observer: None,
        }
    }

    /// Level-0 grid coordinate containing a world position
    pub fn world_to_grid(&self, world: Vec3) -> GridCoord {
        GridCoord::from_world(world, self.origin, self.tile_size, 1)
    }

    /// Stream around a world-space observer position.
    ///
    /// Returns `None` when the observer's coarse coordinate has not changed.
    pub fn update(&mut self, observer: Vec3) -> Result<Option<StreamingStats>> {
        self.update_coord(self.world_to_grid(observer))
    }

    /// Stream around a level-0 grid coordinate
    pub fn update_coord(&mut self, observer: GridCoord) -> Result<Option<StreamingStats>> {
        for level in &mut self.delta.levels {
            *level = LevelDelta::default();
        }
        if self.observer == Some(observer) {
            return Ok(None);
        }

        let mut linked = 0;

        for level in 0..self.levels.len() {
            let center = self.levels[level].rescale(observer);
            let positions = self.find_to_remove(level, center);
            self.remove(level, &positions);
        }

        for level in (0..self.levels.len()).rev() {
            let center = self.levels[level].rescale(observer);
            let candidates = self.find_to_add(level, center);
            linked += self.add(level, &candidates)?;
        }

        self.observer = Some(observer);

        for (index, delta) in self.delta.levels.iter().enumerate() {
            if !delta.added.is_empty() || !delta.removed.is_empty() || delta.deferred > 0 {
                log::debug!(
                    "Level {}: +{} -{} deferred {} (active {})",
                    index,
                    delta.added.len(),
                    delta.removed.len(),
                    delta.deferred,
                    self.levels[index].active_count()
                );
            }
        }

        Ok(Some(StreamingStats {
            observer,
            added: self.delta.total_added(),
            removed: self.delta.total_removed(),
            deferred: self.delta.total_deferred(),
            linked,
            active: self.active_count(),
        }))
    }

    /// Positions in the level's active list whose chunk lies outside the loading radius.
    ///
    /// Ascending order, so removal can swap-remove back to front.
    fn find_to_remove(&self, level: usize, center: GridCoord) -> Vec<usize> {
        let radius = self.levels[level].loading_radius();
        let pool = &self.pool;

        self.levels[level]
            .active()
            .par_iter()
            .enumerate()
            .with_min_len(self.batch_size)
            .filter_map(|(position, &slot)| {
                let offset = pool.get(slot).coord - center;
                (!offset.within_radius(radius)).then_some(position)
            })
            .collect()
    }

    fn remove(&mut self, level: usize, positions: &[usize]) {
        for &position in positions.iter().rev() {
            let slot = self.levels[level].active()[position];
            let coord = self.pool.get(slot).coord;

            hierarchy::detach(&mut self.pool, slot);
            self.levels[level].remove_at(position, coord);
            self.pool.release(slot);

            self.delta.levels[level].removed.push(coord);
        }
    }

    /// Absolute coordinates within the loading radius that are in bounds and
    /// not yet active, nearest-first.
    fn find_to_add(&self, level: usize, center: GridCoord) -> Vec<GridCoord> {
        let level = &self.levels[level];
        let radius = level.loading_radius();
        let bounds = level.bounds();

        level
            .offsets()
            .par_iter()
            .with_min_len(self.batch_size)
            .map(|&offset| center + offset)
            .filter(|&coord| {
                bounds.contains(coord)
                    && (coord - center).within_radius(radius)
                    && !level.contains(coord)
            })
            .collect()
    }

    /// Activate candidates in order until the level's slice is full.
    ///
    /// Returns the number of hierarchy links created.
    fn add(&mut self, level: usize, candidates: &[GridCoord]) -> Result<usize> {
        let scale = self.levels[level].scale();
        let mut linked = 0;

        for (i, &coord) in candidates.iter().enumerate() {
            let Some(slot) = self.pool.acquire(level) else {
                self.delta.levels[level].deferred = candidates.len() - i;
                break;
            };

            let chunk = self.pool.get_mut(slot);
            chunk.coord = coord;
            chunk.bounds = coord.world_bounds(self.origin, self.tile_size, scale);
            chunk.visible = false;
            self.levels[level].insert(coord, slot);

            if let Some(parent_level) = self.levels.get(level + 1) {
                let parent_coord = hierarchy::parent_coord(coord, self.branching_factor);
                if let Some(parent) = parent_level.lookup(parent_coord) {
                    hierarchy::link(&mut self.pool, slot, parent)?;
                    linked += 1;
                }
            }

            if level > 0 {
                for child_coord in hierarchy::child_coords(coord, self.branching_factor) {
                    let Some(child) = self.levels[level - 1].lookup(child_coord) else {
                        continue;
                    };
                    if self.pool.get(child).parent.is_none() {
                        hierarchy::link(&mut self.pool, child, slot)?;
                        linked += 1;
                    }
                }
            }

            self.delta.levels[level].added.push(slot);
        }

        Ok(linked)
    }

    pub fn pool(&self) -> &ChunkPool {
        &self.pool
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    pub fn chunk(&self, slot: SlotIndex) -> &Chunk {
        self.pool.get(slot)
    }

    /// Level-0 coordinate of the last applied update
    pub fn observer(&self) -> Option<GridCoord> {
        self.observer
    }

    /// Changes from the most recent call to [`update`](Self::update)
    pub fn delta(&self) -> &StreamingDelta {
        &self.delta
    }

    pub fn branching_factor(&self) -> i32 {
        self.branching_factor
    }

    pub fn active_count(&self) -> usize {
        self.levels.iter().map(Level::active_count).sum()
    }

    /// Split borrows for the visibility pass: levels and observer read-only,
    /// chunk records writable.
    pub(crate) fn culling_view(&mut self) -> (&[Level], Option<GridCoord>, &mut [Chunk]) {
        (&self.levels, self.observer, self.pool.chunks_mut())
    }

    /// Check pool conservation, map bijection, hierarchy symmetry, parent
    /// placement, adoption and radius containment.
    pub fn check_invariants(&self) -> Result<()> {
        let active = self.active_count();
        if self.pool.free_count() + active != self.pool.capacity() {
            return Err(Error::Hierarchy(format!(
                "pool leak: {} free + {} active != {} capacity",
                self.pool.free_count(),
                active,
                self.pool.capacity()
            )));
        }
        for slot in self.pool.free_slots() {
            if self.pool.get(slot).is_active() {
                return Err(Error::Hierarchy(format!("free slot {} is marked active", slot)));
            }
        }

        for level in &self.levels {
            let index = level.index();
            if level.entries().count() != level.active_count() {
                return Err(Error::Hierarchy(format!(
                    "level {} map has {} entries for {} active slots",
                    index,
                    level.entries().count(),
                    level.active_count()
                )));
            }
            for (coord, slot) in level.entries() {
                let chunk = self.pool.get(slot);
                if chunk.coord != coord || chunk.level != Some(index as u8) {
                    return Err(Error::Hierarchy(format!(
                        "level {} maps {} to slot {} holding {} at level {:?}",
                        index, coord, slot, chunk.coord, chunk.level
                    )));
                }
                if !self.pool.slice(index).contains(&slot.0) {
                    return Err(Error::Hierarchy(format!(
                        "slot {} outside level {} slice",
                        slot, index
                    )));
                }
                if let Some(observer) = self.observer {
                    let offset = coord - level.rescale(observer);
                    if !offset.within_radius(level.loading_radius()) {
                        return Err(Error::Hierarchy(format!(
                            "level {} chunk {} outside loading radius",
                            index, coord
                        )));
                    }
                }
                if let Some(parent) = chunk.parent {
                    let parent_chunk = self.pool.get(parent);
                    if parent_chunk.level != Some(index as u8 + 1)
                        || parent_chunk.coord != hierarchy::parent_coord(coord, self.branching_factor)
                    {
                        return Err(Error::Hierarchy(format!(
                            "slot {} at {} has misplaced parent {} at {}",
                            slot, coord, parent, parent_chunk.coord
                        )));
                    }
                } else if let Some(parent_level) = self.levels.get(index + 1) {
                    let parent_coord = hierarchy::parent_coord(coord, self.branching_factor);
                    if let Some(parent) = parent_level.lookup(parent_coord) {
                        return Err(Error::Hierarchy(format!(
                            "slot {} at {} is orphaned while parent {} at {} is active",
                            slot, coord, parent, parent_coord
                        )));
                    }
                }
            }
        }

        hierarchy::check_symmetry(&self.pool)
    }
}
