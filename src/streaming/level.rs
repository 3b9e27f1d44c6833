//! Level Registry - one entry per hierarchy level.

use std::collections::HashMap;

use crate::math::grid::{circular_offsets, padded_radius, view_radius};
use crate::math::{GridBounds, GridCoord};
use crate::streaming::pool::SlotIndex;

/// State for one layer of the multi-resolution hierarchy
pub struct Level {
    index: usize,
    scale: i32,
    /// Padded radius (grid units) used to load and unload
    loading_radius: i32,
    /// Unpadded radius (grid units) used by the distance cull
    view_radius: i32,
    /// Valid coordinates at this level
    bounds: GridBounds,
    /// Candidate offsets within the loading radius, nearest-first
    offsets: Vec<GridCoord>,
    /// Active chunks by coordinate
    map: HashMap<GridCoord, SlotIndex>,
    /// Active slots, unordered
    active: Vec<SlotIndex>,
}

impl Level {
    /// Build a level and precompute its candidate offsets
    pub fn new(
        index: usize,
        scale: i32,
        loading_distance: u32,
        view_distance: u32,
        world_bounds: GridBounds,
    ) -> Self {
        let offsets = circular_offsets(loading_distance, scale);
        Self {
            index,
            scale,
            loading_radius: padded_radius(loading_distance, scale),
            view_radius: view_radius(view_distance, scale),
            bounds: world_bounds.coarsen(scale),
            map: HashMap::with_capacity(offsets.len()),
            active: Vec::with_capacity(offsets.len()),
            offsets,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Level-0 tiles per cell axis
    pub fn scale(&self) -> i32 {
        self.scale
    }

    pub fn loading_radius(&self) -> i32 {
        self.loading_radius
    }

    pub fn view_radius(&self) -> i32 {
        self.view_radius
    }

    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    pub fn offsets(&self) -> &[GridCoord] {
        &self.offsets
    }

    /// Rescale a level-0 coordinate to this level
    pub fn rescale(&self, coord0: GridCoord) -> GridCoord {
        coord0.div_floor(self.scale)
    }

    /// Active slot at a coordinate
    pub fn lookup(&self, coord: GridCoord) -> Option<SlotIndex> {
        self.map.get(&coord).copied()
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        self.map.contains_key(&coord)
    }

    /// Active slots in unspecified order
    pub fn active(&self) -> &[SlotIndex] {
        &self.active
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Coordinate map entries (for invariant checks)
    pub fn entries(&self) -> impl Iterator<Item = (GridCoord, SlotIndex)> + '_ {
        self.map.iter().map(|(&coord, &slot)| (coord, slot))
    }

    /// Register a newly acquired slot
    pub(crate) fn insert(&mut self, coord: GridCoord, slot: SlotIndex) {
        let previous = self.map.insert(coord, slot);
        debug_assert!(previous.is_none(), "coordinate {} already active at level {}", coord, self.index);
        self.active.push(slot);
    }

    /// Swap-remove the entry at `position` in the active list.
    ///
    /// O(1); the last active entry takes its place.
    pub(crate) fn remove_at(&mut self, position: usize, coord: GridCoord) -> SlotIndex {
        let slot = self.active.swap_remove(position);
        let removed = self.map.remove(&coord);
        debug_assert_eq!(removed, Some(slot), "map out of sync at level {}", self.index);
        slot
    }
}
