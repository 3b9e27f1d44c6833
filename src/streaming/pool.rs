//! Chunk Pool - fixed-capacity arena of chunk records.
//!
//! Every chunk is allocated once at construction. Slots move between a
//! level's free list and that level's active set; nothing is ever freed
//! until the pool itself is dropped.
//!
//! Each hierarchy level owns a disjoint, contiguous slice of slot indices
//! with its own free stack, so capacity pressure at one level never starves
//! another.

use std::ops::Range;

use crate::math::{Aabb, GridCoord};

/// Index of a chunk record in the pool. The only "pointer" between chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(pub(crate) u32);

impl SlotIndex {
    /// Position of the slot in the pool's chunk array
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One pooled chunk record
#[derive(Clone, Debug, Default)]
pub struct Chunk {
    /// Grid coordinate at the owning level
    pub coord: GridCoord,
    /// World-space bounds
    pub bounds: Aabb,
    /// Result of the last visibility pass
    pub visible: bool,
    /// Owning level, or `None` while the slot is free
    pub level: Option<u8>,
    /// Parent slot one level up
    pub parent: Option<SlotIndex>,
    /// Child slots one level down
    pub children: Vec<SlotIndex>,
}

impl Chunk {
    fn with_child_capacity(capacity: usize) -> Self {
        Self {
            children: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    /// Whether the slot currently belongs to a level
    pub fn is_active(&self) -> bool {
        self.level.is_some()
    }

    /// Reset to the empty state, keeping the children allocation
    fn clear(&mut self) {
        self.coord = GridCoord::ZERO;
        self.bounds = Aabb::default();
        self.visible = false;
        self.level = None;
        self.parent = None;
        self.children.clear();
    }
}

/// Fixed-capacity chunk arena with per-level free lists
pub struct ChunkPool {
    chunks: Vec<Chunk>,
    /// Reserved slot range per level
    slices: Vec<Range<u32>>,
    /// Free slot stack per level
    free: Vec<Vec<SlotIndex>>,
}

impl ChunkPool {
    /// Create a pool reserving `slice_sizes[level]` slots for each level.
    ///
    /// `child_capacity` pre-sizes each record's child list.
    pub fn new(slice_sizes: &[usize], child_capacity: usize) -> Self {
        let capacity: usize = slice_sizes.iter().sum();
        let mut chunks = Vec::with_capacity(capacity);
        chunks.resize_with(capacity, || Chunk::with_child_capacity(child_capacity));

        let mut slices = Vec::with_capacity(slice_sizes.len());
        let mut free = Vec::with_capacity(slice_sizes.len());
        let mut start = 0u32;
        for &size in slice_sizes {
            let end = start + size as u32;
            // Reversed so the lowest index is handed out first
            free.push((start..end).rev().map(SlotIndex).collect());
            slices.push(start..end);
            start = end;
        }

        Self { chunks, slices, free }
    }

    /// Take a free slot from a level's slice.
    ///
    /// Returns `None` when the slice is exhausted; callers defer, they do not fail.
    pub fn acquire(&mut self, level: usize) -> Option<SlotIndex> {
        let slot = self.free[level].pop()?;
        self.chunks[slot.index()].level = Some(level as u8);
        Some(slot)
    }

    /// Return a slot to its level's free list, clearing its contents.
    ///
    /// Hierarchy links must already be detached; release only clears this side.
    pub fn release(&mut self, slot: SlotIndex) {
        let chunk = &mut self.chunks[slot.index()];
        let level = chunk.level.take();
        debug_assert!(level.is_some(), "double release of slot {}", slot);
        chunk.clear();

        let level = self.level_of_slot(slot);
        self.free[level].push(slot);
    }

    pub fn get(&self, slot: SlotIndex) -> &Chunk {
        &self.chunks[slot.index()]
    }

    pub fn get_mut(&mut self, slot: SlotIndex) -> &mut Chunk {
        &mut self.chunks[slot.index()]
    }

    /// All chunk records, free or active
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Mutable access to all records (visibility pass)
    pub(crate) fn chunks_mut(&mut self) -> &mut [Chunk] {
        &mut self.chunks
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.chunks.len()
    }

    /// Slot range reserved for a level
    pub fn slice(&self, level: usize) -> Range<u32> {
        self.slices[level].clone()
    }

    /// Free slots remaining in a level's slice
    pub fn free_count_at(&self, level: usize) -> usize {
        self.free[level].len()
    }

    /// Free slots across all levels
    pub fn free_count(&self) -> usize {
        self.free.iter().map(Vec::len).sum()
    }

    /// Iterate all free slots
    pub fn free_slots(&self) -> impl Iterator<Item = SlotIndex> + '_ {
        self.free.iter().flatten().copied()
    }

    fn level_of_slot(&self, slot: SlotIndex) -> usize {
        // Slices are sorted and contiguous
        self.slices.partition_point(|range| range.end <= slot.0)
    }
}
