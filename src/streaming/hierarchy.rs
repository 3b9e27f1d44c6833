//! Hierarchy Builder - parent/child links between adjacent levels.
//!
//! A chunk at level L with coordinate `c` has its parent at level L+1 with
//! coordinate `floor(c / branching_factor)`. Links are stored on both sides
//! and must stay symmetric after every streaming update.

use crate::core::error::Error;
use crate::core::types::Result;
use crate::math::GridCoord;
use crate::streaming::pool::{ChunkPool, SlotIndex};

/// Coordinate of the parent cell one level up
pub fn parent_coord(coord: GridCoord, branching_factor: i32) -> GridCoord {
    coord.div_floor(branching_factor)
}

/// Coordinates of the `b * b` child cells one level down
pub fn child_coords(coord: GridCoord, branching_factor: i32) -> impl Iterator<Item = GridCoord> {
    let base = GridCoord::new(coord.x * branching_factor, coord.y * branching_factor);
    (0..branching_factor)
        .flat_map(move |dy| (0..branching_factor).map(move |dx| base + GridCoord::new(dx, dy)))
}

/// Link `child` under `parent`.
///
/// Fails if the child already has a parent; a chunk has at most one.
pub fn link(pool: &mut ChunkPool, child: SlotIndex, parent: SlotIndex) -> Result<()> {
    let child_chunk = pool.get(child);
    if let Some(existing) = child_chunk.parent {
        return Err(Error::Hierarchy(format!(
            "slot {} at {} already has parent {}, cannot link to {}",
            child, child_chunk.coord, existing, parent
        )));
    }
    debug_assert_eq!(
        child_chunk.level.map(|l| l + 1),
        pool.get(parent).level,
        "parent must be exactly one level above child"
    );

    pool.get_mut(child).parent = Some(parent);
    pool.get_mut(parent).children.push(child);
    Ok(())
}

/// Remove every link touching `slot`: from its parent's child list, and the
/// parent pointer of each of its children.
///
/// Idempotent; a chunk with no links is left unchanged.
pub fn detach(pool: &mut ChunkPool, slot: SlotIndex) {
    if let Some(parent) = pool.get_mut(slot).parent.take() {
        let siblings = &mut pool.get_mut(parent).children;
        if let Some(position) = siblings.iter().position(|&c| c == slot) {
            siblings.swap_remove(position);
        }
    }

    let children = std::mem::take(&mut pool.get_mut(slot).children);
    for &child in &children {
        let orphan = pool.get_mut(child);
        debug_assert_eq!(orphan.parent, Some(slot));
        orphan.parent = None;
    }

    // Hand the emptied allocation back to the record
    let mut children = children;
    children.clear();
    pool.get_mut(slot).children = children;
}

/// Verify that every parent/child link is mirrored on the other side
pub fn check_symmetry(pool: &ChunkPool) -> Result<()> {
    for (index, chunk) in pool.chunks().iter().enumerate() {
        let slot = SlotIndex(index as u32);
        if let Some(parent) = chunk.parent {
            if !pool.get(parent).children.contains(&slot) {
                return Err(Error::Hierarchy(format!(
                    "slot {} points to parent {} which does not list it",
                    slot, parent
                )));
            }
        }
        for &child in &chunk.children {
            if pool.get(child).parent != Some(slot) {
                return Err(Error::Hierarchy(format!(
                    "slot {} lists child {} whose parent is {:?}",
                    slot, child, pool.get(child).parent
                )));
            }
        }
    }
    Ok(())
}
