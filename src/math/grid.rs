//! Grid coordinate geometry.
//!
//! A coordinate at level L addresses a cell of world size `tile_size * scale(L)`
//! on the horizontal (x, z) plane. Grid `y` maps to world `z`.

use std::ops::{Add, Sub};

use crate::core::types::Vec3;
use crate::math::Aabb;

/// Largest padded radius whose offset window fits the grid arithmetic
pub const MAX_GRID_RADIUS: i32 = 23170;

/// Integer coordinate identifying a cell in a level's grid
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
}

impl GridCoord {
    pub const ZERO: Self = Self { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Convert a world position to the grid coordinate containing it
    pub fn from_world(world: Vec3, origin: Vec3, tile_size: Vec3, scale: i32) -> Self {
        let cell_x = tile_size.x * scale as f32;
        let cell_z = tile_size.z * scale as f32;
        Self {
            x: ((world.x - origin.x) / cell_x).floor() as i32,
            y: ((world.z - origin.z) / cell_z).floor() as i32,
        }
    }

    /// Floor division of both components (coordinate of the containing coarser cell)
    pub fn div_floor(self, divisor: i32) -> Self {
        Self {
            x: self.x.div_euclid(divisor),
            y: self.y.div_euclid(divisor),
        }
    }

    /// Squared distance from the corner this offset is relative to, to the
    /// offset cell's center, scaled by 4 so it stays integral.
    pub fn biased_distance_sq4(self) -> i64 {
        let x = 2 * self.x as i64 + 1;
        let y = 2 * self.y as i64 + 1;
        x * x + y * y
    }

    /// Squared Euclidean length of this relative offset
    pub fn length_sq(self) -> i64 {
        let x = self.x as i64;
        let y = self.y as i64;
        x * x + y * y
    }

    /// Whether this relative offset lies within a padded grid radius.
    ///
    /// Offsets are biased by half a cell so the test approximates the cell's
    /// footprint: `(dx + 0.5)^2 + (dy + 0.5)^2 <= radius^2`.
    pub fn within_radius(self, radius: i32) -> bool {
        let r = radius as i64;
        self.biased_distance_sq4() <= 4 * r * r
    }

    /// World bounds of this cell at the given scale
    pub fn world_bounds(self, origin: Vec3, tile_size: Vec3, scale: i32) -> Aabb {
        let s = scale as f32;
        let center = Vec3::new(
            (self.x as f32 + 0.5) * tile_size.x * s + origin.x,
            origin.y,
            (self.y as f32 + 0.5) * tile_size.z * s + origin.z,
        );
        let half_extent = Vec3::new(tile_size.x * s, tile_size.y, tile_size.z * s) * 0.5;
        Aabb::from_center_half_extent(center, half_extent)
    }
}

// Saturating: an observer far outside the world must not wrap into it

impl Add for GridCoord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_add(rhs.x), self.y.saturating_add(rhs.y))
    }
}

impl Sub for GridCoord {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x.saturating_sub(rhs.x), self.y.saturating_sub(rhs.y))
    }
}

impl std::fmt::Display for GridCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Half-open rectangle of valid coordinates at one level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridBounds {
    pub min: GridCoord,
    pub max: GridCoord,
}

impl GridBounds {
    /// Level-0 bounds of a world `grid_size` tiles wide, centered on the origin
    pub fn centered(grid_size: [u32; 2]) -> Self {
        let half_x = (grid_size[0] / 2) as i32;
        let half_y = (grid_size[1] / 2) as i32;
        Self {
            min: GridCoord::new(-half_x, -half_y),
            max: GridCoord::new(half_x, half_y),
        }
    }

    /// Bounds of the coarser cells at `scale` that overlap these bounds
    pub fn coarsen(&self, scale: i32) -> Self {
        Self {
            min: self.min.div_floor(scale),
            max: GridCoord::new(
                -(-self.max.x).div_euclid(scale),
                -(-self.max.y).div_euclid(scale),
            ),
        }
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.x >= self.min.x && coord.x < self.max.x
            && coord.y >= self.min.y && coord.y < self.max.y
    }
}

/// Padded grid radius of a level: `ceil(distance / scale) + 1`.
///
/// The extra cell avoids gaps when the observer moves between cell boundaries.
pub fn padded_radius(distance: u32, scale: i32) -> i32 {
    view_radius(distance, scale).saturating_add(1)
}

/// Unpadded grid radius of a level: `ceil(distance / scale)`.
pub fn view_radius(distance: u32, scale: i32) -> i32 {
    let cells = distance.div_ceil(scale.max(1) as u32);
    i32::try_from(cells).unwrap_or(i32::MAX)
}

/// Relative offsets covering a circular loading radius at the given scale,
/// sorted nearest-first.
///
/// The padded radius should not exceed [`MAX_GRID_RADIUS`]; configuration
/// validation enforces this.
pub fn circular_offsets(distance: u32, scale: i32) -> Vec<GridCoord> {
    let radius = padded_radius(distance, scale);
    let side = 2 * radius as usize + 1;
    let mut offsets = Vec::with_capacity(side * side);

    for y in -radius..=radius {
        for x in -radius..=radius {
            let offset = GridCoord::new(x, y);
            if offset.within_radius(radius) {
                offsets.push(offset);
            }
        }
    }

    // Stable sort keeps raster order between equidistant offsets
    offsets.sort_by_key(|offset| offset.biased_distance_sq4());
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_world() {
        let tile = Vec3::new(10.0, 1.0, 10.0);
        assert_eq!(GridCoord::from_world(Vec3::ZERO, Vec3::ZERO, tile, 1), GridCoord::ZERO);
        assert_eq!(GridCoord::from_world(Vec3::new(15.0, 99.0, 25.0), Vec3::ZERO, tile, 1), GridCoord::new(1, 2));
        assert_eq!(GridCoord::from_world(Vec3::new(-0.1, 0.0, -10.1), Vec3::ZERO, tile, 1), GridCoord::new(-1, -2));
        assert_eq!(GridCoord::from_world(Vec3::new(45.0, 0.0, 0.0), Vec3::ZERO, tile, 4), GridCoord::new(1, 0));

        let origin = Vec3::new(100.0, 0.0, 100.0);
        assert_eq!(GridCoord::from_world(Vec3::new(95.0, 0.0, 105.0), origin, tile, 1), GridCoord::new(-1, 0));
    }

    #[test]
    fn test_div_floor() {
        assert_eq!(GridCoord::new(3, 3).div_floor(4), GridCoord::ZERO);
        assert_eq!(GridCoord::new(4, 7).div_floor(4), GridCoord::new(1, 1));
        assert_eq!(GridCoord::new(-1, -4).div_floor(4), GridCoord::new(-1, -1));
        assert_eq!(GridCoord::new(-5, 0).div_floor(4), GridCoord::new(-2, 0));
    }

    #[test]
    fn test_padded_radius() {
        assert_eq!(padded_radius(6, 1), 7);
        assert_eq!(padded_radius(6, 4), 3); // ceil(1.5) + 1
        assert_eq!(padded_radius(8, 4), 3); // ceil(2.0) + 1
        assert_eq!(padded_radius(101, 64), 3);
    }

    #[test]
    fn test_view_radius_is_unpadded() {
        assert_eq!(view_radius(5, 1), 5);
        assert_eq!(view_radius(5, 4), 2);
        assert_eq!(view_radius(8, 4), 2);
        assert_eq!(view_radius(u32::MAX, 1), i32::MAX);
        assert_eq!(padded_radius(u32::MAX, 1), i32::MAX);
    }

    #[test]
    fn test_length_sq() {
        assert_eq!(GridCoord::new(-5, -3).length_sq(), 34);
        assert_eq!(GridCoord::new(i32::MIN, 0).length_sq(), 1 << 62);
    }

    #[test]
    fn test_arithmetic_saturates() {
        let far = GridCoord::new(i32::MAX, i32::MIN);
        assert_eq!(far + GridCoord::new(7, -7), far);
        assert_eq!(GridCoord::new(-5, 5) - far, GridCoord::new(i32::MIN, i32::MAX));
        assert!(!GridBounds::centered([u32::MAX, u32::MAX]).contains(far + GridCoord::new(1, -1)));
    }

    #[test]
    fn test_within_radius_is_biased() {
        // (-7, 0) -> (-6.5, 0.5): 42.5 <= 49
        assert!(GridCoord::new(-7, 0).within_radius(7));
        // (7, 0) -> (7.5, 0.5): 56.5 > 49
        assert!(!GridCoord::new(7, 0).within_radius(7));
        assert!(GridCoord::ZERO.within_radius(1));
        assert!(GridCoord::new(-1, -1).within_radius(1));
        assert!(!GridCoord::new(1, 0).within_radius(1));
    }

    #[test]
    fn test_circular_offsets_sorted_and_unique() {
        let offsets = circular_offsets(6, 1);
        let radius = padded_radius(6, 1);

        assert!(offsets.iter().all(|o| o.within_radius(radius)));
        assert!(offsets.windows(2).all(|w| w[0].biased_distance_sq4() <= w[1].biased_distance_sq4()));

        let mut unique = offsets.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), offsets.len());

        // The four cells around the observer's corner come first
        let mut nearest = offsets[..4].to_vec();
        nearest.sort();
        assert_eq!(nearest, vec![
            GridCoord::new(-1, -1),
            GridCoord::new(0, -1),
            GridCoord::new(-1, 0),
            GridCoord::new(0, 0),
        ]);
    }

    #[test]
    fn test_circular_offsets_complete() {
        // Every offset in the bounding square that passes the test is present
        let offsets = circular_offsets(3, 1);
        let radius = padded_radius(3, 1);
        let expected = (-radius..=radius)
            .flat_map(|y| (-radius..=radius).map(move |x| GridCoord::new(x, y)))
            .filter(|o| o.within_radius(radius))
            .count();
        assert_eq!(offsets.len(), expected);
    }

    #[test]
    fn test_circular_offsets_shrink_with_scale() {
        let fine = circular_offsets(101, 1).len();
        let coarse = circular_offsets(101, 4).len();
        assert!(coarse < fine);
        assert!(fine > 100 * 100 * 3);
    }

    #[test]
    fn test_world_bounds() {
        let tile = Vec3::new(10.0, 1.0, 10.0);
        let bounds = GridCoord::new(1, -1).world_bounds(Vec3::ZERO, tile, 1);
        assert_eq!(bounds.center, Vec3::new(15.0, 0.0, -5.0));
        assert_eq!(bounds.half_extent, Vec3::new(5.0, 0.5, 5.0));

        let coarse = GridCoord::ZERO.world_bounds(Vec3::new(0.0, 2.0, 0.0), tile, 4);
        assert_eq!(coarse.center, Vec3::new(20.0, 2.0, 20.0));
        assert_eq!(coarse.half_extent, Vec3::new(20.0, 0.5, 20.0));
    }

    #[test]
    fn test_parent_bounds_contain_child() {
        let tile = Vec3::new(10.0, 1.0, 10.0);
        let child = GridCoord::new(-3, 5);
        let parent = child.div_floor(4);
        let child_bounds = child.world_bounds(Vec3::ZERO, tile, 1);
        let parent_bounds = parent.world_bounds(Vec3::ZERO, tile, 4);
        assert!(parent_bounds.contains(&child_bounds));
    }

    #[test]
    fn test_grid_bounds() {
        let bounds = GridBounds::centered([100, 100]);
        assert!(bounds.contains(GridCoord::new(-50, -50)));
        assert!(bounds.contains(GridCoord::new(49, 49)));
        assert!(!bounds.contains(GridCoord::new(50, 0)));

        let coarse = bounds.coarsen(4);
        assert_eq!(coarse.min, GridCoord::new(-13, -13));
        assert_eq!(coarse.max, GridCoord::new(13, 13));

        let odd = GridBounds::centered([7, 5]);
        assert_eq!(odd.min, GridCoord::new(-3, -2));
        assert_eq!(odd.max, GridCoord::new(3, 2));
    }
}
