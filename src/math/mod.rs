//! Mathematical utilities: bounds, frustum planes, grid geometry

pub mod aabb;
pub mod frustum;
pub mod grid;

pub use aabb::Aabb;
pub use frustum::{Plane, Frustum};
pub use grid::{GridBounds, GridCoord};
