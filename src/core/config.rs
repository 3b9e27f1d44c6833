//! Chunker configuration.
//!
//! Supplied once at construction and owned by the chunker. Distances are
//! measured in level-0 tiles.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::types::{Result, Vec3};
use crate::math::grid::{padded_radius, MAX_GRID_RADIUS};

/// Strategy used by the visibility pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CullingMode {
    /// Test every active chunk independently, in parallel.
    #[default]
    Flat,
    /// Walk each hierarchy top-down, skipping children of invisible parents.
    Hierarchical,
}

/// Configuration for the chunker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// World extent in level-0 tiles, centered on the grid origin
    pub grid_size: [u32; 2],
    /// World size of one level-0 tile (y is the fixed vertical extent)
    pub tile_size: Vec3,
    /// World position of the grid origin
    pub origin: Vec3,
    /// Radius used for visibility decisions
    pub view_distance: u32,
    /// Extra margin added to the view distance for loading
    pub buffer_distance: u32,
    /// Chunks per parent axis
    pub branching_factor: u32,
    /// Explicit number of hierarchy levels (derived from the loading distance when unset)
    pub levels: Option<u32>,
    /// Multiplier applied to each level's offset count when sizing the pool
    pub pool_headroom: f32,
    /// Squared camera movement that triggers a visibility pass
    pub position_tolerance: f32,
    /// Camera rotation (degrees) that triggers a visibility pass
    pub rotation_tolerance_degrees: f32,
    /// Visibility pass strategy
    pub culling: CullingMode,
    /// Minimum number of items per parallel work split
    pub batch_size: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            grid_size: [1000, 1000],
            tile_size: Vec3::new(10.0, 1.0, 10.0),
            origin: Vec3::ZERO,
            view_distance: 100,
            buffer_distance: 1,
            branching_factor: 4,
            levels: None,
            pool_headroom: 1.25,
            position_tolerance: 0.01,
            rotation_tolerance_degrees: 0.01,
            culling: CullingMode::Flat,
            batch_size: 64,
        }
    }
}

impl ChunkerConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check that every field is within its usable range
    pub fn validate(&self) -> Result<()> {
        if self.grid_size[0] == 0 || self.grid_size[1] == 0 {
            return Err(Error::Config(format!(
                "grid size must be non-zero, got {:?}",
                self.grid_size
            )));
        }
        if !self.tile_size.is_finite() || self.tile_size.min_element() <= 0.0 {
            return Err(Error::Config(format!(
                "tile size must be positive and finite, got {}",
                self.tile_size
            )));
        }
        if !self.origin.is_finite() {
            return Err(Error::Config("origin must be finite".into()));
        }
        if self.view_distance == 0 {
            return Err(Error::Config("view distance must be at least 1".into()));
        }
        // Level 0 has the widest offset window
        let fits = self
            .view_distance
            .checked_add(self.buffer_distance)
            .is_some_and(|loading| padded_radius(loading, 1) <= MAX_GRID_RADIUS);
        if !fits {
            return Err(Error::Config(format!(
                "view distance {} + buffer {} exceeds {} tiles",
                self.view_distance,
                self.buffer_distance,
                MAX_GRID_RADIUS - 1
            )));
        }
        if self.branching_factor < 2 {
            return Err(Error::Config(format!(
                "branching factor must be at least 2, got {}",
                self.branching_factor
            )));
        }
        // Coarsest scale must fit an i32 grid coordinate
        let max_levels = (i32::MAX as f64).log(self.branching_factor as f64).floor() as usize + 1;
        if self.levels == Some(0) || self.level_count() > max_levels {
            return Err(Error::Config(format!(
                "level count must be in 1..={}, got {}",
                max_levels,
                self.level_count()
            )));
        }
        if !(self.pool_headroom > 0.0 && self.pool_headroom.is_finite()) {
            return Err(Error::Config(format!(
                "pool headroom must be positive, got {}",
                self.pool_headroom
            )));
        }
        if !(self.position_tolerance >= 0.0 && self.rotation_tolerance_degrees >= 0.0) {
            return Err(Error::Config("tolerances must be non-negative".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch size must be at least 1".into()));
        }
        Ok(())
    }

    /// View distance plus buffer: the radius used for loading and unloading
    pub fn loading_distance(&self) -> u32 {
        self.view_distance.saturating_add(self.buffer_distance)
    }

    /// Number of hierarchy levels.
    ///
    /// Defaults to `ceil(log_b(loading_distance))`, never fewer than one.
    pub fn level_count(&self) -> usize {
        if let Some(levels) = self.levels {
            return levels as usize;
        }
        let loading = self.loading_distance() as u64;
        let branching = self.branching_factor as u64;
        let mut levels = 0;
        let mut reach = 1u64;
        while reach < loading {
            reach *= branching;
            levels += 1;
        }
        levels.max(1)
    }

    /// Grid scale of a level: `branching_factor^level`
    pub fn scale(&self, level: usize) -> i32 {
        (self.branching_factor as i32).pow(level as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ChunkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.loading_distance(), 101);
        // 4^3 = 64 < 101 <= 256 = 4^4
        assert_eq!(config.level_count(), 4);
    }

    #[test]
    fn test_level_count() {
        let mut config = ChunkerConfig {
            view_distance: 5,
            buffer_distance: 1,
            ..Default::default()
        };
        assert_eq!(config.level_count(), 2);

        config.view_distance = 3;
        assert_eq!(config.level_count(), 1); // loading distance 4 == 4^1

        config.view_distance = 1;
        config.buffer_distance = 0;
        assert_eq!(config.level_count(), 1); // clamped

        config.levels = Some(3);
        assert_eq!(config.level_count(), 3);
    }

    #[test]
    fn test_scale() {
        let config = ChunkerConfig::default();
        assert_eq!(config.scale(0), 1);
        assert_eq!(config.scale(1), 4);
        assert_eq!(config.scale(3), 64);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            ChunkerConfig { grid_size: [0, 10], ..Default::default() },
            ChunkerConfig { tile_size: Vec3::new(10.0, 0.0, 10.0), ..Default::default() },
            ChunkerConfig { view_distance: 0, ..Default::default() },
            ChunkerConfig { branching_factor: 1, ..Default::default() },
            ChunkerConfig { levels: Some(0), ..Default::default() },
            ChunkerConfig { pool_headroom: 0.0, ..Default::default() },
            ChunkerConfig { position_tolerance: -1.0, ..Default::default() },
            ChunkerConfig { batch_size: 0, ..Default::default() },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(Error::Config(_))),
                "should reject {:?}",
                config
            );
        }
    }

    #[test]
    fn test_validate_rejects_oversized_distances() {
        let too_far = [
            ChunkerConfig { view_distance: u32::MAX, ..Default::default() },
            ChunkerConfig { view_distance: 1, buffer_distance: u32::MAX, ..Default::default() },
            ChunkerConfig { view_distance: MAX_GRID_RADIUS as u32, buffer_distance: 0, ..Default::default() },
        ];
        for config in too_far {
            assert!(matches!(config.validate(), Err(Error::Config(_))));
        }

        let widest = ChunkerConfig {
            view_distance: MAX_GRID_RADIUS as u32 - 2,
            buffer_distance: 1,
            ..Default::default()
        };
        assert!(widest.validate().is_ok());

        assert!(matches!(
            ChunkerConfig::from_json_str(r#"{ "view_distance": 4294967295 }"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_json_uses_defaults() {
        let config = ChunkerConfig::from_json_str(
            r#"{ "view_distance": 5, "culling": "hierarchical" }"#,
        )
        .unwrap();
        assert_eq!(config.view_distance, 5);
        assert_eq!(config.culling, CullingMode::Hierarchical);
        assert_eq!(config.branching_factor, 4);
        assert_eq!(config.tile_size, Vec3::new(10.0, 1.0, 10.0));
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(matches!(
            ChunkerConfig::from_json_str(r#"{ "branching_factor": 1 }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            ChunkerConfig::from_json_str("not json"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chunker.json");

        let config = ChunkerConfig {
            grid_size: [100, 100],
            view_distance: 5,
            levels: Some(2),
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = ChunkerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ChunkerConfig::load(&dir.path().join("missing.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
