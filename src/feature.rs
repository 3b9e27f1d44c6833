//! Per-chunk features driven by streaming changes.
//!
//! Collaborators that attach behaviour to tiles (terrain meshes, grass, wind
//! fields, interaction volumes) register a handler per feature kind at
//! startup. Each frame the registry forwards the chunker's delta to every
//! handler in registration order.

use crate::core::error::Error;
use crate::core::types::Result;
use crate::math::GridCoord;
use crate::streaming::chunker::Chunker;
use crate::streaming::pool::{Chunk, SlotIndex};

/// Kind of per-chunk feature. At most one handler per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Terrain,
    Grass,
    Wind,
    Interaction,
    Custom(&'static str),
}

/// Handler notified of chunk activation and removal.
pub trait ChunkFeature: Send {
    /// A chunk became active at `level`
    fn on_chunk_added(&mut self, _level: usize, _slot: SlotIndex, _chunk: &Chunk) {}

    /// The chunk at `coord` on `level` was unloaded; its slot may already be reused
    fn on_chunk_removed(&mut self, _level: usize, _coord: GridCoord) {}

    /// Called once per dispatch after all add/remove notifications
    fn on_frame(&mut self, _chunker: &Chunker) {}
}

/// Table of feature handlers keyed by kind
#[derive(Default)]
pub struct FeatureRegistry {
    features: Vec<(FeatureKind, Box<dyn ChunkFeature>)>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Fails if the kind already has one.
    pub fn register(&mut self, kind: FeatureKind, feature: Box<dyn ChunkFeature>) -> Result<()> {
        if self.contains(kind) {
            return Err(Error::Feature(format!("{:?} is already registered", kind)));
        }
        log::debug!("Registered chunk feature {:?}", kind);
        self.features.push((kind, feature));
        Ok(())
    }

    /// Remove and return the handler for a kind
    pub fn unregister(&mut self, kind: FeatureKind) -> Option<Box<dyn ChunkFeature>> {
        let position = self.features.iter().position(|(k, _)| *k == kind)?;
        Some(self.features.remove(position).1)
    }

    pub fn contains(&self, kind: FeatureKind) -> bool {
        self.features.iter().any(|(k, _)| *k == kind)
    }

    /// Registered kinds in registration order
    pub fn kinds(&self) -> impl Iterator<Item = FeatureKind> + '_ {
        self.features.iter().map(|(kind, _)| *kind)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Forward the chunker's latest delta to every handler: removals first,
    /// then additions, then the frame hook.
    pub fn dispatch(&mut self, chunker: &Chunker) {
        let delta = chunker.delta();
        for (_, feature) in &mut self.features {
            for (level, changes) in delta.levels.iter().enumerate() {
                for &coord in &changes.removed {
                    feature.on_chunk_removed(level, coord);
                }
            }
            for (level, changes) in delta.levels.iter().enumerate() {
                for &slot in &changes.added {
                    feature.on_chunk_added(level, slot, chunker.chunk(slot));
                }
            }
            feature.on_frame(chunker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::camera::Camera;
    use crate::core::config::ChunkerConfig;
    use crate::core::types::Vec3;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Tracked {
        loaded: HashSet<(usize, GridCoord)>,
        frames: usize,
    }

    struct Tracker(Arc<Mutex<Tracked>>);

    impl ChunkFeature for Tracker {
        fn on_chunk_added(&mut self, level: usize, _slot: SlotIndex, chunk: &Chunk) {
            let inserted = self.0.lock().unwrap().loaded.insert((level, chunk.coord));
            assert!(inserted);
        }

        fn on_chunk_removed(&mut self, level: usize, coord: GridCoord) {
            let removed = self.0.lock().unwrap().loaded.remove(&(level, coord));
            assert!(removed);
        }

        fn on_frame(&mut self, _chunker: &Chunker) {
            self.0.lock().unwrap().frames += 1;
        }
    }

    struct Noop;
    impl ChunkFeature for Noop {}

    fn chunker() -> Chunker {
        Chunker::new(ChunkerConfig {
            grid_size: [100, 100],
            view_distance: 5,
            buffer_distance: 1,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = FeatureRegistry::new();
        registry.register(FeatureKind::Grass, Box::new(Noop)).unwrap();
        registry.register(FeatureKind::Custom("rocks"), Box::new(Noop)).unwrap();

        let result = registry.register(FeatureKind::Grass, Box::new(Noop));
        assert!(matches!(result, Err(Error::Feature(_))));
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.kinds().collect::<Vec<_>>(),
            vec![FeatureKind::Grass, FeatureKind::Custom("rocks")]
        );
    }

    #[test]
    fn test_unregister() {
        let mut registry = FeatureRegistry::new();
        registry.register(FeatureKind::Wind, Box::new(Noop)).unwrap();
        assert!(registry.unregister(FeatureKind::Wind).is_some());
        assert!(registry.unregister(FeatureKind::Wind).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_dispatch_mirrors_active_set() {
        let state = Arc::new(Mutex::new(Tracked::default()));
        let mut registry = FeatureRegistry::new();
        registry
            .register(FeatureKind::Terrain, Box::new(Tracker(Arc::clone(&state))))
            .unwrap();

        let mut chunker = chunker();
        let camera = Camera::default();
        for x in [0.0, 15.0, 15.0, 80.0, -40.0] {
            chunker.update(Vec3::new(x, 0.0, x * 0.5), &camera).unwrap();
            registry.dispatch(&chunker);
        }

        let active: HashSet<(usize, GridCoord)> = (0..chunker.level_count())
            .flat_map(|level| {
                chunker
                    .active_slots(level)
                    .iter()
                    .map(|&slot| (level, chunker.chunk(slot).coord))
                    .collect::<Vec<_>>()
            })
            .collect();

        let state = state.lock().unwrap();
        assert_eq!(state.loaded, active);
        assert_eq!(state.frames, 5);
    }
}
