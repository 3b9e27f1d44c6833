//! Headless streaming simulation.
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   Load a JSON chunker configuration (flags below override it)
//!   --view <TILES>    View distance in level-0 tiles (default: 100)
//!   --buffer <TILES>  Buffer distance added for loading (default: 1)
//!   --branch <N>      Branching factor (default: 4)
//!   --steps <N>       Number of simulated frames (default: 600)
//!   --speed <M>       Observer speed in world units per frame (default: 4.0)
//!   --hierarchical    Use hierarchical culling instead of flat

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use tilestream::core::logging;
use tilestream::core::types::{Result, Vec3};
use tilestream::feature::{ChunkFeature, FeatureKind, FeatureRegistry};
use tilestream::math::GridCoord;
use tilestream::streaming::{Chunk, SlotIndex};
use tilestream::{Camera, Chunker, ChunkerConfig, CullingMode};

/// Counts chunk loads and unloads the way a tile instantiator would see them
#[derive(Default)]
struct LoadCounter {
    loaded: usize,
    unloaded: usize,
}

impl ChunkFeature for LoadCounter {
    fn on_chunk_added(&mut self, _level: usize, _slot: SlotIndex, _chunk: &Chunk) {
        self.loaded += 1;
    }

    fn on_chunk_removed(&mut self, _level: usize, _coord: GridCoord) {
        self.unloaded += 1;
    }

    fn on_frame(&mut self, chunker: &Chunker) {
        if chunker.frame() % 100 == 0 {
            log::info!(
                "Frame {}: {} loads, {} unloads so far",
                chunker.frame(),
                self.loaded,
                self.unloaded
            );
        }
    }
}

fn main() {
    logging::init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    let mut config = match parse_arg::<PathBuf>(&args, "--config") {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            ChunkerConfig::load(&path)?
        }
        None => ChunkerConfig::default(),
    };
    if let Some(view) = parse_arg(&args, "--view") {
        config.view_distance = view;
    }
    if let Some(buffer) = parse_arg(&args, "--buffer") {
        config.buffer_distance = buffer;
    }
    if let Some(branch) = parse_arg(&args, "--branch") {
        config.branching_factor = branch;
    }
    if args.iter().any(|a| a == "--hierarchical") {
        config.culling = CullingMode::Hierarchical;
    }
    let steps: u32 = parse_arg(&args, "--steps").unwrap_or(600);
    let speed: f32 = parse_arg(&args, "--speed").unwrap_or(4.0);

    let mut chunker = Chunker::new(config)?;
    let mut features = FeatureRegistry::new();
    features.register(FeatureKind::Terrain, Box::new(LoadCounter::default()))?;

    log::info!(
        "Simulating {} frames, {} levels, pool capacity {}",
        steps,
        chunker.level_count(),
        chunker.pool_capacity()
    );

    let mut camera = Camera::default();
    camera.far = chunker.config().view_distance as f32 * chunker.config().tile_size.x * 2.0;

    let start = Instant::now();
    let mut streaming_frames = 0;
    let mut culling_frames = 0;
    let mut deferred = 0;

    for step in 0..steps {
        // Slow circle with a heading that follows the path
        let t = step as f32 * speed / 500.0;
        let observer = Vec3::new(t.cos() * 500.0, 0.0, t.sin() * 500.0);
        let heading = Vec3::new(-t.sin(), 0.0, t.cos());

        camera.position = observer + Vec3::Y * 20.0;
        camera.set_look_at(camera.position + heading * 100.0 - Vec3::Y * 10.0, Vec3::Y);

        let stats = chunker.update(observer, &camera)?;
        features.dispatch(&chunker);

        if let Some(streaming) = &stats.streaming {
            streaming_frames += 1;
            deferred += streaming.deferred;
            log::debug!(
                "Frame {}: observer {} +{} -{} active {}",
                stats.frame,
                streaming.observer,
                streaming.added,
                streaming.removed,
                streaming.active
            );
        }
        if stats.culling.is_some() {
            culling_frames += 1;
        }
    }

    chunker.check_invariants()?;

    let elapsed = start.elapsed();
    let visible: usize = (0..chunker.level_count())
        .map(|level| chunker.visible_instances(level).len())
        .sum();

    log::info!(
        "Done in {:.2?} ({:.3} ms/frame): {} streaming updates, {} culling passes, {} deferred",
        elapsed,
        elapsed.as_secs_f64() * 1000.0 / steps.max(1) as f64,
        streaming_frames,
        culling_frames,
        deferred
    );
    for level in 0..chunker.level_count() {
        log::info!(
            "  Level {}: {} active, {} visible",
            level,
            chunker.active_count(level),
            chunker.visible_instances(level).len()
        );
    }
    log::info!("Visible chunks: {}, free slots: {}", visible, chunker.free_slots());

    Ok(())
}

fn parse_arg<T: FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}
