//! Core types: errors, logging, configuration, camera

pub mod types;
pub mod error;
pub mod logging;
pub mod config;
pub mod camera;

pub use types::*;
pub use error::Error;
pub use config::{ChunkerConfig, CullingMode};
pub use camera::{Camera, CameraPose};
