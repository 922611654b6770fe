//! Utility module with helper functions
//!
//! This module provides:
//! - Configuration handling
//! - Run directory layout
//! - Checkpoint save/load utilities
//! - Logging setup
//! - Sample grid export

pub mod checkpoint;
pub mod config;
pub mod logging;
pub mod run_dir;
pub mod visualize;

pub use checkpoint::{checkpoint_paths, save_checkpoint, CheckpointMeta};
pub use config::{Config, Variant};
pub use logging::setup_logging;
pub use run_dir::RunDirectory;
pub use visualize::{make_grid, save_grid};
