//! Nutrition history import: reads exports from other tracking apps (or our own
//! backups), normalizes them into days of eating and commits them to the food log.

pub mod config;
pub mod error;
pub mod import;
pub mod logging;
pub mod nutrition;
pub mod state;
pub mod storage;

pub use error::{PipelineError, Result};
