// THEORY:
// This file is the main entry point for the `meisencam` library crate.
// It follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (the `meisencam` binary, or an
// external scheduler embedding the pipeline directly).
//
// The primary goal is to export the `CyclePipeline` and its associated data
// structures (`AppConfig`, `CycleReport`, the `Camera` capability) as the clean,
// high-level interface for one capture-compare-upload cycle. The individual
// components (`motion`, `upload`, `activity`) are public as well, since each is
// independently useful: the motion scorer in particular has no dependency on
// any camera hardware and can be driven against arbitrary image files.

pub mod activity;
pub mod camera;
pub mod config;
pub mod error;
pub mod motion;
pub mod pipeline;
pub mod upload;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use pipeline::{CyclePipeline, CycleReport};
