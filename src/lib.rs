//! shadowbox
//!
//! A small real-time scene renderer built on wgpu and winit. It draws a floor
//! of crates, a spinning obelisk, a water plane and a skybox, lit by a single
//! light with a shadow map, and lets a free-fly camera move through it.
//!
//! High-level modules
//! - `app`: window, startup, frame loop and teardown
//! - `camera`: free-fly camera, projection and input controller
//! - `config`: scene constants and environment overrides
//! - `context`: window surface, device and queue
//! - `data_structures`: vertex layouts, procedural geometry, textures, transforms
//! - `light`: the scene light and its shadow projection
//! - `link`: techniques, drawables and the linkage registry
//! - `pipelines`: bind group layouts and per-technique render pipelines
//! - `render`: frame plan and the two pass renderer
//! - `resources`: asset loading, GPU resource stores and the resource ledger
//! - `scene`: the declared scene and its animated objects
//! - `time`: frame pacing
//!

pub mod app;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod light;
pub mod link;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod time;

pub use config::Config;
