//! Engine data structures: geometry, textures and instances.
//!
//! - `geometry` holds vertex layouts, flat vertex streams and the procedural shapes
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `instance` holds per-object transformation data

pub mod geometry;
pub mod instance;
pub mod texture;
