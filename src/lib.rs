//! roll-ngin
//!
//! A small game runtime built around one game: a sphere rolling through a
//! level of meshes, picking up deliveries on the way to a goal. The crate
//! loads binary scene and mesh files, keeps a transform hierarchy, resolves
//! swept-sphere collisions against the level geometry, and renders through a
//! two-target first pass followed by a bloom post-processing chain on wgpu.
//!
//! High-level modules
//! - `collide`: swept-sphere vs triangle tests and the collide-and-slide loop
//! - `config`: tunables for physics, rendering and level naming conventions
//! - `context`: GPU device/queue plus the optional window surface
//! - `data_structures`: transforms, meshes, scenes and textures
//! - `flow`: the application event loop and the `GameMode` trait
//! - `pipelines`: shader reflection and the first-pass / post-processing pipelines
//! - `render`: render targets, the post pass plan and the frame renderer
//! - `resources`: binary chunk files and the shared asset registry
//! - `roll`: the game itself
//!

pub mod collide;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod roll;
