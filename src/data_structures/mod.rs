//! Engine data structures: transforms, meshes, scenes, and textures.
//!
//! - `transform` holds the transform arena and its world matrices
//! - `mesh` holds vertices, named mesh ranges, and mesh buffers
//! - `scene` holds drawables, cameras, lights, and the colour table
//! - `texture` contains the GPU texture wrapper and creation utilities

pub mod mesh;
pub mod scene;
pub mod texture;
pub mod transform;
