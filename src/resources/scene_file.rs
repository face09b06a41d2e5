//! Binary scene files.
//!
//! A scene file holds, in order, the chunks
//!
//! - `str0`: all names, concatenated bytes
//! - `xfh0`: transform hierarchy in topological order
//! - `msh0`: mesh instances
//! - `cam0`: cameras
//! - `lmp0`: lamps
//!
//! Names are referenced as `[begin, end)` byte ranges into `str0`. Parsing only
//! checks the chunk structure; the cross references are checked when the file
//! is loaded into a [`Scene`](crate::data_structures::scene::Scene).

use std::io::{Read, Write};

use thiserror::Error;

use crate::resources::chunk::{ChunkError, read_chunk, warn_on_trailing, write_chunk};

/// `parent` value of a root transform.
pub const NO_PARENT: u32 = u32::MAX;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error("transform {index} has parent {parent}, which does not precede it")]
    NotTopological { index: usize, parent: usize },
    #[error("{kind} {index} has invalid name range {begin}..{end}")]
    InvalidNameRange {
        kind: &'static str,
        index: usize,
        begin: u32,
        end: u32,
    },
    #[error("{kind} {index} refers to missing transform {transform}")]
    InvalidTransformIndex {
        kind: &'static str,
        index: usize,
        transform: u32,
    },
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct HierarchyEntry {
    pub parent: u32,
    pub name_begin: u32,
    pub name_end: u32,
    pub position: [f32; 3],
    /// Quaternion stored as `x, y, z, w`.
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshEntry {
    pub transform: u32,
    pub name_begin: u32,
    pub name_end: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraEntry {
    pub transform: u32,
    /// `pers` or `orth`.
    pub kind: [u8; 4],
    /// Vertical fov in degrees for `pers`, view height for `orth`.
    pub data: f32,
    pub near: f32,
    pub far: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LampEntry {
    pub transform: u32,
    /// One of `p`, `h`, `s`, `d`.
    pub kind: u8,
    pub color: [u8; 3],
    pub energy: f32,
    pub distance: f32,
    /// Spot cone in degrees.
    pub fov: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneFile {
    pub names: Vec<u8>,
    pub hierarchy: Vec<HierarchyEntry>,
    pub meshes: Vec<MeshEntry>,
    pub cameras: Vec<CameraEntry>,
    pub lamps: Vec<LampEntry>,
}

impl SceneFile {
    pub fn from_reader<R: Read>(reader: &mut R, label: &str) -> Result<Self, SceneError> {
        let names = read_chunk::<u8, _>(reader, b"str0")?;
        let hierarchy = read_chunk(reader, b"xfh0")?;
        let meshes = read_chunk(reader, b"msh0")?;
        let cameras = read_chunk(reader, b"cam0")?;
        let lamps = read_chunk(reader, b"lmp0")?;
        warn_on_trailing(reader, label);
        Ok(Self {
            names,
            hierarchy,
            meshes,
            cameras,
            lamps,
        })
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        write_chunk(writer, b"str0", &self.names)?;
        write_chunk(writer, b"xfh0", &self.hierarchy)?;
        write_chunk(writer, b"msh0", &self.meshes)?;
        write_chunk(writer, b"cam0", &self.cameras)?;
        write_chunk(writer, b"lmp0", &self.lamps)
    }

    /// Appends `name` to the string table, returning its `[begin, end)` range.
    pub fn push_name(&mut self, name: &str) -> (u32, u32) {
        let begin = self.names.len() as u32;
        self.names.extend_from_slice(name.as_bytes());
        (begin, self.names.len() as u32)
    }

    /// Adds a transform and returns its index.
    pub fn push_transform(
        &mut self,
        name: &str,
        parent: Option<u32>,
        position: [f32; 3],
    ) -> u32 {
        let (name_begin, name_end) = self.push_name(name);
        self.hierarchy.push(HierarchyEntry {
            parent: parent.unwrap_or(NO_PARENT),
            name_begin,
            name_end,
            position,
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0, 1.0, 1.0],
        });
        self.hierarchy.len() as u32 - 1
    }

    /// Adds an instance of mesh `name` on transform `transform`.
    pub fn push_mesh(&mut self, transform: u32, name: &str) {
        let (name_begin, name_end) = self.push_name(name);
        self.meshes.push(MeshEntry {
            transform,
            name_begin,
            name_end,
        });
    }

    pub(crate) fn name(
        &self,
        kind: &'static str,
        index: usize,
        begin: u32,
        end: u32,
    ) -> Result<&str, SceneError> {
        let invalid = SceneError::InvalidNameRange {
            kind,
            index,
            begin,
            end,
        };
        if begin > end || end as usize > self.names.len() {
            return Err(invalid);
        }
        std::str::from_utf8(&self.names[begin as usize..end as usize]).map_err(|_| invalid)
    }
}
