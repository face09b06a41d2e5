//! Mesh buffer files.
//!
//! The native format is three chunks: `pnct` (packed [`Vertex`] records),
//! `str0` (names) and `idx0` (one [`IndexEntry`] per mesh). Wavefront OBJ files
//! can be imported too; every OBJ model becomes one triangle mesh.

use std::io::{BufRead, Read, Write};

use thiserror::Error;

use crate::{
    data_structures::mesh::{MeshBuffer, Topology, Vertex},
    resources::chunk::{ChunkError, read_chunk, warn_on_trailing, write_chunk},
};

#[derive(Debug, Error)]
pub enum MeshError {
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error("mesh {index} has invalid name range {begin}..{end}")]
    InvalidNameRange { index: usize, begin: u32, end: u32 },
    #[error("mesh '{name}' has vertex range {begin}..{end} outside of {vertices} vertices")]
    InvalidVertexRange {
        name: String,
        begin: u32,
        end: u32,
        vertices: usize,
    },
    #[error("failed to import OBJ: {0}")]
    Obj(#[from] tobj::LoadError),
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct IndexEntry {
    pub name_begin: u32,
    pub name_end: u32,
    pub vertex_begin: u32,
    pub vertex_end: u32,
}

impl MeshBuffer {
    pub fn from_reader<R: Read>(reader: &mut R, label: &str) -> Result<Self, MeshError> {
        let vertices = read_chunk::<Vertex, _>(reader, b"pnct")?;
        let names = read_chunk::<u8, _>(reader, b"str0")?;
        let index = read_chunk::<IndexEntry, _>(reader, b"idx0")?;
        warn_on_trailing(reader, label);

        let mut buffer = MeshBuffer::new();
        buffer.vertices = vertices;
        for (i, entry) in index.iter().enumerate() {
            let name = (entry.name_begin <= entry.name_end && entry.name_end as usize <= names.len())
                .then(|| &names[entry.name_begin as usize..entry.name_end as usize])
                .and_then(|bytes| std::str::from_utf8(bytes).ok())
                .ok_or(MeshError::InvalidNameRange {
                    index: i,
                    begin: entry.name_begin,
                    end: entry.name_end,
                })?;
            if entry.vertex_begin > entry.vertex_end
                || entry.vertex_end as usize > buffer.vertices.len()
            {
                return Err(MeshError::InvalidVertexRange {
                    name: name.to_string(),
                    begin: entry.vertex_begin,
                    end: entry.vertex_end,
                    vertices: buffer.vertices.len(),
                });
            }
            buffer.insert_range(
                name,
                Topology::Triangles,
                entry.vertex_begin,
                entry.vertex_end - entry.vertex_begin,
            );
        }
        log::info!("Loaded {} meshes from '{}'.", buffer.len(), label);
        Ok(buffer)
    }

    /// Writes the buffer in the native format. Only triangle meshes are written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let mut names = Vec::new();
        let mut index = Vec::new();
        let mut meshes: Vec<_> = self
            .meshes()
            .filter(|mesh| mesh.topology == Topology::Triangles)
            .collect();
        meshes.sort_by_key(|mesh| mesh.start);
        for mesh in meshes {
            let name_begin = names.len() as u32;
            names.extend_from_slice(mesh.name.as_bytes());
            index.push(IndexEntry {
                name_begin,
                name_end: names.len() as u32,
                vertex_begin: mesh.start,
                vertex_end: mesh.start + mesh.count,
            });
        }
        write_chunk(writer, b"pnct", &self.vertices)?;
        write_chunk(writer, b"str0", &names)?;
        write_chunk(writer, b"idx0", &index)
    }

    /// Imports every model of an OBJ file as an unindexed triangle mesh.
    ///
    /// Materials are not loaded; vertex colours are white.
    pub fn from_obj<R: BufRead>(reader: &mut R, label: &str) -> Result<Self, MeshError> {
        let (models, _) = tobj::load_obj_buf(
            reader,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Err(tobj::LoadError::OpenFileFailed),
        )?;

        let mut buffer = MeshBuffer::new();
        for model in models {
            let mesh = &model.mesh;
            if mesh.indices.is_empty() {
                log::warn!("Skipping empty model '{}' in '{}'.", model.name, label);
                continue;
            }
            let vertices: Vec<Vertex> = mesh
                .indices
                .iter()
                .map(|&i| {
                    let i = i as usize;
                    let normal = if mesh.normals.len() >= 3 * (i + 1) {
                        [mesh.normals[3 * i], mesh.normals[3 * i + 1], mesh.normals[3 * i + 2]]
                    } else {
                        [0.0, 0.0, 1.0]
                    };
                    let mut vertex = Vertex::new(
                        [
                            mesh.positions[3 * i],
                            mesh.positions[3 * i + 1],
                            mesh.positions[3 * i + 2],
                        ],
                        normal,
                    );
                    if mesh.texcoords.len() >= 2 * (i + 1) {
                        vertex.tex_coord = [mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1]];
                    }
                    vertex
                })
                .collect();
            buffer.push_mesh(&model.name, Topology::Triangles, &vertices);
        }
        log::info!("Imported {} meshes from '{}'.", buffer.len(), label);
        Ok(buffer)
    }
}
