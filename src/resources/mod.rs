//! Asset registry and loading.
//!
//! [`LoadedAssets`] is the explicit table of everything a level can refer to by
//! id: shader programs, mesh buffers, vertex arrays (a mesh buffer bound to a
//! program's vertex layout), textures, and the mesh-name → collider-mesh map.
//! It is pure CPU data. The [`Renderer`](crate::render::Renderer) turns it into
//! GPU objects once, and scenes only ever hold the ids.

use std::{collections::HashMap, io::Cursor, path::PathBuf, sync::Arc};

use crate::{
    data_structures::mesh::MeshBuffer,
    pipelines::program::{ProgramError, ProgramInterface},
};

pub mod chunk;
pub mod mesh_file;
pub mod scene_file;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshBufferId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexArrayId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) usize);

/// WGSL source of a program together with its reflected interface.
#[derive(Clone, Debug)]
pub struct ProgramSource {
    pub label: String,
    pub source: String,
    pub interface: ProgramInterface,
}

/// Binding of a mesh buffer to the vertex inputs of a program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexArray {
    pub program: ProgramId,
    pub buffer: MeshBufferId,
}

#[derive(Clone, Debug)]
pub enum TextureSource {
    /// A single RGBA texel.
    Solid([u8; 4]),
    /// Encoded image file contents (PNG, JPEG).
    Encoded(Vec<u8>),
}

#[derive(Clone, Debug, Default)]
pub struct LoadedAssets {
    programs: Vec<ProgramSource>,
    mesh_buffers: Vec<Arc<MeshBuffer>>,
    vertex_arrays: Vec<VertexArray>,
    textures: Vec<(String, TextureSource)>,
    texture_names: HashMap<String, TextureId>,
    colliders: HashMap<String, String>,
}

impl LoadedAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `source` and records the program. Fails on invalid WGSL.
    pub fn add_program(&mut self, label: &str, source: &str) -> Result<ProgramId, ProgramError> {
        let interface = ProgramInterface::reflect(label, source)?;
        self.programs.push(ProgramSource {
            label: label.to_string(),
            source: source.to_string(),
            interface,
        });
        Ok(ProgramId(self.programs.len() - 1))
    }

    pub fn program(&self, id: ProgramId) -> &ProgramSource {
        &self.programs[id.0]
    }

    pub fn programs(&self) -> impl Iterator<Item = (ProgramId, &ProgramSource)> {
        self.programs
            .iter()
            .enumerate()
            .map(|(i, p)| (ProgramId(i), p))
    }

    pub fn add_mesh_buffer(&mut self, buffer: MeshBuffer) -> MeshBufferId {
        self.mesh_buffers.push(Arc::new(buffer));
        MeshBufferId(self.mesh_buffers.len() - 1)
    }

    pub fn mesh_buffer(&self, id: MeshBufferId) -> &Arc<MeshBuffer> {
        &self.mesh_buffers[id.0]
    }

    pub fn mesh_buffers(&self) -> impl Iterator<Item = (MeshBufferId, &Arc<MeshBuffer>)> {
        self.mesh_buffers
            .iter()
            .enumerate()
            .map(|(i, b)| (MeshBufferId(i), b))
    }

    /// Binds `buffer` to the vertex layout of `program`, reusing an existing binding.
    pub fn make_vertex_array(&mut self, buffer: MeshBufferId, program: ProgramId) -> VertexArrayId {
        let vertex_array = VertexArray { program, buffer };
        if let Some(i) = self.vertex_arrays.iter().position(|va| *va == vertex_array) {
            return VertexArrayId(i);
        }
        self.vertex_arrays.push(vertex_array);
        VertexArrayId(self.vertex_arrays.len() - 1)
    }

    pub fn vertex_array(&self, id: VertexArrayId) -> VertexArray {
        self.vertex_arrays[id.0]
    }

    pub fn vertex_arrays(&self) -> impl Iterator<Item = (VertexArrayId, VertexArray)> + '_ {
        self.vertex_arrays
            .iter()
            .enumerate()
            .map(|(i, va)| (VertexArrayId(i), *va))
    }

    /// Registers a texture under `name`. A second texture with the same name
    /// replaces the first in name lookups.
    pub fn add_texture(&mut self, name: &str, source: TextureSource) -> TextureId {
        self.textures.push((name.to_string(), source));
        let id = TextureId(self.textures.len() - 1);
        self.texture_names.insert(name.to_string(), id);
        id
    }

    pub fn texture_id(&self, name: &str) -> Option<TextureId> {
        self.texture_names.get(name).copied()
    }

    pub fn textures(&self) -> impl Iterator<Item = (TextureId, &str, &TextureSource)> {
        self.textures
            .iter()
            .enumerate()
            .map(|(i, (name, source))| (TextureId(i), name.as_str(), source))
    }

    /// Instances of mesh `mesh` collide against the geometry of `collider`.
    pub fn register_collider(&mut self, mesh: &str, collider: &str) {
        self.colliders.insert(mesh.to_string(), collider.to_string());
    }

    pub fn collider_for(&self, mesh: &str) -> Option<&str> {
        self.colliders.get(mesh).map(String::as_str)
    }
}

pub fn asset_path(file_name: &str) -> PathBuf {
    std::path::Path::new("./").join("assets").join(file_name)
}

pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    let path = asset_path(file_name);
    let data = tokio::fs::read(&path)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read '{}': {}", path.display(), e))?;
    Ok(data)
}

/// Loads a mesh buffer, picking the parser from the file extension.
pub async fn load_mesh_buffer(file_name: &str) -> anyhow::Result<MeshBuffer> {
    let data = load_binary(file_name).await?;
    let mut cursor = Cursor::new(data);
    let buffer = if file_name.ends_with(".obj") {
        MeshBuffer::from_obj(&mut cursor, file_name)?
    } else {
        MeshBuffer::from_reader(&mut cursor, file_name)?
    };
    Ok(buffer)
}

/// Reads an encoded image and registers it as texture `name`.
///
/// The header is checked here so an unknown format fails at load time; pixels
/// are decoded when the renderer uploads the texture.
pub async fn load_texture(
    assets: &mut LoadedAssets,
    name: &str,
    file_name: &str,
) -> anyhow::Result<TextureId> {
    let data = load_binary(file_name).await?;
    let format = image::guess_format(&data)
        .map_err(|e| anyhow::anyhow!("'{}' is not a supported image: {}", file_name, e))?;
    log::debug!("Texture '{}' loaded from '{}' ({:?}).", name, file_name, format);
    Ok(assets.add_texture(name, TextureSource::Encoded(data)))
}

pub async fn load_scene_file(file_name: &str) -> anyhow::Result<scene_file::SceneFile> {
    let data = load_binary(file_name).await?;
    Ok(scene_file::SceneFile::from_reader(
        &mut Cursor::new(data),
        file_name,
    )?)
}
