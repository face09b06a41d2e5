//! Static mesh geometry.
//!
//! A [`MeshBuffer`] is one shared, immutable array of [`Vertex`] records plus a
//! table of named [`Mesh`] sub-ranges. Levels draw and collide against the same
//! buffer: the renderer uploads `vertices` once, the collision engine reads the
//! positions on the CPU.

use std::collections::HashMap;

use cgmath::Vector3;

/// Packed position / normal / colour / texture coordinate vertex.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [u8; 4],
    pub tex_coord: [f32; 2],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self {
            position,
            normal,
            color: [0xff; 4],
            tex_coord: [0.0, 0.0],
        }
    }

    /// Vertex buffer layout matching `@location(0..4)` of the first-pass shader.
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Unorm8x4,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 7]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Primitive type of a mesh. Only [`Topology::Triangles`] can be collided with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Topology {
    #[default]
    Triangles,
    TriangleStrip,
    Lines,
    LineStrip,
    Points,
}

impl From<Topology> for wgpu::PrimitiveTopology {
    fn from(topology: Topology) -> Self {
        match topology {
            Topology::Triangles => wgpu::PrimitiveTopology::TriangleList,
            Topology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
            Topology::Lines => wgpu::PrimitiveTopology::LineList,
            Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Topology::Points => wgpu::PrimitiveTopology::PointList,
        }
    }
}

/// Named range of a [`MeshBuffer`] with its local-space bounding box.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub topology: Topology,
    pub start: u32,
    pub count: u32,
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

#[derive(Clone, Debug, Default)]
pub struct MeshBuffer {
    pub vertices: Vec<Vertex>,
    meshes: HashMap<String, Mesh>,
}

impl MeshBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `vertices` as a new mesh called `name` and returns it.
    ///
    /// A mesh with the same name is replaced in the lookup table; its vertices
    /// stay in the buffer.
    pub fn push_mesh(&mut self, name: &str, topology: Topology, vertices: &[Vertex]) -> &Mesh {
        let start = self.vertices.len() as u32;
        self.vertices.extend_from_slice(vertices);
        self.insert_range(name, topology, start, vertices.len() as u32)
    }

    /// Registers an existing vertex range under `name`, computing its bounds.
    ///
    /// Panics if the range is outside the buffer; loaders validate ranges first.
    pub(crate) fn insert_range(
        &mut self,
        name: &str,
        topology: Topology,
        start: u32,
        count: u32,
    ) -> &Mesh {
        let (min, max) = bounds(&self.vertices[start as usize..(start + count) as usize]);
        let mesh = Mesh {
            name: name.to_string(),
            topology,
            start,
            count,
            min,
            max,
        };
        self.meshes.insert(name.to_string(), mesh);
        &self.meshes[name]
    }

    pub fn lookup(&self, name: &str) -> Option<&Mesh> {
        self.meshes.get(name)
    }

    pub fn meshes(&self) -> impl Iterator<Item = &Mesh> {
        self.meshes.values()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn position(&self, index: u32) -> Vector3<f32> {
        self.vertices[index as usize].position.into()
    }
}

fn bounds(vertices: &[Vertex]) -> (Vector3<f32>, Vector3<f32>) {
    if vertices.is_empty() {
        return (Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0));
    }
    let mut min = Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
    let mut max = Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
    for v in vertices {
        for axis in 0..3 {
            min[axis] = min[axis].min(v.position[axis]);
            max[axis] = max[axis].max(v.position[axis]);
        }
    }
    (min, max)
}
