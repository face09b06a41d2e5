//! Shader programs and their uniform interface.
//!
//! Programs are WGSL modules with a `vs_main` and an `fs_main` entry point.
//! When a program is registered, it is parsed and validated, and every uniform
//! struct member and every texture/sampler global is recorded by name. Lookups
//! by name return `None` for anything the shader does not declare, so optional
//! uniforms can simply be skipped while required ones are checked up front with
//! [`ProgramInterface::require`].

use std::collections::HashMap;

use cgmath::{Matrix3, Matrix4, Vector2, Vector3, Vector4};
use naga::{AddressSpace, ScalarKind, TypeInner, VectorSize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("program '{label}' failed to parse:\n{message}")]
    Parse { label: String, message: String },
    #[error("program '{label}' failed validation:\n{message}")]
    Validation { label: String, message: String },
    #[error("program '{label}' does not declare required uniform '{name}'")]
    MissingUniform { label: String, name: String },
}

/// Shape of a uniform struct member, as far as uploads care.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Mat4,
    /// Four columns of `vec3`, the affine part of a 4x4 matrix.
    Mat4x3,
    Mat3,
    Vec4,
    Vec3,
    Vec2,
    Float,
    Int,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformLocation {
    pub group: u32,
    pub binding: u32,
    pub offset: u32,
    pub kind: UniformKind,
}

/// Name → location table of one program.
#[derive(Clone, Debug, Default)]
pub struct ProgramInterface {
    label: String,
    uniforms: HashMap<String, UniformLocation>,
    blocks: HashMap<(u32, u32), u32>,
    resources: HashMap<String, (u32, u32)>,
}

impl ProgramInterface {
    pub fn reflect(label: &str, source: &str) -> Result<Self, ProgramError> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| ProgramError::Parse {
            label: label.to_string(),
            message: e.emit_to_string(source),
        })?;
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| ProgramError::Validation {
            label: label.to_string(),
            message: e.emit_to_string(source),
        })?;

        let mut interface = ProgramInterface {
            label: label.to_string(),
            ..Default::default()
        };
        for (_, global) in module.global_variables.iter() {
            let Some(binding) = &global.binding else {
                continue;
            };
            match global.space {
                AddressSpace::Uniform => {
                    if let TypeInner::Struct { members, span } = &module.types[global.ty].inner {
                        interface
                            .blocks
                            .insert((binding.group, binding.binding), *span);
                        for member in members {
                            let Some(name) = &member.name else { continue };
                            interface.uniforms.insert(
                                name.clone(),
                                UniformLocation {
                                    group: binding.group,
                                    binding: binding.binding,
                                    offset: member.offset,
                                    kind: kind_of(&module.types[member.ty].inner),
                                },
                            );
                        }
                    }
                }
                AddressSpace::Handle => {
                    if let Some(name) = &global.name {
                        interface
                            .resources
                            .insert(name.clone(), (binding.group, binding.binding));
                    }
                }
                _ => (),
            }
        }
        Ok(interface)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn uniform(&self, name: &str) -> Option<UniformLocation> {
        self.uniforms.get(name).copied()
    }

    /// `(group, binding)` of a texture or sampler global.
    pub fn resource(&self, name: &str) -> Option<(u32, u32)> {
        self.resources.get(name).copied()
    }

    /// Byte size of the uniform struct bound at `(group, binding)`.
    pub fn block_size(&self, group: u32, binding: u32) -> Option<u32> {
        self.blocks.get(&(group, binding)).copied()
    }

    /// Fails unless every name is declared as a uniform member or a resource.
    pub fn require(&self, names: &[&str]) -> Result<(), ProgramError> {
        for name in names {
            if self.uniform(name).is_none() && self.resource(name).is_none() {
                return Err(ProgramError::MissingUniform {
                    label: self.label.clone(),
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn kind_of(inner: &TypeInner) -> UniformKind {
    match inner {
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            ..
        } => UniformKind::Mat4,
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Tri,
            ..
        } => UniformKind::Mat4x3,
        TypeInner::Matrix {
            columns: VectorSize::Tri,
            rows: VectorSize::Tri,
            ..
        } => UniformKind::Mat3,
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float => match size {
            VectorSize::Quad => UniformKind::Vec4,
            VectorSize::Tri => UniformKind::Vec3,
            VectorSize::Bi => UniformKind::Vec2,
        },
        TypeInner::Scalar(scalar) => match scalar.kind {
            ScalarKind::Float => UniformKind::Float,
            ScalarKind::Sint => UniformKind::Int,
            _ => UniformKind::Other,
        },
        _ => UniformKind::Other,
    }
}

/// CPU-side image of one uniform struct, written by name.
///
/// Every setter returns `false` and leaves the block untouched when the name is
/// not declared in this block or has a different shape.
#[derive(Clone, Debug)]
pub struct UniformBlock<'a> {
    interface: &'a ProgramInterface,
    group: u32,
    binding: u32,
    bytes: Vec<u8>,
}

impl<'a> UniformBlock<'a> {
    pub fn new(interface: &'a ProgramInterface, group: u32, binding: u32) -> Self {
        let size = interface.block_size(group, binding).unwrap_or(0);
        Self {
            interface,
            group,
            binding,
            bytes: vec![0; size as usize],
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn locate(&self, name: &str) -> Option<UniformLocation> {
        self.interface
            .uniform(name)
            .filter(|loc| loc.group == self.group && loc.binding == self.binding)
    }

    fn write(&mut self, offset: u32, values: &[f32]) {
        let start = offset as usize;
        self.bytes[start..start + 4 * values.len()].copy_from_slice(bytemuck::cast_slice(values));
    }

    /// Writes a 4x4 matrix to a `mat4x4` or, dropping the last row, a `mat4x3`.
    pub fn set_mat4(&mut self, name: &str, m: Matrix4<f32>) -> bool {
        let Some(loc) = self.locate(name) else {
            return false;
        };
        let columns: [[f32; 4]; 4] = m.into();
        match loc.kind {
            UniformKind::Mat4 => {
                self.write(loc.offset, bytemuck::cast_slice(&columns));
                true
            }
            UniformKind::Mat4x3 => {
                for (i, column) in columns.iter().enumerate() {
                    self.write(loc.offset + 16 * i as u32, &column[..3]);
                }
                true
            }
            _ => false,
        }
    }

    pub fn set_mat3(&mut self, name: &str, m: Matrix3<f32>) -> bool {
        let Some(loc) = self.locate(name).filter(|l| l.kind == UniformKind::Mat3) else {
            return false;
        };
        let columns: [[f32; 3]; 3] = m.into();
        for (i, column) in columns.iter().enumerate() {
            self.write(loc.offset + 16 * i as u32, column);
        }
        true
    }

    pub fn set_vec4(&mut self, name: &str, v: Vector4<f32>) -> bool {
        self.set_floats(name, UniformKind::Vec4, &[v.x, v.y, v.z, v.w])
    }

    pub fn set_vec3(&mut self, name: &str, v: Vector3<f32>) -> bool {
        self.set_floats(name, UniformKind::Vec3, &[v.x, v.y, v.z])
    }

    pub fn set_vec2(&mut self, name: &str, v: Vector2<f32>) -> bool {
        self.set_floats(name, UniformKind::Vec2, &[v.x, v.y])
    }

    pub fn set_f32(&mut self, name: &str, v: f32) -> bool {
        self.set_floats(name, UniformKind::Float, &[v])
    }

    pub fn set_i32(&mut self, name: &str, v: i32) -> bool {
        let Some(loc) = self.locate(name).filter(|l| l.kind == UniformKind::Int) else {
            return false;
        };
        let start = loc.offset as usize;
        self.bytes[start..start + 4].copy_from_slice(&v.to_le_bytes());
        true
    }

    fn set_floats(&mut self, name: &str, kind: UniformKind, values: &[f32]) -> bool {
        let Some(loc) = self.locate(name).filter(|l| l.kind == kind) else {
            return false;
        };
        self.write(loc.offset, values);
        true
    }
}
