//! The scene graph: transforms, drawables, cameras and lights.
//!
//! A [`Scene`] owns everything by value. Drawables, cameras and lights refer to
//! their transform through a [`TransformId`] into [`Scene::transforms`], and to
//! GPU resources through ids into the [`LoadedAssets`](crate::resources::LoadedAssets)
//! tables. A scene therefore never touches the GPU itself and can be cloned to
//! snapshot a level.

use std::{fmt::Debug, rc::Rc};

use cgmath::{Deg, Matrix, Matrix3, Matrix4, Rad, SquareMatrix, Vector3, Vector4, Zero};

use crate::{
    data_structures::{
        mesh::Topology,
        transform::{Transform, TransformId, Transforms},
    },
    pipelines::program::UniformBlock,
    resources::{
        ProgramId, TextureId, VertexArrayId,
        scene_file::{NO_PARENT, SceneError, SceneFile},
    },
};

/// Number of texture slots a drawable can bind.
pub const TEXTURE_COUNT: usize = 4;

/// Per-draw hook writing extra uniforms after the standard matrices.
pub type SetUniforms = Rc<dyn Fn(&Scene, &mut UniformBlock)>;

/// Everything needed to issue one draw call.
#[derive(Clone, Default)]
pub struct Pipeline {
    pub program: Option<ProgramId>,
    pub vertex_array: Option<VertexArrayId>,
    pub topology: Topology,
    pub start: u32,
    pub count: u32,
    pub textures: [Option<TextureId>; TEXTURE_COUNT],
    pub set_uniforms: Option<SetUniforms>,
}

impl Pipeline {
    /// Installs the per-draw uniform hook.
    pub fn with_uniforms(&mut self, f: impl Fn(&Scene, &mut UniformBlock) + 'static) {
        self.set_uniforms = Some(Rc::new(f));
    }
}

impl Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("program", &self.program)
            .field("vertex_array", &self.vertex_array)
            .field("topology", &self.topology)
            .field("start", &self.start)
            .field("count", &self.count)
            .field("textures", &self.textures)
            .field("set_uniforms", &self.set_uniforms.as_ref().map(|_| "Fn(..)"))
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct Drawable {
    pub transform: TransformId,
    pub pipeline: Pipeline,
}

impl Drawable {
    pub fn new(transform: TransformId) -> Self {
        Self {
            transform,
            pipeline: Pipeline::default(),
        }
    }

    /// Drawables without a program, a vertex array or vertices are skipped by the renderer.
    pub fn is_renderable(&self) -> bool {
        self.pipeline.program.is_some()
            && self.pipeline.vertex_array.is_some()
            && self.pipeline.count > 0
    }
}

/// Matrices uploaded for every drawable in the geometry pass.
///
/// Lighting happens in world space, so object-to-light is object-to-world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawMatrices {
    pub object_to_clip: Matrix4<f32>,
    pub object_to_light: Matrix4<f32>,
    pub normal_to_light: Matrix3<f32>,
}

impl DrawMatrices {
    pub fn new(transforms: &Transforms, transform: TransformId, world_to_clip: Matrix4<f32>) -> Self {
        let object_to_world = transforms.local_to_world(transform);
        let upper = Matrix3::from_cols(
            object_to_world.x.truncate(),
            object_to_world.y.truncate(),
            object_to_world.z.truncate(),
        );
        let normal_to_light = upper
            .transpose()
            .invert()
            .unwrap_or_else(Matrix3::zero);
        Self {
            object_to_clip: world_to_clip * object_to_world,
            object_to_light: object_to_world,
            normal_to_light,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub transform: TransformId,
    /// Vertical field of view in radians.
    pub fovy: f32,
    pub near: f32,
    /// Width over height, refreshed from the output size every frame.
    pub aspect: f32,
}

impl Camera {
    pub fn new(transform: TransformId) -> Self {
        Self {
            transform,
            fovy: Rad::from(Deg(60.0)).0,
            near: 0.01,
            aspect: 1.0,
        }
    }

    /// Right-handed perspective with an infinitely distant far plane, depth in `0..1`.
    pub fn projection(&self) -> Matrix4<f32> {
        let f = 1.0 / (0.5 * self.fovy).tan();
        #[rustfmt::skip]
        let projection = Matrix4::new(
            f / self.aspect, 0.0, 0.0, 0.0,
            0.0, f, 0.0, 0.0,
            0.0, 0.0, -1.0, -1.0,
            0.0, 0.0, -self.near, 0.0,
        );
        projection
    }

    pub fn world_to_clip(&self, transforms: &Transforms) -> Matrix4<f32> {
        self.projection() * transforms.world_to_local(self.transform)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Point,
    Hemisphere,
    Spot,
    Directional,
}

impl LightKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'p' => Some(Self::Point),
            b'h' => Some(Self::Hemisphere),
            b's' => Some(Self::Spot),
            b'd' => Some(Self::Directional),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub transform: TransformId,
    pub kind: LightKind,
    /// File colour rescaled from bytes to `0..=1`, times the lamp energy.
    pub energy: Vector3<f32>,
    pub distance: f32,
    /// Cone angle in radians; only meaningful for spot lights.
    pub spot_fov: f32,
}

/// Handle into a [`ColorTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColorId(usize);

/// Colours shared between entities.
///
/// Several drawables may hold the same [`ColorId`]; a [`set`](Self::set) is seen
/// by all of them on the next draw. That aliasing is the point of the table:
/// gameplay recolours an entity by id without knowing who draws it.
#[derive(Clone, Debug, Default)]
pub struct ColorTable {
    colors: Vec<Vector4<f32>>,
}

impl ColorTable {
    pub fn insert(&mut self, color: Vector4<f32>) -> ColorId {
        self.colors.push(color);
        ColorId(self.colors.len() - 1)
    }

    pub fn get(&self, id: ColorId) -> Vector4<f32> {
        self.colors[id.0]
    }

    pub fn set(&mut self, id: ColorId, color: Vector4<f32>) {
        self.colors[id.0] = color;
    }
}

#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub transforms: Transforms,
    pub drawables: Vec<Drawable>,
    pub cameras: Vec<Camera>,
    pub lights: Vec<Light>,
    pub colors: ColorTable,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the contents of `file` to this scene.
    ///
    /// The hierarchy is validated before anything is added. `on_drawable` is
    /// called once per mesh instance with the instance's transform and mesh name
    /// and decides what (if anything) gets drawn or collided.
    pub fn load<F, E>(&mut self, file: &SceneFile, mut on_drawable: F) -> Result<(), E>
    where
        F: FnMut(&mut Scene, TransformId, &str) -> Result<(), E>,
        E: From<SceneError>,
    {
        for (index, entry) in file.hierarchy.iter().enumerate() {
            if entry.parent != NO_PARENT && entry.parent as usize >= index {
                return Err(SceneError::NotTopological {
                    index,
                    parent: entry.parent as usize,
                }
                .into());
            }
            file.name("transform", index, entry.name_begin, entry.name_end)?;
        }

        let base = self.transforms.len();
        let mut ids = Vec::with_capacity(file.hierarchy.len());
        for (index, entry) in file.hierarchy.iter().enumerate() {
            let [x, y, z, w] = entry.rotation;
            let transform = Transform {
                name: file
                    .name("transform", index, entry.name_begin, entry.name_end)?
                    .to_string(),
                position: entry.position.into(),
                rotation: cgmath::Quaternion::new(w, x, y, z),
                scale: entry.scale.into(),
                parent: (entry.parent != NO_PARENT).then(|| TransformId(base + entry.parent as usize)),
            };
            ids.push(self.transforms.push(transform)?);
        }
        let lookup = |kind: &'static str, index: usize, transform: u32| {
            ids.get(transform as usize)
                .copied()
                .ok_or(SceneError::InvalidTransformIndex {
                    kind,
                    index,
                    transform,
                })
        };

        for (index, entry) in file.meshes.iter().enumerate() {
            let transform = lookup("mesh", index, entry.transform)?;
            let name = file.name("mesh", index, entry.name_begin, entry.name_end)?;
            on_drawable(self, transform, name)?;
        }

        for (index, entry) in file.cameras.iter().enumerate() {
            let transform = lookup("camera", index, entry.transform)?;
            if &entry.kind != b"pers" {
                log::warn!(
                    "Ignoring non-perspective camera (type '{}') on transform '{}'.",
                    String::from_utf8_lossy(&entry.kind),
                    self.transforms[transform].name
                );
                continue;
            }
            self.cameras.push(Camera {
                transform,
                fovy: Rad::from(Deg(entry.data)).0,
                near: entry.near,
                aspect: 1.0,
            });
        }

        for (index, entry) in file.lamps.iter().enumerate() {
            let transform = lookup("lamp", index, entry.transform)?;
            let Some(kind) = LightKind::from_tag(entry.kind) else {
                log::warn!(
                    "Ignoring unknown lamp type '{}' on transform '{}'.",
                    entry.kind as char,
                    self.transforms[transform].name
                );
                continue;
            };
            let color = Vector3::new(
                entry.color[0] as f32,
                entry.color[1] as f32,
                entry.color[2] as f32,
            ) / 255.0;
            self.lights.push(Light {
                transform,
                kind,
                energy: color * entry.energy,
                distance: entry.distance,
                spot_fov: Rad::from(Deg(entry.fov)).0,
            });
        }
        Ok(())
    }
}
