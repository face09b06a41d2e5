//! Hierarchical rigid transforms.
//!
//! A [`Transform`] is position, rotation (unit quaternion) and non-uniform scale
//! relative to an optional parent. Transforms live in a [`Transforms`] arena and
//! are addressed by [`TransformId`]. The arena only grows, so an id handed out
//! once stays valid for the lifetime of the arena.
//!
//! Matrices are never cached. Hierarchies are shallow and every call walks the
//! parent chain again.

use std::ops::{Index, IndexMut};

use cgmath::{InnerSpace, Matrix4, One, Quaternion, Vector3};

use crate::resources::scene_file::SceneError;

/// Stable handle into a [`Transforms`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformId(pub(crate) usize);

impl TransformId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub name: String,
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
    pub parent: Option<TransformId>,
}

impl Transform {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            parent: None,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new()
        }
    }

    /// Translate * rotate * scale.
    pub fn local_to_parent(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Inverse of [`local_to_parent`](Self::local_to_parent).
    ///
    /// A zero scale component maps to a zero reciprocal, so the result is
    /// degenerate on that axis instead of containing infinities.
    pub fn parent_to_local(&self) -> Matrix4<f32> {
        let inv = |s: f32| if s == 0.0 { 0.0 } else { 1.0 / s };
        let inv_rotation = self.rotation.conjugate() / self.rotation.magnitude2();
        Matrix4::from_nonuniform_scale(inv(self.scale.x), inv(self.scale.y), inv(self.scale.z))
            * Matrix4::from(inv_rotation)
            * Matrix4::from_translation(-self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// Append-only arena of transforms forming a forest.
#[derive(Clone, Debug, Default)]
pub struct Transforms {
    items: Vec<Transform>,
}

impl Transforms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a transform. Its parent, if any, must already be in the arena.
    pub fn push(&mut self, transform: Transform) -> Result<TransformId, SceneError> {
        if let Some(parent) = transform.parent {
            if parent.0 >= self.items.len() {
                return Err(SceneError::NotTopological {
                    index: self.items.len(),
                    parent: parent.0,
                });
            }
        }
        self.items.push(transform);
        Ok(TransformId(self.items.len() - 1))
    }

    /// Adds a parentless transform. Cannot fail.
    pub fn push_root(&mut self, mut transform: Transform) -> TransformId {
        transform.parent = None;
        self.items.push(transform);
        TransformId(self.items.len() - 1)
    }

    pub fn get(&self, id: TransformId) -> Option<&Transform> {
        self.items.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TransformId, &Transform)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, t)| (TransformId(i), t))
    }

    pub fn local_to_world(&self, id: TransformId) -> Matrix4<f32> {
        let transform = &self[id];
        match transform.parent {
            Some(parent) => self.local_to_world(parent) * transform.local_to_parent(),
            None => transform.local_to_parent(),
        }
    }

    pub fn world_to_local(&self, id: TransformId) -> Matrix4<f32> {
        let transform = &self[id];
        match transform.parent {
            Some(parent) => transform.parent_to_local() * self.world_to_local(parent),
            None => transform.parent_to_local(),
        }
    }

    /// World-space origin of the transform.
    pub fn world_position(&self, id: TransformId) -> Vector3<f32> {
        self.local_to_world(id).w.truncate()
    }
}

impl Index<TransformId> for Transforms {
    type Output = Transform;

    fn index(&self, id: TransformId) -> &Self::Output {
        &self.items[id.0]
    }
}

impl IndexMut<TransformId> for Transforms {
    fn index_mut(&mut self, id: TransformId) -> &mut Self::Output {
        &mut self.items[id.0]
    }
}
