//! Swept-sphere collision against static triangle meshes.
//!
//! A moving sphere is tested along the straight segment from its current to its
//! desired position. [`sweep`] finds the earliest contact over every triangle
//! of every [`MeshCollider`], skipping whole meshes whose world-space bounding
//! box cannot be reached. [`slide`] spends a time step in up to a fixed number
//! of sweeps, removing the velocity component that points into each surface it
//! touches so the sphere slides along walls instead of stopping.

use std::sync::Arc;

use cgmath::{InnerSpace, Matrix4, Vector3};
use thiserror::Error;

use crate::data_structures::{
    mesh::{Mesh, MeshBuffer, Topology},
    transform::{TransformId, Transforms},
};

#[derive(Debug, Error)]
pub enum ColliderError {
    #[error("mesh '{mesh}' has topology {topology:?}; only triangle lists can be collided with")]
    UnsupportedTopology { mesh: String, topology: Topology },
}

/// A static triangle mesh placed in the world by a transform.
#[derive(Clone, Debug)]
pub struct MeshCollider {
    pub transform: TransformId,
    pub mesh: Mesh,
    pub buffer: Arc<MeshBuffer>,
}

impl MeshCollider {
    pub fn new(
        transform: TransformId,
        mesh: &Mesh,
        buffer: Arc<MeshBuffer>,
    ) -> Result<Self, ColliderError> {
        if mesh.topology != Topology::Triangles {
            return Err(ColliderError::UnsupportedTopology {
                mesh: mesh.name.clone(),
                topology: mesh.topology,
            });
        }
        Ok(Self {
            transform,
            mesh: mesh.clone(),
            buffer,
        })
    }

    /// World-space triangles of the mesh.
    pub fn triangles<'a>(
        &'a self,
        to_world: &'a Matrix4<f32>,
    ) -> impl Iterator<Item = [Vector3<f32>; 3]> + 'a {
        let start = self.mesh.start;
        (0..self.mesh.count / 3).map(move |i| {
            let v = start + 3 * i;
            [
                transform_point(to_world, self.buffer.position(v)),
                transform_point(to_world, self.buffer.position(v + 1)),
                transform_point(to_world, self.buffer.position(v + 2)),
            ]
        })
    }
}

fn transform_point(m: &Matrix4<f32>, p: Vector3<f32>) -> Vector3<f32> {
    (m * p.extend(1.0)).truncate()
}

pub fn aabb_overlap(
    a_min: Vector3<f32>,
    a_max: Vector3<f32>,
    b_min: Vector3<f32>,
    b_max: Vector3<f32>,
) -> bool {
    (0..3).all(|i| a_min[i] <= b_max[i] && b_min[i] <= a_max[i])
}

/// Conservative world-space box around a local box placed by `to_world`.
pub fn world_bounds(
    to_world: &Matrix4<f32>,
    min: Vector3<f32>,
    max: Vector3<f32>,
) -> (Vector3<f32>, Vector3<f32>) {
    let center = transform_point(to_world, 0.5 * (max + min));
    let r = 0.5 * (max - min);
    let abs = |v: Vector3<f32>| Vector3::new(v.x.abs(), v.y.abs(), v.z.abs());
    let extent = abs(to_world.x.truncate() * r.x)
        + abs(to_world.y.truncate() * r.y)
        + abs(to_world.z.truncate() * r.z);
    (center - extent, center + extent)
}

/// First contact of a swept sphere with a triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// Fraction of the sweep travelled at contact.
    pub t: f32,
    /// Closest point of the triangle at contact.
    pub at: Vector3<f32>,
    /// Unit vector from `at` towards the sphere centre.
    pub normal: Vector3<f32>,
}

const INSIDE_EPSILON: f32 = 1e-5;

fn inside_triangle(p: Vector3<f32>, [a, b, c]: [Vector3<f32>; 3]) -> bool {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);
    let denom = d00 * d11 - d01 * d01;
    if denom == 0.0 {
        return false;
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    v >= -INSIDE_EPSILON && w >= -INSIDE_EPSILON && v + w <= 1.0 + INSIDE_EPSILON
}

/// Smallest root of `a t² + b t + c` if the quadratic has real roots. A
/// negative root is clamped to zero when `c <= 0`, meaning the sphere already
/// touches at the start of the sweep.
fn first_root(a: f32, b: f32, c: f32) -> Option<f32> {
    if a <= 0.0 {
        return None;
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / (2.0 * a);
    if t < 0.0 && c <= 0.0 {
        Some(0.0)
    } else {
        Some(t)
    }
}

/// Earliest contact of a sphere of `radius` moving from `from` to `to` with
/// the two-sided triangle `tri`, if it happens no later than `max_t`.
///
/// Only approaching contacts count: a sphere leaving a surface it touches is
/// not stopped by it.
pub fn swept_sphere_vs_triangle(
    from: Vector3<f32>,
    to: Vector3<f32>,
    radius: f32,
    tri: [Vector3<f32>; 3],
    max_t: f32,
) -> Option<Hit> {
    let [a, b, c] = tri;
    let normal = (b - a).cross(c - a);
    if normal.magnitude2() == 0.0 {
        return None;
    }
    let mut normal = normal.normalize();
    let mut dist0 = (from - a).dot(normal);
    if dist0 < 0.0 {
        normal = -normal;
        dist0 = -dist0;
    }
    let dist1 = (to - a).dot(normal);
    let d = to - from;

    // face
    if dist0 >= radius && dist1 < radius {
        let t = (dist0 - radius) / (dist0 - dist1);
        let at = from + d * t - normal * radius;
        if inside_triangle(at, tri) {
            return (t <= max_t).then_some(Hit { t, at, normal });
        }
    } else if dist0 < radius && d.dot(normal) < 0.0 {
        let at = from - normal * dist0;
        if inside_triangle(at, tri) {
            return Some(Hit { t: 0.0, at, normal });
        }
    }

    let mut best: Option<Hit> = None;
    let mut best_t = max_t;
    let dd = d.dot(d);
    let mut consider = |t: f32, at: Vector3<f32>| {
        if !(0.0..=best_t).contains(&t) {
            return;
        }
        let offset = from + d * t - at;
        if offset.magnitude2() == 0.0 {
            return;
        }
        let normal = offset.normalize();
        if d.dot(normal) >= 0.0 {
            return;
        }
        best_t = t;
        best = Some(Hit { t, at, normal });
    };

    // edges
    for (p0, p1) in [(a, b), (b, c), (c, a)] {
        let e = p1 - p0;
        let s = from - p0;
        let ee = e.dot(e);
        let ed = e.dot(d);
        let es = e.dot(s);
        let qa = ee * dd - ed * ed;
        let qb = 2.0 * (ee * d.dot(s) - ed * es);
        let qc = ee * (s.dot(s) - radius * radius) - es * es;
        let Some(t) = first_root(qa, qb, qc) else {
            continue;
        };
        let f = (es + ed * t) / ee;
        if (0.0..=1.0).contains(&f) {
            consider(t, p0 + e * f);
        }
    }

    // vertices
    for p in tri {
        let s = from - p;
        if let Some(t) = first_root(dd, 2.0 * d.dot(s), s.dot(s) - radius * radius) {
            consider(t, p);
        }
    }

    best
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepResult {
    pub collided: bool,
    pub t: f32,
    /// Sphere centre at `t`.
    pub position: Vector3<f32>,
    pub contact: Vector3<f32>,
    pub normal: Vector3<f32>,
}

/// Earliest contact of a sphere swept from `from` to `to` against all colliders.
pub fn sweep(
    from: Vector3<f32>,
    to: Vector3<f32>,
    radius: f32,
    colliders: &[MeshCollider],
    transforms: &Transforms,
) -> SweepResult {
    let r = Vector3::new(radius, radius, radius);
    let sweep_min = Vector3::new(from.x.min(to.x), from.y.min(to.y), from.z.min(to.z)) - r;
    let sweep_max = Vector3::new(from.x.max(to.x), from.y.max(to.y), from.z.max(to.z)) + r;

    let mut best: Option<Hit> = None;
    for collider in colliders {
        let to_world = transforms.local_to_world(collider.transform);
        let (world_min, world_max) = world_bounds(&to_world, collider.mesh.min, collider.mesh.max);
        if !aabb_overlap(sweep_min, sweep_max, world_min, world_max) {
            continue;
        }
        for tri in collider.triangles(&to_world) {
            let max_t = best.map_or(1.0, |hit| hit.t);
            if let Some(hit) = swept_sphere_vs_triangle(from, to, radius, tri, max_t) {
                best = Some(hit);
            }
        }
    }

    match best {
        Some(hit) => SweepResult {
            collided: true,
            t: hit.t,
            position: from + (to - from) * hit.t,
            contact: hit.at,
            normal: hit.normal,
        },
        None => SweepResult {
            collided: false,
            t: 1.0,
            position: to,
            contact: to,
            normal: Vector3::new(0.0, 0.0, 0.0),
        },
    }
}

/// Parameters of a sliding sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlideParams {
    pub radius: f32,
    /// Multiplier on the removed inward velocity; slightly above one pushes the
    /// sphere off the surface.
    pub response: f32,
    pub max_iterations: usize,
}

/// Moves a sphere through `elapsed` seconds of `velocity`, sliding along every
/// surface it hits. Returns the number of contacts.
///
/// If the iteration budget runs out the rest of the step is dropped.
pub fn slide(
    position: &mut Vector3<f32>,
    velocity: &mut Vector3<f32>,
    elapsed: f32,
    params: SlideParams,
    colliders: &[MeshCollider],
    transforms: &Transforms,
) -> usize {
    let mut remain = elapsed;
    let mut contacts = 0;
    for _ in 0..params.max_iterations {
        if remain == 0.0 {
            break;
        }
        let from = *position;
        let to = from + *velocity * remain;
        let result = sweep(from, to, params.radius, colliders, transforms);
        if !result.collided {
            *position = to;
            remain = 0.0;
            break;
        }
        contacts += 1;
        *position = result.position;
        let d = velocity.dot(result.normal);
        if d < 0.0 {
            *velocity -= result.normal * (params.response * d);
        }
        remain *= 1.0 - result.t;
    }
    if remain > 0.0 {
        log::debug!(
            "Collision budget of {} iterations exhausted, dropping {:.4}s of motion.",
            params.max_iterations,
            remain
        );
    }
    contacts
}
