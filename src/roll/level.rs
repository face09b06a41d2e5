//! Level construction.
//!
//! A [`RollLevel`] is a [`Scene`] plus what the game needs to know about it:
//! which transform is the player, which meshes are solid, where the goals and
//! delivery destinations are, and the camera that follows the player.

use cgmath::Vector3;
use thiserror::Error;

use crate::{
    collide::{ColliderError, MeshCollider},
    config::Settings,
    data_structures::{
        mesh::MeshBuffer,
        scene::{Camera, ColorId, Drawable, Pipeline, Scene},
        transform::{Transform, TransformId},
    },
    pipelines::{firstpass, program::ProgramError},
    resources::{
        LoadedAssets, MeshBufferId, VertexArrayId,
        scene_file::{SceneError, SceneFile},
    },
};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error("level '{level}' uses mesh '{mesh}', which is not in the mesh buffer")]
    MissingMesh { level: String, mesh: String },
    #[error("level '{level}' contains more than one player")]
    MultiplePlayers { level: String },
    #[error("level '{level}' contains no player")]
    NoPlayer { level: String },
    #[error(transparent)]
    Collider(#[from] ColliderError),
}

/// Content shared by every level: the mesh buffer bound to the first-pass
/// program and the drawable template.
#[derive(Clone, Debug)]
pub struct RollAssets {
    pub buffer: MeshBufferId,
    pub vertex_array: VertexArrayId,
    pub template: Pipeline,
}

impl RollAssets {
    /// Registers the first-pass program, the mesh buffer, and a collider for
    /// every collidable mesh the buffer contains.
    pub fn register(
        assets: &mut LoadedAssets,
        buffer: MeshBuffer,
        settings: &Settings,
    ) -> Result<Self, ProgramError> {
        let (program, template) = firstpass::register(assets)?;
        let names: Vec<String> = buffer
            .meshes()
            .map(|mesh| mesh.name.clone())
            .filter(|name| settings.level.is_collidable(name))
            .collect();
        let buffer = assets.add_mesh_buffer(buffer);
        for name in &names {
            assets.register_collider(name, name);
        }
        let vertex_array = assets.make_vertex_array(buffer, program);
        Ok(Self {
            buffer,
            vertex_array,
            template,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    pub transform: TransformId,
    pub velocity: Vector3<f32>,
    pub view_azimuth: f32,
    pub elevation: f32,
    pub view_azimuth_acc: f32,
    pub elevation_acc: f32,
}

impl Player {
    fn new(transform: TransformId) -> Self {
        Self {
            transform,
            velocity: Vector3::new(0.0, 0.0, 0.0),
            view_azimuth: 0.0,
            elevation: 0.0,
            view_azimuth_acc: 0.0,
            elevation_acc: 0.0,
        }
    }
}

/// A place the player delivers to. Its drawable reads its colour from
/// `color`, so recolouring the entry recolours the mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Destination {
    pub transform: TransformId,
    pub color: ColorId,
}

#[derive(Clone, Debug)]
pub struct RollLevel {
    pub scene: Scene,
    pub player: Player,
    /// Index of the follow camera in `scene.cameras`.
    pub camera: usize,
    pub colliders: Vec<MeshCollider>,
    pub goals: Vec<TransformId>,
    pub destinations: Vec<Destination>,
    pub active_destination: usize,
}

impl RollLevel {
    pub fn new(
        file: &SceneFile,
        label: &str,
        assets: &LoadedAssets,
        roll: &RollAssets,
        settings: &Settings,
    ) -> Result<Self, LevelError> {
        let level_config = &settings.level;
        let render_config = &settings.render;
        let buffer = assets.mesh_buffer(roll.buffer);

        let mut scene = Scene::new();
        let mut player = None;
        let mut colliders = Vec::new();
        let mut goals = Vec::new();
        let mut destinations = Vec::new();

        scene.load(file, |scene, transform, mesh_name| {
            let mesh = buffer
                .lookup(mesh_name)
                .ok_or_else(|| LevelError::MissingMesh {
                    level: label.to_string(),
                    mesh: mesh_name.to_string(),
                })?;

            let color = scene.colors.insert(render_config.idle_colour);
            let mut pipeline = roll.template.clone();
            pipeline.vertex_array = Some(roll.vertex_array);
            pipeline.topology = mesh.topology;
            pipeline.start = mesh.start;
            pipeline.count = mesh.count;
            if let Some(texture) = assets.texture_id(mesh_name) {
                pipeline.textures[0] = Some(texture);
            }
            pipeline.with_uniforms(move |scene, block| {
                block.set_vec4("CUSTOM_COL", scene.colors.get(color));
                block.set_vec3("ANCHOR_POS", scene.transforms.world_position(transform));
            });
            scene.drawables.push(Drawable {
                transform,
                pipeline,
            });

            if mesh_name == level_config.player_mesh {
                if player.is_some() {
                    return Err(LevelError::MultiplePlayers {
                        level: label.to_string(),
                    });
                }
                player = Some(Player::new(transform));
            } else if let Some(collider) = assets.collider_for(mesh_name) {
                let collider_mesh =
                    buffer
                        .lookup(collider)
                        .ok_or_else(|| LevelError::MissingMesh {
                            level: label.to_string(),
                            mesh: collider.to_string(),
                        })?;
                colliders.push(MeshCollider::new(transform, collider_mesh, buffer.clone())?);
            }

            if level_config.is_goal(mesh_name) {
                goals.push(transform);
            }
            if level_config.is_destination(mesh_name) {
                destinations.push(Destination { transform, color });
            }
            Ok(())
        })?;

        let player = player.ok_or_else(|| LevelError::NoPlayer {
            level: label.to_string(),
        })?;
        log::info!(
            "Level '{}' has {} mesh colliders, {} goals, {} destinations.",
            label,
            colliders.len(),
            goals.len(),
            destinations.len()
        );

        let camera_transform = scene.transforms.push_root(Transform::named("player camera"));
        scene.cameras.push(Camera {
            fovy: level_config.camera_fovy.0,
            near: level_config.camera_near,
            ..Camera::new(camera_transform)
        });
        let camera = scene.cameras.len() - 1;

        if let Some(first) = destinations.first() {
            scene.colors.set(first.color, render_config.highlight_colour);
        }

        Ok(Self {
            scene,
            player,
            camera,
            colliders,
            goals,
            destinations,
            active_destination: 0,
        })
    }

    pub fn camera_transform(&self) -> TransformId {
        self.scene.cameras[self.camera].transform
    }

    pub fn active_destination(&self) -> Option<&Destination> {
        self.destinations.get(self.active_destination)
    }
}
