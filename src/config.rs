//! Tunable constants of the game runtime.
//!
//! Every group is a plain struct with a `Default` impl holding the reference
//! values. Callers override single fields directly.

use cgmath::{Deg, Rad, Vector4};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settings {
    pub physics: PhysicsConfig,
    pub render: RenderConfig,
    pub level: LevelConfig,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsConfig {
    pub player_radius: f32,
    /// Over-correction applied to the inward velocity component on contact.
    pub player_response: f32,
    pub camera_radius: f32,
    pub camera_response: f32,
    /// Fraction of the camera's distance to its target closed per second.
    pub camera_follow_rate: f32,
    pub camera_turn_rate: f32,
    pub max_iterations: usize,
    pub shove_speed: f32,
    /// Seconds after which the velocity has moved halfway to the shove velocity.
    pub velocity_half_life: f32,
    pub input_scale: f32,
    pub acceleration_decay: f32,
    pub elevation_limit: Rad<f32>,
    pub goal_radius: f32,
    pub delivery_radius: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            player_radius: 1.0,
            player_response: 1.1,
            camera_radius: 3.0,
            camera_response: 1.01,
            camera_follow_rate: 1.0,
            camera_turn_rate: 0.8,
            max_iterations: 10,
            shove_speed: 2.0,
            velocity_half_life: 0.25,
            input_scale: 1.0 / 40.0,
            acceleration_decay: 1.5,
            elevation_limit: Deg(85.0).into(),
            goal_radius: 1.0,
            delivery_radius: 2.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    pub use_postprocessing: bool,
    pub blur_passes: usize,
    /// The geometry pass renders at output size divided by this.
    pub first_pass_divisor: u32,
    pub clear_colour: wgpu::Color,
    /// Colour of the active delivery destination.
    pub highlight_colour: Vector4<f32>,
    pub idle_colour: Vector4<f32>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            use_postprocessing: true,
            blur_passes: 6,
            first_pass_divisor: 4,
            clear_colour: wgpu::Color {
                r: 0.45,
                g: 0.45,
                b: 0.50,
                a: 0.0,
            },
            highlight_colour: Vector4::new(1.0, 0.9, 0.3, 1.0),
            idle_colour: Vector4::new(1.0, 1.0, 1.0, 1.0),
        }
    }
}

impl RenderConfig {
    pub fn first_pass_size(&self, output: [u32; 2]) -> [u32; 2] {
        let divisor = self.first_pass_divisor.max(1);
        [(output[0] / divisor).max(1), (output[1] / divisor).max(1)]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LevelConfig {
    pub player_mesh: String,
    pub collidable_meshes: Vec<String>,
    pub goal_meshes: Vec<String>,
    pub destination_meshes: Vec<String>,
    /// `(mesh, image file)` pairs; instances of `mesh` sample the image in
    /// texture slot 0 instead of plain white.
    pub mesh_textures: Vec<(String, String)>,
    pub camera_fovy: Rad<f32>,
    pub camera_near: f32,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            player_mesh: "player".to_string(),
            collidable_meshes: vec!["soil".into(), "path".into(), "unoccupied".into()],
            goal_meshes: vec!["goal".into()],
            destination_meshes: vec!["destination".into()],
            mesh_textures: Vec::new(),
            camera_fovy: Deg(60.0).into(),
            camera_near: 0.05,
        }
    }
}

impl LevelConfig {
    pub fn is_collidable(&self, mesh: &str) -> bool {
        self.collidable_meshes.iter().any(|m| m == mesh)
    }

    pub fn is_goal(&self, mesh: &str) -> bool {
        self.goal_meshes.iter().any(|m| m == mesh)
    }

    pub fn is_destination(&self, mesh: &str) -> bool {
        self.destination_meshes.iter().any(|m| m == mesh)
    }
}

