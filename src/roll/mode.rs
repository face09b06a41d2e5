//! Per-frame gameplay.
//!
//! [`RollMode`] steers the player sphere from the held directions, moves it and
//! the follow camera through the level with [`collide::slide`], and checks the
//! goal and delivery triggers.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Quaternion, Rad, Rotation3, Vector3};

use crate::{
    collide::{self, SlideParams},
    config::{PhysicsConfig, RenderConfig},
    flow::Direction,
    roll::level::RollLevel,
};

/// Held state of the four steering directions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Controls {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl Controls {
    pub fn set(&mut self, direction: Direction, pressed: bool) {
        match direction {
            Direction::Forward => self.forward = pressed,
            Direction::Backward => self.backward = pressed,
            Direction::Left => self.left = pressed,
            Direction::Right => self.right = pressed,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RollMode {
    start: RollLevel,
    pub level: RollLevel,
    pub controls: Controls,
    physics: PhysicsConfig,
    highlight_colour: cgmath::Vector4<f32>,
    idle_colour: cgmath::Vector4<f32>,
    won: bool,
    deliveries: usize,
}

impl RollMode {
    pub fn new(level: RollLevel, physics: PhysicsConfig, render: &RenderConfig) -> Self {
        let mut mode = Self {
            start: level.clone(),
            level,
            controls: Controls::default(),
            physics,
            highlight_colour: render.highlight_colour,
            idle_colour: render.idle_colour,
            won: false,
            deliveries: 0,
        };
        mode.restart();
        mode
    }

    pub fn won(&self) -> bool {
        self.won
    }

    pub fn deliveries(&self) -> usize {
        self.deliveries
    }

    pub fn player_position(&self) -> Vector3<f32> {
        self.level.scene.transforms[self.level.player.transform].position
    }

    pub fn camera_position(&self) -> Vector3<f32> {
        self.level.scene.transforms[self.level.camera_transform()].position
    }

    /// Restores the level as it was loaded and puts the camera behind the player.
    pub fn restart(&mut self) {
        self.level = self.start.clone();
        self.won = false;
        self.deliveries = 0;
        let (rotation, position) = self.camera_target();
        let camera_id = self.level.camera_transform();
        let camera = &mut self.level.scene.transforms[camera_id];
        camera.rotation = rotation;
        camera.position = position;
    }

    /// Where the camera wants to be: behind and above the player, looking down.
    fn camera_target(&self) -> (Quaternion<f32>, Vector3<f32>) {
        let player = &self.level.scene.transforms[self.level.player.transform];
        let rotation = player.rotation * Quaternion::from_angle_x(Rad(0.35 * PI));
        let position = player.position + player.rotation * Vector3::new(0.0, -16.0, 8.0);
        (rotation, position)
    }

    pub fn update(&mut self, elapsed: f32) {
        self.steer(elapsed);
        self.move_player(elapsed);
        self.check_goals();
        self.check_deliveries();
        self.follow_camera(elapsed);
    }

    fn steer(&mut self, elapsed: f32) {
        let physics = &self.physics;
        let player = &mut self.level.player;

        let t = elapsed * physics.input_scale;
        if self.controls.left {
            player.view_azimuth_acc += t;
        }
        if self.controls.right {
            player.view_azimuth_acc -= t;
        }
        if self.controls.forward {
            player.elevation_acc -= t / 2.0;
        }
        if self.controls.backward {
            player.elevation_acc += t / 2.0;
        }

        player.view_azimuth += player.view_azimuth_acc;
        player.elevation += player.elevation_acc;

        // wrap to [-pi, pi]
        player.view_azimuth /= 2.0 * PI;
        player.view_azimuth -= player.view_azimuth.round();
        player.view_azimuth *= 2.0 * PI;

        let limit = physics.elevation_limit.0;
        player.elevation = player.elevation.clamp(-limit, limit);

        let rotation = Quaternion::from_angle_z(Rad(player.view_azimuth))
            * Quaternion::from_angle_x(Rad(player.elevation));
        let shove = rotation * Vector3::new(0.0, physics.shove_speed, 0.0);

        let keep = 0.5f32.powf(elapsed / physics.velocity_half_life);
        player.velocity = shove + (player.velocity - shove) * keep;

        player.view_azimuth_acc -= player.view_azimuth_acc * elapsed * physics.acceleration_decay;
        player.elevation_acc -= player.elevation_acc * elapsed * physics.acceleration_decay;

        self.level.scene.transforms[player.transform].rotation = rotation;
    }

    fn move_player(&mut self, elapsed: f32) {
        let level = &mut self.level;
        let params = SlideParams {
            radius: self.physics.player_radius,
            response: self.physics.player_response,
            max_iterations: self.physics.max_iterations,
        };
        let mut position = level.scene.transforms[level.player.transform].position;
        collide::slide(
            &mut position,
            &mut level.player.velocity,
            elapsed,
            params,
            &level.colliders,
            &level.scene.transforms,
        );
        level.scene.transforms[level.player.transform].position = position;
    }

    fn check_goals(&mut self) {
        let transforms = &self.level.scene.transforms;
        let player = transforms.world_position(self.level.player.transform);
        if self
            .level
            .goals
            .iter()
            .any(|&goal| (transforms.world_position(goal) - player).magnitude() < self.physics.goal_radius)
        {
            self.won = true;
        }
    }

    fn check_deliveries(&mut self) {
        let level = &mut self.level;
        let Some(active) = level.active_destination().copied() else {
            return;
        };
        let transforms = &level.scene.transforms;
        let distance = (transforms.world_position(active.transform)
            - transforms.world_position(level.player.transform))
        .magnitude();
        if distance >= self.physics.delivery_radius {
            return;
        }
        self.deliveries += 1;
        level.active_destination = (level.active_destination + 1) % level.destinations.len();
        let next = level.destinations[level.active_destination];
        level.scene.colors.set(active.color, self.idle_colour);
        level.scene.colors.set(next.color, self.highlight_colour);
        log::info!(
            "Delivery {} done, next destination is #{}.",
            self.deliveries,
            level.active_destination
        );
    }

    fn follow_camera(&mut self, elapsed: f32) {
        if elapsed <= 0.0 {
            return;
        }
        let (target_rotation, target_position) = self.camera_target();
        let camera = self.level.camera_transform();

        let turn = (self.physics.camera_turn_rate * elapsed).min(1.0);
        let transforms = &mut self.level.scene.transforms;
        transforms[camera].rotation = transforms[camera].rotation.slerp(target_rotation, turn);

        let mut position = transforms[camera].position;
        let follow = (self.physics.camera_follow_rate * elapsed).min(1.0);
        let mut velocity = (target_position - position) * (follow / elapsed);
        let params = SlideParams {
            radius: self.physics.camera_radius,
            response: self.physics.camera_response,
            max_iterations: self.physics.max_iterations,
        };
        collide::slide(
            &mut position,
            &mut velocity,
            elapsed,
            params,
            &self.level.colliders,
            &self.level.scene.transforms,
        );
        self.level.scene.transforms[camera].position = position;
    }
}
