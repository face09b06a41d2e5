//! The sphere-rolling game.
//!
//! - `level` builds a [`RollLevel`] from a scene file and the shared assets
//! - `mode` is the per-frame gameplay ([`RollMode`])
//!
//! [`RollGame`] pairs the gameplay with a [`Renderer`] and plugs both into the
//! application loop as a [`GameMode`].

use winit::{
    event::{KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{
    config::Settings,
    context::Context,
    flow::{GameMode, direction_for},
    render::Renderer,
    resources::{self, LoadedAssets},
};

pub mod level;
pub mod mode;

pub use level::{LevelError, RollAssets, RollLevel};
pub use mode::{Controls, RollMode};

pub struct RollGame {
    pub mode: RollMode,
    renderer: Renderer,
}

impl RollGame {
    /// Loads the mesh buffer and scene from the asset directory and sets up
    /// everything the game draws with.
    pub async fn load(
        ctx: &mut Context,
        scene_file: &str,
        mesh_file: &str,
        settings: Settings,
    ) -> anyhow::Result<Self> {
        let (buffer, file) = futures::try_join!(
            resources::load_mesh_buffer(mesh_file),
            resources::load_scene_file(scene_file),
        )?;

        let mut assets = LoadedAssets::new();
        let roll = RollAssets::register(&mut assets, buffer, &settings)?;
        for (mesh, file_name) in &settings.level.mesh_textures {
            resources::load_texture(&mut assets, mesh, file_name).await?;
        }
        let level = RollLevel::new(&file, scene_file, &assets, &roll, &settings)?;

        ctx.clear_colour = settings.render.clear_colour;
        let mut renderer = Renderer::new(ctx, &assets, settings.render.clone())?;
        renderer.prepare(ctx, &level.scene);
        Ok(Self {
            mode: RollMode::new(level, settings.physics, &settings.render),
            renderer,
        })
    }
}

impl GameMode for RollGame {
    fn handle_event(&mut self, _ctx: &Context, event: &WindowEvent) -> bool {
        let WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    physical_key: PhysicalKey::Code(code),
                    state,
                    repeat,
                    ..
                },
            ..
        } = event
        else {
            return false;
        };
        if let Some(direction) = direction_for(*code) {
            self.mode.controls.set(direction, state.is_pressed());
            return true;
        }
        if !state.is_pressed() || *repeat {
            return false;
        }
        match code {
            KeyCode::KeyP => {
                let config = self.renderer.config_mut();
                config.use_postprocessing = !config.use_postprocessing;
                log::info!("Post-processing {}.", if config.use_postprocessing { "on" } else { "off" });
                true
            }
            KeyCode::Backspace => {
                self.mode.restart();
                true
            }
            _ => false,
        }
    }

    fn update(&mut self, _ctx: &Context, elapsed: f32) {
        self.mode.update(elapsed);
    }

    fn draw(&mut self, ctx: &Context, view: &wgpu::TextureView) {
        let level = &self.mode.level;
        self.renderer.draw(ctx, &level.scene, level.camera, view);
    }

    fn resize(&mut self, ctx: &Context, size: [u32; 2]) {
        self.renderer.resize(ctx, size);
    }
}
