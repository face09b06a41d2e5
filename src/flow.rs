//! Application event loop.
//!
//! The loop owns one [`GameMode`]. Each frame it hands window events to the
//! mode, then calls `update` with the elapsed time and `draw` with the surface
//! texture, in that order. Nothing from one frame overlaps the next.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window and the [`Context`], then awaits the mode constructor
//! 2. `window_event` forwards input, handles resizes and drives redraws
//! 3. every redraw calls [`GameMode::update`] and [`GameMode::draw`] and presents

use std::{pin::Pin, sync::Arc};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::KeyCode,
    window::Window,
};

use crate::context::Context;

/// One of the four steering inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

/// WASD and the arrow keys.
pub fn direction_for(key: KeyCode) -> Option<Direction> {
    match key {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(Direction::Forward),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(Direction::Backward),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(Direction::Left),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(Direction::Right),
        _ => None,
    }
}

/// A running game: reacts to input, advances its simulation, draws frames.
pub trait GameMode {
    /// Returns `true` if the event was consumed.
    fn handle_event(&mut self, ctx: &Context, event: &WindowEvent) -> bool;

    /// Advances the simulation by `elapsed` seconds.
    fn update(&mut self, ctx: &Context, elapsed: f32);

    fn draw(&mut self, ctx: &Context, view: &wgpu::TextureView);

    /// Called once per surface resize, never per frame.
    fn resize(&mut self, ctx: &Context, size: [u32; 2]);
}

/// Builds the game mode once the GPU context exists. The context is handed
/// back together with the mode.
pub type ModeConstructor = Box<
    dyn FnOnce(Context) -> Pin<Box<dyn Future<Output = anyhow::Result<(Context, Box<dyn GameMode>)>>>>,
>;

struct AppState {
    ctx: Context,
    mode: Box<dyn GameMode>,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, constructor: ModeConstructor) -> Self {
        let ctx = match Context::new(window).await {
            Ok(ctx) => ctx,
            Err(e) => panic!(
                "App initialization failed. Cannot create the main context: {}",
                e
            ),
        };
        let (ctx, mode) = match constructor(ctx).await {
            Ok(loaded) => loaded,
            Err(e) => panic!("App initialization failed. Cannot load the game: {:#}", e),
        };
        Self {
            ctx,
            mode,
            is_surface_configured: false,
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
            self.mode.resize(&self.ctx, [width, height]);
        }
    }

    fn render(&mut self, elapsed: f32) -> Result<(), wgpu::SurfaceError> {
        if let Some(window) = self.ctx.window() {
            window.request_redraw();
        }

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }
        let Some(surface) = &self.ctx.surface else {
            return Ok(());
        };
        let output = surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.mode.update(&self.ctx, elapsed);
        self.mode.draw(&self.ctx, &view);
        output.present();
        Ok(())
    }
}

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    state: Option<AppState>,
    // taken on first resume
    constructor: Option<ModeConstructor>,
    last_time: Instant,
}

impl App {
    fn new(constructor: ModeConstructor) -> anyhow::Result<Self> {
        Ok(Self {
            async_runtime: tokio::runtime::Runtime::new()?,
            state: None,
            constructor: Some(constructor),
            last_time: Instant::now(),
        })
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructor) = self.constructor.take() else {
            return;
        };
        let window = match event_loop.create_window(Window::default_attributes().with_title("roll")) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let mut state = self.async_runtime.block_on(AppState::new(window, constructor));
        let size = state.ctx.size();
        state.resize(size[0], size[1]);
        self.state = Some(state);
        self.last_time = Instant::now();
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        if state.mode.handle_event(&state.ctx, &event) {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                match state.render(dt.as_secs_f32()) {
                    Ok(()) => (),
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let [width, height] = state.ctx.size();
                        state.resize(width, height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

pub fn run(constructor: ModeConstructor) -> anyhow::Result<()> {
    if let Err(e) = env_logger::try_init() {
        println!("Warning: Could not initialize logger: {}", e);
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(constructor)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
