//! Application event loop.
//!
//! The scene is static, so the loop is small: the window and GPU context are
//! created when the application is resumed, every redraw renders the scene and
//! immediately asks for the next frame, resizes reconfigure the surface and a
//! close request ends the loop.
//!
//! # Lifecycle
//!
//! 1. [`run`] loads the scene description (a broken scene is fatal)
//! 2. `resumed` opens the window and builds the [`SceneRenderer`]
//! 3. `RedrawRequested` renders a frame, recovering from lost surfaces
//! 4. `CloseRequested` exits

use std::sync::Arc;

use anyhow::Context as _;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    config::AppConfig, context::Context, render::SceneRenderer, scene::SceneDescription,
};

/// Window-bound state, alive between `resumed` and exit.
#[derive(Debug)]
struct AppState {
    ctx: Context,
    renderer: SceneRenderer,
    is_surface_configured: bool,
}

impl AppState {
    fn new(
        runtime: &tokio::runtime::Runtime,
        window: Arc<Window>,
        config: &AppConfig,
        scene: SceneDescription,
    ) -> anyhow::Result<Self> {
        let ctx = runtime.block_on(Context::new(window, config.clear_color()))?;
        let renderer = SceneRenderer::new(&ctx, scene, config.camera, &config.asset_root);
        Ok(Self {
            ctx,
            renderer,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();
        if !self.is_surface_configured {
            return Ok(());
        }
        self.renderer.render(&self.ctx)
    }
}

pub struct App {
    runtime: tokio::runtime::Runtime,
    config: AppConfig,
    scene: Option<SceneDescription>,
    state: Option<AppState>,
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(config: AppConfig, scene: SceneDescription) -> anyhow::Result<Self> {
        // wgpu setup is async; a single-threaded runtime drives it to completion
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .context("could not start the async runtime")?;
        Ok(Self {
            runtime,
            config,
            scene: Some(scene),
            state: None,
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // the scene is handed over on the first resume only
        let Some(scene) = self.scene.take() else {
            return;
        };

        let window_attributes = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, anyhow::Error::new(e).context("could not open a window")),
        };

        match AppState::new(&self.runtime, window, &self.config, scene) {
            Ok(mut state) => {
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
                state.ctx.window.request_redraw();
                self.state = Some(state);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => match state.render() {
                Ok(_) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let size = state.ctx.window.inner_size();
                    state.resize(size.width, size.height);
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    self.fail(event_loop, anyhow::anyhow!("the GPU ran out of memory"));
                }
                Err(e) => {
                    log::error!("Unable to render {}", e);
                }
            },
            _ => {}
        }
    }
}

/// Loads the scene named by `config` and shows it until the window is closed.
pub fn run(config: AppConfig) -> anyhow::Result<()> {
    let scene_path = config.scene_path();
    let scene = SceneDescription::load(&scene_path)
        .with_context(|| format!("could not load the scene from {}", scene_path.display()))?;

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, scene)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
