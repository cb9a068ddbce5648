//! Application runner and event loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use spinquad_core::constants::{DEFAULT_HEIGHT, DEFAULT_WIDTH, MAX_FRAMES_IN_FLIGHT};
use spinquad_core::TransformParams;
use spinquad_gpu::GpuConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::frame_loop::{FrameBackend, FrameLoop, FrameStatus};
use crate::renderer::QuadRenderer;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Instance, device and swapchain settings.
    pub gpu: GpuConfig,
    /// Frames the CPU may record ahead of the GPU.
    pub frames_in_flight: usize,
    /// Longest wait on a frame fence before giving up.
    pub fence_timeout: Duration,
    /// SPIR-V vertex shader.
    pub vertex_shader: PathBuf,
    /// SPIR-V fragment shader.
    pub fragment_shader: PathBuf,
    /// Image sampled by the fragment shader.
    pub texture: PathBuf,
    /// RGBA clear color.
    pub clear_color: [f32; 4],
    /// Camera and spin speed.
    pub transform: TransformParams,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "spinquad".to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            gpu: GpuConfig::default(),
            frames_in_flight: MAX_FRAMES_IN_FLIGHT,
            fence_timeout: Duration::from_secs(10),
            vertex_shader: PathBuf::from("shaders/vert.spv"),
            fragment_shader: PathBuf::from("shaders/frag.spv"),
            texture: PathBuf::from("textures/texture.png"),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            transform: TransformParams::default(),
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            gpu: GpuConfig::default().app_name(title.clone()),
            title,
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_gpu(mut self, gpu: GpuConfig) -> Self {
        self.gpu = gpu;
        self
    }

    /// Enable or disable vsync.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.gpu = self.gpu.vsync(vsync);
        self
    }

    /// Enable or disable validation layers.
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.gpu = self.gpu.validation(validation);
        self
    }

    /// Set the number of frames in flight (at least one).
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames.max(1);
        self
    }

    pub fn with_fence_timeout(mut self, timeout: Duration) -> Self {
        self.fence_timeout = timeout;
        self
    }

    /// Set the vertex and fragment SPIR-V files.
    pub fn with_shaders(mut self, vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        self.vertex_shader = vertex.into();
        self.fragment_shader = fragment.into();
        self
    }

    pub fn with_texture(mut self, path: impl Into<PathBuf>) -> Self {
        self.texture = path.into();
        self
    }

    pub fn with_clear_color(mut self, rgba: [f32; 4]) -> Self {
        self.clear_color = rgba;
        self
    }

    pub fn with_transform(mut self, transform: TransformParams) -> Self {
        self.transform = transform;
        self
    }
}

/// Open a window and spin the quad until it is closed.
///
/// This function initializes logging, creates the window and renderer, and
/// runs the event loop. A setup or rendering failure stops the loop, tears
/// the renderer down and is returned.
pub fn run_app(config: AppConfig) -> anyhow::Result<()> {
    // The embedding program may already have installed a subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    info!("{} starting...", config.title);

    let event_loop = EventLoop::new().context("failed to create event loop")?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut runner = AppRunner {
        config,
        state: None,
        error: None,
    };

    event_loop
        .run_app(&mut runner)
        .context("event loop error")?;

    runner.error.map_or(Ok(()), Err)
}

/// Internal application runner that implements winit's ApplicationHandler.
struct AppRunner {
    config: AppConfig,
    state: Option<AppState>,
    error: Option<anyhow::Error>,
}

/// Internal application state. The renderer is dropped before the window
/// its surface was created from.
struct AppState {
    frames: FrameLoop,
    renderer: QuadRenderer,
    window: Arc<Window>,
    minimized: bool,
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        info!("Creating application state...");

        match self.create_state(event_loop) {
            Ok(state) => {
                self.state = Some(state);
                info!("Application ready!");
            }
            Err(e) => self.fail(event_loop, e.context("failed to initialize application")),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                if let Some(state) = self.state.take() {
                    if let Err(e) = state.shutdown() {
                        self.error = Some(e);
                    }
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(state) = &mut self.state {
                    state.frames.notify_resized();
                    state.minimized = size.width == 0 || size.height == 0;
                    if state.minimized {
                        // Sleep until the next event instead of spinning
                        event_loop.set_control_flow(ControlFlow::Wait);
                    } else {
                        event_loop.set_control_flow(ControlFlow::Poll);
                        state.window.request_redraw();
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                let Some(state) = &mut self.state else {
                    return;
                };
                match state.render_frame() {
                    Ok(FrameStatus::Deferred) => {
                        state.minimized = true;
                        event_loop.set_control_flow(ControlFlow::Wait);
                    }
                    Ok(_) => {}
                    Err(e) => self.fail(event_loop, e),
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            if !state.minimized {
                state.window.request_redraw();
            }
        }
    }
}

impl AppRunner {
    fn create_state(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<AppState> {
        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .context("failed to create window")?,
        );

        let size = window.inner_size();
        let renderer = QuadRenderer::new(window.as_ref(), (size.width, size.height), &self.config)?;
        let frames = FrameLoop::new(renderer.frames_in_flight());

        Ok(AppState {
            frames,
            renderer,
            window,
            minimized: false,
        })
    }

    /// Record a fatal error, tear the renderer down and stop the loop.
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        error!("{err:#}");
        if let Some(state) = self.state.take() {
            if let Err(e) = state.shutdown() {
                error!("Shutdown after failure also failed: {e:#}");
            }
        }
        self.error = Some(err);
        event_loop.exit();
    }
}

impl AppState {
    fn render_frame(&mut self) -> anyhow::Result<FrameStatus> {
        let size = self.window.inner_size();
        let status = self
            .frames
            .draw_frame(&mut self.renderer, (size.width, size.height))?;
        Ok(status)
    }

    /// Drain the GPU, then drop the renderer in reverse creation order.
    fn shutdown(mut self) -> anyhow::Result<()> {
        info!("Starting cleanup...");
        self.frames.shutdown(&mut self.renderer)?;
        drop(self);
        info!("Cleanup complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_window_and_asset_layout() {
        let config = AppConfig::default();
        assert_eq!((config.width, config.height), (800, 600));
        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.fence_timeout, Duration::from_secs(10));
        assert_eq!(config.vertex_shader, PathBuf::from("shaders/vert.spv"));
        assert_eq!(config.fragment_shader, PathBuf::from("shaders/frag.spv"));
        assert_eq!(config.texture, PathBuf::from("textures/texture.png"));
        assert_eq!(config.clear_color, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn title_names_the_vulkan_application() {
        let config = AppConfig::new("demo");
        assert_eq!(config.title, "demo");
        assert_eq!(config.gpu.name(), "demo");
    }

    #[test]
    fn builder_overrides() {
        let config = AppConfig::new("demo")
            .with_size(1024, 768)
            .with_vsync(true)
            .with_validation(false)
            .with_frames_in_flight(0)
            .with_fence_timeout(Duration::from_millis(250))
            .with_shaders("a.spv", "b.spv")
            .with_texture("t.png")
            .with_clear_color([0.1, 0.2, 0.3, 1.0]);

        assert_eq!((config.width, config.height), (1024, 768));
        assert!(config.gpu.vsync_enabled());
        assert!(!config.gpu.validation_enabled());
        assert_eq!(config.frames_in_flight, 1);
        assert_eq!(config.fence_timeout, Duration::from_millis(250));
        assert_eq!(config.vertex_shader, PathBuf::from("a.spv"));
        assert_eq!(config.fragment_shader, PathBuf::from("b.spv"));
        assert_eq!(config.texture, PathBuf::from("t.png"));
        assert_eq!(config.clear_color, [0.1, 0.2, 0.3, 1.0]);
    }
}
