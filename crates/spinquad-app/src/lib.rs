//! Windowed frame loop for the spinquad renderer.
//!
//! This crate handles:
//! - Window creation and the winit event loop
//! - Building the [`QuadRenderer`] and its GPU resources
//! - The K-frames-in-flight protocol in [`FrameLoop`]
//! - Swapchain recreation on resize, staleness and minimization
//!
//! # Example
//!
//! ```no_run
//! use spinquad_app::{run_app, AppConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     run_app(AppConfig::new("spinquad").with_vsync(true))
//! }
//! ```

mod assets;
mod frame;
mod frame_loop;
mod renderer;
mod runner;

pub use assets::{decode_rgba8, load_rgba8, DecodedImage};
pub use frame_loop::{FrameBackend, FrameLoop, FrameStatus};
pub use renderer::QuadRenderer;
pub use runner::{run_app, AppConfig};

pub use spinquad_gpu::{GpuConfig, GpuError};
