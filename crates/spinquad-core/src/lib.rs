//! Plain data shared between the CPU side and the shaders of the spinquad
//! renderer.
//!
//! This crate provides:
//! - The interleaved [`Vertex`] layout and its Vulkan input descriptions
//! - The [`UniformBufferObject`] uploaded once per frame
//! - The textured quad mesh and its winding

pub mod mesh;
pub mod uniforms;
pub mod vertex;

pub use mesh::{QUAD_FRONT_FACE, QUAD_INDICES, QUAD_VERTICES};
pub use uniforms::{quad_transform, TransformParams, UniformBufferObject};
pub use vertex::Vertex;

/// Renderer-wide constants
pub mod constants {
    /// Default window width in pixels
    pub const DEFAULT_WIDTH: u32 = 800;
    /// Default window height in pixels
    pub const DEFAULT_HEIGHT: u32 = 600;
    /// Default number of frames the CPU may record ahead of the GPU
    pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
}
