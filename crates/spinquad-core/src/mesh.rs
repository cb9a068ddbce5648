//! The textured quad.

use crate::vertex::Vertex;
use ash::vk;
use glam::{Vec2, Vec3};

/// Four corners of a unit quad centred on the origin in the XY plane.
pub const QUAD_VERTICES: [Vertex; 4] = [
    Vertex::new(Vec2::new(-0.5, -0.5), Vec3::new(1.0, 0.0, 0.0), Vec2::new(1.0, 0.0)),
    Vertex::new(Vec2::new(0.5, -0.5), Vec3::new(0.0, 1.0, 0.0), Vec2::new(0.0, 0.0)),
    Vertex::new(Vec2::new(0.5, 0.5), Vec3::new(0.0, 0.0, 1.0), Vec2::new(0.0, 1.0)),
    Vertex::new(Vec2::new(-0.5, 0.5), Vec3::new(1.0, 1.0, 1.0), Vec2::new(1.0, 1.0)),
];

/// Two triangles, `(0, 1, 2)` and `(2, 3, 0)`.
pub const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

/// Winding of [`QUAD_INDICES`] in framebuffer space once projected through
/// [`crate::quad_transform`] (which flips Y for Vulkan clip space).
pub const QUAD_FRONT_FACE: vk::FrontFace = vk::FrontFace::COUNTER_CLOCKWISE;
