//! Per-frame uniform data and the quad's spin transform.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::time::Duration;

/// Model, view and projection matrices, column-major, std140 compatible.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct UniformBufferObject {
    pub model: Mat4,
    pub view: Mat4,
    pub proj: Mat4,
}

/// Camera and animation parameters for [`quad_transform`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TransformParams {
    /// Rotation speed about +Z, in degrees per second.
    pub degrees_per_second: f32,
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view, in degrees.
    pub fov_y_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for TransformParams {
    fn default() -> Self {
        Self {
            degrees_per_second: 90.0,
            eye: Vec3::splat(2.0),
            target: Vec3::ZERO,
            up: Vec3::Z,
            fov_y_degrees: 45.0,
            z_near: 0.1,
            z_far: 10.0,
        }
    }
}

/// Compute the uniforms for `elapsed` time since start at the given
/// swapchain aspect ratio.
///
/// The projection has its Y axis flipped so that +Y points up on screen in
/// Vulkan's downward clip space.
pub fn quad_transform(params: &TransformParams, elapsed: Duration, aspect: f32) -> UniformBufferObject {
    let angle = (elapsed.as_secs_f32() * params.degrees_per_second).to_radians();
    let model = Mat4::from_rotation_z(angle);
    let view = Mat4::look_at_rh(params.eye, params.target, params.up);
    let mut proj = Mat4::perspective_rh(
        params.fov_y_degrees.to_radians(),
        aspect,
        params.z_near,
        params.z_far,
    );
    proj.y_axis.y *= -1.0;

    UniformBufferObject { model, view, proj }
}
