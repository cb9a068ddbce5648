//! The textured quad renderer.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use spinquad_core::{quad_transform, TransformParams, Vertex, QUAD_FRONT_FACE, QUAD_INDICES, QUAD_VERTICES};
use spinquad_gpu::command::{begin_command_buffer, end_command_buffer, submit_command_buffer};
use spinquad_gpu::{
    load_shader, upload_to_device_local, AcquireOutcome, Buffer, CommandPool, DescriptorPool,
    DescriptorSetLayout, DescriptorSetLayoutBuilder, GpuContext, GpuError, GraphicsPipeline,
    GraphicsPipelineConfig, Instance, PresentOutcome, RenderPass, Surface, Swapchain, Texture,
};
use tracing::{error, info};

use crate::assets::load_rgba8;
use crate::frame::FrameSlot;
use crate::frame_loop::FrameBackend;
use crate::runner::AppConfig;

/// Owns every Vulkan object needed to draw the spinning quad.
///
/// Fields are declared in reverse creation order so that dropping the
/// renderer tears everything down child-first.
pub struct QuadRenderer {
    frames: Vec<FrameSlot>,
    _descriptor_pool: DescriptorPool,
    index_buffer: Buffer,
    vertex_buffer: Buffer,
    _texture: Texture,
    _transfer_pool: CommandPool,
    _graphics_pool: CommandPool,
    pipeline: GraphicsPipeline,
    _descriptor_layout: DescriptorSetLayout,
    render_pass: RenderPass,
    swapchain: Swapchain,
    gpu: Arc<GpuContext>,
    surface: Arc<Surface>,
    _instance: Arc<Instance>,
    index_count: u32,
    transform: TransformParams,
    clear_color: [f32; 4],
    fence_timeout: Duration,
    vsync: bool,
}

impl QuadRenderer {
    /// Build the renderer for `window`.
    ///
    /// On failure everything created so far is released in reverse order.
    pub fn new<W>(window: &W, framebuffer_size: (u32, u32), config: &AppConfig) -> anyhow::Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?
            .as_raw();

        let instance = Arc::new(
            Instance::new(&config.gpu, Some(display)).context("failed to create Vulkan instance")?,
        );
        let surface = Arc::new(
            Surface::from_window(&instance, window).context("failed to create window surface")?,
        );
        let gpu = Arc::new(
            GpuContext::new(&instance, Some(&surface), &config.gpu)
                .context("failed to open a GPU")?,
        );
        info!("GPU: {}", gpu.candidate().summary());

        let vsync = config.gpu.vsync_enabled();
        let mut swapchain = Swapchain::new(&gpu, &surface, framebuffer_size, vsync)?;
        let render_pass = RenderPass::new(&gpu, swapchain.format())?;
        swapchain.create_framebuffers(render_pass.handle())?;

        let layout_builder = DescriptorSetLayoutBuilder::new()
            .uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
            .sampled_image(1, vk::ShaderStageFlags::FRAGMENT);
        let descriptor_layout = layout_builder.build(&gpu)?;

        let pipeline_config = GraphicsPipelineConfig {
            vertex_shader: load_shader(&config.vertex_shader)?,
            fragment_shader: load_shader(&config.fragment_shader)?,
            vertex_bindings: vec![Vertex::binding_description()],
            vertex_attributes: Vertex::attribute_descriptions().to_vec(),
            front_face: QUAD_FRONT_FACE,
            ..Default::default()
        };
        let pipeline = GraphicsPipeline::new(
            &gpu,
            &pipeline_config,
            &render_pass,
            &[descriptor_layout.handle()],
        )?;

        let graphics_pool = CommandPool::new(
            &gpu,
            gpu.graphics_queue_family(),
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
        )?;
        let transfer_pool = CommandPool::new(
            &gpu,
            gpu.transfer_queue_family(),
            vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER | vk::CommandPoolCreateFlags::TRANSIENT,
        )?;

        let image = load_rgba8(&config.texture)?;
        // The last barrier targets the fragment stage, so this runs on graphics
        let texture = Texture::from_rgba8(
            &graphics_pool,
            gpu.graphics_queue(),
            image.width,
            image.height,
            &image.pixels,
        )?;

        let vertex_buffer = upload_to_device_local(
            &transfer_pool,
            gpu.transfer_queue(),
            bytemuck::cast_slice(&QUAD_VERTICES),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buffer = upload_to_device_local(
            &transfer_pool,
            gpu.transfer_queue(),
            bytemuck::cast_slice(&QUAD_INDICES),
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;

        let frame_count = config.frames_in_flight.max(1);
        let slots = u32::try_from(frame_count).context("too many frames in flight")?;
        let descriptor_pool =
            DescriptorPool::new(&gpu, slots, &layout_builder.pool_sizes(slots))?;
        let descriptor_sets = descriptor_pool.allocate(&vec![descriptor_layout.handle(); frame_count])?;
        let command_buffers = graphics_pool.allocate_command_buffers(slots)?;

        let frames = command_buffers
            .into_iter()
            .zip(descriptor_sets)
            .map(|(cmd, set)| FrameSlot::new(&gpu, cmd, set, &texture))
            .collect::<spinquad_gpu::Result<Vec<_>>>()?;

        info!(
            "Renderer ready: {} frames in flight, {} swapchain images",
            frames.len(),
            swapchain.image_count()
        );

        Ok(Self {
            frames,
            _descriptor_pool: descriptor_pool,
            index_buffer,
            vertex_buffer,
            _texture: texture,
            _transfer_pool: transfer_pool,
            _graphics_pool: graphics_pool,
            pipeline,
            _descriptor_layout: descriptor_layout,
            render_pass,
            swapchain,
            gpu,
            surface,
            _instance: instance,
            index_count: QUAD_INDICES.len() as u32,
            transform: config.transform,
            clear_color: config.clear_color,
            fence_timeout: config.fence_timeout,
            vsync,
        })
    }

    /// Width over height of the current swapchain.
    pub fn aspect_ratio(&self) -> f32 {
        let extent = self.swapchain.extent();
        extent.width as f32 / extent.height.max(1) as f32
    }

    fn slot(&self, slot: usize) -> spinquad_gpu::Result<&FrameSlot> {
        self.frames
            .get(slot)
            .ok_or_else(|| GpuError::InvalidState(format!("frame slot {slot} does not exist")))
    }
}

impl FrameBackend for QuadRenderer {
    fn frames_in_flight(&self) -> usize {
        self.frames.len()
    }

    fn wait_for_frame(&mut self, slot: usize) -> spinquad_gpu::Result<()> {
        self.slot(slot)?.sync.wait(self.fence_timeout)
    }

    fn acquire_image(&mut self, slot: usize) -> spinquad_gpu::Result<AcquireOutcome> {
        let semaphore = self.slot(slot)?.sync.image_available;
        self.swapchain.acquire_next_image(semaphore)
    }

    fn reset_frame_fence(&mut self, slot: usize) -> spinquad_gpu::Result<()> {
        self.slot(slot)?.sync.reset()
    }

    fn record_frame(&mut self, slot: usize, image_index: u32) -> spinquad_gpu::Result<()> {
        let cmd = self.slot(slot)?.command_buffer;
        let descriptor_set = self.slot(slot)?.descriptor_set;
        let framebuffer = self.swapchain.framebuffer(image_index).ok_or_else(|| {
            GpuError::InvalidState(format!("no framebuffer for swapchain image {image_index}"))
        })?;
        let extent = self.swapchain.extent();
        let device = self.gpu.device();

        let render_area = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.clear_color,
            },
        }];
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        unsafe {
            device.reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())?;
            begin_command_buffer(device, cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;

            let begin_info = vk::RenderPassBeginInfo::default()
                .render_pass(self.render_pass.handle())
                .framebuffer(framebuffer)
                .render_area(render_area)
                .clear_values(&clear_values);
            device.cmd_begin_render_pass(cmd, &begin_info, vk::SubpassContents::INLINE);

            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipeline.handle());
            device.cmd_bind_vertex_buffers(cmd, 0, &[self.vertex_buffer.handle()], &[0]);
            device.cmd_bind_index_buffer(cmd, self.index_buffer.handle(), 0, vk::IndexType::UINT16);

            // Dynamic state does not survive a reset
            device.cmd_set_viewport(cmd, 0, &[viewport]);
            device.cmd_set_scissor(cmd, 0, &[render_area]);

            device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.layout(),
                0,
                &[descriptor_set],
                &[],
            );
            device.cmd_draw_indexed(cmd, self.index_count, 1, 0, 0, 0);

            device.cmd_end_render_pass(cmd);
            end_command_buffer(device, cmd)?;
        }

        Ok(())
    }

    fn update_uniforms(&mut self, slot: usize, elapsed: Duration) -> spinquad_gpu::Result<()> {
        let ubo = quad_transform(&self.transform, elapsed, self.aspect_ratio());
        let frame = self
            .frames
            .get_mut(slot)
            .ok_or_else(|| GpuError::InvalidState(format!("frame slot {slot} does not exist")))?;
        frame.uniforms.write(&ubo);
        Ok(())
    }

    fn submit_frame(&mut self, slot: usize) -> spinquad_gpu::Result<()> {
        let frame = self.slot(slot)?;
        unsafe {
            submit_command_buffer(
                self.gpu.device(),
                self.gpu.graphics_queue(),
                frame.command_buffer,
                &[frame.sync.image_available],
                &[vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT],
                &[frame.sync.render_finished],
                frame.sync.in_flight,
            )
        }
    }

    fn present_image(&mut self, slot: usize, image_index: u32) -> spinquad_gpu::Result<PresentOutcome> {
        let render_finished = self.slot(slot)?.sync.render_finished;
        self.swapchain.present(image_index, &[render_finished])
    }

    fn wait_idle(&mut self) -> spinquad_gpu::Result<()> {
        self.gpu.wait_idle()
    }

    fn recreate_swapchain(&mut self, width: u32, height: u32) -> spinquad_gpu::Result<()> {
        self.swapchain.release();

        let mut swapchain = Swapchain::new(&self.gpu, &self.surface, (width, height), self.vsync)?;
        if swapchain.format() != self.render_pass.format() {
            return Err(GpuError::SwapchainCreation(format!(
                "surface format changed from {:?} to {:?}",
                self.render_pass.format(),
                swapchain.format()
            )));
        }
        swapchain.create_framebuffers(self.render_pass.handle())?;
        self.swapchain = swapchain;

        Ok(())
    }
}

impl Drop for QuadRenderer {
    fn drop(&mut self) {
        if let Err(e) = self.gpu.wait_idle() {
            error!("Failed to wait idle before teardown: {e}");
        }
    }
}
