//! Frame pacing state machine.
//!
//! [`FrameLoop`] owns the slot counter and the swapchain rebuild policy. The
//! device work behind each protocol step goes through a [`FrameBackend`], so
//! the ordering rules can be exercised without a GPU.

use std::time::{Duration, Instant};

use spinquad_gpu::{AcquireOutcome, PresentOutcome, Result};
use tracing::{debug, info};

/// Device operations driven by [`FrameLoop`], one method per protocol step.
///
/// `slot` is always in `0..frames_in_flight()`.
pub trait FrameBackend {
    /// Number of frame slots, K.
    fn frames_in_flight(&self) -> usize;

    /// Block until the slot's fence signals.
    fn wait_for_frame(&mut self, slot: usize) -> Result<()>;

    /// Acquire the next swapchain image, signaling the slot's image-available
    /// semaphore when it succeeds.
    fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome>;

    fn reset_frame_fence(&mut self, slot: usize) -> Result<()>;

    /// Reset and re-record the slot's command buffer against `image_index`.
    fn record_frame(&mut self, slot: usize, image_index: u32) -> Result<()>;

    /// Write the slot's uniform buffer for the time since start-up.
    fn update_uniforms(&mut self, slot: usize, elapsed: Duration) -> Result<()>;

    /// Submit the slot's command buffer. Waits on image-available, signals
    /// render-finished and the slot's fence.
    fn submit_frame(&mut self, slot: usize) -> Result<()>;

    /// Present `image_index` once the slot's render-finished semaphore fires.
    fn present_image(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome>;

    fn wait_idle(&mut self) -> Result<()>;

    /// Release framebuffers, views and the swapchain, then build them again
    /// for a non-zero drawable size.
    fn recreate_swapchain(&mut self, width: u32, height: u32) -> Result<()>;
}

/// What one call to [`FrameLoop::draw_frame`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame was submitted and presented.
    Presented,
    /// The swapchain was rebuilt during this call.
    SwapchainRebuilt,
    /// The drawable is zero-sized; nothing was drawn or rebuilt.
    Deferred,
}

/// Slot counter and swapchain rebuild policy for K frames in flight.
#[derive(Debug)]
pub struct FrameLoop {
    frames_in_flight: usize,
    current_frame: usize,
    frames_drawn: u64,
    swapchain_rebuilds: u64,
    resize_pending: bool,
    start: Instant,
}

impl FrameLoop {
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            frames_in_flight: frames_in_flight.max(1),
            current_frame: 0,
            frames_drawn: 0,
            swapchain_rebuilds: 0,
            resize_pending: false,
            start: Instant::now(),
        }
    }

    pub fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    /// Slot the next frame will use.
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    pub fn swapchain_rebuilds(&self) -> u64 {
        self.swapchain_rebuilds
    }

    pub fn resize_pending(&self) -> bool {
        self.resize_pending
    }

    /// Record that the window was resized; the swapchain is rebuilt after
    /// the next present.
    pub fn notify_resized(&mut self) {
        self.resize_pending = true;
    }

    /// Run one iteration of the frame protocol for the current slot.
    pub fn draw_frame<B>(&mut self, backend: &mut B, framebuffer_size: (u32, u32)) -> Result<FrameStatus>
    where
        B: FrameBackend + ?Sized,
    {
        if is_zero_sized(framebuffer_size) {
            self.resize_pending = true;
            return Ok(FrameStatus::Deferred);
        }

        let slot = self.current_frame;
        backend.wait_for_frame(slot)?;

        let (image_index, acquired_suboptimal) = match backend.acquire_image(slot)? {
            AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            } => (image_index, suboptimal),
            AcquireOutcome::OutOfDate => {
                debug!("Swapchain out of date on acquire");
                return self.recreate_swapchain(backend, framebuffer_size);
            }
        };

        // Only after a successful acquire, or the next wait never returns
        backend.reset_frame_fence(slot)?;
        backend.record_frame(slot, image_index)?;
        backend.update_uniforms(slot, self.start.elapsed())?;
        backend.submit_frame(slot)?;
        let presented = backend.present_image(slot, image_index)?;
        self.frames_drawn += 1;

        let status = if presented.needs_rebuild() || acquired_suboptimal || self.resize_pending {
            debug!(
                "Rebuilding swapchain after present ({presented:?}, resize pending: {})",
                self.resize_pending
            );
            self.recreate_swapchain(backend, framebuffer_size)?
        } else {
            FrameStatus::Presented
        };

        self.current_frame = (self.current_frame + 1) % self.frames_in_flight;
        Ok(status)
    }

    /// Rebuild the swapchain, or defer while the drawable is zero-sized.
    pub fn recreate_swapchain<B>(&mut self, backend: &mut B, framebuffer_size: (u32, u32)) -> Result<FrameStatus>
    where
        B: FrameBackend + ?Sized,
    {
        if is_zero_sized(framebuffer_size) {
            self.resize_pending = true;
            return Ok(FrameStatus::Deferred);
        }

        backend.wait_idle()?;
        backend.recreate_swapchain(framebuffer_size.0, framebuffer_size.1)?;
        self.swapchain_rebuilds += 1;
        self.resize_pending = false;

        info!(
            "Swapchain recreated: {}x{}",
            framebuffer_size.0, framebuffer_size.1
        );
        Ok(FrameStatus::SwapchainRebuilt)
    }

    /// Wait for the device to finish every frame in flight.
    pub fn shutdown<B>(&mut self, backend: &mut B) -> Result<()>
    where
        B: FrameBackend + ?Sized,
    {
        backend.wait_idle()?;
        info!(
            "Frame loop stopped: {} frames drawn, {} swapchain rebuilds",
            self.frames_drawn, self.swapchain_rebuilds
        );
        Ok(())
    }
}

fn is_zero_sized((width, height): (u32, u32)) -> bool {
    width == 0 || height == 0
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use ash::vk;
    use spinquad_core::constants::MAX_FRAMES_IN_FLIGHT;
    use spinquad_gpu::swapchain::choose_image_count;
    use spinquad_gpu::{
        select_best_candidate, DeviceCandidate, DeviceRequirements, GpuError, GpuVendor,
        QueueFamilyIndices, SwapchainSupport,
    };

    use super::*;

    const SIZE: (u32, u32) = (800, 600);

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Wait(usize),
        Acquire(usize),
        Reset(usize),
        Record(usize, u32),
        Uniforms(usize),
        Submit(usize),
        Present(usize, u32),
        WaitIdle,
        Recreate(u32, u32),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Fence {
        Signaled,
        Unsignaled,
        /// Submitted; signals once the device gets to it.
        Pending,
    }

    /// In-memory device that rejects any call breaking the frame protocol.
    struct MockBackend {
        fences: Vec<Fence>,
        image_available: Vec<bool>,
        render_finished: Vec<bool>,
        image_count: u32,
        next_image: u32,
        live_swapchains: usize,
        live_views: usize,
        idle: bool,
        hung: bool,
        max_in_flight: usize,
        acquire_script: VecDeque<AcquireOutcome>,
        present_script: VecDeque<PresentOutcome>,
        calls: Vec<Call>,
    }

    fn violation(message: impl Into<String>) -> GpuError {
        GpuError::InvalidState(message.into())
    }

    impl MockBackend {
        fn new(frames: usize, image_count: u32) -> Self {
            Self {
                fences: vec![Fence::Signaled; frames],
                image_available: vec![false; frames],
                render_finished: vec![false; frames],
                image_count,
                next_image: 0,
                live_swapchains: 1,
                live_views: image_count as usize,
                idle: true,
                hung: false,
                max_in_flight: 0,
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                calls: Vec::new(),
            }
        }

        fn in_flight(&self) -> usize {
            self.fences.iter().filter(|f| **f == Fence::Pending).count()
        }

        fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
            self.calls.iter().filter(|c| matches(c)).count()
        }
    }

    impl FrameBackend for MockBackend {
        fn frames_in_flight(&self) -> usize {
            self.fences.len()
        }

        fn wait_for_frame(&mut self, slot: usize) -> Result<()> {
            self.calls.push(Call::Wait(slot));
            if self.hung {
                return Err(GpuError::FenceTimeout { timeout_ms: 10 });
            }
            match self.fences[slot] {
                Fence::Signaled => Ok(()),
                Fence::Pending => {
                    self.fences[slot] = Fence::Signaled;
                    Ok(())
                }
                Fence::Unsignaled => Err(violation(format!(
                    "slot {slot} waits on a fence nothing will signal"
                ))),
            }
        }

        fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome> {
            self.calls.push(Call::Acquire(slot));
            let outcome = self
                .acquire_script
                .pop_front()
                .unwrap_or(AcquireOutcome::Acquired {
                    image_index: self.next_image,
                    suboptimal: false,
                });
            if let AcquireOutcome::Acquired { image_index, .. } = outcome {
                if self.image_available[slot] {
                    return Err(violation("image-available signaled twice"));
                }
                self.image_available[slot] = true;
                self.next_image = (image_index + 1) % self.image_count;
            }
            Ok(outcome)
        }

        fn reset_frame_fence(&mut self, slot: usize) -> Result<()> {
            self.calls.push(Call::Reset(slot));
            if self.fences[slot] != Fence::Signaled {
                return Err(violation("reset of a fence that has not signaled"));
            }
            self.fences[slot] = Fence::Unsignaled;
            Ok(())
        }

        fn record_frame(&mut self, slot: usize, image_index: u32) -> Result<()> {
            self.calls.push(Call::Record(slot, image_index));
            if self.fences[slot] == Fence::Pending {
                return Err(violation("recording a buffer the device still reads"));
            }
            if image_index >= self.image_count {
                return Err(violation("image index out of range"));
            }
            Ok(())
        }

        fn update_uniforms(&mut self, slot: usize, _elapsed: Duration) -> Result<()> {
            self.calls.push(Call::Uniforms(slot));
            if self.fences[slot] == Fence::Pending {
                return Err(violation("uniform write while the device reads it"));
            }
            Ok(())
        }

        fn submit_frame(&mut self, slot: usize) -> Result<()> {
            self.calls.push(Call::Submit(slot));
            if self.fences[slot] != Fence::Unsignaled {
                return Err(violation("submit with a fence that was not reset"));
            }
            if !self.image_available[slot] {
                return Err(violation("submit waits on an image that was never acquired"));
            }
            if self.render_finished[slot] {
                return Err(violation("render-finished signaled twice"));
            }
            self.image_available[slot] = false;
            self.render_finished[slot] = true;
            self.fences[slot] = Fence::Pending;
            self.idle = false;
            self.max_in_flight = self.max_in_flight.max(self.in_flight());
            Ok(())
        }

        fn present_image(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
            self.calls.push(Call::Present(slot, image_index));
            if !self.render_finished[slot] {
                return Err(violation("present before rendering finished"));
            }
            self.render_finished[slot] = false;
            Ok(self
                .present_script
                .pop_front()
                .unwrap_or(PresentOutcome::Presented))
        }

        fn wait_idle(&mut self) -> Result<()> {
            self.calls.push(Call::WaitIdle);
            for fence in &mut self.fences {
                if *fence == Fence::Pending {
                    *fence = Fence::Signaled;
                }
            }
            self.idle = true;
            Ok(())
        }

        fn recreate_swapchain(&mut self, width: u32, height: u32) -> Result<()> {
            self.calls.push(Call::Recreate(width, height));
            if !self.idle {
                return Err(violation("swapchain rebuilt while the device is busy"));
            }
            self.release_swapchain()?;
            self.create_swapchain()
        }
    }

    impl MockBackend {
        /// Destroy one swapchain together with its image views.
        fn release_swapchain(&mut self) -> Result<()> {
            self.live_views = self
                .live_views
                .checked_sub(self.image_count as usize)
                .ok_or_else(|| violation("no image views to release"))?;
            self.live_swapchains = self
                .live_swapchains
                .checked_sub(1)
                .ok_or_else(|| violation("no swapchain to release"))?;
            Ok(())
        }

        fn create_swapchain(&mut self) -> Result<()> {
            if self.live_swapchains != 0 || self.live_views != 0 {
                return Err(violation(format!(
                    "swapchain created while {} swapchain(s) and {} view(s) are still live",
                    self.live_swapchains, self.live_views
                )));
            }
            self.live_swapchains = 1;
            self.live_views = self.image_count as usize;
            self.next_image = 0;
            Ok(())
        }
    }

    #[test]
    fn steady_state_keeps_at_most_k_frames_in_flight() {
        let mut backend = MockBackend::new(2, 3);
        let mut frames = FrameLoop::new(backend.frames_in_flight());

        for _ in 0..20 {
            let status = frames.draw_frame(&mut backend, SIZE).unwrap();
            assert_eq!(status, FrameStatus::Presented);
            assert!(backend.in_flight() <= 2);
        }

        assert_eq!(backend.max_in_flight, 2);
        assert_eq!(frames.frames_drawn(), 20);
        assert_eq!(frames.swapchain_rebuilds(), 0);
    }

    #[test]
    fn slots_rotate_modulo_k() {
        let mut backend = MockBackend::new(3, 3);
        let mut frames = FrameLoop::new(3);

        for _ in 0..6 {
            frames.draw_frame(&mut backend, SIZE).unwrap();
        }

        let slots: Vec<usize> = backend
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Submit(slot) => Some(*slot),
                _ => None,
            })
            .collect();
        assert_eq!(slots, vec![0, 1, 2, 0, 1, 2]);
        assert_eq!(frames.current_frame(), 0);
    }

    #[test]
    fn steps_run_in_protocol_order() {
        let mut backend = MockBackend::new(2, 3);
        let mut frames = FrameLoop::new(2);

        frames.draw_frame(&mut backend, SIZE).unwrap();

        assert_eq!(
            backend.calls,
            vec![
                Call::Wait(0),
                Call::Acquire(0),
                Call::Reset(0),
                Call::Record(0, 0),
                Call::Uniforms(0),
                Call::Submit(0),
                Call::Present(0, 0),
            ]
        );
    }

    #[test]
    fn out_of_date_acquire_skips_reset_and_submit() {
        let mut backend = MockBackend::new(2, 3);
        backend.acquire_script.push_back(AcquireOutcome::OutOfDate);
        let mut frames = FrameLoop::new(2);

        let status = frames.draw_frame(&mut backend, SIZE).unwrap();

        assert_eq!(status, FrameStatus::SwapchainRebuilt);
        assert_eq!(backend.count(|c| matches!(c, Call::Reset(_))), 0);
        assert_eq!(backend.count(|c| matches!(c, Call::Submit(_))), 0);
        assert_eq!(backend.fences[0], Fence::Signaled);
        assert_eq!(frames.current_frame(), 0);
        assert_eq!(frames.frames_drawn(), 0);
        assert_eq!(frames.swapchain_rebuilds(), 1);

        // The slot's fence is still signaled, so the retry does not deadlock
        let status = frames.draw_frame(&mut backend, SIZE).unwrap();
        assert_eq!(status, FrameStatus::Presented);
        assert_eq!(frames.frames_drawn(), 1);
    }

    #[test]
    fn suboptimal_present_rebuilds_after_presenting() {
        let mut backend = MockBackend::new(2, 3);
        backend.present_script.push_back(PresentOutcome::Suboptimal);
        let mut frames = FrameLoop::new(2);

        let status = frames.draw_frame(&mut backend, SIZE).unwrap();

        assert_eq!(status, FrameStatus::SwapchainRebuilt);
        assert_eq!(frames.frames_drawn(), 1);
        assert_eq!(frames.current_frame(), 1);
        let present = backend
            .calls
            .iter()
            .position(|c| matches!(c, Call::Present(..)))
            .unwrap();
        let recreate = backend
            .calls
            .iter()
            .position(|c| matches!(c, Call::Recreate(..)))
            .unwrap();
        assert!(present < recreate);
        assert_eq!(backend.calls[recreate - 1], Call::WaitIdle);
    }

    #[test]
    fn out_of_date_present_rebuilds() {
        let mut backend = MockBackend::new(2, 3);
        backend.present_script.push_back(PresentOutcome::OutOfDate);
        let mut frames = FrameLoop::new(2);

        let status = frames.draw_frame(&mut backend, SIZE).unwrap();
        assert_eq!(status, FrameStatus::SwapchainRebuilt);
        assert_eq!(frames.swapchain_rebuilds(), 1);
    }

    #[test]
    fn suboptimal_acquire_still_draws_then_rebuilds() {
        let mut backend = MockBackend::new(2, 3);
        backend.acquire_script.push_back(AcquireOutcome::Acquired {
            image_index: 1,
            suboptimal: true,
        });
        let mut frames = FrameLoop::new(2);

        let status = frames.draw_frame(&mut backend, SIZE).unwrap();

        assert_eq!(status, FrameStatus::SwapchainRebuilt);
        assert_eq!(backend.count(|c| *c == Call::Present(0, 1)), 1);
    }

    #[test]
    fn resize_rebuilds_once_per_notification() {
        let mut backend = MockBackend::new(2, 3);
        let mut frames = FrameLoop::new(2);

        frames.notify_resized();
        assert_eq!(
            frames.draw_frame(&mut backend, (1024, 768)).unwrap(),
            FrameStatus::SwapchainRebuilt
        );
        assert!(!frames.resize_pending());
        assert_eq!(
            frames.draw_frame(&mut backend, (1024, 768)).unwrap(),
            FrameStatus::Presented
        );

        frames.notify_resized();
        frames.draw_frame(&mut backend, (640, 480)).unwrap();

        assert_eq!(frames.swapchain_rebuilds(), 2);
        assert_eq!(backend.count(|c| *c == Call::Recreate(1024, 768)), 1);
        assert_eq!(backend.count(|c| *c == Call::Recreate(640, 480)), 1);
        assert_eq!(backend.live_swapchains, 1);
        assert_eq!(backend.live_views, backend.image_count as usize);
    }

    #[test]
    fn back_to_back_rebuilds_keep_one_swapchain() {
        let mut backend = MockBackend::new(2, 3);
        let mut frames = FrameLoop::new(2);

        assert_eq!(
            frames.recreate_swapchain(&mut backend, (1024, 768)).unwrap(),
            FrameStatus::SwapchainRebuilt
        );
        assert_eq!(
            frames.recreate_swapchain(&mut backend, (640, 480)).unwrap(),
            FrameStatus::SwapchainRebuilt
        );

        assert_eq!(frames.swapchain_rebuilds(), 2);
        assert_eq!(backend.live_swapchains, 1);
        assert_eq!(backend.live_views, backend.image_count as usize);

        // Two notifications before a frame collapse into one rebuild
        frames.notify_resized();
        frames.notify_resized();
        assert_eq!(
            frames.draw_frame(&mut backend, SIZE).unwrap(),
            FrameStatus::SwapchainRebuilt
        );
        assert_eq!(frames.swapchain_rebuilds(), 3);
        assert_eq!(backend.live_swapchains, 1);
        assert_eq!(backend.live_views, backend.image_count as usize);
    }

    #[test]
    fn rebuild_over_a_leaked_swapchain_is_rejected() {
        let mut backend = MockBackend::new(2, 3);
        let mut frames = FrameLoop::new(2);
        frames.recreate_swapchain(&mut backend, SIZE).unwrap();

        backend.live_swapchains += 1;
        backend.live_views += backend.image_count as usize;

        let err = frames.recreate_swapchain(&mut backend, SIZE).unwrap_err();
        assert!(matches!(err, GpuError::InvalidState(_)));
        assert_eq!(frames.swapchain_rebuilds(), 1);
    }

    #[test]
    fn releasing_without_a_swapchain_is_rejected() {
        let mut backend = MockBackend::new(2, 3);
        backend.release_swapchain().unwrap();

        assert!(backend.release_swapchain().is_err());
        backend.create_swapchain().unwrap();
        assert!(backend.create_swapchain().is_err());
    }

    #[test]
    fn minimized_window_defers_until_restored() {
        let mut backend = MockBackend::new(2, 3);
        let mut frames = FrameLoop::new(2);
        frames.notify_resized();

        assert_eq!(
            frames.draw_frame(&mut backend, (0, 0)).unwrap(),
            FrameStatus::Deferred
        );
        assert_eq!(
            frames.recreate_swapchain(&mut backend, (800, 0)).unwrap(),
            FrameStatus::Deferred
        );
        assert!(backend.calls.is_empty());
        assert!(frames.resize_pending());

        let status = frames.draw_frame(&mut backend, SIZE).unwrap();
        assert_eq!(status, FrameStatus::SwapchainRebuilt);
        assert_eq!(backend.count(|c| *c == Call::Recreate(800, 600)), 1);
        assert!(!frames.resize_pending());
    }

    #[test]
    fn fence_timeout_is_fatal() {
        let mut backend = MockBackend::new(2, 3);
        backend.hung = true;
        let mut frames = FrameLoop::new(2);

        let err = frames.draw_frame(&mut backend, SIZE).unwrap_err();
        assert!(matches!(err, GpuError::FenceTimeout { .. }));
        assert_eq!(backend.count(|c| matches!(c, Call::Acquire(_))), 0);
    }

    #[test]
    fn shutdown_drains_frames_in_flight() {
        let mut backend = MockBackend::new(2, 3);
        let mut frames = FrameLoop::new(2);
        for _ in 0..3 {
            frames.draw_frame(&mut backend, SIZE).unwrap();
        }
        assert!(backend.in_flight() > 0);

        frames.shutdown(&mut backend).unwrap();

        assert_eq!(backend.in_flight(), 0);
        assert_eq!(backend.calls.last(), Some(&Call::WaitIdle));
    }

    #[test]
    fn zero_frames_in_flight_is_clamped() {
        assert_eq!(FrameLoop::new(0).frames_in_flight(), 1);
    }

    fn probed(name: &str, device_type: vk::PhysicalDeviceType) -> DeviceCandidate {
        DeviceCandidate {
            physical_device: vk::PhysicalDevice::null(),
            name: name.to_string(),
            vendor: GpuVendor::Other(0),
            api_version: vk::API_VERSION_1_0,
            device_type,
            max_image_dimension_2d: 8192,
            queue_families: QueueFamilyIndices {
                graphics: Some(0),
                present: Some(0),
                transfer: Some(0),
            },
            missing_extensions: Vec::new(),
            swapchain_support: Some(SwapchainSupport {
                capabilities: vk::SurfaceCapabilitiesKHR {
                    min_image_count: 1,
                    max_image_count: 0,
                    ..Default::default()
                },
                formats: vec![vk::SurfaceFormatKHR {
                    format: vk::Format::B8G8R8A8_SRGB,
                    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
                }],
                present_modes: vec![vk::PresentModeKHR::FIFO],
            }),
            supports_anisotropy: false,
        }
    }

    #[test]
    fn discrete_device_drives_two_frame_slots() {
        let candidates = vec![
            probed("integrated", vk::PhysicalDeviceType::INTEGRATED_GPU),
            probed("discrete", vk::PhysicalDeviceType::DISCRETE_GPU),
        ];
        let selected = select_best_candidate(&candidates, DeviceRequirements::default()).unwrap();
        assert_eq!(candidates[selected].name, "discrete");

        let support = candidates[selected].swapchain_support.as_ref().unwrap();
        let image_count = choose_image_count(&support.capabilities);
        assert_eq!(image_count, 2);

        let mut backend = MockBackend::new(MAX_FRAMES_IN_FLIGHT, image_count);
        let mut frames = FrameLoop::new(backend.frames_in_flight());
        assert_eq!(backend.fences.len(), 2);
        assert_eq!(backend.image_available.len(), 2);
        assert_eq!(backend.render_finished.len(), 2);

        for _ in 0..4 {
            frames.draw_frame(&mut backend, SIZE).unwrap();
        }

        let images: Vec<u32> = backend
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Present(_, image) => Some(*image),
                _ => None,
            })
            .collect();
        assert_eq!(images, vec![0, 1, 0, 1]);
        assert!(backend.max_in_flight <= MAX_FRAMES_IN_FLIGHT);
    }
}
