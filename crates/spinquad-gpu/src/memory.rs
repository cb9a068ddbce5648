//! Buffers and images backed by dedicated device memory.
//!
//! Each resource gets its own `VkDeviceMemory`, bound at offset 0, from the
//! first memory type that satisfies both the resource's type bits and the
//! requested property flags.

use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use ash::vk;
use bytemuck::Pod;
use std::marker::PhantomData;
use std::mem::size_of;
use std::ptr::NonNull;
use std::sync::Arc;

/// Index of the first memory type allowed by `type_filter` whose flags
/// contain `properties`.
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> Result<u32> {
    let count = (memory_properties.memory_type_count as usize).min(vk::MAX_MEMORY_TYPES);
    memory_properties.memory_types[..count]
        .iter()
        .enumerate()
        .find(|(i, memory_type)| {
            type_filter & (1_u32 << i) != 0 && memory_type.property_flags.contains(properties)
        })
        .map(|(i, _)| i as u32)
        .ok_or(GpuError::NoSuitableMemoryType {
            type_filter,
            properties,
        })
}

unsafe fn allocate_bound_memory(
    gpu: &GpuContext,
    requirements: vk::MemoryRequirements,
    properties: vk::MemoryPropertyFlags,
) -> Result<vk::DeviceMemory> {
    let memory_type_index = gpu.memory_type_index(requirements.memory_type_bits, properties)?;
    let alloc_info = vk::MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type_index);
    let memory = unsafe { gpu.device().allocate_memory(&alloc_info, None)? };
    Ok(memory)
}

/// A buffer with its own memory allocation.
pub struct Buffer {
    raw: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    gpu: Arc<GpuContext>,
}

impl Buffer {
    pub fn new(
        gpu: &Arc<GpuContext>,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<Self> {
        let families = gpu.unique_queue_families();
        let mut buffer_info = vk::BufferCreateInfo::default()
            .size(size)
            .usage(usage)
            .sharing_mode(gpu.sharing_mode());
        if gpu.sharing_mode() == vk::SharingMode::CONCURRENT {
            buffer_info = buffer_info.queue_family_indices(families);
        }

        let raw = unsafe { gpu.device().create_buffer(&buffer_info, None)? };

        // From here on Drop releases whatever has been created.
        let mut buffer = Self {
            raw,
            memory: vk::DeviceMemory::null(),
            size,
            gpu: Arc::clone(gpu),
        };

        unsafe {
            let requirements = gpu.device().get_buffer_memory_requirements(raw);
            buffer.memory = allocate_bound_memory(gpu, requirements, properties)?;
            gpu.device().bind_buffer_memory(raw, buffer.memory, 0)?;
        }

        Ok(buffer)
    }

    pub fn handle(&self) -> vk::Buffer {
        self.raw
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Map, copy `data` in, unmap. The memory must be host visible.
    pub fn write_bytes(&self, data: &[u8]) -> Result<()> {
        if data.len() as vk::DeviceSize > self.size {
            return Err(GpuError::InvalidState(format!(
                "write of {} bytes into {} byte buffer",
                data.len(),
                self.size
            )));
        }
        unsafe {
            let ptr = self.gpu.device().map_memory(
                self.memory,
                0,
                self.size,
                vk::MemoryMapFlags::empty(),
            )?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.cast::<u8>(), data.len());
            self.gpu.device().unmap_memory(self.memory);
        }
        Ok(())
    }

    /// Write a slice of plain data from the start of the buffer.
    pub fn write<T: Pod>(&self, data: &[T]) -> Result<()> {
        self.write_bytes(bytemuck::cast_slice(data))
    }

    /// Map, copy the whole buffer out, unmap. The memory must be host visible.
    pub fn read_bytes(&self) -> Result<Vec<u8>> {
        let len = usize::try_from(self.size)
            .map_err(|_| GpuError::InvalidState("buffer too large to map".into()))?;
        let mut out = vec![0_u8; len];
        unsafe {
            let ptr = self.gpu.device().map_memory(
                self.memory,
                0,
                self.size,
                vk::MemoryMapFlags::empty(),
            )?;
            std::ptr::copy_nonoverlapping(ptr.cast::<u8>(), out.as_mut_ptr(), len);
            self.gpu.device().unmap_memory(self.memory);
        }
        Ok(out)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.gpu.device().destroy_buffer(self.raw, None);
            self.gpu.device().free_memory(self.memory, None);
        }
    }
}

/// Host-visible uniform buffer holding one `T`, mapped for its whole life.
pub struct UniformBuffer<T> {
    mapped: NonNull<u8>,
    buffer: Buffer,
    _marker: PhantomData<T>,
}

impl<T: Pod> UniformBuffer<T> {
    pub fn new(gpu: &Arc<GpuContext>) -> Result<Self> {
        let buffer = Buffer::new(
            gpu,
            size_of::<T>() as vk::DeviceSize,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;

        let ptr = unsafe {
            gpu.device()
                .map_memory(buffer.memory, 0, vk::WHOLE_SIZE, vk::MemoryMapFlags::empty())?
        };
        let mapped = NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| GpuError::InvalidState("vkMapMemory returned null".into()))?;

        Ok(Self {
            mapped,
            buffer,
            _marker: PhantomData,
        })
    }

    /// Copy `value` into the mapping. Coherent memory needs no flush.
    pub fn write(&mut self, value: &T) {
        let bytes = bytemuck::bytes_of(value);
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), self.mapped.as_ptr(), bytes.len());
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }
}

impl<T> Drop for UniformBuffer<T> {
    fn drop(&mut self) {
        unsafe {
            self.buffer.gpu.device().unmap_memory(self.buffer.memory);
        }
    }
}

/// A 2D single-mip image with its own memory allocation.
///
/// The current layout is tracked so transitions can be recorded from it.
pub struct Image {
    raw: vk::Image,
    memory: vk::DeviceMemory,
    format: vk::Format,
    extent: vk::Extent2D,
    pub(crate) layout: vk::ImageLayout,
    gpu: Arc<GpuContext>,
}

impl Image {
    pub fn new(
        gpu: &Arc<GpuContext>,
        extent: vk::Extent2D,
        format: vk::Format,
        tiling: vk::ImageTiling,
        usage: vk::ImageUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<Self> {
        let families = gpu.unique_queue_families();
        let mut image_info = vk::ImageCreateInfo::default()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(format)
            .tiling(tiling)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(usage)
            .samples(vk::SampleCountFlags::TYPE_1)
            .sharing_mode(gpu.sharing_mode());
        if gpu.sharing_mode() == vk::SharingMode::CONCURRENT {
            image_info = image_info.queue_family_indices(families);
        }

        let raw = unsafe { gpu.device().create_image(&image_info, None)? };

        let mut image = Self {
            raw,
            memory: vk::DeviceMemory::null(),
            format,
            extent,
            layout: vk::ImageLayout::UNDEFINED,
            gpu: Arc::clone(gpu),
        };

        unsafe {
            let requirements = gpu.device().get_image_memory_requirements(raw);
            image.memory = allocate_bound_memory(gpu, requirements, properties)?;
            gpu.device().bind_image_memory(raw, image.memory, 0)?;
        }

        Ok(image)
    }

    pub fn handle(&self) -> vk::Image {
        self.raw
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn layout(&self) -> vk::ImageLayout {
        self.layout
    }

    /// Create a 2D color view. The caller owns the returned view.
    pub fn create_view(&self) -> Result<vk::ImageView> {
        create_color_view(self.gpu.device(), self.raw, self.format)
    }
}

impl Drop for Image {
    fn drop(&mut self) {
        unsafe {
            self.gpu.device().destroy_image(self.raw, None);
            self.gpu.device().free_memory(self.memory, None);
        }
    }
}

/// 2D view over mip 0, layer 0 of a color image.
pub(crate) fn create_color_view(
    device: &ash::Device,
    image: vk::Image,
    format: vk::Format,
) -> Result<vk::ImageView> {
    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(vk::ImageViewType::TYPE_2D)
        .format(format)
        .components(vk::ComponentMapping::default())
        .subresource_range(color_subresource_range());

    let view = unsafe { device.create_image_view(&view_info, None)? };
    Ok(view)
}

pub(crate) fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange::default()
        .aspect_mask(vk::ImageAspectFlags::COLOR)
        .base_mip_level(0)
        .level_count(1)
        .base_array_layer(0)
        .layer_count(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (slot, &flags) in props.memory_types.iter_mut().zip(types) {
            slot.property_flags = flags;
        }
        props
    }

    const DEVICE_LOCAL: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::DEVICE_LOCAL;
    const HOST: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
        vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw() | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
    );

    #[test]
    fn first_matching_type_wins() {
        let props = memory_properties(&[DEVICE_LOCAL, HOST, HOST | DEVICE_LOCAL]);
        assert_eq!(find_memory_type(&props, 0b111, HOST).unwrap(), 1);
        assert_eq!(find_memory_type(&props, 0b111, DEVICE_LOCAL).unwrap(), 0);
    }

    #[test]
    fn type_filter_masks_out_candidates() {
        let props = memory_properties(&[DEVICE_LOCAL, HOST, HOST | DEVICE_LOCAL]);
        assert_eq!(find_memory_type(&props, 0b100, HOST).unwrap(), 2);
        assert_eq!(find_memory_type(&props, 0b110, DEVICE_LOCAL).unwrap(), 2);
    }

    #[test]
    fn no_match_is_an_error() {
        let props = memory_properties(&[DEVICE_LOCAL]);
        let err = find_memory_type(&props, 0b1, HOST).unwrap_err();
        assert!(matches!(
            err,
            GpuError::NoSuitableMemoryType { type_filter: 0b1, .. }
        ));

        // Types beyond memory_type_count are ignored even if they would match.
        let mut props = memory_properties(&[DEVICE_LOCAL]);
        props.memory_types[1].property_flags = HOST;
        assert!(find_memory_type(&props, 0b11, HOST).is_err());
    }
}
