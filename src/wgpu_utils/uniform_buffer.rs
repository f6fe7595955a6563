use std::marker::PhantomData;
use std::num::NonZeroU64;

/// Uniform buffer holding one `Content` block per draw, addressed with a
/// dynamic offset.
///
/// Blocks are staged on the CPU with [`push`](Self::push) during a frame and
/// written in one go by [`upload`](Self::upload). The buffer grows to the
/// next power of two when a frame stages more blocks than it can hold.
pub struct DynamicUniformBuffer<Content> {
    buffer: wgpu::Buffer,
    content_type: PhantomData<Content>,
    stride: u64,
    capacity: usize,
    staged: Vec<u8>,
    previous_content: Vec<u8>,
}

impl<Content: bytemuck::Pod> DynamicUniformBuffer<Content> {
    fn name() -> &'static str {
        let type_name = std::any::type_name::<Content>();
        let pos = type_name.rfind(':').unwrap_or(0);
        if pos > 0 {
            &type_name[(pos + 1)..]
        } else {
            type_name
        }
    }

    /// Size of `Content` rounded up to the device's dynamic offset alignment
    pub fn aligned_stride(device: &wgpu::Device) -> u64 {
        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let size = std::mem::size_of::<Content>() as u64;
        size.div_ceil(alignment) * alignment
    }

    pub fn new(device: &wgpu::Device, capacity: usize) -> Self {
        let stride = Self::aligned_stride(device);
        let capacity = capacity.max(1);

        DynamicUniformBuffer {
            buffer: Self::allocate(device, stride, capacity),
            content_type: PhantomData,
            stride,
            capacity,
            staged: Vec::new(),
            previous_content: Vec::new(),
        }
    }

    fn allocate(device: &wgpu::Device, stride: u64, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("DynamicUniformBuffer: {}", Self::name())),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Forgets every staged block
    pub fn clear(&mut self) {
        self.staged.clear();
    }

    /// Stages a block and returns its dynamic offset
    pub fn push(&mut self, content: &Content) -> u32 {
        let offset = self.staged.len();
        self.staged.extend_from_slice(bytemuck::bytes_of(content));
        self.staged.resize(offset + self.stride as usize, 0);
        offset as u32
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len() / self.stride as usize
    }

    /// Writes the staged blocks to the GPU.
    ///
    /// Returns true when the buffer had to be reallocated; bind groups that
    /// reference it must then be rebuilt.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> bool {
        let needed = self.staged_count();
        let grew = needed > self.capacity;
        if grew {
            self.capacity = needed.next_power_of_two();
            self.buffer = Self::allocate(device, self.stride, self.capacity);
            self.previous_content.clear();
            log::debug!(
                "Grew {} to {} blocks",
                Self::name(),
                self.capacity
            );
        }

        if self.staged.is_empty() || self.previous_content == self.staged {
            return grew;
        }
        queue.write_buffer(&self.buffer, 0, &self.staged);
        self.previous_content.clone_from(&self.staged);
        grew
    }

    /// Binding of a single block; the dynamic offset selects which one
    pub fn binding_resource(&self) -> wgpu::BindingResource {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset: 0,
            size: NonZeroU64::new(std::mem::size_of::<Content>() as u64),
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
