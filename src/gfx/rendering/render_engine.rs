//! WGPU backend for [`RenderDevice`]
//!
//! Draw calls issued between `begin_frame` and `end_frame` are recorded
//! together with a snapshot of their uniforms, then replayed in a single
//! render pass when the frame ends. Each draw's uniforms land in one
//! 256-byte slot of a dynamic uniform buffer (group 0); the texture bound to
//! unit 0 at draw time supplies group 1, with a 1x1 white texture standing in
//! when nothing is bound.
//!
//! Vertex data in any [`VertexLayout`] is widened to the full layout on
//! upload so a single vertex buffer layout serves every pipeline.

use std::collections::HashMap;
use std::num::{NonZeroU32, NonZeroU64};
use std::sync::Arc;

use wgpu::util::DeviceExt;
use wgpu::{Device, Queue};

use crate::error::{Result, ViewerError};
use crate::gfx::rendering::device::{
    BufferHandle, BufferKind, DrawCall, FrameSettings, ProgramHandle, RenderDevice,
    TextureHandle, VertexArrayHandle, Viewport,
};
use crate::gfx::rendering::pipeline_manager::{PipelineConfig, PipelineManager};
use crate::gfx::resources::shader::UniformBlock;
use crate::gfx::resources::texture_resource::{TextureImage, TextureResource};
use crate::gfx::scene::vertex::VertexLayout;
use crate::gfx::scene::object::TEXTURE_UNIT;
use crate::wgpu_utils::DynamicUniformBuffer;

struct GpuBuffer {
    buffer: wgpu::Buffer,
    kind: BufferKind,
    /// Layout of the data callers write; the GPU copy is always full layout
    layout: VertexLayout,
}

struct GpuTexture {
    _resource: TextureResource,
    bind_group: wgpu::BindGroup,
}

struct PendingDraw {
    program: ProgramHandle,
    vertex_buffer: BufferHandle,
    index_buffer: BufferHandle,
    index_count: u32,
    texture: Option<TextureHandle>,
    uniform_offset: u32,
}

/// Renders into a window surface through wgpu
pub struct WgpuDevice {
    surface: wgpu::Surface<'static>,
    device: Arc<Device>,
    queue: Arc<Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,

    pipeline_manager: PipelineManager,
    texture_layout: wgpu::BindGroupLayout,
    uniform_layout: wgpu::BindGroupLayout,
    uniforms: DynamicUniformBuffer<UniformBlock>,
    uniform_bind_group: wgpu::BindGroup,
    default_texture: GpuTexture,

    vertex_arrays: HashMap<VertexArrayHandle, VertexLayout>,
    buffers: HashMap<BufferHandle, GpuBuffer>,
    textures: HashMap<TextureHandle, GpuTexture>,
    next_id: u32,

    frame: Option<FrameSettings>,
    active_program: Option<ProgramHandle>,
    bound_textures: HashMap<u32, TextureHandle>,
    pending_draws: Vec<PendingDraw>,
}

impl WgpuDevice {
    /// Creates the surface, device and shared render state for `window`
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| ViewerError::Adapter(e.to_string()))?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Corral Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;
        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let surface_capabilities = surface.get_capabilities(&adapter);
        // GL-style output: colors are written as-is, no sRGB encoding
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| ViewerError::Adapter("surface reports no formats".to_string()))?;
        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture =
            TextureResource::create_depth_texture(&device, &config, "depth_texture");

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Uniform Block Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<UniformBlock>() as u64),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let uniforms = DynamicUniformBuffer::<UniformBlock>::new(&device, 64);
        let uniform_bind_group = create_uniform_bind_group(&device, &uniform_layout, &uniforms);

        let default_texture = create_gpu_texture(
            &device,
            &queue,
            &texture_layout,
            &TextureImage::white(),
            "Default White Texture",
        );

        let pipeline_config = PipelineConfig::default()
            .with_bind_group_layouts(vec![uniform_layout.clone(), texture_layout.clone()])
            .with_depth_format(Some(TextureResource::DEPTH_FORMAT))
            .with_color_format(config.format);
        let pipeline_manager = PipelineManager::new(device.clone(), pipeline_config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth_texture,
            pipeline_manager,
            texture_layout,
            uniform_layout,
            uniforms,
            uniform_bind_group,
            default_texture,
            vertex_arrays: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            next_id: 0,
            frame: None,
            active_program: None,
            bound_textures: HashMap::new(),
            pending_draws: Vec::new(),
        })
    }

    fn next_handle(&mut self) -> NonZeroU32 {
        self.next_id += 1;
        NonZeroU32::new(self.next_id).unwrap_or(NonZeroU32::MIN)
    }

    /// Reconfigures the surface and depth buffer; zero sizes are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }

    pub fn set_vsync(&mut self, enable: bool) {
        self.config.present_mode = if enable {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        };
        self.surface.configure(&self.device, &self.config);
    }

    /// Current surface size in pixels
    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Widens vertex bytes written in `layout` to the full GPU layout
    fn gpu_bytes(kind: BufferKind, layout: VertexLayout, contents: &[u8]) -> Vec<u8> {
        if kind == BufferKind::Index || layout == VertexLayout::FULL {
            return contents.to_vec();
        }
        let floats: Vec<f32> = bytemuck::pod_collect_to_vec(contents);
        bytemuck::cast_slice(&layout.widen_to_full(&floats)).to_vec()
    }

    fn clamped_viewport(&self, viewport: Viewport) -> (f32, f32, f32, f32) {
        let x = viewport.x.min(self.config.width);
        let y = viewport.y.min(self.config.height);
        let width = viewport.width.min(self.config.width - x);
        let height = viewport.height.min(self.config.height - y);
        (x as f32, y as f32, width as f32, height as f32)
    }
}

fn create_uniform_bind_group(
    device: &Device,
    layout: &wgpu::BindGroupLayout,
    uniforms: &DynamicUniformBuffer<UniformBlock>,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Uniform Block Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniforms.binding_resource(),
        }],
    })
}

fn create_gpu_texture(
    device: &Device,
    queue: &Queue,
    layout: &wgpu::BindGroupLayout,
    image: &TextureImage,
    label: &str,
) -> GpuTexture {
    let resource = TextureResource::create_from_image(device, queue, image, label);
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&resource.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&resource.sampler),
            },
        ],
    });
    GpuTexture {
        _resource: resource,
        bind_group,
    }
}

impl RenderDevice for WgpuDevice {
    fn create_vertex_array(&mut self, layout: VertexLayout) -> Result<VertexArrayHandle> {
        let handle = VertexArrayHandle::new(self.next_handle());
        self.vertex_arrays.insert(handle, layout);
        Ok(handle)
    }

    fn create_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        kind: BufferKind,
        contents: &[u8],
    ) -> Result<BufferHandle> {
        let layout = *self
            .vertex_arrays
            .get(&vertex_array)
            .ok_or(ViewerError::UnknownHandle {
                kind: VertexArrayHandle::KIND,
                id: vertex_array.id(),
            })?;

        let usage = match kind {
            BufferKind::Vertex => wgpu::BufferUsages::VERTEX,
            BufferKind::Index => wgpu::BufferUsages::INDEX,
        } | wgpu::BufferUsages::COPY_DST;

        let handle = BufferHandle::new(self.next_handle());
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&handle.to_string()),
                contents: &Self::gpu_bytes(kind, layout, contents),
                usage,
            });
        self.buffers.insert(
            handle,
            GpuBuffer {
                buffer,
                kind,
                layout,
            },
        );
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, contents: &[u8]) {
        let Some(gpu) = self.buffers.get(&buffer) else {
            log::error!("write to deleted or unknown {}", buffer);
            return;
        };

        let (offset, bytes) = if gpu.kind == BufferKind::Vertex && gpu.layout != VertexLayout::FULL
        {
            let stride = gpu.layout.stride_bytes() as u64;
            if offset % stride != 0 || contents.len() as u64 % stride != 0 {
                log::error!(
                    "partial-vertex write to {} (offset {}, {} bytes, stride {})",
                    buffer,
                    offset,
                    contents.len(),
                    stride
                );
                return;
            }
            let full_offset = offset / stride * VertexLayout::FULL.stride_bytes() as u64;
            (full_offset, Self::gpu_bytes(gpu.kind, gpu.layout, contents))
        } else {
            (offset, contents.to_vec())
        };

        if offset + bytes.len() as u64 > gpu.buffer.size() {
            log::error!(
                "write of {} bytes at offset {} overflows {} ({} bytes)",
                bytes.len(),
                offset,
                buffer,
                gpu.buffer.size()
            );
            return;
        }
        self.queue.write_buffer(&gpu.buffer, offset, &bytes);
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        match self.buffers.remove(&buffer) {
            Some(gpu) => gpu.buffer.destroy(),
            None => log::error!("double delete of {}", buffer),
        }
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        if self.vertex_arrays.remove(&vertex_array).is_none() {
            log::error!("double delete of {}", vertex_array);
        }
    }

    fn create_texture(&mut self, image: &TextureImage) -> Result<TextureHandle> {
        let handle = TextureHandle::new(self.next_handle());
        let texture = create_gpu_texture(
            &self.device,
            &self.queue,
            &self.texture_layout,
            image,
            &handle.to_string(),
        );
        self.textures.insert(handle, texture);
        Ok(handle)
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        if !self.textures.contains_key(&texture) {
            log::error!("bind of deleted or unknown {}", texture);
            return;
        }
        self.bound_textures.insert(unit, texture);
    }

    fn unbind_texture(&mut self, unit: u32) {
        self.bound_textures.remove(&unit);
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_none() {
            log::error!("double delete of {}", texture);
            return;
        }
        self.bound_textures.retain(|_, bound| *bound != texture);
    }

    fn create_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle> {
        let handle = ProgramHandle::new(self.next_handle());
        self.pipeline_manager
            .load_program(handle, label, vertex_source, fragment_source)?;
        log::debug!("Compiled program '{}' as {}", label, handle);
        Ok(handle)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if !self.pipeline_manager.remove_program(program) {
            log::error!("double delete of {}", program);
        }
        if self.active_program == Some(program) {
            self.active_program = None;
        }
    }

    fn begin_frame(&mut self, settings: FrameSettings) {
        if self.frame.is_some() {
            log::warn!("begin_frame called twice without end_frame");
        }
        self.frame = Some(settings);
        self.pending_draws.clear();
        self.uniforms.clear();
    }

    fn use_program(&mut self, program: ProgramHandle) {
        if !self.pipeline_manager.has_program(program) {
            log::error!("use of deleted or unknown {}", program);
            return;
        }
        self.active_program = Some(program);
    }

    fn draw_indexed(&mut self, call: DrawCall<'_>) {
        let live = self.vertex_arrays.contains_key(&call.vertex_array)
            && self.buffers.contains_key(&call.vertex_buffer)
            && self.buffers.contains_key(&call.index_buffer);
        if !live {
            log::error!("draw with released resources ({})", call.vertex_array);
            return;
        }
        let Some(program) = self.active_program else {
            log::warn!("draw issued with no active program");
            return;
        };
        if call.index_count == 0 {
            return;
        }

        let uniform_offset = self.uniforms.push(call.uniforms);
        self.pending_draws.push(PendingDraw {
            program,
            vertex_buffer: call.vertex_buffer,
            index_buffer: call.index_buffer,
            index_count: call.index_count,
            texture: self.bound_textures.get(&TEXTURE_UNIT).copied(),
            uniform_offset,
        });
    }

    fn end_frame(&mut self) -> Result<()> {
        let settings = self.frame.take().unwrap_or(FrameSettings {
            viewport: Viewport::new(self.config.width, self.config.height),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            depth_test: true,
        });
        let draws = std::mem::take(&mut self.pending_draws);

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface timeout, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        for draw in &draws {
            self.pipeline_manager
                .prepare(draw.program, settings.depth_test)?;
        }
        if self.uniforms.upload(&self.device, &self.queue) {
            self.uniform_bind_group =
                create_uniform_bind_group(&self.device, &self.uniform_layout, &self.uniforms);
        }

        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let [r, g, b, a] = settings.clear_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(r),
                            g: f64::from(g),
                            b: f64::from(b),
                            a: f64::from(a),
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let (x, y, width, height) = self.clamped_viewport(settings.viewport);
            if width > 0.0 && height > 0.0 {
                render_pass.set_viewport(x, y, width, height, 0.0, 1.0);
            }

            for draw in &draws {
                let (Some(pipeline), Some(vertices), Some(indices)) = (
                    self.pipeline_manager
                        .pipeline(draw.program, settings.depth_test),
                    self.buffers.get(&draw.vertex_buffer),
                    self.buffers.get(&draw.index_buffer),
                ) else {
                    log::warn!("Skipping draw whose resources were released mid-frame");
                    continue;
                };
                let texture = draw
                    .texture
                    .and_then(|handle| self.textures.get(&handle))
                    .unwrap_or(&self.default_texture);

                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[draw.uniform_offset]);
                render_pass.set_bind_group(1, &texture.bind_group, &[]);
                render_pass.set_vertex_buffer(0, vertices.buffer.slice(..));
                render_pass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..draw.index_count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }
}
