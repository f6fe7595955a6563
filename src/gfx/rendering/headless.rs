//! In-memory render backend
//!
//! [`HeadlessDevice`] implements [`RenderDevice`] without a GPU. Buffers and
//! textures live in host memory, handles are handed out sequentially, and
//! every call is appended to a command log. Draws are kept as [`DrawRecord`]s
//! with a snapshot of the uniform block, so what a frame *would* have drawn
//! can be inspected after the fact.

use std::collections::HashMap;
use std::num::NonZeroU32;

use crate::error::{Result, ViewerError};
use crate::gfx::resources::shader::UniformBlock;
use crate::gfx::resources::texture_resource::TextureImage;
use crate::gfx::scene::vertex::VertexLayout;

use super::device::{
    BufferHandle, BufferKind, DrawCall, FrameSettings, ProgramHandle, RenderDevice,
    TextureHandle, VertexArrayHandle,
};

/// One call made against the device, in order
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CreateVertexArray(VertexArrayHandle),
    CreateBuffer {
        buffer: BufferHandle,
        kind: BufferKind,
        len: usize,
    },
    WriteBuffer {
        buffer: BufferHandle,
        offset: u64,
        len: usize,
    },
    DeleteBuffer(BufferHandle),
    DeleteVertexArray(VertexArrayHandle),
    CreateTexture(TextureHandle),
    BindTexture {
        unit: u32,
        texture: TextureHandle,
    },
    UnbindTexture {
        unit: u32,
    },
    DeleteTexture(TextureHandle),
    CreateProgram(ProgramHandle),
    DeleteProgram(ProgramHandle),
    BeginFrame(FrameSettings),
    UseProgram(ProgramHandle),
    DrawIndexed {
        vertex_array: VertexArrayHandle,
        index_count: u32,
    },
    EndFrame,
}

/// Everything known about one draw at the moment it was issued
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: Option<ProgramHandle>,
    pub vertex_array: VertexArrayHandle,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
    pub texture: Option<TextureHandle>,
    pub uniforms: UniformBlock,
}

#[derive(Debug)]
struct BufferSlot {
    vertex_array: VertexArrayHandle,
    kind: BufferKind,
    contents: Vec<u8>,
}

/// Render backend that keeps all state in memory.
///
/// By default the command and draw logs grow for the device's lifetime,
/// which suits tests. Long offscreen runs should either call
/// [`clear_log`](Self::clear_log) between frames or build the device with
/// [`keeping_last_frame`](Self::keeping_last_frame).
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_id: u32,
    vertex_arrays: HashMap<VertexArrayHandle, VertexLayout>,
    buffers: HashMap<BufferHandle, BufferSlot>,
    textures: HashMap<TextureHandle, TextureImage>,
    programs: HashMap<ProgramHandle, String>,
    active_program: Option<ProgramHandle>,
    bound_textures: HashMap<u32, TextureHandle>,
    in_frame: bool,
    frames_presented: u64,
    commands: Vec<DeviceCommand>,
    draws: Vec<DrawRecord>,
    /// Drop the logs at every `begin_frame`
    last_frame_only: bool,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Device whose logs only ever hold the calls since the latest
    /// `begin_frame`
    pub fn keeping_last_frame() -> Self {
        Self {
            last_frame_only: true,
            ..Self::default()
        }
    }

    fn next_handle(&mut self) -> NonZeroU32 {
        self.next_id += 1;
        NonZeroU32::new(self.next_id).unwrap_or(NonZeroU32::MIN)
    }

    /// All calls made so far
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// All draws issued so far
    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Forgets the command and draw logs; resources are kept
    pub fn clear_log(&mut self) {
        self.commands.clear();
        self.draws.clear();
    }

    /// Current contents of a live buffer
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(|slot| slot.contents.as_slice())
    }

    /// Vertex buffer contents reinterpreted as floats
    pub fn vertex_floats(&self, buffer: BufferHandle) -> Option<Vec<f32>> {
        let slot = self.buffers.get(&buffer)?;
        if slot.kind != BufferKind::Vertex {
            return None;
        }
        Some(bytemuck::pod_collect_to_vec(&slot.contents))
    }

    pub fn vertex_array_layout(&self, vertex_array: VertexArrayHandle) -> Option<VertexLayout> {
        self.vertex_arrays.get(&vertex_array).copied()
    }

    pub fn texture_image(&self, texture: TextureHandle) -> Option<&TextureImage> {
        self.textures.get(&texture)
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_vertex_array_count(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn live_texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn live_program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn active_program(&self) -> Option<ProgramHandle> {
        self.active_program
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Number of `WriteBuffer` calls that targeted `buffer`
    pub fn write_count(&self, buffer: BufferHandle) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DeviceCommand::WriteBuffer { buffer: b, .. } if *b == buffer))
            .count()
    }
}

impl RenderDevice for HeadlessDevice {
    fn create_vertex_array(&mut self, layout: VertexLayout) -> Result<VertexArrayHandle> {
        let handle = VertexArrayHandle::new(self.next_handle());
        self.vertex_arrays.insert(handle, layout);
        self.commands.push(DeviceCommand::CreateVertexArray(handle));
        Ok(handle)
    }

    fn create_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        kind: BufferKind,
        contents: &[u8],
    ) -> Result<BufferHandle> {
        if !self.vertex_arrays.contains_key(&vertex_array) {
            return Err(ViewerError::UnknownHandle {
                kind: VertexArrayHandle::KIND,
                id: vertex_array.id(),
            });
        }

        let handle = BufferHandle::new(self.next_handle());
        self.buffers.insert(
            handle,
            BufferSlot {
                vertex_array,
                kind,
                contents: contents.to_vec(),
            },
        );
        self.commands.push(DeviceCommand::CreateBuffer {
            buffer: handle,
            kind,
            len: contents.len(),
        });
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, contents: &[u8]) {
        let Some(slot) = self.buffers.get_mut(&buffer) else {
            log::error!("write to deleted or unknown {}", buffer);
            return;
        };

        let start = offset as usize;
        let end = start + contents.len();
        if end > slot.contents.len() {
            log::error!(
                "write of {} bytes at offset {} overflows {} ({} bytes)",
                contents.len(),
                offset,
                buffer,
                slot.contents.len()
            );
            return;
        }

        slot.contents[start..end].copy_from_slice(contents);
        self.commands.push(DeviceCommand::WriteBuffer {
            buffer,
            offset,
            len: contents.len(),
        });
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_none() {
            log::error!("double delete of {}", buffer);
            return;
        }
        self.commands.push(DeviceCommand::DeleteBuffer(buffer));
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        if self.vertex_arrays.remove(&vertex_array).is_none() {
            log::error!("double delete of {}", vertex_array);
            return;
        }
        let orphaned = self
            .buffers
            .values()
            .filter(|slot| slot.vertex_array == vertex_array)
            .count();
        if orphaned > 0 {
            log::warn!("{} deleted with {} buffers still attached", vertex_array, orphaned);
        }
        self.commands
            .push(DeviceCommand::DeleteVertexArray(vertex_array));
    }

    fn create_texture(&mut self, image: &TextureImage) -> Result<TextureHandle> {
        let handle = TextureHandle::new(self.next_handle());
        self.textures.insert(handle, image.clone());
        self.commands.push(DeviceCommand::CreateTexture(handle));
        Ok(handle)
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        if !self.textures.contains_key(&texture) {
            log::error!("bind of deleted or unknown {}", texture);
            return;
        }
        self.bound_textures.insert(unit, texture);
        self.commands
            .push(DeviceCommand::BindTexture { unit, texture });
    }

    fn unbind_texture(&mut self, unit: u32) {
        self.bound_textures.remove(&unit);
        self.commands.push(DeviceCommand::UnbindTexture { unit });
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_none() {
            log::error!("double delete of {}", texture);
            return;
        }
        self.bound_textures.retain(|_, bound| *bound != texture);
        self.commands.push(DeviceCommand::DeleteTexture(texture));
    }

    /// Uses the same entry point contract as the wgpu backend: the vertex
    /// source must define `vs_main` and the fragment source `fs_main`.
    fn create_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle> {
        for (source, entry) in [(vertex_source, "fn vs_main"), (fragment_source, "fn fs_main")] {
            if !source.contains(entry) {
                return Err(ViewerError::ShaderCompile {
                    label: label.to_owned(),
                    message: format!("missing entry point `{}`", entry),
                });
            }
        }

        let handle = ProgramHandle::new(self.next_handle());
        self.programs.insert(handle, label.to_owned());
        self.commands.push(DeviceCommand::CreateProgram(handle));
        Ok(handle)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(&program).is_none() {
            log::error!("double delete of {}", program);
            return;
        }
        if self.active_program == Some(program) {
            self.active_program = None;
        }
        self.commands.push(DeviceCommand::DeleteProgram(program));
    }

    fn begin_frame(&mut self, settings: FrameSettings) {
        if self.in_frame {
            log::warn!("begin_frame called twice without end_frame");
        }
        self.in_frame = true;
        if self.last_frame_only {
            self.clear_log();
        }
        self.commands.push(DeviceCommand::BeginFrame(settings));
    }

    fn use_program(&mut self, program: ProgramHandle) {
        if !self.programs.contains_key(&program) {
            log::error!("use of deleted or unknown {}", program);
            return;
        }
        self.active_program = Some(program);
        self.commands.push(DeviceCommand::UseProgram(program));
    }

    fn draw_indexed(&mut self, call: DrawCall<'_>) {
        let live = self.vertex_arrays.contains_key(&call.vertex_array)
            && self.buffers.contains_key(&call.vertex_buffer)
            && self.buffers.contains_key(&call.index_buffer);
        if !live {
            log::error!("draw with released resources ({})", call.vertex_array);
            return;
        }
        if self.active_program.is_none() {
            log::warn!("draw issued with no active program");
        }

        self.commands.push(DeviceCommand::DrawIndexed {
            vertex_array: call.vertex_array,
            index_count: call.index_count,
        });
        self.draws.push(DrawRecord {
            program: self.active_program,
            vertex_array: call.vertex_array,
            vertex_buffer: call.vertex_buffer,
            index_buffer: call.index_buffer,
            index_count: call.index_count,
            texture: self.bound_textures.get(&0).copied(),
            uniforms: *call.uniforms,
        });
    }

    fn end_frame(&mut self) -> Result<()> {
        self.in_frame = false;
        self.frames_presented += 1;
        self.commands.push(DeviceCommand::EndFrame);
        Ok(())
    }
}
