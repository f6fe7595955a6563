//! GPU collaborator interface
//!
//! The scene core talks to the graphics API only through [`RenderDevice`].
//! The trait mirrors a classic bind-and-draw model: vertex arrays own a
//! vertex layout, buffers are attached to a vertex array, programs are
//! activated before draws, and a frame is bracketed by
//! [`begin_frame`](RenderDevice::begin_frame) / [`end_frame`](RenderDevice::end_frame).
//!
//! Two backends ship with the crate:
//! - [`WgpuDevice`](super::render_engine::WgpuDevice) renders to a window surface
//! - [`HeadlessDevice`](super::headless::HeadlessDevice) keeps everything in memory
//!   and records every call, which is what the tests drive

use std::fmt;
use std::num::NonZeroU32;

use crate::error::Result;
use crate::gfx::resources::shader::UniformBlock;
use crate::gfx::resources::texture_resource::TextureImage;
use crate::gfx::scene::vertex::VertexLayout;

macro_rules! gpu_handle {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(NonZeroU32);

        impl $name {
            pub const KIND: &'static str = $kind;

            pub fn new(id: NonZeroU32) -> Self {
                Self(id)
            }

            pub fn id(self) -> u32 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $kind, self.0)
            }
        }
    };
}

gpu_handle!(
    /// A vertex array: remembers the vertex layout of the buffers attached to it
    VertexArrayHandle,
    "vertex array"
);
gpu_handle!(
    /// A vertex or index buffer
    BufferHandle,
    "buffer"
);
gpu_handle!(TextureHandle, "texture");
gpu_handle!(ProgramHandle, "program");

/// What a buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Interleaved `f32` vertex data in the owning vertex array's layout
    Vertex,
    /// `u32` triangle-list indices
    Index,
}

/// Pixel rectangle the frame is rendered into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Per-frame state set before any draw call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSettings {
    pub viewport: Viewport,
    pub clear_color: [f32; 4],
    pub depth_test: bool,
}

/// One indexed triangle-list draw
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    pub vertex_array: VertexArrayHandle,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
    /// Uniform values of the active program at the time of the draw
    pub uniforms: &'a UniformBlock,
}

/// The graphics backend seen by meshes, textures, shaders and the scene.
///
/// Creation calls return `Result`; the remaining calls cannot fail from the
/// caller's point of view and backends log misuse (e.g. a deleted handle)
/// instead of panicking.
pub trait RenderDevice {
    /// Allocates a vertex array describing `layout`
    fn create_vertex_array(&mut self, layout: VertexLayout) -> Result<VertexArrayHandle>;

    /// Allocates a buffer attached to `vertex_array`, initialized with `contents`
    fn create_buffer(
        &mut self,
        vertex_array: VertexArrayHandle,
        kind: BufferKind,
        contents: &[u8],
    ) -> Result<BufferHandle>;

    /// Overwrites part of an existing buffer without reallocating it
    fn write_buffer(&mut self, buffer: BufferHandle, offset: u64, contents: &[u8]);

    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Uploads an RGBA8 image
    fn create_texture(&mut self, image: &TextureImage) -> Result<TextureHandle>;

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    fn unbind_texture(&mut self, unit: u32);

    fn delete_texture(&mut self, texture: TextureHandle);

    /// Compiles and links a program from vertex and fragment sources
    fn create_program(
        &mut self,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramHandle>;

    fn delete_program(&mut self, program: ProgramHandle);

    /// Sets viewport and depth state and clears color and depth
    fn begin_frame(&mut self, settings: FrameSettings);

    /// Makes `program` the target of subsequent draws
    fn use_program(&mut self, program: ProgramHandle);

    fn draw_indexed(&mut self, call: DrawCall<'_>);

    /// Submits the frame's work and presents it
    fn end_frame(&mut self) -> Result<()>;
}
