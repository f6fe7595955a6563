//! Core rendering functionality
//!
//! The [`RenderDevice`] seam, the wgpu backend that renders to a window, and
//! the in-memory backend used by tests.

pub mod device;
pub mod headless;
pub mod pipeline_manager;
pub mod render_engine;

// Re-export main types
pub use device::{
    BufferHandle, BufferKind, DrawCall, FrameSettings, ProgramHandle, RenderDevice,
    TextureHandle, VertexArrayHandle, Viewport,
};
pub use headless::{DeviceCommand, DrawRecord, HeadlessDevice};
pub use pipeline_manager::{PipelineConfig, PipelineManager, PipelineStats};
pub use render_engine::WgpuDevice;
