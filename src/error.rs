//! Error types shared across the viewer
//!
//! Every fallible operation in the crate returns [`ViewerError`]. Nothing in
//! the scene core panics on these paths; callers decide whether a failure is
//! fatal (window/device creation) or logged-and-continue (missing objects).

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, ViewerError>;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// A named object is not present in the scene
    #[error("object '{0}' not found in scene")]
    ObjectNotFound(String),

    /// Vertex data was supplied to a mesh whose GPU resources already exist
    #[error("mesh '{0}' is already initialized; vertex data can no longer be replaced")]
    AlreadyInitialized(String),

    /// A GPU operation was requested before `initialize` or after `clean_up`
    #[error("mesh '{0}' has no GPU resources (not initialized or already cleaned up)")]
    NotInitialized(String),

    /// Vertex float count does not match the layout stride
    #[error("vertex data of {len} floats is not a multiple of the {stride}-float stride")]
    InvalidVertexData { len: usize, stride: usize },

    /// An index references a vertex that does not exist
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    /// Texture images must have 1, 3 or 4 channels
    #[error("unsupported texture channel count {channels} in '{}'", .path.display())]
    UnsupportedChannels { channels: u8, path: PathBuf },

    #[error("image decoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("model loading failed: {0}")]
    ModelLoad(#[from] tobj::LoadError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Shader sources were rejected by the backend
    #[error("shader program '{label}' failed to compile: {message}")]
    ShaderCompile { label: String, message: String },

    /// A handle does not name a live backend resource
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u32 },

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("no compatible graphics adapter: {0}")]
    Adapter(String),

    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}
