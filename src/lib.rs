//! Corral 3D Viewer
//!
//! A small real-time scene viewer built on wgpu and winit: procedural meshes
//! and OBJ models, a first-person fly camera, and a single point light.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;
pub mod logging;
pub mod prelude;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use app::{AppContext, CorralApp};
pub use config::{CameraConfig, ViewerConfig};
pub use error::{Result, ViewerError};
pub use logging::{init_logging, LoggingConfig};
