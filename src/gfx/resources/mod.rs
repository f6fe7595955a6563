//! GPU resource management
//!
//! Shader programs with their uniform state, and textures.

pub mod shader;
pub mod texture_resource;

// Re-export main types
pub use shader::{ShaderProgram, Uniform, UniformBlock};
pub use texture_resource::{Texture, TextureImage, TextureResource};
