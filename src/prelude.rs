//! # Corral Prelude
//!
//! Commonly used types for building a scene:
//!
//! ```no_run
//! use corral::prelude::*;
//!
//! fn main() -> corral::Result<()> {
//!     CorralApp::new(ViewerConfig::default())
//!         .with_setup(|ctx| {
//!             let cube = ctx.scene.create_object(&mut ctx.device, "cube", create_cube(1.0))?;
//!             if let Some(mesh) = ctx.scene.object_mut(cube) {
//!                 mesh.set_position(Vector3::new(0.0, 0.0, -3.0));
//!             }
//!             Ok(())
//!         })
//!         .run()
//! }
//! ```

// Application shell
pub use crate::app::{AppContext, CorralApp};
pub use crate::config::{CameraConfig, ViewerConfig};
pub use crate::error::{Result, ViewerError};
pub use crate::logging::{init_logging, LoggingConfig};

// Scene and geometry
pub use crate::gfx::camera::{Camera, CameraController};
pub use crate::gfx::geometry::{
    create_cube, create_diamond, create_pyramid, create_wall, MeshData,
};
pub use crate::gfx::rendering::{HeadlessDevice, RenderDevice, WgpuDevice};
pub use crate::gfx::resources::{ShaderProgram, Texture};
pub use crate::gfx::scene::{load_model, Mesh, ObjectId, Scene, VertexLayout};

// Common external types
pub use cgmath::{Deg, InnerSpace, Vector3, Zero};
