//! # Graphics Module
//!
//! Everything between the application shell and the GPU.
//!
//! - **Camera** ([`camera`]) - first-person fly camera and its input controller
//! - **Geometry** ([`geometry`]) - procedural cube, diamond, wall and pyramid meshes
//! - **Rendering** ([`rendering`]) - the [`RenderDevice`] seam with wgpu and headless backends
//! - **Resources** ([`resources`]) - shader programs and textures
//! - **Scene** ([`scene`]) - meshes, model loading and the [`Scene`] draw passes
//!
//! ## Usage
//!
//! ```
//! use corral::gfx::{geometry::create_cube, HeadlessDevice, Scene, ShaderProgram};
//!
//! let mut device = HeadlessDevice::new();
//! let mut shader = ShaderProgram::object_shader(&mut device).unwrap();
//! let mut scene = Scene::new(shader.handle());
//! scene.create_object(&mut device, "cube", create_cube(1.0)).unwrap();
//!
//! let view = cgmath::Matrix4::from_scale(1.0);
//! scene.prepare_draw(&mut device, 640, 480);
//! assert_eq!(scene.draw_objects(&mut device, view, view, &mut shader), 1);
//! ```

pub mod camera;
pub mod geometry;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::{Camera, CameraController};
pub use rendering::{HeadlessDevice, RenderDevice, WgpuDevice};
pub use resources::{ShaderProgram, Texture};
pub use scene::{Mesh, ObjectId, Scene};
