//! # Scene Management Module
//!
//! Meshes, their vertex layouts, model loading, and the [`Scene`] that owns
//! the meshes and orchestrates the per-frame passes.
//!
//! ## Key Components
//!
//! - [`Scene`] - owns meshes and textures; prepare/draw/update/clean-up passes
//! - [`Mesh`] - a drawable object with GPU buffers and a TRS transform
//! - [`ObjectId`] - lookup-only reference to a mesh inside a scene
//! - [`VertexLayout`] - which vertex channels a mesh carries
//!
//! ## Usage
//!
//! ```
//! use corral::gfx::geometry::create_cube;
//! use corral::gfx::rendering::HeadlessDevice;
//! use corral::gfx::resources::ShaderProgram;
//! use corral::gfx::scene::Scene;
//!
//! let mut device = HeadlessDevice::new();
//! let shader = ShaderProgram::object_shader(&mut device).unwrap();
//! let mut scene = Scene::new(shader.handle());
//!
//! let id = scene.create_object(&mut device, "cube", create_cube(1.0)).unwrap();
//! assert_eq!(scene.get_object("cube"), Some(id));
//! scene.clean_up_all(&mut device);
//! ```

pub mod model;
pub mod object;
pub mod scene;
pub mod vertex;

// Re-export main types
pub use model::load_model;
pub use object::{Mesh, MeshBuffers, ObjectId};
pub use scene::{Scene, SceneStatistics, TextureId};
pub use vertex::{VertexChannel, VertexLayout};
