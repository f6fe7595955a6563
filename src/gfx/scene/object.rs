//! # Mesh
//!
//! A drawable object: interleaved vertex data and triangle indices on the
//! CPU, the matching GPU vertex array and buffers once initialized, and a
//! translate/rotate/scale transform.
//!
//! ## Lifecycle
//!
//! 1. [`Mesh::specify_vertices`] stores the data (only before initialization)
//! 2. [`Mesh::initialize`] allocates the vertex array, vertex buffer and index buffer
//! 3. [`Mesh::update_buffers`] re-uploads vertex data in place after edits
//!    such as [`Mesh::set_color`]
//! 4. [`Mesh::draw`] may be called any number of times
//! 5. [`Mesh::clean_up`] releases the GPU resources; repeated calls are no-ops

use std::fmt;

use cgmath::{Deg, InnerSpace, Matrix4, SquareMatrix, Vector3};

use crate::error::{Result, ViewerError};
use crate::gfx::geometry::MeshData;
use crate::gfx::rendering::device::{
    BufferHandle, BufferKind, DrawCall, RenderDevice, TextureHandle, VertexArrayHandle,
};
use crate::gfx::resources::shader::ShaderProgram;
use crate::gfx::scene::vertex::{VertexChannel, VertexLayout};

/// Texture unit meshes bind their texture to
pub const TEXTURE_UNIT: u32 = 0;

/// Stable reference to a mesh owned by a [`Scene`](super::Scene).
///
/// Ids are invalidated by [`Scene::clean_up_all`](super::Scene::clean_up_all):
/// the generation no longer matches and lookups return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

impl ObjectId {
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}v{}", self.index, self.generation)
    }
}

/// The three GPU resources of an initialized mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshBuffers {
    pub vertex_array: VertexArrayHandle,
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
}

#[derive(Debug)]
pub struct Mesh {
    layout: VertexLayout,
    vertices: Vec<f32>,
    indices: Vec<u32>,
    buffers: Option<MeshBuffers>,
    /// CPU vertex data differs from the last upload
    dirty: bool,

    name: String,
    position: Vector3<f32>,
    rotation_angle: Deg<f32>,
    rotation_axis: Vector3<f32>,
    scale: Vector3<f32>,
    color: Vector3<f32>,
    light_emitter: bool,
    texture: Option<TextureHandle>,
}

impl Mesh {
    /// Empty mesh whose vertices will follow `layout`
    pub fn new(layout: VertexLayout) -> Self {
        Self {
            layout,
            vertices: Vec::new(),
            indices: Vec::new(),
            buffers: None,
            dirty: false,
            name: String::new(),
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation_angle: Deg(0.0),
            rotation_axis: Vector3::unit_y(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            color: Vector3::new(1.0, 1.0, 1.0),
            light_emitter: false,
            texture: None,
        }
    }

    /// Mesh holding factory or loader output, not yet initialized
    pub fn from_data(data: MeshData) -> Result<Self> {
        let mut mesh = Self::new(data.layout);
        mesh.specify_vertices(data.vertices, data.indices)?;
        Ok(mesh)
    }

    /// Stores vertex and index data.
    ///
    /// Fails once the mesh is initialized, when the float count is not a
    /// multiple of the layout stride, or when an index points past the last
    /// vertex.
    pub fn specify_vertices(&mut self, vertices: Vec<f32>, indices: Vec<u32>) -> Result<()> {
        if self.buffers.is_some() {
            log::warn!("mesh '{}': vertices specified after initialize", self.name);
            return Err(ViewerError::AlreadyInitialized(self.name.clone()));
        }

        let stride = self.layout.stride();
        if vertices.len() % stride != 0 {
            return Err(ViewerError::InvalidVertexData {
                len: vertices.len(),
                stride,
            });
        }

        let vertex_count = vertices.len() / stride;
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(ViewerError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }

        self.vertices = vertices;
        self.indices = indices;
        self.dirty = true;
        Ok(())
    }

    /// Allocates the vertex array and both buffers from the current data.
    /// Calling it on an initialized mesh does nothing.
    pub fn initialize(&mut self, device: &mut dyn RenderDevice) -> Result<()> {
        if self.buffers.is_some() {
            log::debug!("mesh '{}' already initialized", self.name);
            return Ok(());
        }

        let vertex_array = device.create_vertex_array(self.layout)?;

        let vertex_buffer = match device.create_buffer(
            vertex_array,
            BufferKind::Vertex,
            bytemuck::cast_slice(&self.vertices),
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                device.delete_vertex_array(vertex_array);
                return Err(e);
            }
        };

        let index_buffer = match device.create_buffer(
            vertex_array,
            BufferKind::Index,
            bytemuck::cast_slice(&self.indices),
        ) {
            Ok(buffer) => buffer,
            Err(e) => {
                device.delete_buffer(vertex_buffer);
                device.delete_vertex_array(vertex_array);
                return Err(e);
            }
        };

        self.buffers = Some(MeshBuffers {
            vertex_array,
            vertex_buffer,
            index_buffer,
        });
        self.dirty = false;

        log::debug!(
            "mesh '{}' initialized: {} vertices, {} indices ({})",
            self.name,
            self.vertex_count(),
            self.indices.len(),
            vertex_array
        );
        Ok(())
    }

    /// Re-uploads vertex data into the existing buffer if it changed since
    /// the last upload
    pub fn update_buffers(&mut self, device: &mut dyn RenderDevice) {
        if self.dirty {
            self.force_update_buffers(device);
        }
    }

    /// Re-uploads vertex data into the existing buffer unconditionally
    pub fn force_update_buffers(&mut self, device: &mut dyn RenderDevice) {
        let Some(buffers) = self.buffers else {
            log::warn!("mesh '{}': buffer update before initialize", self.name);
            return;
        };

        device.write_buffer(
            buffers.vertex_buffer,
            0,
            bytemuck::cast_slice(&self.vertices),
        );
        self.dirty = false;
    }

    /// Issues one indexed draw with `shader`'s current uniforms.
    ///
    /// Sets `u_useTexture`, `textureSampler` and `u_objectColor` first and
    /// brackets the draw with texture bind/unbind when a texture is set.
    pub fn draw(&self, device: &mut dyn RenderDevice, shader: &mut ShaderProgram) -> Result<()> {
        let Some(buffers) = self.buffers else {
            log::error!("mesh '{}' drawn before initialize", self.name);
            return Err(ViewerError::NotInitialized(self.name.clone()));
        };

        shader.set_bool("u_useTexture", self.texture.is_some());
        if let Some(texture) = self.texture {
            shader.set_int("textureSampler", TEXTURE_UNIT as i32);
            device.bind_texture(TEXTURE_UNIT, texture);
        }
        // colour channels already carry the colour; the uniform tints the rest
        let tint = if self.layout.contains(VertexChannel::Color) {
            Vector3::new(1.0, 1.0, 1.0)
        } else {
            self.color
        };
        shader.set_vec3("u_objectColor", tint);

        device.draw_indexed(DrawCall {
            vertex_array: buffers.vertex_array,
            vertex_buffer: buffers.vertex_buffer,
            index_buffer: buffers.index_buffer,
            index_count: self.indices.len() as u32,
            uniforms: shader.uniforms(),
        });

        if self.texture.is_some() {
            device.unbind_texture(TEXTURE_UNIT);
        }
        Ok(())
    }

    /// Releases the GPU resources; later calls are no-ops
    pub fn clean_up(&mut self, device: &mut dyn RenderDevice) {
        if let Some(buffers) = self.buffers.take() {
            device.delete_buffer(buffers.vertex_buffer);
            device.delete_buffer(buffers.index_buffer);
            device.delete_vertex_array(buffers.vertex_array);
            log::debug!("mesh '{}' cleaned up", self.name);
        }
    }

    /// `translate(position) * rotate(angle, axis) * scale(scale)`
    pub fn model_matrix(&self) -> Matrix4<f32> {
        let t = Matrix4::from_translation(self.position);
        let r = if self.rotation_axis.magnitude2() > 0.0 {
            Matrix4::from_axis_angle(self.rotation_axis.normalize(), self.rotation_angle)
        } else {
            Matrix4::identity()
        };
        let s = Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z);
        t * r * s // Order matters: T * R * S
    }

    /// Sets the object color and rewrites the color channel of every vertex
    /// in the CPU buffer. Not uploaded until [`Mesh::update_buffers`].
    pub fn set_color(&mut self, color: Vector3<f32>) {
        self.color = color;

        let Some(offset) = self.layout.offset(VertexChannel::Color) else {
            return;
        };
        let rgb: [f32; 3] = color.into();
        for vertex in self.vertices.chunks_exact_mut(self.layout.stride()) {
            vertex[offset..offset + 3].copy_from_slice(&rgb);
        }
        self.dirty = true;
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
    }

    /// Rotation of `angle` around `axis` (normalized when the matrix is built)
    pub fn set_rotation(&mut self, angle: Deg<f32>, axis: Vector3<f32>) {
        self.rotation_angle = angle;
        self.rotation_axis = axis;
    }

    pub fn set_scale(&mut self, scale: Vector3<f32>) {
        self.scale = scale;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_light_emitter(&mut self, light_emitter: bool) {
        self.light_emitter = light_emitter;
    }

    /// Non-owning texture reference; the texture must outlive its use here
    pub fn set_texture(&mut self, texture: Option<TextureHandle>) {
        self.texture = texture;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn rotation(&self) -> (Deg<f32>, Vector3<f32>) {
        (self.rotation_angle, self.rotation_axis)
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.scale
    }

    pub fn color(&self) -> Vector3<f32> {
        self.color
    }

    pub fn is_light_emitter(&self) -> bool {
        self.light_emitter
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn is_initialized(&self) -> bool {
        self.buffers.is_some()
    }

    pub fn buffers(&self) -> Option<MeshBuffers> {
        self.buffers
    }

    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    pub fn vertex_count(&self) -> usize {
        self.layout.vertex_count(self.vertices.len())
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    /// Mutable vertex data for procedural animation; marks the buffer for
    /// the next [`Mesh::update_buffers`]
    pub fn vertices_mut(&mut self) -> &mut [f32] {
        self.dirty = true;
        &mut self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new(VertexLayout::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::geometry::{create_cube, create_wall};
    use crate::gfx::rendering::headless::{DeviceCommand, HeadlessDevice};
    use cgmath::{Matrix, Vector4};

    fn initialized_cube(device: &mut HeadlessDevice) -> Mesh {
        let mut mesh = Mesh::from_data(create_cube(1.0)).unwrap();
        mesh.set_name("cube");
        mesh.initialize(device).unwrap();
        mesh
    }

    fn assert_matrix_eq(a: Matrix4<f32>, b: Matrix4<f32>) {
        let a: &[f32; 16] = a.as_ref();
        let b: &[f32; 16] = b.as_ref();
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-5, "{:?} != {:?}", a, b);
        }
    }

    #[test]
    fn specify_after_initialize_fails() {
        let mut device = HeadlessDevice::new();
        let mut mesh = initialized_cube(&mut device);

        let cube = create_cube(1.0);
        let result = mesh.specify_vertices(cube.vertices, cube.indices);
        assert!(matches!(result, Err(ViewerError::AlreadyInitialized(_))));
    }

    #[test]
    fn specify_validates_stride_and_indices() {
        let mut mesh = Mesh::new(VertexLayout::EXTENDED);
        assert!(matches!(
            mesh.specify_vertices(vec![0.0; 7], vec![]),
            Err(ViewerError::InvalidVertexData { len: 7, stride: 6 })
        ));
        assert!(matches!(
            mesh.specify_vertices(vec![0.0; 12], vec![0, 1, 2]),
            Err(ViewerError::IndexOutOfRange {
                index: 2,
                vertex_count: 2
            })
        ));
        assert!(mesh.specify_vertices(vec![0.0; 18], vec![0, 1, 2]).is_ok());
    }

    #[test]
    fn initialize_allocates_once() {
        let mut device = HeadlessDevice::new();
        let mut mesh = initialized_cube(&mut device);
        assert!(mesh.is_initialized());
        assert_eq!(device.live_vertex_array_count(), 1);
        assert_eq!(device.live_buffer_count(), 2);

        mesh.initialize(&mut device).unwrap();
        assert_eq!(device.live_buffer_count(), 2);

        let buffers = mesh.buffers().unwrap();
        assert_eq!(
            device.vertex_array_layout(buffers.vertex_array),
            Some(VertexLayout::FULL)
        );
    }

    #[test]
    fn clean_up_releases_everything_once() {
        let mut device = HeadlessDevice::new();
        let mut mesh = initialized_cube(&mut device);

        mesh.clean_up(&mut device);
        mesh.clean_up(&mut device);

        assert!(!mesh.is_initialized());
        assert_eq!(device.live_buffer_count(), 0);
        assert_eq!(device.live_vertex_array_count(), 0);
        let deletes = device
            .commands()
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    DeviceCommand::DeleteBuffer(_) | DeviceCommand::DeleteVertexArray(_)
                )
            })
            .count();
        assert_eq!(deletes, 3);
    }

    #[test]
    fn model_matrix_is_translate_rotate_scale() {
        let mut mesh = Mesh::default();
        assert_eq!(mesh.model_matrix(), Matrix4::identity());

        let position = Vector3::new(1.0, -2.0, 3.0);
        let axis = Vector3::new(1.0, 1.0, 0.0);
        let scale = Vector3::new(2.0, 0.5, 1.5);
        mesh.set_position(position);
        mesh.set_rotation(Deg(30.0), axis);
        mesh.set_scale(scale);

        let expected = Matrix4::from_translation(position)
            * Matrix4::from_axis_angle(axis.normalize(), Deg(30.0))
            * Matrix4::from_nonuniform_scale(2.0, 0.5, 1.5);
        assert_matrix_eq(mesh.model_matrix(), expected);

        // moving only changes the translation column
        let before = mesh.model_matrix();
        mesh.set_position(Vector3::new(-4.0, 0.0, 9.0));
        let after = mesh.model_matrix();
        for col in 0..3 {
            assert_eq!(before[col], after[col]);
        }
        assert_eq!(after[3], Vector4::new(-4.0, 0.0, 9.0, 1.0));
        assert_eq!(after.row(3), Vector4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn set_color_is_visible_only_after_update() {
        let mut device = HeadlessDevice::new();
        let mut mesh = initialized_cube(&mut device);
        let vertex_buffer = mesh.buffers().unwrap().vertex_buffer;
        let uploaded = device.vertex_floats(vertex_buffer).unwrap();

        mesh.set_color(Vector3::new(0.25, 0.5, 0.75));
        assert_eq!(device.vertex_floats(vertex_buffer).unwrap(), uploaded);
        assert_eq!(device.write_count(vertex_buffer), 0);

        mesh.update_buffers(&mut device);
        let floats = device.vertex_floats(vertex_buffer).unwrap();
        for vertex in floats.chunks_exact(VertexLayout::FULL.stride()) {
            assert_eq!(&vertex[3..6], &[0.25, 0.5, 0.75]);
        }
        assert_eq!(device.write_count(vertex_buffer), 1);
    }

    #[test]
    fn update_skips_clean_buffers_unless_forced() {
        let mut device = HeadlessDevice::new();
        let mut mesh = initialized_cube(&mut device);
        let vertex_buffer = mesh.buffers().unwrap().vertex_buffer;

        mesh.update_buffers(&mut device);
        assert_eq!(device.write_count(vertex_buffer), 0);

        mesh.force_update_buffers(&mut device);
        assert_eq!(device.write_count(vertex_buffer), 1);

        mesh.vertices_mut()[0] = 42.0;
        mesh.update_buffers(&mut device);
        assert_eq!(device.write_count(vertex_buffer), 2);
        assert_eq!(device.vertex_floats(vertex_buffer).unwrap()[0], 42.0);
    }

    #[test]
    fn draw_before_initialize_is_refused() {
        let mut device = HeadlessDevice::new();
        let mut shader = ShaderProgram::object_shader(&mut device).unwrap();
        let mesh = Mesh::from_data(create_wall(2.0, 0.1, 6.0)).unwrap();

        let result = mesh.draw(&mut device, &mut shader);
        assert!(matches!(result, Err(ViewerError::NotInitialized(_))));
        assert!(device.draws().is_empty());
    }

    #[test]
    fn draw_sets_color_and_texture_state() {
        let mut device = HeadlessDevice::new();
        let mut shader = ShaderProgram::object_shader(&mut device).unwrap();
        let mut mesh = initialized_cube(&mut device);
        mesh.set_color(Vector3::new(0.1, 0.2, 0.3));

        mesh.draw(&mut device, &mut shader).unwrap();
        let draw = &device.draws()[0];
        assert_eq!(draw.index_count, 36);
        assert_eq!(draw.uniforms.object_color, [1.0, 1.0, 1.0]);
        assert_eq!(draw.uniforms.use_texture, 0);
        assert_eq!(draw.texture, None);

        let texture = device
            .create_texture(&crate::gfx::resources::texture_resource::TextureImage::white())
            .unwrap();
        mesh.set_texture(Some(texture));
        mesh.draw(&mut device, &mut shader).unwrap();

        let draw = &device.draws()[1];
        assert_eq!(draw.uniforms.use_texture, 1);
        assert_eq!(draw.texture, Some(texture));
        assert_eq!(
            device.commands().last(),
            Some(&DeviceCommand::UnbindTexture { unit: TEXTURE_UNIT })
        );
    }

    #[test]
    fn colourless_layout_is_tinted_through_the_uniform() {
        let mut device = HeadlessDevice::new();
        let mut shader = ShaderProgram::object_shader(&mut device).unwrap();
        let data = MeshData {
            vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            indices: vec![0, 1, 2],
            layout: VertexLayout::MINIMAL,
        };
        let mut mesh = Mesh::from_data(data).unwrap();
        mesh.initialize(&mut device).unwrap();
        mesh.set_color(Vector3::new(0.9, 0.5, 0.1));

        mesh.draw(&mut device, &mut shader).unwrap();
        assert_eq!(device.draws()[0].uniforms.object_color, [0.9, 0.5, 0.1]);
    }
}
