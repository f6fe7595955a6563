use std::path::Path;

use cgmath::{Matrix4, Vector3};

use crate::error::{Result, ViewerError};
use crate::gfx::geometry::MeshData;
use crate::gfx::rendering::device::{FrameSettings, ProgramHandle, RenderDevice, Viewport};
use crate::gfx::resources::shader::ShaderProgram;
use crate::gfx::resources::texture_resource::Texture;

use super::model::load_model;
use super::object::{Mesh, ObjectId};

pub const DEFAULT_CLEAR_COLOR: [f32; 4] = [0.1, 0.2, 0.3, 1.0];

/// Reference to a texture owned by a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId {
    index: usize,
    generation: u32,
}

/// Main scene: owns the meshes and the textures they use and drives the
/// per-frame prepare/draw/update passes over them
pub struct Scene {
    objects: Vec<Mesh>,
    textures: Vec<Texture>,
    program: ProgramHandle,
    clear_color: [f32; 4],
    /// Bumped by `clean_up_all` so stale ids stop resolving
    generation: u32,
}

impl Scene {
    /// Creates an empty scene drawn with `program`
    pub fn new(program: ProgramHandle) -> Self {
        Self {
            objects: Vec::new(),
            textures: Vec::new(),
            program,
            clear_color: DEFAULT_CLEAR_COLOR,
            generation: 0,
        }
    }

    pub fn set_shader_program(&mut self, program: ProgramHandle) {
        self.program = program;
    }

    pub fn shader_program(&self) -> ProgramHandle {
        self.program
    }

    pub fn set_clear_color(&mut self, clear_color: [f32; 4]) {
        self.clear_color = clear_color;
    }

    /// Builds a mesh from `data`, uploads it and takes ownership.
    ///
    /// A name already in use gets a ` (n)` suffix.
    pub fn create_object(
        &mut self,
        device: &mut dyn RenderDevice,
        name: &str,
        data: MeshData,
    ) -> Result<ObjectId> {
        let unique_name = self.ensure_unique_name(name);
        if unique_name != name {
            log::warn!("object name '{}' taken, using '{}'", name, unique_name);
        }

        let mut mesh = Mesh::from_data(data)?;
        mesh.set_name(unique_name);
        mesh.initialize(device)?;

        let id = ObjectId {
            index: self.objects.len(),
            generation: self.generation,
        };
        log::debug!("created object '{}' as {}", mesh.name(), id);
        self.objects.push(mesh);
        Ok(id)
    }

    /// Loads an OBJ file and adds it like [`Scene::create_object`]
    pub fn create_model(
        &mut self,
        device: &mut dyn RenderDevice,
        name: &str,
        path: impl AsRef<Path>,
    ) -> Result<ObjectId> {
        let data = load_model(path)?;
        self.create_object(device, name, data)
    }

    /// Looks an object up by name; logs and returns `None` when absent
    pub fn get_object(&self, name: &str) -> Option<ObjectId> {
        match self.objects.iter().position(|mesh| mesh.name() == name) {
            Some(index) => Some(ObjectId {
                index,
                generation: self.generation,
            }),
            None => {
                log::warn!("object '{}' not found in scene", name);
                None
            }
        }
    }

    /// Like [`Scene::get_object`], but a missing name is an error
    pub fn require_object(&self, name: &str) -> Result<ObjectId> {
        self.objects
            .iter()
            .position(|mesh| mesh.name() == name)
            .map(|index| ObjectId {
                index,
                generation: self.generation,
            })
            .ok_or_else(|| ViewerError::ObjectNotFound(name.to_string()))
    }

    pub fn get_object_mut(&mut self, name: &str) -> Option<&mut Mesh> {
        let id = self.get_object(name)?;
        self.object_mut(id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&Mesh> {
        if id.generation != self.generation {
            return None;
        }
        self.objects.get(id.index)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Mesh> {
        if id.generation != self.generation {
            return None;
        }
        self.objects.get_mut(id.index)
    }

    /// Objects in insertion (= draw) order
    pub fn objects(&self) -> impl Iterator<Item = &Mesh> {
        self.objects.iter()
    }

    pub fn object_names(&self) -> impl Iterator<Item = &str> {
        self.objects.iter().map(Mesh::name)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// First light-emitting object in draw order
    pub fn first_light(&self) -> Option<&Mesh> {
        self.objects.iter().find(|mesh| mesh.is_light_emitter())
    }

    /// Position of the first light-emitting object
    pub fn light_position(&self) -> Option<Vector3<f32>> {
        self.first_light().map(Mesh::position)
    }

    /// Colour of the first light-emitting object
    pub fn light_color(&self) -> Option<Vector3<f32>> {
        self.first_light().map(Mesh::color)
    }

    /// Decodes and uploads an image; the scene releases it in
    /// [`Scene::clean_up_all`]
    pub fn load_texture(
        &mut self,
        device: &mut dyn RenderDevice,
        path: impl AsRef<Path>,
    ) -> Result<TextureId> {
        let texture = Texture::load(path)?;
        self.add_texture(device, texture)
    }

    /// Uploads an already-decoded texture and takes ownership of it
    pub fn add_texture(
        &mut self,
        device: &mut dyn RenderDevice,
        mut texture: Texture,
    ) -> Result<TextureId> {
        texture.upload(device)?;
        let id = TextureId {
            index: self.textures.len(),
            generation: self.generation,
        };
        self.textures.push(texture);
        Ok(id)
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        if id.generation != self.generation {
            return None;
        }
        self.textures.get(id.index)
    }

    /// Starts a frame: viewport, depth test, clear, and activates the
    /// scene's program. Call once per frame before drawing.
    pub fn prepare_draw(&self, device: &mut dyn RenderDevice, width: u32, height: u32) {
        device.begin_frame(FrameSettings {
            viewport: Viewport::new(width, height),
            clear_color: self.clear_color,
            depth_test: true,
        });
        device.use_program(self.program);
    }

    /// Draws every object that is not a light emitter with `shader`.
    /// Returns the number of draws issued.
    pub fn draw_objects(
        &self,
        device: &mut dyn RenderDevice,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        shader: &mut ShaderProgram,
    ) -> usize {
        self.draw_pass(device, view, projection, shader, false)
    }

    /// Draws the light-emitting objects with `light_shader`, feeding each
    /// one's color as `u_lightColor`. Returns the number of draws issued.
    pub fn draw_light_sources(
        &self,
        device: &mut dyn RenderDevice,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        light_shader: &mut ShaderProgram,
    ) -> usize {
        self.draw_pass(device, view, projection, light_shader, true)
    }

    fn draw_pass(
        &self,
        device: &mut dyn RenderDevice,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        shader: &mut ShaderProgram,
        lights: bool,
    ) -> usize {
        let mut members = self
            .objects
            .iter()
            .filter(|mesh| mesh.is_light_emitter() == lights)
            .peekable();
        if members.peek().is_none() {
            return 0;
        }

        shader.use_program(device);
        shader.set_mat4("u_ViewMatrix", view);
        shader.set_mat4("u_Projection", projection);

        let mut drawn = 0;
        for mesh in members {
            shader.set_mat4("u_ModelMatrix", mesh.model_matrix());
            if lights {
                shader.set_vec3("u_lightColor", mesh.color());
            }
            if mesh.draw(device, shader).is_ok() {
                drawn += 1;
            }
        }
        drawn
    }

    /// Re-uploads vertex data of every object that changed
    pub fn update_all(&mut self, device: &mut dyn RenderDevice) {
        for mesh in &mut self.objects {
            mesh.update_buffers(device);
        }
    }

    /// Releases every object's GPU resources, then every texture, and
    /// empties the scene. Ids handed out earlier stop resolving.
    pub fn clean_up_all(&mut self, device: &mut dyn RenderDevice) {
        log::debug!(
            "cleaning up {} objects and {} textures",
            self.objects.len(),
            self.textures.len()
        );

        for mesh in &mut self.objects {
            mesh.clean_up(device);
        }
        self.objects.clear();

        for texture in &mut self.textures {
            texture.clean_up(device);
        }
        self.textures.clear();

        self.generation = self.generation.wrapping_add(1);
    }

    /// Gets statistics about the scene
    pub fn statistics(&self) -> SceneStatistics {
        SceneStatistics {
            object_count: self.objects.len(),
            light_count: self.objects.iter().filter(|m| m.is_light_emitter()).count(),
            texture_count: self.textures.len(),
            total_vertices: self.objects.iter().map(Mesh::vertex_count).sum(),
            total_triangles: self.objects.iter().map(|m| m.index_count() / 3).sum(),
        }
    }

    fn ensure_unique_name(&self, desired_name: &str) -> String {
        let mut counter = 0;
        let mut test_name = desired_name.to_string();

        while self.objects.iter().any(|obj| obj.name() == test_name) {
            counter += 1;
            test_name = format!("{} ({})", desired_name, counter);
        }

        test_name
    }
}

/// Scene statistics for debugging and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneStatistics {
    pub object_count: usize,
    pub light_count: usize,
    pub texture_count: usize,
    pub total_vertices: usize,
    pub total_triangles: usize,
}
