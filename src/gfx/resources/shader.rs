//! Shader programs and their uniform state
//!
//! A [`ShaderProgram`] pairs a backend program handle with a CPU-side copy of
//! its uniform block. Uniforms are addressed by the names used in the shader
//! sources (`u_ModelMatrix`, `u_objectColor`, ...). Setting a uniform the
//! program does not declare is not an error: it is logged as a probable
//! naming mistake and the draw continues with the previous value.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::error::Result;
use crate::gfx::rendering::device::{ProgramHandle, RenderDevice};

const OBJECT_VERTEX_SHADER: &str = include_str!("../rendering/shaders/object.vert.wgsl");
const OBJECT_FRAGMENT_SHADER: &str = include_str!("../rendering/shaders/object.frag.wgsl");
const LIGHT_VERTEX_SHADER: &str = include_str!("../rendering/shaders/light.vert.wgsl");
const LIGHT_FRAGMENT_SHADER: &str = include_str!("../rendering/shaders/light.frag.wgsl");

/// Every uniform the renderer knows how to feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Uniform {
    ModelMatrix,
    ViewMatrix,
    Projection,
    ObjectColor,
    UseTexture,
    TextureSampler,
    LightPos,
    LightColor,
    ViewPos,
}

impl Uniform {
    pub const ALL: [Uniform; 9] = [
        Uniform::ModelMatrix,
        Uniform::ViewMatrix,
        Uniform::Projection,
        Uniform::ObjectColor,
        Uniform::UseTexture,
        Uniform::TextureSampler,
        Uniform::LightPos,
        Uniform::LightColor,
        Uniform::ViewPos,
    ];

    /// Identifier used in shader sources
    pub const fn name(self) -> &'static str {
        match self {
            Uniform::ModelMatrix => "u_ModelMatrix",
            Uniform::ViewMatrix => "u_ViewMatrix",
            Uniform::Projection => "u_Projection",
            Uniform::ObjectColor => "u_objectColor",
            Uniform::UseTexture => "u_useTexture",
            Uniform::TextureSampler => "textureSampler",
            Uniform::LightPos => "u_lightPos",
            Uniform::LightColor => "u_lightColor",
            Uniform::ViewPos => "u_viewPos",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|u| u.name() == name)
    }
}

/// CPU mirror of the `Uniforms` struct in the bundled WGSL shaders.
///
/// MUST match the WGSL declaration field for field. 256 bytes, which is
/// also the dynamic-offset alignment the wgpu backend uses per draw.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct UniformBlock {
    pub model: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub object_color: [f32; 3],
    pub use_texture: u32,
    pub light_pos: [f32; 3],
    pub texture_sampler: i32,
    pub light_color: [f32; 3],
    _padding0: f32,
    pub view_pos: [f32; 3],
    _padding1: f32,
}
// Total: 3 * 64 + 4 * 16 = 256 bytes

impl Default for UniformBlock {
    fn default() -> Self {
        let identity: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
        Self {
            model: identity,
            view: identity,
            projection: identity,
            object_color: [1.0, 1.0, 1.0],
            use_texture: 0,
            light_pos: [0.0, 0.0, 0.0],
            texture_sampler: 0,
            light_color: [1.0, 1.0, 1.0],
            _padding0: 0.0,
            view_pos: [0.0, 0.0, 0.0],
            _padding1: 0.0,
        }
    }
}

impl UniformBlock {
    fn mat4_slot(&mut self, uniform: Uniform) -> Option<&mut [[f32; 4]; 4]> {
        match uniform {
            Uniform::ModelMatrix => Some(&mut self.model),
            Uniform::ViewMatrix => Some(&mut self.view),
            Uniform::Projection => Some(&mut self.projection),
            _ => None,
        }
    }

    fn vec3_slot(&mut self, uniform: Uniform) -> Option<&mut [f32; 3]> {
        match uniform {
            Uniform::ObjectColor => Some(&mut self.object_color),
            Uniform::LightPos => Some(&mut self.light_pos),
            Uniform::LightColor => Some(&mut self.light_color),
            Uniform::ViewPos => Some(&mut self.view_pos),
            _ => None,
        }
    }

    fn bool_slot(&mut self, uniform: Uniform) -> Option<&mut u32> {
        match uniform {
            Uniform::UseTexture => Some(&mut self.use_texture),
            _ => None,
        }
    }

    fn int_slot(&mut self, uniform: Uniform) -> Option<&mut i32> {
        match uniform {
            Uniform::TextureSampler => Some(&mut self.texture_sampler),
            _ => None,
        }
    }
}

/// A compiled program plus the uniform values that will accompany its draws
pub struct ShaderProgram {
    handle: ProgramHandle,
    label: String,
    declared: HashSet<Uniform>,
    uniforms: UniformBlock,
}

impl ShaderProgram {
    /// Compiles a program from in-memory vertex and fragment sources
    pub fn from_source(
        device: &mut dyn RenderDevice,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<Self> {
        let handle = device.create_program(label, vertex_source, fragment_source)?;
        let declared = declared_uniforms(&[vertex_source, fragment_source]);

        log::debug!(
            "program '{}' ({}) declares {} uniforms",
            label,
            handle,
            declared.len()
        );

        Ok(Self {
            handle,
            label: label.to_owned(),
            declared,
            uniforms: UniformBlock::default(),
        })
    }

    /// Reads the two source files and compiles them; the label is the
    /// vertex file's stem.
    pub fn from_files(
        device: &mut dyn RenderDevice,
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let vertex_path = vertex_path.as_ref();
        let vertex_source = fs::read_to_string(vertex_path)?;
        let fragment_source = fs::read_to_string(fragment_path.as_ref())?;

        let label = vertex_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("shader");

        Self::from_source(device, label, &vertex_source, &fragment_source)
    }

    /// Bundled lit object program (Phong lighting, optional texture)
    pub fn object_shader(device: &mut dyn RenderDevice) -> Result<Self> {
        Self::from_source(device, "object", OBJECT_VERTEX_SHADER, OBJECT_FRAGMENT_SHADER)
    }

    /// Bundled unlit program for light-emitting meshes
    pub fn light_shader(device: &mut dyn RenderDevice) -> Result<Self> {
        Self::from_source(device, "light", LIGHT_VERTEX_SHADER, LIGHT_FRAGMENT_SHADER)
    }

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current uniform values, as they will be sent with the next draw
    pub fn uniforms(&self) -> &UniformBlock {
        &self.uniforms
    }

    pub fn declares(&self, uniform: Uniform) -> bool {
        self.declared.contains(&uniform)
    }

    /// Resolves a uniform name, `None` if this program does not declare it
    pub fn uniform_location(&self, name: &str) -> Option<Uniform> {
        Uniform::from_name(name).filter(|u| self.declared.contains(u))
    }

    pub fn use_program(&self, device: &mut dyn RenderDevice) {
        device.use_program(self.handle);
    }

    pub fn set_mat4(&mut self, name: &str, value: Matrix4<f32>) -> bool {
        let Some(uniform) = self.resolve(name) else {
            return false;
        };
        match self.uniforms.mat4_slot(uniform) {
            Some(slot) => *slot = value.into(),
            None => return self.wrong_kind(name, "mat4"),
        }
        true
    }

    pub fn set_vec3(&mut self, name: &str, value: Vector3<f32>) -> bool {
        let Some(uniform) = self.resolve(name) else {
            return false;
        };
        match self.uniforms.vec3_slot(uniform) {
            Some(slot) => *slot = value.into(),
            None => return self.wrong_kind(name, "vec3"),
        }
        true
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> bool {
        let Some(uniform) = self.resolve(name) else {
            return false;
        };
        match self.uniforms.bool_slot(uniform) {
            Some(slot) => *slot = value as u32,
            None => return self.wrong_kind(name, "bool"),
        }
        true
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> bool {
        let Some(uniform) = self.resolve(name) else {
            return false;
        };
        match self.uniforms.int_slot(uniform) {
            Some(slot) => *slot = value,
            None => return self.wrong_kind(name, "int"),
        }
        true
    }

    pub fn get_mat4(&self, name: &str) -> Option<Matrix4<f32>> {
        let matrix = match self.uniform_location(name)? {
            Uniform::ModelMatrix => self.uniforms.model,
            Uniform::ViewMatrix => self.uniforms.view,
            Uniform::Projection => self.uniforms.projection,
            _ => return None,
        };
        Some(Matrix4::from(matrix))
    }

    pub fn get_vec3(&self, name: &str) -> Option<Vector3<f32>> {
        let value = match self.uniform_location(name)? {
            Uniform::ObjectColor => self.uniforms.object_color,
            Uniform::LightPos => self.uniforms.light_pos,
            Uniform::LightColor => self.uniforms.light_color,
            Uniform::ViewPos => self.uniforms.view_pos,
            _ => return None,
        };
        Some(Vector3::from(value))
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.uniform_location(name)? {
            Uniform::UseTexture => Some(self.uniforms.use_texture != 0),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        match self.uniform_location(name)? {
            Uniform::TextureSampler => Some(self.uniforms.texture_sampler),
            _ => None,
        }
    }

    /// Releases the backend program
    pub fn delete(self, device: &mut dyn RenderDevice) {
        log::debug!("deleting program '{}' ({})", self.label, self.handle);
        device.delete_program(self.handle);
    }

    fn resolve(&self, name: &str) -> Option<Uniform> {
        let uniform = self.uniform_location(name);
        if uniform.is_none() {
            log::warn!(
                "uniform '{}' not found in program '{}' (possible naming mistake)",
                name,
                self.label
            );
        }
        uniform
    }

    fn wrong_kind(&self, name: &str, expected: &str) -> bool {
        log::warn!(
            "uniform '{}' in program '{}' is not a {}",
            name,
            self.label,
            expected
        );
        false
    }
}

/// Known uniforms that appear as whole identifiers in any of the sources
fn declared_uniforms(sources: &[&str]) -> HashSet<Uniform> {
    Uniform::ALL
        .into_iter()
        .filter(|u| sources.iter().any(|src| contains_identifier(src, u.name())))
        .collect()
}

fn contains_identifier(source: &str, ident: &str) -> bool {
    let is_ident_char = |c: char| c.is_ascii_alphanumeric() || c == '_';

    source.match_indices(ident).any(|(start, _)| {
        let before = source[..start].chars().next_back();
        let after = source[start + ident.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::rendering::headless::HeadlessDevice;

    const MINIMAL_VS: &str = "struct Uniforms { u_ModelMatrix: mat4x4<f32>, u_ViewMatrix: mat4x4<f32>, u_Projection: mat4x4<f32>, };\n@vertex fn vs_main() {}";
    const MINIMAL_FS: &str = "@fragment fn fs_main() {}";

    #[test]
    fn uniform_block_matches_wgsl_size() {
        assert_eq!(std::mem::size_of::<UniformBlock>(), 256);
    }

    #[test]
    fn bundled_programs_declare_every_uniform() {
        let mut device = HeadlessDevice::new();
        let object = ShaderProgram::object_shader(&mut device).unwrap();
        let light = ShaderProgram::light_shader(&mut device).unwrap();

        for uniform in Uniform::ALL {
            assert!(object.declares(uniform), "object missing {}", uniform.name());
            assert!(light.declares(uniform), "light missing {}", uniform.name());
        }
    }

    #[test]
    fn declared_uniforms_match_whole_identifiers_only() {
        let declared = declared_uniforms(&["let x = u_lightPosition; let y = my_u_viewPos;"]);
        assert!(declared.is_empty());

        let declared = declared_uniforms(&["uniforms.u_lightPos", "(u_viewPos)"]);
        assert!(declared.contains(&Uniform::LightPos));
        assert!(declared.contains(&Uniform::ViewPos));
        assert_eq!(declared.len(), 2);
    }

    #[test]
    fn setting_declared_uniform_updates_block() {
        let mut device = HeadlessDevice::new();
        let mut program = ShaderProgram::object_shader(&mut device).unwrap();

        let model = Matrix4::from_translation(Vector3::new(1.0, 2.0, 3.0));
        assert!(program.set_mat4("u_ModelMatrix", model));
        assert_eq!(program.get_mat4("u_ModelMatrix"), Some(model));

        assert!(program.set_vec3("u_objectColor", Vector3::new(0.2, 0.4, 0.6)));
        assert_eq!(program.uniforms().object_color, [0.2, 0.4, 0.6]);

        assert!(program.set_bool("u_useTexture", true));
        assert_eq!(program.get_bool("u_useTexture"), Some(true));

        assert!(program.set_int("textureSampler", 2));
        assert_eq!(program.get_int("textureSampler"), Some(2));
    }

    #[test]
    fn missing_uniform_is_tolerated() {
        let mut device = HeadlessDevice::new();
        let mut program =
            ShaderProgram::from_source(&mut device, "minimal", MINIMAL_VS, MINIMAL_FS).unwrap();
        let before = *program.uniforms();

        assert!(!program.set_vec3("u_lightPos", Vector3::new(1.0, 1.0, 1.0)));
        assert!(!program.set_mat4("u_modelmatrix", Matrix4::identity()));
        assert_eq!(*program.uniforms(), before);
        assert_eq!(program.uniform_location("u_lightPos"), None);
        assert_eq!(
            program.uniform_location("u_Projection"),
            Some(Uniform::Projection)
        );
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let mut device = HeadlessDevice::new();
        let mut program = ShaderProgram::object_shader(&mut device).unwrap();

        let before = *program.uniforms();

        assert!(!program.set_bool("u_ModelMatrix", true));
        assert!(!program.set_mat4("u_objectColor", Matrix4::identity()));
        assert!(!program.set_vec3("u_Projection", Vector3::new(2.0, 2.0, 2.0)));
        assert!(!program.set_int("u_useTexture", 1));
        assert!(!program.set_mat4("textureSampler", Matrix4::from_scale(3.0)));
        assert_eq!(*program.uniforms(), before);
        assert_eq!(program.get_vec3("u_objectColor"), Some(Vector3::new(1.0, 1.0, 1.0)));
    }

    #[test]
    fn programs_load_from_files() {
        let dir = std::env::temp_dir().join(format!("corral-shader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let vs = dir.join("flat.vert.wgsl");
        let fs_path = dir.join("flat.frag.wgsl");
        std::fs::write(&vs, MINIMAL_VS).unwrap();
        std::fs::write(&fs_path, MINIMAL_FS).unwrap();

        let mut device = HeadlessDevice::new();
        let program = ShaderProgram::from_files(&mut device, &vs, &fs_path).unwrap();
        assert_eq!(program.label(), "flat.vert");
        assert!(program.declares(Uniform::ViewMatrix));

        let missing = ShaderProgram::from_files(&mut device, dir.join("nope.wgsl"), &fs_path);
        assert!(matches!(missing, Err(crate::error::ViewerError::Io(_))));

        std::fs::remove_dir_all(&dir).ok();
    }
}
