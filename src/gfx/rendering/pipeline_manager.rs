//! Render pipeline management for the wgpu backend
//!
//! Each shader program owns a vertex and a fragment module. Pipelines are
//! created lazily per `(program, depth_test)` pair the first time a frame
//! needs them and cached until the program is deleted.

use std::{collections::HashMap, sync::Arc};
use wgpu::*;

use crate::error::{Result, ViewerError};
use crate::gfx::rendering::device::ProgramHandle;
use crate::gfx::scene::vertex::VertexLayout;

/// Configuration for creating a render pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub label: String,
    pub bind_group_layouts: Vec<BindGroupLayout>,
    pub primitive_topology: PrimitiveTopology,
    pub cull_mode: Option<Face>,
    pub depth_format: Option<TextureFormat>,
    pub depth_test: bool,
    pub multisample: MultisampleState,
    pub color_targets: Vec<Option<ColorTargetState>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            label: "Default Pipeline".to_string(),
            bind_group_layouts: Vec::new(),
            primitive_topology: PrimitiveTopology::TriangleList,
            cull_mode: Some(Face::Back),
            depth_format: None,
            depth_test: true,
            multisample: MultisampleState::default(),
            color_targets: vec![Some(ColorTargetState {
                format: TextureFormat::Bgra8Unorm,
                blend: Some(BlendState::REPLACE),
                write_mask: ColorWrites::ALL,
            })],
        }
    }
}

impl PipelineConfig {
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_owned();
        self
    }

    pub fn with_cull_mode(mut self, face: Option<Face>) -> Self {
        self.cull_mode = face;
        self
    }

    pub fn with_bind_group_layouts(mut self, layouts: Vec<BindGroupLayout>) -> Self {
        self.bind_group_layouts = layouts;
        self
    }

    /// Depth attachment format; `None` builds a pipeline without depth state
    pub fn with_depth_format(mut self, format: Option<TextureFormat>) -> Self {
        self.depth_format = format;
        self
    }

    /// With `false` every fragment passes the depth comparison and nothing
    /// is written to the depth buffer
    pub fn with_depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }

    pub fn with_color_format(mut self, format: TextureFormat) -> Self {
        self.color_targets = vec![Some(ColorTargetState {
            format,
            blend: Some(BlendState::REPLACE),
            write_mask: ColorWrites::ALL,
        })];
        self
    }

    pub fn with_primitive_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.primitive_topology = topology;
        self
    }
}

struct ProgramModules {
    label: String,
    vertex: ShaderModule,
    fragment: ShaderModule,
}

/// Compiles shader programs and caches their render pipelines
pub struct PipelineManager {
    device: Arc<Device>,
    base_config: PipelineConfig,
    programs: HashMap<ProgramHandle, ProgramModules>,
    pipelines: HashMap<(ProgramHandle, bool), RenderPipeline>,
}

impl PipelineManager {
    /// `base_config` supplies everything but the label and the depth-test flag
    pub fn new(device: Arc<Device>, base_config: PipelineConfig) -> Self {
        Self {
            device,
            base_config,
            programs: HashMap::new(),
            pipelines: HashMap::new(),
        }
    }

    /// Compiles both stages of a program.
    ///
    /// WGSL errors are caught with a validation error scope and returned as
    /// [`ViewerError::ShaderCompile`] instead of reaching the device's
    /// uncaptured-error handler.
    pub fn load_program(
        &mut self,
        program: ProgramHandle,
        label: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<()> {
        let vertex = self.compile(&format!("{} (vertex)", label), vertex_source)?;
        let fragment = self.compile(&format!("{} (fragment)", label), fragment_source)?;

        self.programs.insert(
            program,
            ProgramModules {
                label: label.to_string(),
                vertex,
                fragment,
            },
        );
        // eager build of the common variant so link errors surface here
        if let Err(error) = self.prepare(program, true) {
            self.programs.remove(&program);
            return Err(error);
        }
        Ok(())
    }

    fn compile(&self, label: &str, source: &str) -> Result<ShaderModule> {
        self.device.push_error_scope(ErrorFilter::Validation);
        let module = self.device.create_shader_module(ShaderModuleDescriptor {
            label: Some(label),
            source: ShaderSource::Wgsl(source.into()),
        });
        match pollster::block_on(self.device.pop_error_scope()) {
            None => Ok(module),
            Some(error) => Err(ViewerError::ShaderCompile {
                label: label.to_string(),
                message: error.to_string(),
            }),
        }
    }

    /// Creates the pipeline for `(program, depth_test)` if it is not cached yet
    pub fn prepare(&mut self, program: ProgramHandle, depth_test: bool) -> Result<()> {
        if self.pipelines.contains_key(&(program, depth_test)) {
            return Ok(());
        }

        let modules = self.programs.get(&program).ok_or(ViewerError::UnknownHandle {
            kind: ProgramHandle::KIND,
            id: program.id(),
        })?;
        let config = self
            .base_config
            .clone()
            .with_label(&modules.label)
            .with_depth_test(depth_test);

        self.device.push_error_scope(ErrorFilter::Validation);
        let pipeline = self.create_pipeline_from_config(modules, &config);
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(ViewerError::ShaderCompile {
                label: modules.label.clone(),
                message: error.to_string(),
            });
        }

        log::debug!(
            "Created pipeline for '{}' (depth test {})",
            modules.label,
            depth_test
        );
        self.pipelines.insert((program, depth_test), pipeline);
        Ok(())
    }

    /// Cached pipeline, present once [`prepare`](Self::prepare) succeeded
    pub fn pipeline(&self, program: ProgramHandle, depth_test: bool) -> Option<&RenderPipeline> {
        self.pipelines.get(&(program, depth_test))
    }

    pub fn has_program(&self, program: ProgramHandle) -> bool {
        self.programs.contains_key(&program)
    }

    /// Drops the program's modules and every pipeline built from them
    pub fn remove_program(&mut self, program: ProgramHandle) -> bool {
        self.pipelines.retain(|(owner, _), _| *owner != program);
        self.programs.remove(&program).is_some()
    }

    fn create_pipeline_from_config(
        &self,
        modules: &ProgramModules,
        config: &PipelineConfig,
    ) -> RenderPipeline {
        let bind_group_layout_refs: Vec<&BindGroupLayout> =
            config.bind_group_layouts.iter().collect();
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&PipelineLayoutDescriptor {
                label: Some(&format!("{} Layout", config.label)),
                bind_group_layouts: &bind_group_layout_refs,
                push_constant_ranges: &[],
            });

        let depth_stencil = config.depth_format.map(|format| DepthStencilState {
            format,
            depth_write_enabled: config.depth_test,
            depth_compare: if config.depth_test {
                CompareFunction::Less
            } else {
                CompareFunction::Always
            },
            stencil: StencilState::default(),
            bias: DepthBiasState::default(),
        });

        self.device
            .create_render_pipeline(&RenderPipelineDescriptor {
                label: Some(&config.label),
                layout: Some(&pipeline_layout),
                vertex: VertexState {
                    module: &modules.vertex,
                    entry_point: Some("vs_main"),
                    buffers: &[VertexLayout::full_buffer_layout()],
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(FragmentState {
                    module: &modules.fragment,
                    entry_point: Some("fs_main"),
                    targets: &config.color_targets,
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: PrimitiveState {
                    topology: config.primitive_topology,
                    strip_index_format: None,
                    front_face: FrontFace::Ccw,
                    cull_mode: config.cull_mode,
                    polygon_mode: PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil,
                multisample: config.multisample,
                multiview: None,
                cache: None,
            })
    }

    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            total_pipelines: self.pipelines.len(),
            loaded_programs: self.programs.len(),
        }
    }
}

/// Statistics about pipeline manager state
#[derive(Debug)]
pub struct PipelineStats {
    pub total_pipelines: usize,
    pub loaded_programs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builders_compose() {
        let config = PipelineConfig::default()
            .with_label("object")
            .with_cull_mode(None)
            .with_depth_format(Some(TextureFormat::Depth32Float))
            .with_depth_test(false)
            .with_color_format(TextureFormat::Rgba8Unorm);

        assert_eq!(config.label, "object");
        assert_eq!(config.cull_mode, None);
        assert_eq!(config.depth_format, Some(TextureFormat::Depth32Float));
        assert!(!config.depth_test);
        let target = config.color_targets[0].as_ref().map(|t| t.format);
        assert_eq!(target, Some(TextureFormat::Rgba8Unorm));
    }

    #[test]
    fn default_culls_back_faces_with_depth_test() {
        let config = PipelineConfig::default();
        assert_eq!(config.cull_mode, Some(Face::Back));
        assert!(config.depth_test);
        assert_eq!(config.primitive_topology, PrimitiveTopology::TriangleList);
    }
}
