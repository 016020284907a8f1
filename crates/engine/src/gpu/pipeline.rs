use std::borrow::Cow;

use crate::compile::{
    collect_device_errors, front_end_check, with_vertex_stage, CompileDiagnostics, Diagnostic,
    FRAGMENT_ENTRY, VERTEX_ENTRY,
};

/// A validated render pipeline tagged with the submission that produced it.
pub(crate) struct Pipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub generation: u64,
}

/// Builds render pipelines against the shared parameter layout and the
/// target's format.
pub(crate) struct PipelineCompiler {
    layout: wgpu::PipelineLayout,
    format: wgpu::TextureFormat,
}

impl PipelineCompiler {
    pub fn new(
        device: &wgpu::Device,
        bind_group_layout: &wgpu::BindGroupLayout,
        format: wgpu::TextureFormat,
    ) -> Self {
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shader pipeline layout"),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });
        Self { layout, format }
    }

    /// Compiles `fragment` behind the engine's vertex stage.
    ///
    /// Module diagnostics are gathered first; the pipeline is only built when
    /// none of them is an error. Line numbers refer to `fragment`.
    pub async fn compile(
        &self,
        device: &wgpu::Device,
        fragment: &str,
        generation: u64,
    ) -> Result<Pipeline, CompileDiagnostics> {
        let assembled = with_vertex_stage(fragment);

        let diagnostics = front_end_check(&assembled.text);
        if !diagnostics.is_empty() {
            return Err(diagnostics.rebased(assembled.prelude_lines));
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shader module"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&assembled.text)),
        });
        let info = module.get_compilation_info().await;
        let scoped = device.pop_error_scope().await;

        let mut diagnostics = collect_device_errors(&info);
        if diagnostics.is_empty() {
            if let Some(err) = scoped {
                diagnostics.push(Diagnostic::unattributed(err.to_string()));
            }
        }
        if !diagnostics.is_empty() {
            return Err(diagnostics.rebased(assembled.prelude_lines));
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shader pipeline"),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some(FRAGMENT_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });
        if let Some(err) = device.pop_error_scope().await {
            return Err(Diagnostic::unattributed(err.to_string()).into());
        }

        Ok(Pipeline {
            pipeline,
            generation,
        })
    }
}
