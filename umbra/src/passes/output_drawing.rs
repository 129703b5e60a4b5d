use log::debug;

use crate::schedule::{COMPOSED, OUTPUT};
use crate::{BindGroup, FrameSlot, Result, Schedule, Shaders, ViewBuffers};

/// Copies the final image onto the render target (usually the swapchain's
/// texture) with a full-screen triangle.
#[derive(Debug)]
pub struct OutputDrawingPass {
    bg0: BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl OutputDrawingPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        schedule: &Schedule,
        view: &ViewBuffers,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        debug!("Initializing pass: output_drawing");

        let source = if schedule.resolutions().needs_output_resampling() {
            OUTPUT
        } else {
            COMPOSED
        };

        let bg0 = BindGroup::builder("umbra_output_drawing_bg0")
            .add(&view.texture("draw", source)?.bind_readable())
            .build(device);

        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("umbra_output_drawing_pipeline_layout"),
                bind_group_layouts: &[bg0.layout()],
                push_constant_ranges: &[],
            });

        let (vs_module, vs_entry_point) = &shaders.output_drawing_main_vs;
        let (fs_module, fs_entry_point) = &shaders.output_drawing_main_fs;

        let pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("umbra_output_drawing_pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: vs_module,
                    entry_point: vs_entry_point,
                    buffers: &[],
                },
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: fs_module,
                    entry_point: fs_entry_point,
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                multiview: None,
            });

        Ok(Self { bg0, pipeline })
    }

    pub fn run(
        &self,
        slot: FrameSlot,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("umbra_output_drawing"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: true,
                },
            })],
            depth_stencil_attachment: None,
        });

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, self.bg0.get(slot), &[]);
        pass.draw(0..3, 0..1);
    }
}
