mod compose;
mod compute_pass;
mod denoising;
mod hit_count;
mod output_drawing;
mod raytracing;
mod resampling;

use log::debug;

pub use self::compose::*;
pub use self::compute_pass::*;
pub use self::denoising::*;
pub use self::hit_count::*;
pub use self::output_drawing::*;
pub use self::raytracing::*;
pub use self::resampling::*;
use crate::schedule::Step;
use crate::{
    FrameSlot, RendererConfig, Result, Schedule, SceneBuffers, Shaders,
    ViewBuffers,
};

/// All of the passes a frame consists of, wired to the view's buffers.
#[derive(Debug)]
pub struct Passes {
    pub raytracing: RaytracingPass,
    pub denoising: DenoisingPass,
    pub resampling: ResamplingPass,
    pub compose: ComposePass,
    pub hit_count: HitCountPass,
    pub output_drawing: OutputDrawingPass,
}

impl Passes {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        config: &RendererConfig,
        schedule: &Schedule,
        scene: &SceneBuffers,
        view: &ViewBuffers,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        debug!("Initializing passes");

        Ok(Self {
            raytracing: RaytracingPass::new(
                device, shaders, schedule, scene, view,
            )?,
            denoising: DenoisingPass::new(
                device,
                shaders,
                &config.denoiser,
                schedule,
                scene,
                view,
            )?,
            resampling: ResamplingPass::new(
                device, shaders, config, schedule, scene, view,
            )?,
            compose: ComposePass::new(device, shaders, schedule, scene, view)?,
            hit_count: HitCountPass::new(device, shaders, schedule, view),
            output_drawing: OutputDrawingPass::new(
                device, shaders, schedule, view, format,
            )?,
        })
    }

    /// Records the schedule's steps into `encoder`.
    ///
    /// Uploads happen on the host before recording, so [`Step::Upload`]
    /// doesn't record anything.
    pub fn run(
        &self,
        slot: FrameSlot,
        encoder: &mut wgpu::CommandEncoder,
        schedule: &Schedule,
        target: &wgpu::TextureView,
    ) {
        for step in schedule.steps() {
            match *step {
                Step::Upload => (),

                Step::GBuffer => {
                    self.raytracing.dispatch_gbuffer(slot, encoder, schedule);
                }

                Step::DownsampleGBuffer => {
                    self.resampling
                        .downsample_gbuffer(slot, encoder, schedule);
                }

                Step::AmbientOcclusion => {
                    self.raytracing
                        .dispatch_ao_visibility(slot, encoder, schedule);
                }

                Step::EstimateVariance => {
                    self.denoising.estimate_variance(slot, encoder, schedule);
                }

                Step::Wavelet { nth, .. } => {
                    self.denoising.wavelet(slot, encoder, schedule, nth);
                }

                Step::Gaussian { direction, .. } => {
                    self.denoising.gaussian(slot, encoder, schedule, direction);
                }

                Step::UpsampleAo { .. } => {
                    self.resampling.upsample_ao(slot, encoder, schedule);
                }

                Step::Compose { .. } => {
                    self.compose.run(slot, encoder, schedule);
                }

                Step::DownsampleOutput => {
                    self.resampling.downsample_output(slot, encoder, schedule);
                }

                Step::CountHits(category) => {
                    self.hit_count.run(slot, encoder, category);
                }

                Step::Draw => {
                    self.output_drawing.run(slot, encoder, target);
                }
            }
        }
    }
}
