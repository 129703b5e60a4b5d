use crate::passes::{workgroups, ComputePass};
use crate::schedule::{
    Step, AO_GBUFFER_D0, AO_GBUFFER_D1, AO_UPSAMPLED, COMPOSED, GBUFFER_D0,
    GBUFFER_D1, OUTPUT,
};
use crate::{
    gpu, FrameSlot, RendererConfig, Result, Schedule, SceneBuffers, Shaders,
    Supersampling, ViewBuffers,
};

/// Moves images between resolutions: shrinks the G-buffer for reduced
/// resolution ambient occlusion, brings the denoised result back up and
/// resolves supersampled images.
#[derive(Debug)]
pub struct ResamplingPass {
    downsample_gbuffer: Option<ComputePass>,
    upsample_ao: Option<ComputePass<gpu::UpsamplingPassParams>>,
    downsample_output: Option<DownsampleOutput>,
    upsample_params: gpu::UpsamplingPassParams,
}

#[derive(Debug)]
enum DownsampleOutput {
    Box(ComputePass),
    Gaussian(ComputePass<gpu::DownsamplingPassParams>, u32),
}

impl ResamplingPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        config: &RendererConfig,
        schedule: &Schedule,
        scene: &SceneBuffers,
        view: &ViewBuffers,
    ) -> Result<Self> {
        let mut downsample_gbuffer = None;
        let mut upsample_ao = None;
        let mut downsample_output = None;

        for step in schedule.steps() {
            match *step {
                Step::DownsampleGBuffer => {
                    let pass = ComputePass::builder("downsample_gbuffer")
                        .bind([
                            &scene.scene,
                            &view
                                .texture("downsample_gbuffer", GBUFFER_D0)?
                                .bind_readable(),
                            &view
                                .texture("downsample_gbuffer", GBUFFER_D1)?
                                .bind_readable(),
                            &view
                                .texture("downsample_gbuffer", AO_GBUFFER_D0)?
                                .bind_writable(),
                            &view
                                .texture("downsample_gbuffer", AO_GBUFFER_D1)?
                                .bind_writable(),
                        ])
                        .build(device, &shaders.resampling_downsample_gbuffer);

                    downsample_gbuffer = Some(pass);
                }

                Step::UpsampleAo { input } => {
                    let pass = ComputePass::builder("upsample_ao")
                        .bind([
                            &scene.scene,
                            &view
                                .texture("upsample_ao", AO_GBUFFER_D0)?
                                .bind_readable(),
                            &view
                                .texture("upsample_ao", GBUFFER_D0)?
                                .bind_readable(),
                            &view
                                .texture("upsample_ao", input)?
                                .bind_readable(),
                            &view
                                .texture("upsample_ao", AO_UPSAMPLED)?
                                .bind_writable(),
                        ])
                        .build(device, &shaders.resampling_upsample_bilateral);

                    upsample_ao = Some(pass);
                }

                Step::DownsampleOutput => {
                    let input = view
                        .texture("downsample_output", COMPOSED)?
                        .bind_readable();

                    let output = view
                        .texture("downsample_output", OUTPUT)?
                        .bind_writable();

                    let pass = match gaussian_taps(config.supersampling) {
                        Some(taps) => DownsampleOutput::Gaussian(
                            ComputePass::builder("downsample_output")
                                .bind([&scene.scene, &input, &output])
                                .build(
                                    device,
                                    &shaders.resampling_downsample_gaussian,
                                ),
                            taps,
                        ),

                        None => DownsampleOutput::Box(
                            ComputePass::builder("downsample_output")
                                .bind([&scene.scene, &input, &output])
                                .build(
                                    device,
                                    &shaders.resampling_downsample_box,
                                ),
                        ),
                    };

                    downsample_output = Some(pass);
                }

                _ => (),
            }
        }

        Ok(Self {
            downsample_gbuffer,
            upsample_ao,
            downsample_output,
            upsample_params: gpu::UpsamplingPassParams {
                scale: config.ao_resolution_scale,
                sigma_depth: config.denoiser.upsample_sigma_depth,
                sigma_normal: config.denoiser.upsample_sigma_normal,
            },
        })
    }

    /// Picks, for each reduced resolution pixel, the full resolution
    /// G-buffer texel that represents its block best.
    pub fn downsample_gbuffer(
        &self,
        slot: FrameSlot,
        encoder: &mut wgpu::CommandEncoder,
        schedule: &Schedule,
    ) {
        if let Some(pass) = &self.downsample_gbuffer {
            let size = workgroups(schedule.resolutions().ao);

            pass.run(slot, encoder, size, ());
        }
    }

    /// Brings the denoised ambient occlusion up to the render resolution,
    /// weighting low resolution neighbours by how similar their surfaces
    /// are.
    pub fn upsample_ao(
        &self,
        slot: FrameSlot,
        encoder: &mut wgpu::CommandEncoder,
        schedule: &Schedule,
    ) {
        if let Some(pass) = &self.upsample_ao {
            let size = workgroups(schedule.resolutions().render);

            pass.run(slot, encoder, size, self.upsample_params);
        }
    }

    pub fn downsample_output(
        &self,
        slot: FrameSlot,
        encoder: &mut wgpu::CommandEncoder,
        schedule: &Schedule,
    ) {
        let size = workgroups(schedule.resolutions().output);

        match &self.downsample_output {
            Some(DownsampleOutput::Box(pass)) => {
                pass.run(slot, encoder, size, ());
            }

            Some(DownsampleOutput::Gaussian(pass, taps)) => {
                pass.run(
                    slot,
                    encoder,
                    size,
                    gpu::DownsamplingPassParams { taps: *taps },
                );
            }

            None => (),
        }
    }
}

/// Returns the number of taps of the gaussian resolving given supersampling
/// mode, or `None` if it's resolved with a plain box filter.
fn gaussian_taps(supersampling: Supersampling) -> Option<u32> {
    match supersampling {
        Supersampling::Gaussian9 => Some(9),
        Supersampling::Gaussian25 => Some(25),
        Supersampling::None | Supersampling::Box2x2 => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taps() {
        assert_eq!(None, gaussian_taps(Supersampling::Box2x2));
        assert_eq!(Some(9), gaussian_taps(Supersampling::Gaussian9));
        assert_eq!(Some(25), gaussian_taps(Supersampling::Gaussian25));
    }
}
