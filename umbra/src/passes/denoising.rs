use log::trace;

use crate::passes::{workgroups, ComputePass};
use crate::schedule::{ao_gbuffer, Step, AO_VARIANCE, RAW_AO};
use crate::{
    gpu, DenoiserConfig, FrameSlot, Result, Schedule, SceneBuffers, Shaders,
    ViewBuffers,
};

/// Turns the noisy, raw ambient occlusion into a smooth one: estimates
/// variance, runs the edge-avoiding à-trous wavelet and (optionally) a
/// separable gaussian.
#[derive(Debug)]
pub struct DenoisingPass {
    estimate_variance: ComputePass<gpu::VarianceEstimationPassParams>,
    wavelets: Vec<ComputePass<gpu::WaveletPassParams>>,
    gaussians: Vec<ComputePass<gpu::GaussianPassParams>>,
    params: DenoiserConfig,
}

impl DenoisingPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        config: &DenoiserConfig,
        schedule: &Schedule,
        scene: &SceneBuffers,
        view: &ViewBuffers,
    ) -> Result<Self> {
        let [surface_map, _] = ao_gbuffer(schedule.resolutions());

        let estimate_variance = ComputePass::builder("estimate_variance")
            .bind([
                &scene.scene,
                &view
                    .texture("estimate_variance", surface_map)?
                    .bind_readable(),
                &view.texture("estimate_variance", RAW_AO)?.bind_readable(),
                &view
                    .texture("estimate_variance", AO_VARIANCE)?
                    .bind_writable(),
            ])
            .build(device, &shaders.denoising_estimate_variance);

        let mut wavelets = Vec::new();
        let mut gaussians = Vec::new();

        for step in schedule.steps() {
            match *step {
                Step::Wavelet { input, output, .. } => {
                    let pass = ComputePass::builder("wavelet")
                        .bind([
                            &scene.scene,
                            &view
                                .texture("wavelet", surface_map)?
                                .bind_readable(),
                            &view.texture("wavelet", input)?.bind_readable(),
                            &view.texture("wavelet", output)?.bind_writable(),
                        ])
                        .build(device, &shaders.denoising_wavelet);

                    wavelets.push(pass);
                }

                Step::Gaussian { input, output, .. } => {
                    let pass = ComputePass::builder("gaussian")
                        .bind([
                            &scene.scene,
                            &view
                                .texture("gaussian", surface_map)?
                                .bind_readable(),
                            &view.texture("gaussian", input)?.bind_readable(),
                            &view.texture("gaussian", output)?.bind_writable(),
                        ])
                        .build(device, &shaders.denoising_gaussian);

                    gaussians.push(pass);
                }

                _ => (),
            }
        }

        Ok(Self {
            estimate_variance,
            wavelets,
            gaussians,
            params: config.clone(),
        })
    }

    pub fn estimate_variance(
        &self,
        slot: FrameSlot,
        encoder: &mut wgpu::CommandEncoder,
        schedule: &Schedule,
    ) {
        let size = workgroups(schedule.resolutions().ao);

        self.estimate_variance.run(
            slot,
            encoder,
            size,
            gpu::VarianceEstimationPassParams {
                radius: self.params.variance_radius,
            },
        );
    }

    /// Runs the `nth` à-trous iteration.
    pub fn wavelet(
        &self,
        slot: FrameSlot,
        encoder: &mut wgpu::CommandEncoder,
        schedule: &Schedule,
        nth: u32,
    ) {
        let Some(pass) = self.wavelets.get(nth as usize) else {
            trace!("Skipping wavelet pass #{nth}; not scheduled");
            return;
        };

        let size = workgroups(schedule.resolutions().ao);

        pass.run(slot, encoder, size, wavelet_params(&self.params, nth));
    }

    pub fn gaussian(
        &self,
        slot: FrameSlot,
        encoder: &mut wgpu::CommandEncoder,
        schedule: &Schedule,
        direction: u32,
    ) {
        let Some(pass) = self.gaussians.get(direction as usize) else {
            trace!("Skipping gaussian pass #{direction}; not scheduled");
            return;
        };

        let size = workgroups(schedule.resolutions().ao);

        pass.run(slot, encoder, size, gpu::GaussianPassParams { direction });
    }
}

fn wavelet_params(config: &DenoiserConfig, nth: u32) -> gpu::WaveletPassParams {
    gpu::WaveletPassParams {
        step: 1 << nth,
        sigma_color: config.sigma_color,
        sigma_depth: config.sigma_depth,
        sigma_normal: config.sigma_normal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wavelet_steps_double() {
        let config = DenoiserConfig::default();

        let steps: Vec<_> = (0..4)
            .map(|nth| wavelet_params(&config, nth).step)
            .collect();

        assert_eq!(vec![1, 2, 4, 8], steps);
        assert_eq!(config.sigma_color, wavelet_params(&config, 3).sigma_color);
    }
}
