use crate::passes::{workgroups, ComputePass};
use crate::schedule::{ao_gbuffer, GBUFFER_D0, GBUFFER_D1, RAW_AO};
use crate::{FrameSlot, Result, Schedule, SceneBuffers, Shaders, ViewBuffers};

/// Dispatches camera rays (filling the G-buffer) and occlusion rays (filling
/// the raw ambient occlusion buffer).
#[derive(Debug)]
pub struct RaytracingPass {
    gbuffer: ComputePass,
    ambient_occlusion: ComputePass,
}

impl RaytracingPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        schedule: &Schedule,
        scene: &SceneBuffers,
        view: &ViewBuffers,
    ) -> Result<Self> {
        let [ao_d0, ao_d1] = ao_gbuffer(schedule.resolutions());

        let gbuffer = ComputePass::builder("gbuffer")
            .bind([
                &scene.scene,
                &scene.tlas,
                &scene.blas,
                &scene.shader_tables,
                &view.texture("gbuffer", GBUFFER_D0)?.bind_writable(),
                &view.texture("gbuffer", GBUFFER_D1)?.bind_writable(),
                &view.camera_ray_hits().bind_writable(),
            ])
            .build(device, &shaders.gbuffer);

        let ambient_occlusion = ComputePass::builder("ambient_occlusion")
            .bind([
                &scene.scene,
                &scene.tlas,
                &scene.blas,
                &scene.shader_tables,
                &scene.samples,
                &view.texture("ambient_occlusion", ao_d0)?.bind_readable(),
                &view.texture("ambient_occlusion", ao_d1)?.bind_readable(),
                &view.texture("ambient_occlusion", RAW_AO)?.bind_writable(),
                &view.ao_ray_hits().bind_writable(),
            ])
            .build(device, &shaders.ambient_occlusion);

        Ok(Self {
            gbuffer,
            ambient_occlusion,
        })
    }

    /// Casts a ray per pixel, storing depth, normal and material of the
    /// closest hits.
    pub fn dispatch_gbuffer(
        &self,
        slot: FrameSlot,
        encoder: &mut wgpu::CommandEncoder,
        schedule: &Schedule,
    ) {
        let size = workgroups(schedule.resolutions().render);

        self.gbuffer.run(slot, encoder, size, ());
    }

    /// Casts the configured number of occlusion rays per pixel, sampling
    /// directions from the bound sample sets.
    pub fn dispatch_ao_visibility(
        &self,
        slot: FrameSlot,
        encoder: &mut wgpu::CommandEncoder,
        schedule: &Schedule,
    ) {
        let size = workgroups(schedule.resolutions().ao);

        self.ambient_occlusion.run(slot, encoder, size, ());
    }
}

