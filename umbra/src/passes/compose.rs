use crate::passes::{workgroups, ComputePass};
use crate::schedule::{
    Step, AO_VARIANCE, COMPOSED, GBUFFER_D0, GBUFFER_D1, RAW_AO,
};
use crate::{
    Error, FrameSlot, Result, Schedule, SceneBuffers, Shaders, ViewBuffers,
};

/// Shades the G-buffer with the ambient occlusion (or shows one of the
/// debug views, depending on the scene's view mode).
#[derive(Debug)]
pub struct ComposePass {
    pass: ComputePass,
}

impl ComposePass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        schedule: &Schedule,
        scene: &SceneBuffers,
        view: &ViewBuffers,
    ) -> Result<Self> {
        let ao = schedule
            .steps()
            .iter()
            .find_map(|step| match step {
                Step::Compose { ao } => Some(*ao),
                _ => None,
            })
            .ok_or(Error::InvalidAccess {
                pass: "compose",
                resource: COMPOSED.name(),
            })?;

        let pass = ComputePass::builder("compose")
            .bind([
                &scene.scene,
                &scene.materials,
                &view.texture("compose", GBUFFER_D0)?.bind_readable(),
                &view.texture("compose", GBUFFER_D1)?.bind_readable(),
                &view.texture("compose", ao)?.bind_readable(),
                &view.texture("compose", RAW_AO)?.bind_readable(),
                &view.texture("compose", AO_VARIANCE)?.bind_readable(),
                &view.texture("compose", COMPOSED)?.bind_writable(),
            ])
            .build(device, &shaders.compose);

        Ok(Self { pass })
    }

    pub fn run(
        &self,
        slot: FrameSlot,
        encoder: &mut wgpu::CommandEncoder,
        schedule: &Schedule,
    ) {
        let size = workgroups(schedule.resolutions().render);

        self.pass.run(slot, encoder, size, ());
    }
}
