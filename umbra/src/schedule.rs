use log::debug;
use spirv_std::glam::UVec2;

use crate::{
    Barrier, HitCategory, RendererConfig, ResourceId, ResourceTracker, Result,
};

pub const SCENE: ResourceId = ResourceId::new("scene");
pub const MATERIALS: ResourceId = ResourceId::new("materials");
pub const TLAS: ResourceId = ResourceId::new("tlas");
pub const BLAS: ResourceId = ResourceId::new("blas");
pub const SHADER_TABLES: ResourceId = ResourceId::new("shader_tables");
pub const SAMPLES: ResourceId = ResourceId::new("samples");

pub const GBUFFER_D0: ResourceId = ResourceId::new("gbuffer_d0");
pub const GBUFFER_D1: ResourceId = ResourceId::new("gbuffer_d1");
pub const AO_GBUFFER_D0: ResourceId = ResourceId::new("ao_gbuffer_d0");
pub const AO_GBUFFER_D1: ResourceId = ResourceId::new("ao_gbuffer_d1");
pub const RAW_AO: ResourceId = ResourceId::new("raw_ao");
pub const AO_VARIANCE: ResourceId = ResourceId::new("ao_variance");
pub const AO_SCRATCH_A: ResourceId = ResourceId::new("ao_scratch_a");
pub const AO_SCRATCH_B: ResourceId = ResourceId::new("ao_scratch_b");
pub const AO_UPSAMPLED: ResourceId = ResourceId::new("ao_upsampled");
pub const COMPOSED: ResourceId = ResourceId::new("composed");
pub const OUTPUT: ResourceId = ResourceId::new("output");
pub const BACK_BUFFER: ResourceId = ResourceId::new("back_buffer");

pub const CAMERA_RAY_HITS: ResourceId = ResourceId::new("camera_ray_hits");
pub const AO_RAY_HITS: ResourceId = ResourceId::new("ao_ray_hits");
pub const CAMERA_HIT_COUNT: ResourceId = ResourceId::new("camera_hit_count");
pub const AO_HIT_COUNT: ResourceId = ResourceId::new("ao_hit_count");

/// Sizes of the images a frame goes through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolutions {
    /// Size of the presented image
    pub output: UVec2,

    /// Size of the G-buffer and the composed image; larger than the output
    /// when supersampling
    pub render: UVec2,

    /// Size ambient occlusion is raytraced and denoised at
    pub ao: UVec2,
}

impl Resolutions {
    pub fn new(output: UVec2, config: &RendererConfig) -> Self {
        let output = output.max(UVec2::ONE);
        let render = output * config.supersampling.scale();
        let scale = config.ao_resolution_scale.max(1);
        let ao = ((render + scale - 1) / scale).max(UVec2::ONE);

        Self { output, render, ao }
    }

    pub fn needs_ao_resampling(&self) -> bool {
        self.ao != self.render
    }

    pub fn needs_output_resampling(&self) -> bool {
        self.output != self.render
    }

    pub fn render_pixels(&self) -> u32 {
        self.render.x * self.render.y
    }

    pub fn ao_pixels(&self) -> u32 {
        self.ao.x * self.ao.y
    }
}

/// A single step of the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Scene constants, acceleration structures etc. get uploaded by the
    /// host.
    Upload,

    GBuffer,
    DownsampleGBuffer,
    AmbientOcclusion,
    EstimateVariance,

    Wavelet {
        nth: u32,
        input: ResourceId,
        output: ResourceId,
    },

    Gaussian {
        direction: u32,
        input: ResourceId,
        output: ResourceId,
    },

    UpsampleAo {
        input: ResourceId,
    },

    Compose {
        ao: ResourceId,
    },

    DownsampleOutput,
    CountHits(HitCategory),
    Draw,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Upload => "upload",
            Step::GBuffer => "gbuffer",
            Step::DownsampleGBuffer => "downsample_gbuffer",
            Step::AmbientOcclusion => "ambient_occlusion",
            Step::EstimateVariance => "estimate_variance",
            Step::Wavelet { .. } => "wavelet",
            Step::Gaussian { .. } => "gaussian",
            Step::UpsampleAo { .. } => "upsample_ao",
            Step::Compose { .. } => "compose",
            Step::DownsampleOutput => "downsample_output",
            Step::CountHits(HitCategory::Camera) => "count_camera_hits",
            Step::CountHits(HitCategory::AmbientOcclusion) => "count_ao_hits",
            Step::Draw => "draw",
        }
    }

    /// Returns resources this step reads and writes.
    pub fn accesses(
        &self,
        res: &Resolutions,
    ) -> (Vec<ResourceId>, Vec<ResourceId>) {
        let [ao_d0, ao_d1] = ao_gbuffer(res);

        match *self {
            Step::Upload => (
                vec![],
                vec![SCENE, MATERIALS, TLAS, BLAS, SHADER_TABLES, SAMPLES],
            ),

            Step::GBuffer => (
                vec![SCENE, TLAS, BLAS, SHADER_TABLES],
                vec![GBUFFER_D0, GBUFFER_D1, CAMERA_RAY_HITS],
            ),

            Step::DownsampleGBuffer => (
                vec![SCENE, GBUFFER_D0, GBUFFER_D1],
                vec![AO_GBUFFER_D0, AO_GBUFFER_D1],
            ),

            Step::AmbientOcclusion => (
                vec![SCENE, TLAS, BLAS, SHADER_TABLES, SAMPLES, ao_d0, ao_d1],
                vec![RAW_AO, AO_RAY_HITS],
            ),

            Step::EstimateVariance => {
                (vec![SCENE, ao_d0, RAW_AO], vec![AO_VARIANCE])
            }

            Step::Wavelet { input, output, .. }
            | Step::Gaussian { input, output, .. } => {
                (vec![SCENE, ao_d0, input], vec![output])
            }

            Step::UpsampleAo { input } => (
                vec![SCENE, ao_d0, GBUFFER_D0, input],
                vec![AO_UPSAMPLED],
            ),

            Step::Compose { ao } => (
                vec![
                    SCENE,
                    MATERIALS,
                    GBUFFER_D0,
                    GBUFFER_D1,
                    ao,
                    RAW_AO,
                    AO_VARIANCE,
                ],
                vec![COMPOSED],
            ),

            Step::DownsampleOutput => (vec![SCENE, COMPOSED], vec![OUTPUT]),

            Step::CountHits(HitCategory::Camera) => {
                (vec![CAMERA_RAY_HITS], vec![CAMERA_HIT_COUNT])
            }

            Step::CountHits(HitCategory::AmbientOcclusion) => {
                (vec![AO_RAY_HITS], vec![AO_HIT_COUNT])
            }

            Step::Draw => {
                let source = if res.needs_output_resampling() {
                    OUTPUT
                } else {
                    COMPOSED
                };

                (vec![source], vec![BACK_BUFFER])
            }
        }
    }
}

/// G-buffer textures the ambient occlusion passes work with.
pub fn ao_gbuffer(res: &Resolutions) -> [ResourceId; 2] {
    if res.needs_ao_resampling() {
        [AO_GBUFFER_D0, AO_GBUFFER_D1]
    } else {
        [GBUFFER_D0, GBUFFER_D1]
    }
}

/// Ordered list of steps making up a frame, validated against the resources
/// they access.
///
/// The schedule only changes together with the configuration or resolution,
/// so it's built (and validated) once and then replayed every frame.
#[derive(Clone, Debug)]
pub struct Schedule {
    resolutions: Resolutions,
    steps: Vec<Step>,
    denoised_ao: ResourceId,
    barriers: Vec<Barrier>,
}

impl Schedule {
    pub fn new(config: &RendererConfig, output: UVec2) -> Result<Self> {
        let res = Resolutions::new(output, config);
        let mut steps = vec![Step::Upload, Step::GBuffer];

        if res.needs_ao_resampling() {
            steps.push(Step::DownsampleGBuffer);
        }

        steps.push(Step::AmbientOcclusion);
        steps.push(Step::EstimateVariance);

        // Wavelet passes can't overwrite the variance buffer, since it's
        // still needed for composition
        let mut ao = AO_VARIANCE;

        if config.denoiser.enabled {
            for nth in 0..config.denoiser.wavelet_passes {
                let output = scratch_after(ao);

                steps.push(Step::Wavelet {
                    nth,
                    input: ao,
                    output,
                });

                ao = output;
            }

            if config.denoiser.smoothing {
                for direction in [0, 1] {
                    let output = scratch_after(ao);

                    steps.push(Step::Gaussian {
                        direction,
                        input: ao,
                        output,
                    });

                    ao = output;
                }
            }
        }

        let denoised_ao = ao;

        if res.needs_ao_resampling() {
            steps.push(Step::UpsampleAo { input: ao });
            ao = AO_UPSAMPLED;
        }

        steps.push(Step::Compose { ao });

        if res.needs_output_resampling() {
            steps.push(Step::DownsampleOutput);
        }

        for category in HitCategory::ALL {
            steps.push(Step::CountHits(category));
        }

        steps.push(Step::Draw);

        let mut tracker = ResourceTracker::default();

        for step in &steps {
            let (reads, writes) = step.accesses(&res);

            tracker.pass(step.name(), &reads, &writes)?;
        }

        debug!(
            "Schedule built: {:?}",
            steps.iter().map(|step| step.name()).collect::<Vec<_>>()
        );

        tracker.log_barriers();

        Ok(Self {
            resolutions: res,
            steps,
            denoised_ao,
            barriers: tracker.barriers().to_vec(),
        })
    }

    pub fn resolutions(&self) -> &Resolutions {
        &self.resolutions
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Texture holding the denoised ambient occlusion, at the ambient
    /// occlusion resolution.
    pub fn denoised_ao(&self) -> ResourceId {
        self.denoised_ao
    }

    pub fn barriers(&self) -> &[Barrier] {
        &self.barriers
    }

    /// Returns all of the textures the schedule touches, together with their
    /// sizes.
    pub fn textures(&self) -> Vec<(ResourceId, UVec2)> {
        let res = &self.resolutions;
        let mut textures = Vec::new();

        for step in &self.steps {
            let (reads, writes) = step.accesses(res);

            for resource in reads.into_iter().chain(writes) {
                let Some(size) = texture_size(res, resource) else {
                    continue;
                };

                if !textures.iter().any(|(id, _)| *id == resource) {
                    textures.push((resource, size));
                }
            }
        }

        textures
    }
}

fn scratch_after(resource: ResourceId) -> ResourceId {
    if resource == AO_SCRATCH_A {
        AO_SCRATCH_B
    } else {
        AO_SCRATCH_A
    }
}

fn texture_size(res: &Resolutions, resource: ResourceId) -> Option<UVec2> {
    match resource {
        GBUFFER_D0 | GBUFFER_D1 | AO_UPSAMPLED | COMPOSED => Some(res.render),

        AO_GBUFFER_D0 | AO_GBUFFER_D1 | RAW_AO | AO_VARIANCE | AO_SCRATCH_A
        | AO_SCRATCH_B => Some(res.ao),

        OUTPUT => Some(res.output),
        _ => None,
    }
}
