use spirv_std::glam::{vec3, Vec3, Vec4};

use crate::{gpu, Error, Result, MAX_SAMPLES};

/// Renderer's tunables.
///
/// Changing anything other than the view mode, light or background requires
/// recreating the raytracing resources (see [`crate::Request`]).
#[derive(Clone, Debug, PartialEq)]
pub struct RendererConfig {
    /// Number of occlusion rays cast per pixel and frame.
    pub ao_samples_per_pixel: u32,

    /// Maximum distance at which geometry still occludes.
    pub ao_max_distance: f32,

    /// Offset applied to occlusion rays so that surfaces don't occlude
    /// themselves.
    pub ao_min_t: f32,

    /// Exponent of the cosine-power distribution occlusion rays are drawn
    /// from; `1.0` yields the usual cosine-weighted hemisphere.
    pub ao_cosine_exponent: f32,

    /// Number of independent sample sets pixels pick from.
    pub sample_set_count: u32,

    /// Ratio between the G-buffer resolution and the resolution ambient
    /// occlusion is raytraced at; `1` or `2`.
    pub ao_resolution_scale: u32,

    pub supersampling: Supersampling,
    pub denoiser: DenoiserConfig,

    /// Number of consecutive refits after which the top-level structure gets
    /// fully rebuilt, to recover from the quality loss caused by refitting.
    pub max_refits_before_rebuild: u32,

    pub max_instances: usize,
    pub max_geometries: usize,
    pub max_materials: usize,

    /// Size (in bytes) reserved for all of the bottom-level structures.
    pub max_blas_memory: usize,

    pub view_mode: ViewMode,
    pub light: Light,
    pub background: Vec3,
}

impl RendererConfig {
    /// Number of samples stored per sample set - the smallest perfect square
    /// that fits all of the samples a pixel casts within a frame.
    pub fn samples_per_set(&self) -> u32 {
        let n = (self.ao_samples_per_pixel as f32).sqrt().ceil() as u32;

        n.max(1).pow(2)
    }

    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: impl ToString) -> Result<()> {
            Err(Error::InvalidConfig(msg.to_string()))
        }

        if self.ao_samples_per_pixel == 0 {
            return invalid("ao_samples_per_pixel must be positive");
        }

        if !(self.ao_min_t >= 0.0 && self.ao_min_t < self.ao_max_distance) {
            return invalid(
                "ao_min_t must be non-negative and less than ao_max_distance",
            );
        }

        if !(self.ao_cosine_exponent >= 0.0) {
            return invalid("ao_cosine_exponent must be non-negative");
        }

        if self.sample_set_count == 0 {
            return invalid("sample_set_count must be positive");
        }

        let samples = (self.sample_set_count as usize)
            * (self.samples_per_set() as usize);

        if samples > MAX_SAMPLES {
            return Err(Error::CapacityExceeded {
                what: "samples",
                limit: MAX_SAMPLES,
                requested: samples,
            });
        }

        if !matches!(self.ao_resolution_scale, 1 | 2) {
            return invalid("ao_resolution_scale must be either 1 or 2");
        }

        if self.supersampling != Supersampling::None
            && self.ao_resolution_scale != 1
        {
            return invalid(
                "supersampling requires ao_resolution_scale to be 1",
            );
        }

        if self.max_instances == 0
            || self.max_geometries == 0
            || self.max_materials == 0
        {
            return invalid("capacity limits must be positive");
        }

        self.denoiser.validate()
    }

    pub(crate) fn light_params(&self) -> (Vec4, Vec4) {
        let light = self
            .light
            .direction
            .normalize_or_zero()
            .extend(self.light.intensity);

        let light_color = self.light.color.extend(self.light.ambient);

        (light, light_color)
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            ao_samples_per_pixel: 1,
            ao_max_distance: 2.5,
            ao_min_t: 0.001,
            ao_cosine_exponent: 1.0,
            sample_set_count: 83,
            ao_resolution_scale: 1,
            supersampling: Supersampling::None,
            denoiser: Default::default(),
            max_refits_before_rebuild: 30,
            max_instances: 10_000,
            max_geometries: 1_000,
            max_materials: 1_000,
            max_blas_memory: 256 * 1024 * 1024,
            view_mode: ViewMode::Composed,
            light: Default::default(),
            background: vec3(0.6, 0.7, 0.9),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DenoiserConfig {
    pub enabled: bool,

    /// Radius of the window variance gets estimated over.
    pub variance_radius: u32,

    /// Number of à-trous passes; the n-th pass uses a step of `2^n`.
    pub wavelet_passes: u32,

    pub sigma_color: f32,
    pub sigma_depth: f32,
    pub sigma_normal: f32,

    /// Whether to run the separable gaussian after the wavelet passes.
    pub smoothing: bool,

    pub upsample_sigma_depth: f32,
    pub upsample_sigma_normal: f32,
}

impl DenoiserConfig {
    fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.variance_radius == 0 || self.variance_radius > 4 {
            return Err(Error::InvalidConfig(
                "denoiser.variance_radius must be within 1..=4".into(),
            ));
        }

        if self.wavelet_passes > 8 {
            return Err(Error::InvalidConfig(
                "denoiser.wavelet_passes must not exceed 8".into(),
            ));
        }

        let sigmas = [
            self.sigma_color,
            self.sigma_depth,
            self.sigma_normal,
            self.upsample_sigma_depth,
            self.upsample_sigma_normal,
        ];

        if sigmas.iter().any(|sigma| !(*sigma > 0.0)) {
            return Err(Error::InvalidConfig(
                "denoiser's sigmas must be positive".into(),
            ));
        }

        Ok(())
    }
}

impl Default for DenoiserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            variance_radius: 1,
            wavelet_passes: 4,
            sigma_color: 4.0,
            sigma_depth: 0.5,
            sigma_normal: 0.1,
            smoothing: false,
            upsample_sigma_depth: 0.05,
            upsample_sigma_normal: 0.1,
        }
    }
}

/// Filter used to resolve the supersampled image into the output one.
///
/// Anything other than `None` makes the renderer trace at twice the output
/// resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Supersampling {
    #[default]
    None,
    Box2x2,
    Gaussian9,
    Gaussian25,
}

impl Supersampling {
    pub fn scale(&self) -> u32 {
        if let Self::None = self {
            1
        } else {
            2
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Composed,
    AmbientOcclusion,
    RawAmbientOcclusion,
    Normals,
    Depth,
    Variance,
}

impl ViewMode {
    pub(crate) fn serialize(&self) -> u32 {
        match self {
            ViewMode::Composed => gpu::VIEW_MODE_COMPOSED,
            ViewMode::AmbientOcclusion => gpu::VIEW_MODE_AMBIENT_OCCLUSION,
            ViewMode::RawAmbientOcclusion => {
                gpu::VIEW_MODE_RAW_AMBIENT_OCCLUSION
            }
            ViewMode::Normals => gpu::VIEW_MODE_NORMALS,
            ViewMode::Depth => gpu::VIEW_MODE_DEPTH,
            ViewMode::Variance => gpu::VIEW_MODE_VARIANCE,
        }
    }
}

/// Directional light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Light {
    /// Direction towards the light.
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,

    /// Intensity of the ambient term, which gets multiplied by ambient
    /// occlusion.
    pub ambient: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            direction: vec3(0.3, 1.0, 0.5),
            color: Vec3::ONE,
            intensity: 1.0,
            ambient: 0.4,
        }
    }
}
