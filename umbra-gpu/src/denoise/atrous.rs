use glam::{ivec2, vec2, IVec2, Vec2};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{
    contains, F32Ext, Surface, WaveletPassParams, MIN_VARIANCE,
    UMBRA_EPSILON,
};

/// Weight of the B3-spline kernel tap at given offset (`-2..=2`).
pub fn atrous_kernel(offset: i32) -> f32 {
    let offset = offset.abs();

    if offset == 0 {
        3.0 / 8.0
    } else if offset == 1 {
        1.0 / 4.0
    } else {
        1.0 / 16.0
    }
}

/// Cross-bilateral weight of a neighbouring sample:
///
/// `exp(-dcolor^2 / sigma_c) * exp(-ddepth^2 / sigma_d) *
/// exp(-(1 - dot(n1, n2)) / sigma_n)`
pub fn edge_stopping_weight(
    center_ao: f32,
    center: Surface,
    sample_ao: f32,
    sample: Surface,
    sigma_color: f32,
    sigma_depth: f32,
    sigma_normal: f32,
) -> f32 {
    let color = (center_ao - sample_ao).sqr() / sigma_color.max(UMBRA_EPSILON);

    let depth =
        (center.depth - sample.depth).sqr() / sigma_depth.max(UMBRA_EPSILON);

    let normal = (1.0 - center.normal.dot(sample.normal)).max(0.0)
        / sigma_normal.max(UMBRA_EPSILON);

    (-(color + depth + normal)).exp()
}

/// Blurs the variance with a 3x3 gaussian, which makes the color
/// edge-stopping function less sensitive to noise in the variance itself.
pub fn prefilter_variance(
    center: IVec2,
    size: IVec2,
    load: impl Fn(IVec2) -> (Vec2, Surface),
) -> f32 {
    let mut sum = 0.0;
    let mut weights = 0.0;
    let mut dy = -1;

    while dy <= 1 {
        let mut dx = -1;

        while dx <= 1 {
            let pos = center + ivec2(dx, dy);

            if contains(size, pos) {
                let (sample, surface) = load(pos);

                if !surface.is_sky() {
                    let weight =
                        1.0 / ((1 << (2 + dx.abs() + dy.abs())) as f32);

                    sum += sample.y * weight;
                    weights += weight;
                }
            }

            dx += 1;
        }

        dy += 1;
    }

    if weights == 0.0 {
        MIN_VARIANCE
    } else {
        sum / weights
    }
}

/// Performs a single pass of the edge-aware a-trous wavelet filter.
///
/// Samples are `(ambient occlusion, variance)` pairs; returns the filtered
/// ambient occlusion together with its variance, propagated as
/// `sum(w^2 * variance) / sum(w)^2`.
pub fn atrous_filter(
    center: IVec2,
    size: IVec2,
    params: &WaveletPassParams,
    load: impl Fn(IVec2) -> (Vec2, Surface),
) -> Vec2 {
    let (center_sample, center_surface) = load(center);

    if center_surface.is_sky() {
        return center_sample;
    }

    let variance = prefilter_variance(center, size, &load);

    let sigma_color = params.sigma_color * variance.max(MIN_VARIANCE).sqrt();

    let step = params.step.max(1) as i32;
    let mut ao_sum = 0.0;
    let mut variance_sum = 0.0;
    let mut weights = 0.0;
    let mut dy = -2;

    while dy <= 2 {
        let mut dx = -2;

        while dx <= 2 {
            let pos = center + ivec2(dx, dy) * step;

            if contains(size, pos) {
                let (sample, surface) = load(pos);

                if !surface.is_sky() {
                    let weight = atrous_kernel(dx)
                        * atrous_kernel(dy)
                        * edge_stopping_weight(
                            center_sample.x,
                            center_surface,
                            sample.x,
                            surface,
                            sigma_color,
                            params.sigma_depth,
                            params.sigma_normal,
                        );

                    ao_sum += weight * sample.x;
                    variance_sum += weight * weight * sample.y;
                    weights += weight;
                }
            }

            dx += 1;
        }

        dy += 1;
    }

    if weights <= 0.0 {
        return center_sample;
    }

    vec2(
        ao_sum / weights,
        (variance_sum / (weights * weights)).max(MIN_VARIANCE),
    )
}
