use glam::{ivec2, IVec2, Vec2, Vec4};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{Surface, UMBRA_EPSILON};

/// Averages a 2x2 block starting at `pos`, clamping coordinates to the
/// image.
fn load_block(
    pos: IVec2,
    size: IVec2,
    load: &impl Fn(IVec2) -> Vec4,
) -> Vec4 {
    let max = size - IVec2::ONE;

    (load(pos.clamp(IVec2::ZERO, max))
        + load((pos + ivec2(1, 0)).clamp(IVec2::ZERO, max))
        + load((pos + ivec2(0, 1)).clamp(IVec2::ZERO, max))
        + load((pos + ivec2(1, 1)).clamp(IVec2::ZERO, max)))
        / 4.0
}

/// Halves the resolution by averaging 2x2 blocks.
pub fn downsample_box(
    dst: IVec2,
    src_size: IVec2,
    load: impl Fn(IVec2) -> Vec4,
) -> Vec4 {
    load_block(dst * 2, src_size, &load)
}

fn binomial(radius: i32, offset: i32) -> f32 {
    let offset = offset.abs();

    if radius == 1 {
        if offset == 0 {
            0.5
        } else {
            0.25
        }
    } else if offset == 0 {
        6.0 / 16.0
    } else if offset == 1 {
        4.0 / 16.0
    } else {
        1.0 / 16.0
    }
}

/// Halves the resolution with a gaussian kernel of either 9 or 25 taps.
///
/// Each tap averages a 2x2 block, which keeps the kernel centered in
/// between source pixels; this is what a bilinear sampler would do.
pub fn downsample_gaussian(
    dst: IVec2,
    src_size: IVec2,
    taps: u32,
    load: impl Fn(IVec2) -> Vec4,
) -> Vec4 {
    let radius = if taps >= 25 { 2 } else { 1 };
    let mut sum = Vec4::ZERO;
    let mut weights = 0.0;
    let mut dy = -radius;

    while dy <= radius {
        let mut dx = -radius;

        while dx <= radius {
            let weight = binomial(radius, dx) * binomial(radius, dy);

            sum +=
                load_block(dst * 2 + ivec2(dx, dy), src_size, &load) * weight;
            weights += weight;
            dx += 1;
        }

        dy += 1;
    }

    sum / weights
}

/// Picks which pixel of a 2x2 block represents the block in a lower
/// resolution G-buffer.
///
/// Averaging normals or depths would produce surfaces that don't exist, so
/// instead the pixel whose depth is closest to the block's mean is chosen;
/// sky pixels are ignored unless the whole block is sky.
pub fn downsample_gbuffer(
    dst: IVec2,
    src_size: IVec2,
    load: impl Fn(IVec2) -> Surface,
) -> IVec2 {
    let max = src_size - IVec2::ONE;
    let base = dst * 2;

    let p0 = base.clamp(IVec2::ZERO, max);
    let p1 = (base + ivec2(1, 0)).clamp(IVec2::ZERO, max);
    let p2 = (base + ivec2(0, 1)).clamp(IVec2::ZERO, max);
    let p3 = (base + ivec2(1, 1)).clamp(IVec2::ZERO, max);

    let s0 = load(p0);
    let s1 = load(p1);
    let s2 = load(p2);
    let s3 = load(p3);

    let mut depth_sum = 0.0;
    let mut count = 0.0;

    if !s0.is_sky() {
        depth_sum += s0.depth;
        count += 1.0;
    }

    if !s1.is_sky() {
        depth_sum += s1.depth;
        count += 1.0;
    }

    if !s2.is_sky() {
        depth_sum += s2.depth;
        count += 1.0;
    }

    if !s3.is_sky() {
        depth_sum += s3.depth;
        count += 1.0;
    }

    if count == 0.0 {
        return p0;
    }

    let mean = depth_sum / count;
    let mut best = p0;
    let mut best_distance = f32::MAX;

    if !s0.is_sky() {
        best = p0;
        best_distance = (s0.depth - mean).abs();
    }

    if !s1.is_sky() && (s1.depth - mean).abs() < best_distance {
        best = p1;
        best_distance = (s1.depth - mean).abs();
    }

    if !s2.is_sky() && (s2.depth - mean).abs() < best_distance {
        best = p2;
        best_distance = (s2.depth - mean).abs();
    }

    if !s3.is_sky() && (s3.depth - mean).abs() < best_distance {
        best = p3;
    }

    best
}

/// Upsamples a low-resolution buffer using bilinear weights modulated by how
/// similar the low-resolution guides are to the high-resolution `surface`.
///
/// Falls back to plain bilinear filtering when no low-resolution sample
/// resembles the target surface.
pub fn upsample_bilateral(
    hi: IVec2,
    scale: u32,
    lo_size: IVec2,
    surface: Surface,
    sigma_depth: f32,
    sigma_normal: f32,
    load: impl Fn(IVec2) -> (Vec4, Surface),
) -> Vec4 {
    let pos = (hi.as_vec2() + 0.5) / (scale.max(1) as f32) - 0.5;
    let base = pos.floor();
    let frac = pos - base;
    let base = base.as_ivec2();
    let max = lo_size - IVec2::ONE;

    let mut sum = Vec4::ZERO;
    let mut weights = 0.0;
    let mut bilinear_sum = Vec4::ZERO;
    let mut bilinear_weights = 0.0;
    let mut corner = 0;

    while corner < 4 {
        let offset = ivec2(corner & 1, corner >> 1);
        let bilinear = corner_weight(frac, offset);
        let (sample, sample_surface) =
            load((base + offset).clamp(IVec2::ZERO, max));

        bilinear_sum += sample * bilinear;
        bilinear_weights += bilinear;

        if !surface.is_sky() && !sample_surface.is_sky() {
            let depth = (surface.depth - sample_surface.depth).abs()
                / (sigma_depth * surface.depth).max(UMBRA_EPSILON);

            let normal = (1.0 - surface.normal.dot(sample_surface.normal))
                .max(0.0)
                / sigma_normal.max(UMBRA_EPSILON);

            let weight = bilinear * (-(depth + normal)).exp();

            sum += sample * weight;
            weights += weight;
        }

        corner += 1;
    }

    if weights > UMBRA_EPSILON {
        sum / weights
    } else {
        bilinear_sum / bilinear_weights.max(UMBRA_EPSILON)
    }
}

fn corner_weight(frac: Vec2, offset: IVec2) -> f32 {
    let wx = if offset.x == 0 { 1.0 - frac.x } else { frac.x };
    let wy = if offset.y == 0 { 1.0 - frac.y } else { frac.y };

    wx * wy
}

#[cfg(test)]
mod tests {
    use core::f32::consts::PI;

    use approx::assert_relative_eq;
    use glam::Vec3;

    use super::*;

    fn flat(depth: f32) -> Surface {
        Surface {
            normal: Vec3::Z,
            depth,
        }
    }

    fn image(size: IVec2, f: impl Fn(IVec2) -> f32) -> Vec<f32> {
        (0..size.y)
            .flat_map(|y| (0..size.x).map(move |x| ivec2(x, y)))
            .map(f)
            .collect()
    }

    fn at(image: &[f32], size: IVec2, pos: IVec2) -> Vec4 {
        Vec4::splat(image[(pos.y * size.x + pos.x) as usize])
    }

    #[test]
    fn box_averages_blocks() {
        let size = ivec2(4, 4);
        let src = image(size, |pos| (pos.x + 4 * pos.y) as f32);
        let out = downsample_box(ivec2(1, 0), size, |pos| at(&src, size, pos));

        assert_relative_eq!(out.x, (2.0 + 3.0 + 6.0 + 7.0) / 4.0);
    }

    #[test]
    fn gaussian_preserves_linear_ramps() {
        let size = ivec2(32, 32);
        let src = image(size, |pos| pos.x as f32);

        for taps in [9, 25] {
            let out = downsample_gaussian(ivec2(8, 8), size, taps, |pos| {
                at(&src, size, pos)
            });

            assert_relative_eq!(out.x, 16.5, epsilon = 0.0001);
        }
    }

    #[test]
    fn gaussian_preserves_constants_at_borders() {
        let size = ivec2(8, 8);

        let out = downsample_gaussian(ivec2(0, 0), size, 25, |_| Vec4::ONE);

        assert_relative_eq!(out.x, 1.0, epsilon = 0.0001);
    }

    #[test]
    fn gbuffer_picks_representative_depth() {
        let depths = [1.0, 1.1, 0.9, 10.0];

        let picked = downsample_gbuffer(ivec2(0, 0), ivec2(2, 2), |pos| {
            flat(depths[(pos.y * 2 + pos.x) as usize])
        });

        // Mean is 3.25, the outlier drags it towards the 1.1 sample
        assert_eq!(ivec2(1, 0), picked);
    }

    #[test]
    fn gbuffer_ignores_sky() {
        let picked = downsample_gbuffer(ivec2(0, 0), ivec2(2, 2), |pos| {
            if pos == ivec2(1, 1) {
                flat(4.0)
            } else {
                Surface::sky()
            }
        });

        assert_eq!(ivec2(1, 1), picked);

        let picked =
            downsample_gbuffer(ivec2(0, 0), ivec2(2, 2), |_| Surface::sky());

        assert_eq!(ivec2(0, 0), picked);
    }

    #[test]
    fn downsample_then_upsample_reproduces_smooth_signal() {
        let hi_size = ivec2(64, 64);
        let lo_size = ivec2(32, 32);

        let hi = image(hi_size, |pos| {
            let pos = pos.as_vec2() + 0.5;

            0.5 + 0.25
                * (2.0 * PI * pos.x / 64.0).sin()
                * (2.0 * PI * pos.y / 64.0).cos()
        });

        let lo = image(lo_size, |pos| {
            downsample_box(pos, hi_size, |pos| at(&hi, hi_size, pos)).x
        });

        let restored = image(hi_size, |pos| {
            upsample_bilateral(pos, 2, lo_size, flat(1.0), 0.1, 0.1, |pos| {
                (at(&lo, lo_size, pos), flat(1.0))
            })
            .x
        });

        let min = hi.iter().copied().fold(f32::MAX, f32::min);
        let max = hi.iter().copied().fold(f32::MIN, f32::max);

        let error = hi
            .iter()
            .zip(&restored)
            .map(|(a, b)| (a - b).abs())
            .sum::<f32>()
            / (hi.len() as f32);

        assert!(error < 0.01 * (max - min), "error = {error}");
    }

    #[test]
    fn upsample_respects_depth_edges() {
        let lo_size = ivec2(4, 4);

        let load = |pos: IVec2| {
            if pos.x < 2 {
                (Vec4::splat(0.2), flat(1.0))
            } else {
                (Vec4::splat(0.8), flat(20.0))
            }
        };

        // High-resolution pixel 3 sits right next to the edge; without the
        // depth guide it would pick up a quarter of the far side
        let near = upsample_bilateral(
            ivec2(3, 0),
            2,
            lo_size,
            flat(1.0),
            0.1,
            0.1,
            load,
        );

        let far = upsample_bilateral(
            ivec2(4, 0),
            2,
            lo_size,
            flat(20.0),
            0.1,
            0.1,
            load,
        );

        assert_relative_eq!(near.x, 0.2, epsilon = 0.0001);
        assert_relative_eq!(far.x, 0.8, epsilon = 0.0001);
    }

    #[test]
    fn upsample_falls_back_to_bilinear() {
        let out = upsample_bilateral(
            ivec2(1, 1),
            2,
            ivec2(2, 2),
            flat(1.0),
            0.1,
            0.1,
            |_| (Vec4::splat(0.3), flat(500.0)),
        );

        assert_relative_eq!(out.x, 0.3, epsilon = 0.0001);
    }
}
