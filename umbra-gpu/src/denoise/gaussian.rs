use glam::{IVec2, Vec4};

use crate::{contains, Surface};

/// Weight of the 5-tap binomial kernel tap at given offset (`-2..=2`).
pub fn gaussian_kernel(offset: i32) -> f32 {
    let offset = offset.abs();

    if offset == 0 {
        6.0 / 16.0
    } else if offset == 1 {
        4.0 / 16.0
    } else {
        1.0 / 16.0
    }
}

/// Performs one half of a separable gaussian blur, along `direction` (either
/// `(1, 0)` or `(0, 1)`).
///
/// Sky pixels are left intact and never bleed into their neighbours.
pub fn gaussian_blur(
    center: IVec2,
    size: IVec2,
    direction: IVec2,
    load: impl Fn(IVec2) -> (Vec4, Surface),
) -> Vec4 {
    let (center_sample, center_surface) = load(center);

    if center_surface.is_sky() {
        return center_sample;
    }

    let mut sum = Vec4::ZERO;
    let mut weights = 0.0;
    let mut offset = -2;

    while offset <= 2 {
        let pos = center + direction * offset;

        if contains(size, pos) {
            let (sample, surface) = load(pos);

            if !surface.is_sky() {
                let weight = gaussian_kernel(offset);

                sum += sample * weight;
                weights += weight;
            }
        }

        offset += 1;
    }

    sum / weights
}
