use glam::{ivec2, IVec2};

use crate::{contains, Surface};

/// Floor for all variance estimates, so that the edge-stopping functions
/// never divide by zero.
pub const MIN_VARIANCE: f32 = 0.0001;

/// Estimates local variance of the raw ambient occlusion over a
/// `(2 * radius + 1)^2` window around `center`.
///
/// Sky pixels don't contribute to the estimate.
pub fn estimate_variance(
    center: IVec2,
    size: IVec2,
    radius: i32,
    load: impl Fn(IVec2) -> (f32, Surface),
) -> f32 {
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut count = 0.0;
    let mut dy = -radius;

    while dy <= radius {
        let mut dx = -radius;

        while dx <= radius {
            let pos = center + ivec2(dx, dy);

            if contains(size, pos) {
                let (ao, surface) = load(pos);

                if !surface.is_sky() {
                    sum += ao;
                    sum_sq += ao * ao;
                    count += 1.0;
                }
            }

            dx += 1;
        }

        dy += 1;
    }

    if count == 0.0 {
        return MIN_VARIANCE;
    }

    let mean = sum / count;

    (sum_sq / count - mean * mean).max(MIN_VARIANCE)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::Vec3;

    use super::*;

    fn surface() -> Surface {
        Surface {
            normal: Vec3::Z,
            depth: 1.0,
        }
    }

    #[test]
    fn constant_region() {
        for value in [0.0, 0.37, 1.0] {
            let variance =
                estimate_variance(ivec2(4, 4), ivec2(8, 8), 2, |_| {
                    (value, surface())
                });

            assert_relative_eq!(variance, MIN_VARIANCE);
        }
    }

    #[test]
    fn checkerboard() {
        let variance = estimate_variance(ivec2(4, 4), ivec2(8, 8), 1, |pos| {
            (((pos.x + pos.y) % 2) as f32, surface())
        });

        // 4 ones and 5 zeros
        let mean = 4.0 / 9.0;

        assert_relative_eq!(variance, mean - mean * mean, epsilon = 0.0001);
    }

    #[test]
    fn skips_sky_and_borders() {
        let variance = estimate_variance(ivec2(0, 0), ivec2(8, 8), 1, |pos| {
            if pos.x == 1 {
                (1.0, Surface::sky())
            } else {
                (0.5, surface())
            }
        });

        assert_relative_eq!(variance, MIN_VARIANCE);
    }

    #[test]
    fn sky_only() {
        let variance = estimate_variance(ivec2(2, 2), ivec2(8, 8), 1, |_| {
            (1.0, Surface::sky())
        });

        assert_relative_eq!(variance, MIN_VARIANCE);
    }
}
