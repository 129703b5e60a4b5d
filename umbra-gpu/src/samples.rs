use glam::{UVec2, Vec3, Vec4, Vec4Swizzles};
use spirv_std::arch::IndexUnchecked;

use crate::hash;

/// View over the sample sets used by the ambient occlusion pass.
///
/// Each set contains `samples_per_set` stratified directions distributed over
/// the `+z` hemisphere; every pixel picks a pseudo-random set per frame so
/// that neighbouring pixels don't share their noise pattern.
#[derive(Clone, Copy)]
pub struct SampleSets<'a> {
    samples: &'a [Vec4],
    set_count: u32,
    samples_per_set: u32,
}

impl<'a> SampleSets<'a> {
    pub fn new(
        samples: &'a [Vec4],
        set_count: u32,
        samples_per_set: u32,
    ) -> Self {
        Self {
            samples,
            set_count,
            samples_per_set,
        }
    }

    pub fn set_for(&self, pixel: UVec2, frame: u32) -> u32 {
        hash(pixel.x ^ hash(pixel.y ^ hash(frame))) % self.set_count.max(1)
    }

    pub fn get(&self, set: u32, sample: u32) -> Vec3 {
        let idx = set * self.samples_per_set + sample % self.samples_per_set;

        unsafe { self.samples.index_unchecked(idx as usize).xyz() }
    }
}

/// Rotates a `+z`-hemisphere sample so that it's oriented around `normal`.
pub fn hemisphere_to_world(normal: Vec3, sample: Vec3) -> Vec3 {
    let (t, b) = normal.any_orthonormal_pair();

    t * sample.x + b * sample.y + normal * sample.z
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec2, vec3};

    use super::*;

    #[test]
    fn set_for_stays_in_range() {
        let samples = vec![Vec4::Z; 7 * 4];
        let sets = SampleSets::new(&samples, 7, 4);

        for y in 0..16 {
            for x in 0..16 {
                assert!(sets.set_for(uvec2(x, y), 3) < 7);
            }
        }
    }

    #[test]
    fn set_for_varies_across_pixels_and_frames() {
        let samples = vec![Vec4::Z; 83];
        let sets = SampleSets::new(&samples, 83, 1);

        let a = sets.set_for(uvec2(10, 10), 0);
        let differs_spatially =
            (0..8).any(|x| sets.set_for(uvec2(x, 10), 0) != a);

        let differs_temporally =
            (1..8).any(|f| sets.set_for(uvec2(10, 10), f) != a);

        assert!(differs_spatially);
        assert!(differs_temporally);
    }

    #[test]
    fn get_wraps_within_set() {
        let samples: Vec<_> = (0..6).map(|i| Vec4::splat(i as f32)).collect();

        let sets = SampleSets::new(&samples, 2, 3);

        assert_relative_eq!(sets.get(1, 0).x, 3.0);
        assert_relative_eq!(sets.get(1, 4).x, 4.0);
    }

    #[test]
    fn hemisphere_to_world_preserves_elevation() {
        let normal = vec3(0.3, -0.5, 0.8).normalize();
        let sample = vec3(0.6, 0.0, 0.8);
        let dir = hemisphere_to_world(normal, sample);

        assert_relative_eq!(dir.length(), 1.0, epsilon = 0.0001);
        assert_relative_eq!(dir.dot(normal), 0.8, epsilon = 0.0001);
    }
}
