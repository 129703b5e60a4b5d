use std::f32::consts::PI;

use log::debug;
use rand::Rng;
use spirv_std::glam::{vec2, vec3, Vec2, Vec3, Vec4};

use crate::{Error, RendererConfig, Result};

/// Maximum number of samples (across all sets) the samples buffer can hold.
pub const MAX_SAMPLES: usize = 64 * 1024;

/// Stratified hemisphere directions, uploaded for the ambient occlusion
/// pass.
///
/// Samples are generated once and stay unchanged until the generator is
/// explicitly asked to recreate them (see
/// [`crate::Request::RecreateAoSamples`]).
#[derive(Clone, Debug, PartialEq)]
pub struct SampleSets {
    samples: Vec<Vec4>,
    set_count: u32,
    samples_per_set: u32,
}

impl SampleSets {
    pub fn from_config(
        config: &RendererConfig,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        Self::generate(
            rng,
            config.sample_set_count,
            config.samples_per_set(),
            config.ao_cosine_exponent,
        )
    }

    /// Generates `set_count` multi-jittered sets, each containing
    /// `samples_per_set` directions (which must be a perfect square).
    pub fn generate(
        rng: &mut impl Rng,
        set_count: u32,
        samples_per_set: u32,
        cosine_exponent: f32,
    ) -> Result<Self> {
        let n = (samples_per_set as f32).sqrt().round() as u32;

        if n == 0 || n * n != samples_per_set {
            return Err(Error::InvalidConfig(format!(
                "samples per set must be a perfect square, got \
                 {samples_per_set}"
            )));
        }

        let len = (set_count as usize) * (samples_per_set as usize);

        if len > MAX_SAMPLES {
            return Err(Error::CapacityExceeded {
                what: "samples",
                limit: MAX_SAMPLES,
                requested: len,
            });
        }

        debug!(
            "Generating samples (sets={set_count}, per_set={samples_per_set}, \
             exponent={cosine_exponent})"
        );

        let mut samples = Vec::with_capacity(len);

        for _ in 0..set_count {
            samples.extend(
                multi_jittered(rng, n)
                    .into_iter()
                    .map(|sample| hemisphere(sample, cosine_exponent))
                    .map(|sample| sample.extend(0.0)),
            );
        }

        Ok(Self {
            samples,
            set_count,
            samples_per_set,
        })
    }

    pub fn samples(&self) -> &[Vec4] {
        &self.samples
    }

    pub fn set_count(&self) -> u32 {
        self.set_count
    }

    pub fn samples_per_set(&self) -> u32 {
        self.samples_per_set
    }
}

/// Generates `n * n` points within the unit square, such that each of the
/// `n * n` columns and rows contains exactly one point (n-rooks) and each of
/// the `n x n` cells contains exactly one point.
///
/// Follows the Chiu-Shirley-Wang construction: start from the canonical
/// arrangement and shuffle x coordinates within columns and y coordinates
/// within rows.
pub fn multi_jittered(rng: &mut impl Rng, n: u32) -> Vec<Vec2> {
    let n = n as usize;
    let nn = (n * n) as f32;
    let mut samples = vec![Vec2::ZERO; n * n];

    for j in 0..n {
        for i in 0..n {
            samples[j * n + i] = vec2(
                ((i * n + j) as f32 + rng.gen::<f32>()) / nn,
                ((j * n + i) as f32 + rng.gen::<f32>()) / nn,
            );
        }
    }

    for i in 0..n {
        for j in 0..n {
            let k = rng.gen_range(j..n);
            let x = samples[j * n + i].x;

            samples[j * n + i].x = samples[k * n + i].x;
            samples[k * n + i].x = x;
        }
    }

    for j in 0..n {
        for i in 0..n {
            let k = rng.gen_range(i..n);
            let y = samples[j * n + i].y;

            samples[j * n + i].y = samples[j * n + k].y;
            samples[j * n + k].y = y;
        }
    }

    samples
}

/// Maps a point from the unit square onto the `+z` hemisphere, with density
/// proportional to `cos(theta)^exponent`.
pub fn hemisphere(sample: Vec2, exponent: f32) -> Vec3 {
    let cos_theta = (1.0 - sample.x).powf(1.0 / (exponent + 1.0));
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = 2.0 * PI * sample.y;

    vec3(phi.cos() * sin_theta, phi.sin() * sin_theta, cos_theta)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use spirv_std::glam::Vec4Swizzles;

    use super::*;

    fn cell(value: f32, cells: usize) -> usize {
        ((value * cells as f32) as usize).min(cells - 1)
    }

    #[test]
    fn multi_jittered_satisfies_n_rooks() {
        let mut rng = StdRng::seed_from_u64(1234);

        for n in [1, 2, 3, 8] {
            let samples = multi_jittered(&mut rng, n);
            let nn = (n * n) as usize;

            let mut columns = vec![0; nn];
            let mut rows = vec![0; nn];

            for sample in &samples {
                assert!(sample.cmpge(Vec2::ZERO).all());
                assert!(sample.cmple(Vec2::ONE).all());

                columns[cell(sample.x, nn)] += 1;
                rows[cell(sample.y, nn)] += 1;
            }

            assert!(columns.iter().all(|count| *count == 1), "n={n}");
            assert!(rows.iter().all(|count| *count == 1), "n={n}");
        }
    }

    #[test]
    fn multi_jittered_is_stratified() {
        let mut rng = StdRng::seed_from_u64(4321);

        for n in [2, 4, 7] {
            let samples = multi_jittered(&mut rng, n);
            let n = n as usize;
            let mut cells = vec![0; n * n];

            for sample in &samples {
                cells[cell(sample.y, n) * n + cell(sample.x, n)] += 1;
            }

            assert!(cells.iter().all(|count| *count == 1), "n={n}");
        }
    }

    #[test]
    fn hemisphere_samples_are_unit_and_upwards() {
        let mut rng = StdRng::seed_from_u64(0);

        for exponent in [0.0, 1.0, 4.0] {
            let sets = SampleSets::generate(&mut rng, 3, 16, exponent).unwrap();

            assert_eq!(3 * 16, sets.samples().len());

            for sample in sets.samples() {
                assert_relative_eq!(
                    sample.xyz().length(),
                    1.0,
                    epsilon = 1e-4
                );
                assert!(sample.z >= 0.0);
            }
        }
    }

    #[test]
    fn higher_exponent_focuses_around_normal() {
        let mut rng = StdRng::seed_from_u64(99);

        let mut mean_z = |exponent| {
            let sets =
                SampleSets::generate(&mut rng, 16, 16, exponent).unwrap();

            let sum: f32 = sets.samples().iter().map(|s| s.z).sum();

            sum / (sets.samples().len() as f32)
        };

        let uniform = mean_z(0.0);
        let cosine = mean_z(1.0);
        let focused = mean_z(8.0);

        // Expected values are 1/2, 2/3 and 9/10 respectively
        assert_relative_eq!(uniform, 0.5, epsilon = 0.02);
        assert_relative_eq!(cosine, 2.0 / 3.0, epsilon = 0.02);
        assert!(focused > cosine);
    }

    #[test]
    fn invalid_set_size() {
        let mut rng = StdRng::seed_from_u64(0);

        assert!(matches!(
            SampleSets::generate(&mut rng, 1, 5, 1.0),
            Err(Error::InvalidConfig(_))
        ));

        assert!(matches!(
            SampleSets::generate(&mut rng, 100_000, 1, 1.0),
            Err(Error::CapacityExceeded { what: "samples", .. })
        ));
    }

    #[test]
    fn follows_config() {
        let mut rng = StdRng::seed_from_u64(0);

        let config = RendererConfig {
            ao_samples_per_pixel: 3,
            sample_set_count: 5,
            ..Default::default()
        };

        let sets = SampleSets::from_config(&config, &mut rng).unwrap();

        assert_eq!(5, sets.set_count());
        assert_eq!(4, sets.samples_per_set());
    }
}
