use glam::Vec3;

use crate::{hemisphere_to_world, BvhView, Ray, SampleSets, Scene};

/// Outcome of casting a single pixel's occlusion rays.
#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct AmbientOcclusion {
    /// Average miss value over all rays (occluded rays contribute zero)
    pub visibility: f32,

    /// Number of rays that hit something
    pub hits: u32,
}

/// Casts `scene.spp()` occlusion rays from a surface point into the
/// hemisphere around its normal, using samples from `set`.
///
/// Rays start slightly above the surface and only consider geometry within
/// the scene's ambient occlusion range.
pub fn trace_ambient_occlusion(
    bvh: BvhView,
    sets: SampleSets,
    set: u32,
    scene: &Scene,
    position: Vec3,
    normal: Vec3,
    miss_value: f32,
) -> AmbientOcclusion {
    let spp = scene.spp().max(1);
    let origin = position + normal * scene.ao_min_distance();
    let mut visibility = 0.0;
    let mut hits = 0;
    let mut sample_idx = 0;

    while sample_idx < spp {
        let direction = hemisphere_to_world(
            normal,
            sets.get(set, scene.frame() * spp + sample_idx),
        );

        let is_occluded = bvh.trace_any(
            Ray::new(origin, direction),
            scene.ao_min_distance(),
            scene.ao_max_distance(),
        );

        if is_occluded {
            hits += 1;
        } else {
            visibility += miss_value;
        }

        sample_idx += 1;
    }

    AmbientOcclusion {
        visibility: visibility / (spp as f32),
        hits,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec4, vec3, vec4, Affine3A, Vec4};

    use super::*;
    use crate::{
        encode_node_info, InstanceRecord, BVH_NODE_INSTANCES,
        BVH_NODE_TRIANGLES, GEOMETRY_KIND_TRIANGLES,
    };

    /// Builds structures containing one large horizontal plane per given
    /// height.
    fn planes(heights: &[f32]) -> (Vec<Vec4>, Vec<Vec4>) {
        let a = vec3(-1.0, -1.0, 0.0);
        let b = vec3(1.0, -1.0, 0.0);
        let c = vec3(1.0, 1.0, 0.0);
        let d = vec3(-1.0, 1.0, 0.0);

        let blas = vec![
            vec4(-1.0, -1.0, 0.0, encode_node_info(BVH_NODE_TRIANGLES, 2)),
            vec4(1.0, 1.0, 0.0, f32::from_bits(2)),
            a.extend(f32::from_bits(0)),
            b.extend(0.0),
            c.extend(0.0),
            a.extend(f32::from_bits(1)),
            c.extend(0.0),
            d.extend(0.0),
        ];

        let count = heights.len() as u32;
        let min_z = heights.iter().copied().fold(f32::MAX, f32::min);
        let max_z = heights.iter().copied().fold(f32::MIN, f32::max);

        let mut tlas = vec![
            vec4(
                f32::from_bits(3),
                f32::from_bits(count),
                f32::from_bits(1),
                0.0,
            ),
            vec4(
                -100.0,
                -100.0,
                min_z,
                encode_node_info(BVH_NODE_INSTANCES, count),
            ),
            vec4(100.0, 100.0, max_z, f32::from_bits(0)),
        ];

        for (idx, &z) in heights.iter().enumerate() {
            let local_to_world = Affine3A::from_translation(vec3(0.0, 0.0, z))
                * Affine3A::from_scale(vec3(100.0, 100.0, 1.0));

            tlas.extend(
                InstanceRecord {
                    world_to_local: local_to_world.inverse(),
                    local_to_world,
                    blas_ptr: 0,
                    hit_group_index: 0,
                    instance_id: idx as u32,
                    geometry_kind: GEOMETRY_KIND_TRIANGLES,
                }
                .encode(),
            );
        }

        (tlas, blas)
    }

    /// Four directions, tilted at most ~30 degrees away from `+z`.
    fn samples() -> Vec<Vec4> {
        [
            vec3(0.3, 0.2, 0.9),
            vec3(-0.3, 0.2, 0.9),
            vec3(0.2, -0.4, 0.9),
            vec3(-0.1, -0.3, 0.95),
        ]
        .into_iter()
        .map(|dir| dir.normalize().extend(0.0))
        .collect()
    }

    fn scene(spp: u32, max_distance: f32) -> Scene {
        Scene {
            ao_range: vec4(max_distance, 0.001, 0.0, 0.0),
            ao_sampling: uvec4(spp, 0, 1, 4),
            ..Default::default()
        }
    }

    fn run(heights: &[f32], scene: &Scene) -> AmbientOcclusion {
        let (tlas, blas) = planes(heights);
        let samples = samples();

        trace_ambient_occlusion(
            BvhView::new(&tlas, &blas),
            SampleSets::new(&samples, 1, 4),
            0,
            scene,
            vec3(0.5, 0.5, 0.0),
            Vec3::Z,
            1.0,
        )
    }

    #[test]
    fn open_plane_is_unoccluded() {
        let ao = run(&[0.0], &scene(4, 5.0));

        assert_relative_eq!(ao.visibility, 1.0);
        assert_eq!(0, ao.hits);
    }

    #[test]
    fn roof_occludes_every_ray() {
        let ao = run(&[0.0, 1.0], &scene(4, 5.0));

        assert_relative_eq!(ao.visibility, 0.0);
        assert_eq!(4, ao.hits);
    }

    #[test]
    fn roof_out_of_range_is_ignored() {
        let ao = run(&[0.0, 10.0], &scene(4, 5.0));

        assert_relative_eq!(ao.visibility, 1.0);
        assert_eq!(0, ao.hits);
    }

    #[test]
    fn zero_spp_casts_a_single_ray() {
        let ao = run(&[0.0, 1.0], &scene(0, 5.0));

        assert_relative_eq!(ao.visibility, 0.0);
        assert_eq!(1, ao.hits);
    }

    #[test]
    fn miss_value_scales_visibility() {
        let (tlas, blas) = planes(&[0.0]);
        let samples = samples();

        let ao = trace_ambient_occlusion(
            BvhView::new(&tlas, &blas),
            SampleSets::new(&samples, 1, 4),
            0,
            &scene(2, 5.0),
            Vec3::ZERO,
            Vec3::Z,
            0.5,
        );

        assert_relative_eq!(ao.visibility, 0.5);
    }
}
