use glam::{vec4, Vec3, Vec4};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::{
    GBufferEntry, Scene, VIEW_MODE_AMBIENT_OCCLUSION, VIEW_MODE_DEPTH,
    VIEW_MODE_NORMALS, VIEW_MODE_RAW_AMBIENT_OCCLUSION, VIEW_MODE_VARIANCE,
};

/// Shades a surface lit by the scene's directional light and an ambient term
/// attenuated by the ambient occlusion.
pub fn shade(
    scene: &Scene,
    gbuffer: &GBufferEntry,
    base_color: Vec3,
    ao: f32,
) -> Vec3 {
    if !gbuffer.is_some() {
        return scene.background.truncate();
    }

    let n_dot_l = gbuffer.normal.dot(scene.light_direction()).max(0.0);

    let direct =
        scene.light_color.truncate() * (scene.light_intensity() * n_dot_l);

    let ambient = Vec3::splat(scene.ambient() * ao.clamp(0.0, 1.0));

    base_color * (direct + ambient)
}

/// Produces final color of a pixel, according to the scene's view mode.
pub fn compose(
    scene: &Scene,
    gbuffer: &GBufferEntry,
    base_color: Vec3,
    ao: f32,
    raw_ao: f32,
    variance: f32,
) -> Vec4 {
    let mode = scene.view_mode();

    let color = if mode == VIEW_MODE_AMBIENT_OCCLUSION {
        Vec3::splat(ao)
    } else if mode == VIEW_MODE_RAW_AMBIENT_OCCLUSION {
        Vec3::splat(raw_ao)
    } else if mode == VIEW_MODE_NORMALS {
        gbuffer.normal * 0.5 + 0.5
    } else if mode == VIEW_MODE_DEPTH {
        Vec3::splat(gbuffer.depth / (1.0 + gbuffer.depth))
    } else if mode == VIEW_MODE_VARIANCE {
        Vec3::splat(variance.max(0.0).sqrt())
    } else {
        shade(scene, gbuffer, base_color, ao)
    };

    vec4(color.x, color.y, color.z, 1.0)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{uvec4, vec3};

    use super::*;
    use crate::VIEW_MODE_COMPOSED;

    fn scene(view_mode: u32) -> Scene {
        Scene {
            light: vec4(0.0, 1.0, 0.0, 2.0),
            light_color: vec4(1.0, 1.0, 1.0, 0.5),
            background: vec4(0.1, 0.2, 0.3, 0.0),
            view: uvec4(view_mode, 0, 0, 0),
            ..Default::default()
        }
    }

    fn floor() -> GBufferEntry {
        GBufferEntry {
            normal: Vec3::Y,
            depth: 3.0,
            position: Vec3::ZERO,
            material_id: 0,
        }
    }

    #[test]
    fn ao_attenuates_ambient_only() {
        let scene = scene(VIEW_MODE_COMPOSED);
        let albedo = vec3(0.5, 0.5, 0.5);

        let lit = shade(&scene, &floor(), albedo, 1.0);
        let occluded = shade(&scene, &floor(), albedo, 0.0);

        assert_relative_eq!(lit.x, 0.5 * (2.0 + 0.5));
        assert_relative_eq!(occluded.x, 0.5 * 2.0);
    }

    #[test]
    fn sky_shows_background() {
        let color = compose(
            &scene(VIEW_MODE_COMPOSED),
            &GBufferEntry::default(),
            Vec3::ONE,
            1.0,
            1.0,
            0.0,
        );

        assert_relative_eq!(color.z, 0.3);
    }

    #[test]
    fn debug_views() {
        let gbuffer = floor();

        let ao = compose(
            &scene(VIEW_MODE_AMBIENT_OCCLUSION),
            &gbuffer,
            Vec3::ONE,
            0.25,
            0.75,
            0.04,
        );

        let raw = compose(
            &scene(VIEW_MODE_RAW_AMBIENT_OCCLUSION),
            &gbuffer,
            Vec3::ONE,
            0.25,
            0.75,
            0.04,
        );

        let variance = compose(
            &scene(VIEW_MODE_VARIANCE),
            &gbuffer,
            Vec3::ONE,
            0.25,
            0.75,
            0.04,
        );

        let normals = compose(
            &scene(VIEW_MODE_NORMALS),
            &gbuffer,
            Vec3::ONE,
            0.25,
            0.75,
            0.04,
        );

        assert_relative_eq!(ao.x, 0.25);
        assert_relative_eq!(raw.x, 0.75);
        assert_relative_eq!(variance.x, 0.2);
        assert_relative_eq!(normals.y, 1.0);
        assert_relative_eq!(normals.x, 0.5);
    }
}
