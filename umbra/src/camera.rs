use spirv_std::glam::{Mat4, UVec2, Vec3};

use crate::gpu;

/// Camera, as supplied by the application's camera controller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub projection: Mat4,

    /// World-to-view matrix
    pub view: Mat4,

    pub origin: Vec3,
}

impl Camera {
    /// Creates a right-handed perspective camera looking from `origin` at
    /// `target`.
    pub fn look_at(
        origin: Vec3,
        target: Vec3,
        fov_y: f32,
        aspect_ratio: f32,
    ) -> Self {
        let projection =
            Mat4::perspective_rh(fov_y, aspect_ratio, 0.01, 1000.0);

        Self {
            projection,
            view: Mat4::look_at_rh(origin, target, Vec3::Y),
            origin,
        }
    }

    pub(crate) fn serialize(&self, screen_size: UVec2) -> gpu::Camera {
        let projection_view = self.projection * self.view;

        gpu::Camera {
            projection_view,
            ndc_to_world: projection_view.inverse(),
            origin: self.origin.extend(1.0),
            screen: screen_size.as_vec2().extend(0.0).extend(0.0),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::look_at(Vec3::new(0.0, 1.0, 5.0), Vec3::ZERO, 1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use spirv_std::glam::{uvec2, vec3};

    use super::*;

    #[test]
    fn central_ray_points_at_target() {
        let target = vec3(1.0, 2.0, -3.0);
        let camera = Camera::look_at(vec3(4.0, 5.0, 6.0), target, 0.8, 1.0);
        let ray = camera.serialize(uvec2(101, 101)).ray(uvec2(50, 50));

        let expected = (target - camera.origin).normalize();

        assert_relative_eq!(ray.direction().dot(expected), 1.0, epsilon = 1e-4);
        assert!(ray.origin().abs_diff_eq(camera.origin, 1e-4));
    }

    #[test]
    fn matrices_are_inverses() {
        let camera = Camera::default();
        let gpu = camera.serialize(uvec2(640, 480));
        let identity = gpu.projection_view * gpu.ndc_to_world;

        assert!(identity.abs_diff_eq(Mat4::IDENTITY, 1e-4));
        assert_eq!(uvec2(640, 480), gpu.screen_size());
    }
}
