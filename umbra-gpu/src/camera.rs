use bytemuck::{Pod, Zeroable};
use glam::{vec2, IVec2, Mat4, UVec2, Vec2, Vec3, Vec4, Vec4Swizzles};
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

use crate::Ray;

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct Camera {
    pub projection_view: Mat4,
    pub ndc_to_world: Mat4,

    /// x, y, z - camera's position in world-space
    pub origin: Vec4,

    /// x, y - size of the image rays are generated for
    pub screen: Vec4,
}

impl Camera {
    /// Given a point in world-coordinates, returns it in clip-coordinates.
    pub fn world_to_clip(&self, pos: Vec3) -> Vec4 {
        self.projection_view * pos.extend(1.0)
    }

    pub fn screen_size(&self) -> UVec2 {
        self.screen.xy().as_uvec2()
    }

    /// Returns whether given point lays inside the screen.
    pub fn contains(&self, pos: IVec2) -> bool {
        crate::contains(self.screen.xy().as_ivec2(), pos)
    }

    /// Casts a ray from camera's origin through the center of given pixel.
    pub fn ray(&self, screen_pos: UVec2) -> Ray {
        let screen_size = self.screen.xy();
        let ndc = (screen_pos.as_vec2() + 0.5) * 2.0 / screen_size - Vec2::ONE;
        let ndc = vec2(ndc.x, -ndc.y);

        // Any depth strictly between the planes works here, since all of the
        // points lay on the same line crossing camera's origin
        let point = self.ndc_to_world.project_point3(ndc.extend(0.5));
        let origin = self.origin.xyz();

        Ray::new(origin, (point - origin).normalize())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{ivec2, uvec2, vec4};

    use super::*;

    fn camera() -> Camera {
        let view = Mat4::look_at_rh(Vec3::ZERO, -Vec3::Z, Vec3::Y);
        let projection = Mat4::perspective_rh(1.0, 1.0, 0.1, 100.0);
        let projection_view = projection * view;

        Camera {
            projection_view,
            ndc_to_world: projection_view.inverse(),
            origin: Vec4::W,
            screen: vec4(64.0, 64.0, 0.0, 0.0),
        }
    }

    #[test]
    fn central_ray_looks_forward() {
        let ray = camera().ray(uvec2(32, 32));

        // Pixel centers are offset by half a pixel, so the ray is only nearly
        // aligned with the forward axis
        assert_relative_eq!(ray.direction().z, -1.0, epsilon = 0.001);
        assert!(ray.origin().abs_diff_eq(Vec3::ZERO, 0.0001));
    }

    #[test]
    fn top_left_ray_points_up_and_left() {
        let ray = camera().ray(uvec2(0, 0));

        assert!(ray.direction().x < 0.0);
        assert!(ray.direction().y > 0.0);
        assert!(ray.direction().z < 0.0);
        assert_relative_eq!(ray.direction().length(), 1.0, epsilon = 0.0001);
    }

    #[test]
    fn ray_reprojects_onto_its_pixel() {
        let camera = camera();
        let ray = camera.ray(uvec2(10, 50));
        let clip = camera.world_to_clip(ray.at(5.0));
        let ndc = clip.xy() / clip.w;
        let screen = (vec2(ndc.x, -ndc.y) * 0.5 + 0.5) * 64.0;

        assert!(screen.abs_diff_eq(vec2(10.5, 50.5), 0.01));
    }

    #[test]
    fn contains() {
        let camera = camera();

        assert!(camera.contains(ivec2(63, 0)));
        assert!(!camera.contains(ivec2(64, 0)));
        assert!(!camera.contains(ivec2(0, -1)));
    }
}
