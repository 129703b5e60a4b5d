use glam::{Affine3A, Vec3};

#[derive(Copy, Clone, Default)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct Ray {
    origin: Vec3,
    direction: Vec3,
    inv_direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            inv_direction: 1.0 / direction,
        }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Moves this ray into another space.
    ///
    /// Direction is not renormalized, so distances measured along the
    /// returned ray stay comparable with distances measured along `self`.
    pub fn transform(&self, xform: &Affine3A) -> Self {
        Self::new(
            xform.transform_point3(self.origin),
            xform.transform_vector3(self.direction),
        )
    }

    /// Returns distance to the entry point of given box or `f32::MAX` if the
    /// box is not hit at all.
    pub fn distance_to_node(&self, aabb_min: Vec3, aabb_max: Vec3) -> f32 {
        let hit_min = (aabb_min - self.origin) * self.inv_direction;
        let hit_max = (aabb_max - self.origin) * self.inv_direction;

        let tmin = hit_min.min(hit_max).max_element();
        let tmax = hit_min.max(hit_max).min_element();

        if tmax >= tmin && tmax >= 0.0 {
            tmin
        } else {
            f32::MAX
        }
    }

    /// Returns the entry and exit distances of given box; the box is missed
    /// when entry > exit.
    pub fn slabs(&self, aabb_min: Vec3, aabb_max: Vec3) -> (f32, f32) {
        let hit_min = (aabb_min - self.origin) * self.inv_direction;
        let hit_max = (aabb_max - self.origin) * self.inv_direction;

        (
            hit_min.min(hit_max).max_element(),
            hit_min.max(hit_max).min_element(),
        )
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    #[test]
    fn distance_to_node() {
        let ray = Ray::new(vec3(0.0, 0.0, -5.0), Vec3::Z);

        assert_relative_eq!(
            ray.distance_to_node(Vec3::splat(-1.0), Vec3::splat(1.0)),
            4.0
        );

        assert_eq!(
            ray.distance_to_node(vec3(2.0, 2.0, -1.0), vec3(3.0, 3.0, 1.0)),
            f32::MAX
        );

        // Box behind the ray
        assert_eq!(
            ray.distance_to_node(vec3(-1.0, -1.0, -9.0), vec3(1.0, 1.0, -8.0)),
            f32::MAX
        );
    }

    #[test]
    fn transform_keeps_distances() {
        let ray = Ray::new(vec3(0.0, 0.0, -5.0), Vec3::Z);
        let xform = Affine3A::from_scale(Vec3::splat(0.5));
        let local = ray.transform(&xform);

        assert_relative_eq!(ray.at(3.0).z * 0.5, local.at(3.0).z);
    }
}
