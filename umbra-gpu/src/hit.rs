use glam::Vec3;
#[cfg(target_arch = "spirv")]
use spirv_std::num_traits::Float;

/// Result of tracing a ray against the acceleration structures.
#[derive(Clone, Copy)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct Hit {
    pub distance: f32,

    /// World-space normal of the hit surface, facing whichever way the
    /// primitive is wound
    pub normal: Vec3,

    pub instance_id: u32,
    pub primitive_id: u32,

    /// Instance contribution to the hit-group index; shader-table lookups
    /// add the ray type on top
    pub hit_group_index: u32,
}

impl Hit {
    pub fn none() -> Self {
        Self {
            distance: f32::MAX,
            normal: Vec3::ZERO,
            instance_id: 0,
            primitive_id: 0,
            hit_group_index: 0,
        }
    }

    pub fn is_some(&self) -> bool {
        self.distance < f32::MAX
    }

    pub fn is_none(&self) -> bool {
        !self.is_some()
    }
}

/// Ray-triangle intersection (Möller-Trumbore).
///
/// Updates `distance` and returns the local-space geometric normal when the
/// triangle is hit closer than `distance` and not closer than `t_min`.
pub fn hit_triangle(
    origin: Vec3,
    direction: Vec3,
    [v0, v1, v2]: [Vec3; 3],
    t_min: f32,
    distance: &mut f32,
    normal: &mut Vec3,
) -> bool {
    let v0v1 = v1 - v0;
    let v0v2 = v2 - v0;

    let pvec = direction.cross(v0v2);
    let det = v0v1.dot(pvec);

    if det.abs() < f32::EPSILON {
        return false;
    }

    let inv_det = 1.0 / det;
    let tvec = origin - v0;
    let u = tvec.dot(pvec) * inv_det;
    let qvec = tvec.cross(v0v1);
    let v = direction.dot(qvec) * inv_det;
    let t = v0v2.dot(qvec) * inv_det;

    if (u < 0.0)
        | (u > 1.0)
        | (v < 0.0)
        | (u + v > 1.0)
        | (t < t_min)
        | (t >= *distance)
    {
        return false;
    }

    *distance = t;
    *normal = v0v1.cross(v0v2).normalize();

    true
}

/// Ray-box intersection for procedural AABB geometry.
///
/// A ray starting inside of the box reports its exit point.
pub fn hit_aabb(
    origin: Vec3,
    direction: Vec3,
    [min, max]: [Vec3; 2],
    t_min: f32,
    distance: &mut f32,
    normal: &mut Vec3,
) -> bool {
    let inv_direction = 1.0 / direction;
    let t0 = (min - origin) * inv_direction;
    let t1 = (max - origin) * inv_direction;
    let near = t0.min(t1);
    let far = t0.max(t1);
    let t_enter = near.max_element();
    let t_exit = far.min_element();

    if t_enter > t_exit {
        return false;
    }

    let (t, planes) = if t_enter >= t_min {
        (t_enter, near)
    } else {
        (t_exit, far)
    };

    if t < t_min || t >= *distance {
        return false;
    }

    // The slab that produced `t` tells which face got hit
    let face = if planes.x == t {
        Vec3::X
    } else if planes.y == t {
        Vec3::Y
    } else {
        Vec3::Z
    };

    *distance = t;
    *normal = if face.dot(direction) > 0.0 { -face } else { face };

    true
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    const TRIANGLE: [Vec3; 3] = [
        Vec3::new(-1.0, -1.0, 0.0),
        Vec3::new(1.0, -1.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
    ];

    #[test]
    fn triangle_hit() {
        let mut distance = f32::MAX;
        let mut normal = Vec3::ZERO;

        assert!(hit_triangle(
            vec3(0.0, 0.0, -2.0),
            Vec3::Z,
            TRIANGLE,
            0.0,
            &mut distance,
            &mut normal,
        ));

        assert_relative_eq!(distance, 2.0);
        assert_relative_eq!(normal.z.abs(), 1.0);
    }

    #[test]
    fn triangle_respects_range() {
        let mut distance = 1.5;
        let mut normal = Vec3::ZERO;

        assert!(!hit_triangle(
            vec3(0.0, 0.0, -2.0),
            Vec3::Z,
            TRIANGLE,
            0.0,
            &mut distance,
            &mut normal,
        ));

        let mut distance = f32::MAX;

        assert!(!hit_triangle(
            vec3(0.0, 0.0, -2.0),
            Vec3::Z,
            TRIANGLE,
            2.5,
            &mut distance,
            &mut normal,
        ));
    }

    #[test]
    fn triangle_miss() {
        let mut distance = f32::MAX;
        let mut normal = Vec3::ZERO;

        assert!(!hit_triangle(
            vec3(3.0, 0.0, -2.0),
            Vec3::Z,
            TRIANGLE,
            0.0,
            &mut distance,
            &mut normal,
        ));
    }

    #[test]
    fn aabb_hit_from_outside() {
        let mut distance = f32::MAX;
        let mut normal = Vec3::ZERO;

        assert!(hit_aabb(
            vec3(0.0, 0.0, -5.0),
            Vec3::Z,
            [Vec3::splat(-1.0), Vec3::splat(1.0)],
            0.0,
            &mut distance,
            &mut normal,
        ));

        assert_relative_eq!(distance, 4.0);
        assert_relative_eq!(normal.z, -1.0);
    }

    #[test]
    fn aabb_hit_from_inside() {
        let mut distance = f32::MAX;
        let mut normal = Vec3::ZERO;

        assert!(hit_aabb(
            Vec3::ZERO,
            Vec3::X,
            [Vec3::splat(-1.0), Vec3::splat(1.0)],
            0.001,
            &mut distance,
            &mut normal,
        ));

        assert_relative_eq!(distance, 1.0);
        assert_relative_eq!(normal.x, -1.0);
    }
}
