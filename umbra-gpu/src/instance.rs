use glam::{vec3a, vec4, Affine3A, Mat3A, Vec3, Vec4};

pub const GEOMETRY_KIND_TRIANGLES: u32 = 0;
pub const GEOMETRY_KIND_AABBS: u32 = 1;

/// Placement of a bottom-level structure inside of the top-level one, as
/// seen by the shaders.
#[derive(Clone, Copy)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug, PartialEq))]
pub struct InstanceRecord {
    pub world_to_local: Affine3A,
    pub local_to_world: Affine3A,

    /// Pointer (in `Vec4`s) to the root node of instance's BLAS
    pub blas_ptr: u32,

    pub hit_group_index: u32,
    pub instance_id: u32,
    pub geometry_kind: u32,
}

impl InstanceRecord {
    /// Number of `Vec4`s occupied by a single record.
    pub const SIZE: u32 = 7;

    pub fn encode(&self) -> [Vec4; 7] {
        let [w0, w1, w2] = encode_affine(&self.world_to_local);
        let [l0, l1, l2] = encode_affine(&self.local_to_world);

        let meta = vec4(
            f32::from_bits(self.blas_ptr),
            f32::from_bits(self.hit_group_index),
            f32::from_bits(self.instance_id),
            f32::from_bits(self.geometry_kind),
        );

        [w0, w1, w2, l0, l1, l2, meta]
    }

    pub fn decode(get: impl Fn(u32) -> Vec4, ptr: u32) -> Self {
        let meta = get(ptr + 6);

        Self {
            world_to_local: decode_affine([
                get(ptr),
                get(ptr + 1),
                get(ptr + 2),
            ]),
            local_to_world: decode_affine([
                get(ptr + 3),
                get(ptr + 4),
                get(ptr + 5),
            ]),
            blas_ptr: meta.x.to_bits(),
            hit_group_index: meta.y.to_bits(),
            instance_id: meta.z.to_bits(),
            geometry_kind: meta.w.to_bits(),
        }
    }

    /// Transforms a local-space normal into world-space.
    pub fn normal_to_world(&self, normal: Vec3) -> Vec3 {
        (self.world_to_local.matrix3.transpose() * normal).normalize()
    }
}

/// Stores an affine transformation as three rows.
fn encode_affine(xform: &Affine3A) -> [Vec4; 3] {
    let m = xform.matrix3;
    let t = xform.translation;

    [
        vec4(m.x_axis.x, m.y_axis.x, m.z_axis.x, t.x),
        vec4(m.x_axis.y, m.y_axis.y, m.z_axis.y, t.y),
        vec4(m.x_axis.z, m.y_axis.z, m.z_axis.z, t.z),
    ]
}

fn decode_affine([r0, r1, r2]: [Vec4; 3]) -> Affine3A {
    Affine3A {
        matrix3: Mat3A::from_cols(
            vec3a(r0.x, r1.x, r2.x),
            vec3a(r0.y, r1.y, r2.y),
            vec3a(r0.z, r1.z, r2.z),
        ),
        translation: vec3a(r0.w, r1.w, r2.w),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::{vec3, Quat};

    use super::*;

    #[test]
    fn encoding() {
        let local_to_world = Affine3A::from_scale_rotation_translation(
            vec3(1.0, 2.0, 3.0),
            Quat::from_rotation_y(0.5),
            vec3(4.0, 5.0, 6.0),
        );

        let target = InstanceRecord {
            world_to_local: local_to_world.inverse(),
            local_to_world,
            blas_ptr: 123,
            hit_group_index: 8,
            instance_id: 4,
            geometry_kind: GEOMETRY_KIND_AABBS,
        };

        let data = target.encode();
        let actual = InstanceRecord::decode(|ptr| data[ptr as usize], 0);

        assert_eq!(target, actual);
    }

    #[test]
    fn normals_follow_non_uniform_scale() {
        let local_to_world = Affine3A::from_scale(vec3(1.0, 4.0, 1.0));

        let record = InstanceRecord {
            world_to_local: local_to_world.inverse(),
            local_to_world,
            blas_ptr: 0,
            hit_group_index: 0,
            instance_id: 0,
            geometry_kind: GEOMETRY_KIND_TRIANGLES,
        };

        // A 45-degree slope gets flatter when stretched vertically, so its
        // normal has to lean towards the stretched axis less
        let normal = record.normal_to_world(vec3(1.0, 1.0, 0.0).normalize());

        assert_relative_eq!(normal.length(), 1.0, epsilon = 0.0001);
        assert!(normal.x > normal.y);
    }
}
