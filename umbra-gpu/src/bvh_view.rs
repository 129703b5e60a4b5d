use core::mem;

use glam::{Vec3, Vec4, Vec4Swizzles};
use spirv_std::arch::IndexUnchecked;

use crate::{
    hit_aabb, hit_triangle, Hit, InstanceRecord, Ray, BVH_STACK_SIZE,
};

pub const BVH_NODE_INTERNAL: u32 = 0;
pub const BVH_NODE_INSTANCES: u32 = 1;
pub const BVH_NODE_TRIANGLES: u32 = 2;
pub const BVH_NODE_AABBS: u32 = 3;

/// Number of `Vec4`s occupied by a single node.
pub const BVH_NODE_SIZE: u32 = 2;

/// Number of `Vec4`s occupied by the header preceding TLAS nodes.
pub const TLAS_HEADER_SIZE: u32 = 1;

/// Number of `Vec4`s occupied by a single triangle; `w` of the first one
/// holds the primitive index.
pub const TRIANGLE_RECORD_SIZE: u32 = 3;

/// Number of `Vec4`s occupied by a single AABB; `w` of the first one holds
/// the primitive index.
pub const AABB_RECORD_SIZE: u32 = 2;

pub fn encode_node_info(kind: u32, count: u32) -> f32 {
    f32::from_bits(kind | (count << 2))
}

/// Two-level view over serialized acceleration structures.
///
/// Nodes are `[d0, d1]` pairs where `d0 = (min, kind | count << 2)` and
/// `d1 = (max, payload)`; an internal node's left child directly follows it,
/// while its payload points at the right child.
#[derive(Clone, Copy)]
pub struct BvhView<'a> {
    tlas: &'a [Vec4],
    blas: &'a [Vec4],
}

impl<'a> BvhView<'a> {
    pub fn new(tlas: &'a [Vec4], blas: &'a [Vec4]) -> Self {
        Self { tlas, blas }
    }

    fn tlas(&self, ptr: u32) -> Vec4 {
        unsafe { *self.tlas.index_unchecked(ptr as usize) }
    }

    fn blas(&self, ptr: u32) -> Vec4 {
        unsafe { *self.blas.index_unchecked(ptr as usize) }
    }

    pub fn instance_count(&self) -> u32 {
        self.tlas(0).y.to_bits()
    }

    pub fn instance(&self, idx: u32) -> InstanceRecord {
        let instances_ptr = self.tlas(0).x.to_bits();

        InstanceRecord::decode(
            |ptr| self.tlas(ptr),
            instances_ptr + idx * InstanceRecord::SIZE,
        )
    }

    /// Traces given ray and returns its nearest hit within `t_min..t_max`.
    pub fn trace_nearest(&self, ray: Ray, t_min: f32, t_max: f32) -> Hit {
        let mut hit = Hit {
            distance: t_max,
            ..Hit::none()
        };

        if self.trace(ray, t_min, TracingMode::Nearest, &mut hit) {
            hit
        } else {
            Hit::none()
        }
    }

    /// Traces given ray and returns whether it hits anything within
    /// `t_min..t_max`.
    pub fn trace_any(&self, ray: Ray, t_min: f32, t_max: f32) -> bool {
        let mut hit = Hit {
            distance: t_max,
            ..Hit::none()
        };

        self.trace(ray, t_min, TracingMode::Any, &mut hit)
    }

    fn trace(
        &self,
        ray: Ray,
        t_min: f32,
        mode: TracingMode,
        hit: &mut Hit,
    ) -> bool {
        let header = self.tlas(0);

        if header.z.to_bits() == 0 {
            return false;
        }

        let instances_ptr = header.x.to_bits();
        let mut found = false;
        let mut stack = [0u32; BVH_STACK_SIZE];
        let mut stack_len = 0;
        let mut ptr = TLAS_HEADER_SIZE;

        if ray.distance_to_node(self.tlas(ptr).xyz(), self.tlas(ptr + 1).xyz())
            >= hit.distance
        {
            return false;
        }

        loop {
            let d0 = self.tlas(ptr);
            let d1 = self.tlas(ptr + 1);
            let info = d0.w.to_bits();

            if info & 0b11 == BVH_NODE_INTERNAL {
                let mut near_ptr = ptr + BVH_NODE_SIZE;
                let mut far_ptr = d1.w.to_bits();

                let mut near_distance = ray.distance_to_node(
                    self.tlas(near_ptr).xyz(),
                    self.tlas(near_ptr + 1).xyz(),
                );

                let mut far_distance = ray.distance_to_node(
                    self.tlas(far_ptr).xyz(),
                    self.tlas(far_ptr + 1).xyz(),
                );

                if far_distance < near_distance {
                    mem::swap(&mut near_ptr, &mut far_ptr);
                    mem::swap(&mut near_distance, &mut far_distance);
                }

                if far_distance < hit.distance && stack_len < BVH_STACK_SIZE {
                    stack[stack_len] = far_ptr;
                    stack_len += 1;
                }

                if near_distance < hit.distance {
                    ptr = near_ptr;
                    continue;
                }
            } else {
                let count = info >> 2;
                let first = d1.w.to_bits();
                let mut i = 0;

                while i < count {
                    let instance = InstanceRecord::decode(
                        |ptr| self.tlas(ptr),
                        instances_ptr + (first + i) * InstanceRecord::SIZE,
                    );

                    if self.trace_blas(ray, t_min, &instance, mode, hit) {
                        found = true;

                        if let TracingMode::Any = mode {
                            return true;
                        }
                    }

                    i += 1;
                }
            }

            if stack_len > 0 {
                stack_len -= 1;
                ptr = stack[stack_len];
            } else {
                break;
            }
        }

        found
    }

    fn trace_blas(
        &self,
        ray: Ray,
        t_min: f32,
        instance: &InstanceRecord,
        mode: TracingMode,
        hit: &mut Hit,
    ) -> bool {
        let ray = ray.transform(&instance.world_to_local);
        let mut found = false;
        let mut stack = [0u32; BVH_STACK_SIZE];
        let mut stack_len = 0;
        let mut ptr = instance.blas_ptr;

        if ray.distance_to_node(self.blas(ptr).xyz(), self.blas(ptr + 1).xyz())
            >= hit.distance
        {
            return false;
        }

        loop {
            let d0 = self.blas(ptr);
            let d1 = self.blas(ptr + 1);
            let info = d0.w.to_bits();
            let kind = info & 0b11;

            if kind == BVH_NODE_INTERNAL {
                let mut near_ptr = ptr + BVH_NODE_SIZE;
                let mut far_ptr = d1.w.to_bits();

                let mut near_distance = ray.distance_to_node(
                    self.blas(near_ptr).xyz(),
                    self.blas(near_ptr + 1).xyz(),
                );

                let mut far_distance = ray.distance_to_node(
                    self.blas(far_ptr).xyz(),
                    self.blas(far_ptr + 1).xyz(),
                );

                if far_distance < near_distance {
                    mem::swap(&mut near_ptr, &mut far_ptr);
                    mem::swap(&mut near_distance, &mut far_distance);
                }

                if far_distance < hit.distance && stack_len < BVH_STACK_SIZE {
                    stack[stack_len] = far_ptr;
                    stack_len += 1;
                }

                if near_distance < hit.distance {
                    ptr = near_ptr;
                    continue;
                }
            } else {
                let count = info >> 2;
                let mut record_ptr = d1.w.to_bits();
                let mut i = 0;

                while i < count {
                    let mut distance = hit.distance;
                    let mut normal = Vec3::ZERO;
                    let primitive_id;
                    let is_hit;

                    if kind == BVH_NODE_TRIANGLES {
                        let v0 = self.blas(record_ptr);

                        primitive_id = v0.w.to_bits();

                        is_hit = hit_triangle(
                            ray.origin(),
                            ray.direction(),
                            [
                                v0.xyz(),
                                self.blas(record_ptr + 1).xyz(),
                                self.blas(record_ptr + 2).xyz(),
                            ],
                            t_min,
                            &mut distance,
                            &mut normal,
                        );

                        record_ptr += TRIANGLE_RECORD_SIZE;
                    } else {
                        let min = self.blas(record_ptr);

                        primitive_id = min.w.to_bits();

                        is_hit = hit_aabb(
                            ray.origin(),
                            ray.direction(),
                            [min.xyz(), self.blas(record_ptr + 1).xyz()],
                            t_min,
                            &mut distance,
                            &mut normal,
                        );

                        record_ptr += AABB_RECORD_SIZE;
                    }

                    if is_hit {
                        hit.distance = distance;
                        hit.normal = instance.normal_to_world(normal);
                        hit.instance_id = instance.instance_id;
                        hit.primitive_id = primitive_id;
                        hit.hit_group_index = instance.hit_group_index;
                        found = true;

                        if let TracingMode::Any = mode {
                            return true;
                        }
                    }

                    i += 1;
                }
            }

            if stack_len > 0 {
                stack_len -= 1;
                ptr = stack[stack_len];
            } else {
                break;
            }
        }

        found
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TracingMode {
    Nearest,
    Any,
}
