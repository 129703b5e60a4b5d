use spirv_std::glam::Vec4;

use crate::{gpu, BoundingBox, Bvh, BvhPrimitive, Geometry};

/// Bottom-level acceleration structure - a BVH over primitives of a single
/// geometry, in geometry's local space.
#[derive(Clone, Debug)]
pub struct Blas {
    bvh: Bvh,
    kind: u32,
    len: usize,
}

impl Blas {
    pub fn build(geometry: &Geometry) -> Self {
        let primitives = (0..geometry.len())
            .map(|idx| {
                BvhPrimitive::new(idx as u32, geometry.primitive_bounds(idx))
            })
            .collect();

        Self {
            bvh: Bvh::build(primitives),
            kind: geometry.kind(),
            len: geometry.len(),
        }
    }

    /// Updates bounds after geometry's vertices have moved; the caller
    /// guarantees that the primitive count and kind stayed the same.
    pub fn refit(&mut self, geometry: &Geometry) {
        debug_assert_eq!(self.kind, geometry.kind());
        debug_assert_eq!(self.len, geometry.len());

        self.bvh.refit(|idx| geometry.primitive_bounds(idx as usize));
    }

    pub fn kind(&self) -> u32 {
        self.kind
    }

    /// Local-space bounds of the whole geometry.
    pub fn bounds(&self) -> BoundingBox {
        self.bvh.root_bounds()
    }

    /// Number of `Vec4`s this structure occupies once serialized.
    pub fn serialized_len(&self, geometry: &Geometry) -> usize {
        self.bvh.nodes().len() * (gpu::BVH_NODE_SIZE as usize)
            + self.len * (geometry.record_size() as usize)
    }

    /// Appends nodes followed by primitive records, returning pointer of the
    /// root node.
    pub fn serialize(&self, geometry: &Geometry, out: &mut Vec<Vec4>) -> u32 {
        let records_ptr = (out.len() + self.bvh.nodes().len() * 2) as u32;
        let record_size = geometry.record_size();

        let root_ptr =
            self.bvh.serialize(out, geometry.bvh_node_kind(), |first| {
                records_ptr + (first as u32) * record_size
            });

        for idx in self.bvh.primitives() {
            geometry.serialize_primitive(*idx as usize, out);
        }

        root_ptr
    }
}

#[cfg(test)]
mod tests {
    use spirv_std::glam::{vec3, Vec3};

    use super::*;

    #[test]
    fn serialized_len() {
        let geometry = Geometry::Triangles(
            (0..10)
                .map(|i| {
                    let x = i as f32;

                    [vec3(x, 0.0, 0.0), vec3(x + 1.0, 0.0, 0.0), Vec3::Y]
                })
                .collect(),
        );

        let target = Blas::build(&geometry);
        let mut out = vec![Vec4::ZERO; 5];
        let root_ptr = target.serialize(&geometry, &mut out);

        assert_eq!(5, root_ptr);
        assert_eq!(5 + target.serialized_len(&geometry), out.len());
        assert_eq!(vec3(0.0, 0.0, 0.0), target.bounds().min());
        assert_eq!(vec3(10.0, 1.0, 0.0), target.bounds().max());
    }
}
