mod builder;
mod serializer;

use spirv_std::glam::{Vec3, Vec4};

use crate::BoundingBox;

/// Primitive as seen by the BVH builder - a triangle, an AABB or a whole
/// instance, depending on which level the tree is built for.
#[derive(Clone, Copy, Debug)]
pub struct BvhPrimitive {
    pub bounds: BoundingBox,
    pub center: Vec3,
    pub id: u32,
}

impl BvhPrimitive {
    pub fn new(id: u32, bounds: BoundingBox) -> Self {
        Self {
            bounds,
            center: bounds.center(),
            id,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BvhNode {
    Internal {
        bounds: BoundingBox,
        left: usize,
        right: usize,
    },

    /// Leaf spanning `primitives[first..first + count]`.
    Leaf {
        bounds: BoundingBox,
        first: usize,
        count: usize,
    },
}

impl BvhNode {
    pub fn bounds(&self) -> BoundingBox {
        match self {
            BvhNode::Internal { bounds, .. } | BvhNode::Leaf { bounds, .. } => {
                *bounds
            }
        }
    }

    fn sah_cost(&self) -> f32 {
        if let BvhNode::Leaf { bounds, count, .. } = self {
            (*count as f32) * bounds.half_area()
        } else {
            0.0
        }
    }
}

/// Bounding volume hierarchy stored as an arena.
///
/// Children always come after their parents, so walking the arena backwards
/// visits every node after both of its children - that's what refitting
/// relies on.
#[derive(Clone, Debug, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,

    /// Primitive ids, permuted so that each leaf spans a contiguous range
    primitives: Vec<u32>,
}

impl Bvh {
    pub fn build(primitives: Vec<BvhPrimitive>) -> Self {
        builder::run(primitives)
    }

    /// Recomputes bounds of all nodes, keeping the topology intact.
    pub fn refit(&mut self, bounds: impl Fn(u32) -> BoundingBox) {
        for node_id in (0..self.nodes.len()).rev() {
            let new_bounds = match self.nodes[node_id] {
                BvhNode::Internal { left, right, .. } => {
                    self.nodes[left].bounds() + self.nodes[right].bounds()
                }

                BvhNode::Leaf { first, count, .. } => self.primitives
                    [first..first + count]
                    .iter()
                    .map(|id| bounds(*id))
                    .collect(),
            };

            match &mut self.nodes[node_id] {
                BvhNode::Internal { bounds, .. }
                | BvhNode::Leaf { bounds, .. } => {
                    *bounds = new_bounds;
                }
            }
        }
    }

    /// Serializes the tree into `out`, returning pointer of the root node.
    ///
    /// Pointers are absolute, i.e. they assume `out` is going to be uploaded
    /// as-is; `leaf_payload` maps a leaf's first primitive (as an index into
    /// [`Self::primitives()`]) into whatever the shaders expect to find
    /// there.
    pub fn serialize(
        &self,
        out: &mut Vec<Vec4>,
        leaf_kind: u32,
        leaf_payload: impl Fn(usize) -> u32,
    ) -> u32 {
        serializer::run(self, out, leaf_kind, &leaf_payload)
    }

    pub fn root_bounds(&self) -> BoundingBox {
        self.nodes
            .first()
            .map(|node| node.bounds())
            .unwrap_or_default()
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    pub fn primitives(&self) -> &[u32] {
        &self.primitives
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn depth(&self) -> usize {
        fn depth(nodes: &[BvhNode], id: usize) -> usize {
            match nodes[id] {
                BvhNode::Internal { left, right, .. } => {
                    1 + depth(nodes, left).max(depth(nodes, right))
                }
                BvhNode::Leaf { .. } => 1,
            }
        }

        if self.nodes.is_empty() {
            0
        } else {
            depth(&self.nodes, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use spirv_std::glam::vec3;

    use super::*;
    use crate::gpu;

    fn random_boxes(rng: &mut StdRng, n: usize) -> Vec<BoundingBox> {
        (0..n)
            .map(|_| {
                let min = vec3(
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(-50.0..50.0),
                    rng.gen_range(-50.0..50.0),
                );

                let size = Vec3::splat(rng.gen_range(0.1..2.0));

                BoundingBox::new(min, min + size)
            })
            .collect()
    }

    fn build(boxes: &[BoundingBox]) -> Bvh {
        Bvh::build(
            boxes
                .iter()
                .enumerate()
                .map(|(id, bounds)| BvhPrimitive::new(id as u32, *bounds))
                .collect(),
        )
    }

    #[test]
    fn every_primitive_lands_in_exactly_one_leaf() {
        let mut rng = StdRng::seed_from_u64(1234);
        let boxes = random_boxes(&mut rng, 500);
        let target = build(&boxes);

        let mut seen = vec![0; boxes.len()];

        for node in target.nodes() {
            if let BvhNode::Leaf { first, count, .. } = node {
                for id in &target.primitives()[*first..*first + *count] {
                    seen[*id as usize] += 1;
                }
            }
        }

        assert!(seen.iter().all(|n| *n == 1));
        assert!(target.depth() <= gpu::BVH_STACK_SIZE);
    }

    #[test]
    fn nodes_enclose_their_children() {
        let mut rng = StdRng::seed_from_u64(4321);
        let boxes = random_boxes(&mut rng, 200);
        let target = build(&boxes);

        for (id, node) in target.nodes().iter().enumerate() {
            match *node {
                BvhNode::Internal {
                    bounds,
                    left,
                    right,
                } => {
                    assert!(left > id && right > id);

                    for child in [left, right] {
                        let child = target.nodes()[child].bounds();

                        assert!(bounds.min().cmple(child.min()).all());
                        assert!(bounds.max().cmpge(child.max()).all());
                    }
                }

                BvhNode::Leaf {
                    bounds,
                    first,
                    count,
                } => {
                    for id in &target.primitives()[first..first + count] {
                        let prim = boxes[*id as usize];

                        assert!(bounds.min().cmple(prim.min()).all());
                        assert!(bounds.max().cmpge(prim.max()).all());
                    }
                }
            }
        }
    }

    #[test]
    fn refit_matches_rebuild_bounds() {
        let mut rng = StdRng::seed_from_u64(99);
        let boxes = random_boxes(&mut rng, 100);
        let mut target = build(&boxes);

        let offset = vec3(3.0, -1.0, 7.0);

        let moved: Vec<_> = boxes
            .iter()
            .map(|bb| BoundingBox::new(bb.min() + offset, bb.max() + offset))
            .collect();

        target.refit(|id| moved[id as usize]);

        assert!(target
            .root_bounds()
            .abs_diff_eq(build(&moved).root_bounds(), 0.0001));
    }

    #[test]
    fn degenerate_input() {
        let boxes = vec![BoundingBox::new(Vec3::ZERO, Vec3::ONE); 40];
        let target = build(&boxes);

        assert_eq!(1, target.nodes().len());
        assert_eq!(1, target.depth());

        let target = build(&[]);

        assert!(target.is_empty());
        assert!(!target.root_bounds().is_set());
    }
}
