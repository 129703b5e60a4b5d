use spirv_std::glam::Vec4;

use super::{Bvh, BvhNode};
use crate::gpu;

/// Serializes given tree depth-first, so that each internal node is
/// immediately followed by its left child.
pub fn run(
    bvh: &Bvh,
    out: &mut Vec<Vec4>,
    leaf_kind: u32,
    leaf_payload: &dyn Fn(usize) -> u32,
) -> u32 {
    let root_ptr = out.len() as u32;

    if !bvh.nodes.is_empty() {
        out.reserve(bvh.nodes.len() * (gpu::BVH_NODE_SIZE as usize));
        walk(bvh, out, 0, leaf_kind, leaf_payload);
    }

    root_ptr
}

fn walk(
    bvh: &Bvh,
    out: &mut Vec<Vec4>,
    node_id: usize,
    leaf_kind: u32,
    leaf_payload: &dyn Fn(usize) -> u32,
) {
    let ptr = out.len();

    out.push(Default::default());
    out.push(Default::default());

    let (kind, count, payload) = match bvh.nodes[node_id] {
        BvhNode::Internal { left, right, .. } => {
            walk(bvh, out, left, leaf_kind, leaf_payload);

            let right_ptr = out.len() as u32;

            walk(bvh, out, right, leaf_kind, leaf_payload);

            (gpu::BVH_NODE_INTERNAL, 0, right_ptr)
        }

        BvhNode::Leaf { first, count, .. } => {
            (leaf_kind, count as u32, leaf_payload(first))
        }
    };

    let bounds = bvh.nodes[node_id].bounds();

    out[ptr] = bounds.min().extend(gpu::encode_node_info(kind, count));
    out[ptr + 1] = bounds.max().extend(f32::from_bits(payload));
}
