use std::collections::VecDeque;

use spirv_std::glam::UVec3;

use super::{Bvh, BvhNode, BvhPrimitive};
use crate::{gpu, Axis, BoundingBox};

const BINS: usize = 12;

/// Deepest tree the shaders are able to traverse without dropping nodes.
const MAX_DEPTH: usize = gpu::BVH_STACK_SIZE;

/// Builds a BVH using the binned surface area heuristic.
pub fn run(mut primitives: Vec<BvhPrimitive>) -> Bvh {
    if primitives.is_empty() {
        return Bvh::default();
    }

    let mut nodes = vec![BvhNode::Leaf {
        bounds: primitives.iter().map(|p| p.bounds).collect(),
        first: 0,
        count: primitives.len(),
    }];

    let mut queue = VecDeque::from_iter([(0, 1)]);

    while let Some((node_id, depth)) = queue.pop_front() {
        if depth >= MAX_DEPTH {
            continue;
        }

        let Some((left, right)) = balance(&nodes, &mut primitives, node_id)
        else {
            continue;
        };

        let left_id = nodes.len();
        let right_id = left_id + 1;

        nodes.push(left);
        nodes.push(right);

        nodes[node_id] = BvhNode::Internal {
            bounds: nodes[node_id].bounds(),
            left: left_id,
            right: right_id,
        };

        queue.push_back((left_id, depth + 1));
        queue.push_back((right_id, depth + 1));
    }

    Bvh {
        nodes,
        primitives: primitives.into_iter().map(|p| p.id).collect(),
    }
}

/// Splits given leaf in two, if that's cheaper than keeping it as-is.
fn balance(
    nodes: &[BvhNode],
    primitives: &mut [BvhPrimitive],
    node_id: usize,
) -> Option<(BvhNode, BvhNode)> {
    let node = nodes[node_id];

    let BvhNode::Leaf { first, count, .. } = node else {
        unreachable!();
    };

    let plane = find_splitting_plane(&primitives[first..first + count])?;

    if plane.split_cost >= node.sah_cost() {
        return None;
    }

    split(&mut primitives[first..first + count], first, plane)
}

fn find_splitting_plane(
    primitives: &[BvhPrimitive],
) -> Option<SplittingPlane> {
    if primitives.len() <= 1 {
        return None;
    }

    let centroid_bb: BoundingBox =
        primitives.iter().map(|primitive| primitive.center).collect();

    if centroid_bb.extent().max_element() <= 0.0 {
        return None;
    }

    let mut bins = [[Bin::default(); BINS]; 3];
    let scale = (BINS as f32) / centroid_bb.extent();

    for primitive in primitives {
        let bin_id = scale * (primitive.center - centroid_bb.min());
        let bin_id = bin_id.as_uvec3().min(UVec3::splat((BINS as u32) - 1));

        for axis in 0..3 {
            let bin = &mut bins[axis][bin_id[axis] as usize];

            bin.count += 1;
            bin.bounds += primitive.bounds;
        }
    }

    // ---

    let mut left_areas = [[0.0; BINS - 1]; 3];
    let mut right_areas = [[0.0; BINS - 1]; 3];
    let mut left_counts = [[0; BINS - 1]; 3];
    let mut right_counts = [[0; BINS - 1]; 3];

    for axis in 0..3 {
        let mut left_bb = BoundingBox::default();
        let mut right_bb = BoundingBox::default();
        let mut left_count = 0;
        let mut right_count = 0;

        for i in 0..(BINS - 1) {
            let left_bin = bins[axis][i];

            left_count += left_bin.count;
            left_counts[axis][i] = left_count;

            if left_bin.bounds.is_set() {
                left_bb += left_bin.bounds;
            }

            left_areas[axis][i] = left_bb.half_area();

            // ---

            let right_bin = bins[axis][BINS - 1 - i];

            right_count += right_bin.count;
            right_counts[axis][BINS - 2 - i] = right_count;

            if right_bin.bounds.is_set() {
                right_bb += right_bin.bounds;
            }

            right_areas[axis][BINS - 2 - i] = right_bb.half_area();
        }
    }

    // ---

    let mut best: Option<SplittingPlane> = None;
    let scale = centroid_bb.extent() / (BINS as f32);

    for axis in Axis::ALL {
        let a = axis as usize;

        if scale[axis] <= 0.0 {
            continue;
        }

        for i in 0..(BINS - 1) {
            // Planes with nothing on one side don't split anything
            if left_counts[a][i] == 0 || right_counts[a][i] == 0 {
                continue;
            }

            let split_cost = (left_counts[a][i] as f32) * left_areas[a][i]
                + (right_counts[a][i] as f32) * right_areas[a][i];

            let is_better =
                best.map_or(true, |best| split_cost < best.split_cost);

            if is_better {
                best = Some(SplittingPlane {
                    split_by: axis,
                    split_at: centroid_bb.min()[axis]
                        + scale[axis] * ((i + 1) as f32),
                    split_cost,
                });
            }
        }
    }

    best
}

/// Partitions primitives around given plane; `offset` is the position of
/// `primitives` within the whole primitive list.
fn split(
    primitives: &mut [BvhPrimitive],
    offset: usize,
    plane: SplittingPlane,
) -> Option<(BvhNode, BvhNode)> {
    let mut left_idx = 0;
    let mut right_idx = primitives.len();
    let mut left_bounds = BoundingBox::default();
    let mut right_bounds = BoundingBox::default();

    while left_idx < right_idx {
        let primitive = primitives[left_idx];

        if primitive.center[plane.split_by] < plane.split_at {
            left_idx += 1;
            left_bounds += primitive.bounds;
        } else {
            right_idx -= 1;
            right_bounds += primitive.bounds;
            primitives.swap(left_idx, right_idx);
        }
    }

    if left_idx == 0 || left_idx == primitives.len() {
        return None;
    }

    let left = BvhNode::Leaf {
        bounds: left_bounds,
        first: offset,
        count: left_idx,
    };

    let right = BvhNode::Leaf {
        bounds: right_bounds,
        first: offset + left_idx,
        count: primitives.len() - left_idx,
    };

    Some((left, right))
}

#[derive(Clone, Copy, Debug)]
struct SplittingPlane {
    split_by: Axis,
    split_at: f32,
    split_cost: f32,
}

#[derive(Clone, Copy, Default, Debug)]
struct Bin {
    bounds: BoundingBox,
    count: u32,
}
