use spirv_std::arch::workgroup_memory_barrier_with_group_sync;
use umbra_gpu::prelude::*;

#[spirv(compute(threads(64)))]
pub fn main(
    #[spirv(local_invocation_index)] local_idx: u32,
    #[spirv(workgroup_id)] group_id: UVec3,
    #[spirv(num_workgroups)] group_count: UVec3,
    #[spirv(push_constant)] params: &ReduceSumPassParams,
    #[spirv(workgroup)] shared: &mut [u32; 64],
    #[spirv(descriptor_set = 0, binding = 0, storage_buffer)] input: &[u32],
    #[spirv(descriptor_set = 0, binding = 1, storage_buffer)]
    output: &mut [u32],
) {
    // Large inputs are dispatched as a 2D grid of workgroups
    let group_idx = group_id.y * group_count.x + group_id.x;
    let idx = group_idx * REDUCE_WORKGROUP_SIZE + local_idx;

    shared[local_idx as usize] = if idx < params.len {
        input[idx as usize]
    } else {
        0
    };

    unsafe {
        workgroup_memory_barrier_with_group_sync();
    }

    let mut stride = REDUCE_WORKGROUP_SIZE / 2;

    while stride > 0 {
        reduce_step(shared, local_idx, stride);

        unsafe {
            workgroup_memory_barrier_with_group_sync();
        }

        stride /= 2;
    }

    if local_idx == 0 && group_idx < reduce_group_count(params.len) {
        output[group_idx as usize] = shared[0];
    }
}
