/// Number of invocations in a single workgroup of the reduction pass.
pub const REDUCE_WORKGROUP_SIZE: u32 = 64;

/// Returns how many workgroups are needed to reduce `len` items in a single
/// pass (each workgroup produces one partial sum).
pub fn reduce_group_count(len: u32) -> u32 {
    (len + REDUCE_WORKGROUP_SIZE - 1) / REDUCE_WORKGROUP_SIZE
}

/// Performs one level of the tree-reduction over workgroup's shared memory.
///
/// Invocations only write below `stride` and only read at or above it, so
/// all invocations of a level can run at once.
pub fn reduce_step(shared: &mut [u32; 64], local_idx: u32, stride: u32) {
    if local_idx < stride {
        shared[local_idx as usize] += shared[(local_idx + stride) as usize];
    }
}

/// Mirrors the GPU reduction on the CPU: partial sums of 64-item groups are
/// reduced again and again until there's just one item left.
#[cfg(not(target_arch = "spirv"))]
pub fn reduce_sum(values: &[u32]) -> u32 {
    let mut values = values.to_vec();

    loop {
        let partials: Vec<u32> = values
            .chunks(REDUCE_WORKGROUP_SIZE as usize)
            .map(|chunk| {
                let mut shared = [0; 64];

                shared[..chunk.len()].copy_from_slice(chunk);

                let mut stride = REDUCE_WORKGROUP_SIZE / 2;

                while stride > 0 {
                    for local_idx in 0..REDUCE_WORKGROUP_SIZE {
                        reduce_step(&mut shared, local_idx, stride);
                    }

                    stride /= 2;
                }

                shared[0]
            })
            .collect();

        match partials.len() {
            0 => return 0,
            1 => return partials[0],
            _ => values = partials,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_count() {
        assert_eq!(0, reduce_group_count(0));
        assert_eq!(1, reduce_group_count(1));
        assert_eq!(1, reduce_group_count(64));
        assert_eq!(2, reduce_group_count(65));
    }

    #[test]
    fn matches_sequential_sum() {
        for len in [0, 1, 63, 64, 65, 4096, 1920 * 1080 / 7] {
            let mask: Vec<u32> = (0..len)
                .map(|i: u32| (i.wrapping_mul(2654435761) >> 29) % 3)
                .collect();

            assert_eq!(
                mask.iter().sum::<u32>(),
                reduce_sum(&mask),
                "len={len}"
            );
        }
    }
}
