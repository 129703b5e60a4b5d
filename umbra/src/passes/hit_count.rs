use log::trace;
use spirv_std::glam::{uvec2, UVec2};

use crate::passes::ComputePass;
use crate::{
    gpu, FrameSlot, HitCategory, ReadbackBuffer, Schedule, Shaders, Stats,
    UnmappedStorageBuffer, ViewBuffers,
};

/// Maximum number of workgroups along a single dispatch dimension.
const MAX_GROUPS_PER_DIM: u32 = 65535;

/// Counts how many rays hit something, by reducing the per-pixel hit masks
/// written by the raytracing passes into a single number that's then read
/// back asynchronously.
#[derive(Debug)]
pub struct HitCountPass {
    counters: Vec<HitCounter>,
}

#[derive(Debug)]
struct HitCounter {
    category: HitCategory,
    levels: Vec<(ComputePass<gpu::ReduceSumPassParams>, u32)>,
    readback: ReadbackBuffer,
    scratch: [UnmappedStorageBuffer; 2],
}

impl HitCountPass {
    pub fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        schedule: &Schedule,
        view: &ViewBuffers,
    ) -> Self {
        let res = schedule.resolutions();

        let counters = HitCategory::ALL
            .into_iter()
            .map(|category| {
                let (input, len) = match category {
                    HitCategory::Camera => {
                        (view.camera_ray_hits(), res.render_pixels())
                    }
                    HitCategory::AmbientOcclusion => {
                        (view.ao_ray_hits(), res.ao_pixels())
                    }
                };

                HitCounter::new(device, shaders, category, input, len)
            })
            .collect();

        Self { counters }
    }

    /// Reduces the hit mask of given category and schedules copying the
    /// result into the readback buffer.
    ///
    /// If the previous readback is still in flight, the reduction is
    /// skipped altogether.
    pub fn run(
        &self,
        slot: FrameSlot,
        encoder: &mut wgpu::CommandEncoder,
        category: HitCategory,
    ) {
        let Some(counter) =
            self.counters.iter().find(|c| c.category == category)
        else {
            return;
        };

        counter.run(slot, encoder);
    }

    /// Requests mapping the readback buffers; must be called after the
    /// frame's commands have been submitted.
    pub fn map(&self) {
        for counter in &self.counters {
            counter.readback.map();
        }
    }

    /// Feeds whichever counts have already arrived into `stats`.
    pub fn read(&self, stats: &mut Stats) {
        for counter in &self.counters {
            if let Some(data) = counter.readback.try_read() {
                let hits = data.first().copied().unwrap_or(0);

                trace!("Read back {} hits: {hits}", counter.category.name());

                stats.record_hits(counter.category, hits);
            }
        }
    }
}

impl HitCounter {
    fn new(
        device: &wgpu::Device,
        shaders: &Shaders,
        category: HitCategory,
        input: &UnmappedStorageBuffer,
        len: u32,
    ) -> Self {
        let name = category.name();
        let scratch_size = (gpu::reduce_group_count(len).max(1) as usize) * 4;

        let scratch = [0, 1].map(|idx| {
            UnmappedStorageBuffer::new(
                device,
                format!("umbra_{name}_hit_count_{idx}"),
                scratch_size,
            )
        });

        let levels = reduction_levels(len)
            .into_iter()
            .enumerate()
            .map(|(level, len)| {
                let input = if level == 0 {
                    input
                } else {
                    &scratch[(level - 1) % 2]
                };

                let output = &scratch[level % 2];

                let pass = ComputePass::<gpu::ReduceSumPassParams>::builder(
                    format!("count_{name}_hits"),
                )
                .bind([&input.bind_readable(), &output.bind_writable()])
                .build(device, &shaders.reduce_sum);

                (pass, len)
            })
            .collect::<Vec<_>>();

        let readback = ReadbackBuffer::new(
            device,
            format!("umbra_{name}_hit_count_readback"),
            16,
        );

        Self {
            category,
            levels,
            readback,
            scratch,
        }
    }

    fn run(&self, slot: FrameSlot, encoder: &mut wgpu::CommandEncoder) {
        let Some(last) = self.levels.len().checked_sub(1) else {
            return;
        };

        // Previous result hasn't been read yet
        if !self.readback.is_idle() {
            return;
        }

        for &(ref pass, len) in &self.levels {
            let groups = dispatch_size(gpu::reduce_group_count(len));

            pass.run(slot, encoder, groups, gpu::ReduceSumPassParams { len });
        }

        self.readback.copy_from(encoder, &self.scratch[last % 2]);
    }
}

/// Returns lengths of the inputs of consecutive reduction levels; the last
/// level produces a single value.
fn reduction_levels(len: u32) -> Vec<u32> {
    let mut levels = vec![len.max(1)];

    while let Some(&len) = levels.last() {
        let groups = gpu::reduce_group_count(len);

        if groups <= 1 {
            break;
        }

        levels.push(groups);
    }

    levels
}

/// Spreads workgroups over a 2D grid, since a single dimension can't go
/// beyond [`MAX_GROUPS_PER_DIM`].
fn dispatch_size(groups: u32) -> UVec2 {
    let x = groups.clamp(1, MAX_GROUPS_PER_DIM);

    uvec2(x, (groups + x - 1) / x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels() {
        assert_eq!(vec![1], reduction_levels(0));
        assert_eq!(vec![64], reduction_levels(64));
        assert_eq!(vec![65, 2], reduction_levels(65));

        assert_eq!(
            vec![1920 * 1080, 32400, 507, 8],
            reduction_levels(1920 * 1080),
        );
    }

    #[test]
    fn dispatch() {
        assert_eq!(uvec2(1, 1), dispatch_size(1));
        assert_eq!(uvec2(32400, 1), dispatch_size(32400));
        assert_eq!(uvec2(65535, 2), dispatch_size(65536));
    }

    #[test]
    fn levels_match_cpu_reduction() {
        let mask: Vec<u32> = (0..10_000).map(|i| (i % 3 == 0) as u32).collect();
        let mut values = mask.clone();

        for len in reduction_levels(mask.len() as u32) {
            assert_eq!(len as usize, values.len());

            values = values
                .chunks(gpu::REDUCE_WORKGROUP_SIZE as usize)
                .map(|chunk| chunk.iter().sum())
                .collect();
        }

        assert_eq!(vec![gpu::reduce_sum(&mask)], values);
    }
}
