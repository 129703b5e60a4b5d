use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::trace;

/// Number of frames that can be in flight at once.
pub const FRAME_COUNT: usize = 3;

/// Frame-in-flight slot, as returned from
/// [`FrameResourcePool::acquire_slot()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSlot {
    index: usize,
    frame: u64,
}

impl FrameSlot {
    pub fn new(index: usize, frame: u64) -> Self {
        assert!(index < FRAME_COUNT);

        Self { index, frame }
    }

    /// Index of the per-frame resources this slot owns.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// Monotonic counter signaled by the GPU as it completes submitted work.
pub trait Fence {
    /// Returns the highest value signaled so far.
    fn completed(&self) -> u64;

    /// Blocks until `value` gets signaled.
    fn wait(&self, value: u64);
}

/// Host side of a GPU timeline: hands out fence values for submissions and
/// records which of them have completed.
#[derive(Debug, Default)]
pub struct GpuTimeline {
    completed: Arc<AtomicU64>,
    last_signaled: u64,
}

impl GpuTimeline {
    /// Returns a fence value that gets signaled once everything submitted to
    /// `queue` so far has completed.
    pub fn signal(&mut self, queue: &wgpu::Queue) -> u64 {
        self.last_signaled += 1;

        let value = self.last_signaled;
        let completed = Arc::clone(&self.completed);

        queue.on_submitted_work_done(move || {
            completed.fetch_max(value, Ordering::AcqRel);
        });

        value
    }

    pub fn last_signaled(&self) -> u64 {
        self.last_signaled
    }

    pub fn fence<'a>(&'a self, device: &'a wgpu::Device) -> GpuFence<'a> {
        GpuFence {
            timeline: self,
            device,
        }
    }
}

#[derive(Debug)]
pub struct GpuFence<'a> {
    timeline: &'a GpuTimeline,
    device: &'a wgpu::Device,
}

impl Fence for GpuFence<'_> {
    fn completed(&self) -> u64 {
        self.timeline.completed.load(Ordering::Acquire)
    }

    fn wait(&self, value: u64) {
        // Callbacks registered through `on_submitted_work_done()` get invoked
        // from within `poll()`
        self.device.poll(wgpu::Maintain::Poll);

        while self.completed() < value {
            self.device.poll(wgpu::Maintain::Wait);
        }
    }
}

/// Tracks which frame-in-flight slots are still in use by the GPU.
///
/// Each slot remembers the fence value signaled once the GPU is done with the
/// last frame submitted through it; acquiring the slot again blocks until that
/// value has been observed.
#[derive(Debug, Default)]
pub struct FrameResourcePool {
    fence_values: [u64; FRAME_COUNT],
}

impl FrameResourcePool {
    pub fn slot_index(frame: u64) -> usize {
        (frame % (FRAME_COUNT as u64)) as usize
    }

    /// Returns the slot for given frame, waiting for the GPU to finish with
    /// its previous use if necessary.
    pub fn acquire_slot(&self, frame: u64, fence: &impl Fence) -> FrameSlot {
        let index = Self::slot_index(frame);
        let required = self.fence_values[index];

        if fence.completed() < required {
            trace!(
                "Waiting for slot #{index}; frame={frame}, fence={required}"
            );

            fence.wait(required);
        }

        FrameSlot::new(index, frame)
    }

    /// Marks given slot as used by work that completes at `fence_value`.
    pub fn release_slot(&mut self, slot: FrameSlot, fence_value: u64) {
        self.fence_values[slot.index] = fence_value;
    }

    /// Blocks until the GPU is done with all of the slots, so that the
    /// resources they hold can be destroyed and recreated.
    pub fn recreate(&mut self, fence: &impl Fence) {
        let required = self.fence_values.iter().copied().max().unwrap_or(0);

        if fence.completed() < required {
            trace!("Waiting for GPU to become idle; fence={required}");

            fence.wait(required);
        }

        self.fence_values = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    /// Fence driven by a pretend GPU that completes submissions whenever the
    /// test says so.
    #[derive(Default)]
    struct FakeFence {
        completed: Cell<u64>,
        waits: RefCell<Vec<u64>>,
    }

    impl Fence for FakeFence {
        fn completed(&self) -> u64 {
            self.completed.get()
        }

        fn wait(&self, value: u64) {
            self.waits.borrow_mut().push(value);

            if self.completed.get() < value {
                self.completed.set(value);
            }
        }
    }

    #[test]
    fn slots_rotate() {
        let target = FrameResourcePool::default();
        let fence = FakeFence::default();

        let indices: Vec<_> = (0..7)
            .map(|frame| target.acquire_slot(frame, &fence).index())
            .collect();

        assert_eq!(vec![0, 1, 2, 0, 1, 2, 0], indices);
        assert!(fence.waits.borrow().is_empty());
    }

    #[test]
    fn reuse_waits_for_fence() {
        let mut target = FrameResourcePool::default();
        let fence = FakeFence::default();

        for frame in 0..3 {
            let slot = target.acquire_slot(frame, &fence);

            target.release_slot(slot, frame + 1);
        }

        // GPU has finished only the first frame
        fence.completed.set(1);

        target.acquire_slot(3, &fence);
        assert!(fence.waits.borrow().is_empty());

        target.acquire_slot(4, &fence);
        assert_eq!(vec![2], *fence.waits.borrow());
    }

    #[test]
    fn reuse_never_precedes_signal() {
        let mut rng = StdRng::seed_from_u64(1234);
        let mut target = FrameResourcePool::default();
        let fence = FakeFence::default();
        let mut submitted = 0;
        let mut last_use = [0; FRAME_COUNT];

        for frame in 0..1000 {
            // Pretend GPU makes arbitrary progress in the meantime
            let progress = rng.gen_range(0..=2);

            fence
                .completed
                .set((fence.completed.get() + progress).min(submitted));

            let slot = target.acquire_slot(frame, &fence);

            assert!(
                fence.completed() >= last_use[slot.index()],
                "frame {frame} reused slot #{} too early",
                slot.index(),
            );

            submitted += 1;
            last_use[slot.index()] = submitted;
            target.release_slot(slot, submitted);
        }
    }

    #[test]
    fn recreate_waits_for_all_slots() {
        let mut target = FrameResourcePool::default();
        let fence = FakeFence::default();

        for frame in 0..3 {
            let slot = target.acquire_slot(frame, &fence);

            target.release_slot(slot, 10 + frame);
        }

        target.recreate(&fence);

        assert_eq!(vec![12], *fence.waits.borrow());

        target.acquire_slot(3, &fence);
        assert_eq!(1, fence.waits.borrow().len());
    }
}
