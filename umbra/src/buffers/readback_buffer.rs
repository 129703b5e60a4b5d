use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use log::{info, warn};

use super::{pad_size, UnmappedStorageBuffer};

const IDLE: u8 = 0;
const COPIED: u8 = 1;
const MAPPING: u8 = 2;
const MAPPED: u8 = 3;

/// Host-visible buffer used to asynchronously read data back from the GPU.
///
/// Reading is a three-step process: [`Self::copy_from()`] records a copy into
/// the command stream, [`Self::map()`] requests mapping once that command
/// stream has been submitted, and finally [`Self::try_read()`] returns the
/// data once the GPU is done - usually a frame or two later.
#[derive(Debug)]
pub struct ReadbackBuffer {
    buffer: wgpu::Buffer,
    size: usize,
    state: Arc<AtomicU8>,
}

impl ReadbackBuffer {
    pub fn new(
        device: &wgpu::Device,
        label: impl AsRef<str>,
        size: usize,
    ) -> Self {
        let label = label.as_ref();
        let size = pad_size(size.max(16));

        info!("Allocating readback buffer `{label}`; size={size}");

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            size: size as _,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            size,
            state: Default::default(),
        }
    }

    /// Returns whether the buffer is ready to accept another copy.
    pub fn is_idle(&self) -> bool {
        self.state.load(Ordering::Acquire) == IDLE
    }

    /// Records a copy from given buffer, unless the previous readback is
    /// still in flight.
    pub fn copy_from(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        src: &UnmappedStorageBuffer,
    ) -> bool {
        if !self.is_idle() {
            return false;
        }

        let size = self.size.min(src.size());

        encoder.copy_buffer_to_buffer(
            src.buffer(),
            0,
            &self.buffer,
            0,
            size as _,
        );

        self.state.store(COPIED, Ordering::Release);

        true
    }

    /// Requests mapping; must be called after the copy has been submitted.
    pub fn map(&self) {
        let requested = self.state.compare_exchange(
            COPIED,
            MAPPING,
            Ordering::AcqRel,
            Ordering::Acquire,
        );

        if requested.is_err() {
            return;
        }

        let state = Arc::clone(&self.state);

        self.buffer
            .slice(..)
            .map_async(wgpu::MapMode::Read, move |result| match result {
                Ok(()) => state.store(MAPPED, Ordering::Release),
                Err(err) => {
                    warn!("Couldn't map readback buffer: {err}");
                    state.store(IDLE, Ordering::Release);
                }
            });
    }

    pub fn try_read(&self) -> Option<Vec<u32>> {
        if self.state.load(Ordering::Acquire) != MAPPED {
            return None;
        }

        let data = {
            let view = self.buffer.slice(..).get_mapped_range();

            bytemuck::cast_slice(&view).to_vec()
        };

        self.buffer.unmap();
        self.state.store(IDLE, Ordering::Release);

        Some(data)
    }
}
