use std::ops::{Deref, DerefMut};
use std::{any, mem};

use bytemuck::Pod;

use super::Bindable;
use crate::{Error, Result};

/// Storage buffer that exists both on the host machine and the GPU.
///
/// This kind of storage buffer should be used for data structures such as BVH
/// that need to be accessed both from the host machine and the GPU; it's
/// allocated both in RAM and VRAM, and uses [`DerefMut`] to track whether it's
/// been modified recently.
///
/// The VRAM part has a fixed capacity; flushing more data than that fails
/// loudly instead of truncating it.
#[derive(Debug)]
pub struct MappedStorageBuffer<T> {
    label: String,
    buffer: wgpu::Buffer,
    capacity: usize,
    data: T,
    dirty: bool,
}

impl<T> MappedStorageBuffer<T>
where
    T: StorageBufferable,
{
    pub fn new(
        device: &wgpu::Device,
        label: impl AsRef<str>,
        capacity: usize,
        data: T,
    ) -> Self {
        let label = label.as_ref();

        // wgpu refuses to bind empty buffers
        let capacity = pad_size(capacity.max(16));

        log::info!(
            "Allocating storage buffer `{label}`; ty={}, size={capacity}",
            any::type_name::<T>(),
        );

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::STORAGE,
            size: capacity as _,
            mapped_at_creation: false,
        });

        Self {
            label: label.to_owned(),
            buffer,
            capacity,
            data,
            dirty: true,
        }
    }

    pub fn new_default(
        device: &wgpu::Device,
        label: impl AsRef<str>,
        capacity: usize,
    ) -> Self
    where
        T: Default,
    {
        Self::new(device, label, capacity, Default::default())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Uploads the data, if it's been modified since the last flush.
    pub fn flush(&mut self, queue: &wgpu::Queue) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let data = self.data.data();

        if data.len() > self.capacity {
            return Err(Error::OutOfMemory {
                what: self.label.clone(),
                requested: data.len(),
                available: self.capacity,
            });
        }

        if !data.is_empty() {
            queue.write_buffer(&self.buffer, 0, data);
        }

        self.dirty = false;

        Ok(())
    }
}

impl<T> Deref for MappedStorageBuffer<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> DerefMut for MappedStorageBuffer<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.dirty = true;

        &mut self.data
    }
}

impl<T> Bindable for MappedStorageBuffer<T> {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)> {
        let layout = wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT
                | wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage {
                    // TODO should say `read_only: true`, but rust-gpu is not
                    //      able to emit appropriate attributes yet, causing
                    //      wgpu to reject the shader later
                    read_only: false,
                },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let resource = self.buffer.as_entire_binding();

        vec![(layout, resource)]
    }
}

pub trait StorageBufferable {
    fn data(&self) -> &[u8];
}

impl<T> StorageBufferable for Vec<T>
where
    T: Pod,
{
    fn data(&self) -> &[u8] {
        bytemuck::cast_slice(self)
    }
}

/// Rounds size up to the alignment wgpu expects from buffers.
pub fn pad_size(size: usize) -> usize {
    let align = mem::size_of::<[f32; 4]>();

    (size + align - 1) / align * align
}
