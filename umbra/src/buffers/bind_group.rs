use log::debug;

use crate::{FrameBindable, FrameSlot, FRAME_COUNT};

/// Bind group that exists in one version per frame in flight.
///
/// Versions differ only for resources that are themselves per-frame (see
/// [`crate::PerFrame`]); everything else is bound the same way into each
/// version.
#[derive(Debug)]
pub struct BindGroup {
    bind_groups: [wgpu::BindGroup; FRAME_COUNT],
    bind_group_layout: wgpu::BindGroupLayout,
}

impl BindGroup {
    pub fn builder<'ctx>(label: impl ToString) -> BindGroupBuilder<'ctx> {
        BindGroupBuilder {
            label: label.to_string(),
            layouts: Default::default(),
            resources: Default::default(),
        }
    }

    pub fn get(&self, slot: FrameSlot) -> &wgpu::BindGroup {
        &self.bind_groups[slot.index()]
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }
}

pub struct BindGroupBuilder<'a> {
    label: String,
    layouts: Vec<wgpu::BindGroupLayoutEntry>,
    resources: Vec<[wgpu::BindingResource<'a>; FRAME_COUNT]>,
}

impl<'a> BindGroupBuilder<'a> {
    pub fn add(mut self, item: &'a dyn FrameBindable) -> Self {
        for (layout, resources) in item.bind(self.resources.len() as u32) {
            self.layouts.push(layout);
            self.resources.push(resources);
        }

        self
    }

    pub fn build(self, device: &wgpu::Device) -> BindGroup {
        let label = format!("umbra_{}", self.label);

        debug!("Building bind group: {label}");

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{label}_layout")),
                entries: &self.layouts,
            });

        let mut entries: [Vec<wgpu::BindGroupEntry>; FRAME_COUNT] =
            Default::default();

        for (binding, resources) in self.resources.into_iter().enumerate() {
            for (slot, resource) in resources.into_iter().enumerate() {
                entries[slot].push(wgpu::BindGroupEntry {
                    binding: binding as _,
                    resource,
                });
            }
        }

        let bind_groups = entries.map(|entries| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&label),
                layout: &bind_group_layout,
                entries: &entries,
            })
        });

        BindGroup {
            bind_groups,
            bind_group_layout,
        }
    }
}
