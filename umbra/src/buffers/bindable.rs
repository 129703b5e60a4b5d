use crate::FRAME_COUNT;

/// Object that can be attached to a pipeline, e.g. a buffer or a texture
pub trait Bindable {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(wgpu::BindGroupLayoutEntry, wgpu::BindingResource)>;
}

/// Object that can be attached to a pipeline and exists in [`FRAME_COUNT`]
/// versions, one per frame in flight
pub trait FrameBindable {
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(
        wgpu::BindGroupLayoutEntry,
        [wgpu::BindingResource; FRAME_COUNT],
    )>;
}

impl<T> FrameBindable for T
where
    T: Bindable,
{
    fn bind(
        &self,
        binding: u32,
    ) -> Vec<(
        wgpu::BindGroupLayoutEntry,
        [wgpu::BindingResource; FRAME_COUNT],
    )> {
        T::bind(self, binding)
            .into_iter()
            .map(|(layout, resource)| {
                (layout, [(); FRAME_COUNT].map(|_| resource.clone()))
            })
            .collect()
    }
}
