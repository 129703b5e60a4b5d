use crate::{Bindable, FrameBindable, FrameSlot, FRAME_COUNT};

/// Resource versioned per frame in flight.
///
/// The CPU only ever touches the version belonging to the slot it has just
/// acquired from [`crate::FrameResourcePool`], so it never overwrites data the
/// GPU might still be reading for an earlier frame.
#[derive(Debug)]
pub struct PerFrame<T> {
    items: [T; FRAME_COUNT],
}

impl<T> PerFrame<T> {
    pub fn new(mut f: impl FnMut(usize) -> T) -> Self {
        let mut idx = 0;

        Self {
            items: [(); FRAME_COUNT].map(|_| {
                idx += 1;
                f(idx - 1)
            }),
        }
    }

    pub fn get(&self, slot: FrameSlot) -> &T {
        &self.items[slot.index()]
    }

    pub fn get_mut(&mut self, slot: FrameSlot) -> &mut T {
        &mut self.items[slot.index()]
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }
}

impl<T> FrameBindable for PerFrame<T>
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
        let mut entries: Vec<_> = self.items[0]
            .bind(binding)
            .into_iter()
            .map(|(layout, resource)| (layout, vec![resource]))
            .collect();

        for item in &self.items[1..] {
            for (entry, (_, resource)) in
                entries.iter_mut().zip(item.bind(binding))
            {
                entry.1.push(resource);
            }
        }

        entries
            .into_iter()
            .filter_map(|(layout, resources)| {
                Some((layout, resources.try_into().ok()?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_indexed_by_slot() {
        let mut target = PerFrame::new(|idx| idx * 10);

        *target.get_mut(FrameSlot::new(1, 4)) += 1;

        assert_eq!(0, *target.get(FrameSlot::new(0, 3)));
        assert_eq!(11, *target.get(FrameSlot::new(1, 1)));
        assert_eq!(20, *target.get(FrameSlot::new(2, 2)));
    }
}
