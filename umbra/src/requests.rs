use log::debug;

use crate::Result;

/// Deferred operation requested by the application, handled during the next
/// [`crate::Pipeline::update()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Request {
    /// Re-uploads all of the geometry and rebuilds bottom-level structures.
    InitializeGeometry,

    /// Fully rebuilds both levels of acceleration structures.
    InitializeAccelerationStructures,

    /// Recreates window-size-dependent resources and passes, e.g. after
    /// changing [`crate::RendererConfig`].
    RecreateRaytracingResources,

    /// Regenerates ambient occlusion sample sets.
    RecreateAoSamples,

    /// Re-uploads scene constants and materials.
    InitializeScene,
}

/// Small ordered queue of [`Request`]s.
///
/// Requests are deduplicated and always drained in the order they're
/// declared in [`Request`] (geometry, acceleration structures, raytracing
/// resources, samples, scene), regardless of the order they were pushed in.
#[derive(Clone, Debug, Default)]
pub struct RequestQueue {
    pending: [bool; Request::COUNT],
}

impl Request {
    const COUNT: usize = 5;

    const ALL: [Self; Self::COUNT] = [
        Self::InitializeGeometry,
        Self::InitializeAccelerationStructures,
        Self::RecreateRaytracingResources,
        Self::RecreateAoSamples,
        Self::InitializeScene,
    ];
}

impl RequestQueue {
    pub fn push(&mut self, request: Request) {
        debug!("Request queued: {request:?}");

        self.pending[request as usize] = true;
    }

    pub fn contains(&self, request: Request) -> bool {
        self.pending[request as usize]
    }

    pub fn is_empty(&self) -> bool {
        !self.pending.iter().any(|pending| *pending)
    }

    /// Removes the pending request with the highest priority.
    pub fn pop(&mut self) -> Option<Request> {
        let request = Request::ALL
            .into_iter()
            .find(|request| self.pending[*request as usize])?;

        self.pending[request as usize] = false;

        Some(request)
    }

    /// Moves all of the requests pending in `other` into this queue.
    pub fn append(&mut self, other: &mut Self) {
        let other = std::mem::take(&mut other.pending);

        for (pending, other) in self.pending.iter_mut().zip(other) {
            *pending |= other;
        }
    }

    /// Handles pending requests one by one, in their priority order.
    ///
    /// When handling fails, the failed request (and everything queued after
    /// it) stays in the queue, so that it's retried during the next update.
    pub fn process(
        &mut self,
        mut handle: impl FnMut(Request) -> Result<()>,
    ) -> Result<()> {
        while let Some(request) = self.pop() {
            if let Err(err) = handle(request) {
                self.push(request);
                return Err(err);
            }
        }

        Ok(())
    }
}
