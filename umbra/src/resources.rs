use std::fmt;

use fxhash::FxHashMap;
use log::debug;

use crate::{Error, Result};

/// Resource whose access state is tracked by [`ResourceTracker`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(&'static str);

impl ResourceId {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccessState {
    /// Nothing has written the resource yet - its content is garbage.
    #[default]
    Undefined,
    Writable,
    Readable,
}

/// Transition recorded between two passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Barrier {
    pub resource: ResourceId,
    pub from: AccessState,
    pub to: AccessState,

    /// Pass that last accessed the resource.
    pub after: &'static str,

    /// Pass that's about to access the resource.
    pub before: &'static str,
}

/// Tracks the access state of GPU resources as passes get scheduled.
///
/// Every pass declares what it reads and writes, in execution order; the
/// tracker then makes sure each read is preceded by a write and records the
/// barrier in-between. wgpu inserts the actual pipeline barriers on its own,
/// so the tracker's job is to reject orderings that would make a pass read
/// stale or uninitialized data.
#[derive(Debug, Default)]
pub struct ResourceTracker {
    states: FxHashMap<ResourceId, (AccessState, &'static str)>,
    barriers: Vec<Barrier>,
}

impl ResourceTracker {
    pub fn state(&self, resource: ResourceId) -> AccessState {
        self.states
            .get(&resource)
            .map(|(state, _)| *state)
            .unwrap_or_default()
    }

    pub fn barriers(&self) -> &[Barrier] {
        &self.barriers
    }

    /// Declares that `pass` writes `resource`.
    pub fn write(&mut self, pass: &'static str, resource: ResourceId) {
        let (state, last_pass) = self
            .states
            .entry(resource)
            .or_insert((AccessState::Undefined, pass));

        if *state == AccessState::Readable {
            self.barriers.push(Barrier {
                resource,
                from: AccessState::Readable,
                to: AccessState::Writable,
                after: *last_pass,
                before: pass,
            });
        }

        *state = AccessState::Writable;
        *last_pass = pass;
    }

    /// Declares that `pass` reads `resource`.
    pub fn read(
        &mut self,
        pass: &'static str,
        resource: ResourceId,
    ) -> Result<()> {
        let Some((state, last_pass)) = self.states.get_mut(&resource) else {
            return Err(Error::InvalidAccess {
                pass,
                resource: resource.name(),
            });
        };

        match state {
            AccessState::Undefined => {
                return Err(Error::InvalidAccess {
                    pass,
                    resource: resource.name(),
                });
            }

            AccessState::Writable => {
                self.barriers.push(Barrier {
                    resource,
                    from: AccessState::Writable,
                    to: AccessState::Readable,
                    after: *last_pass,
                    before: pass,
                });

                *state = AccessState::Readable;
            }

            AccessState::Readable => {
                //
            }
        }

        *last_pass = pass;

        Ok(())
    }

    /// Declares a whole pass at once: reads go first, then writes.
    pub fn pass(
        &mut self,
        pass: &'static str,
        reads: &[ResourceId],
        writes: &[ResourceId],
    ) -> Result<()> {
        for resource in reads {
            self.read(pass, *resource)?;
        }

        for resource in writes {
            self.write(pass, *resource);
        }

        Ok(())
    }

    pub fn log_barriers(&self) {
        for barrier in &self.barriers {
            debug!(
                "Barrier: `{}` {:?} -> {:?} ({} -> {})",
                barrier.resource,
                barrier.from,
                barrier.to,
                barrier.after,
                barrier.before,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GBUFFER: ResourceId = ResourceId::new("gbuffer");
    const AO: ResourceId = ResourceId::new("ao");

    #[test]
    fn rejects_reading_unwritten_resources() {
        let mut target = ResourceTracker::default();

        let err = target.read("compose", AO).unwrap_err();

        assert!(matches!(
            err,
            Error::InvalidAccess {
                pass: "compose",
                resource: "ao",
            }
        ));
    }

    #[test]
    fn records_barrier_per_write_read_pair() {
        let mut target = ResourceTracker::default();

        target.pass("gbuffer", &[], &[GBUFFER]).unwrap();
        target.pass("ambient_occlusion", &[GBUFFER], &[AO]).unwrap();
        target.pass("compose", &[GBUFFER, AO], &[]).unwrap();

        assert_eq!(
            vec![
                Barrier {
                    resource: GBUFFER,
                    from: AccessState::Writable,
                    to: AccessState::Readable,
                    after: "gbuffer",
                    before: "ambient_occlusion",
                },
                Barrier {
                    resource: AO,
                    from: AccessState::Writable,
                    to: AccessState::Readable,
                    after: "ambient_occlusion",
                    before: "compose",
                },
            ],
            target.barriers(),
        );

        assert_eq!(AccessState::Readable, target.state(GBUFFER));
    }

    #[test]
    fn records_barrier_before_overwriting() {
        let mut target = ResourceTracker::default();

        target.pass("a", &[], &[AO]).unwrap();
        target.pass("b", &[AO], &[]).unwrap();
        target.pass("c", &[], &[AO]).unwrap();

        let last = target.barriers().last().copied().unwrap();

        assert_eq!(AccessState::Readable, last.from);
        assert_eq!(AccessState::Writable, last.to);
        assert_eq!(("b", "c"), (last.after, last.before));
        assert_eq!(AccessState::Writable, target.state(AO));
    }
}
