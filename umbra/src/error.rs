use thiserror::Error;

use crate::{GeometryId, InstanceId, MaterialId};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Validation error, out-of-memory or device loss reported by wgpu.
    #[error("device error: {0}")]
    Device(String),

    #[error(
        "out of memory for `{what}`: requested {requested} bytes, but only \
         {available} are available"
    )]
    OutOfMemory {
        what: String,
        requested: usize,
        available: usize,
    },

    #[error("too many {what}: limit is {limit}, requested {requested}")]
    CapacityExceeded {
        what: &'static str,
        limit: usize,
        requested: usize,
    },

    #[error("unknown geometry: {0:?}")]
    UnknownGeometry(GeometryId),

    #[error("unknown material: {0:?}")]
    UnknownMaterial(MaterialId),

    #[error("unknown instance: {0:?}")]
    UnknownInstance(InstanceId),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("pass `{pass}` reads `{resource}`, which nothing has written")]
    InvalidAccess {
        pass: &'static str,
        resource: &'static str,
    },

    #[error("shader tables are out of sync with instances: {0}")]
    ShaderTableMismatch(String),
}

impl Error {
    /// Returns whether this error invalidates the device (and thus all of
    /// the resources allocated on it).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Device(_) | Self::OutOfMemory { .. })
    }
}
