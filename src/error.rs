//! Error types surfaced by the boundary-crossing primitives and by geometry
//! validation.
//!
//! The plain primitives have no failure mode and never construct these.

use core::fmt;

use thiserror::Error;

use crate::geometry::ArchRevision;

/// Direction of an access on the unprivileged side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Read => f.write_str("read"),
            AccessKind::Write => f.write_str("write"),
        }
    }
}

/// A load or store on the unprivileged side was refused by the platform.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{kind} fault at {addr:#x}")]
pub struct AccessFault {
    /// First address of the faulting access.
    pub addr: usize,
    pub kind: AccessKind,
}

impl AccessFault {
    #[inline]
    pub const fn new(addr: usize, kind: AccessKind) -> Self {
        Self { addr, kind }
    }
}

/// A boundary-crossing copy stopped early.
///
/// Bytes `[0, len - remaining)` of the destination hold the source bytes;
/// the byte at `len - remaining` was the first one the platform refused.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("partial copy: {remaining} of {len} bytes not transferred ({fault})")]
pub struct PartialCopy {
    pub len: usize,
    pub remaining: usize,
    pub fault: AccessFault,
}

impl PartialCopy {
    /// Number of bytes that reached the destination.
    #[inline]
    pub const fn transferred(&self) -> usize {
        self.len - self.remaining
    }
}

/// Rejected cache geometry or platform combination.
///
/// Build profiles are checked in a const context, so for them this is a
/// compile error rather than a runtime value.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
    #[error("unsupported cache line size: {0} bytes")]
    UnsupportedLineSize(usize),

    #[error("prefetch distance must be at least one line")]
    ZeroPrefetchDistance,

    #[error("prefetch distance of {0} lines exceeds the supported maximum")]
    PrefetchDistanceTooLarge(usize),

    #[error("prefetch hints are not available on {0:?}")]
    PrefetchUnsupported(ArchRevision),

    #[error("wide vector transfers are not available on {0:?}")]
    WideVectorUnsupported(ArchRevision),

    #[error("dual instruction encoding is not available on {0:?}")]
    Thumb2Unsupported(ArchRevision),
}
