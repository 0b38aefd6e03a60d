//! fastkmem: cache-tuned bulk memory transfer for 32-bit ARM-family kernels.
//!
//! Forward copy, fill, zero-fill and whole-page copy, plus fault-tolerant
//! copies across the privileged/unprivileged boundary that report exactly
//! how many bytes were left behind.

pub mod access;
pub mod dispatch;
pub mod error;
pub mod geometry;
pub mod mem;
pub mod memcpy;
pub mod memset;
mod merge;
pub mod page;
pub mod prefetch;
pub mod reference;
mod transfer;
pub mod usercopy;

pub use error::{AccessFault, AccessKind, GeometryError, PartialCopy};
pub use geometry::{ArchRevision, CacheGeometry, Encoding, LineSize, Platform, WriteAlign};
pub use memcpy::copy;
pub use memset::{fill, zero};
pub use page::{PAGE_SIZE, Page, copy_page};
pub use usercopy::{copy_from_boundary, copy_to_boundary};
