//! In-kernel forward copy.
#![allow(unsafe_code)]

use crate::access::Direct;
use crate::dispatch::COPY;
use crate::geometry::Platform;
use crate::merge;
use crate::prefetch::Pld;
use crate::transfer::Transfer;

/// Forward copy tuned for the active platform.
///
/// Small copies take a byte loop or a prefetch-free word ladder; larger ones
/// run the alignment, prefetch, bulk and tail pipeline.
///
/// # Safety
///
/// - `dest` must be valid for writes and `src` for reads of `n` bytes
/// - The regions must not overlap, except that `dest == src` is allowed
#[inline]
pub unsafe fn copy(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    // SAFETY: forwarded caller contract.
    unsafe { copy_for(Platform::active(), dest, src, n) }
}

/// [`copy`] for an explicit platform.
///
/// # Safety
///
/// Same as [`copy`].
pub unsafe fn copy_for(platform: &Platform, dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    let mut t = Transfer::new(dest, src, n);
    // SAFETY: forwarded caller contract; `Direct` never faults.
    let Ok(()) = unsafe { merge::copy(&mut t, &Direct, Pld, &platform.geometry, &COPY) };
    dest
}
