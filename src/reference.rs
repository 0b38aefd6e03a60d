//! Baseline routines, kept for benchmarking against the tuned ones.
//!
//! Same observable behaviour as [`crate::memcpy`], [`crate::memset`] and
//! [`crate::page`]: no fast-aligned tier, no write alignment, and a plain
//! word loop for pages.
#![allow(unsafe_code)]

use crate::access::{Direct, Word, splat};
use crate::dispatch::{BASELINE_COPY, BASELINE_FILL};
use crate::geometry::Platform;
use crate::memset;
use crate::merge;
use crate::page::PAGE_SIZE;
use crate::prefetch::{NoPrefetch, Pld};
use crate::transfer::Transfer;

/// # Safety
///
/// Same as [`crate::memcpy::copy`].
pub unsafe fn copy_orig(dest: *mut u8, src: *const u8, n: usize) -> *mut u8 {
    // SAFETY: forwarded caller contract.
    unsafe { copy_orig_for(Platform::active(), dest, src, n) }
}

/// # Safety
///
/// Same as [`crate::memcpy::copy`].
pub unsafe fn copy_orig_for(
    platform: &Platform,
    dest: *mut u8,
    src: *const u8,
    n: usize,
) -> *mut u8 {
    let mut t = Transfer::new(dest, src, n);
    // SAFETY: forwarded caller contract; `Direct` never faults.
    let Ok(()) =
        unsafe { merge::copy(&mut t, &Direct, Pld, &platform.geometry, &BASELINE_COPY) };
    dest
}

/// # Safety
///
/// Same as [`crate::memset::fill`].
pub unsafe fn fill_orig(dest: *mut u8, value: u8, n: usize) -> *mut u8 {
    // SAFETY: forwarded caller contract.
    unsafe { fill_orig_for(Platform::active(), dest, value, n) }
}

/// # Safety
///
/// Same as [`crate::memset::fill`].
pub unsafe fn fill_orig_for(platform: &Platform, dest: *mut u8, value: u8, n: usize) -> *mut u8 {
    // SAFETY: forwarded caller contract.
    unsafe { memset::set(platform, dest, splat(value), n, &BASELINE_FILL, NoPrefetch) };
    dest
}

/// # Safety
///
/// Same as [`crate::memset::zero`].
pub unsafe fn zero_orig(dest: *mut u8, n: usize) -> *mut u8 {
    // SAFETY: forwarded caller contract.
    unsafe { fill_orig(dest, 0, n) }
}

/// # Safety
///
/// Same as [`crate::page::copy_page`].
pub unsafe fn copy_page_orig(dest: *mut u8, src: *const u8) {
    let src = src.cast::<Word>();
    let dest = dest.cast::<Word>();
    for i in 0..PAGE_SIZE / size_of::<Word>() {
        // SAFETY: both pages are aligned and `PAGE_SIZE` long.
        unsafe { dest.add(i).write(src.add(i).read()) };
    }
}
