//! Whole-page copy.
#![allow(unsafe_code)]

use crate::geometry::{CacheGeometry, LineSize, Platform};
use crate::prefetch::{Pld, Prefetcher, Scheduler};

pub const PAGE_SIZE: usize = 4096;

/// One page-aligned page.
#[derive(Clone)]
#[repr(C, align(4096))]
pub struct Page(pub [u8; PAGE_SIZE]);

impl Page {
    pub const fn zeroed() -> Self {
        Self([0; PAGE_SIZE])
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl core::fmt::Debug for Page {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Page").finish_non_exhaustive()
    }
}

/// Copy one page.
///
/// # Safety
///
/// - Both pointers must be page-aligned and valid for [`PAGE_SIZE`] bytes
/// - The pages must not overlap
#[inline]
pub unsafe fn copy_page(dest: *mut u8, src: *const u8) {
    // SAFETY: forwarded caller contract.
    unsafe { copy_page_for(Platform::active(), dest, src) }
}

/// [`copy_page`] for an explicit platform.
///
/// # Safety
///
/// Same as [`copy_page`].
pub unsafe fn copy_page_for(platform: &Platform, dest: *mut u8, src: *const u8) {
    // SAFETY: forwarded caller contract.
    unsafe { copy_page_with(platform, dest, src, Pld) }
}

pub(crate) unsafe fn copy_page_with<P: Prefetcher>(
    platform: &Platform,
    dest: *mut u8,
    src: *const u8,
    sink: P,
) {
    debug_assert_eq!(dest.addr() % PAGE_SIZE, 0, "destination is not page-aligned");
    debug_assert_eq!(src.addr() % PAGE_SIZE, 0, "source is not page-aligned");

    let g = &platform.geometry;
    // SAFETY: forwarded caller contract.
    unsafe {
        match (g.line, platform.wide_vector) {
            (LineSize::B32, false) => copy_lines::<u32, 8, P>(g, dest, src, sink),
            (LineSize::B32, true) => copy_lines::<u64, 4, P>(g, dest, src, sink),
            (LineSize::B64, false) => copy_lines::<u32, 16, P>(g, dest, src, sink),
            (LineSize::B64, true) => copy_lines::<u64, 8, P>(g, dest, src, sink),
        }
    }
}

/// `N` values of `T` make one cache line.
#[inline(always)]
unsafe fn copy_lines<T: Copy + Default, const N: usize, P: Prefetcher>(
    geometry: &CacheGeometry,
    dest: *mut u8,
    src: *const u8,
    sink: P,
) {
    let block = N * size_of::<T>();
    let mut prefetch = Scheduler::start(sink, geometry, src, PAGE_SIZE);

    for offset in (0..PAGE_SIZE).step_by(block) {
        // SAFETY: `offset + block <= PAGE_SIZE` and both pages are aligned
        // for `T`.
        unsafe {
            let s = src.add(offset);
            prefetch.advance(s);
            let s = s.cast::<T>();
            let d = dest.add(offset).cast::<T>();
            let mut regs = [T::default(); N];
            for (i, reg) in regs.iter_mut().enumerate() {
                *reg = s.add(i).read();
            }
            for (i, reg) in regs.into_iter().enumerate() {
                d.add(i).write(reg);
            }
        }
    }
}
