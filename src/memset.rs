//! Fill and zero-fill.
//!
//! Single-sided version of the copy pipeline: size tiers, word alignment,
//! write alignment, destination-side prefetch, bulk line stores and tail.
//! With wide vectors available the bulk loop stores double words.
#![allow(unsafe_code)]

use crate::access::{WORD_BYTES, WORD_MASK, Word, splat};
use crate::dispatch::{FILL, Tier, Tuning, classify_fill};
use crate::geometry::{CacheGeometry, LineSize, Platform};
use crate::prefetch::{Pld, Prefetcher, Scheduler};

/// Fill `n` bytes at `dest` with `value`.
///
/// # Safety
///
/// - `dest` must be valid for writes of `n` bytes
#[inline]
pub unsafe fn fill(dest: *mut u8, value: u8, n: usize) -> *mut u8 {
    // SAFETY: forwarded caller contract.
    unsafe { fill_for(Platform::active(), dest, value, n) }
}

/// [`fill`] for an explicit platform.
///
/// # Safety
///
/// Same as [`fill`].
pub unsafe fn fill_for(platform: &Platform, dest: *mut u8, value: u8, n: usize) -> *mut u8 {
    // SAFETY: forwarded caller contract.
    unsafe { set(platform, dest, splat(value), n, &FILL, Pld) };
    dest
}

/// Zero `n` bytes at `dest`.
///
/// # Safety
///
/// - `dest` must be valid for writes of `n` bytes
#[inline]
pub unsafe fn zero(dest: *mut u8, n: usize) -> *mut u8 {
    // SAFETY: forwarded caller contract.
    unsafe { zero_for(Platform::active(), dest, n) }
}

/// [`zero`] for an explicit platform.
///
/// # Safety
///
/// Same as [`zero`].
pub unsafe fn zero_for(platform: &Platform, dest: *mut u8, n: usize) -> *mut u8 {
    // SAFETY: forwarded caller contract.
    unsafe { set(platform, dest, 0, n, &FILL, Pld) };
    dest
}

/// Store unit of the bulk loop.
trait Lane: Copy {
    /// `word` holds the same byte in every lane.
    fn from_word(word: Word) -> Self;
}

impl Lane for u32 {
    #[inline(always)]
    fn from_word(word: Word) -> Self {
        word
    }
}

impl Lane for u64 {
    #[inline(always)]
    fn from_word(word: Word) -> Self {
        (u64::from(word) << 32) | u64::from(word)
    }
}

/// Fill with a byte-uniform `pattern`.
///
/// # Safety
///
/// `dest` must be valid for writes of `n` bytes.
pub(crate) unsafe fn set<P: Prefetcher>(
    platform: &Platform,
    dest: *mut u8,
    pattern: Word,
    n: usize,
    tuning: &Tuning,
    sink: P,
) {
    let g = &platform.geometry;
    // SAFETY: forwarded caller contract.
    unsafe {
        match (g.line, platform.wide_vector) {
            (LineSize::B32, false) => set_lines::<u32, 8, P>(g, dest, pattern, n, tuning, sink),
            (LineSize::B32, true) => set_lines::<u64, 4, P>(g, dest, pattern, n, tuning, sink),
            (LineSize::B64, false) => set_lines::<u32, 16, P>(g, dest, pattern, n, tuning, sink),
            (LineSize::B64, true) => set_lines::<u64, 8, P>(g, dest, pattern, n, tuning, sink),
        }
    }
}

/// `N` lanes of `L` make one cache line.
unsafe fn set_lines<L: Lane, const N: usize, P: Prefetcher>(
    geometry: &CacheGeometry,
    dest: *mut u8,
    pattern: Word,
    n: usize,
    tuning: &Tuning,
    sink: P,
) {
    let mut f = Span::new(dest, n);
    // SAFETY: every store below is bounded by `f.remaining()`.
    unsafe {
        match classify_fill(n, &tuning.tiers) {
            Tier::Tiny => f.bytes(pattern, n),
            Tier::FastAligned => {
                f.align_word(pattern);
                f.word_ladder(pattern);
            }
            Tier::General => {
                f.align_word(pattern);

                let align = tuning.fill_write_align(geometry).max(size_of::<L>());
                while f.dst.addr() & (align - 1) != 0 && f.remaining() >= WORD_BYTES {
                    f.words::<1>(pattern);
                }

                let block = N * size_of::<L>();
                if f.remaining() >= block {
                    let lane = L::from_word(pattern);
                    let mut prefetch = tuning
                        .prefetch
                        .then(|| Scheduler::start(sink, geometry, f.dst, f.remaining()));
                    while f.remaining() >= block {
                        if let Some(p) = prefetch.as_mut() {
                            p.advance(f.dst);
                        }
                        f.lanes::<L, N>(lane);
                    }
                }

                f.word_ladder(pattern);
            }
        }
    }
}

/// Destination cursor of one fill.
struct Span {
    dst: *mut u8,
    end: *mut u8,
}

impl Span {
    #[inline(always)]
    fn new(dst: *mut u8, n: usize) -> Self {
        Self {
            dst,
            end: dst.wrapping_add(n),
        }
    }

    #[inline(always)]
    fn remaining(&self) -> usize {
        self.end.addr() - self.dst.addr()
    }

    #[inline(always)]
    unsafe fn bytes(&mut self, pattern: Word, n: usize) {
        let byte = pattern.to_ne_bytes()[0];
        for _ in 0..n {
            // SAFETY: caller bounds `n` by `remaining()`.
            unsafe {
                self.dst.write(byte);
                self.dst = self.dst.add(1);
            }
        }
    }

    #[inline(always)]
    unsafe fn align_word(&mut self, pattern: Word) {
        let head = (self.dst.addr().wrapping_neg() & WORD_MASK).min(self.remaining());
        // SAFETY: head bounded by `remaining()`.
        unsafe { self.bytes(pattern, head) };
    }

    /// # Safety
    ///
    /// `dst` word-aligned and `N` words remaining.
    #[inline(always)]
    unsafe fn words<const N: usize>(&mut self, pattern: Word) {
        // SAFETY: lanes of `Word` are the same operation.
        unsafe { self.lanes::<Word, N>(pattern) };
    }

    /// # Safety
    ///
    /// `dst` aligned for `L` and `N` lanes remaining.
    #[inline(always)]
    unsafe fn lanes<L: Lane, const N: usize>(&mut self, lane: L) {
        let dst = self.dst.cast::<L>();
        for i in 0..N {
            // SAFETY: see above.
            unsafe { dst.add(i).write(lane) };
        }
        // SAFETY: the block lies within the span.
        self.dst = unsafe { self.dst.add(N * size_of::<L>()) };
    }

    /// Store every whole word left, largest step first, then the trailing
    /// bytes.
    #[inline(always)]
    unsafe fn word_ladder(&mut self, pattern: Word) {
        let mut words = self.remaining() / WORD_BYTES;
        // SAFETY: each step is bounded by `words`.
        unsafe {
            while words >= 8 {
                self.words::<8>(pattern);
                words -= 8;
            }
            if words & 4 != 0 {
                self.words::<4>(pattern);
            }
            if words & 2 != 0 {
                self.words::<2>(pattern);
            }
            if words & 1 != 0 {
                self.words::<1>(pattern);
            }
            self.bytes(pattern, self.remaining());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::BASELINE_FILL;
    use crate::geometry::ArchRevision;
    use crate::prefetch::Recorder;

    fn platforms() -> [Platform; 5] {
        [
            Platform::new(ArchRevision::V4),
            Platform::new(ArchRevision::V6),
            Platform::new(ArchRevision::V7),
            Platform::new(ArchRevision::V7).with_wide_vector(true),
            Platform::new(ArchRevision::V7)
                .with_wide_vector(true)
                .with_line(LineSize::B32),
        ]
    }

    #[test]
    fn test_fill_0_to_1024() {
        let mut dst = [0u8; 1024];

        for platform in &platforms() {
            for n in 0..=1024 {
                dst.fill(0xFF);
                let ret = unsafe { fill_for(platform, dst.as_mut_ptr(), 0x42, n) };
                assert_eq!(ret, dst.as_mut_ptr());
                for (i, &byte) in dst[..n].iter().enumerate() {
                    assert_eq!(byte, 0x42, "Failed at size {} index {} on {}", n, i, platform);
                }
                if n < 1024 {
                    assert_eq!(dst[n], 0xFF, "Overwrote at size {} (index {})", n, n);
                }
            }
        }
    }

    #[test]
    fn test_fill_alignment() {
        let mut dst_full = [0u8; 1100];

        for platform in &platforms() {
            for dst_off in 0..40 {
                for n in [
                    0, 1, 7, 8, 15, 16, 31, 32, 63, 64, 65, 127, 128, 129, 255, 256, 257, 511,
                    512, 1024,
                ] {
                    dst_full.fill(0xFF);
                    unsafe {
                        fill_for(platform, dst_full.as_mut_ptr().add(dst_off), 0xAA, n);
                    }
                    assert!(
                        dst_full[dst_off..dst_off + n].iter().all(|&b| b == 0xAA),
                        "Failed at size {} with dst_off {}",
                        n,
                        dst_off
                    );
                    assert!(dst_full[..dst_off].iter().all(|&b| b == 0xFF));
                    assert!(dst_full[dst_off + n..].iter().all(|&b| b == 0xFF));
                }
            }
        }
    }

    #[test]
    fn test_zero_matches_fill_zero() {
        for platform in &platforms() {
            for (off, n) in [(0, 0), (3, 5), (1, 100), (6, 777)] {
                let mut a = [0x5Au8; 800];
                let mut b = [0x5Au8; 800];
                unsafe {
                    zero_for(platform, a.as_mut_ptr().add(off), n);
                    fill_for(platform, b.as_mut_ptr().add(off), 0, n);
                }
                assert_eq!(a, b);
                assert!(a[off..off + n].iter().all(|&x| x == 0));
            }
        }
    }

    #[test]
    fn test_fill_hundred_bytes() {
        let mut dst = [0u8; 128];
        unsafe { fill(dst.as_mut_ptr(), 0xAA, 100) };
        assert!(dst[..100].iter().all(|&b| b == 0xAA));
        assert!(dst[100..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_lane_broadcast() {
        assert_eq!(<u64 as Lane>::from_word(splat(0xC3)), u64::from_ne_bytes([0xC3; 8]));
    }

    #[test]
    fn test_fill_prefetches_destination_only_when_long() {
        let platform = Platform::new(ArchRevision::V6);
        let mut dst = [0u8; 2048];

        let mut hints = Recorder::default();
        unsafe { set(&platform, dst.as_mut_ptr(), splat(1), 2000, &FILL, &mut hints) };
        let start = dst.as_ptr().addr() & !31;
        let end = dst.as_ptr().addr() + 2000;
        assert!(!hints.0.is_empty());
        assert!(hints.0.iter().all(|&a| a >= start && a < end));

        let mut hints = Recorder::default();
        unsafe { set(&platform, dst.as_mut_ptr(), splat(1), 127, &FILL, &mut hints) };
        assert!(hints.0.is_empty());

        let mut hints = Recorder::default();
        unsafe { set(&platform, dst.as_mut_ptr(), splat(1), 2000, &BASELINE_FILL, &mut hints) };
        assert!(hints.0.is_empty());
    }
}
