//! Cache-line preload scheduling.
//!
//! [`Scheduler`] keeps a constant look-ahead of `prefetch_distance` lines in
//! front of the line a bulk loop is consuming. Hints are issued through the
//! [`Prefetcher`] seam; [`Pld`] emits the hardware hint where the target has
//! one and compiles to nothing elsewhere.
#![allow(unsafe_code)]

use crate::geometry::CacheGeometry;

/// Receiver of cache-line preload hints.
pub trait Prefetcher {
    /// Hint that the line at `line` will be touched soon. Never faults.
    fn prefetch(&mut self, line: *const u8);
}

impl<P: Prefetcher + ?Sized> Prefetcher for &mut P {
    #[inline(always)]
    fn prefetch(&mut self, line: *const u8) {
        (**self).prefetch(line);
    }
}

/// Hardware preload hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pld;

impl Prefetcher for Pld {
    #[inline(always)]
    fn prefetch(&mut self, line: *const u8) {
        hint(line);
    }
}

/// Discards every hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrefetch;

impl Prefetcher for NoPrefetch {
    #[inline(always)]
    fn prefetch(&mut self, _line: *const u8) {}
}

#[cfg(all(target_arch = "arm", target_feature = "v5te"))]
#[inline(always)]
fn hint(addr: *const u8) {
    // SAFETY: PLD is a hint; it does not fault on any address.
    unsafe {
        core::arch::asm!(
            "pld [{0}]",
            in(reg) addr,
            options(nostack, readonly, preserves_flags)
        );
    }
}

#[cfg(target_arch = "aarch64")]
#[inline(always)]
fn hint(addr: *const u8) {
    // SAFETY: PRFM is a hint; it does not fault on any address.
    unsafe {
        core::arch::asm!(
            "prfm pldl1keep, [{0}]",
            in(reg) addr,
            options(nostack, readonly, preserves_flags)
        );
    }
}

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn hint(addr: *const u8) {
    use core::arch::x86_64::{_MM_HINT_T0, _mm_prefetch};
    // SAFETY: PREFETCHT0 is a hint; it does not fault on any address.
    unsafe { _mm_prefetch::<_MM_HINT_T0>(addr.cast::<i8>()) };
}

#[cfg(not(any(
    all(target_arch = "arm", target_feature = "v5te"),
    target_arch = "aarch64",
    target_arch = "x86_64"
)))]
#[inline(always)]
fn hint(_addr: *const u8) {}

// =============================================================================
// SCHEDULER
// =============================================================================

/// Look-ahead state for one bulk phase.
///
/// Inactive when the geometry disables prefetching or when the stream is
/// shorter than one prefetch distance; an inactive scheduler issues nothing.
#[derive(Debug)]
pub struct Scheduler<P> {
    sink: P,
    active: bool,
    line: usize,
    distance: usize,
    /// Next line to preload.
    next: *const u8,
    /// End of the stream. Lines starting at or past it are not preloaded.
    stop: usize,
}

impl<P: Prefetcher> Scheduler<P> {
    /// Set up the look-ahead for a stream of `len` bytes starting at `cursor`
    /// and issue the entry preloads.
    pub fn start(sink: P, geometry: &CacheGeometry, cursor: *const u8, len: usize) -> Self {
        let line = geometry.line.bytes();
        let base = cursor.wrapping_sub(cursor.addr() & (line - 1));
        let mut scheduler = Self {
            sink,
            active: false,
            line,
            distance: geometry.prefetch_distance,
            next: base,
            stop: cursor.addr().saturating_add(len),
        };

        if !geometry.prefetch || len < geometry.prefetch_span() {
            return scheduler;
        }
        scheduler.active = true;

        let early = geometry.early_prefetch.min(geometry.prefetch_distance);
        for _ in 0..early {
            scheduler.issue();
        }
        // Catch up to the steady-state distance.
        for _ in early..geometry.prefetch_distance {
            scheduler.issue();
        }
        scheduler
    }

    /// Called before consuming the line containing `cursor`. Issues the
    /// preload `distance` lines ahead of it unless already issued, so each
    /// line crossing costs exactly one hint.
    #[inline(always)]
    pub fn advance(&mut self, cursor: *const u8) {
        if !self.active {
            return;
        }
        let target = (cursor.addr() & !(self.line - 1)).saturating_add(self.distance * self.line);
        while self.next.addr() <= target {
            if !self.issue() {
                break;
            }
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn into_sink(self) -> P {
        self.sink
    }

    /// Returns `false` once the look-ahead has run past the end of the stream.
    #[inline(always)]
    fn issue(&mut self) -> bool {
        if self.next.addr() >= self.stop {
            self.active = false;
            return false;
        }
        self.sink.prefetch(self.next);
        self.next = self.next.wrapping_add(self.line);
        true
    }
}

/// Records hint addresses.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct Recorder(pub Vec<usize>);

#[cfg(test)]
impl Prefetcher for Recorder {
    fn prefetch(&mut self, line: *const u8) {
        self.0.push(line.addr());
    }
}
