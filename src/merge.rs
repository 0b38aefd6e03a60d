//! Forward copy engine: alignment, shift-merge, bulk block loop and tail.
//!
//! After a byte-wise prologue the destination is word-aligned. If the source
//! then shares its offset the copy runs on whole words; otherwise it runs one
//! of three offset-specialised paths that rebuild each destination word from
//! two adjacent aligned source words.
//!
//! Source words are only ever loaded when they lie entirely inside the
//! source range. The first partial word is assembled byte by byte into the
//! carry, and bytes still held in the carry when the merge loops stop are
//! re-read by the byte tail.
#![allow(unsafe_code)]

use crate::access::{Access, WORD_BYTES, WORD_MASK, Word};
use crate::dispatch::{Tier, Tuning, classify};
use crate::geometry::{CacheGeometry, LineSize};
use crate::prefetch::{Prefetcher, Scheduler};
use crate::transfer::{Transfer, align_dst, copy_rest, copy_word_ladder, copy_words};

/// Run a forward copy of `t.remaining()` bytes.
///
/// Returns `Err` as soon as `acc` refuses an access; `t` then points at the
/// first byte not written.
///
/// # Safety
///
/// The regions described by `t` must be valid for every access `acc` does
/// not guard, and must not overlap unless they are identical.
pub(crate) unsafe fn copy<A: Access, P: Prefetcher>(
    t: &mut Transfer,
    acc: &A,
    sink: P,
    geometry: &CacheGeometry,
    tuning: &Tuning,
) -> Result<(), A::Fault> {
    // SAFETY: forwarded caller contract.
    unsafe {
        match geometry.line {
            LineSize::B32 => copy_lines::<A, P, 8>(t, acc, sink, geometry, tuning),
            LineSize::B64 => copy_lines::<A, P, 16>(t, acc, sink, geometry, tuning),
        }
    }
}

/// One instantiation per line size; `W` is the words per block.
#[inline(always)]
unsafe fn copy_lines<A: Access, P: Prefetcher, const W: usize>(
    t: &mut Transfer,
    acc: &A,
    sink: P,
    geometry: &CacheGeometry,
    tuning: &Tuning,
) -> Result<(), A::Fault> {
    // SAFETY: forwarded caller contract.
    unsafe {
        match classify(t.remaining(), t.src.addr(), t.dst.addr(), &tuning.tiers) {
            Tier::Tiny => copy_rest(t, acc),
            Tier::FastAligned => {
                align_dst(t, acc)?;
                copy_word_ladder(t, acc)
            }
            Tier::General => copy_general::<A, P, W>(t, acc, sink, geometry, tuning),
        }
    }
}

unsafe fn copy_general<A: Access, P: Prefetcher, const W: usize>(
    t: &mut Transfer,
    acc: &A,
    sink: P,
    geometry: &CacheGeometry,
    tuning: &Tuning,
) -> Result<(), A::Fault> {
    let sink = if tuning.prefetch { Some(sink) } else { None };
    let write_align = tuning.copy_write_align(geometry);

    // SAFETY: forwarded caller contract; the head never exceeds `remaining()`.
    unsafe {
        align_dst(t, acc)?;
        match t.src.addr() & WORD_MASK {
            0 => copy_coaligned::<A, P, W>(t, acc, sink, geometry, write_align),
            1 => copy_shifted::<A, P, W, 1>(t, acc, sink, geometry, write_align),
            2 => copy_shifted::<A, P, W, 2>(t, acc, sink, geometry, write_align),
            _ => copy_shifted::<A, P, W, 3>(t, acc, sink, geometry, write_align),
        }
    }
}

// =============================================================================
// CO-ALIGNED PATH
// =============================================================================

/// # Safety
///
/// Destination word-aligned (or nothing left) and source co-aligned with it.
unsafe fn copy_coaligned<A: Access, P: Prefetcher, const W: usize>(
    t: &mut Transfer,
    acc: &A,
    sink: Option<P>,
    geometry: &CacheGeometry,
    write_align: usize,
) -> Result<(), A::Fault> {
    let block = W * WORD_BYTES;

    // SAFETY: every step below is bounded by `remaining()`.
    unsafe {
        if write_align > WORD_BYTES {
            while t.dst.addr() & (write_align - 1) != 0 && t.remaining() >= WORD_BYTES {
                copy_words::<A, 1>(t, acc)?;
            }
        }

        if t.remaining() >= block {
            let mut prefetch = sink.map(|s| Scheduler::start(s, geometry, t.src, t.remaining()));
            while t.remaining() >= block {
                if let Some(p) = prefetch.as_mut() {
                    p.advance(t.src);
                }
                copy_words::<A, W>(t, acc)?;
            }
        }

        copy_word_ladder(t, acc)
    }
}

// =============================================================================
// CROSS-ALIGNED PATHS
// =============================================================================

// Memory order of the bytes inside a word decides which shift moves a byte
// towards the lower address.
#[cfg(target_endian = "little")]
#[inline(always)]
const fn pull<const OFF: usize>(word: Word) -> Word {
    word >> (8 * OFF)
}

#[cfg(target_endian = "little")]
#[inline(always)]
const fn push<const OFF: usize>(word: Word) -> Word {
    word << (8 * (WORD_BYTES - OFF))
}

#[cfg(target_endian = "big")]
#[inline(always)]
const fn pull<const OFF: usize>(word: Word) -> Word {
    word << (8 * OFF)
}

#[cfg(target_endian = "big")]
#[inline(always)]
const fn push<const OFF: usize>(word: Word) -> Word {
    word >> (8 * (WORD_BYTES - OFF))
}

/// Copy with the source `OFF` bytes past a word boundary and the destination
/// word-aligned.
///
/// The carry holds the `WORD_BYTES - OFF` source bytes at the cursor, already
/// pulled into destination position. The next aligned source word starts
/// right after them.
unsafe fn copy_shifted<A: Access, P: Prefetcher, const W: usize, const OFF: usize>(
    t: &mut Transfer,
    acc: &A,
    sink: Option<P>,
    geometry: &CacheGeometry,
    write_align: usize,
) -> Result<(), A::Fault> {
    let carried = WORD_BYTES - OFF;
    let block = W * WORD_BYTES;

    // SAFETY: each merged step loads the aligned word at `src + carried`,
    // which the loop conditions keep inside the source range.
    unsafe {
        if t.remaining() < carried + WORD_BYTES {
            return copy_rest(t, acc);
        }
        let mut carry = load_carry::<A, OFF>(t, acc)?;

        if write_align > WORD_BYTES {
            while t.dst.addr() & (write_align - 1) != 0 && t.remaining() >= carried + WORD_BYTES {
                merge_words::<A, 1, OFF>(t, acc, &mut carry)?;
            }
        }

        if t.remaining() >= block + carried {
            let mut prefetch = sink.map(|s| Scheduler::start(s, geometry, t.src, t.remaining()));
            while t.remaining() >= block + carried {
                if let Some(p) = prefetch.as_mut() {
                    p.advance(t.src);
                }
                merge_words::<A, W, OFF>(t, acc, &mut carry)?;
            }
        }

        while t.remaining() >= carried + WORD_BYTES {
            merge_words::<A, 1, OFF>(t, acc, &mut carry)?;
        }

        copy_rest(t, acc)
    }
}

/// Assemble the partial leading source word without reading outside the
/// source range.
#[inline(always)]
unsafe fn load_carry<A: Access, const OFF: usize>(
    t: &Transfer,
    acc: &A,
) -> Result<Word, A::Fault> {
    let mut bytes = [0u8; WORD_BYTES];
    for (i, byte) in bytes.iter_mut().enumerate().skip(OFF) {
        // SAFETY: `i - OFF < WORD_BYTES - OFF <= remaining()`.
        *byte = unsafe { acc.load_u8(t.src.add(i - OFF))? };
    }
    Ok(pull::<OFF>(Word::from_ne_bytes(bytes)))
}

/// Load `N` aligned source words, merge each with the carry and store `N`
/// destination words.
#[inline(always)]
unsafe fn merge_words<A: Access, const N: usize, const OFF: usize>(
    t: &mut Transfer,
    acc: &A,
    carry: &mut Word,
) -> Result<(), A::Fault> {
    // SAFETY: `src` is OFF past a boundary, so `src + (WORD_BYTES - OFF)` is
    // aligned; the caller keeps `N` words after it inside the source.
    let src = unsafe { t.src.add(WORD_BYTES - OFF).cast::<Word>() };
    let mut regs = [0 as Word; N];
    let mut c = *carry;
    for (i, reg) in regs.iter_mut().enumerate() {
        // SAFETY: see above.
        let next = unsafe { acc.load_word(src.add(i))? };
        *reg = c | push::<OFF>(next);
        c = pull::<OFF>(next);
    }
    for reg in regs {
        // SAFETY: destination aligned and within the remaining span.
        unsafe {
            acc.store_word(t.dst.cast::<Word>(), reg)?;
            t.advance(WORD_BYTES);
        }
    }
    *carry = c;
    Ok(())
}
