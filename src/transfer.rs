//! Call-scoped cursor record for forward copies.
#![allow(unsafe_code)]

use crate::access::{Access, WORD_BYTES, WORD_MASK, Word};

/// Source and destination cursors of one forward copy.
///
/// Both cursors advance together and only after a store lands, so at every
/// point `remaining()` counts exactly the bytes not yet written.
#[derive(Debug)]
pub(crate) struct Transfer {
    pub(crate) src: *const u8,
    pub(crate) dst: *mut u8,
    end: *mut u8,
}

impl Transfer {
    #[inline(always)]
    pub(crate) fn new(dst: *mut u8, src: *const u8, len: usize) -> Self {
        Self {
            src,
            dst,
            end: dst.wrapping_add(len),
        }
    }

    #[inline(always)]
    pub(crate) fn remaining(&self) -> usize {
        self.end.addr() - self.dst.addr()
    }

    /// Commit `n` bytes. `n` must not exceed `remaining()`.
    #[inline(always)]
    pub(crate) fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.remaining());
        self.src = self.src.wrapping_add(n);
        self.dst = self.dst.wrapping_add(n);
    }

    /// Bytes needed to bring the destination to a word boundary.
    #[inline(always)]
    pub(crate) fn dst_head(&self) -> usize {
        (self.dst.addr().wrapping_neg() & WORD_MASK).min(self.remaining())
    }
}

/// Copy `n` single bytes.
///
/// # Safety
///
/// `n <= t.remaining()`; the cursors must be valid for the access `acc` makes.
#[inline(always)]
pub(crate) unsafe fn copy_bytes<A: Access>(
    t: &mut Transfer,
    acc: &A,
    n: usize,
) -> Result<(), A::Fault> {
    for _ in 0..n {
        // SAFETY: caller keeps `n` within the remaining span.
        unsafe {
            let byte = acc.load_u8(t.src)?;
            acc.store_u8(t.dst, byte)?;
            t.advance(1);
        }
    }
    Ok(())
}

/// Copy everything left byte by byte.
///
/// # Safety
///
/// The cursors must be valid for the access `acc` makes.
#[inline(always)]
pub(crate) unsafe fn copy_rest<A: Access>(t: &mut Transfer, acc: &A) -> Result<(), A::Fault> {
    let n = t.remaining();
    // SAFETY: `n` is exactly the remaining span.
    unsafe { copy_bytes(t, acc, n) }
}

/// Byte prologue that brings the destination to a word boundary.
///
/// # Safety
///
/// The cursors must be valid for the access `acc` makes.
#[inline(always)]
pub(crate) unsafe fn align_dst<A: Access>(t: &mut Transfer, acc: &A) -> Result<(), A::Fault> {
    let n = t.dst_head();
    // SAFETY: the head never exceeds the remaining span.
    unsafe { copy_bytes(t, acc, n) }
}

/// Load `N` words into registers, then store them.
///
/// # Safety
///
/// Both cursors word-aligned and `N * WORD_BYTES <= t.remaining()`.
#[inline(always)]
pub(crate) unsafe fn copy_words<A: Access, const N: usize>(
    t: &mut Transfer,
    acc: &A,
) -> Result<(), A::Fault> {
    let src = t.src.cast::<Word>();
    let mut regs = [0 as Word; N];
    for (i, reg) in regs.iter_mut().enumerate() {
        // SAFETY: `src + i` lies within the block the caller sized.
        *reg = unsafe { acc.load_word(src.add(i))? };
    }
    for reg in regs {
        // SAFETY: destination aligned and within the remaining span.
        unsafe {
            acc.store_word(t.dst.cast::<Word>(), reg)?;
            t.advance(WORD_BYTES);
        }
    }
    Ok(())
}

/// Copy every whole word left, largest unrolled step first, then the
/// trailing bytes.
///
/// # Safety
///
/// Both cursors word-aligned.
#[inline(always)]
pub(crate) unsafe fn copy_word_ladder<A: Access>(
    t: &mut Transfer,
    acc: &A,
) -> Result<(), A::Fault> {
    let mut words = t.remaining() / WORD_BYTES;
    // SAFETY: each step is bounded by `words`, derived from `remaining()`.
    unsafe {
        while words >= 8 {
            copy_words::<A, 8>(t, acc)?;
            words -= 8;
        }
        if words & 4 != 0 {
            copy_words::<A, 4>(t, acc)?;
        }
        if words & 2 != 0 {
            copy_words::<A, 2>(t, acc)?;
        }
        if words & 1 != 0 {
            copy_words::<A, 1>(t, acc)?;
        }
        copy_rest(t, acc)
    }
}
