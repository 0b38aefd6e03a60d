//! Per-element memory access for the transfer engines.
//!
//! Every load and store an engine performs goes through an [`Access`]
//! implementation. The in-kernel primitives use [`Direct`], whose fault type
//! is uninhabited, so the error paths compile away. The boundary-crossing
//! primitives use [`FromUser`] / [`ToUser`], which consult a [`FaultProbe`]
//! before each access on the unprivileged side; a refused access surfaces as
//! an `Err` that unwinds the engine back to its entry point.
#![allow(unsafe_code)]

use core::convert::Infallible;

use crate::error::{AccessFault, AccessKind};

/// Machine word of the 32-bit architecture family.
pub type Word = u32;

pub const WORD_BYTES: usize = core::mem::size_of::<Word>();
pub const WORD_MASK: usize = WORD_BYTES - 1;

/// Broadcast a byte into every lane of a word.
#[inline(always)]
pub const fn splat(byte: u8) -> Word {
    Word::from_ne_bytes([byte; WORD_BYTES])
}

/// Load/store primitives used by the engines.
///
/// Word accesses are always naturally aligned; the engines establish that
/// before calling them.
pub trait Access {
    type Fault;

    /// # Safety
    ///
    /// `src` must be valid for a one-byte read unless the implementation
    /// guards it.
    unsafe fn load_u8(&self, src: *const u8) -> Result<u8, Self::Fault>;

    /// # Safety
    ///
    /// `src` must be word-aligned and valid for a word read unless the
    /// implementation guards it.
    unsafe fn load_word(&self, src: *const Word) -> Result<Word, Self::Fault>;

    /// # Safety
    ///
    /// `dst` must be valid for a one-byte write unless the implementation
    /// guards it.
    unsafe fn store_u8(&self, dst: *mut u8, value: u8) -> Result<(), Self::Fault>;

    /// # Safety
    ///
    /// `dst` must be word-aligned and valid for a word write unless the
    /// implementation guards it.
    unsafe fn store_word(&self, dst: *mut Word, value: Word) -> Result<(), Self::Fault>;
}

/// Unchecked access to privileged memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct Direct;

impl Access for Direct {
    type Fault = Infallible;

    #[inline(always)]
    unsafe fn load_u8(&self, src: *const u8) -> Result<u8, Infallible> {
        // SAFETY: caller guarantees `src` is readable.
        Ok(unsafe { src.read() })
    }

    #[inline(always)]
    unsafe fn load_word(&self, src: *const Word) -> Result<Word, Infallible> {
        // SAFETY: caller guarantees `src` is aligned and readable.
        Ok(unsafe { src.read() })
    }

    #[inline(always)]
    unsafe fn store_u8(&self, dst: *mut u8, value: u8) -> Result<(), Infallible> {
        // SAFETY: caller guarantees `dst` is writable.
        unsafe { dst.write(value) };
        Ok(())
    }

    #[inline(always)]
    unsafe fn store_word(&self, dst: *mut Word, value: Word) -> Result<(), Infallible> {
        // SAFETY: caller guarantees `dst` is aligned and writable.
        unsafe { dst.write(value) };
        Ok(())
    }
}

// =============================================================================
// FAULT PROBES
// =============================================================================

/// Platform hook that decides whether an unprivileged access would fault.
///
/// An accessible range must stay accessible for the duration of one call;
/// the engines probe once per element and never retry a refused access
/// except byte-by-byte while settling the remaining count.
pub trait FaultProbe {
    fn probe(&self, addr: usize, size: usize, kind: AccessKind) -> Result<(), AccessFault>;
}

impl<P: FaultProbe + ?Sized> FaultProbe for &P {
    #[inline(always)]
    fn probe(&self, addr: usize, size: usize, kind: AccessKind) -> Result<(), AccessFault> {
        (**self).probe(addr, size, kind)
    }
}

/// Ceiling on unprivileged addresses: any access reaching `limit` or beyond
/// faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressLimit {
    pub limit: usize,
}

impl AddressLimit {
    pub const NONE: AddressLimit = AddressLimit { limit: usize::MAX };

    #[inline]
    pub const fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl FaultProbe for AddressLimit {
    #[inline(always)]
    fn probe(&self, addr: usize, size: usize, kind: AccessKind) -> Result<(), AccessFault> {
        match addr.checked_add(size) {
            Some(end) if end <= self.limit => Ok(()),
            _ => Err(AccessFault::new(addr.max(self.limit), kind)),
        }
    }
}

// =============================================================================
// BOUNDARY ACCESSORS
// =============================================================================

/// Source side is unprivileged: loads are probed, stores are direct.
#[derive(Debug, Clone, Copy)]
pub struct FromUser<P> {
    probe: P,
}

impl<P: FaultProbe> FromUser<P> {
    #[inline]
    pub const fn new(probe: P) -> Self {
        Self { probe }
    }
}

impl<P: FaultProbe> Access for FromUser<P> {
    type Fault = AccessFault;

    #[inline(always)]
    unsafe fn load_u8(&self, src: *const u8) -> Result<u8, AccessFault> {
        self.probe.probe(src.addr(), 1, AccessKind::Read)?;
        // SAFETY: the probe accepted the read.
        Ok(unsafe { src.read_volatile() })
    }

    #[inline(always)]
    unsafe fn load_word(&self, src: *const Word) -> Result<Word, AccessFault> {
        self.probe.probe(src.addr(), WORD_BYTES, AccessKind::Read)?;
        // SAFETY: the probe accepted the read; the engine keeps `src` aligned.
        Ok(unsafe { src.read_volatile() })
    }

    #[inline(always)]
    unsafe fn store_u8(&self, dst: *mut u8, value: u8) -> Result<(), AccessFault> {
        // SAFETY: destination is privileged memory the caller vouches for.
        unsafe { dst.write(value) };
        Ok(())
    }

    #[inline(always)]
    unsafe fn store_word(&self, dst: *mut Word, value: Word) -> Result<(), AccessFault> {
        // SAFETY: as above; alignment established by the engine.
        unsafe { dst.write(value) };
        Ok(())
    }
}

/// Destination side is unprivileged: stores are probed, loads are direct.
#[derive(Debug, Clone, Copy)]
pub struct ToUser<P> {
    probe: P,
}

impl<P: FaultProbe> ToUser<P> {
    #[inline]
    pub const fn new(probe: P) -> Self {
        Self { probe }
    }
}

impl<P: FaultProbe> Access for ToUser<P> {
    type Fault = AccessFault;

    #[inline(always)]
    unsafe fn load_u8(&self, src: *const u8) -> Result<u8, AccessFault> {
        // SAFETY: source is privileged memory the caller vouches for.
        Ok(unsafe { src.read() })
    }

    #[inline(always)]
    unsafe fn load_word(&self, src: *const Word) -> Result<Word, AccessFault> {
        // SAFETY: as above; alignment established by the engine.
        Ok(unsafe { src.read() })
    }

    #[inline(always)]
    unsafe fn store_u8(&self, dst: *mut u8, value: u8) -> Result<(), AccessFault> {
        self.probe.probe(dst.addr(), 1, AccessKind::Write)?;
        // SAFETY: the probe accepted the write.
        unsafe { dst.write_volatile(value) };
        Ok(())
    }

    #[inline(always)]
    unsafe fn store_word(&self, dst: *mut Word, value: Word) -> Result<(), AccessFault> {
        self.probe.probe(dst.addr(), WORD_BYTES, AccessKind::Write)?;
        // SAFETY: the probe accepted the write; the engine keeps `dst` aligned.
        unsafe { dst.write_volatile(value) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splat() {
        assert_eq!(splat(0), 0);
        assert_eq!(splat(0xAA), 0xAAAA_AAAA);
        assert_eq!(splat(0x01).to_ne_bytes(), [1, 1, 1, 1]);
    }

    #[test]
    fn test_address_limit() {
        let probe = AddressLimit::new(0x1000);
        assert_eq!(probe.probe(0xFFC, 4, AccessKind::Read), Ok(()));
        assert_eq!(
            probe.probe(0xFFD, 4, AccessKind::Read),
            Err(AccessFault::new(0x1000, AccessKind::Read))
        );
        assert_eq!(
            probe.probe(0x1004, 1, AccessKind::Write),
            Err(AccessFault::new(0x1004, AccessKind::Write))
        );
        assert_eq!(AddressLimit::NONE.probe(usize::MAX - 1, 1, AccessKind::Read), Ok(()));
        assert!(AddressLimit::NONE.probe(usize::MAX, 1, AccessKind::Read).is_err());
    }

    #[test]
    fn test_from_user_probes_loads_only() {
        let src = [1u8, 2, 3, 4];
        let mut dst = [0u8; 4];
        let acc = FromUser::new(AddressLimit::new(src.as_ptr().addr() + 2));
        unsafe {
            assert_eq!(acc.load_u8(src.as_ptr().add(1)), Ok(2));
            let err = acc.load_u8(src.as_ptr().add(2)).unwrap_err();
            assert_eq!(err.kind, AccessKind::Read);
            // Stores go to privileged memory and are never refused.
            assert_eq!(acc.store_u8(dst.as_mut_ptr().add(3), 9), Ok(()));
        }
        assert_eq!(dst[3], 9);
    }

    #[test]
    fn test_to_user_probes_stores_only() {
        let src = [7u8; 4];
        let mut dst = [0u8; 4];
        let acc = ToUser::new(AddressLimit::new(dst.as_ptr().addr() + 1));
        unsafe {
            assert_eq!(acc.load_u8(src.as_ptr().add(3)), Ok(7));
            assert_eq!(acc.store_u8(dst.as_mut_ptr(), 5), Ok(()));
            let err = acc.store_u8(dst.as_mut_ptr().add(1), 5).unwrap_err();
            assert_eq!(err, AccessFault::new(dst.as_ptr().addr() + 1, AccessKind::Write));
        }
        assert_eq!(dst, [5, 0, 0, 0]);
    }
}
