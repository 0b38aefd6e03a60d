//! Fault-safe copies across the privileged/unprivileged boundary.
//!
//! Same engine and semantics as [`crate::memcpy::copy`], but every access to
//! the unprivileged side is checked by a [`FaultProbe`] first. A refused
//! access stops the transfer; the entry point then settles the exact
//! remaining count byte by byte from the last committed store, so the caller
//! learns precisely how far the copy got.
#![allow(unsafe_code)]

use crate::access::{Access, FaultProbe, FromUser, ToUser};
use crate::dispatch::BOUNDARY;
use crate::error::{AccessFault, PartialCopy};
use crate::geometry::Platform;
use crate::merge;
use crate::prefetch::Pld;
use crate::transfer::{Transfer, copy_rest};

/// Copy `n` bytes from unprivileged `src` to privileged `dest`.
///
/// Returns `dest` when all bytes arrived, otherwise a [`PartialCopy`]
/// holding the number of bytes not transferred.
///
/// # Safety
///
/// - `dest` must be valid for writes of `n` bytes
/// - Every source byte `probe` accepts must be readable
/// - The regions must not overlap
#[inline]
pub unsafe fn copy_from_boundary<P: FaultProbe>(
    dest: *mut u8,
    src: *const u8,
    n: usize,
    probe: P,
) -> Result<*mut u8, PartialCopy> {
    // SAFETY: forwarded caller contract.
    unsafe { copy_from_boundary_for(Platform::active(), dest, src, n, probe) }
}

/// [`copy_from_boundary`] for an explicit platform.
///
/// # Safety
///
/// Same as [`copy_from_boundary`].
pub unsafe fn copy_from_boundary_for<P: FaultProbe>(
    platform: &Platform,
    dest: *mut u8,
    src: *const u8,
    n: usize,
    probe: P,
) -> Result<*mut u8, PartialCopy> {
    // SAFETY: forwarded caller contract; loads are guarded by the probe.
    unsafe { boundary_copy(platform, dest, src, n, &FromUser::new(probe)) }
}

/// Copy `n` bytes from privileged `src` to unprivileged `dest`.
///
/// # Safety
///
/// - `src` must be valid for reads of `n` bytes
/// - Every destination byte `probe` accepts must be writable
/// - The regions must not overlap
#[inline]
pub unsafe fn copy_to_boundary<P: FaultProbe>(
    dest: *mut u8,
    src: *const u8,
    n: usize,
    probe: P,
) -> Result<*mut u8, PartialCopy> {
    // SAFETY: forwarded caller contract.
    unsafe { copy_to_boundary_for(Platform::active(), dest, src, n, probe) }
}

/// [`copy_to_boundary`] for an explicit platform.
///
/// # Safety
///
/// Same as [`copy_to_boundary`].
pub unsafe fn copy_to_boundary_for<P: FaultProbe>(
    platform: &Platform,
    dest: *mut u8,
    src: *const u8,
    n: usize,
    probe: P,
) -> Result<*mut u8, PartialCopy> {
    // SAFETY: forwarded caller contract; stores are guarded by the probe.
    unsafe { boundary_copy(platform, dest, src, n, &ToUser::new(probe)) }
}

unsafe fn boundary_copy<A: Access<Fault = AccessFault>>(
    platform: &Platform,
    dest: *mut u8,
    src: *const u8,
    n: usize,
    acc: &A,
) -> Result<*mut u8, PartialCopy> {
    let mut t = Transfer::new(dest, src, n);
    // SAFETY: forwarded caller contract.
    let outcome = unsafe { merge::copy(&mut t, acc, Pld, &platform.geometry, &BOUNDARY) };
    if outcome.is_ok() {
        return Ok(dest);
    }

    // A word or block access was refused somewhere inside it. Walk forward
    // one byte at a time from the last landed store to find the first byte
    // that really faults.
    // SAFETY: the settle pass stays within `t.remaining()`.
    match unsafe { copy_rest(&mut t, acc) } {
        Ok(()) => Ok(dest),
        Err(fault) => Err(PartialCopy {
            len: n,
            remaining: t.remaining(),
            fault,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::AddressLimit;
    use crate::error::AccessKind;
    use crate::geometry::ArchRevision;

    #[repr(align(64))]
    struct Aligned([u8; 768]);

    fn pattern() -> Aligned {
        let mut buf = Aligned([0; 768]);
        for (i, b) in buf.0.iter_mut().enumerate() {
            *b = (i % 253) as u8;
        }
        buf
    }

    #[test]
    fn test_unfaulted_copies_complete() {
        let src = pattern();
        for rev in [ArchRevision::V5, ArchRevision::V7] {
            let platform = Platform::new(rev);
            for src_off in 0..4 {
                for dst_off in 0..4 {
                    for n in (0..=300).chain([511, 700]) {
                        let mut dst = Aligned([0xEE; 768]);
                        let d = dst.0.as_mut_ptr().wrapping_add(dst_off);
                        let s = src.0.as_ptr().wrapping_add(src_off);
                        let ret =
                            unsafe { copy_from_boundary_for(&platform, d, s, n, AddressLimit::NONE) };
                        assert_eq!(ret, Ok(d));
                        assert_eq!(&dst.0[dst_off..dst_off + n], &src.0[src_off..src_off + n]);

                        let mut dst = Aligned([0xEE; 768]);
                        let d = dst.0.as_mut_ptr().wrapping_add(dst_off);
                        let ret =
                            unsafe { copy_to_boundary_for(&platform, d, s, n, AddressLimit::NONE) };
                        assert_eq!(ret, Ok(d));
                        assert_eq!(&dst.0[dst_off..dst_off + n], &src.0[src_off..src_off + n]);
                        assert!(dst.0[dst_off + n..].iter().all(|&b| b == 0xEE));
                    }
                }
            }
        }
    }

    #[test]
    fn test_read_fault_reports_exact_remaining() {
        let src = pattern();
        let platform = Platform::new(ArchRevision::V6);
        for src_off in 0..4 {
            for dst_off in 0..4 {
                for n in [5usize, 40, 200, 600] {
                    for k in [0, 1, 3, n / 3, n / 2 + 1, n - 1] {
                        let mut dst = Aligned([0xEE; 768]);
                        let s = src.0.as_ptr().wrapping_add(src_off);
                        let d = dst.0.as_mut_ptr().wrapping_add(dst_off);
                        let probe = AddressLimit::new(s.addr() + k);
                        let err = unsafe { copy_from_boundary_for(&platform, d, s, n, probe) }
                            .expect_err("fault must surface");
                        assert_eq!(err.remaining, n - k, "n {n} k {k} offsets {src_off}/{dst_off}");
                        assert_eq!(err.transferred(), k);
                        assert_eq!(err.fault, AccessFault::new(s.addr() + k, AccessKind::Read));
                        assert_eq!(&dst.0[dst_off..dst_off + k], &src.0[src_off..src_off + k]);
                        assert!(dst.0[dst_off + k..].iter().all(|&b| b == 0xEE));
                    }
                }
            }
        }
    }

    #[test]
    fn test_write_fault_reports_exact_remaining() {
        let src = pattern();
        let platform = Platform::new(ArchRevision::V7);
        for src_off in 0..4 {
            for dst_off in 0..4 {
                for n in [9usize, 64, 255, 700] {
                    for k in [0, 2, n / 4, n / 2, n - 1] {
                        let mut dst = Aligned([0xEE; 768]);
                        let s = src.0.as_ptr().wrapping_add(src_off);
                        let d = dst.0.as_mut_ptr().wrapping_add(dst_off);
                        let probe = AddressLimit::new(d.addr() + k);
                        let err = unsafe { copy_to_boundary_for(&platform, d, s, n, probe) }
                            .expect_err("fault must surface");
                        assert_eq!(err.remaining, n - k, "n {n} k {k} offsets {src_off}/{dst_off}");
                        assert_eq!(err.fault.kind, AccessKind::Write);
                        assert_eq!(&dst.0[dst_off..dst_off + k], &src.0[src_off..src_off + k]);
                        assert!(dst.0[dst_off + k..].iter().all(|&b| b == 0xEE));
                    }
                }
            }
        }
    }

    #[test]
    fn test_limit_at_end_is_not_a_fault() {
        let src = pattern();
        let mut dst = Aligned([0; 768]);
        let s = src.0.as_ptr().wrapping_add(1);
        let d = dst.0.as_mut_ptr();
        let ret = unsafe { copy_from_boundary(d, s, 333, AddressLimit::new(s.addr() + 333)) };
        assert_eq!(ret, Ok(d));
        assert_eq!(&dst.0[..333], &src.0[1..334]);
    }

    #[test]
    fn test_zero_length_never_probes() {
        let mut dst = [7u8; 4];
        let d = dst.as_mut_ptr();
        let src = core::ptr::NonNull::<u8>::dangling().as_ptr();
        let ret = unsafe { copy_from_boundary(d, src, 0, AddressLimit::new(0)) };
        assert_eq!(ret, Ok(d));
        let ret = unsafe { copy_to_boundary(d, src, 0, AddressLimit::new(0)) };
        assert_eq!(ret, Ok(d));
        assert_eq!(dst, [7; 4]);
    }
}
