//! Safe slice wrappers
//!
//! Safe Rust entry points over the raw-pointer primitives, operating on byte
//! slices.
#![allow(unsafe_code)]

use crate::access::FaultProbe;
use crate::error::PartialCopy;
use crate::page::Page;

/// Copy bytes from source to destination
///
/// Copies `min(dest.len(), src.len())` bytes and returns that count.
///
/// # Examples
/// ```
/// use fastkmem::mem::copy;
/// let mut dest = [0u8; 5];
/// let src = b"hello";
/// assert_eq!(copy(&mut dest, src), 5);
/// assert_eq!(&dest, b"hello");
/// ```
pub fn copy(dest: &mut [u8], src: &[u8]) -> usize {
    let n = dest.len().min(src.len());
    // SAFETY: both slices cover `n` bytes and cannot overlap.
    unsafe { crate::memcpy::copy(dest.as_mut_ptr(), src.as_ptr(), n) };
    n
}

/// Fill a byte slice with a constant value
///
/// Returns the number of bytes set.
///
/// # Examples
/// ```
/// use fastkmem::mem::fill;
/// let mut buf = [0u8; 5];
/// fill(&mut buf, b'x');
/// assert_eq!(&buf, b"xxxxx");
/// ```
pub fn fill(dest: &mut [u8], value: u8) -> usize {
    // SAFETY: the slice covers `dest.len()` bytes.
    unsafe { crate::memset::fill(dest.as_mut_ptr(), value, dest.len()) };
    dest.len()
}

/// Zero a byte slice
///
/// # Examples
/// ```
/// use fastkmem::mem::zero;
/// let mut buf = *b"secret";
/// zero(&mut buf);
/// assert_eq!(buf, [0; 6]);
/// ```
pub fn zero(dest: &mut [u8]) -> usize {
    // SAFETY: the slice covers `dest.len()` bytes.
    unsafe { crate::memset::zero(dest.as_mut_ptr(), dest.len()) };
    dest.len()
}

/// Copy a whole page
pub fn copy_page(dest: &mut Page, src: &Page) {
    // SAFETY: `Page` is page-aligned and exactly one page long.
    unsafe { crate::page::copy_page(dest.0.as_mut_ptr(), src.0.as_ptr()) };
}

/// Copy from a slice on the unprivileged side of a boundary
///
/// Every source access is checked by `probe`. Returns the number of bytes
/// copied, or how far the copy got before the first refused byte.
///
/// # Examples
/// ```
/// use fastkmem::access::AddressLimit;
/// use fastkmem::mem::copy_from_boundary;
/// let src = [7u8; 32];
/// let mut dest = [0u8; 32];
/// let limit = AddressLimit::new(src.as_ptr() as usize + 20);
/// let err = copy_from_boundary(&mut dest, &src, limit).unwrap_err();
/// assert_eq!(err.remaining, 12);
/// assert_eq!(&dest[..20], &[7; 20]);
/// ```
pub fn copy_from_boundary<P: FaultProbe>(
    dest: &mut [u8],
    src: &[u8],
    probe: P,
) -> Result<usize, PartialCopy> {
    let n = dest.len().min(src.len());
    // SAFETY: both slices cover `n` bytes and cannot overlap.
    unsafe { crate::usercopy::copy_from_boundary(dest.as_mut_ptr(), src.as_ptr(), n, probe) }?;
    Ok(n)
}

/// Copy to a slice on the unprivileged side of a boundary
///
/// Every destination access is checked by `probe`.
pub fn copy_to_boundary<P: FaultProbe>(
    dest: &mut [u8],
    src: &[u8],
    probe: P,
) -> Result<usize, PartialCopy> {
    let n = dest.len().min(src.len());
    // SAFETY: both slices cover `n` bytes and cannot overlap.
    unsafe { crate::usercopy::copy_to_boundary(dest.as_mut_ptr(), src.as_ptr(), n, probe) }?;
    Ok(n)
}
