//! Cache and platform geometry.
//!
//! A [`Platform`] bundles the architecture revision, instruction encoding,
//! wide-vector availability and the [`CacheGeometry`] tuning constants. The
//! transfer engines never branch on the revision directly: they read the
//! geometry and pick one statically dispatched implementation per line size.
//!
//! The build profile is chosen with Cargo features (`armv4`..`armv7`,
//! `line-32`/`line-64`, `thumb2`, `neon`) and the compile-time environment
//! variable `FASTKMEM_PREFETCH_DISTANCE`. Invalid combinations are rejected by
//! const assertions, so an unsupported geometry never reaches runtime.

use core::fmt;
use std::sync::OnceLock;

use crate::error::GeometryError;

// =============================================================================
// ARCHITECTURE DESCRIPTORS
// =============================================================================

/// The four supported generations of the architecture family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArchRevision {
    V4,
    V5,
    V6,
    V7,
}

impl ArchRevision {
    /// Cache preload hints exist from V5 onwards.
    #[inline]
    pub const fn has_prefetch(self) -> bool {
        !matches!(self, ArchRevision::V4)
    }

    /// The dual (Thumb-2) encoding exists from V6 onwards.
    #[inline]
    pub const fn has_thumb2(self) -> bool {
        matches!(self, ArchRevision::V6 | ArchRevision::V7)
    }

    #[inline]
    pub const fn has_wide_vector(self) -> bool {
        matches!(self, ArchRevision::V7)
    }
}

/// Instruction encoding the kernel is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Arm,
    Thumb2,
}

/// L1 cache line size. One bulk block equals one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineSize {
    B32,
    B64,
}

impl LineSize {
    #[inline]
    pub const fn bytes(self) -> usize {
        match self {
            LineSize::B32 => 32,
            LineSize::B64 => 64,
        }
    }

    /// Machine words per line, i.e. the register block of the bulk loop.
    #[inline]
    pub const fn words(self) -> usize {
        self.bytes() / crate::access::WORD_BYTES
    }

    pub const fn from_bytes(bytes: usize) -> Result<Self, GeometryError> {
        match bytes {
            32 => Ok(LineSize::B32),
            64 => Ok(LineSize::B64),
            other => Err(GeometryError::UnsupportedLineSize(other)),
        }
    }
}

/// Destination padding applied before the steady-state loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteAlign {
    Off,
    B8,
    B16,
    B32,
}

impl WriteAlign {
    /// Granularity in bytes; `0` means disabled.
    #[inline]
    pub const fn bytes(self) -> usize {
        match self {
            WriteAlign::Off => 0,
            WriteAlign::B8 => 8,
            WriteAlign::B16 => 16,
            WriteAlign::B32 => 32,
        }
    }
}

// =============================================================================
// CACHE GEOMETRY
// =============================================================================

pub const DEFAULT_PREFETCH_DISTANCE: usize = 3;
pub const MAX_PREFETCH_DISTANCE: usize = 16;

/// Tuning constants baked into the engines for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheGeometry {
    pub line: LineSize,
    /// `false` substitutes a no-op for every prefetch.
    pub prefetch: bool,
    /// Lines kept in flight ahead of the line being consumed.
    pub prefetch_distance: usize,
    /// Lines issued on entry to the bulk phase before the catch-up loop.
    pub early_prefetch: usize,
    pub copy_write_align: WriteAlign,
    pub fill_write_align: WriteAlign,
}

impl CacheGeometry {
    /// Canonical geometry for a revision.
    pub const fn for_revision(revision: ArchRevision) -> Self {
        let (line, copy_write_align, fill_write_align) = match revision {
            ArchRevision::V4 | ArchRevision::V5 => (LineSize::B32, WriteAlign::Off, WriteAlign::Off),
            ArchRevision::V6 => (LineSize::B32, WriteAlign::B8, WriteAlign::B32),
            ArchRevision::V7 => (LineSize::B64, WriteAlign::Off, WriteAlign::B8),
        };
        Self {
            line,
            prefetch: revision.has_prefetch(),
            prefetch_distance: DEFAULT_PREFETCH_DISTANCE,
            early_prefetch: early_prefetch_for(line),
            copy_write_align,
            fill_write_align,
        }
    }

    pub const fn with_line(mut self, line: LineSize) -> Self {
        self.line = line;
        self.early_prefetch = early_prefetch_for(line);
        self
    }

    pub const fn with_prefetch_distance(mut self, distance: usize) -> Self {
        self.prefetch_distance = distance;
        self
    }

    /// Bytes covered by one prefetch distance. Shorter transfers skip
    /// prefetching altogether.
    #[inline]
    pub const fn prefetch_span(&self) -> usize {
        self.prefetch_distance * self.line.bytes()
    }

    pub const fn check(&self) -> Result<(), GeometryError> {
        if self.prefetch_distance == 0 {
            return Err(GeometryError::ZeroPrefetchDistance);
        }
        if self.prefetch_distance > MAX_PREFETCH_DISTANCE {
            return Err(GeometryError::PrefetchDistanceTooLarge(self.prefetch_distance));
        }
        Ok(())
    }
}

// Early preloads cover 96 bytes of look-ahead on either line size; the
// catch-up loop tops up to the configured distance.
const fn early_prefetch_for(line: LineSize) -> usize {
    match line {
        LineSize::B32 => 3,
        LineSize::B64 => 2,
    }
}

// =============================================================================
// PLATFORM
// =============================================================================

/// Complete target description consumed by every primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub revision: ArchRevision,
    pub encoding: Encoding,
    /// Double-word block transfers are available.
    pub wide_vector: bool,
    pub geometry: CacheGeometry,
}

impl Platform {
    /// Profile selected by the build configuration.
    pub const BUILD: Platform = build_profile();

    pub const fn new(revision: ArchRevision) -> Self {
        Self {
            revision,
            encoding: Encoding::Arm,
            wide_vector: false,
            geometry: CacheGeometry::for_revision(revision),
        }
    }

    pub const fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub const fn with_wide_vector(mut self, wide_vector: bool) -> Self {
        self.wide_vector = wide_vector;
        self
    }

    pub const fn with_line(mut self, line: LineSize) -> Self {
        self.geometry = self.geometry.with_line(line);
        self
    }

    pub const fn with_prefetch_distance(mut self, distance: usize) -> Self {
        self.geometry = self.geometry.with_prefetch_distance(distance);
        self
    }

    pub const fn check(&self) -> Result<(), GeometryError> {
        if let Err(err) = self.geometry.check() {
            return Err(err);
        }
        if self.geometry.prefetch && !self.revision.has_prefetch() {
            return Err(GeometryError::PrefetchUnsupported(self.revision));
        }
        if self.wide_vector && !self.revision.has_wide_vector() {
            return Err(GeometryError::WideVectorUnsupported(self.revision));
        }
        if matches!(self.encoding, Encoding::Thumb2) && !self.revision.has_thumb2() {
            return Err(GeometryError::Thumb2Unsupported(self.revision));
        }
        Ok(())
    }

    /// Platform used by the primitives that take no explicit platform.
    ///
    /// Resolved once. With the `runtime-detect` feature the build profile is
    /// refined from the host; otherwise it is returned as is.
    pub fn active() -> &'static Platform {
        static ACTIVE: OnceLock<Platform> = OnceLock::new();
        ACTIVE.get_or_init(|| {
            let platform = select();
            log::debug!("fastkmem platform: {platform}");
            platform
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = &self.geometry;
        write!(
            f,
            "{:?}/{:?}: {}-byte lines, ",
            self.revision,
            self.encoding,
            g.line.bytes()
        )?;
        if g.prefetch {
            write!(f, "prefetch {} lines (early {}), ", g.prefetch_distance, g.early_prefetch)?;
        } else {
            f.write_str("no prefetch, ")?;
        }
        write!(
            f,
            "copy align {}, fill align {}{}",
            g.copy_write_align.bytes(),
            g.fill_write_align.bytes(),
            if self.wide_vector { ", wide" } else { "" }
        )
    }
}

// =============================================================================
// BUILD PROFILE
// =============================================================================

const SELECTED_REVISIONS: usize = cfg!(feature = "armv4") as usize
    + cfg!(feature = "armv5") as usize
    + cfg!(feature = "armv6") as usize
    + cfg!(feature = "armv7") as usize;

const _: () = assert!(
    SELECTED_REVISIONS <= 1,
    "select at most one of the armv4, armv5, armv6, armv7 features"
);
const _: () = assert!(
    !(cfg!(feature = "line-32") && cfg!(feature = "line-64")),
    "line-32 and line-64 are mutually exclusive"
);
const _: () = assert!(
    Platform::BUILD.check().is_ok(),
    "the selected features describe an unsupported cache geometry"
);

const fn build_revision() -> ArchRevision {
    if cfg!(feature = "armv4") {
        ArchRevision::V4
    } else if cfg!(feature = "armv5") {
        ArchRevision::V5
    } else if cfg!(feature = "armv7") {
        ArchRevision::V7
    } else {
        ArchRevision::V6
    }
}

const fn build_profile() -> Platform {
    let mut platform = Platform::new(build_revision());
    if cfg!(feature = "line-32") {
        platform = platform.with_line(LineSize::B32);
    } else if cfg!(feature = "line-64") {
        platform = platform.with_line(LineSize::B64);
    }
    if cfg!(feature = "thumb2") {
        platform = platform.with_encoding(Encoding::Thumb2);
    }
    if cfg!(feature = "neon") {
        platform = platform.with_wide_vector(true);
    }
    if let Some(distance) = option_env!("FASTKMEM_PREFETCH_DISTANCE") {
        platform = platform.with_prefetch_distance(parse_distance(distance));
    }
    platform
}

const fn parse_distance(text: &str) -> usize {
    let bytes = text.as_bytes();
    assert!(!bytes.is_empty(), "FASTKMEM_PREFETCH_DISTANCE is empty");
    let mut value = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        assert!(digit.is_ascii_digit(), "FASTKMEM_PREFETCH_DISTANCE must be a decimal number");
        value = value * 10 + (digit - b'0') as usize;
        i += 1;
    }
    value
}

// =============================================================================
// RUNTIME SELECTION
// =============================================================================

#[cfg(not(feature = "runtime-detect"))]
fn select() -> Platform {
    Platform::BUILD
}

#[cfg(feature = "runtime-detect")]
fn select() -> Platform {
    detect::refine(Platform::BUILD)
}

#[cfg(feature = "runtime-detect")]
mod detect {
    use super::{LineSize, Platform};

    const LINE_SIZE_PATH: &str = "/sys/devices/system/cpu/cpu0/cache/index0/coherency_line_size";

    pub(super) fn refine(build: Platform) -> Platform {
        refine_with(build, host_line_size(), host_wide_vector())
    }

    /// Apply what was found on the host to the build profile.
    pub(super) fn refine_with(build: Platform, line_bytes: Option<usize>, wide: bool) -> Platform {
        let mut platform = build;

        match line_bytes {
            Some(bytes) => match LineSize::from_bytes(bytes) {
                Ok(line) => platform = platform.with_line(line),
                Err(err) => log::warn!(
                    "{err}; keeping {}-byte lines from the build profile",
                    build.geometry.line.bytes()
                ),
            },
            None => log::debug!("host cache line size unavailable; keeping build profile"),
        }

        if wide && platform.revision.has_wide_vector() {
            platform = platform.with_wide_vector(true);
        }

        platform
    }

    fn host_line_size() -> Option<usize> {
        let text = std::fs::read_to_string(LINE_SIZE_PATH).ok()?;
        text.trim().parse().ok()
    }

    #[cfg(target_arch = "aarch64")]
    fn host_wide_vector() -> bool {
        std::arch::is_aarch64_feature_detected!("neon")
    }

    #[cfg(target_arch = "x86_64")]
    fn host_wide_vector() -> bool {
        std::arch::is_x86_feature_detected!("sse2")
    }

    #[cfg(not(any(target_arch = "aarch64", target_arch = "x86_64")))]
    fn host_wide_vector() -> bool {
        false
    }

}
