//! Size-tier classification and per-primitive tuning.

use crate::access::WORD_MASK;
use crate::geometry::CacheGeometry;

/// Execution tier chosen before any alignment work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Byte-wise, no prefetch.
    Tiny,
    /// Co-aligned and short: unrolled word ladder, no prefetch.
    FastAligned,
    /// Full alignment, prefetch, bulk and tail pipeline.
    General,
}

/// Length thresholds of one primitive. `fast == 0` disables the fast tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tiers {
    pub tiny: usize,
    pub fast: usize,
}

/// Cost model of one primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuning {
    pub tiers: Tiers,
    /// Honour the geometry's write-alignment granularity.
    pub write_align: bool,
    pub prefetch: bool,
}

impl Tuning {
    #[inline]
    pub const fn copy_write_align(&self, geometry: &CacheGeometry) -> usize {
        if self.write_align {
            geometry.copy_write_align.bytes()
        } else {
            0
        }
    }

    #[inline]
    pub const fn fill_write_align(&self, geometry: &CacheGeometry) -> usize {
        if self.write_align {
            geometry.fill_write_align.bytes()
        } else {
            0
        }
    }
}

pub const COPY: Tuning = Tuning {
    tiers: Tiers { tiny: 8, fast: 96 },
    write_align: true,
    prefetch: true,
};

/// Boundary-crossing copies. Short transfers dominate, so the prefetch-free
/// ladder covers more of them and write alignment is skipped.
pub const BOUNDARY: Tuning = Tuning {
    tiers: Tiers { tiny: 16, fast: 256 },
    write_align: false,
    prefetch: true,
};

pub const FILL: Tuning = Tuning {
    tiers: Tiers { tiny: 8, fast: 128 },
    write_align: true,
    prefetch: true,
};

/// Baseline copy: no fast tier, no write alignment.
pub const BASELINE_COPY: Tuning = Tuning {
    tiers: Tiers { tiny: 4, fast: 0 },
    write_align: false,
    prefetch: true,
};

pub const BASELINE_FILL: Tuning = Tuning {
    tiers: Tiers { tiny: 4, fast: 0 },
    write_align: false,
    prefetch: false,
};

/// Tier of a copy of `len` bytes between addresses `src` and `dst`.
#[inline(always)]
pub const fn classify(len: usize, src: usize, dst: usize, tiers: &Tiers) -> Tier {
    if len < tiers.tiny {
        Tier::Tiny
    } else if len < tiers.fast && (src ^ dst) & WORD_MASK == 0 {
        Tier::FastAligned
    } else {
        Tier::General
    }
}

/// Tier of a single-sided operation of `len` bytes.
#[inline(always)]
pub const fn classify_fill(len: usize, tiers: &Tiers) -> Tier {
    if len < tiers.tiny {
        Tier::Tiny
    } else if len < tiers.fast {
        Tier::FastAligned
    } else {
        Tier::General
    }
}
