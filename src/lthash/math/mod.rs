//! Packed-arithmetic backends for the LtHash checksum.
//!
//! Three interchangeable implementations of the same element-wise modular
//! add/sub (and, for padded layouts, padding check/clear): a portable
//! scalar loop, SSE2, and AVX2. All produce byte-identical results; the
//! SIMD backends exist purely for speed on the multi-kilobyte checksums.
//!
//! CPU feature detection happens once, when a backend is picked at
//! engine construction; the hot path is a fixed `match` with no dynamic
//! dispatch.

mod scalar;

#[cfg(target_arch = "x86_64")]
mod avx2;
#[cfg(target_arch = "x86_64")]
mod sse2;

use crate::lthash::bits::ElementBits;

/// Which math backend an [`LtHash`](crate::LtHash) instance uses.
///
/// `detect()` picks the fastest one the running CPU supports; a specific
/// backend can be pinned via
/// [`LtHash::with_backend`](crate::LtHash::with_backend), e.g. to compare
/// backends in tests. Pinned or detected, results are identical.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// Portable u64 word loop; always available.
    Scalar,
    /// 128-bit vectors; baseline on x86_64.
    Sse2,
    /// 256-bit vectors; requires AVX2.
    Avx2,
}

impl Backend {
    /// The fastest backend supported by the running CPU.
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if std::arch::is_x86_feature_detected!("avx2") {
                Backend::Avx2
            } else {
                Backend::Sse2
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            Backend::Scalar
        }
    }

    /// Whether this backend can run on the current CPU.
    pub fn is_available(self) -> bool {
        match self {
            Backend::Scalar => true,
            #[cfg(target_arch = "x86_64")]
            Backend::Sse2 => true,
            #[cfg(target_arch = "x86_64")]
            Backend::Avx2 => std::arch::is_x86_feature_detected!("avx2"),
            #[cfg(not(target_arch = "x86_64"))]
            _ => false,
        }
    }
}

/// A pinned backend plus the dispatch into it.
///
/// Buffer lengths must be equal and a multiple of 8; the checksum sizing
/// checks at `LtHash` construction guarantee this, so violations here are
/// programmer errors.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MathEngine {
    backend: Backend,
}

impl MathEngine {
    /// # Panics
    /// If `backend` is not available on the running CPU.
    pub(crate) fn new(backend: Backend) -> Self {
        assert!(
            backend.is_available(),
            "math backend {backend:?} is not available on this CPU"
        );
        MathEngine { backend }
    }

    pub(crate) fn backend(self) -> Backend {
        self.backend
    }

    pub(crate) fn add<B: ElementBits>(self, dst: &mut [u8], src: &[u8]) {
        debug_assert_eq!(dst.len(), src.len());
        debug_assert_eq!(dst.len() % 8, 0);
        match self.backend {
            Backend::Scalar => scalar::add::<B>(dst, src),
            #[cfg(target_arch = "x86_64")]
            Backend::Sse2 => unsafe { sse2::add::<B>(dst, src) },
            #[cfg(target_arch = "x86_64")]
            Backend::Avx2 => unsafe { avx2::add::<B>(dst, src) },
            #[cfg(not(target_arch = "x86_64"))]
            _ => unreachable!("backend availability checked at construction"),
        }
    }

    pub(crate) fn sub<B: ElementBits>(self, dst: &mut [u8], src: &[u8]) {
        debug_assert_eq!(dst.len(), src.len());
        debug_assert_eq!(dst.len() % 8, 0);
        match self.backend {
            Backend::Scalar => scalar::sub::<B>(dst, src),
            #[cfg(target_arch = "x86_64")]
            Backend::Sse2 => unsafe { sse2::sub::<B>(dst, src) },
            #[cfg(target_arch = "x86_64")]
            Backend::Avx2 => unsafe { avx2::sub::<B>(dst, src) },
            #[cfg(not(target_arch = "x86_64"))]
            _ => unreachable!("backend availability checked at construction"),
        }
    }

    /// True iff every padding bit in `data` is zero. Only called for
    /// padded layouts.
    pub(crate) fn check_padding<B: ElementBits>(self, data: &[u8]) -> bool {
        debug_assert!(B::NEEDS_PADDING);
        debug_assert_eq!(data.len() % 8, 0);
        match self.backend {
            Backend::Scalar => scalar::check_padding::<B>(data),
            #[cfg(target_arch = "x86_64")]
            Backend::Sse2 => unsafe { sse2::check_padding::<B>(data) },
            #[cfg(target_arch = "x86_64")]
            Backend::Avx2 => unsafe { avx2::check_padding::<B>(data) },
            #[cfg(not(target_arch = "x86_64"))]
            _ => unreachable!("backend availability checked at construction"),
        }
    }

    /// Zero every padding bit in `data`. Only called for padded layouts.
    pub(crate) fn clear_padding<B: ElementBits>(self, data: &mut [u8]) {
        debug_assert!(B::NEEDS_PADDING);
        debug_assert_eq!(data.len() % 8, 0);
        match self.backend {
            Backend::Scalar => scalar::clear_padding::<B>(data),
            #[cfg(target_arch = "x86_64")]
            Backend::Sse2 => unsafe { sse2::clear_padding::<B>(data) },
            #[cfg(target_arch = "x86_64")]
            Backend::Avx2 => unsafe { avx2::clear_padding::<B>(data) },
            #[cfg(not(target_arch = "x86_64"))]
            _ => unreachable!("backend availability checked at construction"),
        }
    }
}
