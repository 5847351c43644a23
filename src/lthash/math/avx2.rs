//! AVX2 math backend: 256-bit vectors, four u64 words per step.
//!
//! Same semantics and tail handling as the SSE2 backend, twice the lane
//! width. Padding checks use `vptest` against the padding mask.

use core::arch::x86_64::*;

use super::scalar;
use crate::lthash::bits::ElementBits;

const LANE: usize = 32;

#[target_feature(enable = "avx2")]
pub(super) unsafe fn add<B: ElementBits>(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    let vecs = dst.len() / LANE;
    let d = dst.as_mut_ptr();
    let s = src.as_ptr();

    if B::NEEDS_PADDING {
        let mask = _mm256_set1_epi64x(B::DATA_MASK as i64);
        for i in 0..vecs {
            let a = _mm256_loadu_si256(d.add(i * LANE) as *const __m256i);
            let b = _mm256_loadu_si256(s.add(i * LANE) as *const __m256i);
            let sum = _mm256_and_si256(_mm256_add_epi64(a, b), mask);
            _mm256_storeu_si256(d.add(i * LANE) as *mut __m256i, sum);
        }
    } else {
        for i in 0..vecs {
            let a = _mm256_loadu_si256(d.add(i * LANE) as *const __m256i);
            let b = _mm256_loadu_si256(s.add(i * LANE) as *const __m256i);
            let sum = if B::BITS == 16 {
                _mm256_add_epi16(a, b)
            } else {
                _mm256_add_epi32(a, b)
            };
            _mm256_storeu_si256(d.add(i * LANE) as *mut __m256i, sum);
        }
    }

    scalar::add::<B>(&mut dst[vecs * LANE..], &src[vecs * LANE..]);
}

#[target_feature(enable = "avx2")]
pub(super) unsafe fn sub<B: ElementBits>(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    let vecs = dst.len() / LANE;
    let d = dst.as_mut_ptr();
    let s = src.as_ptr();

    if B::NEEDS_PADDING {
        let mask = _mm256_set1_epi64x(B::DATA_MASK as i64);
        let padding = _mm256_set1_epi64x(!B::DATA_MASK as i64);
        for i in 0..vecs {
            let a = _mm256_loadu_si256(d.add(i * LANE) as *const __m256i);
            let b = _mm256_loadu_si256(s.add(i * LANE) as *const __m256i);
            let inv_b = _mm256_and_si256(_mm256_sub_epi64(padding, b), mask);
            let diff = _mm256_and_si256(_mm256_add_epi64(a, inv_b), mask);
            _mm256_storeu_si256(d.add(i * LANE) as *mut __m256i, diff);
        }
    } else {
        for i in 0..vecs {
            let a = _mm256_loadu_si256(d.add(i * LANE) as *const __m256i);
            let b = _mm256_loadu_si256(s.add(i * LANE) as *const __m256i);
            let diff = if B::BITS == 16 {
                _mm256_sub_epi16(a, b)
            } else {
                _mm256_sub_epi32(a, b)
            };
            _mm256_storeu_si256(d.add(i * LANE) as *mut __m256i, diff);
        }
    }

    scalar::sub::<B>(&mut dst[vecs * LANE..], &src[vecs * LANE..]);
}

#[target_feature(enable = "avx2")]
pub(super) unsafe fn check_padding<B: ElementBits>(data: &[u8]) -> bool {
    let vecs = data.len() / LANE;
    let p = data.as_ptr();
    let padding = _mm256_set1_epi64x(!B::DATA_MASK as i64);

    for i in 0..vecs {
        let v = _mm256_loadu_si256(p.add(i * LANE) as *const __m256i);
        if _mm256_testz_si256(v, padding) == 0 {
            return false;
        }
    }

    scalar::check_padding::<B>(&data[vecs * LANE..])
}

#[target_feature(enable = "avx2")]
pub(super) unsafe fn clear_padding<B: ElementBits>(data: &mut [u8]) {
    let vecs = data.len() / LANE;
    let p = data.as_mut_ptr();
    let mask = _mm256_set1_epi64x(B::DATA_MASK as i64);

    for i in 0..vecs {
        let v = _mm256_loadu_si256(p.add(i * LANE) as *const __m256i);
        _mm256_storeu_si256(p.add(i * LANE) as *mut __m256i, _mm256_and_si256(v, mask));
    }

    scalar::clear_padding::<B>(&mut data[vecs * LANE..]);
}
