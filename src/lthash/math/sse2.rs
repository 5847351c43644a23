//! SSE2 math backend: 128-bit vectors, two u64 words per step.
//!
//! Unaligned loads and stores throughout, so buffers carry no alignment
//! requirement. Any sub-vector tail falls back to the scalar word loop;
//! results are bit-identical to the scalar backend.

use core::arch::x86_64::*;

use super::scalar;
use crate::lthash::bits::ElementBits;

const LANE: usize = 16;

#[target_feature(enable = "sse2")]
pub(super) unsafe fn add<B: ElementBits>(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    let vecs = dst.len() / LANE;
    let d = dst.as_mut_ptr();
    let s = src.as_ptr();

    if B::NEEDS_PADDING {
        let mask = _mm_set1_epi64x(B::DATA_MASK as i64);
        for i in 0..vecs {
            let a = _mm_loadu_si128(d.add(i * LANE) as *const __m128i);
            let b = _mm_loadu_si128(s.add(i * LANE) as *const __m128i);
            let sum = _mm_and_si128(_mm_add_epi64(a, b), mask);
            _mm_storeu_si128(d.add(i * LANE) as *mut __m128i, sum);
        }
    } else {
        for i in 0..vecs {
            let a = _mm_loadu_si128(d.add(i * LANE) as *const __m128i);
            let b = _mm_loadu_si128(s.add(i * LANE) as *const __m128i);
            let sum = if B::BITS == 16 {
                _mm_add_epi16(a, b)
            } else {
                _mm_add_epi32(a, b)
            };
            _mm_storeu_si128(d.add(i * LANE) as *mut __m128i, sum);
        }
    }

    scalar::add::<B>(&mut dst[vecs * LANE..], &src[vecs * LANE..]);
}

#[target_feature(enable = "sse2")]
pub(super) unsafe fn sub<B: ElementBits>(dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    let vecs = dst.len() / LANE;
    let d = dst.as_mut_ptr();
    let s = src.as_ptr();

    if B::NEEDS_PADDING {
        let mask = _mm_set1_epi64x(B::DATA_MASK as i64);
        let padding = _mm_set1_epi64x(!B::DATA_MASK as i64);
        for i in 0..vecs {
            let a = _mm_loadu_si128(d.add(i * LANE) as *const __m128i);
            let b = _mm_loadu_si128(s.add(i * LANE) as *const __m128i);
            let inv_b = _mm_and_si128(_mm_sub_epi64(padding, b), mask);
            let diff = _mm_and_si128(_mm_add_epi64(a, inv_b), mask);
            _mm_storeu_si128(d.add(i * LANE) as *mut __m128i, diff);
        }
    } else {
        for i in 0..vecs {
            let a = _mm_loadu_si128(d.add(i * LANE) as *const __m128i);
            let b = _mm_loadu_si128(s.add(i * LANE) as *const __m128i);
            let diff = if B::BITS == 16 {
                _mm_sub_epi16(a, b)
            } else {
                _mm_sub_epi32(a, b)
            };
            _mm_storeu_si128(d.add(i * LANE) as *mut __m128i, diff);
        }
    }

    scalar::sub::<B>(&mut dst[vecs * LANE..], &src[vecs * LANE..]);
}

#[target_feature(enable = "sse2")]
pub(super) unsafe fn check_padding<B: ElementBits>(data: &[u8]) -> bool {
    let vecs = data.len() / LANE;
    let p = data.as_ptr();
    let padding = _mm_set1_epi64x(!B::DATA_MASK as i64);
    let zero = _mm_setzero_si128();

    for i in 0..vecs {
        let v = _mm_loadu_si128(p.add(i * LANE) as *const __m128i);
        let stray = _mm_and_si128(v, padding);
        if _mm_movemask_epi8(_mm_cmpeq_epi8(stray, zero)) != 0xffff {
            return false;
        }
    }

    scalar::check_padding::<B>(&data[vecs * LANE..])
}

#[target_feature(enable = "sse2")]
pub(super) unsafe fn clear_padding<B: ElementBits>(data: &mut [u8]) {
    let vecs = data.len() / LANE;
    let p = data.as_mut_ptr();
    let mask = _mm_set1_epi64x(B::DATA_MASK as i64);

    for i in 0..vecs {
        let v = _mm_loadu_si128(p.add(i * LANE) as *const __m128i);
        _mm_storeu_si128(p.add(i * LANE) as *mut __m128i, _mm_and_si128(v, mask));
    }

    scalar::clear_padding::<B>(&mut data[vecs * LANE..]);
}
