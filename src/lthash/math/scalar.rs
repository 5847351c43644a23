//! Portable math backend, one u64 word at a time.
//!
//! Words are read and written as little-endian byte chunks, which makes
//! the checksum layout identical on big-endian hosts.
//!
//! Unpadded layouts (16/32-bit elements) split each word into two
//! interleaved lane groups; adding the groups separately and re-masking
//! keeps carries from crossing element boundaries. Padded layouts (20-bit
//! elements) let carries spill into the padding bits and clear them with
//! `DATA_MASK` afterwards. Subtraction is addition of the per-element
//! two's complement, lifted into the same masked arithmetic.

use crate::lthash::bits::ElementBits;

#[inline(always)]
pub(super) fn add_word<B: ElementBits>(a: u64, b: u64) -> u64 {
    if B::NEEDS_PADDING {
        a.wrapping_add(b) & B::DATA_MASK
    } else {
        let g1 = B::GROUP_MASK;
        let g2 = !g1;
        let o1 = (a & g1).wrapping_add(b & g1) & g1;
        let o2 = (a & g2).wrapping_add(b & g2) & g2;
        o1 | o2
    }
}

#[inline(always)]
pub(super) fn sub_word<B: ElementBits>(a: u64, b: u64) -> u64 {
    if B::NEEDS_PADDING {
        // a - b == a + (-b mod 2^BITS), with the negation computed inside
        // the padded layout: ~DATA_MASK - b borrows through each element
        // without touching its neighbours.
        let inv_b = (!B::DATA_MASK).wrapping_sub(b) & B::DATA_MASK;
        a.wrapping_add(inv_b) & B::DATA_MASK
    } else {
        // The zero gap lanes of the opposite group mask absorb each
        // lane's borrow.
        let g1 = B::GROUP_MASK;
        let g2 = !g1;
        let o1 = (a & g1).wrapping_add(g2.wrapping_sub(b & g1)) & g1;
        let o2 = (a & g2).wrapping_add(g1.wrapping_sub(b & g2)) & g2;
        o1 | o2
    }
}

pub(super) fn add<B: ElementBits>(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.chunks_exact_mut(8).zip(src.chunks_exact(8)) {
        let a = u64::from_le_bytes(d.try_into().unwrap());
        let b = u64::from_le_bytes(s.try_into().unwrap());
        d.copy_from_slice(&add_word::<B>(a, b).to_le_bytes());
    }
}

pub(super) fn sub<B: ElementBits>(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.chunks_exact_mut(8).zip(src.chunks_exact(8)) {
        let a = u64::from_le_bytes(d.try_into().unwrap());
        let b = u64::from_le_bytes(s.try_into().unwrap());
        d.copy_from_slice(&sub_word::<B>(a, b).to_le_bytes());
    }
}

pub(super) fn check_padding<B: ElementBits>(data: &[u8]) -> bool {
    data.chunks_exact(8)
        .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
        .all(|word| word & !B::DATA_MASK == 0)
}

pub(super) fn clear_padding<B: ElementBits>(data: &mut [u8]) {
    for chunk in data.chunks_exact_mut(8) {
        let word = u64::from_le_bytes(chunk.try_into().unwrap());
        chunk.copy_from_slice(&(word & B::DATA_MASK).to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lthash::bits::{B16, B20, B32};

    #[test]
    fn b16_lanes_wrap_independently() {
        // Lane 0 overflows, lane 1 stays put.
        let a = 0x0000_0000_0001_ffff_u64;
        let b = 0x0000_0000_0000_0001_u64;
        assert_eq!(add_word::<B16>(a, b), 0x0000_0000_0001_0000);
        assert_eq!(sub_word::<B16>(0, 1), 0x0000_0000_0000_ffff);
    }

    #[test]
    fn b32_lanes_wrap_independently() {
        let a = 0x0000_0001_ffff_ffff_u64;
        assert_eq!(add_word::<B32>(a, 1), 0x0000_0001_0000_0000);
        assert_eq!(sub_word::<B32>(0, 1), 0x0000_0000_ffff_ffff);
    }

    #[test]
    fn b20_addition_stays_inside_mask() {
        // All-ones elements plus one: every element wraps to zero, padding
        // stays clear.
        let a = B20::DATA_MASK;
        let ones = 0x0000_0400_0020_0001_u64; // value 1 in each of the 3 lanes
        let sum = add_word::<B20>(a, ones);
        assert_eq!(sum & !B20::DATA_MASK, 0);
        assert_eq!(sum, 0);
    }

    #[test]
    fn b20_sub_is_inverse_of_add() {
        let vals = [
            (0x000f_ffff_u64, 1u64),
            (0, 0x000f_ffff),
            (0x0003_1400_0220_4001, 0x0001_0400_0120_0001),
        ];
        for (x, y) in vals {
            let x = x & B20::DATA_MASK;
            let y = y & B20::DATA_MASK;
            assert_eq!(sub_word::<B20>(add_word::<B20>(x, y), y), x);
        }
    }

    #[test]
    fn padding_check_and_clear() {
        let mut buf = (B20::DATA_MASK | (1 << 20)).to_le_bytes().to_vec();
        assert!(!check_padding::<B20>(&buf));
        clear_padding::<B20>(&mut buf);
        assert!(check_padding::<B20>(&buf));
        assert_eq!(
            u64::from_le_bytes(buf.as_slice().try_into().unwrap()),
            B20::DATA_MASK
        );
    }
}
