//! BLAKE2b (RFC 7693) with full parameter-block control.
//!
//! The streaming façade [`Blake2b`] covers the usual keyed/unkeyed hashing
//! with 1..=64 byte digests. The crate-internal [`State`] additionally
//! exposes the whole 64-byte parameter block, which the BLAKE2Xb expansion
//! needs to vary `node_off`, `xof_digest_len`, and friends per output
//! block; general-purpose BLAKE2 crates do not expose those fields.
//!
//! All multi-byte parameter fields are little-endian on the wire. The
//! state words are mixed as `h[i] = IV[i] ^ LE(param)[i]`.

use zeroize::Zeroize;

use crate::error::HashError;

/// BLAKE2b compression block size in bytes.
pub(crate) const BLOCK_LEN: usize = 128;
/// Largest digest a single BLAKE2b instance can produce.
pub(crate) const MAX_DIGEST_LEN: usize = 64;
/// Largest accepted key.
pub(crate) const MAX_KEY_LEN: usize = 64;
/// Salt length; shorter salts are not accepted, absent salts are all-zero.
pub(crate) const SALT_LEN: usize = 16;
/// Personality length, same convention as the salt.
pub(crate) const PERSONALITY_LEN: usize = 16;

const IV: [u64; 8] = [
    0x6a09e667f3bcc908,
    0xbb67ae8584caa73b,
    0x3c6ef372fe94f82b,
    0xa54ff53a5f1d36f1,
    0x510e527fade682d1,
    0x9b05688c2b3e6c1f,
    0x1f83d9abfb41bd6b,
    0x5be0cd19137e2179,
];

const SIGMA: [[usize; 16]; 12] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
    [11, 8, 12, 0, 5, 2, 15, 13, 10, 14, 3, 6, 7, 1, 9, 4],
    [7, 9, 3, 1, 13, 12, 11, 14, 2, 6, 5, 10, 4, 0, 15, 8],
    [9, 0, 5, 7, 2, 4, 10, 15, 14, 1, 11, 12, 6, 8, 3, 13],
    [2, 12, 6, 10, 0, 11, 8, 3, 4, 13, 7, 5, 15, 14, 1, 9],
    [12, 5, 1, 15, 14, 13, 4, 10, 0, 7, 6, 3, 9, 2, 8, 11],
    [13, 11, 7, 14, 12, 1, 3, 9, 5, 0, 15, 4, 8, 6, 2, 10],
    [6, 15, 14, 9, 11, 3, 0, 8, 12, 2, 13, 7, 1, 4, 10, 5],
    [10, 2, 8, 4, 7, 6, 1, 5, 15, 11, 9, 14, 3, 12, 13, 0],
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [14, 10, 4, 8, 9, 15, 13, 6, 1, 12, 0, 2, 11, 7, 5, 3],
];

/// The 64-byte BLAKE2b parameter block.
///
/// Field order and widths follow the wire layout; `node_off` and
/// `xof_digest_len` together occupy the 8-byte node-offset field of plain
/// BLAKE2b (the BLAKE2X split). The 14 reserved bytes are implicitly zero.
#[derive(Clone, Copy)]
pub(crate) struct Params {
    pub digest_len: u8,
    pub key_len: u8,
    pub fanout: u8,
    pub depth: u8,
    pub leaf_len: u32,
    pub node_off: u32,
    pub xof_digest_len: u32,
    pub node_depth: u8,
    pub inner_len: u8,
    pub salt: [u8; SALT_LEN],
    pub personality: [u8; PERSONALITY_LEN],
}

impl Params {
    /// Sequential-mode parameters for an ordinary hash.
    pub(crate) fn sequential(digest_len: u8) -> Self {
        Params {
            digest_len,
            key_len: 0,
            fanout: 1,
            depth: 1,
            leaf_len: 0,
            node_off: 0,
            xof_digest_len: 0,
            node_depth: 0,
            inner_len: 0,
            salt: [0; SALT_LEN],
            personality: [0; PERSONALITY_LEN],
        }
    }

    /// The block as the eight little-endian words that get XORed into the IV.
    fn words(&self) -> [u64; 8] {
        let w0 = u64::from(self.digest_len)
            | u64::from(self.key_len) << 8
            | u64::from(self.fanout) << 16
            | u64::from(self.depth) << 24
            | u64::from(self.leaf_len) << 32;
        let w1 = u64::from(self.node_off) | u64::from(self.xof_digest_len) << 32;
        let w2 = u64::from(self.node_depth) | u64::from(self.inner_len) << 8;
        [
            w0,
            w1,
            w2,
            0,
            u64::from_le_bytes(self.salt[..8].try_into().unwrap()),
            u64::from_le_bytes(self.salt[8..].try_into().unwrap()),
            u64::from_le_bytes(self.personality[..8].try_into().unwrap()),
            u64::from_le_bytes(self.personality[8..].try_into().unwrap()),
        ]
    }
}

#[inline(always)]
fn g(v: &mut [u64; 16], a: usize, b: usize, c: usize, d: usize, x: u64, y: u64) {
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(x);
    v[d] = (v[d] ^ v[a]).rotate_right(32);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(24);
    v[a] = v[a].wrapping_add(v[b]).wrapping_add(y);
    v[d] = (v[d] ^ v[a]).rotate_right(16);
    v[c] = v[c].wrapping_add(v[d]);
    v[b] = (v[b] ^ v[c]).rotate_right(63);
}

fn compress(h: &mut [u64; 8], block: &[u8; BLOCK_LEN], t: u128, is_last: bool) {
    let mut m = [0u64; 16];
    for (i, chunk) in block.chunks_exact(8).enumerate() {
        m[i] = u64::from_le_bytes(chunk.try_into().unwrap());
    }

    let mut v = [0u64; 16];
    v[..8].copy_from_slice(h);
    v[8..].copy_from_slice(&IV);
    v[12] ^= t as u64;
    v[13] ^= (t >> 64) as u64;
    if is_last {
        v[14] ^= u64::MAX;
    }

    for s in &SIGMA {
        g(&mut v, 0, 4, 8, 12, m[s[0]], m[s[1]]);
        g(&mut v, 1, 5, 9, 13, m[s[2]], m[s[3]]);
        g(&mut v, 2, 6, 10, 14, m[s[4]], m[s[5]]);
        g(&mut v, 3, 7, 11, 15, m[s[6]], m[s[7]]);
        g(&mut v, 0, 5, 10, 15, m[s[8]], m[s[9]]);
        g(&mut v, 1, 6, 11, 12, m[s[10]], m[s[11]]);
        g(&mut v, 2, 7, 8, 13, m[s[12]], m[s[13]]);
        g(&mut v, 3, 4, 9, 14, m[s[14]], m[s[15]]);
    }

    for i in 0..8 {
        h[i] ^= v[i] ^ v[i + 8];
    }
}

/// Incremental BLAKE2b state initialised from an arbitrary parameter block.
#[derive(Clone)]
pub(crate) struct State {
    h: [u64; 8],
    buf: [u8; BLOCK_LEN],
    buf_len: usize,
    counter: u128,
}

impl State {
    /// Initialise from `params`; a present key is absorbed as the standard
    /// 128-byte zero-padded key block, which is wiped afterwards.
    ///
    /// The caller is responsible for `params.key_len` matching `key`.
    pub(crate) fn new(params: &Params, key: Option<&[u8]>) -> Self {
        let words = params.words();
        let mut h = IV;
        for (hi, wi) in h.iter_mut().zip(words) {
            *hi ^= wi;
        }

        let mut state = State {
            h,
            buf: [0u8; BLOCK_LEN],
            buf_len: 0,
            counter: 0,
        };

        if let Some(key) = key {
            debug_assert!(!key.is_empty() && key.len() <= MAX_KEY_LEN);
            let mut block = [0u8; BLOCK_LEN];
            block[..key.len()].copy_from_slice(key);
            state.update(&block);
            block.zeroize();
        }

        state
    }

    /// Absorb `data`. A full buffered block is held back until more input
    /// arrives so the final block can carry the last-block flag.
    pub(crate) fn update(&mut self, mut data: &[u8]) {
        if data.is_empty() {
            return;
        }

        if self.buf_len > 0 {
            let take = usize::min(BLOCK_LEN - self.buf_len, data.len());
            self.buf[self.buf_len..self.buf_len + take].copy_from_slice(&data[..take]);
            self.buf_len += take;
            data = &data[take..];

            if self.buf_len == BLOCK_LEN && !data.is_empty() {
                self.counter = self.counter.wrapping_add(BLOCK_LEN as u128);
                let block = self.buf;
                compress(&mut self.h, &block, self.counter, false);
                self.buf_len = 0;
            } else {
                return;
            }
        }

        // Keep 1..=128 trailing bytes buffered as the candidate final block.
        while data.len() > BLOCK_LEN {
            self.counter = self.counter.wrapping_add(BLOCK_LEN as u128);
            let block: &[u8; BLOCK_LEN] = data[..BLOCK_LEN].try_into().unwrap();
            compress(&mut self.h, block, self.counter, false);
            data = &data[BLOCK_LEN..];
        }

        self.buf[..data.len()].copy_from_slice(data);
        self.buf_len = data.len();
    }

    /// Finalise into `out`, which receives the first `out.len()` bytes of
    /// the 64-byte state. `out.len()` must match the parameter block's
    /// `digest_len` and never exceed 64.
    pub(crate) fn finalize_into(mut self, out: &mut [u8]) {
        debug_assert!(out.len() <= MAX_DIGEST_LEN);

        self.counter = self.counter.wrapping_add(self.buf_len as u128);
        self.buf[self.buf_len..].fill(0);
        let block = self.buf;
        compress(&mut self.h, &block, self.counter, true);

        let mut full = [0u8; MAX_DIGEST_LEN];
        for (chunk, word) in full.chunks_exact_mut(8).zip(self.h) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out.copy_from_slice(&full[..out.len()]);
    }
}

/// Streaming BLAKE2b with a fixed digest length and optional key, salt,
/// and personality.
///
/// ```
/// use homhash::Blake2b;
///
/// let mut hasher = Blake2b::new(64)?;
/// hasher.update(b"hello ");
/// hasher.update(b"world");
/// let mut digest = [0u8; 64];
/// hasher.finalize_into(&mut digest)?;
/// # Ok::<(), homhash::HashError>(())
/// ```
pub struct Blake2b {
    state: State,
    digest_len: usize,
}

impl Blake2b {
    pub const MIN_DIGEST_LEN: usize = 1;
    pub const MAX_DIGEST_LEN: usize = MAX_DIGEST_LEN;
    pub const MAX_KEY_LEN: usize = MAX_KEY_LEN;
    pub const SALT_LEN: usize = SALT_LEN;
    pub const PERSONALITY_LEN: usize = PERSONALITY_LEN;

    /// Unkeyed hasher producing `digest_len` bytes (1..=64).
    pub fn new(digest_len: usize) -> Result<Self, HashError> {
        Self::with_params(digest_len, None, &[0; SALT_LEN], &[0; PERSONALITY_LEN])
    }

    /// Hasher with explicit key, salt, and personality.
    ///
    /// # Errors
    /// `InvalidOutputLength` if `digest_len` is outside 1..=64;
    /// `InvalidKeySize` if a key is present and outside 1..=64 bytes.
    pub fn with_params(
        digest_len: usize,
        key: Option<&[u8]>,
        salt: &[u8; SALT_LEN],
        personality: &[u8; PERSONALITY_LEN],
    ) -> Result<Self, HashError> {
        if digest_len < Self::MIN_DIGEST_LEN || digest_len > Self::MAX_DIGEST_LEN {
            return Err(HashError::InvalidOutputLength {
                max: Self::MAX_DIGEST_LEN as u64,
                actual: digest_len as u64,
            });
        }
        if let Some(key) = key {
            if key.is_empty() || key.len() > Self::MAX_KEY_LEN {
                return Err(HashError::InvalidKeySize {
                    min: 1,
                    max: Self::MAX_KEY_LEN,
                    actual: key.len(),
                });
            }
        }

        let mut params = Params::sequential(digest_len as u8);
        params.key_len = key.map_or(0, |k| k.len() as u8);
        params.salt = *salt;
        params.personality = *personality;

        Ok(Blake2b {
            state: State::new(&params, key),
            digest_len,
        })
    }

    /// Absorb more input; may be called any number of times.
    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    /// Finalise into `out`, consuming the hasher.
    ///
    /// # Errors
    /// `OutputLengthMismatch` if `out.len()` differs from the digest length
    /// declared at construction.
    pub fn finalize_into(self, out: &mut [u8]) -> Result<(), HashError> {
        if out.len() != self.digest_len {
            return Err(HashError::OutputLengthMismatch {
                declared: self.digest_len,
                actual: out.len(),
            });
        }
        self.state.finalize_into(out);
        Ok(())
    }

    /// One-shot hash of `data` into `out` (`out.len()` selects the digest
    /// length), optionally keyed.
    pub fn hash_single(out: &mut [u8], data: &[u8], key: Option<&[u8]>) -> Result<(), HashError> {
        let mut hasher =
            Self::with_params(out.len(), key, &[0; SALT_LEN], &[0; PERSONALITY_LEN])?;
        hasher.update(data);
        hasher.finalize_into(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn rfc7693_abc_vector() {
        let mut out = [0u8; 64];
        Blake2b::hash_single(&mut out, b"abc", None).unwrap();
        assert_eq!(
            hex(&out),
            "ba80a53f981c4d0d6a2797b69f12f6e94c212f14685ac4b74b12bb6fdbffa2d1\
             7d87c5392aab792dc252d5de4533cc9518d38aa8dbf1925ab92386edd4009923"
        );
    }

    #[test]
    fn empty_input_vector() {
        let mut out = [0u8; 64];
        Blake2b::hash_single(&mut out, b"", None).unwrap();
        assert_eq!(
            hex(&out),
            "786a02f742015903c6c6fd852552d272912f4740e15847618a86e217f71f5419\
             d25e1031afee585313896444934eb04b903a685b1448b755d56f701afe9be2ce"
        );
    }

    #[test]
    fn keyed_kat_first_line() {
        // First entry of the official blake2b keyed KAT: empty input,
        // key = bytes 0..=63.
        let key: Vec<u8> = (0u8..64).collect();
        let mut out = [0u8; 64];
        Blake2b::hash_single(&mut out, b"", Some(&key)).unwrap();
        assert_eq!(
            hex(&out),
            "10ebb67700b1868efb4417987acf4690ae9d972fb7a590c2f02871799aaa4786\
             b5e996e8f0f4eb981fc214b005f42d2ff4233499391653df7aefcbc13fc51568"
        );
    }

    #[test]
    fn truncated_digest() {
        let mut out = [0u8; 32];
        Blake2b::hash_single(&mut out, b"abc", None).unwrap();
        assert_eq!(
            hex(&out),
            "bddd813c634239723171ef3fee98579b94964e3bb1cb3e427262c8c068d52319"
        );
    }

    #[test]
    fn streaming_matches_one_shot() {
        let data = vec![0xa5u8; 1000];
        let mut one_shot = [0u8; 64];
        Blake2b::hash_single(&mut one_shot, &data, None).unwrap();

        for split in [0, 1, 127, 128, 129, 255, 256, 999] {
            let mut hasher = Blake2b::new(64).unwrap();
            hasher.update(&data[..split]);
            hasher.update(&data[split..]);
            let mut streamed = [0u8; 64];
            hasher.finalize_into(&mut streamed).unwrap();
            assert_eq!(streamed, one_shot, "split at {split}");
        }
    }

    #[test]
    fn rejects_bad_lengths() {
        assert!(matches!(
            Blake2b::new(0),
            Err(HashError::InvalidOutputLength { .. })
        ));
        assert!(matches!(
            Blake2b::new(65),
            Err(HashError::InvalidOutputLength { .. })
        ));
        let key = [0u8; 65];
        assert!(matches!(
            Blake2b::with_params(64, Some(&key), &[0; 16], &[0; 16]),
            Err(HashError::InvalidKeySize { .. })
        ));
        assert!(matches!(
            Blake2b::with_params(64, Some(&[]), &[0; 16], &[0; 16]),
            Err(HashError::InvalidKeySize { .. })
        ));
    }

    #[test]
    fn finalize_length_must_match() {
        let hasher = Blake2b::new(32).unwrap();
        let mut out = [0u8; 33];
        assert!(matches!(
            hasher.finalize_into(&mut out),
            Err(HashError::OutputLengthMismatch { .. })
        ));
    }
}
