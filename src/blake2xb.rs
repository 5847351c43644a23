//! BLAKE2Xb, the extendable-output construction over BLAKE2b.
//!
//! Output is produced in two phases, exactly as in the BLAKE2X paper: the
//! input is first hashed to a 64-byte root digest `h0`, then each 64-byte
//! output block is an independent BLAKE2b hash of `h0` whose parameter
//! block carries the block index in `node_off`. Because the final block's
//! `digest_len` enters its parameter block, digests of different total
//! lengths differ from the very first byte; BLAKE2Xb is not a
//! prefix-consistent stream.
//!
//! The output length may be fixed up front or deferred until [`finish`]
//! via [`OutputLen`]; on the wire the deferred case is the `0xFFFFFFFF`
//! sentinel in the `xof_digest_len` parameter field.
//!
//! [`finish`]: Blake2Xb::finish

use zeroize::Zeroize;

use crate::blake2b::{self, Params, State, PERSONALITY_LEN, SALT_LEN};
use crate::error::HashError;

/// Output length declared at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputLen {
    /// Known now; `finish` must be handed a buffer of exactly this size.
    Fixed(u32),
    /// Unknown until `finish`; may be chosen exactly once, there.
    DeferredUntilFinish,
}

impl OutputLen {
    /// Wire encoding for the `xof_digest_len` parameter field.
    fn wire(self) -> u32 {
        match self {
            OutputLen::Fixed(len) => len,
            OutputLen::DeferredUntilFinish => Blake2Xb::UNKNOWN_LEN_SENTINEL,
        }
    }
}

/// Streaming BLAKE2Xb instance: init → any number of [`digest`] calls →
/// exactly one [`finish`], which consumes the instance.
///
/// [`digest`]: Blake2Xb::digest
/// [`finish`]: Blake2Xb::finish
pub struct Blake2Xb {
    param: Params,
    state: State,
    output_len: OutputLen,
}

impl Blake2Xb {
    pub const MIN_OUTPUT_LEN: usize = 1;
    /// Largest producible output, `2^32 - 2` bytes.
    pub const MAX_OUTPUT_LEN: u64 = 0xFFFF_FFFE;
    pub const MAX_KEY_LEN: usize = blake2b::MAX_KEY_LEN;

    const UNKNOWN_LEN_SENTINEL: u32 = 0xFFFF_FFFF;

    /// New instance with all-zero salt and personality.
    pub fn new(output_len: OutputLen, key: Option<&[u8]>) -> Result<Self, HashError> {
        Self::with_params(output_len, key, &[0; SALT_LEN], &[0; PERSONALITY_LEN])
    }

    /// New instance with explicit salt and personality.
    ///
    /// # Errors
    /// `InvalidOutputLength` for `Fixed(0)` or `Fixed(0xFFFFFFFF)` (the
    /// deferred sentinel); `InvalidKeySize` for a present key outside
    /// 1..=64 bytes.
    pub fn with_params(
        output_len: OutputLen,
        key: Option<&[u8]>,
        salt: &[u8; SALT_LEN],
        personality: &[u8; PERSONALITY_LEN],
    ) -> Result<Self, HashError> {
        if let OutputLen::Fixed(len) = output_len {
            if len == 0 || u64::from(len) > Self::MAX_OUTPUT_LEN {
                return Err(HashError::InvalidOutputLength {
                    max: Self::MAX_OUTPUT_LEN,
                    actual: u64::from(len),
                });
            }
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

        let param = Params {
            digest_len: blake2b::MAX_DIGEST_LEN as u8,
            key_len: key.map_or(0, |k| k.len() as u8),
            fanout: 1,
            depth: 1,
            leaf_len: 0,
            node_off: 0,
            xof_digest_len: output_len.wire(),
            node_depth: 0,
            inner_len: 0,
            salt: *salt,
            personality: *personality,
        };

        Ok(Blake2Xb {
            state: State::new(&param, key),
            param,
            output_len,
        })
    }

    /// Absorb input; may be called any number of times.
    pub fn digest(&mut self, data: &[u8]) {
        self.state.update(data);
    }

    /// Produce the final output into `out`, consuming the instance.
    ///
    /// # Errors
    /// `OutputLengthMismatch` if a fixed length was declared and
    /// `out.len()` disagrees; `InvalidOutputLength` if the length was
    /// deferred and `out` is empty or longer than `2^32 - 2` bytes.
    pub fn finish(self, out: &mut [u8]) -> Result<(), HashError> {
        match self.output_len {
            OutputLen::Fixed(declared) => {
                if out.len() != declared as usize {
                    return Err(HashError::OutputLengthMismatch {
                        declared: declared as usize,
                        actual: out.len(),
                    });
                }
            }
            OutputLen::DeferredUntilFinish => {
                if out.is_empty() || out.len() as u64 > Self::MAX_OUTPUT_LEN {
                    return Err(HashError::InvalidOutputLength {
                        max: Self::MAX_OUTPUT_LEN,
                        actual: out.len() as u64,
                    });
                }
            }
        }

        let mut h0 = [0u8; blake2b::MAX_DIGEST_LEN];
        self.state.finalize_into(&mut h0);

        // Expansion phase: every 64-byte block is a fresh BLAKE2b over h0,
        // keyed by its node offset.
        let mut param = self.param;
        param.key_len = 0;
        param.fanout = 0;
        param.depth = 0;
        param.leaf_len = blake2b::MAX_DIGEST_LEN as u32;
        param.xof_digest_len = out.len() as u32;
        param.node_depth = 0;
        param.inner_len = blake2b::MAX_DIGEST_LEN as u8;

        for (i, block) in out.chunks_mut(blake2b::MAX_DIGEST_LEN).enumerate() {
            param.node_off = i as u32;
            param.digest_len = block.len() as u8;

            let mut node = State::new(&param, None);
            node.update(&h0);
            node.finalize_into(block);
        }

        h0.zeroize();
        Ok(())
    }

    /// One-shot BLAKE2Xb: hash `data` into `out`, whose length selects the
    /// output size. Pass `None` for unkeyed hashing.
    ///
    /// ```
    /// use homhash::Blake2Xb;
    ///
    /// let mut digest = [0u8; 128];
    /// Blake2Xb::hash_single(&mut digest, b"spherical cow", None)?;
    /// # Ok::<(), homhash::HashError>(())
    /// ```
    pub fn hash_single(out: &mut [u8], data: &[u8], key: Option<&[u8]>) -> Result<(), HashError> {
        Self::hash_single_with_params(out, data, key, &[0; SALT_LEN], &[0; PERSONALITY_LEN])
    }

    /// One-shot BLAKE2Xb with explicit salt and personality.
    pub fn hash_single_with_params(
        out: &mut [u8],
        data: &[u8],
        key: Option<&[u8]>,
        salt: &[u8; SALT_LEN],
        personality: &[u8; PERSONALITY_LEN],
    ) -> Result<(), HashError> {
        let len = u32::try_from(out.len()).map_err(|_| HashError::InvalidOutputLength {
            max: Self::MAX_OUTPUT_LEN,
            actual: out.len() as u64,
        })?;
        let mut xof = Self::with_params(OutputLen::Fixed(len), key, salt, personality)?;
        xof.digest(data);
        xof.finish(out)
    }
}
