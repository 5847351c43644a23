//! BLAKE3 in XOF mode, behind the same streaming + one-shot façade as
//! [`Blake2Xb`](crate::Blake2Xb).
//!
//! This is a thin wrapper over the `blake3` crate. It produces different
//! output than BLAKE2Xb (and, unlike it, is prefix-consistent across
//! output lengths); the two are not interchangeable on the wire.
//!
//! Keys: BLAKE3's native keyed mode takes exactly 32 bytes. Other key
//! lengths are accepted and run through `blake3::derive_key` first, so the
//! façade composes with callers that hold BLAKE2b-sized keys.

use crate::blake2xb::OutputLen;
use crate::error::HashError;

const KEY_DERIVE_CONTEXT: &str = "homhash 2026-08-02 blake3 xof key";

/// Streaming BLAKE3 XOF: init → any number of [`digest`] calls → one
/// consuming [`finish`].
///
/// [`digest`]: Blake3Xof::digest
/// [`finish`]: Blake3Xof::finish
pub struct Blake3Xof {
    hasher: blake3::Hasher,
    output_len: OutputLen,
}

impl Blake3Xof {
    pub const MIN_OUTPUT_LEN: usize = 1;
    /// BLAKE3's native key size.
    pub const KEY_LEN: usize = blake3::KEY_LEN;

    /// New instance, optionally keyed.
    ///
    /// # Errors
    /// `InvalidOutputLength` for `Fixed(0)`; `InvalidKeySize` for a
    /// present empty key.
    pub fn new(output_len: OutputLen, key: Option<&[u8]>) -> Result<Self, HashError> {
        if let OutputLen::Fixed(0) = output_len {
            return Err(HashError::InvalidOutputLength {
                max: u64::MAX,
                actual: 0,
            });
        }

        let hasher = match key {
            None => blake3::Hasher::new(),
            Some([]) => {
                return Err(HashError::InvalidKeySize {
                    min: 1,
                    max: usize::MAX,
                    actual: 0,
                });
            }
            Some(key) => {
                if let Ok(native) = <&[u8; blake3::KEY_LEN]>::try_from(key) {
                    blake3::Hasher::new_keyed(native)
                } else {
                    blake3::Hasher::new_keyed(&blake3::derive_key(KEY_DERIVE_CONTEXT, key))
                }
            }
        };

        Ok(Blake3Xof { hasher, output_len })
    }

    /// Absorb input; may be called any number of times.
    pub fn digest(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Absorb input from a reader in 8 KiB chunks; returns the byte count.
    pub fn digest_reader<R: std::io::Read>(&mut self, mut reader: R) -> Result<u64, HashError> {
        let mut buf = [0u8; 8192];
        let mut total = 0u64;
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                return Ok(total);
            }
            self.hasher.update(&buf[..n]);
            total += n as u64;
        }
    }

    /// Write the final output into `out`, consuming the instance.
    ///
    /// # Errors
    /// `OutputLengthMismatch` if a fixed length was declared and
    /// `out.len()` disagrees; `InvalidOutputLength` for an empty `out`
    /// with a deferred length.
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
                if out.is_empty() {
                    return Err(HashError::InvalidOutputLength {
                        max: u64::MAX,
                        actual: 0,
                    });
                }
            }
        }

        self.hasher.finalize_xof().fill(out);
        Ok(())
    }

    /// One-shot BLAKE3 XOF of `data` into `out`.
    pub fn hash_single(out: &mut [u8], data: &[u8], key: Option<&[u8]>) -> Result<(), HashError> {
        let len = u32::try_from(out.len()).map_err(|_| HashError::InvalidOutputLength {
            max: u64::from(u32::MAX),
            actual: out.len() as u64,
        })?;
        let mut xof = Self::new(OutputLen::Fixed(len), key)?;
        xof.digest(data);
        xof.finish(out)
    }
}
