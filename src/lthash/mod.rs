//! LtHash, a homomorphic multiset hash.
//!
//! The checksum of an [`LtHash`] is the element-wise modular sum of the
//! BLAKE2Xb digests of every object added so far. Addition commutes, so
//! insertion order never matters; subtraction removes an object's
//! contribution exactly, so `add` followed by `remove` of the same object
//! restores the previous checksum; and two checksums can be combined
//! without re-hashing any object. From the paper *Securing Update
//! Propagation with Homomorphic Hashing* (Lewi, Kim, Maykov, Weis, 2019),
//! after the Facebook Folly implementation.
//!
//! Three sizings are in common use, exposed as type aliases:
//!
//! | Alias | Element bits | Elements | Checksum |
//! |-------|--------------|----------|----------|
//! | [`LtHash16`] | 16 | 1024 | 2048 bytes |
//! | [`LtHash20`] | 20 | 1008 | 2688 bytes |
//! | [`LtHash32`] | 32 | 1024 | 4096 bytes |
//!
//! Instances are independent; a shared instance needs external
//! synchronisation for mutating calls. The optional key (16..=64 bytes)
//! feeds the underlying BLAKE2Xb and is securely wiped on replacement,
//! `clear_key`, and drop.
//!
//! ```
//! use homhash::LtHash16;
//!
//! let mut multiset = LtHash16::new()?;
//! multiset.add(b"spherical cow")?.add(b"penguins")?;
//! multiset.remove(b"spherical cow")?;
//!
//! let mut just_penguins = LtHash16::new()?;
//! just_penguins.add(b"penguins")?;
//! assert_eq!(multiset, just_penguins);
//! # Ok::<(), homhash::HashError>(())
//! ```

pub mod bits;
mod math;

use std::marker::PhantomData;

use zeroize::Zeroize;

use crate::blake2xb::{Blake2Xb, OutputLen};
use crate::error::HashError;
use bits::ElementBits;
pub use bits::{B16, B20, B32};
pub use math::Backend;
use math::MathEngine;

const MIN_KEY_LEN: usize = 16;
const MAX_KEY_LEN: usize = 64;

/// Inline key storage: no heap traffic, and the wipe is one `zeroize`
/// over the full buffer regardless of the stored length.
#[derive(Clone)]
struct Key {
    bytes: [u8; MAX_KEY_LEN],
    len: usize,
}

impl Key {
    const fn empty() -> Self {
        Key {
            bytes: [0u8; MAX_KEY_LEN],
            len: 0,
        }
    }

    fn get(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    fn as_option(&self) -> Option<&[u8]> {
        if self.len == 0 {
            None
        } else {
            Some(&self.bytes[..self.len])
        }
    }

    fn clear(&mut self) {
        self.bytes.zeroize();
        self.len = 0;
    }

    fn set(&mut self, new_key: &[u8]) {
        debug_assert!(new_key.len() <= self.bytes.len());
        self.clear();
        self.bytes[..new_key.len()].copy_from_slice(new_key);
        self.len = new_key.len();
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Homomorphic multiset hash over `N` elements of `B` bits each.
///
/// `B` is one of [`B16`], [`B20`], [`B32`]; `N` must be a positive
/// multiple of the element count per u64 word (4, 3, and 2 respectively),
/// checked at construction. Prefer the [`LtHash16`]/[`LtHash20`]/
/// [`LtHash32`] aliases unless a non-standard sizing is required.
pub struct LtHash<B: ElementBits, const N: usize> {
    key: Key,
    /// Packed little-endian u64 words; fixed length, never reallocated.
    checksum: Vec<u8>,
    /// Scratch for per-object digests, kept to avoid allocation in
    /// `add`/`remove`.
    scratch: Vec<u8>,
    engine: MathEngine,
    _elem: PhantomData<B>,
}

impl<B: ElementBits, const N: usize> LtHash<B, N> {
    /// Smallest accepted key (the libsodium BLAKE2b keyed minimum, kept
    /// for wire compatibility).
    pub const MIN_KEY_LEN: usize = MIN_KEY_LEN;
    /// Largest accepted key, the BLAKE2b maximum.
    pub const MAX_KEY_LEN: usize = MAX_KEY_LEN;

    /// Bits per checksum element.
    pub const ELEMENT_BITS: usize = B::BITS;
    /// Number of elements in the checksum.
    pub const ELEMENT_COUNT: usize = N;
    /// Whether the packed layout carries padding bits (only for `B20`).
    pub const NEEDS_PADDING: bool = B::NEEDS_PADDING;
    /// Checksum length in bytes.
    pub const CHECKSUM_LEN: usize = (N / B::ELEMS_PER_U64) * 8;

    /// New instance with the all-zero (empty multiset) checksum, using the
    /// fastest math backend the CPU supports.
    pub fn new() -> Result<Self, HashError> {
        Self::with_backend(Backend::detect())
    }

    /// New instance pinned to a specific math backend. Behaviour is
    /// identical across backends; this exists for benchmarking and for
    /// cross-checking backends in tests.
    ///
    /// # Panics
    /// If `backend` is not available on the running CPU (a programmer
    /// error; check [`Backend::is_available`] first when in doubt).
    pub fn with_backend(backend: Backend) -> Result<Self, HashError> {
        if N == 0 || N % B::ELEMS_PER_U64 != 0 {
            // Element count must fill whole u64 words.
            return Err(HashError::InvalidChecksumSize {
                expected: N.next_multiple_of(B::ELEMS_PER_U64).max(B::ELEMS_PER_U64),
                actual: N,
            });
        }

        Ok(LtHash {
            key: Key::empty(),
            checksum: vec![0u8; Self::CHECKSUM_LEN],
            scratch: vec![0u8; Self::CHECKSUM_LEN],
            engine: MathEngine::new(backend),
            _elem: PhantomData,
        })
    }

    /// New instance starting from a previously exported checksum.
    ///
    /// # Errors
    /// `InvalidChecksumSize` on a wrong-length buffer;
    /// `InvalidChecksumPadding` if the layout is padded and any padding
    /// bit is set.
    pub fn with_checksum(initial_checksum: &[u8]) -> Result<Self, HashError> {
        let mut hash = Self::new()?;
        hash.set_checksum(initial_checksum)?;
        Ok(hash)
    }

    /// Store a BLAKE2Xb key, securely erasing any previous key first.
    ///
    /// # Errors
    /// `InvalidKeySize` unless `16 <= key.len() <= 64`.
    pub fn set_key(&mut self, key: &[u8]) -> Result<(), HashError> {
        if key.len() < Self::MIN_KEY_LEN || key.len() > Self::MAX_KEY_LEN {
            return Err(HashError::InvalidKeySize {
                min: Self::MIN_KEY_LEN,
                max: Self::MAX_KEY_LEN,
                actual: key.len(),
            });
        }
        self.key.set(key);
        Ok(())
    }

    /// Securely erase the key; the instance reverts to unkeyed hashing.
    pub fn clear_key(&mut self) {
        self.key.clear();
    }

    /// Whether `self` and `other` hash with the same key. Not secured
    /// against timing attacks.
    pub fn key_equal(&self, other: &Self) -> bool {
        self.key.get() == other.key.get()
    }

    /// Whether this instance's key equals `key` (empty slice = unkeyed).
    /// Not secured against timing attacks.
    pub fn key_equal_bytes(&self, key: &[u8]) -> bool {
        self.key.get() == key
    }

    /// Borrow the checksum bytes: packed little-endian u64 words, byte
    /// equal across math backends and host endianness.
    pub fn checksum(&self) -> &[u8] {
        &self.checksum
    }

    /// Replace the checksum wholesale.
    ///
    /// # Errors
    /// Same validation as [`with_checksum`](Self::with_checksum).
    pub fn set_checksum(&mut self, new_checksum: &[u8]) -> Result<(), HashError> {
        if new_checksum.len() != Self::CHECKSUM_LEN {
            return Err(HashError::InvalidChecksumSize {
                expected: Self::CHECKSUM_LEN,
                actual: new_checksum.len(),
            });
        }
        if B::NEEDS_PADDING && !self.engine.check_padding::<B>(new_checksum) {
            return Err(HashError::InvalidChecksumPadding);
        }
        self.checksum.copy_from_slice(new_checksum);
        Ok(())
    }

    /// Reset the checksum to the empty multiset. The key is untouched.
    pub fn clear_checksum(&mut self) {
        self.checksum.fill(0);
    }

    /// Whether the checksum is the all-zero empty-multiset image.
    pub fn is_zero(&self) -> bool {
        self.checksum.iter().all(|&b| b == 0)
    }

    /// Checksum equality with another instance. Not constant time.
    pub fn checksum_equal(&self, other: &Self) -> bool {
        self.checksum == other.checksum
    }

    /// Checksum equality against raw bytes; false on length mismatch.
    /// Not constant time.
    pub fn checksum_equal_bytes(&self, other_checksum: &[u8]) -> bool {
        self.checksum[..] == *other_checksum
    }

    /// Constant-time checksum equality with another instance.
    pub fn checksum_equal_constant_time(&self, other: &Self) -> bool {
        constant_time_eq(&self.checksum, &other.checksum)
    }

    /// Constant-time checksum equality against raw bytes. The length
    /// comparison itself is not hidden; the content comparison is.
    pub fn checksum_equal_constant_time_bytes(&self, other_checksum: &[u8]) -> bool {
        constant_time_eq(&self.checksum, other_checksum)
    }

    /// Hash `obj` into the scratch buffer with the current key, clearing
    /// padding bits so the digest is a valid packed operand.
    fn hash_object(&mut self, obj: &[u8]) -> Result<(), HashError> {
        let key = self.key.as_option();
        Blake2Xb::hash_single(&mut self.scratch, obj, key)?;
        if B::NEEDS_PADDING {
            self.engine.clear_padding::<B>(&mut self.scratch);
        }
        Ok(())
    }

    /// Hash a reader into the scratch buffer in 8 KiB chunks.
    fn hash_stream<R: std::io::Read>(&mut self, mut reader: R) -> Result<(), HashError> {
        let mut xof = Blake2Xb::new(
            OutputLen::Fixed(Self::CHECKSUM_LEN as u32),
            self.key.as_option(),
        )?;
        let mut buf = [0u8; 8192];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            xof.digest(&buf[..n]);
        }
        xof.finish(&mut self.scratch)?;
        if B::NEEDS_PADDING {
            self.engine.clear_padding::<B>(&mut self.scratch);
        }
        Ok(())
    }

    /// Add a single object to the multiset.
    ///
    /// Returns `&mut Self` for chaining: `h.add(a)?.add(b)?`.
    pub fn add(&mut self, obj: &[u8]) -> Result<&mut Self, HashError> {
        self.hash_object(obj)?;
        self.engine.add::<B>(&mut self.checksum, &self.scratch);
        Ok(self)
    }

    /// Remove a single object from the multiset. Removing an object that
    /// was never added is algebraically valid (the multiset goes
    /// negative); adding it later cancels out.
    pub fn remove(&mut self, obj: &[u8]) -> Result<&mut Self, HashError> {
        self.hash_object(obj)?;
        self.engine.sub::<B>(&mut self.checksum, &self.scratch);
        Ok(self)
    }

    /// Add an object supplied by a reader, without buffering it whole.
    /// Produces the same checksum as [`add`](Self::add) on the full bytes.
    pub fn add_stream<R: std::io::Read>(&mut self, reader: R) -> Result<&mut Self, HashError> {
        self.hash_stream(reader)?;
        self.engine.add::<B>(&mut self.checksum, &self.scratch);
        Ok(self)
    }

    /// Remove an object supplied by a reader.
    pub fn remove_stream<R: std::io::Read>(&mut self, reader: R) -> Result<&mut Self, HashError> {
        self.hash_stream(reader)?;
        self.engine.sub::<B>(&mut self.checksum, &self.scratch);
        Ok(self)
    }

    /// Add every object in `objs`.
    pub fn add_all<T: AsRef<[u8]>>(&mut self, objs: &[T]) -> Result<&mut Self, HashError> {
        for obj in objs {
            self.add(obj.as_ref())?;
        }
        Ok(self)
    }

    /// Remove every object in `objs`.
    pub fn remove_all<T: AsRef<[u8]>>(&mut self, objs: &[T]) -> Result<&mut Self, HashError> {
        for obj in objs {
            self.remove(obj.as_ref())?;
        }
        Ok(self)
    }

    /// Merge another hash into this one (multiset union).
    ///
    /// # Errors
    /// `KeyMismatch` unless both instances hold the same key.
    pub fn combine_add(&mut self, other: &Self) -> Result<&mut Self, HashError> {
        if !self.key_equal(other) {
            return Err(HashError::KeyMismatch);
        }
        self.engine.add::<B>(&mut self.checksum, &other.checksum);
        Ok(self)
    }

    /// Subtract another hash from this one (multiset difference).
    ///
    /// # Errors
    /// `KeyMismatch` unless both instances hold the same key.
    pub fn combine_remove(&mut self, other: &Self) -> Result<&mut Self, HashError> {
        if !self.key_equal(other) {
            return Err(HashError::KeyMismatch);
        }
        self.engine.sub::<B>(&mut self.checksum, &other.checksum);
        Ok(self)
    }

    /// Which math backend this instance is pinned to.
    pub fn backend(&self) -> Backend {
        self.engine.backend()
    }

    #[cfg(test)]
    fn raw_key_buffer(&self) -> &[u8; 64] {
        &self.key.bytes
    }
}

#[cfg(feature = "parallel")]
impl<B: ElementBits, const N: usize> LtHash<B, N> {
    /// Hash `objs` on the rayon pool and fold the digests into a partial
    /// checksum. Addition commutes, so the fold order does not matter.
    fn hash_parallel<T>(&self, objs: &[T]) -> Result<Vec<u8>, HashError>
    where
        T: AsRef<[u8]> + Sync,
    {
        use rayon::prelude::*;

        let engine = self.engine;
        let key = self.key.as_option();

        objs.par_iter()
            .try_fold(
                || vec![0u8; Self::CHECKSUM_LEN],
                move |mut acc, obj| {
                    let mut digest = vec![0u8; Self::CHECKSUM_LEN];
                    Blake2Xb::hash_single(&mut digest, obj.as_ref(), key)?;
                    if B::NEEDS_PADDING {
                        engine.clear_padding::<B>(&mut digest);
                    }
                    engine.add::<B>(&mut acc, &digest);
                    Ok(acc)
                },
            )
            .try_reduce(
                || vec![0u8; Self::CHECKSUM_LEN],
                move |mut a, b| {
                    engine.add::<B>(&mut a, &b);
                    Ok(a)
                },
            )
    }

    /// Add a batch of objects, hashing them in parallel. Bit-identical to
    /// sequential [`add_all`](Self::add_all).
    pub fn add_parallel<T>(&mut self, objs: &[T]) -> Result<&mut Self, HashError>
    where
        T: AsRef<[u8]> + Sync,
    {
        let partial = self.hash_parallel(objs)?;
        self.engine.add::<B>(&mut self.checksum, &partial);
        Ok(self)
    }

    /// Remove a batch of objects, hashing them in parallel.
    pub fn remove_parallel<T>(&mut self, objs: &[T]) -> Result<&mut Self, HashError>
    where
        T: AsRef<[u8]> + Sync,
    {
        let partial = self.hash_parallel(objs)?;
        self.engine.sub::<B>(&mut self.checksum, &partial);
        Ok(self)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b) {
        acc |= x ^ y;
    }
    acc == 0
}

impl<B: ElementBits, const N: usize> Clone for LtHash<B, N> {
    fn clone(&self) -> Self {
        LtHash {
            key: self.key.clone(),
            checksum: self.checksum.clone(),
            // Scratch holds no state worth copying.
            scratch: vec![0u8; Self::CHECKSUM_LEN],
            engine: self.engine,
            _elem: PhantomData,
        }
    }
}

impl<B: ElementBits, const N: usize> std::fmt::Debug for LtHash<B, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LtHash")
            .field("element_bits", &B::BITS)
            .field("element_count", &N)
            .field("has_key", &(self.key.len != 0))
            .field("backend", &self.engine.backend())
            .finish()
    }
}

/// Equality compares checksums only (i.e. "do these represent the same
/// multiset"); keys are compared explicitly via
/// [`key_equal`](LtHash::key_equal). Not constant time.
impl<B: ElementBits, const N: usize> PartialEq for LtHash<B, N> {
    fn eq(&self, other: &Self) -> bool {
        self.checksum_equal(other)
    }
}

impl<B: ElementBits, const N: usize> Eq for LtHash<B, N> {}

/// Default is the empty multiset.
///
/// # Panics
/// If the `(B, N)` pair is invalid; the canonical aliases never panic.
impl<B: ElementBits, const N: usize> Default for LtHash<B, N> {
    fn default() -> Self {
        Self::new().expect("invalid LtHash sizing parameters")
    }
}

impl<B: ElementBits, const N: usize> std::ops::AddAssign for LtHash<B, N> {
    /// # Panics
    /// On key mismatch; use [`combine_add`](LtHash::combine_add) to
    /// handle that case without panicking.
    fn add_assign(&mut self, rhs: Self) {
        self.combine_add(&rhs)
            .expect("cannot combine LtHashes with different keys");
    }
}

impl<B: ElementBits, const N: usize> std::ops::Add for LtHash<B, N> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl<B: ElementBits, const N: usize> std::ops::SubAssign for LtHash<B, N> {
    /// # Panics
    /// On key mismatch; use [`combine_remove`](LtHash::combine_remove) to
    /// handle that case without panicking.
    fn sub_assign(&mut self, rhs: Self) {
        self.combine_remove(&rhs)
            .expect("cannot combine LtHashes with different keys");
    }
}

impl<B: ElementBits, const N: usize> std::ops::Sub for LtHash<B, N> {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

/// 16-bit elements, 1024 of them; 2048-byte checksum.
pub type LtHash16 = LtHash<B16, 1024>;

/// 20-bit elements, 1008 of them; 2688-byte checksum with managed padding
/// bits.
pub type LtHash20 = LtHash<B20, 1008>;

/// 32-bit elements, 1024 of them; 4096-byte checksum.
pub type LtHash32 = LtHash<B32, 1024>;
