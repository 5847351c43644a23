//! Hashing primitives for fingerprinting byte streams, structured values,
//! and multisets of objects.
//!
//! Three families live here:
//!
//! - **[`LtHash`]**, a homomorphic multiset hash: the checksum of a set of
//!   objects supports algebraic addition and removal of members, so a
//!   fingerprint can be updated incrementally instead of recomputed.
//!   Ships in the three standard sizings [`LtHash16`], [`LtHash20`],
//!   [`LtHash32`], with scalar/SSE2/AVX2 math backends selected at
//!   runtime.
//! - **Cryptographic engines** with a uniform streaming + one-shot API:
//!   [`Blake2b`], the [`Blake2Xb`] extendable-output function LtHash is
//!   built on, and a [`Blake3Xof`] façade over the `blake3` crate.
//! - **A generic value hasher** ([`hash_value`]) mapping scalars,
//!   strings, containers, tuples, and sum types to a 64-bit digest under
//!   a pluggable [`policies::HashPolicy`] (Martinus, XXH3, or wyhash).
//!
//! # Multiset fingerprinting
//!
//! ```
//! use homhash::LtHash16;
//!
//! let mut tracked = LtHash16::new()?;
//! tracked.add(b"row:1")?.add(b"row:2")?;
//!
//! // Another party arrives at the same state in a different order.
//! let mut mirror = LtHash16::new()?;
//! mirror.add(b"row:2")?.add(b"row:1")?;
//! assert_eq!(tracked, mirror);
//!
//! // Updates only touch the members that changed.
//! tracked.remove(b"row:1")?.add(b"row:1-v2")?;
//! assert_ne!(tracked, mirror);
//! # Ok::<(), homhash::HashError>(())
//! ```
//!
//! # Concurrency
//!
//! Distinct instances are fully independent. A shared instance needs
//! external synchronisation for mutating operations; there is no internal
//! locking.
//!
//! # Secrets
//!
//! LtHash keys and the transient key blocks inside keyed BLAKE2b
//! initialisation are wiped with `zeroize` when replaced, cleared, or
//! dropped. Checksums are not secret and are not wiped.

mod blake2b;
mod blake2xb;
mod blake3_xof;
mod error;
mod lthash;
pub mod policies;
mod value_hash;

pub use blake2b::Blake2b;
pub use blake2xb::{Blake2Xb, OutputLen};
pub use blake3_xof::Blake3Xof;
pub use error::HashError;
pub use lthash::bits::{ElementBits, B16, B20, B32};
pub use lthash::{Backend, LtHash, LtHash16, LtHash20, LtHash32};
pub use value_hash::{hash_value, hash_value_default, ValueHash};
