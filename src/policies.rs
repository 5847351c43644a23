//! Hashing policies for the generic value hasher.
//!
//! A policy supplies the four primitive operations the value hasher is
//! built from, plus a running [`HashState`] for ordered containers. The
//! three built-ins differ only in the mixers behind those primitives;
//! digests are stable across runs (no per-process random seeding) but not
//! across policies.

/// The primitive operations a hashing policy provides.
///
/// `hash_fundamental` takes the value's bits widened to u64; wider values
/// go through `hash_bytes`.
pub trait HashPolicy {
    /// Running state for ordered sequences.
    type State: HashState;

    /// Digest reported for empty or error variants of sum types.
    const ERROR_VALUE: u64;

    /// Hash a scalar's bits.
    fn hash_fundamental(bits: u64) -> u64;

    /// Hash a contiguous byte region.
    fn hash_bytes(bytes: &[u8]) -> u64;

    /// Order-sensitive combination of sub-hashes (tuples, records).
    fn hash_combine(hashes: &[u64]) -> u64;

    /// Order-independent combination for unordered containers.
    ///
    /// This is plain XOR in every policy. XOR is self-inverse, so two
    /// equal sub-hashes cancel: a multiset that contains an element twice
    /// hashes as if it contained it zero times. Long-standing behaviour,
    /// kept for compatibility.
    fn hash_invertible_combine(hashes: &[u64]) -> u64 {
        hashes.iter().fold(0, |acc, h| acc ^ h)
    }

    /// Fresh running state; `size_hint` is the expected element count.
    fn state(size_hint: usize) -> Self::State;
}

/// Running state fed one sub-hash at a time, digested once at the end.
pub trait HashState {
    fn add(&mut self, hash: u64);
    fn digest(self) -> u64;
}

// ---------------------------------------------------------------------------
// Martinus
// ---------------------------------------------------------------------------

const MARTINUS_SEED: u64 = 0xe17a1465;
const MARTINUS_M: u64 = 0xc6a4a7935bd1e995;
const MARTINUS_R: u32 = 47;

/// Multiplicative mixer policy in the style of Martin Ankerl's
/// robin-hood-hashing: a murmur-derived folding mixer for bytes and an
/// avalanching multiply for integers. The default policy.
pub struct Martinus;

fn martinus_fmix(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51afd7ed558ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ceb9fe1a85ec53);
    x ^= x >> 33;
    x
}

impl HashPolicy for Martinus {
    type State = MartinusState;

    const ERROR_VALUE: u64 = MARTINUS_SEED;

    fn hash_fundamental(bits: u64) -> u64 {
        martinus_fmix(bits)
    }

    fn hash_bytes(bytes: &[u8]) -> u64 {
        let mut h = MARTINUS_SEED ^ (bytes.len() as u64).wrapping_mul(MARTINUS_M);

        let mut chunks = bytes.chunks_exact(8);
        for chunk in &mut chunks {
            let mut k = u64::from_le_bytes(chunk.try_into().unwrap());
            k = k.wrapping_mul(MARTINUS_M);
            k ^= k >> MARTINUS_R;
            k = k.wrapping_mul(MARTINUS_M);
            h ^= k;
            h = h.wrapping_mul(MARTINUS_M);
        }

        let tail = chunks.remainder();
        if !tail.is_empty() {
            let mut k = 0u64;
            for (i, &b) in tail.iter().enumerate() {
                k |= u64::from(b) << (8 * i);
            }
            h ^= k;
            h = h.wrapping_mul(MARTINUS_M);
        }

        h ^= h >> MARTINUS_R;
        h = h.wrapping_mul(MARTINUS_M);
        h ^ (h >> MARTINUS_R)
    }

    fn hash_combine(hashes: &[u64]) -> u64 {
        let mut state = Self::state(hashes.len());
        for &h in hashes {
            state.add(h);
        }
        state.digest()
    }

    fn state(size_hint: usize) -> MartinusState {
        MartinusState {
            state: MARTINUS_SEED ^ (size_hint as u64).wrapping_mul(MARTINUS_M),
        }
    }
}

pub struct MartinusState {
    state: u64,
}

impl HashState for MartinusState {
    fn add(&mut self, hash: u64) {
        self.state = (self.state ^ martinus_fmix(hash)).wrapping_mul(MARTINUS_M);
    }

    fn digest(self) -> u64 {
        martinus_fmix(self.state)
    }
}

// ---------------------------------------------------------------------------
// XXH3
// ---------------------------------------------------------------------------

const XXH3_SEED: u64 = 0xa24baed4963ee407;

/// XXH3-64 policy, backed by `xxhash-rust`. Combination streams the
/// sub-hashes' native-endian bytes through a seeded XXH3 state.
pub struct Xxh3;

impl HashPolicy for Xxh3 {
    type State = Xxh3State;

    const ERROR_VALUE: u64 = XXH3_SEED;

    fn hash_fundamental(bits: u64) -> u64 {
        Self::hash_bytes(&bits.to_ne_bytes())
    }

    fn hash_bytes(bytes: &[u8]) -> u64 {
        xxhash_rust::xxh3::xxh3_64_with_seed(bytes, XXH3_SEED)
    }

    fn hash_combine(hashes: &[u64]) -> u64 {
        let mut state = Self::state(hashes.len());
        for &h in hashes {
            state.add(h);
        }
        state.digest()
    }

    fn state(_size_hint: usize) -> Xxh3State {
        Xxh3State(xxhash_rust::xxh3::Xxh3::with_seed(XXH3_SEED))
    }
}

pub struct Xxh3State(xxhash_rust::xxh3::Xxh3);

impl HashState for Xxh3State {
    fn add(&mut self, hash: u64) {
        self.0.update(&hash.to_ne_bytes());
    }

    fn digest(self) -> u64 {
        self.0.digest()
    }
}

// ---------------------------------------------------------------------------
// Wyhash
// ---------------------------------------------------------------------------

const WYHASH_SEED: u64 = 0xe17a1465;

// The wyhash mixing primes.
const WYP0: u64 = 0xa0761d6478bd642f;
const WYP1: u64 = 0xe7037ed1a0b428db;

/// Wyhash policy: the `wyhash` crate for byte regions, the two-word
/// wyhash mix (64x64 -> 128 multiply, fold high into low) for integers
/// and combination.
pub struct Wyhash;

fn wymix(a: u64, b: u64) -> u64 {
    let product = u128::from(a) * u128::from(b);
    (product as u64) ^ ((product >> 64) as u64)
}

impl HashPolicy for Wyhash {
    type State = WyhashState;

    const ERROR_VALUE: u64 = WYHASH_SEED;

    fn hash_fundamental(bits: u64) -> u64 {
        wymix(WYP0 ^ WYHASH_SEED, WYP1 ^ bits)
    }

    fn hash_bytes(bytes: &[u8]) -> u64 {
        wyhash::wyhash(bytes, WYHASH_SEED)
    }

    fn hash_combine(hashes: &[u64]) -> u64 {
        let mut state = Self::state(hashes.len());
        for &h in hashes {
            state.add(h);
        }
        state.digest()
    }

    fn state(_size_hint: usize) -> WyhashState {
        WyhashState { state: WYHASH_SEED }
    }
}

pub struct WyhashState {
    state: u64,
}

impl HashState for WyhashState {
    fn add(&mut self, hash: u64) {
        self.state = wymix(self.state, hash);
    }

    fn digest(self) -> u64 {
        self.state
    }
}
