use thiserror::Error;

/// Errors surfaced by the hashing primitives in this crate.
///
/// Every fallible operation reports one of these; nothing is logged
/// internally. Wrong-sized buffers handed to the packed math engine after
/// construction-time checks are programmer errors and panic instead.
#[derive(Error, Debug)]
pub enum HashError {
    #[error("invalid key size: expected {min}..={max} bytes, got {actual}")]
    InvalidKeySize {
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("invalid output length: max {max} bytes, got {actual}")]
    InvalidOutputLength { max: u64, actual: u64 },

    #[error("output length mismatch: declared {declared} bytes, buffer holds {actual}")]
    OutputLengthMismatch { declared: usize, actual: usize },

    #[error("invalid checksum size: expected {expected}, got {actual}")]
    InvalidChecksumSize { expected: usize, actual: usize },

    #[error("invalid checksum: non-zero padding bits")]
    InvalidChecksumPadding,

    #[error("cannot combine hashes with different keys")]
    KeyMismatch,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
