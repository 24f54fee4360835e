//! Key-value store error types.

/// Errors from a key-value store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a valid JSON object of strings
    #[error("store file is corrupt: {message}")]
    Corrupt { message: String },

    /// A lock guarding the store was poisoned by a panicking writer
    #[error("store lock poisoned")]
    Poisoned,
}
