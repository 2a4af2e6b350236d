use thiserror::Error;

/// The protected-memory facility refused or failed an allocation.
///
/// Raised when the size cannot be represented as whole pages, when the
/// platform cannot map the memory, when the pages cannot be locked (for
/// example because `RLIMIT_MEMLOCK` is exhausted), or when the fresh mapping
/// cannot be placed in its initial no-access state. In every case nothing
/// was left allocated and no unprotected fallback was attempted.
#[derive(Error, Debug)]
#[error("could not allocate {len} bytes of protected memory: {reason}")]
pub struct AllocationError {
    len: usize,
    reason: String,
}

impl AllocationError {
    pub(crate) fn new(len: usize, reason: impl ToString) -> Self {
        Self {
            len,
            reason: reason.to_string(),
        }
    }

    /// The number of bytes that was requested.
    pub fn requested_len(&self) -> usize {
        self.len
    }
}

/// Errors that can occur while constructing or resizing secure containers.
///
/// Content operations (reading, writing, copying, wiping) are defined for
/// every valid range and have no error case of their own.
#[derive(Error, Debug)]
pub enum SecureBytesError {
    /// The backing region could not be allocated.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// The random-byte source failed to produce output.
    ///
    /// The partially filled region is wiped and released before this error
    /// is returned.
    #[error("Random generation failed: {0}")]
    RandomGenerationFailed(String),
}

/// Result type for securebytes operations.
pub type Result<T> = std::result::Result<T, SecureBytesError>;
