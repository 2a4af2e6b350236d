//! A [`SecureBytes`] that several threads can hold at once.
//!
//! The reference counts behind a `SecureBytes` are not atomic, so the plain
//! type is `Send` but not `Sync`. `SharedSecureBytes` serialises every
//! operation, counter updates and protection changes included, behind one
//! mutex.

use crate::bytes::SecureBytes;
use crate::error::Result;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Thread-safe handle to one [`SecureBytes`].
///
/// Cloning the handle shares the same container; it never copies the
/// contents. The mutex is not reentrant: calling back into the same handle
/// from inside `read` or `write` deadlocks.
#[derive(Clone)]
pub struct SharedSecureBytes {
    inner: Arc<Mutex<SecureBytes>>,
}

impl SharedSecureBytes {
    /// Moves `bytes` behind the lock.
    pub fn new(bytes: SecureBytes) -> Self {
        Self {
            inner: Arc::new(Mutex::new(bytes)),
        }
    }

    /// Number of bytes held.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the container holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Runs `body` with a read-only view while holding the lock.
    pub fn read<R>(&self, body: impl FnOnce(&[u8]) -> R) -> R {
        self.inner.lock().read(body)
    }

    /// Runs `body` with a mutable view while holding the lock.
    pub fn write<R>(&self, body: impl FnOnce(&mut [u8]) -> R) -> R {
        self.inner.lock().write(body)
    }

    /// Resizes the shared container; see [`SecureBytes::resize`].
    pub fn resize(&self, new_len: usize, fill: u8) -> Result<()> {
        self.inner.lock().resize(new_len, fill)
    }

    /// Returns the container if this is the last handle to it.
    pub fn try_unwrap(self) -> std::result::Result<SecureBytes, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl From<SecureBytes> for SharedSecureBytes {
    fn from(bytes: SecureBytes) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for SharedSecureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSecureBytes")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish_non_exhaustive()
    }
}
