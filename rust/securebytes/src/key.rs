use crate::bytes::SecureBytes;
use crate::error::Result;
use std::fmt;

/// Key material held in a [`SecureBytes`].
///
/// `Key` adds no storage of its own. It exists to narrow the API: there is no
/// `Deref`, `AsRef<[u8]>`, iteration, hashing or serialization, so a key
/// cannot be logged, compared as a collection, or written out by accident.
/// Every use of the material names the container explicitly through
/// [`bytes`](Self::bytes) or [`bytes_mut`](Self::bytes_mut).
///
/// ```
/// use securebytes::Key;
///
/// # fn main() -> securebytes::Result<()> {
/// let key = Key::random(32)?;
/// assert_eq!(key.bytes().len(), 32);
/// assert_eq!(format!("{:?}", key), "Key(<redacted>)");
/// # Ok(())
/// # }
/// ```
pub struct Key {
    bytes: SecureBytes,
}

impl Key {
    /// Adopts an existing container as key material.
    pub fn wrapping(bytes: SecureBytes) -> Self {
        Self { bytes }
    }

    /// Generates `len` bytes of key material from the OS random source.
    pub fn random(len: usize) -> Result<Self> {
        SecureBytes::random(len).map(Self::wrapping)
    }

    /// Copies `src` in as key material, leaving `src` untouched.
    pub fn copying(src: &[u8]) -> Result<Self> {
        SecureBytes::copying(src).map(Self::wrapping)
    }

    /// Copies `src` in as key material, then zeroes `src`.
    pub fn erasing(src: &mut [u8]) -> Result<Self> {
        SecureBytes::erasing(src).map(Self::wrapping)
    }

    /// The wrapped key material.
    pub fn bytes(&self) -> &SecureBytes {
        &self.bytes
    }

    /// The wrapped key material, mutably.
    pub fn bytes_mut(&mut self) -> &mut SecureBytes {
        &mut self.bytes
    }

    /// Gives up the wrapper and returns the container.
    pub fn into_bytes(self) -> SecureBytes {
        self.bytes
    }

    /// Copies the key into a new, independently owned container.
    pub fn try_clone(&self) -> Result<Self> {
        self.bytes.try_clone().map(Self::wrapping)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key(<redacted>)")
    }
}
