use crate::error::{Result, SecureBytesError};
use crate::guard::{scoped_read, scoped_write};
use crate::region::SecureRegion;
use log::trace;
use memcall::MemoryProtection;
use rand::{CryptoRng, RngCore};
use std::fmt;
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

/// A byte buffer held in locked, guarded memory.
///
/// The contents are inaccessible except inside [`read`](Self::read) and
/// [`write`](Self::write), and are zeroed before the memory is released,
/// both on drop and when [`resize`](Self::resize) retires the old backing
/// region.
///
/// # Examples
///
/// ```
/// use securebytes::SecureBytes;
///
/// # fn main() -> securebytes::Result<()> {
/// let mut b = SecureBytes::copying(&[0x01, 0x02, 0x03])?;
///
/// b.resize(5, 0xFF)?;
/// b.read(|bytes| assert_eq!(bytes, [0x01, 0x02, 0x03, 0xFF, 0xFF]));
///
/// b.resize(2, 0)?;
/// b.read(|bytes| assert_eq!(bytes, [0x01, 0x02]));
/// # Ok(())
/// # }
/// ```
pub struct SecureBytes {
    region: SecureRegion,
}

impl SecureBytes {
    /// Creates `len` zero bytes.
    pub fn zero(len: usize) -> Result<Self> {
        let mut region = SecureRegion::allocate(len)?;
        scoped_write(&mut region, |bytes| bytes.zeroize());
        trace!("Created zeroed SecureBytes of {} bytes", len);
        Ok(Self { region })
    }

    /// Creates `len` bytes from the operating system's secure random source.
    ///
    /// # Errors
    ///
    /// * `SecureBytesError::Allocation` - if the region could not be allocated
    /// * `SecureBytesError::RandomGenerationFailed` - if the OS source failed
    pub fn random(len: usize) -> Result<Self> {
        let mut region = SecureRegion::allocate(len)?;
        scoped_write(&mut region, |bytes| getrandom::getrandom(bytes))
            .map_err(|e| SecureBytesError::RandomGenerationFailed(e.to_string()))?;
        trace!("Created random SecureBytes of {} bytes", len);
        Ok(Self { region })
    }

    /// Creates `len` bytes drawn from a caller-supplied cryptographic generator.
    pub fn random_with<G>(len: usize, rng: &mut G) -> Result<Self>
    where
        G: RngCore + CryptoRng + ?Sized,
    {
        let mut region = SecureRegion::allocate(len)?;
        scoped_write(&mut region, |bytes| rng.try_fill_bytes(bytes))
            .map_err(|e| SecureBytesError::RandomGenerationFailed(e.to_string()))?;
        Ok(Self { region })
    }

    /// Copies `src` into a new secure buffer. `src` is left untouched.
    pub fn copying(src: &[u8]) -> Result<Self> {
        let mut region = SecureRegion::allocate(src.len())?;
        scoped_write(&mut region, |bytes| bytes.copy_from_slice(src));
        Ok(Self { region })
    }

    /// Copies `src` into a new secure buffer, then zeroes `src`.
    ///
    /// If allocation fails `src` is returned to the caller intact, since it
    /// is then the only copy of the data.
    pub fn erasing(src: &mut [u8]) -> Result<Self> {
        let secure = Self::copying(src)?;
        src.zeroize();
        Ok(secure)
    }

    /// Number of bytes held.
    pub fn len(&self) -> usize {
        self.region.len()
    }

    /// Whether the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.region.is_empty()
    }

    /// The protection currently applied to the backing memory.
    ///
    /// `NoAccess` whenever no `read` or `write` call is in progress.
    pub fn protection(&self) -> MemoryProtection {
        self.region.protection()
    }

    /// Runs `body` with a read-only view of the contents.
    ///
    /// Calls nest: `body` may call `read` on the same value again.
    pub fn read<R>(&self, body: impl FnOnce(&[u8]) -> R) -> R {
        scoped_read(&self.region, body)
    }

    /// Runs `body` with a mutable view of the contents.
    pub fn write<R>(&mut self, body: impl FnOnce(&mut [u8]) -> R) -> R {
        scoped_write(&mut self.region, body)
    }

    /// Changes the length to `new_len`.
    ///
    /// A fresh region is allocated and filled with `fill`, the first
    /// `min(len, new_len)` bytes are copied over, and the old region is wiped
    /// and released. On error the buffer is left exactly as it was.
    pub fn resize(&mut self, new_len: usize, fill: u8) -> Result<()> {
        let mut region = SecureRegion::allocate(new_len)?;
        let retained = self.len().min(new_len);

        scoped_write(&mut region, |dst| {
            dst.fill(fill);
            scoped_read(&self.region, |src| {
                dst[..retained].copy_from_slice(&src[..retained]);
            });
        });

        trace!("Resized SecureBytes from {} to {} bytes", self.len(), new_len);
        // The retired region wipes itself on drop.
        drop(std::mem::replace(&mut self.region, region));
        Ok(())
    }

    /// Copies the contents into a brand-new, independently owned region.
    pub fn try_clone(&self) -> Result<Self> {
        let mut region = SecureRegion::allocate(self.len())?;
        scoped_write(&mut region, |dst| {
            scoped_read(&self.region, |src| dst.copy_from_slice(src));
        });
        Ok(Self { region })
    }

    /// Overwrites the contents with zeroes, keeping the length.
    pub fn wipe(&mut self) {
        self.write(|bytes| bytes.zeroize());
    }

    #[cfg(test)]
    pub(crate) fn region(&self) -> &SecureRegion {
        &self.region
    }
}

impl ConstantTimeEq for SecureBytes {
    /// Lengths are compared directly; equal-length contents are compared in
    /// constant time.
    fn ct_eq(&self, other: &Self) -> Choice {
        self.read(|a| other.read(|b| a.ct_eq(b)))
    }
}

impl PartialEq for SecureBytes {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for SecureBytes {}

impl fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureBytes")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
