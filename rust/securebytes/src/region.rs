//! Ownership of one block of protected memory and its protection state.
//!
//! The effective protection is never stored. It is recomputed from the
//! read and write reference counts on every transition:
//!
//! ```text
//!   (ro = 0, rw = 0)  -> NoAccess
//!   (ro > 0, rw = 0)  -> ReadOnly
//!   (ro any, rw > 0)  -> ReadWrite
//! ```
//!
//! Release always runs the same sequence, whatever the counters say:
//!
//! ```text
//!   force ReadWrite -> zero every byte -> unlock -> unmap
//! ```

use crate::error::AllocationError;
use log::{error, trace, warn};
use memcall::MemoryProtection;
use std::cell::Cell;
use std::ptr::NonNull;
use std::slice;
use zeroize::Zeroize;

/// Protection implied by the given reference counts. Writers dominate.
pub(crate) fn protection_for(readers: usize, writers: usize) -> MemoryProtection {
    if writers > 0 {
        MemoryProtection::ReadWrite
    } else if readers > 0 {
        MemoryProtection::ReadOnly
    } else {
        MemoryProtection::NoAccess
    }
}

/// One allocation of locked, guarded memory.
///
/// The region starts out inaccessible. Access is granted only through
/// [`AccessGuard`](crate::AccessGuard), [`scoped_read`](crate::scoped_read)
/// and [`scoped_write`](crate::scoped_write). Dropping the region zeroes the
/// whole mapping and returns it to the platform.
///
/// The reference counts are plain `Cell`s: a region can move between
/// threads but cannot be shared by them. See
/// [`SharedSecureBytes`](crate::SharedSecureBytes) for the locked variant.
pub struct SecureRegion {
    ptr: NonNull<u8>,
    len: usize,
    capacity: usize,
    readers: Cell<usize>,
    writers: Cell<usize>,
}

// The mapping is owned exclusively by this value.
unsafe impl Send for SecureRegion {}

impl SecureRegion {
    /// Allocates a region of exactly `len` usable bytes in the `NoAccess`
    /// state.
    ///
    /// The mapping is rounded up to whole pages. Its contents are
    /// unspecified; callers that need zeroes must write them.
    ///
    /// # Errors
    ///
    /// Returns `AllocationError` if the size overflows page rounding, if the
    /// platform cannot map or lock the pages, or if the initial protection
    /// cannot be applied. Partial work is undone before returning.
    pub fn allocate(len: usize) -> Result<Self, AllocationError> {
        if len == 0 {
            return Ok(Self::from_raw_parts(NonNull::dangling(), 0, 0));
        }

        let capacity = memcall::round_to_page_size(len)
            .ok_or_else(|| AllocationError::new(len, "size exceeds the addressable range"))?;

        let ptr = memcall::alloc(capacity).map_err(|e| AllocationError::new(len, e))?;

        #[cfg(not(feature = "no-mlock"))]
        if let Err(e) = unsafe { memcall::lock(ptr, capacity) } {
            unsafe { discard_mapping(ptr, capacity) };
            return Err(AllocationError::new(len, e));
        }

        if let Err(e) = unsafe { memcall::protect(ptr, capacity, MemoryProtection::NoAccess) } {
            #[cfg(not(feature = "no-mlock"))]
            if let Err(unlock_err) = unsafe { memcall::unlock(ptr, capacity) } {
                warn!("Failed to unlock rejected allocation: {}", unlock_err);
            }
            unsafe { discard_mapping(ptr, capacity) };
            return Err(AllocationError::new(len, e));
        }

        trace!("Allocated protected region {:p} ({} of {} bytes)", ptr, len, capacity);
        Ok(Self::from_raw_parts(ptr, len, capacity))
    }

    fn from_raw_parts(ptr: NonNull<u8>, len: usize, capacity: usize) -> Self {
        Self {
            ptr,
            len,
            capacity,
            readers: Cell::new(0),
            writers: Cell::new(0),
        }
    }

    /// Number of usable bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the region holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The protection currently applied to the region.
    pub fn protection(&self) -> MemoryProtection {
        protection_for(self.readers.get(), self.writers.get())
    }

    /// The open `(read, write)` reference counts.
    pub fn counts(&self) -> (usize, usize) {
        (self.readers.get(), self.writers.get())
    }

    pub(crate) fn enter_read(&self) {
        Self::enter(&self.readers, self, "read");
    }

    pub(crate) fn exit_read(&self) {
        Self::exit(&self.readers, self, "read");
    }

    pub(crate) fn enter_write(&self) {
        Self::enter(&self.writers, self, "write");
    }

    pub(crate) fn exit_write(&self) {
        Self::exit(&self.writers, self, "write");
    }

    fn enter(counter: &Cell<usize>, region: &Self, mode: &str) {
        let before = region.protection();
        counter.set(counter.get() + 1);
        let after = region.protection();
        if before == after {
            return;
        }

        if let Err(e) = region.apply(after) {
            // Leave the counts as they were so the region stays consistent.
            counter.set(counter.get() - 1);
            panic!(
                "could not grant {} access to protected region {:p}: {}",
                mode, region.ptr, e
            );
        }
    }

    fn exit(counter: &Cell<usize>, region: &Self, mode: &str) {
        let open = counter.get();
        assert!(
            open > 0,
            "{} access to protected region {:p} released more often than acquired",
            mode,
            region.ptr
        );

        let before = region.protection();
        counter.set(open - 1);
        let after = region.protection();
        if before == after {
            return;
        }

        if let Err(e) = region.apply(after) {
            error!(
                "Failed to restrict protected region {:p} to {:?}: {}",
                region.ptr, after, e
            );
        }
    }

    fn apply(&self, protection: MemoryProtection) -> memcall::Result<()> {
        if self.capacity == 0 {
            return Ok(());
        }
        trace!("Setting protected region {:p} to {:?}", self.ptr, protection);
        unsafe { memcall::protect(self.ptr, self.capacity, protection) }
    }

    /// The usable bytes.
    ///
    /// # Safety
    ///
    /// The caller must hold read or write access for the lifetime of the
    /// returned slice, and no mutable view may exist at the same time.
    pub(crate) unsafe fn as_slice(&self) -> &[u8] {
        slice::from_raw_parts(self.ptr.as_ptr(), self.len)
    }

    /// The usable bytes, mutably.
    ///
    /// # Safety
    ///
    /// The caller must hold write access for the lifetime of the returned
    /// slice and must be the only holder of any view into the region.
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn as_mut_slice(&self) -> &mut [u8] {
        slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len)
    }
}

impl Drop for SecureRegion {
    fn drop(&mut self) {
        if self.capacity == 0 {
            return;
        }

        let (readers, writers) = self.counts();
        if readers != 0 || writers != 0 {
            warn!(
                "Releasing protected region {:p} with {} readers and {} writers still open",
                self.ptr, readers, writers
            );
        }

        match self.apply(MemoryProtection::ReadWrite) {
            Ok(()) => {
                let whole = unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.capacity) };
                whole.zeroize();
                #[cfg(test)]
                release_hook::observe(whole);
            }
            Err(e) => {
                // Writing now would fault; the kernel scrubs pages on unmap.
                error!(
                    "Failed to make protected region {:p} writable for wiping: {}",
                    self.ptr, e
                );
            }
        }

        #[cfg(not(feature = "no-mlock"))]
        if let Err(e) = unsafe { memcall::unlock(self.ptr, self.capacity) } {
            error!("Failed to unlock protected region {:p}: {}", self.ptr, e);
        }

        unsafe { discard_mapping(self.ptr, self.capacity) };
        trace!("Released protected region {:p} ({} bytes)", self.ptr, self.capacity);
    }
}

/// Unmaps `capacity` bytes at `ptr`, logging instead of failing.
unsafe fn discard_mapping(ptr: NonNull<u8>, capacity: usize) {
    if let Err(e) = memcall::free(ptr, capacity) {
        error!("Failed to free protected region {:p}: {}", ptr, e);
    }
}
