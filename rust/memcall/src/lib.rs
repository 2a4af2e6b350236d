//! # memcall
//!
//! Cross-platform wrapper for the memory system calls that back protected
//! allocations:
//! - page-granular allocation and release outside the normal heap
//! - memory protection changes (no access / read only / read write)
//! - page locking to keep contents out of swap and core dumps
//!
//! Everything here is deliberately thin. The functions do not track state,
//! do not wipe, and do not round sizes; callers own those concerns.

mod error;
mod types;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as platform;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as platform;

use std::ptr::NonNull;

pub use error::MemcallError;
pub use types::MemoryProtection;

/// Result type for memcall operations.
pub type Result<T> = std::result::Result<T, MemcallError>;

/// Maps `size` bytes of fresh, private, read-write memory.
///
/// `size` should be a multiple of [`page_size`]; protection and locking act on
/// whole pages. The contents are not guaranteed to be zeroed.
///
/// # Errors
///
/// * `MemcallError::InvalidArgument` - if `size` is zero
/// * `MemcallError::SystemError` - if the platform refuses the mapping
pub fn alloc(size: usize) -> Result<NonNull<u8>> {
    if size == 0 {
        return Err(MemcallError::InvalidArgument(
            "<memcall> cannot allocate zero bytes".to_string(),
        ));
    }
    platform::alloc(size)
}

/// Releases a mapping previously returned by [`alloc`].
///
/// The memory is not wiped.
///
/// # Safety
///
/// `ptr` and `size` must describe exactly one live mapping from [`alloc`], and
/// no reference into it may be used afterwards.
pub unsafe fn free(ptr: NonNull<u8>, size: usize) -> Result<()> {
    platform::free(ptr, size)
}

/// Changes the protection of `size` bytes starting at `ptr`.
///
/// # Safety
///
/// `ptr` must be page aligned and the range must lie inside a live mapping.
/// Revoking access while references into the range are still used is
/// undefined behaviour at the language level and a fault at runtime.
pub unsafe fn protect(ptr: NonNull<u8>, size: usize, protection: MemoryProtection) -> Result<()> {
    platform::protect(ptr, size, protection)
}

/// Locks the range into physical memory.
///
/// # Safety
///
/// The range must lie inside a live mapping.
pub unsafe fn lock(ptr: NonNull<u8>, size: usize) -> Result<()> {
    platform::lock(ptr, size)
}

/// Unlocks a range previously locked with [`lock`].
///
/// # Safety
///
/// The range must lie inside a live mapping.
pub unsafe fn unlock(ptr: NonNull<u8>, size: usize) -> Result<()> {
    platform::unlock(ptr, size)
}

/// Returns the system's page size.
pub fn page_size() -> usize {
    platform::page_size()
}

/// Rounds `size` up to a whole number of pages, or `None` on overflow.
pub fn round_to_page_size(size: usize) -> Option<usize> {
    let page = page_size();
    match size % page {
        0 => Some(size),
        rem => size.checked_add(page - rem),
    }
}

/// Disables creation of core dump files for the current process.
pub fn disable_core_dumps() -> Result<()> {
    platform::disable_core_dumps()
}
