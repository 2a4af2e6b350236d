use crate::error::MemcallError;
use crate::types::MemoryProtection;
use crate::Result;
#[cfg(target_os = "linux")]
use log::warn;
use once_cell::sync::Lazy;
use std::ptr::{self, NonNull};

static PAGE_SIZE: Lazy<usize> = Lazy::new(|| {
    // sysconf only fails for unknown names; _SC_PAGESIZE is always defined.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
});

#[inline]
fn as_void(ptr: NonNull<u8>) -> *mut libc::c_void {
    ptr.as_ptr().cast()
}

pub(crate) fn alloc(size: usize) -> Result<NonNull<u8>> {
    let mapping = unsafe {
        libc::mmap(
            ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANON,
            -1,
            0,
        )
    };

    if mapping == libc::MAP_FAILED {
        return Err(MemcallError::last_os_error(format_args!(
            "could not allocate {} bytes",
            size
        )));
    }

    NonNull::new(mapping.cast::<u8>())
        .ok_or_else(|| MemcallError::SystemError("<memcall> mmap returned null".to_string()))
}

pub(crate) unsafe fn free(ptr: NonNull<u8>, size: usize) -> Result<()> {
    if libc::munmap(as_void(ptr), size) != 0 {
        return Err(MemcallError::last_os_error(format_args!(
            "could not deallocate {:p}",
            ptr
        )));
    }
    Ok(())
}

pub(crate) unsafe fn protect(
    ptr: NonNull<u8>,
    size: usize,
    protection: MemoryProtection,
) -> Result<()> {
    let prot = match protection {
        MemoryProtection::NoAccess => libc::PROT_NONE,
        MemoryProtection::ReadOnly => libc::PROT_READ,
        MemoryProtection::ReadWrite => libc::PROT_READ | libc::PROT_WRITE,
    };

    if libc::mprotect(as_void(ptr), size, prot) != 0 {
        return Err(MemcallError::last_os_error(format_args!(
            "could not set {:?} on {:p}",
            protection, ptr
        )));
    }
    Ok(())
}

pub(crate) unsafe fn lock(ptr: NonNull<u8>, size: usize) -> Result<()> {
    // Keep the pages out of core dumps as well; best effort.
    #[cfg(target_os = "linux")]
    if libc::madvise(as_void(ptr), size, libc::MADV_DONTDUMP) != 0 {
        warn!(
            "<memcall> could not exclude {:p} from core dumps [Err: {}]",
            ptr,
            std::io::Error::last_os_error()
        );
    }

    if libc::mlock(as_void(ptr), size) != 0 {
        return Err(MemcallError::last_os_error(format_args!(
            "could not acquire lock on {:p}, limit reached?",
            ptr
        )));
    }
    Ok(())
}

pub(crate) unsafe fn unlock(ptr: NonNull<u8>, size: usize) -> Result<()> {
    if libc::munlock(as_void(ptr), size) != 0 {
        return Err(MemcallError::last_os_error(format_args!(
            "could not free lock on {:p}",
            ptr
        )));
    }
    Ok(())
}

pub(crate) fn page_size() -> usize {
    *PAGE_SIZE
}

pub(crate) fn disable_core_dumps() -> Result<()> {
    let rlimit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };

    if unsafe { libc::setrlimit(libc::RLIMIT_CORE, &rlimit) } != 0 {
        return Err(MemcallError::last_os_error("could not set rlimit"));
    }
    Ok(())
}
