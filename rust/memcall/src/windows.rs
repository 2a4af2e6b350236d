use crate::error::MemcallError;
use crate::types::MemoryProtection;
use crate::Result;
use once_cell::sync::Lazy;
use std::ffi::c_void;
use std::ptr::{self, NonNull};
use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, VirtualLock, VirtualProtect, VirtualUnlock, MEM_COMMIT, MEM_RELEASE,
    MEM_RESERVE, PAGE_NOACCESS, PAGE_READONLY, PAGE_READWRITE,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

static PAGE_SIZE: Lazy<usize> = Lazy::new(|| unsafe {
    let mut si: SYSTEM_INFO = std::mem::zeroed();
    GetSystemInfo(&mut si);
    si.dwPageSize as usize
});

#[inline]
fn as_void(ptr: NonNull<u8>) -> *mut c_void {
    ptr.as_ptr().cast()
}

pub(crate) fn alloc(size: usize) -> Result<NonNull<u8>> {
    let mapping = unsafe {
        VirtualAlloc(
            ptr::null(),
            size,
            MEM_COMMIT | MEM_RESERVE,
            PAGE_READWRITE,
        )
    };

    NonNull::new(mapping.cast::<u8>()).ok_or_else(|| {
        MemcallError::last_os_error(format_args!("could not allocate {} bytes", size))
    })
}

pub(crate) unsafe fn free(ptr: NonNull<u8>, _size: usize) -> Result<()> {
    if VirtualFree(as_void(ptr), 0, MEM_RELEASE) == 0 {
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
        MemoryProtection::NoAccess => PAGE_NOACCESS,
        MemoryProtection::ReadOnly => PAGE_READONLY,
        MemoryProtection::ReadWrite => PAGE_READWRITE,
    };

    let mut old_protect = 0;
    if VirtualProtect(as_void(ptr), size, prot, &mut old_protect) == 0 {
        return Err(MemcallError::last_os_error(format_args!(
            "could not set {:?} on {:p}",
            protection, ptr
        )));
    }
    Ok(())
}

pub(crate) unsafe fn lock(ptr: NonNull<u8>, size: usize) -> Result<()> {
    if VirtualLock(as_void(ptr), size) == 0 {
        return Err(MemcallError::last_os_error(format_args!(
            "could not acquire lock on {:p}, limit reached?",
            ptr
        )));
    }
    Ok(())
}

pub(crate) unsafe fn unlock(ptr: NonNull<u8>, size: usize) -> Result<()> {
    if VirtualUnlock(as_void(ptr), size) == 0 {
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
    // Windows Error Reporting dumps are governed by system policy.
    Ok(())
}
