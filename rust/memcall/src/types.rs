/// Memory protection flags.
///
/// The discriminants are stable and match the values used by the original
/// memcall family of libraries:
/// - NoAccess = 1
/// - ReadOnly = 2
/// - ReadWrite = 6 (read | write)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MemoryProtection {
    /// No access: memory cannot be read, written, or executed.
    NoAccess = 1,

    /// Read-only: memory can be read but not written or executed.
    ReadOnly = 2,

    /// Read-write: memory can be read and written but not executed.
    ReadWrite = 6,
}

impl From<MemoryProtection> for u32 {
    fn from(prot: MemoryProtection) -> u32 {
        prot as u32
    }
}

impl MemoryProtection {
    /// Whether a plain load from memory in this state succeeds.
    pub fn is_readable(self) -> bool {
        !matches!(self, MemoryProtection::NoAccess)
    }

    /// Whether a plain store to memory in this state succeeds.
    pub fn is_writable(self) -> bool {
        matches!(self, MemoryProtection::ReadWrite)
    }
}
