use crate::region::SecureRegion;
use std::fmt;

/// Which reference count an [`AccessGuard`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// Scoped access to a [`SecureRegion`].
///
/// Creating a guard increments the region's read or write count and applies
/// the resulting protection; dropping it decrements the count and applies
/// the protection again before `drop` returns. Because the guard borrows the
/// region, it can never outlive it.
///
/// ```
/// use securebytes::{AccessGuard, MemoryProtection, SecureRegion};
///
/// # fn main() -> Result<(), securebytes::AllocationError> {
/// let mut region = SecureRegion::allocate(4)?;
/// {
///     let mut guard = AccessGuard::write(&mut region);
///     guard.bytes_mut().copy_from_slice(b"abcd");
/// }
/// let first = AccessGuard::read(&region);
/// let second = AccessGuard::read(&region);
/// assert_eq!(first.bytes(), second.bytes());
/// assert_eq!(region.protection(), MemoryProtection::ReadOnly);
/// drop((first, second));
/// assert_eq!(region.protection(), MemoryProtection::NoAccess);
/// # Ok(())
/// # }
/// ```
pub struct AccessGuard<'a> {
    region: &'a SecureRegion,
    mode: AccessMode,
}

impl<'a> AccessGuard<'a> {
    /// Opens read access. Any number of read guards may be open at once.
    pub fn read(region: &'a SecureRegion) -> Self {
        region.enter_read();
        Self {
            region,
            mode: AccessMode::Read,
        }
    }

    /// Opens write access. The exclusive borrow keeps every other view of the
    /// region out of reach while the guard lives.
    pub fn write(region: &'a mut SecureRegion) -> Self {
        let region: &'a SecureRegion = region;
        region.enter_write();
        Self {
            region,
            mode: AccessMode::Write,
        }
    }

    /// The mode this guard was opened with.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// The full region, readable for as long as the guard lives.
    pub fn bytes(&self) -> &[u8] {
        // Either count being open makes the region readable.
        unsafe { self.region.as_slice() }
    }

    /// The full region, writable for as long as the borrow lasts.
    ///
    /// # Panics
    ///
    /// Panics if the guard was opened with [`AccessGuard::read`].
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        assert_eq!(
            self.mode,
            AccessMode::Write,
            "mutable view requested through a read guard"
        );
        // Write guards are built from an exclusive borrow of the region and
        // hand out at most one mutable view at a time.
        unsafe { self.region.as_mut_slice() }
    }
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        match self.mode {
            AccessMode::Read => self.region.exit_read(),
            AccessMode::Write => self.region.exit_write(),
        }
    }
}

impl fmt::Debug for AccessGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGuard")
            .field("mode", &self.mode)
            .field("len", &self.region.len())
            .finish_non_exhaustive()
    }
}

/// Runs `body` with a read-only view of the whole region.
///
/// Read access is released on every exit path, including a panic inside
/// `body`, before the result propagates.
pub fn scoped_read<R>(region: &SecureRegion, body: impl FnOnce(&[u8]) -> R) -> R {
    let guard = AccessGuard::read(region);
    body(guard.bytes())
}

/// Runs `body` with a mutable view of the whole region.
///
/// Write access is released on every exit path, including a panic inside
/// `body`, before the result propagates.
pub fn scoped_write<R>(region: &mut SecureRegion, body: impl FnOnce(&mut [u8]) -> R) -> R {
    let mut guard = AccessGuard::write(region);
    body(guard.bytes_mut())
}

#[cfg(test)]
mod tests {
    use super::*;
    use memcall::MemoryProtection;
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn test_scoped_write_then_read() {
        let mut region = SecureRegion::allocate(8).expect("allocate failed");

        scoped_write(&mut region, |bytes| {
            assert_eq!(bytes.len(), 8);
            bytes.copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        });
        assert_eq!(region.counts(), (0, 0));

        let sum: u32 = scoped_read(&region, |bytes| bytes.iter().map(|&b| u32::from(b)).sum());
        assert_eq!(sum, 36);
        assert_eq!(region.protection(), MemoryProtection::NoAccess);
    }

    #[test]
    fn test_nested_read_guards() {
        let region = SecureRegion::allocate(8).expect("allocate failed");

        scoped_read(&region, |outer| {
            assert_eq!(region.counts(), (1, 0));
            scoped_read(&region, |inner| {
                assert_eq!(region.counts(), (2, 0));
                assert_eq!(outer, inner);
            });
            assert_eq!(region.counts(), (1, 0));
            assert_eq!(region.protection(), MemoryProtection::ReadOnly);
            assert_eq!(outer.len(), 8, "outer view must remain readable");
        });

        assert_eq!(region.counts(), (0, 0));
        assert_eq!(region.protection(), MemoryProtection::NoAccess);
    }

    #[test]
    fn test_guard_released_on_early_return() {
        let region = SecureRegion::allocate(4).expect("allocate failed");

        let result: Result<(), &str> = scoped_read(&region, |bytes| {
            if bytes.len() == 4 {
                return Err("bail out");
            }
            Ok(())
        });

        assert_eq!(result, Err("bail out"));
        assert_eq!(region.counts(), (0, 0));
        assert_eq!(region.protection(), MemoryProtection::NoAccess);
    }

    #[test]
    fn test_guard_released_on_panic() {
        let mut region = SecureRegion::allocate(4).expect("allocate failed");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            scoped_write(&mut region, |bytes| {
                bytes[0] = 9;
                panic!("body failed");
            })
        }));

        assert!(outcome.is_err());
        assert_eq!(region.counts(), (0, 0));
        assert_eq!(region.protection(), MemoryProtection::NoAccess);
        assert_eq!(scoped_read(&region, |bytes| bytes[0]), 9);
    }

    #[test]
    fn test_guard_modes() {
        let mut region = SecureRegion::allocate(4).expect("allocate failed");

        let guard = AccessGuard::write(&mut region);
        assert_eq!(guard.mode(), AccessMode::Write);
        drop(guard);

        let guard = AccessGuard::read(&region);
        assert_eq!(guard.mode(), AccessMode::Read);
        assert!(format!("{:?}", guard).contains("Read"));
    }

    #[test]
    #[should_panic(expected = "mutable view requested through a read guard")]
    fn test_read_guard_refuses_mutable_view() {
        let region = SecureRegion::allocate(4).expect("allocate failed");
        let mut guard = AccessGuard::read(&region);
        let _ = guard.bytes_mut();
    }
}
