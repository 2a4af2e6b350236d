//! # securebytes
//!
//! Custody of secret bytes in protected memory.
//!
//! `securebytes` keeps sensitive data (keys, plaintexts, derived material)
//! in memory that is allocated outside the normal heap, locked into RAM,
//! inaccessible by default, and zeroed before it is handed back to the
//! operating system. It does no cryptography itself; cryptographic code
//! borrows the bytes through scoped accessors.
//!
//! ## Components
//!
//! - [`SecureRegion`]: one locked mapping plus its protection state machine.
//!   Protection is derived from a read count and a write count, with writers
//!   dominating.
//! - [`AccessGuard`], [`scoped_read`], [`scoped_write`]: scoped access that
//!   raises the protection on entry and lowers it again on every exit path.
//! - [`SecureBytes`]: the value-level buffer with zero, random and copying
//!   constructors, `resize`, and `read`/`write` accessors.
//! - [`Key`]: a `SecureBytes` with every implicit byte view removed.
//! - [`SharedSecureBytes`]: a mutex-guarded handle for use across threads.
//!
//! ## Basic Usage
//!
//! ```
//! use securebytes::{Key, MemoryProtection, SecureBytes};
//!
//! # fn main() -> securebytes::Result<()> {
//! let mut password = b"hunter2".to_vec();
//! let secret = SecureBytes::erasing(&mut password)?;
//! assert!(password.iter().all(|&b| b == 0));
//!
//! // Outside of `read`/`write` the pages cannot be touched at all.
//! assert_eq!(secret.protection(), MemoryProtection::NoAccess);
//!
//! let length = secret.read(|bytes| {
//!     assert_eq!(bytes, b"hunter2");
//!     bytes.len()
//! });
//! assert_eq!(length, 7);
//!
//! let key = Key::random(32)?;
//! key.bytes().read(|material| assert_eq!(material.len(), 32));
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! The `no-mlock` feature skips page locking. It exists for constrained test
//! environments with a tiny `RLIMIT_MEMLOCK` and must not be used in
//! production. Process-wide hardening such as
//! [`memcall::disable_core_dumps`] is left to the application.
//!
//! ## Logging
//!
//! Allocation, release and protection transitions are reported through the
//! [`log`] facade at `trace` level; platform failures during release are
//! reported at `error` level, since release itself never fails.

mod bytes;
mod error;
mod guard;
mod key;
mod region;
mod shared;

pub use crate::bytes::SecureBytes;
pub use crate::error::{AllocationError, Result, SecureBytesError};
pub use crate::guard::{scoped_read, scoped_write, AccessGuard, AccessMode};
pub use crate::key::Key;
pub use crate::region::SecureRegion;
pub use crate::shared::SharedSecureBytes;
pub use memcall::MemoryProtection;
