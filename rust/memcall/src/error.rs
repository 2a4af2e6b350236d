use thiserror::Error;

/// Errors that can occur during memory-related system calls.
#[derive(Error, Debug)]
pub enum MemcallError {
    /// The platform call failed; the message carries the OS error.
    #[error("System operation failed: {0}")]
    SystemError(String),

    /// Invalid arguments were provided to the operation.
    #[error("Invalid arguments: {0}")]
    InvalidArgument(String),

    /// The requested operation is not supported on this platform.
    #[error("Operation not supported on this platform: {0}")]
    NotSupported(String),
}

impl MemcallError {
    pub(crate) fn last_os_error(context: impl std::fmt::Display) -> Self {
        MemcallError::SystemError(format!(
            "<memcall> {} [Err: {}]",
            context,
            std::io::Error::last_os_error()
        ))
    }
}
