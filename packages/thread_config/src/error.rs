use std::io;

use thiserror::Error;

/// Errors that can occur when applying or retrieving thread configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The operating system rejected the requested configuration.
    ///
    /// Typical causes are insufficient privileges (elevated scheduling
    /// policies usually require them) or a processor index that does not
    /// exist on this machine.
    #[error("'{operation}' failed: {source}")]
    Os {
        /// The operation that failed, named after the underlying OS call.
        operation: &'static str,

        /// The error reported by the operating system.
        #[source]
        source: io::Error,
    },

    /// Thread configuration is not implemented for the current platform.
    #[error("'{operation}' is not supported on this platform")]
    Unsupported {
        /// The operation that was requested.
        operation: &'static str,
    },
}

/// A specialized `Result` type for thread-configuration operations, returning
/// the package's [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn os_error_preserves_source() {
        let error = Error::Os {
            operation: "sched_setaffinity",
            source: io::Error::from_raw_os_error(22),
        };

        let message = error.to_string();
        assert!(message.contains("sched_setaffinity"));
    }
}
