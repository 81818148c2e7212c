//! OS-level configuration hints for the current thread.
//!
//! This package exposes a narrow contract for adjusting how the operating
//! system schedules a thread: the scheduling policy, the scheduling priority,
//! the processor affinity set and the set of signals the thread accepts.
//! Consumers build a [`ThreadOptions`] value and [`apply`][ThreadOptions::apply]
//! it from the thread that should be affected.
//!
//! Everything here is a hint. A caller that cannot apply its preferred
//! configuration (insufficient privileges, unsupported platform) receives an
//! ordinary [`Error`] and is expected to carry on; nothing in this package
//! affects the correctness of the calling program, only its scheduling
//! behavior.
//!
//! The real implementation exists for Linux. On other platforms every
//! operation reports [`Error::Unsupported`].
//!
//! # Example
//!
//! ```
//! use thread_config::ThreadOptions;
//!
//! let options = ThreadOptions::new().with_affinity([0, 1]);
//!
//! // Failures are ordinary errors; callers typically log and continue.
//! if let Err(error) = options.apply() {
//!     eprintln!("thread configuration not applied: {error}");
//! }
//! ```

mod error;
mod options;

#[cfg(target_os = "linux")]
mod sys_linux;
#[cfg(not(target_os = "linux"))]
mod sys_fallback;

#[cfg(target_os = "linux")]
use sys_linux as sys;
#[cfg(not(target_os = "linux"))]
use sys_fallback as sys;

pub use error::*;
pub use options::*;
