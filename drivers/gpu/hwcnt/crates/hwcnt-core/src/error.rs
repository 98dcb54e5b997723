//! # HWCNT Error Handling
//!
//! Recoverable failures are returned as [`Error`]. Broken internal contracts
//! (a layout that disagrees with itself, a block type outside the family a
//! backend was built for) are not errors: they go through
//! [`contract_violation`], which logs and panics, since continuing would
//! silently corrupt counter data.

use core::fmt;

// =============================================================================
// RESULT TYPE
// =============================================================================

/// HWCNT Result type alias
pub type Result<T> = core::result::Result<T, Error>;

// =============================================================================
// ERROR ENUM
// =============================================================================

/// HWCNT unified error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Invalid parameter provided
    InvalidParameter,
    /// Two containers are bound to different metadata
    MetadataMismatch,
    /// Raw dump source is smaller than the layout requires
    SourceTooSmall {
        /// Bytes the layout requires
        required: usize,
        /// Bytes actually provided
        provided: usize,
    },
    /// More block instances than the availability mask can describe
    CapacityExceeded {
        /// Requested instance count
        instances: usize,
        /// Maximum instance count
        limit: usize,
    },
    /// Out of memory while building a container
    OutOfMemory,
}

/// `EINVAL` from the kernel errno table
const EINVAL: i32 = 22;
/// `ENOMEM` from the kernel errno table
const ENOMEM: i32 = 12;

impl Error {
    /// Signed kernel error code for driver-level callers
    pub const fn to_errno(self) -> i32 {
        match self {
            Self::InvalidParameter
            | Self::MetadataMismatch
            | Self::SourceTooSmall { .. }
            | Self::CapacityExceeded { .. } => -EINVAL,
            Self::OutOfMemory => -ENOMEM,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::MetadataMismatch => write!(f, "containers bound to different metadata"),
            Self::SourceTooSmall { required, provided } => write!(
                f,
                "dump source too small: {} bytes provided, {} required",
                provided, required
            ),
            Self::CapacityExceeded { instances, limit } => write!(
                f,
                "{} block instances exceed the limit of {}",
                instances, limit
            ),
            Self::OutOfMemory => write!(f, "out of memory"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

// =============================================================================
// CONTRACT VIOLATIONS
// =============================================================================

/// Report a broken internal contract and stop.
///
/// Used where the C-style drivers would `WARN_ON`: the state is not something
/// a caller can recover from, and carrying on would produce wrong counters.
#[cold]
#[track_caller]
pub fn contract_violation(args: fmt::Arguments<'_>) -> ! {
    log::error!("hwcnt contract violation: {}", args);
    panic!("hwcnt contract violation: {}", args)
}
