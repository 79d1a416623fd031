//! Unified error types for rethunk

use core::fmt;

/// all errors that can occur in rethunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RethunkError {
    // === configuration ===
    /// hook table exceeds the bitmap width
    TooManyHooks { count: usize, max: usize },

    // === memory ===
    /// null pointer where non-null expected
    NullPointer { context: &'static str },

    /// failed to change memory protection
    ProtectionChangeFailed { address: usize, size: usize },

    // === win32 ===
    /// underlying Win32 API returned error
    Win32Error { code: u32, context: &'static str },
}

impl fmt::Display for RethunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyHooks { count, max } => {
                write!(f, "hook table holds {count} entries, bitmap supports {max}")
            }
            Self::NullPointer { context } => {
                write!(f, "unexpected null pointer in {context}")
            }
            Self::ProtectionChangeFailed { address, size } => {
                write!(
                    f,
                    "failed to change protection for {size} bytes at {address:#x}"
                )
            }
            Self::Win32Error { code, context } => {
                write!(f, "Win32 error {code:#x} in {context}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RethunkError {}

/// result type alias using RethunkError
pub type Result<T> = core::result::Result<T, RethunkError>;

#[cfg(windows)]
impl RethunkError {
    /// create Win32Error from GetLastError
    pub fn from_last_error(context: &'static str) -> Self {
        // SAFETY: GetLastError is always safe to call
        let code = unsafe { GetLastError() };
        Self::Win32Error { code, context }
    }
}

#[cfg(windows)]
#[link(name = "kernel32")]
extern "system" {
    fn GetLastError() -> u32;
}
