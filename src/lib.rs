#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_op_in_unsafe_fn)]

//! rethunk: import address table interception driven by module-load events
//!
//! The engine reacts to module-load notifications delivered by the host
//! process, walks the freshly mapped image's import directory, and rewrites
//! selected import thunk slots so that calls to registered functions land in
//! interceptor routines. The first value observed in a patched slot is kept
//! as the original address for pass-through calls.
//!
//! The pieces:
//!
//! - [`image`] - bounds-checked parsing of a mapped image's import directory
//! - [`hooks`] - hook/target configuration, thunk patching, and the load
//!   monitor entry point
//! - [`structures`] - raw executable-image layout definitions
//! - [`util`] - unaligned memory access and scoped protection changes
//!
//! Parsing and matching are plain memory operations and build on any target;
//! only the page-protection layer is Windows-specific.
//!
//! # Feature Flags
//!
//! - `std` (default): Use the standard library. Disable for `no_std`
//!   environments.
//! - `alloc`: Enable heap allocation in `no_std` mode (requires an
//!   allocator).

#[cfg(all(not(feature = "std"), feature = "alloc"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod error;
#[cfg(any(feature = "std", feature = "alloc"))]
pub mod hooks;
#[cfg(any(feature = "std", feature = "alloc"))]
pub mod image;
pub mod structures;
pub mod util;

#[cfg(test)]
mod testutil;

// re-exports for convenience
pub use error::{Result, RethunkError};
#[cfg(all(windows, any(feature = "std", feature = "alloc")))]
pub use hooks::ProtectedPatcher;
#[cfg(any(feature = "std", feature = "alloc"))]
pub use hooks::{Hook, HookTable, LoadMonitor, TargetImage, ThunkPatcher};
#[cfg(any(feature = "std", feature = "alloc"))]
pub use image::{ImageView, ImportScanner, ImportSymbol, ImportThunk};

/// library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
