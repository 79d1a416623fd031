//! Hook configuration and installation
//!
//! The data model mirrors the shape of the work: a flat table of
//! interceptable functions ([`Hook`]), a list of modules worth scanning
//! ([`TargetImage`]) with a bitmap selecting which hooks apply to each, and
//! the [`LoadMonitor`] that ties both to the host's module-load
//! notifications.

pub mod monitor;
pub mod patcher;
pub mod registry;

pub use monitor::LoadMonitor;
#[cfg(windows)]
pub use patcher::ProtectedPatcher;
pub use patcher::ThunkPatcher;
pub use registry::{Hook, HookTable, TargetImage, MAX_HOOKS};
