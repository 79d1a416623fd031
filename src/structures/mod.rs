//! Executable-image layout definitions
//!
//! Read-only descriptions of the on-disk/in-memory format. Nothing here is
//! ever constructed or serialized by the engine, these types only give shape
//! to memory the host loader already mapped.

pub mod pe;
