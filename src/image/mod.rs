//! Read-only inspection of mapped images
//!
//! Everything in here treats the image as untrusted input: every offset is
//! bounds-checked against the mapped size before it is dereferenced, and a
//! record that does not resolve cleanly is dropped rather than reported as
//! an error.

pub mod scanner;
pub mod view;

pub use scanner::{ImportScanner, ImportSymbol, ImportThunk};
pub use view::ImageView;
