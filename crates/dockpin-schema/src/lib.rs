//! Lock files, selection files, and base image inference for dockpin.
//!
//! This crate defines the schema layer: the line-oriented lock file format
//! (`LockDocument`, `PinnedPackage`), the package selection file (`Selection`),
//! and Dockerfile parsing to infer the base image packages are resolved against.

pub mod dockerfile;
pub mod lock;
pub mod selection;

pub use dockerfile::last_base_image;
pub use lock::{parse_package_lines, LockDocument, LockError, PinnedPackage, LOCK_HEADER};
pub use selection::Selection;
