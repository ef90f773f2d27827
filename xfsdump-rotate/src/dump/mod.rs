//! Dump files on disk: naming, discovery and allocation.

pub mod allocator;
pub mod name;
pub mod scanner;

pub use allocator::allocate_dump_name;
pub use name::{filesystem_slug, DumpLevel, DumpName, DUMP_EXTENSION};
pub use scanner::{scan_dump_dir, DumpFile};
