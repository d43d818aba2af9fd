//! Filesystem helpers.

pub mod walker;

pub use walker::{copy_tree, walk_directory, FileInfo, WalkOptions};
