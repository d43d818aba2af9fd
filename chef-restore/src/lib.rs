//! Chef Restore Library
//!
//! Restores a Chef server backup directory (clients, users, nodes, roles,
//! data bags, environments and cookbooks) onto a live server.

pub mod api;
pub mod backup;
pub mod component;
pub mod config;
pub mod cookbook;
pub mod fs;
pub mod loader;
pub mod pool;
pub mod restore;
pub mod utils;

// Re-export commonly used types
pub use component::ComponentKind;
pub use config::Config;
pub use restore::{RestoreOptions, Restorer, RunReport};
pub use utils::errors::RestoreError;
pub type Result<T> = std::result::Result<T, RestoreError>;
