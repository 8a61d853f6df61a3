//! Utility modules for file operations and path handling.
//!
//! # Modules
//!
//! - [`files`]: Async, read-only file lookup utilities
//! - [`paths`]: Path expansion helpers (tilde, environment variables)

pub mod files;
pub mod paths;
