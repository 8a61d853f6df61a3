//! Gigo Core: shared errors and utilities.
//!
//! This crate provides the foundational types used across all Gigo crates.
//! It has no internal Gigo dependencies.
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`util`]: File and path utilities

pub mod error;
pub mod util;

// Re-export key types at crate root for convenience
pub use error::{Error, Result};
pub use util::files::PatternVars;
