//! Reference resolution for Gigo.
//!
//! Retrieved pages mention tables and figures in several payload
//! structures. This crate extracts those mentions, merges duplicates by
//! identity key, and attaches the rendered files found on disk so answers
//! can cite them.
//!
//! ```text
//! CandidateRecord ──► ReferenceExtractor × 5 ──► merge by key ──► FileLocator
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use gigo_references::ReferenceResolver;
//! use std::path::Path;
//!
//! let resolver = ReferenceResolver::new();
//! let references = resolver
//!     .resolve(ranked.records(), Path::new("scratch/service_manual_long"))
//!     .await;
//! ```

pub mod correlate;
pub mod extractors;
pub mod models;
pub mod resolver;

pub use correlate::{FileLocator, ScratchDirLocator};
pub use extractors::{ReferenceExtractor, default_extractors};
pub use models::{FilePaths, Reference, ReferenceKey, ReferenceKind};
pub use resolver::ReferenceResolver;
