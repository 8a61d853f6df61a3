//! The `gigo` command-line interface.
//!
//! # Commands
//!
//! - `gigo search <query>`: ranked candidates from the configured strategy
//! - `gigo references <query>`: tables and figures behind those candidates,
//!   correlated with rendered files in the scratch directory
//! - `gigo ask <question>`: decomposed retrieval plus an LLM answer
//! - `gigo config {path,get,set,init,export}`: configuration management
//! - `gigo version`

pub mod app;
pub mod cli;
pub mod config;
pub mod config_handlers;

pub use app::{Backends, GigoApp};
pub use cli::CliArgs;
pub use config::GigoConfig;
