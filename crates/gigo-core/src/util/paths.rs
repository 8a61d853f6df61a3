//! Path resolution utilities.
//!
//! Helpers for turning user-supplied paths (config values, CLI flags) into
//! concrete filesystem paths.

use std::path::{Path, PathBuf};

/// Expands `~` to the user's home directory.
///
/// If the path starts with `~`, replaces it with the user's home directory.
/// Otherwise returns the path unchanged.
///
/// # Example
///
/// ```
/// use gigo_core::util::paths::expand_tilde;
///
/// let expanded = expand_tilde("~/scratch");
/// assert!(!expanded.starts_with("~"));
/// ```
pub fn expand_tilde<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

/// Expands `~` and `$VAR` / `${VAR}` references in a path string.
///
/// Unknown variables leave the input untouched rather than failing, so a
/// literal `$` in a directory name still resolves to something usable.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => expand_tilde(raw),
    }
}
