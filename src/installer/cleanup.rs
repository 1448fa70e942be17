//! Removes well-known, non-consumable files from an installed
//! package's root.

use std::path::Path;

use crate::error::{JellyError, Result};

const WELL_KNOWN_ENTRIES: &[&str] = &[
    "README.md",
    "README.txt",
    "LICENSE",
    "LICENSE.md",
    "LICENSE.txt",
    ".gitignore",
    ".gitattributes",
    ".github",
    ".git",
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "wally.toml",
    "selene.toml",
    "stylua.toml",
    "docs",
    "documentation",
    "examples",
    "test",
    "tests",
    ".travis.yml",
    ".vscode",
    "rotriever.toml",
];

/// Deletes any well-known entry present directly under `package_dir`.
/// Never touches anything outside it.
pub fn clean_package_root(package_dir: &Path) -> Result<()> {
    for name in WELL_KNOWN_ENTRIES {
        let path = package_dir.join(name);
        if path.is_dir() {
            std::fs::remove_dir_all(&path).map_err(|e| JellyError::io(path, e))?;
        } else if path.is_file() {
            std::fs::remove_file(&path).map_err(|e| JellyError::io(path, e))?;
        }
    }
    Ok(())
}
