//! Orphan pruner: deletes `_Index` directories and root shims with no
//! corresponding manifest entry. Also exposed directly as the `clean`
//! Engine op.

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::{JellyError, Result};
use crate::id::PackageId;

/// Removes orphaned `_Index` directories and root `.lua` shims.
/// Returns the names removed, for logging. `_Index` entries carrying
/// a legacy `@version` suffix are matched on their `{scope}_{name}`
/// prefix, so stale versioned installs are pruned too.
pub fn prune_orphans(packages_root: &Path, manifest_ids: &BTreeSet<PackageId>) -> Result<Vec<String>> {
    let mut removed = Vec::new();

    let index_dir = packages_root.join("_Index");
    if index_dir.is_dir() {
        let known: BTreeSet<String> = manifest_ids.iter().map(|id| id.index_dir_name()).collect();
        for entry in std::fs::read_dir(&index_dir).map_err(|e| JellyError::io(&index_dir, e))? {
            let entry = entry.map_err(|e| JellyError::io(&index_dir, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let dir_name = entry.file_name().to_string_lossy().into_owned();
            let base = dir_name.split('@').next().unwrap_or(&dir_name);
            if !known.contains(base) {
                std::fs::remove_dir_all(&path).map_err(|e| JellyError::io(&path, e))?;
                removed.push(dir_name);
            }
        }
    }

    if packages_root.is_dir() {
        let known_names: BTreeSet<&str> = manifest_ids.iter().map(|id| id.name()).collect();
        for entry in std::fs::read_dir(packages_root).map_err(|e| JellyError::io(packages_root, e))? {
            let entry = entry.map_err(|e| JellyError::io(packages_root, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_lua = path.extension().and_then(|e| e.to_str()) == Some("lua");
            if !is_lua {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !known_names.contains(stem) {
                std::fs::remove_file(&path).map_err(|e| JellyError::io(&path, e))?;
                removed.push(stem.to_string());
            }
        }
    }

    Ok(removed)
}
