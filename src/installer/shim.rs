//! Writes the root-level alias shims that let Rojo scripts
//! `require(ReplicatedStorage.Packages.Roact)` instead of reaching
//! into `_Index` directly.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{JellyError, Result};
use crate::id::PackageId;
use crate::version::Version;

pub const SHIM_HEADER: &str = "-- This file is generated by Jelly. Do not modify it manually.\n-- It is used to point to the correct installation of the package.";

/// Writes one shim per unique leaf name across `packages`. When two or
/// more ids share a leaf name (stale/legacy state), each gets a
/// version-suffixed shim and the unversioned `{name}.lua` points at
/// the highest SemVer among them.
pub fn emit_shims(packages_root: &Path, packages: &[(PackageId, Version)]) -> Result<()> {
    let mut by_name: BTreeMap<&str, Vec<&(PackageId, Version)>> = BTreeMap::new();
    for entry in packages {
        by_name.entry(entry.0.name()).or_default().push(entry);
    }

    for (name, mut group) in by_name {
        if group.len() == 1 {
            let (id, _version) = group[0];
            write_shim(packages_root, &format!("{name}.lua"), id)?;
            continue;
        }

        group.sort_by(|a, b| a.1.cmp(&b.1));
        for (id, version) in &group {
            let file_name = format!("{name}_{}.lua", sanitize_version(version));
            write_shim(packages_root, &file_name, id)?;
        }
        let (highest_id, _) = group.last().expect("group is non-empty");
        write_shim(packages_root, &format!("{name}.lua"), highest_id)?;
    }
    Ok(())
}

fn sanitize_version(version: &Version) -> String {
    version
        .to_string()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn write_shim(packages_root: &Path, file_name: &str, id: &PackageId) -> Result<()> {
    let path = packages_root.join(file_name);
    let content = format!(
        "{SHIM_HEADER}\nreturn require(script.Parent._Index[\"{}\"])\n",
        id.index_dir_name()
    );
    std::fs::write(&path, content).map_err(|e| JellyError::io(path, e))
}
