//! `jelly-lock.json`: the resolved, pinned dependency graph.
//!
//! Mirrors `manifest.rs`'s read/write shape, but `read` never surfaces
//! a malformed-or-wrong-version file as an error — it is simply
//! "absent", and the caller regenerates.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{JellyError, Result};
use crate::id::PackageId;
use crate::idmap::IdMap;
use crate::manifest::Manifest;
use crate::registry::RegistryApi;
use crate::resolver::{self, Conflict, Range};
use crate::version::Version;

pub const LOCKFILE_FILE_NAME: &str = "jelly-lock.json";
pub const LOCKFILE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockEntry {
    pub version: Version,
    pub resolved: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    #[serde(default, skip_serializing_if = "IdMap::is_empty")]
    pub dependencies: IdMap<Range>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(rename = "lockfileVersion")]
    pub lockfile_version: u32,
    pub name: String,
    pub version: Version,
    pub packages: IdMap<LockEntry>,
    pub dependencies: IdMap<Range>,
    #[serde(rename = "devDependencies")]
    pub dev_dependencies: IdMap<Range>,
}

impl Lockfile {
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(LOCKFILE_FILE_NAME)
    }

    pub fn exists(dir: &Path) -> bool {
        Self::path(dir).is_file()
    }

    pub fn delete(dir: &Path) -> Result<()> {
        match std::fs::remove_file(Self::path(dir)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(JellyError::io(Self::path(dir), e)),
        }
    }

    /// Reads the lockfile. A malformed file or a `lockfileVersion`
    /// other than 1 is reported as `Ok(None)` ("absent"), never
    /// partially consumed — only a genuine I/O failure is `Err`.
    pub fn read(dir: &Path) -> Result<Option<Lockfile>> {
        let path = Self::path(dir);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(JellyError::io(path, e)),
        };
        match serde_json::from_str::<Lockfile>(&text) {
            Ok(lockfile) if lockfile.lockfile_version == LOCKFILE_VERSION => Ok(Some(lockfile)),
            _ => Ok(None),
        }
    }

    /// Atomic replace: write to a temp file in the same directory,
    /// then rename over the target.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = Self::path(dir);
        let mut text =
            serde_json::to_string_pretty(self).map_err(|e| JellyError::ManifestMalformed(e.to_string()))?;
        text.push('\n');

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| JellyError::io(dir, e))?;
        tmp.write_all(text.as_bytes())
            .map_err(|e| JellyError::io(path.clone(), e))?;
        tmp.flush().map_err(|e| JellyError::io(path.clone(), e))?;
        tmp.persist(&path)
            .map_err(|e| JellyError::io(path, e.error))?;
        Ok(())
    }

    /// True iff the manifest's merged top-level `dependencies` and
    /// `devDependencies` ranges are identical, key-for-key, to what
    /// this lockfile was generated against.
    pub fn matches_manifest_ranges(&self, manifest: &Manifest) -> bool {
        top_level_view(manifest) == existing_top_level_view(self)
    }

    /// True iff every key of `manifest.dependencies ∪
    /// manifest.devDependencies` has a corresponding `packages` entry.
    pub fn validate(&self, manifest: &Manifest) -> bool {
        manifest
            .dependencies
            .keys()
            .chain(manifest.dev_dependencies.keys())
            .all(|id| self.packages.contains_key(id))
    }

    /// Runs the resolver over the manifest's merged dependency set and
    /// builds a fresh lockfile.
    pub async fn generate(
        manifest: &Manifest,
        registry: &dyn RegistryApi,
        base_url: &Url,
    ) -> Result<(Lockfile, Vec<Conflict>)> {
        let direct = manifest.resolver_inputs();
        let outcome = resolver::resolve_tree(registry, base_url, &direct).await?;

        let mut packages = IdMap::default();
        for (id, node) in &outcome.graph.nodes {
            let dependencies: IdMap<Range> = node.deps.clone().into_iter().collect();
            packages.insert(
                id.clone(),
                LockEntry {
                    version: node.version.clone(),
                    resolved: node.url.clone(),
                    integrity: None,
                    dependencies,
                },
            );
        }

        let lockfile = Lockfile {
            lockfile_version: LOCKFILE_VERSION,
            name: manifest.name.clone(),
            version: manifest.version.clone(),
            packages,
            dependencies: manifest.dependencies.clone(),
            dev_dependencies: manifest.dev_dependencies.clone(),
        };
        Ok((lockfile, outcome.conflicts))
    }

    /// Reuses the on-disk lockfile if it still covers every manifest
    /// dependency and the manifest's top-level dependency view hasn't
    /// changed since it was generated, otherwise regenerates.
    pub async fn update(
        dir: &Path,
        manifest: &Manifest,
        registry: &dyn RegistryApi,
        base_url: &Url,
    ) -> Result<(Lockfile, Vec<Conflict>)> {
        if let Some(existing) = Self::read(dir)? {
            if existing.validate(manifest) && existing.matches_manifest_ranges(manifest) {
                return Ok((existing, Vec::new()));
            }
        }
        Self::generate(manifest, registry, base_url).await
    }
}

fn top_level_view(manifest: &Manifest) -> BTreeMap<PackageId, Range> {
    manifest
        .dependencies
        .iter()
        .chain(manifest.dev_dependencies.iter())
        .map(|(id, range)| (id.clone(), range.clone()))
        .collect()
}

fn existing_top_level_view(lockfile: &Lockfile) -> BTreeMap<PackageId, Range> {
    lockfile
        .dependencies
        .iter()
        .chain(lockfile.dev_dependencies.iter())
        .map(|(id, range)| (id.clone(), range.clone()))
        .collect()
}
