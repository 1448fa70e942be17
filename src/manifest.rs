//! `jelly.json`: the project manifest. Read/write is liberal on input
//! and strict on output: the writer formats with 2-space indent and a
//! trailing newline, and the reader coerces missing dependency maps
//! to empty rather than erroring.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{JellyError, Result};
use crate::id::PackageId;
use crate::idmap::IdMap;
use crate::resolver::Range;
use crate::version::Version;

pub const MANIFEST_FILE_NAME: &str = "jelly.json";

fn default_true() -> bool {
    true
}

fn default_packages_path() -> String {
    "Packages".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JellySettings {
    #[serde(default = "default_true")]
    pub cleanup: bool,
    #[serde(default = "default_true")]
    pub optimize: bool,
    #[serde(default = "default_packages_path")]
    pub packages_path: String,
    #[serde(default = "default_true")]
    pub update_project_file: bool,
}

impl Default for JellySettings {
    fn default() -> Self {
        JellySettings {
            cleanup: true,
            optimize: true,
            packages_path: default_packages_path(),
            update_project_file: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub dependencies: IdMap<Range>,
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: IdMap<Range>,
    #[serde(
        default,
        rename = "serverDependencies",
        skip_serializing_if = "IdMap::is_empty"
    )]
    pub server_dependencies: IdMap<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jelly: Option<JellySettings>,
}

impl Manifest {
    pub fn new(name: impl Into<String>) -> Manifest {
        Manifest {
            name: name.into(),
            version: Version::new(0, 1, 0),
            dependencies: IdMap::default(),
            dev_dependencies: IdMap::default(),
            server_dependencies: IdMap::default(),
            scripts: None,
            jelly: None,
        }
    }

    pub fn path(dir: &Path) -> PathBuf {
        dir.join(MANIFEST_FILE_NAME)
    }

    pub fn exists(dir: &Path) -> bool {
        Self::path(dir).is_file()
    }

    pub fn read(dir: &Path) -> Result<Manifest> {
        let path = Self::path(dir);
        let text = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                JellyError::ManifestMissing
            } else {
                JellyError::io(path.clone(), e)
            }
        })?;
        let manifest: Manifest =
            serde_json::from_str(&text).map_err(|e| JellyError::ManifestMalformed(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        self.validate()?;
        let path = Self::path(dir);
        let mut text =
            serde_json::to_string_pretty(self).map_err(|e| JellyError::ManifestMalformed(e.to_string()))?;
        text.push('\n');
        std::fs::write(&path, text).map_err(|e| JellyError::io(path, e))
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(JellyError::ManifestMalformed(
                "manifest `name` must not be empty".to_string(),
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for id in self
            .dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .chain(self.server_dependencies.keys())
        {
            if !seen.insert(id) {
                return Err(JellyError::ManifestMalformed(format!(
                    "`{id}` appears in more than one dependency map"
                )));
            }
        }
        Ok(())
    }

    pub fn settings(&self) -> JellySettings {
        self.jelly.clone().unwrap_or_default()
    }

    /// Every id the manifest names, across all three dependency maps —
    /// the set the orphan pruner and `install_all` walk.
    pub fn all_dependency_ids(&self) -> std::collections::BTreeSet<PackageId> {
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .chain(self.server_dependencies.keys())
            .cloned()
            .collect()
    }

    /// Production + dev + server ranges merged into one map, keyed by
    /// id, for feeding the resolver — root-level `serverDependencies`
    /// are installed just like `dependencies`.
    pub fn resolver_inputs(&self) -> std::collections::BTreeMap<PackageId, Range> {
        let mut out = std::collections::BTreeMap::new();
        for (id, range) in &self.dependencies {
            out.insert(id.clone(), range.clone());
        }
        for (id, range) in &self.dev_dependencies {
            out.insert(id.clone(), range.clone());
        }
        for (id, range) in &self.server_dependencies {
            out.insert(id.clone(), range.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let mut manifest = Manifest::new("demo");
        manifest
            .dependencies
            .insert("roblox/roact".parse().unwrap(), Range::parse("^1.4.0"));
        manifest.write(dir.path()).unwrap();

        let read_back = Manifest::read(dir.path()).unwrap();
        assert_eq!(read_back.name, "demo");
        assert_eq!(
            read_back.dependencies[&"roblox/roact".parse::<PackageId>().unwrap()].as_str(),
            "^1.4.0"
        );
    }

    #[test]
    fn missing_dependency_maps_coerce_to_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            Manifest::path(dir.path()),
            r#"{"name":"demo","version":"0.1.0"}"#,
        )
        .unwrap();

        let manifest = Manifest::read(dir.path()).unwrap();
        assert!(manifest.dependencies.is_empty());
        assert!(manifest.dev_dependencies.is_empty());
    }

    #[test]
    fn missing_file_is_manifest_missing() {
        let dir = TempDir::new().unwrap();
        let err = Manifest::read(dir.path()).unwrap_err();
        assert!(matches!(err, JellyError::ManifestMissing));
    }

    #[test]
    fn rejects_duplicate_id_across_dep_maps() {
        let mut manifest = Manifest::new("demo");
        let id: PackageId = "roblox/roact".parse().unwrap();
        manifest.dependencies.insert(id.clone(), Range::parse("^1.0.0"));
        manifest.dev_dependencies.insert(id, Range::parse("^1.0.0"));
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn write_is_two_space_indented_with_trailing_newline() {
        let dir = TempDir::new().unwrap();
        Manifest::new("demo").write(dir.path()).unwrap();
        let text = std::fs::read_to_string(Manifest::path(dir.path())).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.contains("\n  \"name\""));
    }
}
