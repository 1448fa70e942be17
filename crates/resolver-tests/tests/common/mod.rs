//! A tiny in-memory registry double plus a builder DSL, so resolver
//! tests never touch the network. Generalizes the `FakeRegistry` in
//! `jelly::resolver`'s own unit tests into something the property and
//! cross-validation suites can both drive.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use jelly::registry::{PackageMetadataInfo, RegistryApi, RegistryMetadata, SearchResult, VersionEntry};
use jelly::{PackageId, Version};

pub struct FakeRegistry {
    packages: Mutex<HashMap<PackageId, RegistryMetadata>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        FakeRegistry {
            packages: Mutex::new(HashMap::new()),
        }
    }

    /// Registers one version of `id` with the given production
    /// dependency ranges. Versions may be added in any order; the
    /// registry keeps them sorted descending, matching the real
    /// Wally API's documented ordering guarantee.
    pub fn add(&self, id: &str, version: &str, deps: &[(&str, &str)]) -> &Self {
        let id: PackageId = id.parse().expect("valid package id in test fixture");
        let mut dependencies = HashMap::new();
        for (k, v) in deps {
            dependencies.insert((*k).to_string(), (*v).to_string());
        }
        let entry = VersionEntry {
            package: PackageMetadataInfo {
                scope: id.scope().to_string(),
                name: id.name().to_string(),
                version: Version::parse(version).expect("valid version in test fixture"),
                realm: None,
                description: None,
                license: None,
                authors: Vec::new(),
                repository: None,
                homepage: None,
            },
            dependencies,
            server_dependencies: HashMap::new(),
            dev_dependencies: HashMap::new(),
        };
        let mut packages = self.packages.lock().unwrap();
        let metadata = packages.entry(id).or_insert_with(|| RegistryMetadata { versions: Vec::new() });
        metadata.versions.push(entry);
        metadata.versions.sort_by(|a, b| b.version().cmp(a.version()));
        self
    }
}

impl Default for FakeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryApi for FakeRegistry {
    async fn search(&self, _query: &str, _limit: Option<usize>) -> jelly::Result<Vec<SearchResult>> {
        Ok(Vec::new())
    }

    async fn metadata(&self, id: &PackageId) -> jelly::Result<RegistryMetadata> {
        self.packages
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| jelly::JellyError::PackageNotFound(id.clone()))
    }

    async fn download(&self, _id: &PackageId, _version: &Version) -> jelly::Result<Vec<u8>> {
        unimplemented!("resolver tests never download archives")
    }
}

pub fn base_url() -> url::Url {
    url::Url::parse("https://api.wally.run").unwrap()
}

/// Shorthand for building a `(PackageId, Range)` direct-requirement
/// entry in test bodies, e.g. `req("a/x", "^1.2.0")`.
pub fn req(id: &str, range: &str) -> (PackageId, jelly::resolver::Range) {
    (id.parse().unwrap(), jelly::resolver::Range::parse(range))
}
