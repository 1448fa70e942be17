//! Registry Client: typed, read-only access to the Wally registry.
//!
//! `RegistryApi` is a thin async trait backed by a `reqwest::Client`,
//! with retry-on-5xx handled by a small helper module (`retry.rs`).

mod retry;

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{JellyError, Result};
use crate::id::PackageId;
use crate::version::Version;

const USER_AGENT_PREFIX: &str = "jelly-cli";
const WALLY_VERSION_HEADER: &str = "0.3.2";

/// Informational hint from the registry: `shared` or `server`. The
/// core never branches on it beyond passing it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Realm {
    #[default]
    Shared,
    Server,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageMetadataInfo {
    pub scope: String,
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub realm: Option<Realm>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
}

/// One version's worth of metadata, as returned by the registry.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub package: PackageMetadataInfo,
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
    #[serde(default, rename = "server-dependencies")]
    pub server_dependencies: HashMap<String, String>,
    #[serde(default, rename = "dev-dependencies")]
    pub dev_dependencies: HashMap<String, String>,
}

impl VersionEntry {
    pub fn version(&self) -> &Version {
        &self.package.version
    }

    /// Production + server dependencies only, the set the resolver
    /// follows transitively.
    pub fn resolver_dependencies(&self) -> HashMap<String, String> {
        let mut out = self.dependencies.clone();
        out.extend(self.server_dependencies.clone());
        out
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawMetadataResponse {
    versions: Vec<VersionEntry>,
}

/// All versions of one package, ordered descending by precedence (the
/// registry's own guarantee; the client never re-sorts, and
/// `latest_version` trusts entry 0).
#[derive(Debug, Clone)]
pub struct RegistryMetadata {
    pub versions: Vec<VersionEntry>,
}

impl RegistryMetadata {
    pub fn find(&self, version: &Version) -> Option<&VersionEntry> {
        self.versions.iter().find(|v| v.version() == version)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    pub id: PackageId,
    pub versions: Vec<Version>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
}

#[async_trait]
pub trait RegistryApi: Send + Sync {
    async fn search(&self, query: &str, limit: Option<usize>) -> Result<Vec<SearchResult>>;
    async fn metadata(&self, id: &PackageId) -> Result<RegistryMetadata>;
    async fn latest_version(&self, id: &PackageId) -> Result<Version> {
        let metadata = self.metadata(id).await?;
        metadata
            .versions
            .first()
            .map(|v| v.version().clone())
            .ok_or_else(|| JellyError::PackageNotFound(id.clone()))
    }
    async fn download(&self, id: &PackageId, version: &Version) -> Result<Vec<u8>>;
}

/// Production registry client: one `reqwest::Client`, one base URL,
/// and a process-lifetime metadata cache owned by the value rather
/// than a `static`.
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: Url,
    cache: RwLock<HashMap<PackageId, RegistryMetadata>>,
}

impl RegistryClient {
    pub fn new(base_url: Url, timeout: std::time::Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| JellyError::RegistryError {
                status: 0,
                body: e.to_string(),
            })?;
        Ok(RegistryClient {
            http,
            base_url: ensure_trailing_slash(base_url),
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn user_agent() -> String {
        format!("{USER_AGENT_PREFIX}/{}", env!("CARGO_PKG_VERSION"))
    }

    async fn get(&self, path: &str, accept: &str) -> Result<reqwest::Response> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| JellyError::RegistryError {
                status: 0,
                body: format!("invalid registry URL `{path}`: {e}"),
            })?;
        let request = self
            .http
            .get(url)
            .header("User-Agent", Self::user_agent())
            .header("Accept", accept)
            .header("Wally-Version", WALLY_VERSION_HEADER);
        retry::send_with_retry(request).await
    }
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn search(&self, query: &str, limit: Option<usize>) -> Result<Vec<SearchResult>> {
        let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC).to_string();
        let path = format!("v1/package-search?query={encoded}");
        let response = self.get(&path, "application/json").await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JellyError::RegistryError {
                status: status.as_u16(),
                body,
            });
        }
        let mut results: Vec<SearchResult> =
            response.json().await.map_err(|e| JellyError::RegistryError {
                status: status.as_u16(),
                body: format!("malformed search response: {e}"),
            })?;
        if let Some(limit) = limit {
            results.truncate(limit);
        }
        Ok(results)
    }

    async fn metadata(&self, id: &PackageId) -> Result<RegistryMetadata> {
        if let Some(cached) = self.cache.read().unwrap().get(id) {
            return Ok(cached.clone());
        }

        let path = format!("v1/package-metadata/{}/{}", id.scope(), id.name());
        let response = self.get(&path, "application/json").await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(JellyError::PackageNotFound(id.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JellyError::RegistryError {
                status: status.as_u16(),
                body,
            });
        }

        let raw: RawMetadataResponse =
            response.json().await.map_err(|e| JellyError::RegistryError {
                status: status.as_u16(),
                body: format!("malformed metadata response: {e}"),
            })?;
        let metadata = RegistryMetadata {
            versions: raw.versions,
        };

        self.cache
            .write()
            .unwrap()
            .insert(id.clone(), metadata.clone());
        Ok(metadata)
    }

    async fn download(&self, id: &PackageId, version: &Version) -> Result<Vec<u8>> {
        let path = format!(
            "v1/package-contents/{}/{}/{}",
            id.scope(),
            id.name(),
            version
        );
        let response = self.get(&path, "application/zip").await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(JellyError::PackageNotFound(id.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JellyError::RegistryError {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await.map_err(|e| JellyError::RegistryError {
            status: status.as_u16(),
            body: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

/// The `https://api.wally.run/v1/package-contents/...` URL form stored
/// verbatim in lockfile entries.
pub fn contents_url(base_url: &Url, id: &PackageId, version: &Version) -> String {
    let base_url = ensure_trailing_slash(base_url.clone());
    format!(
        "{}v1/package-contents/{}/{}/{}",
        base_url,
        id.scope(),
        id.name(),
        version
    )
}

fn ensure_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
