//! Shared scaffolding for end-to-end Engine tests: a scratch project
//! directory, an `httpmock` stand-in for `api.wally.run`, and a tiny
//! zip-archive builder for mocked download bodies.

use std::io::Write as _;
use std::sync::Arc;

use httpmock::MockServer;
use jelly::{Engine, JellyConfig, RegistryClient};
use tempfile::TempDir;
use zip::write::{SimpleFileOptions, ZipWriter};

pub struct Project {
    pub dir: TempDir,
    pub server: MockServer,
}

impl Project {
    pub fn new() -> Self {
        Project {
            dir: TempDir::new().unwrap(),
            server: MockServer::start(),
        }
    }

    pub fn engine(&self) -> Engine {
        let base_url = url::Url::parse(&self.server.base_url()).unwrap();
        let config = JellyConfig::new(self.dir.path()).with_registry_base_url(base_url.clone());
        let registry = Arc::new(RegistryClient::new(base_url, config.http_timeout).unwrap());
        Engine::new(self.dir.path(), config, registry)
    }

    pub fn path(&self, relative: &str) -> std::path::PathBuf {
        self.dir.path().join(relative)
    }
}

/// Builds a single-file zip archive whose root contains one `.lua`
/// file with the given name and body, matching the shape a real Wally
/// tarball's contents endpoint returns.
pub fn single_file_archive(file_name: &str, body: &str) -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    {
        let mut writer = ZipWriter::new(&mut buf);
        let options = SimpleFileOptions::default();
        writer.start_file(file_name, options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
        writer.finish().unwrap();
    }
    buf.into_inner()
}

/// The `{"versions": [...]}` metadata JSON body for one package with
/// one version and no dependencies, in the registry's wire shape.
pub fn metadata_body(scope: &str, name: &str, version: &str, deps: &[(&str, &str)]) -> serde_json::Value {
    versions_body(scope, name, &[(version, deps)])
}

/// The full multi-version metadata body. Versions must be supplied in
/// descending order, matching the real registry's own contract.
pub fn versions_body(scope: &str, name: &str, versions: &[(&str, &[(&str, &str)])]) -> serde_json::Value {
    let entries: Vec<serde_json::Value> = versions
        .iter()
        .map(|(version, deps)| {
            let dependencies: serde_json::Map<String, serde_json::Value> = deps
                .iter()
                .map(|(k, v)| ((*k).to_string(), serde_json::Value::String((*v).to_string())))
                .collect();
            serde_json::json!({
                "package": {
                    "scope": scope,
                    "name": name,
                    "version": version,
                },
                "dependencies": dependencies,
            })
        })
        .collect();
    serde_json::json!({ "versions": entries })
}
