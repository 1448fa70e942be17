//! Process/environment configuration, threaded through the Engine
//! constructor rather than read from globals anywhere in the core.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

const DEFAULT_REGISTRY: &str = "https://api.wally.run";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct JellyConfig {
    pub home_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub registry_base_url: Url,
    pub http_timeout: Duration,
    pub offline: bool,
}

impl JellyConfig {
    /// Builds the default configuration rooted at `home_dir` (the
    /// caller resolves `$HOME` or an equivalent; the core never reads
    /// environment variables itself).
    pub fn new(home_dir: impl Into<PathBuf>) -> Self {
        let home_dir = home_dir.into();
        let cache_dir = home_dir.join(".jelly").join("cache");
        JellyConfig {
            home_dir,
            cache_dir,
            registry_base_url: Url::parse(DEFAULT_REGISTRY).expect("default registry URL is valid"),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            offline: false,
        }
    }

    pub fn with_registry_base_url(mut self, url: Url) -> Self {
        self.registry_base_url = url;
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn auth_file(&self) -> PathBuf {
        self.home_dir.join(".jelly").join("auth.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_derive_from_home_dir() {
        let config = JellyConfig::new("/home/demo");
        assert_eq!(config.cache_dir, PathBuf::from("/home/demo/.jelly/cache"));
        assert_eq!(config.registry_base_url.as_str(), "https://api.wally.run/");
        assert!(!config.offline);
    }
}
