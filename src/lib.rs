//! Jelly: a package manager for the Roblox ecosystem. Consumes the
//! Wally registry API and produces a Rojo-compatible `Packages/`
//! directory.

pub mod config;
pub mod engine;
pub mod error;
pub mod id;
pub mod idmap;
pub mod installer;
pub mod lockfile;
pub mod manifest;
pub mod registry;
pub mod resolver;
pub mod version;

pub use config::JellyConfig;
pub use engine::Engine;
pub use error::{JellyError, Result};
pub use id::PackageId;
pub use lockfile::Lockfile;
pub use manifest::Manifest;
pub use registry::{RegistryApi, RegistryClient};
pub use resolver::Range;
pub use version::Version;
