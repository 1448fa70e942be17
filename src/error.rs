//! Crate-wide error taxonomy.
//!
//! Every failure produced by the core maps to exactly one of these
//! variants. Components return `Result<T, JellyError>` directly rather
//! than each owning a private error type, because the taxonomy below is
//! already a closed, cross-cutting set rather than a per-layer concern.

use std::path::PathBuf;

use crate::id::PackageId;
use crate::resolver::Conflict;

#[derive(Debug, thiserror::Error)]
pub enum JellyError {
    #[error("no jelly.json found in this directory")]
    ManifestMissing,

    #[error("jelly.json is malformed: {0}")]
    ManifestMalformed(String),

    #[error("lockfile is stale relative to jelly.json")]
    LockfileStale,

    #[error("package `{0}` was not found in the registry")]
    PackageNotFound(PackageId),

    #[error("no version of `{0}` satisfies `{1}`")]
    VersionNotFound(PackageId, String),

    #[error("could not satisfy requirements for {}", .0.iter().map(|c| c.id.to_string()).collect::<Vec<_>>().join(", "))]
    UnsatisfiableRange(Vec<Conflict>),

    #[error("registry returned HTTP {status}: {body}")]
    RegistryError { status: u16, body: String },

    #[error("archive error at {path}: {cause}")]
    ArchiveError { path: PathBuf, cause: String },

    #[error("I/O error at {path}: {cause}")]
    IoError { path: PathBuf, cause: String },

    #[error("jelly.json already exists in this directory")]
    AlreadyInitialized,

    #[error("this operation requires network access, but offline mode is enabled")]
    Offline,
}

impl JellyError {
    pub fn io(path: impl Into<PathBuf>, cause: std::io::Error) -> Self {
        JellyError::IoError {
            path: path.into(),
            cause: cause.to_string(),
        }
    }

    pub fn archive(path: impl Into<PathBuf>, cause: impl std::fmt::Display) -> Self {
        JellyError::ArchiveError {
            path: path.into(),
            cause: cause.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, JellyError>;
