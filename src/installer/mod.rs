//! Package Installer: fetch → extract → normalize → clean up →
//! remove archive, then (once a whole graph has settled) shim
//! emission and orphan pruning.

mod cleanup;
mod prune;
mod project_file;
mod shim;

use std::path::{Path, PathBuf};

use tokio::task;
use zip::ZipArchive;

use crate::error::{JellyError, Result};
use crate::id::PackageId;
use crate::lockfile::LockEntry;
use crate::manifest::JellySettings;
use crate::registry::RegistryApi;

pub use prune::prune_orphans;
pub use shim::emit_shims;

pub const INDEX_DIR_NAME: &str = "_Index";

/// What the Engine hands to the excluded Rojo project-file writer
/// collaborator after an install settles.
#[derive(Debug, Clone)]
pub struct ProjectFileRequest {
    pub packages_path: PathBuf,
    pub mount_point: String,
}

impl ProjectFileRequest {
    pub fn new(packages_path: impl Into<PathBuf>) -> Self {
        ProjectFileRequest {
            packages_path: packages_path.into(),
            mount_point: "ReplicatedStorage.Packages".to_string(),
        }
    }
}

/// Installs one locked package. A download failure here is treated by
/// the Engine as a warned skip for this package only; later-stage
/// failures abort just this package's install.
pub async fn install_one(
    registry: &dyn RegistryApi,
    packages_root: &Path,
    id: &PackageId,
    entry: &LockEntry,
    settings: &JellySettings,
) -> Result<()> {
    let index_dir = packages_root.join(INDEX_DIR_NAME).join(id.index_dir_name());
    let archive_path = index_dir.join(format!("{}.zip", id.index_dir_name()));

    let bytes = registry.download(id, &entry.version).await?;

    tokio::fs::create_dir_all(&index_dir)
        .await
        .map_err(|e| JellyError::io(index_dir.clone(), e))?;
    tokio::fs::write(&archive_path, &bytes)
        .await
        .map_err(|e| JellyError::io(archive_path.clone(), e))?;

    let extract_dir = index_dir.clone();
    let archive_for_blocking = archive_path.clone();
    task::spawn_blocking(move || extract_zip(&archive_for_blocking, &extract_dir))
        .await
        .map_err(|e| JellyError::archive(archive_path.clone(), e.to_string()))??;

    if settings.optimize {
        project_file::normalize(&index_dir)?;
    }
    if settings.cleanup {
        cleanup::clean_package_root(&index_dir)?;
    }

    tokio::fs::remove_file(&archive_path)
        .await
        .map_err(|e| JellyError::io(archive_path, e))?;

    Ok(())
}

/// Extracts `archive_path` into `dest`, directories first, refusing
/// any entry whose normalized path escapes `dest` — `enclosed_name`
/// is the `zip` crate's own component-wise traversal defense.
fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(archive_path).map_err(|e| JellyError::io(archive_path, e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| JellyError::archive(archive_path, e))?;

    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| JellyError::archive(archive_path, e))?;
        if !entry.is_dir() {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            return Err(JellyError::archive(
                archive_path,
                format!("zip entry `{}` escapes the target directory", entry.name()),
            ));
        };
        std::fs::create_dir_all(dest.join(relative)).map_err(|e| JellyError::io(dest, e))?;
    }

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|e| JellyError::archive(archive_path, e))?;
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            return Err(JellyError::archive(
                archive_path,
                format!("zip entry `{}` escapes the target directory", entry.name()),
            ));
        };
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| JellyError::io(parent, e))?;
        }
        let mut out = std::fs::File::create(&target).map_err(|e| JellyError::io(target.clone(), e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| JellyError::io(target, e))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::TempDir;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn build_fixture_zip() -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut writer = ZipWriter::new(&mut buf);
            let options = SimpleFileOptions::default();
            writer.add_directory("src/", options).unwrap();
            writer.start_file("src/init.lua", options).unwrap();
            writer.write_all(b"return {}").unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn extract_zip_writes_directories_and_files() {
        let dir = TempDir::new().unwrap();
        let archive_path = dir.path().join("fixture.zip");
        std::fs::write(&archive_path, build_fixture_zip()).unwrap();

        let dest = dir.path().join("out");
        std::fs::create_dir_all(&dest).unwrap();
        extract_zip(&archive_path, &dest).unwrap();

        assert!(dest.join("src/init.lua").is_file());
    }
}
