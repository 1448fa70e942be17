//! Normalizes an extracted package so its root contains just the
//! Roblox-consumable module tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{JellyError, Result};

/// The shape of a `default.project.json` `tree` node. Only the root's
/// `$path` is ever read; unknown sibling keys fall into `children`
/// (for `Container`) or are simply ignored by serde's default
/// unknown-field tolerance (for `Path`), so a project file shaped
/// differently than expected never fails normalization outright.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ProjectFileNode {
    Path {
        #[serde(rename = "$path")]
        path: String,
    },
    Container {
        #[serde(rename = "$path", default)]
        path: Option<String>,
        #[serde(flatten)]
        #[allow(dead_code)]
        children: BTreeMap<String, serde_json::Value>,
    },
}

impl ProjectFileNode {
    fn path(&self) -> Option<&str> {
        match self {
            ProjectFileNode::Path { path } => Some(path),
            ProjectFileNode::Container { path, .. } => path.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProjectFile {
    tree: ProjectFileNode,
}

pub fn normalize(package_dir: &Path) -> Result<()> {
    let project_file_path = package_dir.join("default.project.json");
    if project_file_path.is_file() {
        let text = std::fs::read_to_string(&project_file_path)
            .map_err(|e| JellyError::io(&project_file_path, e))?;
        if let Ok(project_file) = serde_json::from_str::<ProjectFile>(&text) {
            if let Some(main_path) = project_file.tree.path() {
                return promote_main_module(package_dir, main_path);
            }
        }
        return Ok(());
    }

    let has_init = package_dir.join("init.lua").is_file() || package_dir.join("init.luau").is_file();
    if !has_init {
        let candidates = root_lua_files(package_dir)?;
        if candidates.len() == 1 {
            let target = package_dir.join("init.lua");
            std::fs::rename(&candidates[0], &target).map_err(|e| JellyError::io(target, e))?;
        }
    }
    Ok(())
}

/// Moves `main_relative`'s contents up to replace `package_dir`,
/// deleting everything else. Rejects a `main_relative` that would
/// escape `package_dir`.
fn promote_main_module(package_dir: &Path, main_relative: &str) -> Result<()> {
    let main_root = safe_join(package_dir, main_relative)?;
    if !main_root.is_dir() {
        return Ok(());
    }

    let parent = package_dir.parent().unwrap_or(package_dir);
    let staging =
        tempfile::tempdir_in(parent).map_err(|e| JellyError::io(package_dir, e))?;
    let staged_root = staging.path().join("root");
    std::fs::rename(&main_root, &staged_root).map_err(|e| JellyError::io(&main_root, e))?;

    for entry in std::fs::read_dir(package_dir).map_err(|e| JellyError::io(package_dir, e))? {
        let entry = entry.map_err(|e| JellyError::io(package_dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            std::fs::remove_dir_all(&path).map_err(|e| JellyError::io(&path, e))?;
        } else {
            std::fs::remove_file(&path).map_err(|e| JellyError::io(&path, e))?;
        }
    }

    for entry in std::fs::read_dir(&staged_root).map_err(|e| JellyError::io(&staged_root, e))? {
        let entry = entry.map_err(|e| JellyError::io(&staged_root, e))?;
        let dest = package_dir.join(entry.file_name());
        std::fs::rename(entry.path(), &dest).map_err(|e| JellyError::io(dest, e))?;
    }
    Ok(())
}

fn safe_join(base: &Path, relative: &str) -> Result<PathBuf> {
    let mut out = base.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            std::path::Component::Normal(part) => out.push(part),
            std::path::Component::CurDir => {}
            _ => {
                return Err(JellyError::archive(
                    base,
                    format!("unsafe project tree path `{relative}`"),
                ))
            }
        }
    }
    Ok(out)
}

fn root_lua_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| JellyError::io(dir, e))? {
        let entry = entry.map_err(|e| JellyError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if ext == "lua" || ext == "luau" {
                out.push(path);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn renames_sole_root_script_to_init_lua() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Roact.lua"), "return {}").unwrap();

        normalize(dir.path()).unwrap();

        assert!(dir.path().join("init.lua").is_file());
        assert!(!dir.path().join("Roact.lua").exists());
    }

    #[test]
    fn leaves_tree_alone_when_init_already_present() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("init.lua"), "return {}").unwrap();
        std::fs::write(dir.path().join("Extra.lua"), "return {}").unwrap();

        normalize(dir.path()).unwrap();

        assert!(dir.path().join("Extra.lua").is_file());
    }

    #[test]
    fn leaves_tree_alone_when_multiple_root_scripts_and_no_init() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("A.lua"), "return {}").unwrap();
        std::fs::write(dir.path().join("B.lua"), "return {}").unwrap();

        normalize(dir.path()).unwrap();

        assert!(dir.path().join("A.lua").is_file());
        assert!(dir.path().join("B.lua").is_file());
    }

    #[test]
    fn promotes_project_tree_path_and_discards_the_rest() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/init.lua"), "return {}").unwrap();
        std::fs::write(dir.path().join("README.md"), "hi").unwrap();
        std::fs::write(
            dir.path().join("default.project.json"),
            r#"{"tree":{"$path":"src"}}"#,
        )
        .unwrap();

        normalize(dir.path()).unwrap();

        assert!(dir.path().join("init.lua").is_file());
        assert!(!dir.path().join("src").exists());
        assert!(!dir.path().join("README.md").exists());
    }
}
