//! Engine: the orchestrator the CLI (or any other collaborator) calls
//! one operation per subcommand.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::JellyConfig;
use crate::error::{JellyError, Result};
use crate::id::PackageId;
use crate::installer::{self, ProjectFileRequest};
use crate::lockfile::Lockfile;
use crate::manifest::Manifest;
use crate::registry::RegistryApi;
use crate::resolver::{self, Conflict, Range, ResolveOutcome};
use crate::version::Version;

/// Summary of one install-shaped operation: what got indexed, what
/// was skipped (with why), and any conflicts the resolver reported
/// along the way. A non-empty `conflicts` list does not, by itself,
/// make the operation a failure.
#[derive(Debug, Default)]
pub struct InstallReport {
    pub installed: Vec<PackageId>,
    pub skipped: Vec<(PackageId, String)>,
    pub removed: Vec<String>,
    pub conflicts: Vec<Conflict>,
    pub project_file_request: Option<ProjectFileRequest>,
}

#[derive(Debug, Clone)]
pub struct OutdatedEntry {
    pub id: PackageId,
    pub current: Version,
    pub latest: Version,
}

pub struct Engine {
    dir: PathBuf,
    config: JellyConfig,
    registry: Arc<dyn RegistryApi>,
}

impl Engine {
    pub fn new(dir: impl Into<PathBuf>, config: JellyConfig, registry: Arc<dyn RegistryApi>) -> Self {
        Engine {
            dir: dir.into(),
            config,
            registry,
        }
    }

    pub fn init(&self, name: &str) -> Result<Manifest> {
        if Manifest::exists(&self.dir) {
            return Err(JellyError::AlreadyInitialized);
        }
        let manifest = Manifest::new(name);
        manifest.write(&self.dir)?;
        Ok(manifest)
    }

    /// Fails fast with [`JellyError::Offline`] instead of letting a
    /// registry call hang or error deep in the call stack.
    fn ensure_online(&self) -> Result<()> {
        if self.config.offline {
            return Err(JellyError::Offline);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, specs))]
    pub async fn add(&self, specs: &[String], dev: bool) -> Result<InstallReport> {
        self.ensure_online()?;
        let mut manifest = Manifest::read(&self.dir)?;
        self.apply_specs(&mut manifest, specs, dev).await?;
        manifest.write(&self.dir)?;
        self.install_all().await
    }

    #[tracing::instrument(skip(self, specs))]
    pub async fn install_specific(&self, specs: &[String], dev: bool) -> Result<InstallReport> {
        self.ensure_online()?;
        let mut manifest = Manifest::read(&self.dir)?;
        let ids = self.apply_specs(&mut manifest, specs, dev).await?;
        manifest.write(&self.dir)?;

        let (lockfile, conflicts) = Lockfile::generate(&manifest, self.registry.as_ref(), &self.config.registry_base_url).await?;
        lockfile.write(&self.dir)?;

        let settings = manifest.settings();
        let packages_root = self.dir.join(&settings.packages_path);
        let mut report = InstallReport {
            conflicts,
            ..Default::default()
        };
        for id in &ids {
            let Some(entry) = lockfile.packages.get(id) else {
                continue;
            };
            match installer::install_one(self.registry.as_ref(), &packages_root, id, entry, &settings).await {
                Ok(()) => report.installed.push(id.clone()),
                Err(e) => {
                    tracing::warn!(package = %id, error = %e, "skipping package install");
                    report.skipped.push((id.clone(), e.to_string()));
                }
            }
        }
        report.removed = self.finalize(&manifest, &lockfile)?;
        report.project_file_request = Some(ProjectFileRequest::new(&settings.packages_path));
        Ok(report)
    }

    #[tracing::instrument(skip(self, ids))]
    pub async fn remove(&self, ids: &[PackageId]) -> Result<InstallReport> {
        self.ensure_online()?;
        let mut manifest = Manifest::read(&self.dir)?;
        for id in ids {
            manifest.dependencies.remove(id);
            manifest.dev_dependencies.remove(id);
            manifest.server_dependencies.remove(id);
        }
        manifest.write(&self.dir)?;

        let (lockfile, conflicts) = Lockfile::generate(&manifest, self.registry.as_ref(), &self.config.registry_base_url).await?;
        lockfile.write(&self.dir)?;

        let removed = self.finalize(&manifest, &lockfile)?;
        Ok(InstallReport {
            conflicts,
            removed,
            ..Default::default()
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn install_all(&self) -> Result<InstallReport> {
        self.ensure_online()?;
        let manifest = Manifest::read(&self.dir)?;
        let (lockfile, conflicts) =
            Lockfile::update(&self.dir, &manifest, self.registry.as_ref(), &self.config.registry_base_url).await?;
        lockfile.write(&self.dir)?;

        let settings = manifest.settings();
        let packages_root = self.dir.join(&settings.packages_path);
        let mut report = InstallReport {
            conflicts,
            ..Default::default()
        };
        for (id, entry) in lockfile.packages.iter() {
            match installer::install_one(self.registry.as_ref(), &packages_root, id, entry, &settings).await {
                Ok(()) => report.installed.push(id.clone()),
                Err(e) => {
                    tracing::warn!(package = %id, error = %e, "skipping package install");
                    report.skipped.push((id.clone(), e.to_string()));
                }
            }
        }
        report.removed = self.finalize(&manifest, &lockfile)?;
        report.project_file_request = Some(ProjectFileRequest::new(&settings.packages_path));
        Ok(report)
    }

    #[tracing::instrument(skip(self, ids))]
    pub async fn update(&self, ids: Option<Vec<PackageId>>) -> Result<InstallReport> {
        self.ensure_online()?;
        let mut manifest = Manifest::read(&self.dir)?;
        let targets: Vec<PackageId> = match ids {
            Some(ids) => ids,
            None => self.outdated().await?.into_iter().map(|entry| entry.id).collect(),
        };

        for id in &targets {
            let latest = self.registry.latest_version(id).await?;
            let range = Range::parse(&latest.to_string());
            if manifest.dependencies.contains_key(id) {
                manifest.dependencies.insert(id.clone(), range);
            } else if manifest.dev_dependencies.contains_key(id) {
                manifest.dev_dependencies.insert(id.clone(), range);
            } else if manifest.server_dependencies.contains_key(id) {
                manifest.server_dependencies.insert(id.clone(), range);
            }
        }
        manifest.write(&self.dir)?;
        self.install_all().await
    }

    pub async fn outdated(&self) -> Result<Vec<OutdatedEntry>> {
        self.ensure_online()?;
        let manifest = Manifest::read(&self.dir)?;
        let lockfile = Lockfile::read(&self.dir)?;

        let mut out = Vec::new();
        for (id, range) in manifest.resolver_inputs() {
            let current = match lockfile.as_ref().and_then(|lock| lock.packages.get(&id)) {
                Some(entry) => entry.version.clone(),
                None => resolver::resolve_one(self.registry.as_ref(), &id, &range).await?.version,
            };
            let latest = self.registry.latest_version(&id).await?;
            if latest > current {
                out.push(OutdatedEntry {
                    id,
                    current,
                    latest,
                });
            }
        }
        Ok(out)
    }

    /// Resolves purely, touching no files — the non-mutating preview
    /// behind `analyze`. With `strict`, any conflict whose range
    /// intersection is empty (`resolved: None`) turns the whole call
    /// into an error instead of a report the caller can shrug off —
    /// every other operation stays lenient.
    pub async fn analyze(&self, strict: bool) -> Result<ResolveOutcome> {
        self.ensure_online()?;
        let manifest = Manifest::read(&self.dir)?;
        let direct = manifest.resolver_inputs();
        let outcome =
            resolver::resolve_tree(self.registry.as_ref(), &self.config.registry_base_url, &direct).await?;
        if strict {
            let unresolved: Vec<Conflict> = outcome
                .conflicts
                .iter()
                .filter(|c| c.resolved.is_none())
                .cloned()
                .collect();
            if !unresolved.is_empty() {
                return Err(JellyError::UnsatisfiableRange(unresolved));
            }
        }
        Ok(outcome)
    }

    pub fn verify_lock(&self) -> Result<bool> {
        let manifest = Manifest::read(&self.dir)?;
        match Lockfile::read(&self.dir)? {
            Some(lockfile) => Ok(lockfile.validate(&manifest)),
            None => Ok(false),
        }
    }

    pub async fn regenerate_lock(&self) -> Result<(Lockfile, Vec<Conflict>)> {
        self.ensure_online()?;
        let manifest = Manifest::read(&self.dir)?;
        let (lockfile, conflicts) = Lockfile::generate(&manifest, self.registry.as_ref(), &self.config.registry_base_url).await?;
        lockfile.write(&self.dir)?;
        Ok((lockfile, conflicts))
    }

    /// Prunes orphaned `_Index` entries and shims, then regenerates
    /// the shim layer from whatever the lockfile still backs on disk
    /// — otherwise a version-collision shim (versioned `{name}_x_y_z.lua`
    /// siblings) left stale by the prune would keep pointing removed
    /// packages at the wrong `_Index` entry.
    pub fn clean(&self) -> Result<Vec<String>> {
        let manifest = Manifest::read(&self.dir)?;
        let settings = manifest.settings();
        let packages_root = self.dir.join(&settings.packages_path);
        let removed = installer::prune_orphans(&packages_root, &manifest.all_dependency_ids())?;

        if let Some(lockfile) = Lockfile::read(&self.dir)? {
            let index_dir = packages_root.join(installer::INDEX_DIR_NAME);
            let surviving: Vec<(PackageId, Version)> = lockfile
                .packages
                .iter()
                .filter(|(id, _)| index_dir.join(id.index_dir_name()).is_dir())
                .map(|(id, entry)| (id.clone(), entry.version.clone()))
                .collect();
            installer::emit_shims(&packages_root, &surviving)?;
        }

        Ok(removed)
    }

    pub fn cache_clean(&self) -> Result<()> {
        match std::fs::remove_dir_all(&self.config.cache_dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(JellyError::io(self.config.cache_dir.clone(), e)),
        }
    }

    /// Resolves each `scope/name[@range]` spec (an absent range is
    /// pinned to the registry's current latest) and writes it into
    /// the manifest's `dependencies` or `devDependencies`.
    async fn apply_specs(&self, manifest: &mut Manifest, specs: &[String], dev: bool) -> Result<Vec<PackageId>> {
        let mut ids = Vec::with_capacity(specs.len());
        for spec in specs {
            let (id, range) = parse_spec(spec)?;
            let range = match range {
                Some(range) => range,
                None => {
                    let resolution = resolver::resolve_one(self.registry.as_ref(), &id, &Range::any()).await?;
                    Range::parse(&resolution.version.to_string())
                }
            };
            if dev {
                manifest.dependencies.remove(&id);
                manifest.dev_dependencies.insert(id.clone(), range);
            } else {
                manifest.dev_dependencies.remove(&id);
                manifest.dependencies.insert(id.clone(), range);
            }
            ids.push(id);
        }
        Ok(ids)
    }

    /// Orphan pruning + shim regeneration, the two steps every
    /// dep-set-mutating operation must perform before returning
    /// success.
    fn finalize(&self, manifest: &Manifest, lockfile: &Lockfile) -> Result<Vec<String>> {
        let settings = manifest.settings();
        let packages_root = self.dir.join(&settings.packages_path);
        let removed = installer::prune_orphans(&packages_root, &manifest.all_dependency_ids())?;

        let packages: Vec<(PackageId, Version)> = lockfile
            .packages
            .iter()
            .map(|(id, entry)| (id.clone(), entry.version.clone()))
            .collect();
        installer::emit_shims(&packages_root, &packages)?;
        Ok(removed)
    }
}

fn parse_spec(spec: &str) -> Result<(PackageId, Option<Range>)> {
    match spec.split_once('@') {
        Some((id, range)) => {
            let id: PackageId = id
                .parse()
                .map_err(|e: crate::id::PackageIdError| JellyError::ManifestMalformed(e.to_string()))?;
            Ok((id, Some(Range::parse(range))))
        }
        None => {
            let id: PackageId = spec
                .parse()
                .map_err(|e: crate::id::PackageIdError| JellyError::ManifestMalformed(e.to_string()))?;
            Ok((id, None))
        }
    }
}
