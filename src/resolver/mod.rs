//! Version Resolver: maps `(package, range)` requests to concrete
//! versions and walks the transitive graph to a single flat
//! resolution, with conflict detection.

pub mod range;

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;

pub use range::Range;
use url::Url;

use crate::error::{JellyError, Result};
use crate::id::PackageId;
use crate::registry::{contents_url, RegistryApi, RegistryMetadata, VersionEntry};
use crate::version::Version;

/// Who asked for a given `(id, range)` pair: the project root, or a
/// package discovered transitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Requirer {
    Root,
    Package(PackageId),
}

impl fmt::Display for Requirer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requirer::Root => write!(f, "<root>"),
            Requirer::Package(id) => write!(f, "{id}"),
        }
    }
}

/// A single resolved version of `id`, plus the URL the Installer will
/// fetch and the dependency ranges its chosen version declared
/// (production + server only).
#[derive(Debug, Clone)]
pub struct ResolvedNode {
    pub id: PackageId,
    pub version: Version,
    pub url: String,
    pub deps: HashMap<PackageId, Range>,
}

/// The flat, single-version-per-id resolution plus the top-level
/// ranges that produced it.
#[derive(Debug, Clone, Default)]
pub struct ResolutionGraph {
    pub nodes: BTreeMap<PackageId, ResolvedNode>,
    pub top_level: BTreeMap<PackageId, Range>,
}

/// Two (or more) requirers disagreeing about `id`'s range.
/// `resolved` is `Some` when an intersection still exists, `None`
/// when the graph is infeasible for this id.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub id: PackageId,
    pub required_by: Vec<(Requirer, Range)>,
    pub resolved: Option<Version>,
}

pub struct ResolveOutcome {
    pub graph: ResolutionGraph,
    pub conflicts: Vec<Conflict>,
}

pub struct Resolution {
    pub version: Version,
    pub metadata: RegistryMetadata,
}

/// `resolve_one`: the highest version satisfying `range` (wildcard
/// `*` picks the highest entry overall, since the registry already
/// returns versions in descending precedence order).
pub async fn resolve_one(
    registry: &dyn RegistryApi,
    id: &PackageId,
    range: &Range,
) -> Result<Resolution> {
    let metadata = registry.metadata(id).await?;
    let chosen = metadata
        .versions
        .iter()
        .filter(|entry| range.satisfies(entry.version()))
        .max_by(|a, b| a.version().cmp(b.version()));

    match chosen {
        Some(entry) => Ok(Resolution {
            version: entry.version().clone(),
            metadata,
        }),
        None => Err(JellyError::VersionNotFound(id.clone(), range.as_str().to_string())),
    }
}

/// `resolve_tree`: flattens the transitive closure of production +
/// server dependencies starting from `direct` into a single-version
/// resolution via a breadth-first queue.
///
/// Root `devDependencies` are resolved too (folded into `direct` by
/// the caller) but are not followed transitively past the packages
/// they name — this holds automatically because only *production and
/// server* dependencies of a chosen version are ever re-enqueued.
pub async fn resolve_tree(
    registry: &dyn RegistryApi,
    base_url: &Url,
    direct: &BTreeMap<PackageId, Range>,
) -> Result<ResolveOutcome> {
    let mut queue: VecDeque<(PackageId, Range, Requirer)> = direct
        .iter()
        .map(|(id, range)| (id.clone(), range.clone(), Requirer::Root))
        .collect();

    let mut aggregated: HashMap<PackageId, Vec<(Requirer, Range)>> = HashMap::new();
    let mut picked: HashMap<PackageId, (Version, VersionEntry)> = HashMap::new();
    let mut conflicts: BTreeMap<PackageId, Conflict> = BTreeMap::new();
    let mut seen_edges: HashSet<(PackageId, Requirer, String)> = HashSet::new();

    while let Some((id, range, requirer)) = queue.pop_front() {
        let edge_key = (id.clone(), requirer.clone(), range.as_str().to_string());
        if !seen_edges.insert(edge_key) {
            continue;
        }

        aggregated
            .entry(id.clone())
            .or_default()
            .push((requirer.clone(), range.clone()));
        let entries = &aggregated[&id];

        let metadata = registry.metadata(&id).await?;
        let candidates: Vec<&VersionEntry> = metadata
            .versions
            .iter()
            .filter(|v| entries.iter().all(|(_, r)| r.satisfies(v.version())))
            .collect();

        let distinct_requirers: HashSet<&Requirer> = entries.iter().map(|(r, _)| r).collect();
        let disagreement = distinct_requirers.len() > 1;

        if candidates.is_empty() {
            if disagreement {
                conflicts.insert(
                    id.clone(),
                    Conflict {
                        id: id.clone(),
                        required_by: entries.clone(),
                        resolved: None,
                    },
                );
            }
            continue;
        }

        let chosen = candidates
            .iter()
            .max_by(|a, b| a.version().cmp(b.version()))
            .expect("candidates is non-empty");
        let chosen_version = chosen.version().clone();
        let chosen_entry = (*chosen).clone();

        if disagreement {
            conflicts.insert(
                id.clone(),
                Conflict {
                    id: id.clone(),
                    required_by: entries.clone(),
                    resolved: Some(chosen_version.clone()),
                },
            );
        }

        let unchanged = picked
            .get(&id)
            .map(|(v, _)| v == &chosen_version)
            .unwrap_or(false);
        picked.insert(id.clone(), (chosen_version, chosen_entry.clone()));

        if !unchanged {
            for (dep_name, dep_range_raw) in chosen_entry.resolver_dependencies() {
                let Ok(dep_id) = dep_name.parse::<PackageId>() else {
                    continue;
                };
                let dep_range = Range::parse(&dep_range_raw);
                queue.push_back((dep_id, dep_range, Requirer::Package(id.clone())));
            }
        }
    }

    let mut nodes = BTreeMap::new();
    for (id, (version, entry)) in picked {
        let mut deps = HashMap::new();
        for (dep_name, dep_range_raw) in entry.resolver_dependencies() {
            if let Ok(dep_id) = dep_name.parse::<PackageId>() {
                deps.insert(dep_id, Range::parse(&dep_range_raw));
            }
        }
        let url = contents_url(base_url, &id, &version);
        nodes.insert(
            id.clone(),
            ResolvedNode {
                id,
                version,
                url,
                deps,
            },
        );
    }

    Ok(ResolveOutcome {
        graph: ResolutionGraph {
            nodes,
            top_level: direct.clone(),
        },
        conflicts: conflicts.into_values().collect(),
    })
}
