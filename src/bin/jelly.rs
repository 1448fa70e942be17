//! Thin CLI entry point. Exercises the `Engine` end-to-end; a fuller
//! flag surface, colored rendering, and progress spinners belong to a
//! dedicated CLI front end, not this binary.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use jelly::{Engine, JellyConfig, PackageId, RegistryClient};

#[derive(Parser)]
#[command(name = "jelly", about = "A package manager for the Roblox ecosystem")]
struct Cli {
    /// Project directory (defaults to the current directory).
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Fail immediately instead of reaching the registry.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a fresh jelly.json in the project directory.
    Init {
        #[arg(long)]
        name: Option<String>,
    },
    /// Add one or more dependencies and install the resulting graph.
    Add {
        specs: Vec<String>,
        #[arg(long)]
        dev: bool,
    },
    /// Remove one or more dependencies.
    Remove { ids: Vec<String> },
    /// Install everything in the lockfile (generating one if absent or stale).
    Install,
    /// Update pinned dependencies to their current registry latest.
    Update { ids: Vec<String> },
    /// Report which pinned dependencies are behind the registry's latest.
    Outdated,
    /// Resolve the dependency graph without touching disk.
    Analyze {
        /// Fail instead of warning when a range intersection is empty.
        #[arg(long)]
        strict: bool,
    },
    /// Check that the lockfile covers every manifest dependency.
    VerifyLock,
    /// Unconditionally regenerate the lockfile.
    RegenerateLock,
    /// Remove orphaned `_Index` entries and shims.
    Clean,
    /// Wipe the per-user package cache.
    CacheClean,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("JELLY_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new().context("failed to start the async runtime")?;
    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let dir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to read the current directory")?,
    };
    let home_dir = home::home_dir().unwrap_or_else(|| dir.clone());
    let config = JellyConfig::new(home_dir).with_offline(cli.offline);
    let registry = Arc::new(RegistryClient::new(config.registry_base_url.clone(), config.http_timeout)?);
    let engine = Engine::new(dir, config, registry);

    match cli.command {
        Command::Init { name } => {
            let name = name.unwrap_or_else(|| "demo".to_string());
            let manifest = engine.init(&name)?;
            println!("created jelly.json for `{}`", manifest.name);
        }
        Command::Add { specs, dev } => {
            let report = engine.add(&specs, dev).await?;
            print_report(&report);
        }
        Command::Remove { ids } => {
            let ids = parse_ids(&ids)?;
            let report = engine.remove(&ids).await?;
            print_report(&report);
        }
        Command::Install => {
            let report = engine.install_all().await?;
            print_report(&report);
        }
        Command::Update { ids } => {
            let ids = if ids.is_empty() { None } else { Some(parse_ids(&ids)?) };
            let report = engine.update(ids).await?;
            print_report(&report);
        }
        Command::Outdated => {
            for entry in engine.outdated().await? {
                println!("{}: {} -> {}", entry.id, entry.current, entry.latest);
            }
        }
        Command::Analyze { strict } => {
            let outcome = engine.analyze(strict).await?;
            println!("resolved {} package(s)", outcome.graph.nodes.len());
            for conflict in &outcome.conflicts {
                println!("conflict: {:?}", conflict);
            }
        }
        Command::VerifyLock => {
            if engine.verify_lock()? {
                println!("lockfile is up to date");
            } else {
                println!("lockfile is stale or missing");
                std::process::exit(1);
            }
        }
        Command::RegenerateLock => {
            let (_lockfile, conflicts) = engine.regenerate_lock().await?;
            println!("lockfile regenerated ({} conflict(s))", conflicts.len());
        }
        Command::Clean => {
            let removed = engine.clean()?;
            println!("removed {} orphan(s)", removed.len());
        }
        Command::CacheClean => {
            engine.cache_clean()?;
            println!("cache cleared");
        }
    }
    Ok(())
}

fn parse_ids(raw: &[String]) -> anyhow::Result<Vec<PackageId>> {
    raw.iter()
        .map(|s| s.parse::<PackageId>().map_err(anyhow::Error::from))
        .collect()
}

fn print_report(report: &jelly::engine::InstallReport) {
    println!("installed {} package(s)", report.installed.len());
    for (id, reason) in &report.skipped {
        println!("skipped {id}: {reason}");
    }
    if !report.removed.is_empty() {
        println!("pruned {} orphan(s)", report.removed.len());
    }
    for conflict in &report.conflicts {
        println!("conflict: {} -> {:?}", conflict.id, conflict.resolved);
    }
    if let Some(request) = &report.project_file_request {
        println!(
            "project file integration requested: expose `{}` under `{}`",
            request.packages_path.display(),
            request.mount_point
        );
    }
}
