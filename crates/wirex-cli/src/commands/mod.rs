//! Subcommands.

mod providers;
mod resolve;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use log::info;
use wirex_filter::Version;
use wirex_resolver::{ModelError, Repository, RepositoryFile, ResourceId};

pub use providers::ProvidersArgs;
pub use resolve::ResolveArgs;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve resources and print the resulting wires
    Resolve(ResolveArgs),

    /// List the ordered providers of every requirement of a resource
    Providers(ProvidersArgs),
}

/// Run a subcommand, returning the process exit code
pub fn execute(command: Commands) -> Result<i32> {
    match command {
        Commands::Resolve(args) => resolve::execute(args),
        Commands::Providers(args) => providers::execute(args),
    }
}

pub(crate) fn load_repository(path: &Path) -> Result<Repository> {
    let repo = RepositoryFile::from_path(path)?
        .into_repository()
        .with_context(|| format!("Invalid repository file {}", path.display()))?;
    info!("Loaded {} resources from {}", repo.len(), path.display());
    Ok(repo)
}

/// Look up a resource given as `name` or `name@version`.
///
/// Without a version the highest one is used.
pub(crate) fn lookup(repo: &Repository, target: &str) -> Result<ResourceId> {
    let (name, version) = match target.split_once('@') {
        Some((name, version)) => {
            let version = Version::parse(version)
                .with_context(|| format!("Invalid version in \"{}\"", target))?;
            (name, Some(version))
        }
        None => (target, None),
    };

    repo.find(name, version.as_ref())
        .ok_or_else(|| ModelError::UnknownResource(target.to_string()).into())
}
