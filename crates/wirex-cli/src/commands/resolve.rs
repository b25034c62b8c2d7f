//! Resolve command - resolve resources from a repository file and print the wires.

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use wirex_resolver::{
    Environment, Repository, RepositoryEnvironment, ResolutionError, Resolver, ResolverConfig, ResourceId, WireMap,
};

use super::{load_repository, lookup};

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Repository description file (JSON)
    #[arg(value_name = "REPOSITORY")]
    pub repository: PathBuf,

    /// Resources that must resolve (name or name@version)
    #[arg(short, long, value_name = "RESOURCE")]
    pub mandatory: Vec<String>,

    /// Resources that are left out when they cannot resolve
    #[arg(short, long, value_name = "RESOURCE")]
    pub optional: Vec<String>,

    /// Fragments attached only when their host takes part in the resolution
    #[arg(long, value_name = "RESOURCE")]
    pub on_demand: Vec<String>,

    /// Configuration file with a [resolver] table
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub format_json: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    resolver: ResolverConfig,
}

/// One wire as printed by `--format-json`
#[derive(Debug, Serialize)]
struct WireOutput {
    requirement: String,
    provider: String,
    capability: String,
}

pub fn execute(args: ResolveArgs) -> Result<i32> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ResolverConfig::default(),
    };

    let repo = load_repository(&args.repository)?;
    let mandatory = lookup_all(&repo, &args.mandatory)?;
    let optional = lookup_all(&repo, &args.optional)?;
    let on_demand = lookup_all(&repo, &args.on_demand)?;

    if mandatory.is_empty() && optional.is_empty() {
        eprintln!("{} Nothing to resolve, pass --mandatory or --optional", style("Error:").red().bold());
        return Ok(1);
    }

    let env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::with_config(config);

    let wires = match resolver.resolve_with_attachments(&env, &mandatory, &optional, &on_demand) {
        Ok(wires) => wires,
        Err(err) => {
            report_error(&err);
            return Ok(1);
        }
    };

    if args.format_json {
        println!("{}", serde_json::to_string_pretty(&to_output(env.repository(), &wires))?);
    } else {
        print_wires(env.repository(), &wires);
    }

    Ok(0)
}

fn load_config(path: &Path) -> Result<ResolverConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let file: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(file.resolver)
}

fn lookup_all(repo: &Repository, targets: &[String]) -> Result<Vec<ResourceId>> {
    targets.iter().map(|target| lookup(repo, target)).collect()
}

fn report_error(err: &ResolutionError) {
    let title = match err {
        ResolutionError::UsesConflict(_) => "Uses conflict:",
        ResolutionError::SearchExhausted { .. } => "Search exhausted:",
        _ => "Error:",
    };
    eprintln!("{} {}", style(title).red().bold(), err);
}

fn to_output(repo: &Repository, wires: &WireMap) -> IndexMap<String, Vec<WireOutput>> {
    wires
        .iter()
        .map(|(&resource, resource_wires)| {
            let wires = resource_wires
                .iter()
                .map(|wire| WireOutput {
                    requirement: repo.requirement(wire.requirement).to_string(),
                    provider: repo.resource(wire.provider).to_string(),
                    capability: repo.capability(wire.capability).to_string(),
                })
                .collect();
            (repo.resource(resource).to_string(), wires)
        })
        .collect()
}

fn print_wires(repo: &Repository, wires: &WireMap) {
    println!(
        "{} {} resources",
        style("Resolved").green().bold(),
        wires.len()
    );

    for (&resource, resource_wires) in wires {
        println!();
        println!("{}", style(repo.resource(resource)).bold());
        if resource_wires.is_empty() {
            println!("  {}", style("(no wires)").dim());
        }
        for wire in resource_wires {
            println!(
                "  {} {} {} {}",
                repo.requirement(wire.requirement),
                style("->").dim(),
                style(repo.resource(wire.provider)).cyan(),
                style(format!("[{}]", repo.capability(wire.capability))).dim()
            );
        }
    }
}
