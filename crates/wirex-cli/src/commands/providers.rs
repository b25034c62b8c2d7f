//! Providers command - show the ordered providers of each requirement of a resource.

use anyhow::Result;
use clap::Args;
use console::style;
use std::path::PathBuf;

use wirex_resolver::{Environment, RepositoryEnvironment};

use super::{load_repository, lookup};

#[derive(Args, Debug)]
pub struct ProvidersArgs {
    /// Repository description file (JSON)
    #[arg(value_name = "REPOSITORY")]
    pub repository: PathBuf,

    /// Resource to inspect (name or name@version)
    #[arg(value_name = "RESOURCE")]
    pub resource: String,
}

pub fn execute(args: ProvidersArgs) -> Result<i32> {
    let repo = load_repository(&args.repository)?;
    let resource = lookup(&repo, &args.resource)?;
    let env = RepositoryEnvironment::new(repo);
    let repo = env.repository();

    println!("{}", style(repo.resource(resource)).bold());

    let requirements = repo.resource(resource).requirements();
    if requirements.is_empty() {
        println!("  {}", style("(no requirements)").dim());
        return Ok(0);
    }

    for &id in requirements {
        let requirement = repo.requirement(id);
        let mut label = requirement.to_string();
        if requirement.is_optional() {
            label.push_str(" (optional)");
        } else if requirement.is_dynamic() {
            label.push_str(" (dynamic)");
        }
        println!("  {}", label);

        let providers = env.find_providers(requirement);
        if providers.is_empty() {
            println!("    {}", style("no providers").yellow());
        }
        for (idx, cap) in providers.into_iter().enumerate() {
            let capability = repo.capability(cap);
            println!(
                "    {}. {} {}",
                idx + 1,
                style(repo.resource(capability.resource())).cyan(),
                style(format!("[{}]", capability)).dim()
            );
        }
    }

    Ok(0)
}
