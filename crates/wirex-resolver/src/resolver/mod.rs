//! Backtracking resolver for resources wired through capabilities.
//!
//! Given resources that offer capabilities and declare requirements, the
//! resolver picks one provider per requirement so that every resource sees a
//! single, consistent source for each package it can reach through `uses`
//! constraints.
//!
//! # Architecture
//!
//! - `candidates`: ordered providers for every requirement reachable from the
//!   roots, with fragments attached to their hosts
//! - `packages`: per-node package spaces (exported, imported, required, used)
//!   computed from the preferred candidates
//! - `consistency`: detects uses-constraint violations and queues candidate
//!   permutations that may avoid them
//! - `wires`: materializes the accepted permutation as a [`WireMap`]
//!
//! # Algorithm Overview
//!
//! 1. **Population**: mandatory roots first (failures are fatal), then
//!    optional roots and on-demand fragments (failures exclude the root)
//! 2. **Preparation**: fragments are attached to their hosts
//! 3. **Checking**: package spaces are computed for the current permutation
//!    and checked for consistency
//! 4. **Backtracking**: on conflict the next queued permutation is tried,
//!    uses permutations before import permutations
//! 5. **Dropping**: once no permutation is left, an optional root owning the
//!    faulty requirement is removed and resolution starts over
//!
//! # Example
//!
//! ```
//! use wirex_filter::Version;
//! use wirex_resolver::{Repository, RepositoryEnvironment, ResourceBuilder, Resolver};
//!
//! let mut repo = Repository::new();
//! let app = repo.add(ResourceBuilder::new("app", Version::new(1, 0, 0)).import_package("log"));
//! let lib = repo.add(ResourceBuilder::new("lib", Version::new(1, 0, 0)).export_package("log"));
//!
//! let env = RepositoryEnvironment::new(repo);
//! let wires = Resolver::new().resolve(&env, &[app], &[]).unwrap();
//! assert_eq!(wires[&app][0].provider, lib);
//! ```

mod candidates;
mod consistency;
mod graph;
mod packages;
mod problem;
mod search;
mod wires;

#[cfg(test)]
mod tests;

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use log::debug;

use crate::config::{Budget, ResolverConfig};
use crate::environment::Environment;
use crate::error::ResolutionError;
use crate::model::namespace::HOST;
use crate::model::{CapabilityId, RequirementId, ResourceId, WireMap};

use candidates::{Candidates, PopulateMode};
use graph::{Context, Node, Req};
use packages::Attempt;
use search::SearchState;

/// Resolves resources against an [`Environment`].
///
/// The resolver holds no search state between calls, so one instance can
/// serve concurrent resolutions.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve mandatory and optional resources.
    ///
    /// Optional resources that cannot be resolved are left out of the result.
    pub fn resolve(
        &self,
        env: &dyn Environment,
        mandatory: &[ResourceId],
        optional: &[ResourceId],
    ) -> Result<WireMap, ResolutionError> {
        self.resolve_with_attachments(env, mandatory, optional, &[])
    }

    /// Resolve mandatory and optional resources, attaching the on-demand
    /// fragments whose hosts take part in the resolution
    pub fn resolve_with_attachments(
        &self,
        env: &dyn Environment,
        mandatory: &[ResourceId],
        optional: &[ResourceId],
        on_demand: &[ResourceId],
    ) -> Result<WireMap, ResolutionError> {
        let (candidates, roots) = self.run(env, mandatory, optional, on_demand)?;
        Ok(wire_map(&Context::new(env), &candidates, &roots))
    }

    /// Find a consistent permutation and the root nodes it was checked from
    fn run(
        &self,
        env: &dyn Environment,
        mandatory: &[ResourceId],
        optional: &[ResourceId],
        on_demand: &[ResourceId],
    ) -> Result<(Candidates, Vec<Node>), ResolutionError> {
        let ctx = Context::new(env);
        let mut budget = Budget::start(&self.config);

        // Resolved resources only need resolving again when they are fragments
        let mandatory: IndexSet<ResourceId> = mandatory
            .iter()
            .copied()
            .filter(|&resource| ctx.is_fragment(resource) || !ctx.is_resolved(resource))
            .collect();
        let mut optional: IndexSet<ResourceId> = optional.iter().copied().collect();
        let mut on_demand: IndexSet<ResourceId> = on_demand.iter().copied().collect();

        loop {
            let mut all = Candidates::new();
            for &resource in &mandatory {
                all.populate(&ctx, resource, PopulateMode::Mandatory)?;
            }
            for &resource in &optional {
                all.populate(&ctx, resource, PopulateMode::Optional)?;
            }
            for &resource in &on_demand {
                all.populate(&ctx, resource, PopulateMode::OnDemand)?;
            }
            all.prepare(&ctx)?;

            let roots = |candidates: &Candidates| -> Vec<Node> {
                mandatory
                    .iter()
                    .chain(optional.iter().filter(|&&resource| candidates.is_populated(resource)))
                    .filter_map(|&resource| root_node(&ctx, candidates, resource))
                    .collect()
            };

            let err = match self.search(&ctx, &mut budget, all, false, roots) {
                Ok(accepted) => return Ok(accepted),
                Err(err) => err,
            };

            match faulty_resource(&ctx, &err) {
                Some(resource) if optional.shift_remove(&resource) || on_demand.shift_remove(&resource) => {
                    debug!("Dropping {} and resolving again: {}", ctx.resource(resource), err);
                }
                _ => return Err(err),
            }
        }
    }

    /// Resolve one dynamic requirement of an already resolved resource.
    ///
    /// `candidates` lists the acceptable providers, best first. The result
    /// holds the single new wire of `resource`, plus the wiring of any
    /// provider that had to be resolved along with it.
    pub fn resolve_dynamic(
        &self,
        env: &dyn Environment,
        resource: ResourceId,
        requirement: RequirementId,
        candidates: &[CapabilityId],
        on_demand: &[ResourceId],
    ) -> Result<WireMap, ResolutionError> {
        let ctx = Context::new(env);
        if !ctx.is_resolved(resource) {
            return Err(ResolutionError::NotResolved {
                resource: ctx.resource(resource).to_string(),
            });
        }

        let mut budget = Budget::start(&self.config);
        let mut on_demand: IndexSet<ResourceId> = on_demand.iter().copied().collect();

        loop {
            let mut all = Candidates::new();
            all.populate_dynamic(&ctx, resource, requirement, candidates)?;
            for &fragment in &on_demand {
                all.populate(&ctx, fragment, PopulateMode::OnDemand)?;
            }
            all.prepare(&ctx)?;

            let roots = |candidates: &Candidates| vec![candidates.node(resource)];
            let err = match self.search(&ctx, &mut budget, all, true, roots) {
                Ok((candidates, _)) => {
                    let mut wire_map = WireMap::new();
                    wires::populate_dynamic_wire_map(&ctx, &candidates, resource, requirement, &mut wire_map);
                    return Ok(wire_map);
                }
                Err(err) => err,
            };

            match faulty_resource(&ctx, &err) {
                Some(fragment) if on_demand.shift_remove(&fragment) => {
                    debug!("Dropping {} and resolving again: {}", ctx.resource(fragment), err);
                }
                _ => return Err(err),
            }
        }
    }

    /// Try permutations, starting from `initial`, until one is consistent for
    /// every root or none are left
    fn search<F>(
        &self,
        ctx: &Context<'_>,
        budget: &mut Budget,
        initial: Candidates,
        dynamic: bool,
        roots: F,
    ) -> Result<(Candidates, Vec<Node>), ResolutionError>
    where
        F: Fn(&Candidates) -> Vec<Node>,
    {
        let mut search = SearchState::new();
        let mut current = initial;
        let mut last: Option<ResolutionError> = None;

        loop {
            budget.next_attempt(last.as_ref())?;
            let roots = roots(&current);

            let failure = {
                let mut attempt = Attempt::new(*ctx, &current);
                let mut uses_cycles = HashMap::new();
                let mut visited = HashSet::new();
                let mut failure = None;

                for &root in &roots {
                    attempt.calculate_package_spaces(root, &mut uses_cycles, &mut visited);
                    if let Err(err) = attempt.check_consistency(root, dynamic, &mut search, &mut HashSet::new()) {
                        failure = Some(err);
                    }
                }
                failure
            };

            let Some(err) = failure else {
                debug!("Found a consistent permutation after {} attempts", budget.attempts());
                return Ok((current, roots));
            };

            match search.next() {
                Some(next) => {
                    current = next;
                    last = Some(err);
                }
                None => return Err(err),
            }
        }
    }
}

fn wire_map(ctx: &Context<'_>, candidates: &Candidates, roots: &[Node]) -> WireMap {
    let mut wire_map = WireMap::new();
    for &root in roots {
        wires::populate_wire_map(ctx, candidates, root, &mut wire_map);
    }
    wire_map
}

/// The node a root is checked from: fragments are checked through their host
fn root_node(ctx: &Context<'_>, candidates: &Candidates, resource: ResourceId) -> Option<Node> {
    let host_req = ctx
        .resource(resource)
        .requirements()
        .iter()
        .copied()
        .find(|&req| ctx.repo.requirement(req).namespace() == HOST);

    let target = match host_req {
        Some(req) => ctx.cap_node(candidates.first_candidate(Req::Declared(req))?).id(),
        None => resource,
    };
    Some(candidates.node(target))
}

/// The declared owner of the requirement an error blames
fn faulty_resource(ctx: &Context<'_>, err: &ResolutionError) -> Option<ResourceId> {
    err.faulty_requirement()
        .map(|req| ctx.repo.requirement(req).resource())
}
