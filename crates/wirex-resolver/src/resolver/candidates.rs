//! Candidate space: the ordered providers of every requirement in play.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, VecDeque};

use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use wirex_filter::Version;

use crate::error::ResolutionError;
use crate::model::namespace::HOST;
use crate::model::{CapabilityId, RequirementId, ResourceId};

use super::graph::{Cap, Context, Node, Req};

/// How a root resource takes part in a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PopulateMode {
    /// Failure aborts the resolution
    Mandatory,
    /// Failure silently excludes the resource
    Optional,
    /// Fragments attached only if their host is already part of the resolution
    OnDemand,
}

#[derive(Debug, Clone)]
enum Population {
    /// Being visited. Re-entrant visits through dependency cycles bump `depth`
    /// and keep consuming `remaining`; results are only published once the
    /// outermost visit completes.
    InProgress {
        depth: i32,
        local: IndexMap<Req, Vec<Cap>>,
        remaining: VecDeque<RequirementId>,
    },
    Done,
    Failed(ResolutionError),
}

/// Fragments grouped per host capability, then by name, newest version first.
type HostFragments = IndexMap<Cap, IndexMap<String, BTreeMap<Reverse<Version>, Vec<Req>>>>;

/// Mapping from requirement to the capabilities that may satisfy it.
///
/// Cloning produces an independent permutation; candidate order is preserved.
#[derive(Debug, Clone, Default)]
pub(crate) struct Candidates {
    mandatory: IndexSet<ResourceId>,
    candidates: IndexMap<Req, Vec<Cap>>,
    /// Reverse index: capability to the requirements listing it
    dependents: IndexMap<Cap, IndexSet<Req>>,
    /// Hosts turned into attached views, with their selected fragments
    attached: IndexMap<ResourceId, Vec<ResourceId>>,
    population: HashMap<ResourceId, Population>,
    fragments_present: bool,
}

impl Candidates {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Populate the candidate space reachable from a root resource.
    ///
    /// Only mandatory roots report failure; other roots that fail are simply
    /// never marked populated.
    pub(crate) fn populate(
        &mut self,
        ctx: &Context<'_>,
        resource: ResourceId,
        mode: PopulateMode,
    ) -> Result<(), ResolutionError> {
        if matches!(
            self.population.get(&resource),
            Some(Population::Done) | Some(Population::Failed(_))
        ) {
            return Ok(());
        }

        let fragment = ctx.is_fragment(resource);
        if !fragment && ctx.is_resolved(resource) {
            return Ok(());
        }
        if mode == PopulateMode::OnDemand && !(fragment && self.seed_on_demand(ctx, resource)) {
            return Ok(());
        }

        if mode == PopulateMode::Mandatory {
            self.mandatory.insert(resource);
        }

        match self.populate_resource(ctx, resource) {
            Err(err) if mode == PopulateMode::Mandatory => Err(err),
            Err(err) => {
                debug!("Excluding {}: {}", ctx.resource(resource), err);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Seed an on-demand fragment with the hosts already in the resolution
    fn seed_on_demand(&mut self, ctx: &Context<'_>, resource: ResourceId) -> bool {
        let mut host_req = None;
        let mut remaining = VecDeque::new();
        for &req in ctx.resource(resource).requirements() {
            if host_req.is_none() && ctx.repo.requirement(req).namespace() == HOST {
                host_req = Some(req);
            } else {
                remaining.push_back(req);
            }
        }
        let Some(host_req) = host_req else {
            return false;
        };

        let hosts: Vec<Cap> = ctx
            .env
            .find_providers(ctx.repo.requirement(host_req))
            .into_iter()
            .filter(|&cap| self.is_populated(ctx.repo.capability(cap).resource()))
            .map(Cap::Declared)
            .collect();
        if hosts.is_empty() {
            return false;
        }

        let mut local = IndexMap::new();
        local.insert(Req::Declared(host_req), hosts);
        self.population.insert(
            resource,
            Population::InProgress {
                depth: -1,
                local,
                remaining,
            },
        );
        true
    }

    fn populate_resource(&mut self, ctx: &Context<'_>, resource: ResourceId) -> Result<(), ResolutionError> {
        let depth = match self.population.get_mut(&resource) {
            Some(Population::Done) => return Ok(()),
            Some(Population::Failed(err)) => return Err(err.clone()),
            Some(Population::InProgress { depth, .. }) => {
                *depth += 1;
                *depth
            }
            None => {
                let declared = ctx.resource(resource);
                if let Err(reason) = ctx.env.validate(declared) {
                    let err = ResolutionError::Rejected {
                        resource: declared.to_string(),
                        reason,
                    };
                    self.population.insert(resource, Population::Failed(err.clone()));
                    return Err(err);
                }
                self.population.insert(
                    resource,
                    Population::InProgress {
                        depth: 0,
                        local: IndexMap::new(),
                        remaining: declared.requirements().iter().copied().collect(),
                    },
                );
                0
            }
        };
        trace!("Populating {} at depth {}", ctx.resource(resource), depth);

        loop {
            let next = match self.population.get_mut(&resource) {
                Some(Population::InProgress { remaining, .. }) => remaining.pop_front(),
                Some(Population::Failed(err)) => return Err(err.clone()),
                _ => None,
            };
            let Some(req_id) = next else {
                break;
            };

            let requirement = ctx.repo.requirement(req_id);
            if !ctx.env.is_effective(requirement) || requirement.is_dynamic() {
                continue;
            }

            let mut candidates: Vec<Cap> = ctx
                .env
                .find_providers(requirement)
                .into_iter()
                .map(Cap::Declared)
                .collect();
            let cause = self.process_candidates(ctx, resource, &mut candidates);

            if candidates.is_empty() {
                if requirement.is_optional() {
                    continue;
                }
                let err = ResolutionError::UnresolvedRequirement {
                    resource: ctx.resource(resource).to_string(),
                    requirement: requirement.to_string(),
                    requirement_id: req_id,
                    cause: cause.map(Box::new),
                };
                self.population.insert(resource, Population::Failed(err.clone()));
                return Err(err);
            }

            if let Some(Population::InProgress { local, .. }) = self.population.get_mut(&resource) {
                local.insert(Req::Declared(req_id), candidates);
            }
        }

        if depth > 0 {
            if let Some(Population::InProgress { depth, .. }) = self.population.get_mut(&resource) {
                *depth -= 1;
            }
        } else if depth == 0
            && matches!(self.population.get(&resource), Some(Population::InProgress { .. }))
        {
            if let Some(Population::InProgress { local, .. }) =
                self.population.insert(resource, Population::Done)
            {
                for (req, caps) in local {
                    if ctx.requirement(req).namespace() == HOST {
                        self.fragments_present = true;
                    }
                    self.candidates.insert(req, caps);
                }
            }
        }
        Ok(())
    }

    /// Populate the owners of the candidates, dropping those that fail.
    ///
    /// Returns the first failure, kept as the cause of any resulting error.
    fn process_candidates(
        &mut self,
        ctx: &Context<'_>,
        resource: ResourceId,
        candidates: &mut Vec<Cap>,
    ) -> Option<ResolutionError> {
        let mut cause = None;
        let mut idx = 0;

        while idx < candidates.len() {
            let cap = candidates[idx].id();
            let owner = ctx.repo.capability(cap).resource();
            let fragment = ctx.is_fragment(owner);

            // Resolved fragments are only reachable through their hosts
            if fragment && ctx.is_resolved(owner) {
                let hosted = ctx.hosted_copies(owner, cap);
                let count = hosted.len();
                candidates.splice(idx..=idx, hosted);
                idx += count;
                continue;
            }

            if fragment || (!ctx.is_resolved(owner) && owner != resource) {
                if let Err(err) = self.populate_resource(ctx, owner) {
                    cause.get_or_insert(err);
                    candidates.remove(idx);
                    continue;
                }
            }
            idx += 1;
        }

        cause
    }

    /// Seed the candidates of a single dynamic requirement of a resolved resource
    pub(crate) fn populate_dynamic(
        &mut self,
        ctx: &Context<'_>,
        resource: ResourceId,
        requirement: RequirementId,
        candidates: &[CapabilityId],
    ) -> Result<(), ResolutionError> {
        self.mandatory.insert(resource);

        let mut caps: Vec<Cap> = candidates.iter().copied().map(Cap::Declared).collect();
        let cause = self.process_candidates(ctx, resource, &mut caps);

        if caps.is_empty() {
            return Err(ResolutionError::DynamicImportFailed {
                resource: ctx.resource(resource).to_string(),
                requirement: ctx.repo.requirement(requirement).to_string(),
                requirement_id: requirement,
                cause: cause.map(Box::new),
            });
        }

        self.population.insert(resource, Population::Done);
        self.candidates.insert(Req::Declared(requirement), caps);
        Ok(())
    }

    pub(crate) fn is_populated(&self, resource: ResourceId) -> bool {
        matches!(self.population.get(&resource), Some(Population::Done))
    }

    fn population_error(&self, resource: ResourceId) -> Option<ResolutionError> {
        match self.population.get(&resource) {
            Some(Population::Failed(err)) => Some(err.clone()),
            _ => None,
        }
    }

    pub(crate) fn candidates_for(&self, req: Req) -> Option<&[Cap]> {
        self.candidates.get(&req).map(Vec::as_slice)
    }

    pub(crate) fn first_candidate(&self, req: Req) -> Option<Cap> {
        self.candidates.get(&req).and_then(|caps| caps.first().copied())
    }

    /// Drop the preferred candidate of a requirement if an alternative remains
    pub(crate) fn remove_first_candidate(&mut self, req: Req) -> bool {
        match self.candidates.get_mut(&req) {
            Some(caps) if caps.len() > 1 => {
                caps.remove(0);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn attached_fragments(&self, host: ResourceId) -> &[ResourceId] {
        self.attached.get(&host).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The node standing in for a resource: its attached view if it has one
    pub(crate) fn node(&self, resource: ResourceId) -> Node {
        if self.attached.contains_key(&resource) {
            Node::Attached(resource)
        } else {
            Node::Resource(resource)
        }
    }

    /// Independent copy for a permutation
    pub(crate) fn copy(&self) -> Self {
        self.clone()
    }

    /// Attach fragments to their hosts once population is complete.
    ///
    /// For every host only the newest version of each fragment name is
    /// attached; the others lose that host and are removed when left without
    /// one. Hosts with fragments become attached views, and candidate lists
    /// are rewritten to point at the views.
    pub(crate) fn prepare(&mut self, ctx: &Context<'_>) -> Result<(), ResolutionError> {
        let host_fragments = if self.fragments_present {
            self.index_dependents(ctx)
        } else {
            HostFragments::new()
        };

        let mut unselected = Vec::new();
        for (host_cap, by_name) in host_fragments {
            let host = ctx.cap_node(host_cap).id();
            // Resolved hosts take no new fragments
            let attachable = !ctx.is_resolved(host);

            let mut selected = Vec::new();
            for by_version in by_name.into_values() {
                let mut first = attachable;
                for host_req in by_version.into_values().flatten() {
                    let fragment = ctx.req_node(host_req).id();
                    if first {
                        selected.push(fragment);
                        first = false;
                        continue;
                    }

                    if let Some(deps) = self.dependents.get_mut(&host_cap) {
                        deps.shift_remove(&host_req);
                    }
                    if let Some(hosts) = self.candidates.get_mut(&host_req) {
                        hosts.retain(|&c| c != host_cap);
                        if hosts.is_empty() {
                            unselected.push(fragment);
                        }
                    }
                }
            }
            if attachable {
                self.attached.insert(host, selected);
            }
        }

        for fragment in unselected {
            let err = ResolutionError::FragmentNotSelected {
                fragment: ctx.resource(fragment).to_string(),
            };
            debug!("{}", err);
            self.remove_resource(ctx, fragment, err);
        }

        let hosts: Vec<ResourceId> = self.attached.keys().copied().collect();
        for host in hosts {
            self.attach(ctx, host);
        }

        for &resource in &self.mandatory {
            if !self.is_populated(resource) {
                return Err(self.population_error(resource).unwrap_or_else(|| {
                    ResolutionError::Rejected {
                        resource: ctx.resource(resource).to_string(),
                        reason: "its candidates could not be populated".to_string(),
                    }
                }));
            }
        }
        Ok(())
    }

    fn index_dependents(&mut self, ctx: &Context<'_>) -> HostFragments {
        let mut host_fragments = HostFragments::new();

        for (req, caps) in &self.candidates {
            for cap in caps {
                self.dependents.entry(*cap).or_default().insert(*req);

                if ctx.requirement(*req).namespace() == HOST {
                    let fragment = ctx.resource(ctx.req_node(*req).id());
                    host_fragments
                        .entry(*cap)
                        .or_default()
                        .entry(fragment.name().to_string())
                        .or_default()
                        .entry(Reverse(fragment.version().clone()))
                        .or_default()
                        .push(*req);
                }
            }
        }

        host_fragments
    }

    /// Point every dependent of the host and its fragments at the attached view
    fn attach(&mut self, ctx: &Context<'_>, host: ResourceId) {
        let node = Node::Attached(host);

        for cap in ctx.capabilities(node, self) {
            // Fragments stay attached to the declared host
            if ctx.capability(cap).namespace() == HOST {
                continue;
            }
            let original = Cap::Declared(cap.id());
            let Some(deps) = self.dependents.get(&original).cloned() else {
                continue;
            };

            for dep in &deps {
                if let Some(caps) = self.candidates.get_mut(dep) {
                    let already = caps.contains(&cap);
                    match caps.iter().position(|&c| c == original) {
                        Some(pos) if !already => caps[pos] = cap,
                        Some(pos) => {
                            caps.remove(pos);
                        }
                        None if !already => caps.push(cap),
                        None => {}
                    }
                }
            }
            self.dependents.insert(cap, deps);
        }

        for req in ctx.requirements(node, self) {
            let original = Req::Declared(req.id());
            let Some(caps) = self.candidates.get(&original).cloned() else {
                continue;
            };
            for cap in &caps {
                if let Some(deps) = self.dependents.get_mut(cap) {
                    deps.shift_remove(&original);
                    deps.insert(req);
                }
            }
            self.candidates.insert(req, caps);
        }
    }

    /// Remove a resource from the candidate space, cascading to dependents
    /// left without candidates for a mandatory requirement
    fn remove_resource(&mut self, ctx: &Context<'_>, resource: ResourceId, err: ResolutionError) {
        self.population.insert(resource, Population::Failed(err));

        let mut unresolved = IndexSet::new();
        self.remove_declared(ctx, resource, &mut unresolved);
        while let Some(next) = unresolved.pop() {
            self.remove_declared(ctx, next, &mut unresolved);
        }
    }

    fn remove_declared(&mut self, ctx: &Context<'_>, resource: ResourceId, unresolved: &mut IndexSet<ResourceId>) {
        let declared = ctx.resource(resource);

        for &req in declared.requirements() {
            if let Some(caps) = self.candidates.shift_remove(&Req::Declared(req)) {
                for cap in caps {
                    if let Some(deps) = self.dependents.get_mut(&cap) {
                        deps.shift_remove(&Req::Declared(req));
                    }
                }
            }
        }

        for &cap in declared.capabilities() {
            let cap = Cap::Declared(cap);
            let Some(deps) = self.dependents.shift_remove(&cap) else {
                continue;
            };

            for req in deps {
                let Some(caps) = self.candidates.get_mut(&req) else {
                    continue;
                };
                caps.retain(|&c| c != cap);
                if !caps.is_empty() {
                    continue;
                }

                self.candidates.shift_remove(&req);
                let requirement = ctx.requirement(req);
                if !requirement.is_optional() {
                    let owner = ctx.req_node(req).id();
                    let err = ResolutionError::UnresolvedRequirement {
                        resource: ctx.resource(owner).to_string(),
                        requirement: requirement.to_string(),
                        requirement_id: requirement.id(),
                        cause: None,
                    };
                    debug!("{}", err);
                    self.population.insert(owner, Population::Failed(err));
                    unresolved.insert(owner);
                }
            }
        }
    }
}
