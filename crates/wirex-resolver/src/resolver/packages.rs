//! Package spaces: which provider each node sees for every package name.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::model::namespace::{BUNDLE, PACKAGE};

use super::candidates::Candidates;
use super::graph::{Cap, Context, Node, Req};

/// A capability together with the requirement chain that made it visible.
///
/// Exports carry an empty chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Blame {
    pub(crate) cap: Cap,
    pub(crate) reqs: Vec<Req>,
}

impl Blame {
    pub(crate) fn new(cap: Cap, reqs: Vec<Req>) -> Self {
        Self { cap, reqs }
    }

    pub(crate) fn first_req(&self) -> Option<Req> {
        self.reqs.first().copied()
    }
}

/// Per-node view of packages: exported, imported, obtained through
/// whole-resource requirements, and reachable through uses constraints.
#[derive(Debug, Clone, Default)]
pub(crate) struct Packages {
    pub(crate) exported: IndexMap<String, Blame>,
    pub(crate) imported: IndexMap<String, Vec<Blame>>,
    pub(crate) required: IndexMap<String, Vec<Blame>>,
    pub(crate) used: IndexMap<String, Vec<Blame>>,
}

pub(crate) type PackageSpaces = HashMap<Node, Packages>;

/// State of one candidate permutation being checked.
pub(crate) struct Attempt<'a> {
    pub(crate) ctx: Context<'a>,
    pub(crate) candidates: &'a Candidates,
    pub(crate) spaces: PackageSpaces,
    /// Package sources, cached per capability
    sources: HashMap<Cap, Vec<Cap>>,
}

impl<'a> Attempt<'a> {
    pub(crate) fn new(ctx: Context<'a>, candidates: &'a Candidates) -> Self {
        Self {
            ctx,
            candidates,
            spaces: PackageSpaces::new(),
            sources: HashMap::new(),
        }
    }

    /// Build the package space of a node and everything it is wired to
    pub(crate) fn calculate_package_spaces(
        &mut self,
        node: Node,
        uses_cycles: &mut HashMap<Cap, Vec<Node>>,
        visited: &mut HashSet<Node>,
    ) {
        if !visited.insert(node) {
            return;
        }

        let mut pairs: Vec<(Req, Cap)> = Vec::new();
        let mut dynamic_importing = false;

        match self.ctx.wiring(node) {
            Some(wiring) => {
                pairs.extend(wiring.wires.iter().map(|wire| self.ctx.wire_pair(wire)));

                // A resolved resource resolves at most one dynamic requirement at a time
                for &req in &wiring.requirements {
                    let req = Req::Declared(req);
                    if !self.ctx.requirement(req).is_dynamic() {
                        continue;
                    }
                    if let Some(cap) = self.candidates.first_candidate(req) {
                        pairs.push((req, cap));
                        dynamic_importing = true;
                        break;
                    }
                }
            }
            None => {
                for req in self.ctx.requirements(node, self.candidates) {
                    if self.ctx.requirement(req).is_dynamic() {
                        continue;
                    }
                    if let Some(cap) = self.candidates.first_candidate(req) {
                        pairs.push((req, cap));
                    }
                }
            }
        }

        self.calculate_exports(node);

        for &(req, cap) in &pairs {
            self.calculate_exports(self.ctx.cap_node(cap));
            self.merge_candidate_packages(node, req, cap, &mut HashMap::new());
        }

        for &(_, cap) in &pairs {
            self.calculate_package_spaces(self.ctx.cap_node(cap), uses_cycles, visited);
        }

        // Resolved package spaces are consistent already, unless a new
        // dynamic wire is being added
        if self.ctx.wiring(node).is_some() && !dynamic_importing {
            return;
        }

        for &(req, cap) in &pairs {
            let namespace = self.ctx.requirement(req).namespace();
            if namespace != PACKAGE && namespace != BUNDLE {
                self.merge_uses(node, cap, vec![req], uses_cycles);
            }
        }

        for blame in self.blames(node, |p| &p.imported) {
            if self.ctx.cap_node(blame.cap) == node {
                continue;
            }
            let reqs = blame.first_req().into_iter().collect();
            self.merge_uses(node, blame.cap, reqs, uses_cycles);
        }

        for blame in self.blames(node, |p| &p.required) {
            let reqs = blame.first_req().into_iter().collect();
            self.merge_uses(node, blame.cap, reqs, uses_cycles);
        }
    }

    pub(crate) fn packages(&self, node: Node) -> Option<&Packages> {
        self.spaces.get(&node)
    }

    fn blames<F>(&self, node: Node, select: F) -> Vec<Blame>
    where
        F: Fn(&Packages) -> &IndexMap<String, Vec<Blame>>,
    {
        self.packages(node)
            .map(|packages| select(packages).values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// Record the packages a node exports, minus those it imports instead
    fn calculate_exports(&mut self, node: Node) {
        if self.spaces.contains_key(&node) {
            return;
        }

        let mut exports: IndexMap<String, Cap> = IndexMap::new();
        for cap in self.ctx.capabilities(node, self.candidates) {
            if let Some(name) = self.ctx.package_name(cap) {
                exports.insert(name.to_string(), cap);
            }
        }

        // Resolved wirings already leave out substituted exports
        if !exports.is_empty() && self.ctx.wiring(node).is_none() {
            for req in self.ctx.requirements(node, self.candidates) {
                if self.ctx.requirement(req).namespace() != PACKAGE {
                    continue;
                }
                if let Some(name) = self
                    .candidates
                    .first_candidate(req)
                    .and_then(|cap| self.ctx.package_name(cap))
                {
                    exports.shift_remove(name);
                }
            }
        }

        let packages = Packages {
            exported: exports
                .into_iter()
                .map(|(name, cap)| (name, Blame::new(cap, Vec::new())))
                .collect(),
            ..Packages::default()
        };
        self.spaces.insert(node, packages);
    }

    fn merge_candidate_packages(
        &mut self,
        current: Node,
        req: Req,
        cap: Cap,
        cycles: &mut HashMap<Node, Vec<Cap>>,
    ) {
        let seen = cycles.entry(current).or_default();
        if seen.contains(&cap) {
            return;
        }
        seen.push(cap);

        match self.ctx.capability(cap).namespace() {
            PACKAGE => self.merge_candidate_package(current, false, req, cap),
            BUNDLE => {
                let provider = self.ctx.cap_node(cap);
                self.calculate_exports(provider);

                let exported: Vec<Cap> = self
                    .packages(provider)
                    .map(|p| p.exported.values().map(|b| b.cap).collect())
                    .unwrap_or_default();
                for exported in exported {
                    self.merge_candidate_package(current, true, req, exported);
                }

                // Packages of bundles the provider re-exports are visible too
                let reexported: Vec<Cap> = match self.ctx.wiring(provider) {
                    Some(wiring) => wiring
                        .wires
                        .iter()
                        .map(|wire| self.ctx.wire_pair(wire))
                        .filter(|&(r, _)| self.is_reexport(r))
                        .map(|(_, c)| c)
                        .collect(),
                    None => self
                        .ctx
                        .requirements(provider, self.candidates)
                        .into_iter()
                        .filter(|&r| self.is_reexport(r))
                        .filter_map(|r| self.candidates.first_candidate(r))
                        .collect(),
                };
                for next in reexported {
                    self.merge_candidate_packages(current, req, next, cycles);
                }
            }
            _ => {}
        }

        cycles.remove(&current);
    }

    fn is_reexport(&self, req: Req) -> bool {
        let requirement = self.ctx.requirement(req);
        requirement.namespace() == BUNDLE && requirement.is_reexport()
    }

    fn merge_candidate_package(&mut self, current: Node, required: bool, req: Req, cap: Cap) {
        let Some(name) = self.ctx.package_name(cap) else {
            return;
        };
        let packages = self.spaces.entry(current).or_default();
        let target = if required {
            &mut packages.required
        } else {
            &mut packages.imported
        };
        target
            .entry(name.to_string())
            .or_default()
            .push(Blame::new(cap, vec![req]));
    }

    /// Add the packages used by `cap` to the used packages of `current`
    fn merge_uses(
        &mut self,
        current: Node,
        cap: Cap,
        blame_reqs: Vec<Req>,
        cycles: &mut HashMap<Cap, Vec<Node>>,
    ) {
        if self.ctx.cap_node(cap) == current {
            return;
        }
        let seen = cycles.entry(cap).or_default();
        if seen.contains(&current) {
            return;
        }
        seen.push(current);

        for source in self.package_sources(cap) {
            let source_node = self.ctx.cap_node(source);
            for used in self.ctx.capability(source).uses() {
                let Some(source_packages) = self.packages(source_node) else {
                    break;
                };
                let blames: Vec<Blame> = match source_packages.exported.get(used) {
                    Some(exported) => vec![exported.clone()],
                    None => match source_packages
                        .required
                        .get(used)
                        .or_else(|| source_packages.imported.get(used))
                    {
                        Some(blames) => blames.clone(),
                        None => continue,
                    },
                };

                for blame in blames {
                    let mut reqs = blame_reqs.clone();
                    reqs.extend(blame.reqs.last().copied());
                    self.spaces
                        .entry(current)
                        .or_default()
                        .used
                        .entry(used.clone())
                        .or_default()
                        .push(Blame::new(blame.cap, reqs.clone()));
                    self.merge_uses(current, blame.cap, reqs, cycles);
                }
            }
        }
    }

    /// Capabilities that together make up the package behind `cap`.
    ///
    /// A package may be exported more than once by the same node and may be
    /// split across required bundles. Non-package capabilities only count
    /// when they declare uses.
    pub(crate) fn package_sources(&mut self, cap: Cap) -> Vec<Cap> {
        if self.ctx.capability(cap).namespace() != PACKAGE {
            return if self.ctx.capability(cap).uses().is_empty() {
                Vec::new()
            } else {
                vec![cap]
            };
        }

        if let Some(sources) = self.sources.get(&cap) {
            return sources.clone();
        }
        let mut sources = Vec::new();
        self.collect_sources(cap, &mut sources, &mut HashSet::new());
        self.sources.insert(cap, sources.clone());
        sources
    }

    fn collect_sources(&self, cap: Cap, sources: &mut Vec<Cap>, visited: &mut HashSet<Cap>) {
        let Some(name) = self.ctx.package_name(cap) else {
            return;
        };
        if !visited.insert(cap) {
            return;
        }

        let node = self.ctx.cap_node(cap);
        sources.extend(
            self.ctx
                .capabilities(node, self.candidates)
                .into_iter()
                .filter(|&c| self.ctx.package_name(c) == Some(name)),
        );

        if let Some(required) = self.spaces.get(&node).and_then(|p| p.required.get(name)) {
            for blame in required {
                self.collect_sources(blame.cap, sources, visited);
            }
        }
    }

    /// Two capabilities are compatible when one's package sources cover the other's
    pub(crate) fn is_compatible(&mut self, a: Cap, b: Cap) -> bool {
        if a == b {
            return true;
        }
        let a_sources = self.package_sources(a);
        let b_sources = self.package_sources(b);
        b_sources.iter().all(|c| a_sources.contains(c)) || a_sources.iter().all(|c| b_sources.contains(c))
    }
}
