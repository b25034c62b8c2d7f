//! Turning a consistent candidate permutation into wires.

use crate::model::namespace::{BUNDLE, HOST, PACKAGE};
use crate::model::{RequirementId, ResourceId, Wire, WireMap};

use super::candidates::Candidates;
use super::graph::{Context, Node, Req};

/// Wire `node` and every unresolved provider it selected.
///
/// Wires are grouped package first, then bundle, then everything else, each
/// group in requirement declaration order. Requirements satisfied by the node
/// itself get no wire.
pub(crate) fn populate_wire_map(ctx: &Context<'_>, candidates: &Candidates, node: Node, map: &mut WireMap) {
    let requirer = node.id();
    if ctx.is_resolved(requirer) || map.contains_key(&requirer) {
        return;
    }
    map.insert(requirer, Vec::new());

    let mut package_wires = Vec::new();
    let mut bundle_wires = Vec::new();
    let mut other_wires = Vec::new();

    for req in ctx.requirements(node, candidates) {
        let Some(cap) = candidates.first_candidate(req) else {
            continue;
        };
        let provider = ctx.cap_node(cap);
        if provider == node {
            continue;
        }
        if !ctx.is_resolved(provider.id()) {
            populate_wire_map(ctx, candidates, provider, map);
        }

        let wire = Wire::new(requirer, req.id(), provider.id(), cap.id());
        match ctx.requirement(req).namespace() {
            PACKAGE => package_wires.push(wire),
            BUNDLE => bundle_wires.push(wire),
            _ => other_wires.push(wire),
        }
    }

    package_wires.extend(bundle_wires);
    package_wires.extend(other_wires);
    map.insert(requirer, package_wires);

    if let Node::Attached(host) = node {
        attach_host_wires(ctx, candidates, host, map);
    }
}

/// Wire every fragment attached to `host` to the host's host capability
fn attach_host_wires(ctx: &Context<'_>, candidates: &Candidates, host: ResourceId, map: &mut WireMap) {
    let host_cap = ctx
        .resource(host)
        .capabilities()
        .iter()
        .copied()
        .find(|&cap| ctx.repo.capability(cap).namespace() == HOST);
    let Some(host_cap) = host_cap else {
        return;
    };

    for &fragment in candidates.attached_fragments(host) {
        let wires = map.entry(fragment).or_default();
        for &req in ctx.resource(fragment).requirements() {
            if ctx.repo.requirement(req).namespace() == HOST {
                wires.push(Wire::new(fragment, req, host, host_cap));
            }
        }
    }
}

/// Wire a single dynamic requirement of a resolved resource, plus the
/// provider it selected if that is not resolved yet
pub(crate) fn populate_dynamic_wire_map(
    ctx: &Context<'_>,
    candidates: &Candidates,
    resource: ResourceId,
    requirement: RequirementId,
    map: &mut WireMap,
) {
    map.insert(resource, Vec::new());

    let Some(cap) = candidates.first_candidate(Req::Declared(requirement)) else {
        return;
    };
    let provider = ctx.cap_node(cap);
    if !ctx.is_resolved(provider.id()) {
        populate_wire_map(ctx, candidates, provider, map);
    }

    map.insert(resource, vec![Wire::new(resource, requirement, provider.id(), cap.id())]);
}
