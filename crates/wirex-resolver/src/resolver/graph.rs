//! The resolution graph as the algorithms see it.
//!
//! A host with attached fragments is a single [`Node::Attached`] view whose
//! capabilities and requirements are the union of the host's and its
//! fragments'. Capabilities and requirements reached through such a view are
//! [`Cap::Hosted`] / [`Req::Hosted`]: same declared artifact, different owner.

use crate::environment::Environment;
use crate::model::namespace::{HOST, IDENTITY, PACKAGE};
use crate::model::{
    Capability, CapabilityId, Requirement, RequirementId, Resource, ResourceId, Wire, Wiring, Wirings,
};
use crate::repository::Repository;

use super::candidates::Candidates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum Node {
    /// A resource as declared
    Resource(ResourceId),
    /// A host merged with its attached fragments
    Attached(ResourceId),
}

impl Node {
    /// The declared resource behind this node
    pub(crate) fn id(self) -> ResourceId {
        match self {
            Node::Resource(id) | Node::Attached(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum Cap {
    Declared(CapabilityId),
    Hosted { host: Node, cap: CapabilityId },
}

impl Cap {
    pub(crate) fn id(self) -> CapabilityId {
        match self {
            Cap::Declared(id) | Cap::Hosted { cap: id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum Req {
    Declared(RequirementId),
    Hosted { host: Node, req: RequirementId },
}

impl Req {
    pub(crate) fn id(self) -> RequirementId {
        match self {
            Req::Declared(id) | Req::Hosted { req: id, .. } => id,
        }
    }
}

/// Read-only lookups shared by every stage of one resolve call.
#[derive(Clone, Copy)]
pub(crate) struct Context<'a> {
    pub(crate) env: &'a dyn Environment,
    pub(crate) repo: &'a Repository,
    pub(crate) wirings: &'a Wirings,
}

impl<'a> Context<'a> {
    pub(crate) fn new(env: &'a dyn Environment) -> Self {
        Self {
            env,
            repo: env.repository(),
            wirings: env.wirings(),
        }
    }

    pub(crate) fn resource(&self, id: ResourceId) -> &'a Resource {
        self.repo.resource(id)
    }

    pub(crate) fn capability(&self, cap: Cap) -> &'a Capability {
        self.repo.capability(cap.id())
    }

    pub(crate) fn requirement(&self, req: Req) -> &'a Requirement {
        self.repo.requirement(req.id())
    }

    pub(crate) fn is_resolved(&self, id: ResourceId) -> bool {
        self.wirings.contains_key(&id)
    }

    pub(crate) fn is_fragment(&self, id: ResourceId) -> bool {
        self.repo.resource(id).is_fragment()
    }

    /// Existing wiring; attached views are never resolved
    pub(crate) fn wiring(&self, node: Node) -> Option<&'a Wiring> {
        match node {
            Node::Resource(id) => self.wirings.get(&id),
            Node::Attached(_) => None,
        }
    }

    /// The node owning a capability
    pub(crate) fn cap_node(&self, cap: Cap) -> Node {
        match cap {
            Cap::Declared(id) => Node::Resource(self.repo.capability(id).resource()),
            Cap::Hosted { host, .. } => host,
        }
    }

    /// The node owning a requirement
    pub(crate) fn req_node(&self, req: Req) -> Node {
        match req {
            Req::Declared(id) => Node::Resource(self.repo.requirement(id).resource()),
            Req::Hosted { host, .. } => host,
        }
    }

    pub(crate) fn package_name(&self, cap: Cap) -> Option<&'a str> {
        self.capability(cap).package_name()
    }

    /// Capabilities offered by a node.
    ///
    /// Resolved resources offer what their wiring lists; attached views offer
    /// the host's capabilities followed by those of each attached fragment.
    pub(crate) fn capabilities(&self, node: Node, candidates: &Candidates) -> Vec<Cap> {
        match node {
            Node::Resource(id) => match self.wirings.get(&id) {
                Some(wiring) => wiring
                    .capabilities
                    .iter()
                    .map(|&cap| self.owned_by(node, cap))
                    .collect(),
                None => self
                    .resource(id)
                    .capabilities()
                    .iter()
                    .map(|&cap| Cap::Declared(cap))
                    .collect(),
            },
            Node::Attached(host) => {
                let mut caps: Vec<Cap> = self
                    .resource(host)
                    .capabilities()
                    .iter()
                    .map(|&cap| Cap::Hosted { host: node, cap })
                    .collect();
                for &fragment in candidates.attached_fragments(host) {
                    caps.extend(
                        self.resource(fragment)
                            .capabilities()
                            .iter()
                            .filter(|&&cap| self.repo.capability(cap).namespace() != IDENTITY)
                            .map(|&cap| Cap::Hosted { host: node, cap }),
                    );
                }
                caps
            }
        }
    }

    /// Requirements declared by a node, in declaration order.
    ///
    /// Attached views expose the host's requirements followed by those of each
    /// attached fragment, except the fragments' host requirements.
    pub(crate) fn requirements(&self, node: Node, candidates: &Candidates) -> Vec<Req> {
        match node {
            Node::Resource(id) => self
                .resource(id)
                .requirements()
                .iter()
                .map(|&req| Req::Declared(req))
                .collect(),
            Node::Attached(host) => {
                let mut reqs: Vec<Req> = self
                    .resource(host)
                    .requirements()
                    .iter()
                    .map(|&req| Req::Hosted { host: node, req })
                    .collect();
                for &fragment in candidates.attached_fragments(host) {
                    reqs.extend(
                        self.resource(fragment)
                            .requirements()
                            .iter()
                            .filter(|&&req| self.repo.requirement(req).namespace() != HOST)
                            .map(|&req| Req::Hosted { host: node, req }),
                    );
                }
                reqs
            }
        }
    }

    /// An existing wire as a requirement/capability pair of the graph
    pub(crate) fn wire_pair(&self, wire: &Wire) -> (Req, Cap) {
        let requirement = self.repo.requirement(wire.requirement);
        let req = if requirement.resource() != wire.requirer || requirement.is_dynamic() {
            Req::Hosted {
                host: Node::Resource(wire.requirer),
                req: wire.requirement,
            }
        } else {
            Req::Declared(wire.requirement)
        };

        (req, self.owned_by(Node::Resource(wire.provider), wire.capability))
    }

    fn owned_by(&self, node: Node, cap: CapabilityId) -> Cap {
        if self.repo.capability(cap).resource() == node.id() {
            Cap::Declared(cap)
        } else {
            Cap::Hosted { host: node, cap }
        }
    }

    /// Copies of a resolved fragment's capability, one per host it is attached to.
    ///
    /// Package capabilities are only copied to hosts still offering them.
    pub(crate) fn hosted_copies(&self, fragment: ResourceId, cap: CapabilityId) -> Vec<Cap> {
        let Some(wiring) = self.wirings.get(&fragment) else {
            return Vec::new();
        };
        let is_package = self.repo.capability(cap).namespace() == PACKAGE;

        wiring
            .wires
            .iter()
            .filter(|wire| self.repo.requirement(wire.requirement).namespace() == HOST)
            .filter(|wire| {
                !is_package
                    || self
                        .wirings
                        .get(&wire.provider)
                        .map_or(false, |host| host.capabilities.contains(&cap))
            })
            .map(|wire| Cap::Hosted {
                host: Node::Resource(wire.provider),
                cap,
            })
            .collect()
    }

    /// The first capability of a node that satisfies a requirement
    pub(crate) fn satisfying_capability(
        &self,
        node: Node,
        requirement: &Requirement,
        candidates: &Candidates,
    ) -> Option<Cap> {
        self.capabilities(node, candidates)
            .into_iter()
            .find(|&cap| requirement.matches(self.capability(cap)))
    }

    pub(crate) fn describe(&self, node: Node) -> String {
        self.resource(node.id()).to_string()
    }
}
