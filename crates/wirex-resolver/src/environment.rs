//! The resolver's view of the outside world.

use crate::model::namespace::{HOST, IDENTITY, PACKAGE};
use crate::model::{CapabilityId, Requirement, Resource, ResourceId, WireMap, Wiring, Wirings};
use crate::policy::Policy;
use crate::repository::Repository;

/// Existing resolution state plus capability lookup.
///
/// The resolver only reads from the environment, so a single environment may
/// serve concurrent resolutions.
pub trait Environment: Send + Sync {
    /// All resources, capabilities and requirements ids refer to
    fn repository(&self) -> &Repository;

    /// Wirings of already resolved resources
    fn wirings(&self) -> &Wirings;

    /// Capabilities that can satisfy the requirement, best first
    fn find_providers(&self, requirement: &Requirement) -> Vec<CapabilityId>;

    /// Requirements that are not effective are ignored during resolution
    fn is_effective(&self, _requirement: &Requirement) -> bool {
        true
    }

    /// Reject a resource before its requirements are looked at
    fn validate(&self, _resource: &Resource) -> Result<(), String> {
        Ok(())
    }
}

/// An [`Environment`] backed by a [`Repository`] and a provider [`Policy`].
#[derive(Debug, Clone, Default)]
pub struct RepositoryEnvironment {
    repository: Repository,
    wirings: Wirings,
    policy: Policy,
}

impl RepositoryEnvironment {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            wirings: Wirings::new(),
            policy: Policy::default(),
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn repository_mut(&mut self) -> &mut Repository {
        &mut self.repository
    }

    /// Install a resolution result as resolved state.
    ///
    /// Resources that are resolved already keep their wiring and gain the new
    /// wires, as after [`Resolver::resolve_dynamic`](crate::Resolver::resolve_dynamic).
    /// Hosts take over the capabilities and requirements of the fragments
    /// wired to them. Exports whose package is also imported from another
    /// resource are substituted and dropped from the host's capabilities.
    pub fn commit(&mut self, wires: &WireMap) {
        let repo = &self.repository;
        let mut fragments_by_host: Vec<(ResourceId, ResourceId)> = Vec::new();

        for (&resource, resource_wires) in wires {
            if repo.resource(resource).is_fragment() {
                for wire in resource_wires {
                    if repo.requirement(wire.requirement).namespace() == HOST {
                        fragments_by_host.push((wire.provider, resource));
                    }
                }
            }
        }

        for (&resource, resource_wires) in wires {
            if let Some(wiring) = self.wirings.get_mut(&resource) {
                for wire in resource_wires {
                    if !wiring.wires.contains(wire) {
                        wiring.wires.push(*wire);
                    }
                }
                continue;
            }

            let declared = repo.resource(resource);

            if declared.is_fragment() {
                self.wirings.insert(
                    resource,
                    Wiring {
                        capabilities: declared.capabilities().to_vec(),
                        requirements: declared.requirements().to_vec(),
                        wires: resource_wires.clone(),
                    },
                );
                continue;
            }

            let substituted: Vec<&str> = resource_wires
                .iter()
                .filter(|w| w.provider != resource)
                .filter_map(|w| repo.capability(w.capability).package_name())
                .collect();

            let mut capabilities: Vec<CapabilityId> = declared
                .capabilities()
                .iter()
                .copied()
                .filter(|&c| {
                    let cap = repo.capability(c);
                    cap.namespace() != PACKAGE
                        || cap.package_name().map_or(true, |name| !substituted.contains(&name))
                })
                .collect();
            let mut requirements = declared.requirements().to_vec();

            for &(host, fragment) in &fragments_by_host {
                if host != resource {
                    continue;
                }
                let fragment = repo.resource(fragment);
                capabilities.extend(
                    fragment
                        .capabilities()
                        .iter()
                        .copied()
                        .filter(|&c| repo.capability(c).namespace() != IDENTITY),
                );
                requirements.extend(
                    fragment
                        .requirements()
                        .iter()
                        .copied()
                        .filter(|&r| repo.requirement(r).namespace() != HOST),
                );
            }

            self.wirings.insert(
                resource,
                Wiring {
                    capabilities,
                    requirements,
                    wires: resource_wires.clone(),
                },
            );
        }
    }
}

impl Environment for RepositoryEnvironment {
    fn repository(&self) -> &Repository {
        &self.repository
    }

    fn wirings(&self) -> &Wirings {
        &self.wirings
    }

    fn find_providers(&self, requirement: &Requirement) -> Vec<CapabilityId> {
        let matching: Vec<CapabilityId> = self
            .repository
            .what_provides(requirement)
            .into_iter()
            .filter(|id| {
                let owner = self.repository.capability(*id).resource();
                self.wirings
                    .get(&owner)
                    .map_or(true, |wiring| wiring.capabilities.contains(id))
            })
            .collect();

        self.policy.sort_providers(&self.repository, &self.wirings, &matching)
    }
}
