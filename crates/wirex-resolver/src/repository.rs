use std::collections::HashMap;

use wirex_filter::Version;

use crate::model::namespace::{BUNDLE, BUNDLE_VERSION_ATTRIBUTE, HOST};
use crate::model::{
    Capability, CapabilityBuilder, CapabilityId, Requirement, RequirementId, Resource,
    ResourceBuilder, ResourceId,
};

/// Arena of all resources known to a resolution.
///
/// Resources, capabilities and requirements are indexed by their ids. Ids
/// handed out by one repository are only meaningful for that repository.
#[derive(Debug, Default, Clone)]
pub struct Repository {
    resources: Vec<Resource>,
    capabilities: Vec<Capability>,
    requirements: Vec<Requirement>,

    /// Capability ids indexed by namespace, in declaration order
    by_namespace: HashMap<String, Vec<CapabilityId>>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource and return its id.
    ///
    /// Resources that are not fragments also offer a bundle capability and a
    /// host capability named after the resource.
    pub fn add(&mut self, builder: ResourceBuilder) -> ResourceId {
        let id = ResourceId(self.resources.len());
        let fragment = builder.is_fragment();

        let mut capability_builders = Vec::with_capacity(builder.capabilities.len() + 2);
        if !fragment {
            for namespace in [BUNDLE, HOST] {
                capability_builders.push(
                    CapabilityBuilder::new(namespace)
                        .attribute(namespace, builder.name.clone())
                        .attribute(BUNDLE_VERSION_ATTRIBUTE, builder.version.clone()),
                );
            }
        }
        capability_builders.extend(builder.capabilities);

        let mut capabilities = Vec::with_capacity(capability_builders.len());
        for cap in capability_builders {
            let cap_id = CapabilityId(self.capabilities.len());
            let capability = Capability::new(cap_id, id, cap);
            self.by_namespace
                .entry(capability.namespace().to_string())
                .or_default()
                .push(cap_id);
            self.capabilities.push(capability);
            capabilities.push(cap_id);
        }

        let mut requirements = Vec::with_capacity(builder.requirements.len());
        for req in builder.requirements {
            let req_id = RequirementId(self.requirements.len());
            self.requirements.push(Requirement::new(req_id, id, req));
            requirements.push(req_id);
        }

        self.resources.push(Resource {
            id,
            name: builder.name,
            version: builder.version,
            capabilities,
            requirements,
            fragment,
        });
        id
    }

    /// # Panics
    ///
    /// Panics if the id was not handed out by this repository.
    pub fn resource(&self, id: ResourceId) -> &Resource {
        &self.resources[id.0]
    }

    /// # Panics
    ///
    /// Panics if the id was not handed out by this repository.
    pub fn capability(&self, id: CapabilityId) -> &Capability {
        &self.capabilities[id.0]
    }

    /// # Panics
    ///
    /// Panics if the id was not handed out by this repository.
    pub fn requirement(&self, id: RequirementId) -> &Requirement {
        &self.requirements[id.0]
    }

    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.0)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Find a resource by name, picking the highest version when no version is given
    pub fn find(&self, name: &str, version: Option<&Version>) -> Option<ResourceId> {
        self.resources
            .iter()
            .filter(|r| r.name == name)
            .filter(|r| version.map_or(true, |v| &r.version == v))
            .max_by(|a, b| a.version.cmp(&b.version).then(b.id.cmp(&a.id)))
            .map(|r| r.id)
    }

    /// All capabilities matching the requirement, in declaration order
    pub fn what_provides(&self, requirement: &Requirement) -> Vec<CapabilityId> {
        self.by_namespace
            .get(requirement.namespace())
            .map(|ids| {
                ids.iter()
                    .copied()
                    .filter(|&id| requirement.matches(self.capability(id)))
                    .collect()
            })
            .unwrap_or_default()
    }
}
