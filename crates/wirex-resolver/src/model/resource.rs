use std::fmt;

use wirex_filter::Version;

use super::capability::{CapabilityBuilder, CapabilityId};
use super::namespace::HOST;
use super::requirement::{RequirementBuilder, RequirementId};

/// Arena index of a resource inside a [`Repository`](crate::Repository).
///
/// Two resources with identical content still have distinct ids; identity is
/// never derived from content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) usize);

impl ResourceId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A unit of deployment offering capabilities and declaring requirements.
#[derive(Debug, Clone)]
pub struct Resource {
    pub(crate) id: ResourceId,
    pub(crate) name: String,
    pub(crate) version: Version,
    pub(crate) capabilities: Vec<CapabilityId>,
    pub(crate) requirements: Vec<RequirementId>,
    pub(crate) fragment: bool,
}

impl Resource {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Symbolic name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Capabilities in declaration order
    pub fn capabilities(&self) -> &[CapabilityId] {
        &self.capabilities
    }

    /// Requirements in declaration order
    pub fn requirements(&self) -> &[RequirementId] {
        &self.requirements
    }

    /// Fragments declare a host requirement and are merged into their host
    pub fn is_fragment(&self) -> bool {
        self.fragment
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Builder for resources; see [`Repository::add`](crate::Repository::add).
#[derive(Debug, Clone)]
pub struct ResourceBuilder {
    pub(crate) name: String,
    pub(crate) version: Version,
    pub(crate) capabilities: Vec<CapabilityBuilder>,
    pub(crate) requirements: Vec<RequirementBuilder>,
}

impl ResourceBuilder {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            capabilities: Vec::new(),
            requirements: Vec::new(),
        }
    }

    pub fn capability(mut self, capability: CapabilityBuilder) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn requirement(mut self, requirement: RequirementBuilder) -> Self {
        self.requirements.push(requirement);
        self
    }

    pub fn export_package(self, name: &str) -> Self {
        self.capability(CapabilityBuilder::package(name))
    }

    pub fn export_package_uses(self, name: &str, uses: &[&str]) -> Self {
        self.capability(CapabilityBuilder::package(name).uses(uses))
    }

    pub fn import_package(self, name: &str) -> Self {
        self.requirement(RequirementBuilder::package(name))
    }

    pub fn optional_import(self, name: &str) -> Self {
        self.requirement(RequirementBuilder::package(name).optional())
    }

    pub fn dynamic_import(self, name: &str) -> Self {
        self.requirement(RequirementBuilder::package(name).dynamic())
    }

    pub fn require_bundle(self, name: &str) -> Self {
        self.requirement(RequirementBuilder::bundle(name))
    }

    pub fn reexport_bundle(self, name: &str) -> Self {
        self.requirement(RequirementBuilder::bundle(name).reexport())
    }

    /// Make this resource a fragment of the named host
    pub fn fragment_of(self, host: &str) -> Self {
        self.requirement(RequirementBuilder::host(host))
    }

    pub(crate) fn is_fragment(&self) -> bool {
        self.requirements.iter().any(|r| r.namespace == HOST)
    }
}
