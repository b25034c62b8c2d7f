use std::collections::HashMap;

use indexmap::IndexMap;

use super::capability::CapabilityId;
use super::requirement::RequirementId;
use super::resource::ResourceId;

/// A resolved dependency edge from a requirement to the capability satisfying it.
///
/// Wires always name declared artifacts: when a fragment's requirement is
/// wired through its host, the requirer is the host and the requirement is
/// still the one the fragment declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Wire {
    pub requirer: ResourceId,
    pub requirement: RequirementId,
    pub provider: ResourceId,
    pub capability: CapabilityId,
}

impl Wire {
    pub fn new(
        requirer: ResourceId,
        requirement: RequirementId,
        provider: ResourceId,
        capability: CapabilityId,
    ) -> Self {
        Self {
            requirer,
            requirement,
            provider,
            capability,
        }
    }
}

/// Resolution result: the new wires of every resource resolved by one call.
pub type WireMap = IndexMap<ResourceId, Vec<Wire>>;

/// Existing resolution state of a resolved resource.
#[derive(Debug, Clone, Default)]
pub struct Wiring {
    /// Capabilities the resource offers after resolution, including those of
    /// attached fragments and excluding exports substituted by imports
    pub capabilities: Vec<CapabilityId>,
    /// All requirements, including open dynamic ones
    pub requirements: Vec<RequirementId>,
    pub wires: Vec<Wire>,
}

/// Existing wirings keyed by resource.
pub type Wirings = HashMap<ResourceId, Wiring>;
