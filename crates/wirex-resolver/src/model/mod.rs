//! Resolution model: resources, the capabilities they offer, the
//! requirements they declare, and the wires that connect them.

mod capability;
pub mod namespace;
mod requirement;
mod resource;
mod wire;

pub use capability::{Capability, CapabilityBuilder, CapabilityId};
pub use requirement::{Requirement, RequirementBuilder, RequirementId, Resolution};
pub use resource::{Resource, ResourceBuilder, ResourceId};
pub use wire::{Wire, WireMap, Wiring, Wirings};
