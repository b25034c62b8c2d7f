//! Module dependency resolution.
//!
//! Resources offer capabilities and declare requirements on the capabilities
//! of others. The [`Resolver`] picks a provider for every requirement so that
//! the resulting wiring is satisfiable and consistent under `uses`
//! constraints, backtracking over alternative providers when it is not.

mod config;
mod environment;
mod error;
mod json;
pub mod model;
mod policy;
mod repository;
mod resolver;

pub use config::ResolverConfig;
pub use environment::{Environment, RepositoryEnvironment};
pub use error::{ConflictKind, ModelError, ResolutionError, UsesConflict};
pub use json::{CapabilityEntry, RepositoryFile, RequirementEntry, ResourceEntry};
pub use model::{
    Capability, CapabilityBuilder, CapabilityId, Requirement, RequirementBuilder, RequirementId,
    Resolution, Resource, ResourceBuilder, ResourceId, Wire, WireMap, Wiring, Wirings,
};
pub use policy::Policy;
pub use repository::Repository;
pub use resolver::Resolver;
