//! Repository description files.
//!
//! ```json
//! {
//!   "resources": [
//!     {
//!       "name": "app",
//!       "version": "1.0.0",
//!       "capabilities": [
//!         { "namespace": "wiring.package", "attributes": { "wiring.package": "app.api", "version": "1.0" } }
//!       ],
//!       "requirements": [
//!         { "namespace": "wiring.package", "filter": "(wiring.package=log)" }
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;
use wirex_filter::{Filter, Value, Version};

use crate::error::ModelError;
use crate::model::namespace::{BUNDLE_VERSION_ATTRIBUTE, VERSION_ATTRIBUTE};
use crate::model::{CapabilityBuilder, RequirementBuilder, ResourceBuilder};
use crate::repository::Repository;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepositoryFile {
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceEntry {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<CapabilityEntry>,
    #[serde(default)]
    pub requirements: Vec<RequirementEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CapabilityEntry {
    pub namespace: String,
    #[serde(default)]
    pub attributes: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub directives: IndexMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequirementEntry {
    pub namespace: String,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub directives: IndexMap<String, String>,
}

impl RepositoryFile {
    /// Load a repository description from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read repository file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse repository file {}", path.display()))
    }

    /// Build the repository, in file order
    pub fn into_repository(self) -> Result<Repository, ModelError> {
        let mut repo = Repository::new();
        for entry in self.resources {
            repo.add(entry.into_builder()?);
        }
        Ok(repo)
    }
}

impl ResourceEntry {
    fn into_builder(self) -> Result<ResourceBuilder, ModelError> {
        let label = format!("{} {}", self.name, self.version);
        let version = Version::parse(&self.version).map_err(|source| ModelError::InvalidVersion {
            resource: label.clone(),
            source,
        })?;

        let mut builder = ResourceBuilder::new(self.name, version);

        for cap in self.capabilities {
            let mut capability = CapabilityBuilder::new(cap.namespace);
            for (name, raw) in cap.attributes {
                let value = convert_attribute(&label, &name, &raw)?;
                capability = capability.attribute(name, value);
            }
            for (name, value) in cap.directives {
                capability = capability.directive(name, value);
            }
            builder = builder.capability(capability);
        }

        for req in self.requirements {
            let mut requirement = RequirementBuilder::new(req.namespace);
            if let Some(filter) = &req.filter {
                let filter = Filter::parse(filter).map_err(|source| ModelError::InvalidFilter {
                    resource: label.clone(),
                    source,
                })?;
                requirement = requirement.filter(filter);
            }
            for (name, value) in req.directives {
                requirement = requirement.directive(name, value);
            }
            builder = builder.requirement(requirement);
        }

        Ok(builder)
    }
}

fn convert_attribute(resource: &str, name: &str, raw: &serde_json::Value) -> Result<Value, ModelError> {
    let unsupported = || ModelError::UnsupportedAttribute {
        resource: resource.to_string(),
        attribute: name.to_string(),
    };

    match raw {
        serde_json::Value::String(s) if name == VERSION_ATTRIBUTE || name == BUNDLE_VERSION_ATTRIBUTE => {
            Version::parse(s)
                .map(Value::Version)
                .map_err(|source| ModelError::InvalidVersion {
                    resource: resource.to_string(),
                    source,
                })
        }
        serde_json::Value::String(s) => Ok(Value::String(s.clone())),
        serde_json::Value::Number(n) => n.as_i64().map(Value::Long).ok_or_else(unsupported),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| convert_attribute(resource, name, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        _ => Err(unsupported()),
    }
}
