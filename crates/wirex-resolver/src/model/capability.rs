use std::fmt;

use indexmap::IndexMap;
use wirex_filter::{Value, Version};

use super::namespace::{PACKAGE, USES_DIRECTIVE, VERSION_ATTRIBUTE};
use super::resource::ResourceId;

/// Arena index of a capability inside a [`Repository`](crate::Repository).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CapabilityId(pub(crate) usize);

impl CapabilityId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named, attributed fact offered by a resource.
#[derive(Debug, Clone)]
pub struct Capability {
    id: CapabilityId,
    resource: ResourceId,
    namespace: String,
    attributes: IndexMap<String, Value>,
    directives: IndexMap<String, String>,
    uses: Vec<String>,
}

impl Capability {
    pub(crate) fn new(id: CapabilityId, resource: ResourceId, builder: CapabilityBuilder) -> Self {
        let uses = builder
            .directives
            .get(USES_DIRECTIVE)
            .map(|uses| parse_uses(uses))
            .unwrap_or_default();

        Self {
            id,
            resource,
            namespace: builder.namespace,
            attributes: builder.attributes,
            directives: builder.directives,
            uses,
        }
    }

    pub fn id(&self) -> CapabilityId {
        self.id
    }

    /// The resource that declares this capability
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn attributes(&self) -> &IndexMap<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn directives(&self) -> &IndexMap<String, String> {
        &self.directives
    }

    pub fn directive(&self, name: &str) -> Option<&str> {
        self.directives.get(name).map(String::as_str)
    }

    /// Package names leaked through this capability (the `uses` directive)
    pub fn uses(&self) -> &[String] {
        &self.uses
    }

    /// The package name, for capabilities in the package namespace
    pub fn package_name(&self) -> Option<&str> {
        if self.namespace == PACKAGE {
            self.attribute(PACKAGE).and_then(Value::as_str)
        } else {
            None
        }
    }

    /// The value of the attribute named after the namespace, if any
    pub fn key(&self) -> Option<&Value> {
        self.attributes.get(&self.namespace)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            Some(key) => write!(f, "{}={}", self.namespace, key)?,
            None => write!(f, "{}", self.namespace)?,
        }
        if let Some(version) = self.attribute(VERSION_ATTRIBUTE) {
            write!(f, "; {}={}", VERSION_ATTRIBUTE, version)?;
        }
        Ok(())
    }
}

fn parse_uses(uses: &str) -> Vec<String> {
    uses.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Builder for capabilities, attached to a resource via
/// [`ResourceBuilder::capability`](super::ResourceBuilder::capability).
#[derive(Debug, Clone)]
pub struct CapabilityBuilder {
    pub(crate) namespace: String,
    pub(crate) attributes: IndexMap<String, Value>,
    pub(crate) directives: IndexMap<String, String>,
}

impl CapabilityBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            attributes: IndexMap::new(),
            directives: IndexMap::new(),
        }
    }

    /// A package export
    pub fn package(name: impl Into<String>) -> Self {
        Self::new(PACKAGE).attribute(PACKAGE, name.into())
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn directive(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.directives.insert(name.into(), value.into());
        self
    }

    pub fn version(self, version: Version) -> Self {
        self.attribute(VERSION_ATTRIBUTE, version)
    }

    /// Declare the packages leaked through this capability
    pub fn uses(self, packages: &[&str]) -> Self {
        self.directive(USES_DIRECTIVE, packages.join(","))
    }
}
