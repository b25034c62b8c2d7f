use std::fmt;

use indexmap::IndexMap;
use wirex_filter::{Filter, FilterError};

use super::capability::Capability;
use super::namespace::{
    BUNDLE, HOST, PACKAGE, RESOLUTION_DIRECTIVE, RESOLUTION_DYNAMIC, RESOLUTION_OPTIONAL,
    VISIBILITY_DIRECTIVE, VISIBILITY_REEXPORT,
};
use super::resource::ResourceId;

/// Arena index of a requirement inside a [`Repository`](crate::Repository).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequirementId(pub(crate) usize);

impl RequirementId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How strictly a requirement must be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Resolution {
    /// Must be wired for the resource to resolve
    #[default]
    Mandatory,
    /// Wired when a provider is available, silently skipped otherwise
    Optional,
    /// Left open at resolve time; wired later through dynamic resolution
    Dynamic,
}

impl Resolution {
    fn from_directive(value: Option<&str>) -> Self {
        match value {
            Some(RESOLUTION_OPTIONAL) => Resolution::Optional,
            Some(RESOLUTION_DYNAMIC) => Resolution::Dynamic,
            _ => Resolution::Mandatory,
        }
    }
}

/// A filtered need declared by a resource.
#[derive(Debug, Clone)]
pub struct Requirement {
    id: RequirementId,
    resource: ResourceId,
    namespace: String,
    directives: IndexMap<String, String>,
    filter: Option<Filter>,
    resolution: Resolution,
}

impl Requirement {
    pub(crate) fn new(id: RequirementId, resource: ResourceId, builder: RequirementBuilder) -> Self {
        let resolution = Resolution::from_directive(
            builder.directives.get(RESOLUTION_DIRECTIVE).map(String::as_str),
        );

        Self {
            id,
            resource,
            namespace: builder.namespace,
            directives: builder.directives,
            filter: builder.filter,
            resolution,
        }
    }

    pub fn id(&self) -> RequirementId {
        self.id
    }

    /// The resource that declares this requirement
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn directives(&self) -> &IndexMap<String, String> {
        &self.directives
    }

    pub fn directive(&self, name: &str) -> Option<&str> {
        self.directives.get(name).map(String::as_str)
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_optional(&self) -> bool {
        self.resolution == Resolution::Optional
    }

    pub fn is_dynamic(&self) -> bool {
        self.resolution == Resolution::Dynamic
    }

    /// Whether the provider's exports are passed on to whoever requires this resource
    pub fn is_reexport(&self) -> bool {
        self.directive(VISIBILITY_DIRECTIVE) == Some(VISIBILITY_REEXPORT)
    }

    /// Whether the capability can satisfy this requirement
    pub fn matches(&self, capability: &Capability) -> bool {
        self.namespace == capability.namespace()
            && self
                .filter
                .as_ref()
                .map_or(true, |filter| filter.matches(capability.attributes()))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filter {
            Some(filter) => write!(f, "{}; {}", self.namespace, filter),
            None => write!(f, "{}", self.namespace),
        }
    }
}

/// Builder for requirements, attached to a resource via
/// [`ResourceBuilder::requirement`](super::ResourceBuilder::requirement).
#[derive(Debug, Clone)]
pub struct RequirementBuilder {
    pub(crate) namespace: String,
    pub(crate) directives: IndexMap<String, String>,
    pub(crate) filter: Option<Filter>,
}

impl RequirementBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            directives: IndexMap::new(),
            filter: None,
        }
    }

    /// A package import
    pub fn package(name: impl Into<String>) -> Self {
        Self::keyed(PACKAGE, name)
    }

    /// A whole-resource requirement on the named resource
    pub fn bundle(name: impl Into<String>) -> Self {
        Self::keyed(BUNDLE, name)
    }

    /// The host requirement that makes a resource a fragment
    pub fn host(name: impl Into<String>) -> Self {
        Self::keyed(HOST, name)
    }

    fn keyed(namespace: &str, key: impl Into<String>) -> Self {
        Self::new(namespace).filter(Filter::equals(namespace, key))
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Parse and set the filter
    pub fn filter_str(self, filter: &str) -> Result<Self, FilterError> {
        Ok(self.filter(Filter::parse(filter)?))
    }

    /// Narrow the current filter with an additional clause
    pub fn and_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(Filter::And(mut filters)) => {
                filters.push(filter);
                Filter::And(filters)
            }
            Some(existing) => Filter::And(vec![existing, filter]),
            None => filter,
        });
        self
    }

    pub fn directive(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.directives.insert(name.into(), value.into());
        self
    }

    pub fn optional(self) -> Self {
        self.directive(RESOLUTION_DIRECTIVE, RESOLUTION_OPTIONAL)
    }

    pub fn dynamic(self) -> Self {
        self.directive(RESOLUTION_DIRECTIVE, RESOLUTION_DYNAMIC)
    }

    pub fn reexport(self) -> Self {
        self.directive(VISIBILITY_DIRECTIVE, VISIBILITY_REEXPORT)
    }
}
