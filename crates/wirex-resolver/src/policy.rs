use std::cmp::Ordering;

use wirex_filter::Version;

use crate::model::namespace::{BUNDLE_VERSION_ATTRIBUTE, VERSION_ATTRIBUTE};
use crate::model::{CapabilityId, Wirings};
use crate::repository::Repository;

/// Policy for ordering the providers of a requirement.
///
/// When multiple capabilities can satisfy a requirement, the policy
/// determines which one the resolver tries first.
#[derive(Debug, Clone)]
pub struct Policy {
    /// Prefer capabilities of already resolved resources
    pub prefer_resolved: bool,
    /// Prefer lowest versions (for testing)
    pub prefer_lowest: bool,
}

impl Policy {
    /// Create a new policy with default settings
    pub fn new() -> Self {
        Self {
            prefer_resolved: true,
            prefer_lowest: false,
        }
    }

    /// Set preference for already resolved providers
    pub fn prefer_resolved(mut self, prefer: bool) -> Self {
        self.prefer_resolved = prefer;
        self
    }

    /// Set preference for lowest versions
    pub fn prefer_lowest(mut self, prefer: bool) -> Self {
        self.prefer_lowest = prefer;
        self
    }

    /// Sort candidate capabilities by preference (best first).
    ///
    /// The sort is stable, so candidates that compare equal keep their
    /// declaration order.
    pub fn sort_providers(
        &self,
        repository: &Repository,
        wirings: &Wirings,
        candidates: &[CapabilityId],
    ) -> Vec<CapabilityId> {
        let mut sorted = candidates.to_vec();

        sorted.sort_by(|&a, &b| {
            if self.prefer_resolved {
                let resolved_a = wirings.contains_key(&repository.capability(a).resource());
                let resolved_b = wirings.contains_key(&repository.capability(b).resource());
                // true sorts before false
                let resolved_cmp = resolved_b.cmp(&resolved_a);
                if resolved_cmp != Ordering::Equal {
                    return resolved_cmp;
                }
            }

            let version_cmp = capability_version(repository, a).cmp(capability_version(repository, b));
            if self.prefer_lowest {
                version_cmp
            } else {
                version_cmp.reverse()
            }
        });

        sorted
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new()
    }
}

/// The version a capability advertises, falling back to its resource's version
fn capability_version(repository: &Repository, id: CapabilityId) -> &Version {
    let capability = repository.capability(id);
    capability
        .attribute(VERSION_ATTRIBUTE)
        .or_else(|| capability.attribute(BUNDLE_VERSION_ATTRIBUTE))
        .and_then(|v| v.as_version())
        .unwrap_or_else(|| repository.resource(capability.resource()).version())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CapabilityBuilder, ResourceBuilder, ResourceId, Wiring};

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn setup() -> (Repository, Vec<CapabilityId>) {
        let mut repo = Repository::new();
        let mut caps = Vec::new();
        for (name, version) in [("old", "1.0"), ("new", "2.0"), ("mid", "1.5")] {
            let id = repo.add(
                ResourceBuilder::new(name, v("1.0"))
                    .capability(CapabilityBuilder::package("foo").version(v(version))),
            );
            caps.push(*repo.resource(id).capabilities().last().unwrap());
        }
        (repo, caps)
    }

    fn owners(repo: &Repository, caps: &[CapabilityId]) -> Vec<String> {
        caps.iter()
            .map(|&c| repo.resource(repo.capability(c).resource()).name().to_string())
            .collect()
    }

    #[test]
    fn test_policy_defaults() {
        let policy = Policy::new();
        assert!(policy.prefer_resolved);
        assert!(!policy.prefer_lowest);
    }

    #[test]
    fn test_sort_highest_version_first() {
        let (repo, caps) = setup();
        let sorted = Policy::new().sort_providers(&repo, &Wirings::new(), &caps);
        assert_eq!(owners(&repo, &sorted), vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_sort_prefer_lowest() {
        let (repo, caps) = setup();
        let sorted = Policy::new().prefer_lowest(true).sort_providers(&repo, &Wirings::new(), &caps);
        assert_eq!(owners(&repo, &sorted), vec!["old", "mid", "new"]);
    }

    #[test]
    fn test_sort_resolved_first() {
        let (repo, caps) = setup();
        let mut wirings = Wirings::new();
        wirings.insert(ResourceId(0), Wiring::default());

        let sorted = Policy::new().sort_providers(&repo, &wirings, &caps);
        assert_eq!(owners(&repo, &sorted), vec!["old", "new", "mid"]);

        let sorted = Policy::new().prefer_resolved(false).sort_providers(&repo, &wirings, &caps);
        assert_eq!(owners(&repo, &sorted), vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_sort_falls_back_to_resource_version() {
        let mut repo = Repository::new();
        let a = repo.add(ResourceBuilder::new("a", v("1.0")).export_package("foo"));
        let b = repo.add(ResourceBuilder::new("b", v("3.0")).export_package("foo"));
        let caps = vec![
            *repo.resource(a).capabilities().last().unwrap(),
            *repo.resource(b).capabilities().last().unwrap(),
        ];

        let sorted = Policy::new().sort_providers(&repo, &Wirings::new(), &caps);
        assert_eq!(owners(&repo, &sorted), vec!["b", "a"]);
    }
}
