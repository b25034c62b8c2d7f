//! Resolver scenarios: satisfiability, uses constraints, backtracking,
//! fragments and dynamic requirements.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use wirex_filter::{Filter, Version};

use super::*;
use crate::environment::RepositoryEnvironment;
use crate::error::ConflictKind;
use crate::model::namespace::{BUNDLE, HOST};
use crate::model::{CapabilityBuilder, RequirementBuilder, ResourceBuilder, Wire};
use crate::repository::Repository;

fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

/// The capability of a resource exporting the named package
fn package(repo: &Repository, resource: ResourceId, name: &str) -> CapabilityId {
    *repo
        .resource(resource)
        .capabilities()
        .iter()
        .find(|&&c| repo.capability(c).package_name() == Some(name))
        .unwrap()
}

/// The first capability of a resource in the given namespace
fn capability_in(repo: &Repository, resource: ResourceId, namespace: &str) -> CapabilityId {
    *repo
        .resource(resource)
        .capabilities()
        .iter()
        .find(|&&c| repo.capability(c).namespace() == namespace)
        .unwrap()
}

fn req(repo: &Repository, resource: ResourceId, idx: usize) -> RequirementId {
    repo.resource(resource).requirements()[idx]
}

/// Provider of the wire a resource got for one of its requirements
fn provider_of(wires: &WireMap, resource: ResourceId, requirement: RequirementId) -> Option<ResourceId> {
    wires
        .get(&resource)?
        .iter()
        .find(|w| w.requirement == requirement)
        .map(|w| w.provider)
}

/// Recompute the package spaces of an accepted permutation and check that
/// every package a node sees through uses agrees with what it exports and
/// imports
fn assert_consistent(env: &RepositoryEnvironment, candidates: &Candidates, roots: &[Node]) {
    let ctx = Context::new(env);
    let mut attempt = Attempt::new(ctx, candidates);
    let mut uses_cycles = HashMap::new();
    let mut visited = HashSet::new();
    for &root in roots {
        attempt.calculate_package_spaces(root, &mut uses_cycles, &mut visited);
    }

    let nodes: Vec<Node> = attempt.spaces.keys().copied().collect();
    for node in nodes {
        let packages = attempt.spaces[&node].clone();
        for (name, used) in &packages.used {
            let sources: Vec<_> = packages
                .exported
                .get(name)
                .into_iter()
                .chain(packages.imported.get(name).into_iter().flatten())
                .map(|blame| blame.cap)
                .collect();
            for source in sources {
                for blame in used {
                    assert!(
                        attempt.is_compatible(source, blame.cap),
                        "{} sees two sources for package {}",
                        ctx.describe(node),
                        name
                    );
                }
            }
        }
    }
}

/// Resolve mandatory roots and check the accepted permutation before wiring it
fn resolve_checked(resolver: &Resolver, env: &RepositoryEnvironment, mandatory: &[ResourceId]) -> WireMap {
    let (candidates, roots) = resolver.run(env, mandatory, &[], &[]).unwrap();
    assert_consistent(env, &candidates, &roots);
    wire_map(&Context::new(env), &candidates, &roots)
}

/// A imports foo and bar. b1 offers a newer foo; b2 offers bar, which uses
/// foo, and its own older foo.
fn split_foo_repository() -> (Repository, ResourceId, ResourceId, ResourceId) {
    let mut repo = Repository::new();
    let a = repo.add(
        ResourceBuilder::new("a", v("1.0"))
            .import_package("foo")
            .import_package("bar"),
    );
    let b1 = repo.add(
        ResourceBuilder::new("b1", v("1.0")).capability(CapabilityBuilder::package("foo").version(v("2.0"))),
    );
    let b2 = repo.add(
        ResourceBuilder::new("b2", v("1.0"))
            .capability(CapabilityBuilder::package("foo").version(v("1.0")))
            .export_package_uses("bar", &["foo"]),
    );
    (repo, a, b1, b2)
}

// ============================================================================
// Basic Resolution Tests
// ============================================================================

#[test]
fn test_resolve_single_import() {
    let mut repo = Repository::new();
    let a = repo.add(ResourceBuilder::new("a", v("1.0")).import_package("foo"));
    let b = repo.add(ResourceBuilder::new("b", v("1.0")).export_package("foo"));
    let a_foo = req(&repo, a, 0);
    let b_foo = package(&repo, b, "foo");
    let env = RepositoryEnvironment::new(repo);

    let wires = Resolver::new().resolve(&env, &[a], &[]).unwrap();

    assert_eq!(wires.keys().copied().collect::<Vec<_>>(), vec![a, b]);
    assert_eq!(wires[&a], vec![Wire::new(a, a_foo, b, b_foo)]);
    assert!(wires[&b].is_empty());
}

#[test]
fn test_resolve_prefers_highest_version() {
    let mut repo = Repository::new();
    let a = repo.add(ResourceBuilder::new("a", v("1.0")).import_package("foo"));
    repo.add(ResourceBuilder::new("old", v("1.0")).export_package("foo"));
    let new = repo.add(ResourceBuilder::new("new", v("2.0")).export_package("foo"));
    let a_foo = req(&repo, a, 0);
    let env = RepositoryEnvironment::new(repo);

    let wires = Resolver::new().resolve(&env, &[a], &[]).unwrap();
    assert_eq!(provider_of(&wires, a, a_foo), Some(new));
    assert_eq!(wires.len(), 2);
}

#[test]
fn test_missing_mandatory_requirement_fails() {
    let mut repo = Repository::new();
    let a = repo.add(ResourceBuilder::new("a", v("1.0")).import_package("missing"));
    let a_missing = req(&repo, a, 0);
    let env = RepositoryEnvironment::new(repo);

    match Resolver::new().resolve(&env, &[a], &[]) {
        Err(ResolutionError::UnresolvedRequirement {
            resource,
            requirement_id,
            cause,
            ..
        }) => {
            assert_eq!(resource, "a 1.0.0");
            assert_eq!(requirement_id, a_missing);
            assert!(cause.is_none());
        }
        other => panic!("expected unresolved requirement, got {:?}", other),
    }
}

#[test]
fn test_optional_requirement_without_provider_gets_no_wire() {
    let mut repo = Repository::new();
    let a = repo.add(
        ResourceBuilder::new("a", v("1.0"))
            .optional_import("missing")
            .import_package("foo"),
    );
    let b = repo.add(ResourceBuilder::new("b", v("1.0")).export_package("foo"));
    let env = RepositoryEnvironment::new(repo);

    let wires = Resolver::new().resolve(&env, &[a], &[]).unwrap();
    assert_eq!(wires[&a].len(), 1);
    assert_eq!(wires[&a][0].provider, b);
}

#[test]
fn test_self_satisfied_import_gets_no_wire() {
    let mut repo = Repository::new();
    let a = repo.add(
        ResourceBuilder::new("a", v("1.0"))
            .export_package("foo")
            .import_package("foo"),
    );
    let env = RepositoryEnvironment::new(repo);

    let wires = Resolver::new().resolve(&env, &[a], &[]).unwrap();
    assert_eq!(wires.len(), 1);
    assert!(wires[&a].is_empty());
}

#[test]
fn test_wires_are_grouped_by_namespace() {
    let mut repo = Repository::new();
    let a = repo.add(
        ResourceBuilder::new("a", v("1.0"))
            .requirement(RequirementBuilder::new("service").filter(Filter::equals("service", "log")))
            .require_bundle("b")
            .import_package("foo"),
    );
    let b = repo.add(ResourceBuilder::new("b", v("1.0")).export_package("foo"));
    let s = repo.add(
        ResourceBuilder::new("s", v("1.0")).capability(CapabilityBuilder::new("service").attribute("service", "log")),
    );
    let env = RepositoryEnvironment::new(repo);

    let wires = Resolver::new().resolve(&env, &[a], &[]).unwrap();
    let providers: Vec<ResourceId> = wires[&a].iter().map(|w| w.provider).collect();
    assert_eq!(providers, vec![b, b, s]);
    assert_eq!(env.repository().requirement(wires[&a][1].requirement).namespace(), BUNDLE);
}

#[test]
fn test_resolve_is_idempotent() {
    let (repo, a, _, _) = split_foo_repository();
    let env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::new();

    let first = resolver.resolve(&env, &[a], &[]).unwrap();
    let second = resolver.resolve(&env, &[a], &[]).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        first.keys().collect::<Vec<_>>(),
        second.keys().collect::<Vec<_>>()
    );
}

#[test]
fn test_resolved_resources_are_not_resolved_again() {
    let mut repo = Repository::new();
    let a = repo.add(ResourceBuilder::new("a", v("1.0")).import_package("foo"));
    repo.add(ResourceBuilder::new("b", v("1.0")).export_package("foo"));
    let mut env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::new();

    let wires = resolver.resolve(&env, &[a], &[]).unwrap();
    env.commit(&wires);

    assert!(resolver.resolve(&env, &[a], &[]).unwrap().is_empty());
}

#[test]
fn test_resolver_is_shareable_across_threads() {
    let (repo, a, _, b2) = split_foo_repository();
    let a_foo = req(&repo, a, 0);
    let env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::new();

    let results: Vec<WireMap> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| resolver.resolve(&env, &[a], &[]).unwrap()))
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    for wires in &results {
        assert_eq!(provider_of(wires, a, a_foo), Some(b2));
        assert_eq!(wires, &results[0]);
    }
}

// ============================================================================
// Uses Constraint Tests
// ============================================================================

#[test]
fn test_backtracks_to_consistent_provider() {
    let (repo, a, b1, b2) = split_foo_repository();
    let a_foo = req(&repo, a, 0);
    let a_bar = req(&repo, a, 1);
    let env = RepositoryEnvironment::new(repo);

    let wires = resolve_checked(&Resolver::new(), &env, &[a]);

    assert_eq!(provider_of(&wires, a, a_foo), Some(b2));
    assert_eq!(provider_of(&wires, a, a_bar), Some(b2));
    assert!(!wires.contains_key(&b1));
}

#[test]
fn test_import_conflict_without_alternative() {
    let (mut repo, _, _, _) = split_foo_repository();
    let c = repo.add(
        ResourceBuilder::new("c", v("1.0"))
            .requirement(RequirementBuilder::package("foo").and_filter(Filter::parse("(version>=1.5)").unwrap()))
            .import_package("bar"),
    );
    let c_bar = req(&repo, c, 1);
    let env = RepositoryEnvironment::new(repo);

    match Resolver::new().resolve(&env, &[c], &[]) {
        Err(ResolutionError::UsesConflict(conflict)) => {
            assert_eq!(conflict.resource, c);
            assert_eq!(conflict.package, "foo");
            assert_eq!(conflict.kind, ConflictKind::ImportConflict);
            assert_eq!(conflict.requirement, Some(c_bar));
            assert_eq!(conflict.chains.len(), 2);
            assert!(conflict.message.contains("exposed to package 'foo'"));
            assert!(conflict.message.contains("b1 1.0.0"));
            assert!(conflict.message.contains("b2 1.0.0"));
            assert!(conflict.chains[1].contains("uses:=foo"));
        }
        other => panic!("expected uses conflict, got {:?}", other),
    }
}

#[test]
fn test_export_conflict() {
    let mut repo = Repository::new();
    let a = repo.add(
        ResourceBuilder::new("a", v("1.0"))
            .export_package("foo")
            .import_package("bar"),
    );
    repo.add(
        ResourceBuilder::new("b", v("1.0"))
            .export_package("foo")
            .export_package_uses("bar", &["foo"]),
    );
    let env = RepositoryEnvironment::new(repo);

    match Resolver::new().resolve(&env, &[a], &[]) {
        Err(ResolutionError::UsesConflict(conflict)) => {
            assert_eq!(conflict.kind, ConflictKind::ExportConflict);
            assert_eq!(conflict.resource, a);
            assert_eq!(conflict.chains.len(), 1);
            assert!(conflict.message.contains("because it exports package 'foo'"));
            assert!(conflict.message.contains("from b 1.0.0"));
        }
        other => panic!("expected uses conflict, got {:?}", other),
    }
}

#[test]
fn test_transitive_uses_constraint() {
    let mut repo = Repository::new();
    let a = repo.add(
        ResourceBuilder::new("a", v("1.0"))
            .import_package("web")
            .import_package("http"),
    );
    repo.add(
        ResourceBuilder::new("web", v("1.0"))
            .export_package_uses("web", &["http"])
            .requirement(RequirementBuilder::package("http").and_filter(Filter::parse("(version<=1.5)").unwrap())),
    );
    repo.add(
        ResourceBuilder::new("http-new", v("1.0")).capability(CapabilityBuilder::package("http").version(v("2.0"))),
    );
    let old = repo.add(
        ResourceBuilder::new("http-old", v("1.0")).capability(CapabilityBuilder::package("http").version(v("1.0"))),
    );
    let a_http = req(&repo, a, 1);
    let env = RepositoryEnvironment::new(repo);

    let wires = resolve_checked(&Resolver::new(), &env, &[a]);
    assert_eq!(provider_of(&wires, a, a_http), Some(old));
}

#[test]
fn test_compatible_uses_need_no_backtracking() {
    let mut repo = Repository::new();
    let a = repo.add(
        ResourceBuilder::new("a", v("1.0"))
            .import_package("foo")
            .import_package("bar"),
    );
    let b = repo.add(
        ResourceBuilder::new("b", v("1.0"))
            .export_package("foo")
            .export_package_uses("bar", &["foo"]),
    );
    let env = RepositoryEnvironment::new(repo);

    let resolver = Resolver::with_config(ResolverConfig::new().max_attempts(1));
    let wires = resolve_checked(&resolver, &env, &[a]);
    assert!(wires[&a].iter().all(|w| w.provider == b));
}

// ============================================================================
// Search Budget Tests
// ============================================================================

#[test]
fn test_attempt_limit_exhausts_search() {
    let (repo, a, _, _) = split_foo_repository();
    let env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::with_config(ResolverConfig::new().max_attempts(1));

    match resolver.resolve(&env, &[a], &[]) {
        Err(ResolutionError::SearchExhausted { attempts, last }) => {
            assert_eq!(attempts, 1);
            assert!(matches!(last.as_deref(), Some(ResolutionError::UsesConflict(_))));
        }
        other => panic!("expected exhausted search, got {:?}", other),
    }
}

#[test]
fn test_zero_time_budget_exhausts_search() {
    let (repo, a, _, _) = split_foo_repository();
    let env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::with_config(ResolverConfig::new().time_budget(Duration::ZERO));

    assert!(matches!(
        resolver.resolve(&env, &[a], &[]),
        Err(ResolutionError::SearchExhausted { attempts: 0, .. })
    ));
}

// ============================================================================
// Optional Resource Tests
// ============================================================================

#[test]
fn test_unresolvable_optional_resource_is_left_out() {
    let mut repo = Repository::new();
    let x = repo.add(ResourceBuilder::new("x", v("1.0")));
    let o = repo.add(ResourceBuilder::new("o", v("1.0")).import_package("missing"));
    let env = RepositoryEnvironment::new(repo);

    let wires = Resolver::new().resolve(&env, &[x], &[o]).unwrap();
    assert!(wires.contains_key(&x));
    assert!(!wires.contains_key(&o));
}

#[test]
fn test_conflicting_optional_resource_is_dropped() {
    let (mut repo, _, b1, b2) = split_foo_repository();
    let x = repo.add(ResourceBuilder::new("x", v("1.0")));
    let c = repo.add(
        ResourceBuilder::new("c", v("1.0"))
            .requirement(RequirementBuilder::package("foo").and_filter(Filter::parse("(version>=1.5)").unwrap()))
            .import_package("bar"),
    );
    let env = RepositoryEnvironment::new(repo);

    let wires = Resolver::new().resolve(&env, &[x], &[c]).unwrap();
    assert_eq!(wires.keys().copied().collect::<Vec<_>>(), vec![x]);
    assert!(!wires.contains_key(&b1) && !wires.contains_key(&b2));
}

#[test]
fn test_satisfiable_optional_resource_leaves_others_unchanged() {
    let (mut repo, a, _, _) = split_foo_repository();
    let x = repo.add(ResourceBuilder::new("x", v("1.0")).import_package("qux"));
    let q = repo.add(ResourceBuilder::new("q", v("1.0")).export_package("qux"));
    let env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::new();

    let alone = resolver.resolve(&env, &[a], &[]).unwrap();
    let with_optional = resolver.resolve(&env, &[a], &[x]).unwrap();

    for (resource, wires) in &alone {
        assert_eq!(&with_optional[resource], wires);
    }
    assert_eq!(with_optional.len(), alone.len() + 2);
    assert_eq!(with_optional[&x][0].provider, q);
}

#[test]
fn test_optional_failures_cascade_to_dependents() {
    let mut repo = Repository::new();
    let a = repo.add(ResourceBuilder::new("a", v("1.0")).import_package("c.api"));
    let c = repo.add(
        ResourceBuilder::new("c", v("1.0"))
            .export_package("c.api")
            .import_package("missing"),
    );
    let d = repo.add(ResourceBuilder::new("d", v("1.0")).import_package("c.api"));
    let x = repo.add(ResourceBuilder::new("x", v("1.0")));
    let env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::new();

    let wires = resolver.resolve(&env, &[x], &[c, d]).unwrap();
    assert_eq!(wires.keys().copied().collect::<Vec<_>>(), vec![x]);

    match resolver.resolve(&env, &[a], &[c, d]) {
        Err(ResolutionError::UnresolvedRequirement { resource, cause, .. }) => {
            assert_eq!(resource, "a 1.0.0");
            let cause = cause.expect("failure of c is reported as the cause");
            assert!(cause.to_string().contains("c 1.0.0"));
        }
        other => panic!("expected unresolved requirement, got {:?}", other),
    }
}

// ============================================================================
// Bundle Requirement Tests
// ============================================================================

#[test]
fn test_reexported_bundle_is_wired() {
    let mut repo = Repository::new();
    let a = repo.add(ResourceBuilder::new("a", v("1.0")).require_bundle("b"));
    let b = repo.add(
        ResourceBuilder::new("b", v("1.0"))
            .export_package("one")
            .reexport_bundle("c"),
    );
    let c = repo.add(ResourceBuilder::new("c", v("1.0")).export_package("two"));
    let b_bundle = capability_in(&repo, b, BUNDLE);
    let c_bundle = capability_in(&repo, c, BUNDLE);
    let a_b = req(&repo, a, 0);
    let b_c = req(&repo, b, 0);
    let env = RepositoryEnvironment::new(repo);

    let wires = resolve_checked(&Resolver::new(), &env, &[a]);
    assert_eq!(wires[&a], vec![Wire::new(a, a_b, b, b_bundle)]);
    assert_eq!(wires[&b], vec![Wire::new(b, b_c, c, c_bundle)]);
    assert!(wires[&c].is_empty());
}

// ============================================================================
// Fragment Tests
// ============================================================================

#[test]
fn test_fragment_exports_through_host() {
    let mut repo = Repository::new();
    let app = repo.add(ResourceBuilder::new("app", v("1.0")).import_package("extra"));
    let host = repo.add(ResourceBuilder::new("host", v("1.0")));
    let frag = repo.add(
        ResourceBuilder::new("frag", v("1.0"))
            .fragment_of("host")
            .export_package("extra")
            .import_package("dep"),
    );
    let dep = repo.add(ResourceBuilder::new("dep", v("1.0")).export_package("dep"));
    let app_extra = req(&repo, app, 0);
    let frag_host = req(&repo, frag, 0);
    let frag_dep = req(&repo, frag, 1);
    let extra = package(&repo, frag, "extra");
    let dep_cap = package(&repo, dep, "dep");
    let host_cap = capability_in(&repo, host, HOST);
    let env = RepositoryEnvironment::new(repo);

    let wires = resolve_checked(&Resolver::new(), &env, &[app]);

    assert_eq!(wires[&app], vec![Wire::new(app, app_extra, host, extra)]);
    // Fragment requirements are wired from the host
    assert_eq!(wires[&host], vec![Wire::new(host, frag_dep, dep, dep_cap)]);
    assert_eq!(wires[&frag], vec![Wire::new(frag, frag_host, host, host_cap)]);
    assert!(wires[&dep].is_empty());
}

#[test]
fn test_newest_fragment_is_attached() {
    let mut repo = Repository::new();
    let app = repo.add(ResourceBuilder::new("app", v("1.0")).import_package("extra"));
    repo.add(ResourceBuilder::new("host", v("1.0")));
    let old = repo.add(ResourceBuilder::new("frag", v("1.0")).fragment_of("host").export_package("extra"));
    let new = repo.add(ResourceBuilder::new("frag", v("2.0")).fragment_of("host").export_package("extra"));
    let new_extra = package(&repo, new, "extra");
    let env = RepositoryEnvironment::new(repo);

    let wires = Resolver::new().resolve(&env, &[app], &[]).unwrap();
    assert_eq!(wires[&app][0].capability, new_extra);
    assert!(wires.contains_key(&new));
    assert!(!wires.contains_key(&old));
}

#[test]
fn test_mandatory_fragment_resolves_with_host() {
    let mut repo = Repository::new();
    let host = repo.add(ResourceBuilder::new("host", v("1.0")));
    let frag = repo.add(ResourceBuilder::new("frag", v("1.0")).fragment_of("host"));
    let host_cap = capability_in(&repo, host, HOST);
    let frag_host = req(&repo, frag, 0);
    let env = RepositoryEnvironment::new(repo);

    let wires = Resolver::new().resolve(&env, &[frag], &[]).unwrap();
    assert!(wires[&host].is_empty());
    assert_eq!(wires[&frag], vec![Wire::new(frag, frag_host, host, host_cap)]);
}

#[test]
fn test_on_demand_fragment_follows_its_host() {
    let mut repo = Repository::new();
    let host = repo.add(ResourceBuilder::new("host", v("1.0")));
    let other = repo.add(ResourceBuilder::new("other", v("1.0")));
    let frag = repo.add(ResourceBuilder::new("frag", v("1.0")).fragment_of("host"));
    let env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::new();

    let wires = resolver.resolve_with_attachments(&env, &[host], &[], &[frag]).unwrap();
    assert_eq!(wires[&frag].len(), 1);
    assert_eq!(wires[&frag][0].provider, host);

    let wires = resolver.resolve_with_attachments(&env, &[other], &[], &[frag]).unwrap();
    assert!(!wires.contains_key(&frag));
    assert!(!wires.contains_key(&host));
}

#[test]
fn test_resolved_host_takes_no_new_fragment() {
    let mut repo = Repository::new();
    let host = repo.add(ResourceBuilder::new("host", v("1.0")));
    let frag = repo.add(ResourceBuilder::new("frag", v("1.0")).fragment_of("host"));
    let mut env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::new();

    let wires = resolver.resolve(&env, &[host], &[]).unwrap();
    env.commit(&wires);

    let wires = resolver.resolve_with_attachments(&env, &[], &[], &[frag]).unwrap();
    assert!(!wires.contains_key(&frag));
    assert!(resolver.resolve(&env, &[frag], &[]).is_err());
}

/// A host with two fragments importing foo from disjoint version ranges
fn split_fragment_repository() -> (Repository, ResourceId, ResourceId, ResourceId) {
    let mut repo = Repository::new();
    let host = repo.add(ResourceBuilder::new("host", v("1.0")));
    let low = repo.add(
        ResourceBuilder::new("low", v("1.0"))
            .fragment_of("host")
            .requirement(RequirementBuilder::package("foo").and_filter(Filter::parse("(version<=1.0)").unwrap())),
    );
    let high = repo.add(
        ResourceBuilder::new("high", v("1.0"))
            .fragment_of("host")
            .requirement(RequirementBuilder::package("foo").and_filter(Filter::parse("(version>=2.0)").unwrap())),
    );
    repo.add(ResourceBuilder::new("foo-1", v("1.0")).capability(CapabilityBuilder::package("foo").version(v("1.0"))));
    repo.add(ResourceBuilder::new("foo-2", v("1.0")).capability(CapabilityBuilder::package("foo").version(v("2.0"))));
    (repo, host, low, high)
}

#[test]
fn test_fragments_importing_one_package_from_two_providers_conflict() {
    let (repo, host, low, high) = split_fragment_repository();
    let low_foo = req(&repo, low, 1);
    let high_foo = req(&repo, high, 1);
    let env = RepositoryEnvironment::new(repo);

    match Resolver::new().resolve(&env, &[host, low, high], &[]) {
        Err(ResolutionError::UsesConflict(conflict)) => {
            assert_eq!(conflict.kind, ConflictKind::AmbiguousImport);
            assert_eq!(conflict.resource, host);
            assert_eq!(conflict.package, "foo");
            assert_eq!(conflict.chains.len(), 2);
            assert!(matches!(conflict.requirement, Some(r) if r == low_foo || r == high_foo));
            assert!(conflict.message.contains("foo-1 1.0.0"));
            assert!(conflict.message.contains("foo-2 1.0.0"));
        }
        other => panic!("expected uses conflict, got {:?}", other),
    }
}

#[test]
fn test_ambiguous_optional_fragment_is_dropped() {
    let (repo, host, low, high) = split_fragment_repository();
    let env = RepositoryEnvironment::new(repo);

    let wires = Resolver::new().resolve(&env, &[host], &[low, high]).unwrap();
    assert_ne!(wires.contains_key(&low), wires.contains_key(&high));
    assert_eq!(wires[&host].len(), 1);
}

// ============================================================================
// Dynamic Requirement Tests
// ============================================================================

#[test]
fn test_resolve_dynamic_after_commit() {
    let mut repo = Repository::new();
    let a = repo.add(ResourceBuilder::new("a", v("1.0")).dynamic_import("ext"));
    let e = repo.add(ResourceBuilder::new("e", v("1.0")).export_package("ext"));
    let a_ext = req(&repo, a, 0);
    let ext = package(&repo, e, "ext");
    let mut env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::new();

    let wires = resolver.resolve(&env, &[a], &[]).unwrap();
    assert!(wires[&a].is_empty());
    assert!(!wires.contains_key(&e));
    env.commit(&wires);

    let providers = env.find_providers(env.repository().requirement(a_ext));
    let wires = resolver.resolve_dynamic(&env, a, a_ext, &providers, &[]).unwrap();
    assert_eq!(wires[&a], vec![Wire::new(a, a_ext, e, ext)]);
    assert!(wires[&e].is_empty());
}

#[test]
fn test_dynamic_wire_to_self_is_kept() {
    let mut repo = Repository::new();
    let a = repo.add(
        ResourceBuilder::new("a", v("1.0"))
            .export_package("foo")
            .dynamic_import("foo"),
    );
    let a_dyn = req(&repo, a, 0);
    let foo = package(&repo, a, "foo");
    let mut env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::new();

    let wires = resolver.resolve(&env, &[a], &[]).unwrap();
    env.commit(&wires);

    let wires = resolver.resolve_dynamic(&env, a, a_dyn, &[foo], &[]).unwrap();
    assert_eq!(wires.len(), 1);
    assert_eq!(wires[&a], vec![Wire::new(a, a_dyn, a, foo)]);
}

#[test]
fn test_resolve_dynamic_requires_resolved_resource() {
    let mut repo = Repository::new();
    let a = repo.add(ResourceBuilder::new("a", v("1.0")).dynamic_import("ext"));
    let e = repo.add(ResourceBuilder::new("e", v("1.0")).export_package("ext"));
    let a_ext = req(&repo, a, 0);
    let ext = package(&repo, e, "ext");
    let env = RepositoryEnvironment::new(repo);

    match Resolver::new().resolve_dynamic(&env, a, a_ext, &[ext], &[]) {
        Err(ResolutionError::NotResolved { resource }) => assert_eq!(resource, "a 1.0.0"),
        other => panic!("expected not resolved, got {:?}", other),
    }
}

#[test]
fn test_resolve_dynamic_without_candidates_fails() {
    let mut repo = Repository::new();
    let a = repo.add(ResourceBuilder::new("a", v("1.0")).dynamic_import("ext"));
    let a_ext = req(&repo, a, 0);
    let mut env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::new();

    let wires = resolver.resolve(&env, &[a], &[]).unwrap();
    env.commit(&wires);

    match resolver.resolve_dynamic(&env, a, a_ext, &[], &[]) {
        Err(ResolutionError::DynamicImportFailed { requirement_id, .. }) => assert_eq!(requirement_id, a_ext),
        other => panic!("expected failed dynamic import, got {:?}", other),
    }
}

#[test]
fn test_dynamic_wires_accumulate_across_commits() {
    let mut repo = Repository::new();
    let a = repo.add(
        ResourceBuilder::new("a", v("1.0"))
            .import_package("log")
            .dynamic_import("ext"),
    );
    let l = repo.add(ResourceBuilder::new("l", v("1.0")).export_package("log"));
    let e = repo.add(ResourceBuilder::new("e", v("1.0")).export_package("ext"));
    let a_log = req(&repo, a, 0);
    let a_ext = req(&repo, a, 1);
    let log = package(&repo, l, "log");
    let ext = package(&repo, e, "ext");
    let mut env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::new();

    let wires = resolver.resolve(&env, &[a], &[]).unwrap();
    env.commit(&wires);
    let wires = resolver.resolve_dynamic(&env, a, a_ext, &[ext], &[]).unwrap();
    env.commit(&wires);

    assert_eq!(
        env.wirings()[&a].wires,
        vec![Wire::new(a, a_log, l, log), Wire::new(a, a_ext, e, ext)]
    );
}

#[test]
fn test_dynamic_import_conflicting_with_earlier_dynamic_wire() {
    let (mut repo, _, b1, b2) = split_foo_repository();
    let a = repo.add(
        ResourceBuilder::new("dyn", v("1.0"))
            .dynamic_import("foo")
            .dynamic_import("baz")
            .dynamic_import("bar"),
    );
    let e = repo.add(ResourceBuilder::new("e", v("1.0")).export_package("baz"));
    let a_foo = req(&repo, a, 0);
    let a_baz = req(&repo, a, 1);
    let a_bar = req(&repo, a, 2);
    let baz = package(&repo, e, "baz");
    let bar = package(&repo, b2, "bar");
    let mut env = RepositoryEnvironment::new(repo);
    let resolver = Resolver::new();

    let wires = resolver.resolve(&env, &[a], &[]).unwrap();
    env.commit(&wires);

    let providers = env.find_providers(env.repository().requirement(a_foo));
    let wires = resolver.resolve_dynamic(&env, a, a_foo, &providers, &[]).unwrap();
    assert_eq!(provider_of(&wires, a, a_foo), Some(b1));
    env.commit(&wires);

    // An unrelated dynamic wire in between must not hide the foo import
    let wires = resolver.resolve_dynamic(&env, a, a_baz, &[baz], &[]).unwrap();
    env.commit(&wires);

    match resolver.resolve_dynamic(&env, a, a_bar, &[bar], &[]) {
        Err(ResolutionError::UsesConflict(conflict)) => {
            assert_eq!(conflict.kind, ConflictKind::ImportConflict);
            assert_eq!(conflict.resource, a);
            assert_eq!(conflict.package, "foo");
            assert_eq!(conflict.requirement, Some(a_bar));
        }
        other => panic!("expected uses conflict, got {:?}", other),
    }
}
