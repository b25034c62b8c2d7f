//! Human readable explanations of uses-constraint violations.

use crate::error::{ConflictKind, ResolutionError, UsesConflict};
use crate::model::namespace::PACKAGE;

use super::candidates::Candidates;
use super::graph::{Cap, Context, Node};
use super::packages::Blame;

/// Build the conflict error for `node`, with one rendered chain per blame.
///
/// `faulty` names the requirement the driver may drop along with its owner.
pub(crate) fn uses_conflict(
    ctx: &Context<'_>,
    candidates: &Candidates,
    node: Node,
    package: &str,
    kind: ConflictKind,
    blames: &[&Blame],
    faulty: &Blame,
) -> ResolutionError {
    let providers: Vec<String> = blames
        .iter()
        .map(|blame| ctx.describe(ctx.cap_node(blame.cap)))
        .collect();

    let message = match kind {
        ConflictKind::ExportConflict => format!(
            "Uses constraint violation. Unable to resolve {} because it exports package '{}' \
             and is also exposed to it from {} via the following dependency chain:",
            ctx.describe(node),
            package,
            providers.last().map(String::as_str).unwrap_or("another resource"),
        ),
        ConflictKind::AmbiguousImport | ConflictKind::ImportConflict => format!(
            "Uses constraint violation. Unable to resolve {} because it is exposed to package '{}' \
             from {} via two dependency chains.",
            ctx.describe(node),
            package,
            providers.join(" and "),
        ),
    };

    let chains = blames
        .iter()
        .filter(|blame| kind != ConflictKind::ExportConflict || !blame.reqs.is_empty())
        .map(|blame| render_chain(ctx, candidates, blame))
        .collect();

    ResolutionError::UsesConflict(Box::new(UsesConflict {
        resource: node.id(),
        package: package.to_string(),
        kind,
        requirement: faulty.first_req().map(|req| req.id()),
        chains,
        message,
    }))
}

/// Render the requirement chain of a blame, one hop per requirement
pub(crate) fn render_chain(ctx: &Context<'_>, candidates: &Candidates, blame: &Blame) -> String {
    if blame.reqs.is_empty() {
        return ctx.describe(ctx.cap_node(blame.cap));
    }

    let mut out = String::new();
    for (idx, &req) in blame.reqs.iter().enumerate() {
        let requirement = ctx.requirement(req);
        let is_package = requirement.namespace() == PACKAGE;

        out.push_str(&format!("  {}\n", ctx.describe(ctx.req_node(req))));
        out.push_str(if is_package { "    import: " } else { "    require: " });
        if let Some(filter) = requirement.filter() {
            out.push_str(&filter.to_string());
        }
        out.push_str("\n     |");
        out.push_str(if is_package { "\n    export: " } else { "\n    provide: " });

        match blame.reqs.get(idx + 1) {
            Some(&next) => {
                let provider = ctx.req_node(next);
                match ctx.satisfying_capability(provider, requirement, candidates) {
                    Some(cap) if ctx.capability(cap).namespace() == PACKAGE => {
                        out.push_str(&key_of(ctx, cap));
                        let used_from = match blame.reqs.get(idx + 2) {
                            Some(&after) => ctx.req_node(after),
                            None => ctx.cap_node(blame.cap),
                        };
                        if let Some(used) =
                            ctx.satisfying_capability(used_from, ctx.requirement(next), candidates)
                        {
                            out.push_str("; uses:=");
                            out.push_str(ctx.package_name(used).unwrap_or_default());
                        }
                    }
                    Some(cap) => out.push_str(&ctx.capability(cap).to_string()),
                    None => out.push_str(&ctx.describe(provider)),
                }
                out.push('\n');
            }
            None => {
                let provider = ctx.cap_node(blame.cap);
                if let Some(export) = ctx.satisfying_capability(provider, requirement, candidates) {
                    out.push_str(&key_of(ctx, export));

                    let blamed = ctx.package_name(blame.cap);
                    if ctx.capability(export).namespace() == PACKAGE && ctx.package_name(export) != blamed {
                        let blamed = blamed.unwrap_or_default();
                        out.push_str(&format!("; uses:={}\n    export: {}={}", blamed, PACKAGE, blamed));
                    }
                }
                out.push_str(&format!("\n  {}", ctx.describe(provider)));
            }
        }
    }
    out
}

fn key_of(ctx: &Context<'_>, cap: Cap) -> String {
    let capability = ctx.capability(cap);
    match capability.key() {
        Some(key) => format!("{}={}", capability.namespace(), key),
        None => capability.namespace().to_string(),
    }
}
