//! Uses-constraint consistency of package spaces.

use std::collections::HashSet;

use log::debug;

use crate::error::{ConflictKind, ResolutionError};

use super::candidates::Candidates;
use super::graph::{Node, Req};
use super::packages::{Attempt, Blame};
use super::problem;
use super::search::SearchState;

impl<'a> Attempt<'a> {
    /// Check that `node` sees a single source for every package in its space,
    /// then do the same for every node it imports from.
    ///
    /// Conflicts queue the permutations that could avoid them before being
    /// reported.
    pub(crate) fn check_consistency(
        &mut self,
        node: Node,
        dynamic: bool,
        search: &mut SearchState,
        checked: &mut HashSet<Node>,
    ) -> Result<(), ResolutionError> {
        if (self.ctx.wiring(node).is_some() && !dynamic) || checked.contains(&node) {
            return Ok(());
        }
        let Some(packages) = self.packages(node).cloned() else {
            return Ok(());
        };

        // Two different providers for one import, only possible through fragments
        for (package, blames) in &packages.imported {
            let Some((source, rest)) = blames.split_first() else {
                continue;
            };
            let source_node = self.ctx.cap_node(source.cap);
            let Some(blame) = rest.iter().find(|b| self.ctx.cap_node(b.cap) != source_node) else {
                continue;
            };

            for req in [blame.first_req(), source.first_req()].into_iter().flatten() {
                search.permutate(self.candidates, req);
            }
            let err = self.conflict(node, package, ConflictKind::AmbiguousImport, &[source, blame], blame);
            debug!(
                "Candidate permutation failed due to a conflict with a fragment import; \
                 will try another if possible: {}",
                err
            );
            return Err(err);
        }

        let mut permutation: Option<Candidates> = None;
        let mut mutated: HashSet<Req> = HashSet::new();

        for (package, export) in &packages.exported {
            let Some(used) = packages.used.get(package) else {
                continue;
            };

            let mut conflict = None;
            for used_blame in used {
                if self.is_compatible(export.cap, used_blame.cap) {
                    continue;
                }
                if conflict.is_none() {
                    conflict = Some(self.conflict(
                        node,
                        package,
                        ConflictKind::ExportConflict,
                        &[export, used_blame],
                        used_blame,
                    ));
                }
                let perm = permutation.get_or_insert_with(|| self.candidates.copy());
                mutate_chain(perm, used_blame, &mut mutated);
            }

            if let Some(err) = conflict {
                if let Some(perm) = permutation.take().filter(|_| !mutated.is_empty()) {
                    search.push_uses(perm);
                }
                debug!(
                    "Candidate permutation failed due to a conflict between an export and import; \
                     will try another if possible: {}",
                    err
                );
                return Err(err);
            }
        }

        for (package, imports) in &packages.imported {
            let Some(used) = packages.used.get(package) else {
                continue;
            };

            for import in imports {
                let mut conflict = None;
                for used_blame in used {
                    if self.is_compatible(import.cap, used_blame.cap) {
                        continue;
                    }
                    if conflict.is_none() {
                        conflict = Some(self.conflict(
                            node,
                            package,
                            ConflictKind::ImportConflict,
                            &[import, used_blame],
                            used_blame,
                        ));
                    }
                    let perm = permutation.get_or_insert_with(|| self.candidates.copy());
                    mutate_chain(perm, used_blame, &mut mutated);
                }

                let Some(err) = conflict else {
                    continue;
                };
                if let Some(perm) = permutation.take().filter(|_| !mutated.is_empty()) {
                    search.push_uses(perm);
                }
                // Also revisit the original import decision, once
                if let Some(req) = import.first_req().filter(|req| !mutated.contains(req)) {
                    search.permutate_if_needed(self.candidates, req);
                }
                debug!(
                    "Candidate permutation failed due to a conflict between imports; \
                     will try another if possible: {}",
                    err
                );
                return Err(err);
            }
        }

        checked.insert(node);

        let count = search.permutation_count();
        for import in packages.imported.values().flatten() {
            let provider = self.ctx.cap_node(import.cap);
            if provider == node {
                continue;
            }
            if let Err(err) = self.check_consistency(provider, false, search, checked) {
                // Nothing below could be permutated; backtrack on this import instead
                if count == search.permutation_count() {
                    if let Some(req) = import.first_req() {
                        search.permutate(self.candidates, req);
                    }
                }
                return Err(err);
            }
        }

        Ok(())
    }

    fn conflict(
        &self,
        node: Node,
        package: &str,
        kind: ConflictKind,
        blames: &[&Blame],
        faulty: &Blame,
    ) -> ResolutionError {
        problem::uses_conflict(&self.ctx, self.candidates, node, package, kind, blames, faulty)
    }
}

/// Drop the preferred candidate of the deepest requirement in the chain that
/// still has an alternative, unless a deeper one was mutated already
fn mutate_chain(permutation: &mut Candidates, blame: &Blame, mutated: &mut HashSet<Req>) {
    for &req in blame.reqs.iter().rev() {
        if mutated.contains(&req) {
            break;
        }
        if permutation.remove_first_candidate(req) {
            mutated.insert(req);
            break;
        }
    }
}
