use std::collections::VecDeque;

use log::debug;

use super::candidates::Candidates;
use super::graph::Req;

/// Permutations waiting to be tried by one resolve call.
///
/// Uses permutations only reshuffle candidates along a uses chain and are
/// tried before import permutations, which revisit an original choice.
#[derive(Debug, Default)]
pub(crate) struct SearchState {
    uses: VecDeque<Candidates>,
    imports: VecDeque<Candidates>,
}

impl SearchState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next(&mut self) -> Option<Candidates> {
        self.uses.pop_front().or_else(|| self.imports.pop_front())
    }

    pub(crate) fn permutation_count(&self) -> usize {
        self.uses.len() + self.imports.len()
    }

    pub(crate) fn push_uses(&mut self, permutation: Candidates) {
        self.uses.push_back(permutation);
    }

    /// Queue a copy without the preferred candidate of `req`, if it has an alternative
    pub(crate) fn permutate(&mut self, candidates: &Candidates, req: Req) {
        let mut permutation = candidates.copy();
        if permutation.remove_first_candidate(req) {
            debug!("Queued import permutation for {:?}", req);
            self.imports.push_back(permutation);
        }
    }

    /// Like [`permutate`](Self::permutate), unless a queued permutation
    /// already prefers a different candidate for `req`
    pub(crate) fn permutate_if_needed(&mut self, candidates: &Candidates, req: Req) {
        let current = candidates.first_candidate(req);
        let permutated = self.imports.iter().any(|queued| {
            let first = queued.first_candidate(req);
            first.is_some() && first != current
        });
        if !permutated {
            self.permutate(candidates, req);
        }
    }
}
