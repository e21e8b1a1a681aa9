//! Deterministic worklist resolver
//!
//! Not a SAT solver: each mandatory requirement is satisfied by the first
//! candidate (already-selected resources first, then highest version, then
//! lowest id) whose own mandatory closure resolves. Optional requirements are
//! handled after the mandatory closure and are dropped when nothing fits.

use std::cmp::Reverse;
use std::collections::HashSet;

use crate::error::ResolutionFailure;
use crate::model::{Requirement, Wire, Wiring};
use crate::resolver::{Candidate, Repository, ResolveContext, Resolver};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceResolver;

#[derive(Debug, Clone, Default)]
struct State {
    wiring: Wiring,
    optional: Vec<Requirement>,
}

impl State {
    fn wire(&mut self, requirement: Requirement, candidate: &Candidate) {
        self.wiring.add_wire(Wire {
            requirer: requirement.owner.clone(),
            requirement,
            provider: candidate.resource.id.clone(),
            capability: candidate.capability.clone(),
        });
    }
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self
    }

    fn candidates(repository: &dyn Repository, wiring: &Wiring, requirement: &Requirement) -> Vec<Candidate> {
        let mut seen = HashSet::new();
        let mut candidates: Vec<Candidate> = repository
            .find_providers(requirement)
            .into_iter()
            .filter(|c| seen.insert(c.resource.id.clone()))
            .collect();
        candidates.sort_by_key(|c| {
            (
                !wiring.contains(&c.resource.id),
                Reverse(c.resource.version()),
                c.resource.id.clone(),
            )
        });
        candidates
    }

    /// Resolve `requirements` into `state`; returns what could not be satisfied
    fn close(&self, repository: &dyn Repository, state: &mut State, requirements: Vec<Requirement>) -> Vec<Requirement> {
        let mut unresolved = Vec::new();
        for requirement in requirements {
            if requirement.is_optional() {
                state.optional.push(requirement);
            } else {
                unresolved.extend(self.satisfy(repository, state, requirement));
            }
        }
        unresolved
    }

    fn satisfy(&self, repository: &dyn Repository, state: &mut State, requirement: Requirement) -> Vec<Requirement> {
        let candidates = Self::candidates(repository, &state.wiring, &requirement);
        if let Some(selected) = candidates.first().filter(|c| state.wiring.contains(&c.resource.id)) {
            state.wire(requirement, selected);
            return Vec::new();
        }

        let mut first_failure = None;
        for candidate in candidates {
            let (attempt, unresolved) = self.attempt(repository, state, &requirement, &candidate);
            if unresolved.is_empty() {
                *state = attempt;
                return Vec::new();
            }
            first_failure.get_or_insert((attempt, unresolved));
        }

        match first_failure {
            Some((attempt, unresolved)) => {
                *state = attempt;
                unresolved
            }
            None => vec![requirement],
        }
    }

    /// Select `candidate` on a copy of `state` and resolve its mandatory closure
    fn attempt(
        &self,
        repository: &dyn Repository,
        state: &State,
        requirement: &Requirement,
        candidate: &Candidate,
    ) -> (State, Vec<Requirement>) {
        let mut attempt = state.clone();
        attempt.wiring.add_resource(candidate.resource.clone());
        attempt.wire(requirement.clone(), candidate);
        let unresolved = self.close(repository, &mut attempt, candidate.resource.requirements.clone());
        (attempt, unresolved)
    }

    fn resolve_optional(&self, ctx: &ResolveContext<'_>, state: &mut State) {
        let mut index = 0;
        while index < state.optional.len() {
            let requirement = state.optional[index].clone();
            index += 1;
            if !requirement.is_identity() && !ctx.resolve_optional_imports {
                continue;
            }

            let candidates = Self::candidates(ctx.repository, &state.wiring, &requirement);
            if let Some(selected) = candidates.first().filter(|c| state.wiring.contains(&c.resource.id)) {
                state.wire(requirement, selected);
                continue;
            }
            for candidate in &candidates {
                let (attempt, unresolved) = self.attempt(ctx.repository, state, &requirement, candidate);
                if unresolved.is_empty() {
                    tracing::debug!("Optional {} satisfied by {}", requirement, candidate.resource);
                    *state = attempt;
                    break;
                }
            }
        }
    }
}

impl Resolver for ReferenceResolver {
    fn solve(&self, ctx: &ResolveContext<'_>) -> Result<Wiring, ResolutionFailure> {
        let mut state = State {
            wiring: Wiring::new(),
            optional: ctx.optional.clone(),
        };

        let unresolved = self.close(ctx.repository, &mut state, ctx.mandatory.clone());
        if !unresolved.is_empty() {
            return Err(ResolutionFailure::new(unresolved));
        }

        self.resolve_optional(ctx, &mut state);
        Ok(state.wiring)
    }
}
