//! Resolver contract and the adapter around it
//!
//! The constraint solver is pluggable through [`Resolver`]. The adapter splits
//! the root requirements by resolution directive, hands them to the solver
//! and turns solver failures that mention features into a diagnostic that
//! names those features instead of the synthetic root resource.

mod reference;
mod repository;

pub use reference::ReferenceResolver;
pub use repository::{AggregateRepository, Candidate, Repository, StaticRepository};

use crate::error::{PlanError, ResolutionFailure};
use crate::model::{Requirement, Resource, Wiring};

/// Everything a solver gets to see
pub struct ResolveContext<'a> {
    pub mandatory: Vec<Requirement>,
    pub optional: Vec<Requirement>,
    pub repository: &'a dyn Repository,
    /// Whether optional non-identity requirements (e.g. optional package
    /// imports) should be satisfied when possible
    pub resolve_optional_imports: bool,
}

/// Capability constraint solver
///
/// Calls are synchronous and may take arbitrarily long.
pub trait Resolver: Send + Sync {
    fn solve(&self, ctx: &ResolveContext<'_>) -> Result<Wiring, ResolutionFailure>;
}

/// Solve for the requirements of `root` against `repository`
pub fn resolve_root(
    resolver: &dyn Resolver,
    root: &Resource,
    repository: &dyn Repository,
    resolve_optional_imports: bool,
) -> Result<Wiring, PlanError> {
    let (optional, mandatory): (Vec<_>, Vec<_>) = root
        .requirements
        .iter()
        .cloned()
        .partition(Requirement::is_optional);

    tracing::debug!(
        "Resolving {} mandatory and {} optional requirements",
        mandatory.len(),
        optional.len()
    );
    let ctx = ResolveContext {
        mandatory,
        optional,
        repository,
        resolve_optional_imports,
    };
    resolver.solve(&ctx).map_err(translate_failure)
}

/// Name the features behind a solver failure, if any
pub fn translate_failure(failure: ResolutionFailure) -> PlanError {
    let mut features: Vec<String> = Vec::new();
    for requirement in failure.unresolved.iter().filter(|r| r.is_feature()) {
        if let Some(name) = requirement.identity_name()
            && !features.iter().any(|f| f == name)
        {
            features.push(name.to_string());
        }
    }

    if features.is_empty() {
        PlanError::Resolution(failure)
    } else {
        PlanError::FeatureResolution {
            features,
            source: failure,
        }
    }
}
