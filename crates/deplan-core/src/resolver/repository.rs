use std::collections::HashSet;
use std::sync::Arc;

use crate::model::{Capability, Requirement, Resource};

/// A resource offering a capability that matches some requirement
#[derive(Debug, Clone)]
pub struct Candidate {
    pub resource: Arc<Resource>,
    pub capability: Capability,
}

/// Source of capabilities consulted by a resolver
pub trait Repository: Send + Sync {
    fn find_providers(&self, requirement: &Requirement) -> Vec<Candidate>;
}

/// Fixed set of resources, each listed once even if pooled under several locations
#[derive(Debug, Clone, Default)]
pub struct StaticRepository {
    resources: Vec<Arc<Resource>>,
}

impl StaticRepository {
    pub fn new(resources: impl IntoIterator<Item = Arc<Resource>>) -> Self {
        let mut seen = HashSet::new();
        let resources = resources
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .collect();
        Self { resources }
    }

    pub fn resources(&self) -> &[Arc<Resource>] {
        &self.resources
    }
}

impl Repository for StaticRepository {
    fn find_providers(&self, requirement: &Requirement) -> Vec<Candidate> {
        self.resources
            .iter()
            .flat_map(|resource| {
                resource
                    .capabilities
                    .iter()
                    .filter(|capability| requirement.matches(capability))
                    .map(|capability| Candidate {
                        resource: Arc::clone(resource),
                        capability: capability.clone(),
                    })
            })
            .collect()
    }
}

/// Several repositories consulted in order
#[derive(Clone, Default)]
pub struct AggregateRepository {
    repositories: Vec<Arc<dyn Repository>>,
}

impl AggregateRepository {
    pub fn new(repositories: Vec<Arc<dyn Repository>>) -> Self {
        Self { repositories }
    }

    pub fn push(&mut self, repository: Arc<dyn Repository>) {
        self.repositories.push(repository);
    }
}

impl Repository for AggregateRepository {
    fn find_providers(&self, requirement: &Requirement) -> Vec<Candidate> {
        self.repositories
            .iter()
            .flat_map(|repository| repository.find_providers(requirement))
            .collect()
    }
}
