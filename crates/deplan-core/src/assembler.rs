use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::{Resource, Wiring};

/// Resolved artifacts to deploy, ordered by URI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentPlan {
    resources: BTreeMap<String, Arc<Resource>>,
}

impl DeploymentPlan {
    /// Keep every wired resource that has a deployable URI
    pub fn from_wiring(wiring: &Wiring) -> Self {
        let resources = wiring
            .resources()
            .filter_map(|resource| {
                resource
                    .uri
                    .as_ref()
                    .map(|uri| (uri.clone(), Arc::clone(resource)))
            })
            .collect();
        Self { resources }
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    pub fn get(&self, uri: &str) -> Option<&Arc<Resource>> {
        self.resources.get(uri)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<Resource>)> {
        self.resources.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<String, Arc<Resource>> {
        self.resources
    }
}
