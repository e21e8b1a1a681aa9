//! Shared resource pool and artifact-provider map
//!
//! Download completions insert into the registry from arbitrary tasks.
//! Construction for a location happens under the registry lock, so every
//! location is built exactly once no matter how many callbacks race for it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::error::PlanError;
use crate::headers;
use crate::lock;
use crate::model::{Attributes, Resource};
use crate::traits::FetchedArtifact;

/// Where the bytes of a pooled resource come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactProvider {
    File(FetchedArtifact),
    Packaged(FetchedArtifact),
}

impl ArtifactProvider {
    pub fn artifact(&self) -> &FetchedArtifact {
        match self {
            ArtifactProvider::File(a) | ArtifactProvider::Packaged(a) => a,
        }
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    resources: BTreeMap<String, Arc<Resource>>,
    providers: BTreeMap<String, ArtifactProvider>,
}

#[derive(Debug, Default)]
pub struct ResourceRegistry {
    state: Mutex<RegistryState>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the resource for `location`, building it from `headers` on first use
    pub fn manage_resource(
        &self,
        location: &str,
        headers: &Attributes,
        provider: ArtifactProvider,
    ) -> Result<Arc<Resource>, PlanError> {
        self.manage_with(location, provider, || headers::build_resource(location, headers))
    }

    /// Get-or-insert with a custom constructor; `build` runs at most once per location
    pub fn manage_with<F>(
        &self,
        location: &str,
        provider: ArtifactProvider,
        build: F,
    ) -> Result<Arc<Resource>, PlanError>
    where
        F: FnOnce() -> Result<Resource, PlanError>,
    {
        let mut state = lock(&self.state);
        if let Some(existing) = state.resources.get(location) {
            return Ok(Arc::clone(existing));
        }

        let resource = Arc::new(build()?);
        tracing::debug!("Registered {} as {}", location, resource);
        state
            .resources
            .insert(location.to_string(), Arc::clone(&resource));
        state.providers.insert(location.to_string(), provider);
        Ok(resource)
    }

    /// Insert a resource that has no backing artifact, keeping any existing entry
    pub fn insert_if_absent(&self, location: &str, resource: Resource) -> Arc<Resource> {
        let mut state = lock(&self.state);
        Arc::clone(
            state
                .resources
                .entry(location.to_string())
                .or_insert_with(|| Arc::new(resource)),
        )
    }

    /// Insert or replace the pool entry for `location`
    pub fn put(&self, location: &str, resource: Arc<Resource>) {
        lock(&self.state)
            .resources
            .insert(location.to_string(), resource);
    }

    pub fn remove(&self, location: &str) -> Option<Arc<Resource>> {
        lock(&self.state).resources.remove(location)
    }

    pub fn get(&self, location: &str) -> Option<Arc<Resource>> {
        lock(&self.state).resources.get(location).cloned()
    }

    pub fn contains(&self, location: &str) -> bool {
        lock(&self.state).resources.contains_key(location)
    }

    pub fn locations(&self) -> Vec<String> {
        lock(&self.state).resources.keys().cloned().collect()
    }

    /// Copy of the pool, keyed by location
    pub fn snapshot(&self) -> BTreeMap<String, Arc<Resource>> {
        lock(&self.state).resources.clone()
    }

    pub fn providers(&self) -> BTreeMap<String, ArtifactProvider> {
        lock(&self.state).providers.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn headers(bsn: &str, version: &str) -> Attributes {
        [
            ("Bundle-SymbolicName".to_string(), bsn.to_string()),
            ("Bundle-Version".to_string(), version.to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn provider(location: &str) -> ArtifactProvider {
        ArtifactProvider::File(FetchedArtifact {
            url: location.to_string(),
            path: PathBuf::from("/tmp/artifact.jar"),
        })
    }

    #[test]
    fn test_manage_resource_returns_existing() {
        let registry = ResourceRegistry::new();
        let first = registry
            .manage_resource("mvn:a/a/1.0", &headers("a", "1.0"), provider("mvn:a/a/1.0"))
            .unwrap();
        let second = registry
            .manage_resource("mvn:a/a/1.0", &headers("other", "9.0"), provider("mvn:a/a/1.0"))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.name(), "a");
        assert_eq!(registry.providers().len(), 1);
    }

    #[test]
    fn test_manage_resource_propagates_build_error() {
        let registry = ResourceRegistry::new();
        let result = registry.manage_resource("file:bad.jar", &Attributes::new(), provider("file:bad.jar"));
        assert!(matches!(result, Err(PlanError::Build { .. })));
        assert!(registry.is_empty());
        assert!(registry.providers().is_empty());
    }

    #[test]
    fn test_concurrent_construction_happens_once() {
        let registry = Arc::new(ResourceRegistry::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let builds = Arc::clone(&builds);
                std::thread::spawn(move || {
                    registry
                        .manage_with("mvn:x/x/1.0", provider("mvn:x/x/1.0"), || {
                            builds.fetch_add(1, Ordering::SeqCst);
                            headers::build_resource("mvn:x/x/1.0", &headers("x", "1.0"))
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    }

    #[test]
    fn test_put_and_remove() {
        let registry = ResourceRegistry::new();
        let res = registry.insert_if_absent(
            "req:x",
            Resource::new("req:x", "req:x", Default::default(), "dummy"),
        );
        assert!(registry.contains("req:x"));
        registry.put("other", Arc::clone(&res));
        assert_eq!(registry.locations(), vec!["other", "req:x"]);
        assert!(registry.remove("req:x").is_some());
        assert_eq!(registry.len(), 1);
    }
}
