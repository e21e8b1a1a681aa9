//! Shared fixtures for planner integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use deplan_core::{
    Attributes, BundleInfo, Collaborators, DeploymentBuilder, Feature, FeatureCatalog, FeatureRef,
    FetchError, FetchedArtifact, Fetcher, ManifestReader, PackagedDependency, PackagedInfo,
    PackagedReader, PlanError, PlannerConfig, ProtocolHandlers, Resource,
};

/// In-memory artifact store backing the fetcher and both readers
#[derive(Default)]
pub struct ArtifactStore {
    manifests: Mutex<HashMap<String, Option<Attributes>>>,
    packaged: Mutex<HashMap<String, PackagedInfo>>,
    fetches: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
}

impl ArtifactStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Store whose fetches each take `delay`, to interleave completions
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn add_bundle(&self, url: &str, bsn: &str, version: &str) {
        self.add_manifest(url, headers(&[("Bundle-SymbolicName", bsn), ("Bundle-Version", version)]));
    }

    pub fn add_manifest(&self, url: &str, attributes: Attributes) {
        self.manifests
            .lock()
            .unwrap()
            .insert(url.to_string(), Some(attributes));
    }

    /// An artifact that downloads fine but has no manifest
    pub fn add_plain_file(&self, url: &str) {
        self.manifests.lock().unwrap().insert(url.to_string(), None);
    }

    pub fn add_packaged(&self, url: &str, info: PackagedInfo) {
        for dependency in &info.dependencies {
            if !self.manifests.lock().unwrap().contains_key(&dependency.artifact.url) {
                self.add_plain_file(&dependency.artifact.url);
            }
        }
        self.packaged.lock().unwrap().insert(url.to_string(), info);
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Fetcher for ArtifactStore {
    async fn fetch(&self, url: &str) -> Result<FetchedArtifact, FetchError> {
        *self.fetches.lock().unwrap().entry(url.to_string()).or_default() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let known = self.manifests.lock().unwrap().contains_key(url)
            || self.packaged.lock().unwrap().contains_key(url);
        if !known {
            return Err(FetchError::NotFound(url.to_string()));
        }
        Ok(artifact(url))
    }
}

impl ManifestReader for ArtifactStore {
    fn read_manifest(&self, artifact: &FetchedArtifact) -> Result<Option<Attributes>, PlanError> {
        Ok(self
            .manifests
            .lock()
            .unwrap()
            .get(&artifact.url)
            .cloned()
            .flatten())
    }
}

impl PackagedReader for ArtifactStore {
    fn read_packaged(&self, artifact: &FetchedArtifact) -> Result<PackagedInfo, PlanError> {
        self.packaged
            .lock()
            .unwrap()
            .get(&artifact.url)
            .cloned()
            .ok_or_else(|| PlanError::Manifest {
                location: artifact.url.clone(),
                reason: "not a packaged artifact".to_string(),
            })
    }
}

/// Protocol handlers that never become available
pub struct NoHandlers;

impl ProtocolHandlers for NoHandlers {
    fn is_registered(&self, _protocol: &str) -> bool {
        false
    }
}

pub fn artifact(url: &str) -> FetchedArtifact {
    FetchedArtifact {
        url: url.to_string(),
        path: PathBuf::from(format!("/artifacts/{}", url.replace([':', '/'], "_"))),
    }
}

pub fn headers(pairs: &[(&str, &str)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn feature(name: &str, version: &str, dependencies: &[&str], bundles: &[&str]) -> Feature {
    let mut feature = Feature::new(name, version.parse().unwrap());
    feature.dependencies = dependencies
        .iter()
        .map(|spec| match spec.split_once('/') {
            Some((name, version)) => FeatureRef::new(name, Some(version)),
            None => FeatureRef::new(spec, None),
        })
        .collect();
    feature.bundles = bundles.iter().map(|b| BundleInfo::new(b)).collect();
    feature
}

pub fn dependency(group: &str, artifact_id: &str, version: &str) -> PackagedDependency {
    PackagedDependency {
        group_id: group.to_string(),
        artifact_id: artifact_id.to_string(),
        version: version.to_string(),
        extension: "jar".to_string(),
        classifier: String::new(),
        artifact: artifact(&format!("file:/nested/{}-{}.jar", artifact_id, version)),
    }
}

pub fn collaborators(store: &Arc<ArtifactStore>) -> Collaborators {
    Collaborators::new(
        Arc::clone(store) as Arc<dyn Fetcher>,
        Arc::clone(store) as Arc<dyn ManifestReader>,
    )
    .with_packaged_reader(Arc::clone(store) as Arc<dyn PackagedReader>)
}

pub fn builder(store: &Arc<ArtifactStore>, features: Vec<Feature>) -> DeploymentBuilder {
    DeploymentBuilder::new(
        PlannerConfig::default(),
        FeatureCatalog::new(features),
        collaborators(store),
    )
}

pub fn system_resource() -> Resource {
    Resource::new(
        "system-bundle",
        "org.apache.felix.framework",
        "5.0.0".parse().unwrap(),
        "osgi.bundle",
    )
}
