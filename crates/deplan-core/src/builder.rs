//! Deployment planning entry point
//!
//! [`DeploymentBuilder::submit`] expands the request, downloads everything it
//! refers to and builds the requirement graph; [`DeploymentBuilder::resolve`]
//! then runs the resolver and returns the ordered deployment plan.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::assembler::DeploymentPlan;
use crate::config::PlannerConfig;
use crate::download::{DownloadListener, DownloadPolicy, Downloader};
use crate::error::{FetchError, PlanError};
use crate::expander::FeatureExpander;
use crate::feature::{Feature, FeatureCatalog};
use crate::graph;
use crate::headers;
use crate::metadata::{self, MetadataOverrides};
use crate::model::{Attributes, Resource, Wiring, TYPE_DUMMY};
use crate::overrides::{self, OverrideSpec};
use crate::registry::{ArtifactProvider, ResourceRegistry};
use crate::resolver::{self, AggregateRepository, ReferenceResolver, Repository, Resolver, StaticRepository};
use crate::traits::{FetchedArtifact, Fetcher, ManifestReader, PackagedReader, ProtocolHandlers};
use crate::version::Version;

/// Packaged-dependency locations: the artifact bundles its own dependencies
pub const FAB_PROTOCOL: &str = "fab:";
/// Raw requirement locations: the payload is a requirement clause list
pub const REQ_PROTOCOL: &str = "req:";
/// Pool key of the system resource supplied to [`DeploymentBuilder::resolve`]
pub const SYSTEM_BUNDLE: &str = "system-bundle";

/// What to deploy
///
/// `packaged` and `requirements` entries are given without their `fab:` /
/// `req:` prefix. Overrides may carry a `;range="..."` suffix.
#[derive(Debug, Clone, Default)]
pub struct DeploymentRequest {
    pub features: Vec<String>,
    pub bundles: Vec<String>,
    pub packaged: Vec<String>,
    pub requirements: Vec<String>,
    pub overrides: Vec<String>,
    pub optionals: Vec<String>,
    pub metadata: MetadataOverrides,
}

/// External services the planner relies on
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn Fetcher>,
    pub manifests: Arc<dyn ManifestReader>,
    pub packaged: Option<Arc<dyn PackagedReader>>,
    pub handlers: Option<Arc<dyn ProtocolHandlers>>,
}

impl Collaborators {
    pub fn new(fetcher: Arc<dyn Fetcher>, manifests: Arc<dyn ManifestReader>) -> Self {
        Self {
            fetcher,
            manifests,
            packaged: None,
            handlers: None,
        }
    }

    pub fn with_packaged_reader(mut self, reader: Arc<dyn PackagedReader>) -> Self {
        self.packaged = Some(reader);
        self
    }

    pub fn with_protocol_handlers(mut self, handlers: Arc<dyn ProtocolHandlers>) -> Self {
        self.handlers = Some(handlers);
        self
    }
}

/// State of one submitted request, shared with download completions
struct Session {
    config: PlannerConfig,
    expander: FeatureExpander,
    registry: ResourceRegistry,
    downloader: Arc<Downloader>,
    metadata: MetadataOverrides,
    manifests: Arc<dyn ManifestReader>,
    packaged: Option<Arc<dyn PackagedReader>>,
}

impl Session {
    fn new(
        config: &PlannerConfig,
        catalog: &Arc<FeatureCatalog>,
        collaborators: &Collaborators,
        metadata: MetadataOverrides,
        listener: Option<DownloadListener>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: config.clone(),
            expander: FeatureExpander::new(Arc::clone(catalog), config.feature_range),
            registry: ResourceRegistry::new(),
            downloader: Arc::new(Downloader::new(
                Arc::clone(&collaborators.fetcher),
                collaborators.handlers.clone(),
                config,
                listener,
            )),
            metadata,
            manifests: Arc::clone(&collaborators.manifests),
            packaged: collaborators.packaged.clone(),
        })
    }

    /// Register matching features and dispatch their bundles
    fn register_matching_features(self: &Arc<Self>, spec: &str) -> Result<Vec<String>, PlanError> {
        let locations = self.expander.register_matching_features(spec)?;
        for location in &locations {
            self.download_and_build(location, DownloadPolicy::Required)?;
        }
        Ok(locations)
    }

    fn download_and_build(self: &Arc<Self>, location: &str, policy: DownloadPolicy) -> Result<(), PlanError> {
        if let Some(url) = location.strip_prefix(FAB_PROTOCOL) {
            let session = Arc::clone(self);
            let key = location.to_string();
            self.downloader.download(location, url, policy, move |artifact| {
                session.register_packaged(&key, artifact)
            });
            Ok(())
        } else if let Some(text) = location.strip_prefix(REQ_PROTOCOL) {
            match self.register_requirements(location, text) {
                Err(e) if policy == DownloadPolicy::BestEffort => {
                    tracing::warn!("Ignoring {}: {}", location, e);
                    Ok(())
                }
                result => result,
            }
        } else {
            let session = Arc::clone(self);
            let key = location.to_string();
            self.downloader.download(location, location, policy, move |artifact| {
                session.register_bundle(&key, artifact)
            });
            Ok(())
        }
    }

    fn read_headers(&self, artifact: &FetchedArtifact) -> Result<Option<Attributes>, PlanError> {
        Ok(self
            .manifests
            .read_manifest(artifact)?
            .map(|headers| metadata::apply_overrides(headers, &self.metadata)))
    }

    fn register_bundle(&self, location: &str, artifact: FetchedArtifact) -> Result<(), PlanError> {
        if self.registry.contains(location) {
            return Ok(());
        }
        let headers = self
            .read_headers(&artifact)?
            .ok_or_else(|| PlanError::Manifest {
                location: location.to_string(),
                reason: format!("{} does not contain a manifest", artifact.path.display()),
            })?;
        self.registry
            .manage_resource(location, &headers, ArtifactProvider::File(artifact))?;
        Ok(())
    }

    /// Register a packaged artifact: the artifact itself, the features it asks
    /// for and every nested dependency that is a bundle.
    ///
    /// A nested dependency without a manifest fails the artifact; one whose
    /// manifest has no symbolic name is skipped.
    fn register_packaged(self: &Arc<Self>, location: &str, artifact: FetchedArtifact) -> Result<(), PlanError> {
        let reader = self.packaged.as_ref().ok_or_else(|| PlanError::Fetch {
            location: location.to_string(),
            source: FetchError::Unsupported(FAB_PROTOCOL.trim_end_matches(':').to_string()),
        })?;
        let info = reader.read_packaged(&artifact)?;
        let manifest = metadata::apply_overrides(info.manifest, &self.metadata);
        let policy = self.config.feature_range;

        self.registry
            .manage_with(location, ArtifactProvider::Packaged(artifact), || {
                let mut resource = headers::build_resource(location, &manifest)?;
                for feature in &info.features {
                    graph::require_feature(&mut resource, feature, policy, false)?;
                }
                Ok(resource)
            })?;

        for feature in &info.features {
            self.register_matching_features(feature)?;
        }

        for dependency in &info.dependencies {
            let uri = dependency.coordinate_uri();
            let headers = self
                .read_headers(&dependency.artifact)?
                .ok_or_else(|| PlanError::Manifest {
                    location: uri.clone(),
                    reason: format!(
                        "{} does not contain a manifest",
                        dependency.artifact.path.display()
                    ),
                })?;
            if metadata::symbolic_name(&headers).is_none() {
                tracing::debug!("Skipping {}: not a bundle", uri);
                continue;
            }
            self.registry.manage_resource(
                &uri,
                &headers,
                ArtifactProvider::File(dependency.artifact.clone()),
            )?;
        }
        Ok(())
    }

    /// Pool a resource with no artifact behind it, carrying the parsed requirements
    fn register_requirements(&self, location: &str, text: &str) -> Result<(), PlanError> {
        let mut resource = Resource::new(location, location, Version::default(), TYPE_DUMMY);
        for requirement in headers::parse_requirements(location, text)? {
            resource.add_requirement(requirement);
        }
        self.registry.insert_if_absent(location, resource);
        Ok(())
    }

    /// Materialize every registered feature (and its conditionals) into the pool
    fn build_feature_resources(&self) -> Result<(), PlanError> {
        for feature in self.expander.registered() {
            let (resource, conditionals) =
                graph::build_feature_resources(&feature, self.config.feature_range, &self.registry)?;
            self.registry.put(&feature.resource_key(), Arc::new(resource));
            for conditional in conditionals {
                let key = conditional.id.clone();
                self.registry.put(&key, Arc::new(conditional));
            }
        }
        Ok(())
    }
}

pub struct DeploymentBuilder {
    config: PlannerConfig,
    catalog: Arc<FeatureCatalog>,
    collaborators: Collaborators,
    resolver: Arc<dyn Resolver>,
    repositories: Vec<Arc<dyn Repository>>,
    session: Arc<Session>,
    root: Resource,
    wiring: Option<Wiring>,
}

impl DeploymentBuilder {
    pub fn new(config: PlannerConfig, catalog: FeatureCatalog, collaborators: Collaborators) -> Self {
        let catalog = Arc::new(catalog);
        let session = Session::new(
            &config,
            &catalog,
            &collaborators,
            MetadataOverrides::new(),
            None,
        );
        Self {
            config,
            catalog,
            collaborators,
            resolver: Arc::new(ReferenceResolver::new()),
            repositories: Vec::new(),
            session,
            root: graph::root_resource(),
            wiring: None,
        }
    }

    /// Use another constraint solver
    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Additional capabilities consulted after the resource pool
    pub fn add_resource_repository(&mut self, repository: Arc<dyn Repository>) {
        self.repositories.push(repository);
    }

    /// Expand, download and graph `request`; returns the resource pool by location.
    ///
    /// Each call starts from an empty pool and a fresh root resource.
    pub async fn submit(
        &mut self,
        request: &DeploymentRequest,
        listener: Option<DownloadListener>,
    ) -> Result<BTreeMap<String, Arc<Resource>>, PlanError> {
        let session = Session::new(
            &self.config,
            &self.catalog,
            &self.collaborators,
            request.metadata.clone(),
            listener,
        );
        self.session = Arc::clone(&session);
        self.root = graph::root_resource();
        self.wiring = None;

        tracing::info!(
            "Planning {} feature(s), {} bundle(s), {} packaged, {} requirement(s), {} override(s)",
            request.features.len(),
            request.bundles.len(),
            request.packaged.len(),
            request.requirements.len(),
            request.overrides.len()
        );

        let overrides = request
            .overrides
            .iter()
            .map(|o| o.parse::<OverrideSpec>())
            .collect::<Result<Vec<_>, _>>()?;
        let packaged: Vec<String> = request
            .packaged
            .iter()
            .map(|p| format!("{}{}", FAB_PROTOCOL, p))
            .collect();
        let requirements: Vec<String> = request
            .requirements
            .iter()
            .map(|r| format!("{}{}", REQ_PROTOCOL, r))
            .collect();

        for feature in &request.features {
            session.register_matching_features(feature)?;
        }
        for location in request.bundles.iter().chain(&packaged).chain(&requirements) {
            session.download_and_build(location, DownloadPolicy::Required)?;
        }
        for spec in &overrides {
            session.download_and_build(&spec.url, DownloadPolicy::BestEffort)?;
        }
        for optional in &request.optionals {
            session.download_and_build(optional, DownloadPolicy::Required)?;
        }

        session.downloader.await_all().await?;
        tracing::info!("All downloads complete, {} resource(s) pooled", session.registry.len());

        let replaced = overrides::reconcile(&session.registry, &overrides);
        if replaced > 0 {
            tracing::info!("Applied overrides to {} resource(s)", replaced);
        }

        session.build_feature_resources()?;

        for feature in &request.features {
            self.require_feature(feature, None, false)?;
        }
        for location in request.bundles.iter().chain(&requirements).chain(&packaged) {
            self.require_resource(location)?;
        }

        Ok(session.registry.snapshot())
    }

    /// Resolve the submitted request against the pool plus `system`.
    ///
    /// `system` is pooled under [`SYSTEM_BUNDLE`] and is never part of the plan.
    pub fn resolve(&mut self, system: Resource, resolve_optional_imports: bool) -> Result<DeploymentPlan, PlanError> {
        let mut system = system;
        system.uri = None;
        self.session.registry.put(SYSTEM_BUNDLE, Arc::new(system));

        let mut repositories: Vec<Arc<dyn Repository>> = vec![Arc::new(StaticRepository::new(
            self.session.registry.snapshot().into_values(),
        ))];
        repositories.extend(self.repositories.iter().cloned());
        let repository = AggregateRepository::new(repositories);

        let wiring = resolver::resolve_root(
            self.resolver.as_ref(),
            &self.root,
            &repository,
            resolve_optional_imports,
        )?;
        let plan = DeploymentPlan::from_wiring(&wiring);
        tracing::info!(
            "Resolved {} resource(s), {} to deploy",
            wiring.len(),
            plan.len()
        );
        self.wiring = Some(wiring);
        Ok(plan)
    }

    /// Wiring of the last successful [`resolve`](Self::resolve)
    pub fn wiring(&self) -> Option<&Wiring> {
        self.wiring.as_ref()
    }

    /// Add a feature requirement for `spec` to `resource`, or to the root resource when `None`
    pub fn require_feature(
        &mut self,
        spec: &str,
        resource: Option<&mut Resource>,
        optional: bool,
    ) -> Result<(), PlanError> {
        let resource = match resource {
            Some(resource) => resource,
            None => &mut self.root,
        };
        graph::require_feature(resource, spec, self.config.feature_range, optional)
    }

    /// Require the pooled resource at `location` from the root resource
    pub fn require_resource(&mut self, location: &str) -> Result<(), PlanError> {
        graph::require_resource(&mut self.root, &self.session.registry, location, false)
    }

    /// Register features matching `spec` and wait for their bundles to download.
    ///
    /// Returns the bundle locations of the newly registered features.
    pub async fn register_matching_features(&self, spec: &str) -> Result<Vec<String>, PlanError> {
        let locations = self.session.register_matching_features(spec)?;
        self.session.downloader.await_all().await?;
        Ok(locations)
    }

    /// The synthetic request resource
    pub fn root(&self) -> &Resource {
        &self.root
    }

    pub fn registered_features(&self) -> Vec<Feature> {
        self.session.expander.registered()
    }

    /// Location → artifact association of every downloaded resource
    pub fn providers(&self) -> BTreeMap<String, ArtifactProvider> {
        self.session.registry.providers()
    }
}
