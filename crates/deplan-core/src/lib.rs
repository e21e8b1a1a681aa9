//! Deployment planning core
//!
//! Turns a deployment request (features, bundle locations, packaged
//! dependencies, raw requirements, overrides) into an ordered set of
//! installable artifacts:
//!
//! 1. features are expanded against a [`FeatureCatalog`] and every bundle
//!    location found along the way is fetched concurrently;
//! 2. fetched artifacts become [`Resource`]s in a shared registry, with
//!    metadata overrides applied to their headers first;
//! 3. after the fetch barrier, overrides are reconciled and a requirement
//!    graph is built around a synthetic root resource;
//! 4. a pluggable [`Resolver`] produces a [`Wiring`], and the URI-bearing
//!    part of it becomes the [`DeploymentPlan`].

pub mod assembler;
pub mod builder;
pub mod config;
pub mod download;
pub mod error;
pub mod expander;
pub mod feature;
pub mod graph;
pub mod headers;
pub mod metadata;
pub mod model;
pub mod overrides;
pub mod registry;
pub mod resolver;
pub mod traits;
pub mod version;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use assembler::DeploymentPlan;
pub use builder::{Collaborators, DeploymentBuilder, DeploymentRequest};
pub use config::{PlannerConfig, RangePolicy};
pub use download::{DownloadListener, DownloadPolicy, Downloader};
pub use error::{FetchError, PlanError, ResolutionFailure};
pub use feature::{BundleInfo, Conditional, Feature, FeatureCatalog, FeatureRef};
pub use metadata::MetadataOverrides;
pub use model::{Attributes, Capability, Requirement, Resource, Wire, Wiring};
pub use registry::{ArtifactProvider, ResourceRegistry};
pub use resolver::{
    AggregateRepository, Candidate, ReferenceResolver, Repository, ResolveContext, Resolver,
    StaticRepository,
};
pub use traits::{
    FetchedArtifact, Fetcher, ManifestReader, PackagedDependency, PackagedInfo, PackagedReader,
    ProtocolHandlers,
};
pub use version::{Version, VersionRange};

/// Lock a planner mutex, recovering the data if a completion task panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
