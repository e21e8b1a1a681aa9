use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::FetchError;

/// A locally available copy of a remote artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtifact {
    pub url: String,
    pub path: PathBuf,
}

/// Artifact retrieval backend.
///
/// Fetches are dispatched concurrently; implementations must be safe to call
/// from several tasks at once.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve the artifact behind `url`
    async fn fetch(&self, url: &str) -> Result<FetchedArtifact, FetchError>;
}
