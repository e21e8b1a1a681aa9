//! Local artifact repository
//!
//! Resolves artifact locations against a directory laid out like a Maven
//! repository and reads the artifacts found there:
//!
//! - `mvn:g/a/v[/ext[/cls]]` → `<root>/<g with . as />/<a>/<v>/<a>-<v>[-cls].<ext>`
//! - `file:<path>` and plain paths are read directly
//!
//! Bundles are `MANIFEST.MF`-style text; packaged (`fab:`) artifacts are TOML
//! documents with a `[manifest]` table, a `features` list and
//! `[[dependencies]]` coordinates.
//!
//! The repository is also the protocol handler registry: only `mvn` and
//! `file` are ever registered, so locations wrapped in a configured dynamic
//! protocol wait out `url_handlers_timeout_ms` and then fail.

use async_trait::async_trait;
use deplan_core::{
    Attributes, FetchError, FetchedArtifact, Fetcher, ManifestReader, PackagedDependency,
    PackagedInfo, PackagedReader, PlanError, ProtocolHandlers,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const MVN_PROTOCOL: &str = "mvn:";
const FILE_PROTOCOL: &str = "file:";

#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    root: PathBuf,
}

impl DirectoryRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Local path of `url`, without checking that it exists
    pub fn resolve(&self, url: &str) -> Result<PathBuf, FetchError> {
        if let Some(coordinates) = url.strip_prefix(MVN_PROTOCOL) {
            return self.maven_path(url, coordinates);
        }
        if let Some(path) = url.strip_prefix(FILE_PROTOCOL) {
            return Ok(PathBuf::from(path));
        }
        match url.split_once(':') {
            // Windows drive letters are paths, not schemes
            Some((scheme, _)) if scheme.len() > 1 => Err(FetchError::Unsupported(scheme.to_string())),
            _ => Ok(PathBuf::from(url)),
        }
    }

    fn maven_path(&self, url: &str, coordinates: &str) -> Result<PathBuf, FetchError> {
        // Repository prefixes (`mvn:http://repo!g/a/v`) are ignored
        let coordinates = coordinates.rsplit('!').next().unwrap_or(coordinates);
        let parts: Vec<&str> = coordinates.split('/').collect();
        if parts.len() < 3 || parts.len() > 5 || parts.iter().any(|p| p.is_empty()) {
            return Err(FetchError::Other(format!("Malformed maven location: {}", url)));
        }
        let (group, artifact, version) = (parts[0], parts[1], parts[2]);
        let extension = parts.get(3).copied().unwrap_or("jar");
        let file_name = match parts.get(4) {
            Some(classifier) => format!("{}-{}-{}.{}", artifact, version, classifier, extension),
            None => format!("{}-{}.{}", artifact, version, extension),
        };

        let mut path = self.root.clone();
        path.extend(group.split('.'));
        Ok(path.join(artifact).join(version).join(file_name))
    }

    /// Read a packaged artifact's TOML descriptor
    fn parse_packaged(&self, content: &str) -> Result<PackagedInfo, toml::de::Error> {
        let file: PackagedFile = toml::from_str(content)?;
        let dependencies = file
            .dependencies
            .into_iter()
            .map(|d| {
                let mut dependency = PackagedDependency {
                    group_id: d.group_id,
                    artifact_id: d.artifact_id,
                    version: d.version,
                    extension: d.extension,
                    classifier: d.classifier,
                    artifact: FetchedArtifact {
                        url: String::new(),
                        path: PathBuf::new(),
                    },
                };
                let url = dependency.coordinate_uri();
                let path = match d.path {
                    Some(path) => self.root.join(path),
                    None => self.resolve(&url).unwrap_or_default(),
                };
                dependency.artifact = FetchedArtifact { url, path };
                dependency
            })
            .collect();

        Ok(PackagedInfo {
            manifest: file.manifest,
            features: file.features,
            dependencies,
        })
    }
}

#[async_trait]
impl Fetcher for DirectoryRepository {
    async fn fetch(&self, url: &str) -> Result<FetchedArtifact, FetchError> {
        let path = self.resolve(url)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {
                tracing::debug!("Resolved {} to {}", url, path.display());
                Ok(FetchedArtifact {
                    url: url.to_string(),
                    path,
                })
            }
            Ok(_) => Err(FetchError::NotFound(format!("{} ({} is not a file)", url, path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FetchError::NotFound(format!("{} ({})", url, path.display())))
            }
            Err(e) => Err(FetchError::Io(e)),
        }
    }
}

impl ProtocolHandlers for DirectoryRepository {
    fn is_registered(&self, protocol: &str) -> bool {
        [MVN_PROTOCOL, FILE_PROTOCOL]
            .iter()
            .any(|p| p.trim_end_matches(':') == protocol)
    }
}

impl ManifestReader for DirectoryRepository {
    fn read_manifest(&self, artifact: &FetchedArtifact) -> Result<Option<Attributes>, PlanError> {
        // Nested packaged dependencies are read in place, without a fetch
        if !artifact.path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&artifact.path).map_err(|e| PlanError::Manifest {
            location: artifact.url.clone(),
            reason: format!("cannot read {}: {}", artifact.path.display(), e),
        })?;
        let headers = parse_manifest(&content);
        Ok((!headers.is_empty()).then_some(headers))
    }
}

impl PackagedReader for DirectoryRepository {
    fn read_packaged(&self, artifact: &FetchedArtifact) -> Result<PackagedInfo, PlanError> {
        let content = fs::read_to_string(&artifact.path).map_err(|e| PlanError::Manifest {
            location: artifact.url.clone(),
            reason: format!("cannot read {}: {}", artifact.path.display(), e),
        })?;
        self.parse_packaged(&content).map_err(|e| PlanError::Manifest {
            location: artifact.url.clone(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PackagedFile {
    #[serde(default)]
    manifest: Attributes,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    dependencies: Vec<DependencyEntry>,
}

#[derive(Debug, Deserialize)]
struct DependencyEntry {
    group_id: String,
    artifact_id: String,
    version: String,
    #[serde(default = "default_extension")]
    extension: String,
    #[serde(default)]
    classifier: String,
    /// Repository-relative file, when not at its maven coordinates
    path: Option<PathBuf>,
}

fn default_extension() -> String {
    "jar".to_string()
}

/// Parse `Key: value` manifest text; lines starting with a space continue
/// the previous value.
pub fn parse_manifest(content: &str) -> Attributes {
    let mut headers = Attributes::new();
    let mut current: Option<(String, String)> = None;

    for line in content.lines() {
        if let Some(continuation) = line.strip_prefix(' ') {
            if let Some((_, value)) = current.as_mut() {
                value.push_str(continuation);
            }
            continue;
        }
        if let Some((key, value)) = current.take() {
            headers.insert(key, value);
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if !key.is_empty() && !key.contains(' ') {
                current = Some((key.to_string(), value.trim_start().to_string()));
            }
        }
    }
    if let Some((key, value)) = current {
        headers.insert(key, value);
    }
    headers
}
