use crate::error::PlanError;
use crate::model::Attributes;
use crate::traits::FetchedArtifact;

/// Extracts manifest headers from a fetched artifact
pub trait ManifestReader: Send + Sync {
    /// Returns `Ok(None)` when the artifact carries no manifest at all
    fn read_manifest(&self, artifact: &FetchedArtifact) -> Result<Option<Attributes>, PlanError>;
}

/// A dependency bundled inside a packaged artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagedDependency {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    pub extension: String,
    pub classifier: String,
    pub artifact: FetchedArtifact,
}

impl PackagedDependency {
    /// `mvn:group/artifact/version[/extension][/classifier]`
    ///
    /// The extension is written when it is not `jar` or when a classifier
    /// follows it.
    pub fn coordinate_uri(&self) -> String {
        let mut uri = format!(
            "mvn:{}/{}/{}",
            self.group_id, self.artifact_id, self.version
        );
        if !self.classifier.is_empty() || self.extension != "jar" {
            uri.push('/');
            uri.push_str(&self.extension);
        }
        if !self.classifier.is_empty() {
            uri.push('/');
            uri.push_str(&self.classifier);
        }
        uri
    }
}

/// Contents of a packaged artifact: its own manifest, the features it needs
/// and the dependencies it ships with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackagedInfo {
    pub manifest: Attributes,
    pub features: Vec<String>,
    pub dependencies: Vec<PackagedDependency>,
}

/// Reads packaged-dependency artifacts (`fab:` locations)
pub trait PackagedReader: Send + Sync {
    fn read_packaged(&self, artifact: &FetchedArtifact) -> Result<PackagedInfo, PlanError>;
}
