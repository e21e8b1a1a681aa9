//! Plan request files
//!
//! ```toml
//! features = ["web/1.0.0", "log"]
//! bundles = ["mvn:org.acme/extra/1.0"]
//! packaged = ["mvn:org.acme/app/1.0"]
//! requirements = ["osgi.identity;osgi.identity=org.acme.api"]
//! overrides = ['mvn:org.acme/util/1.0.1;range="[1,2)"']
//!
//! [metadata."org.acme.util"."[1.0,2.0)"]
//! Import-Package = "=org.slf4j;version=\"[1.7,3)\""
//! ```

use anyhow::{Context, Result};
use deplan_core::{DeploymentRequest, MetadataOverrides, VersionRange};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlanFile {
    pub features: Vec<String>,
    pub bundles: Vec<String>,
    pub packaged: Vec<String>,
    pub requirements: Vec<String>,
    pub overrides: Vec<String>,
    pub optionals: Vec<String>,
    /// Symbolic name → version range → header → value, in file order
    pub metadata: IndexMap<String, IndexMap<String, IndexMap<String, String>>>,
}

impl PlanFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan request: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse plan request: {}", path.display()))
    }

    /// Append command-line additions to the file's lists
    pub fn extend(&mut self, features: Vec<String>, bundles: Vec<String>, overrides: Vec<String>) {
        self.features.extend(features);
        self.bundles.extend(bundles);
        self.overrides.extend(overrides);
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
            && self.bundles.is_empty()
            && self.packaged.is_empty()
            && self.requirements.is_empty()
            && self.optionals.is_empty()
    }

    /// Convert to a planner request, parsing metadata ranges
    pub fn into_request(self) -> Result<DeploymentRequest> {
        let mut metadata = MetadataOverrides::new();
        for (bsn, ranges) in self.metadata {
            let mut parsed = IndexMap::new();
            for (range, headers) in ranges {
                let range: VersionRange = range
                    .parse()
                    .with_context(|| format!("Invalid metadata range for {}", bsn))?;
                parsed.insert(range, headers);
            }
            metadata.insert(bsn, parsed);
        }

        Ok(DeploymentRequest {
            features: self.features,
            bundles: self.bundles,
            packaged: self.packaged,
            requirements: self.requirements,
            overrides: self.overrides,
            optionals: self.optionals,
            metadata,
        })
    }
}
