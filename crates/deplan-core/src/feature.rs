//! Feature definitions and the catalog they are looked up in

use serde::{Deserialize, Serialize};

use crate::version::{Version, VersionRange};

/// Reference from one feature to another: `name` plus an optional version or range
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl FeatureRef {
    pub fn new(name: &str, version: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            version: version.map(String::from),
        }
    }

    /// The `name[/versionOrRange]` spec string
    pub fn spec(&self) -> String {
        match self.version.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => format!("{}/{}", self.name, v),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundleInfo {
    pub location: String,
    /// Required optionally by the feature: wired when it resolves, left out otherwise
    #[serde(default)]
    pub dependency: bool,
}

impl BundleInfo {
    pub fn new(location: &str) -> Self {
        Self {
            location: location.to_string(),
            dependency: false,
        }
    }
}

/// Bundles and features that apply once every condition feature is installed
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conditional {
    #[serde(default)]
    pub condition: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<FeatureRef>,
    #[serde(default)]
    pub bundles: Vec<BundleInfo>,
}

impl Conditional {
    fn condition_id(&self) -> String {
        self.condition
            .iter()
            .map(|c| {
                c.chars()
                    .map(|ch| if ch.is_alphanumeric() || ch == '-' || ch == '.' { ch } else { '_' })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Materialize as a standalone feature named `<parent>-condition-<conditions>`
    /// at the parent's version.
    pub fn as_feature(&self, parent: &Feature) -> Feature {
        Feature {
            name: format!("{}-condition-{}", parent.name, self.condition_id()),
            version: parent.version.clone(),
            dependencies: self.dependencies.clone(),
            bundles: self.bundles.clone(),
            conditionals: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub version: Version,
    #[serde(default)]
    pub dependencies: Vec<FeatureRef>,
    #[serde(default)]
    pub bundles: Vec<BundleInfo>,
    #[serde(default, rename = "conditional")]
    pub conditionals: Vec<Conditional>,
}

impl Feature {
    pub fn new(name: &str, version: Version) -> Self {
        Self {
            name: name.to_string(),
            version,
            dependencies: Vec::new(),
            bundles: Vec::new(),
            conditionals: Vec::new(),
        }
    }

    /// `name/version`
    pub fn id(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }

    /// Pool key of the resource built for this feature
    pub fn resource_key(&self) -> String {
        format!("feature:{}", self.id())
    }
}

/// All known feature definitions, in declaration order
#[derive(Debug, Clone, Default)]
pub struct FeatureCatalog {
    features: Vec<Feature>,
}

impl FeatureCatalog {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn extend(&mut self, features: impl IntoIterator<Item = Feature>) {
        self.features.extend(features);
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn matching<'a>(
        &'a self,
        name: &'a str,
        range: &'a VersionRange,
    ) -> impl Iterator<Item = &'a Feature> {
        self.features
            .iter()
            .filter(move |f| f.name == name && range.contains(&f.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(name: &str, version: &str) -> Feature {
        Feature::new(name, version.parse().unwrap())
    }

    #[test]
    fn test_feature_ref_spec() {
        assert_eq!(FeatureRef::new("a", None).spec(), "a");
        assert_eq!(FeatureRef::new("a", Some("")).spec(), "a");
        assert_eq!(FeatureRef::new("a", Some("[1,2)")).spec(), "a/[1,2)");
    }

    #[test]
    fn test_conditional_materialization() {
        let parent = feature("web", "2.1.0");
        let cond = Conditional {
            condition: vec!["security/1.0".to_string(), "jmx".to_string()],
            dependencies: vec![FeatureRef::new("extra", None)],
            bundles: vec![BundleInfo::new("mvn:org.web/web-sec/2.1.0")],
        };
        let derived = cond.as_feature(&parent);
        assert_eq!(derived.name, "web-condition-security_1.0_jmx");
        assert_eq!(derived.version, parent.version);
        assert_eq!(derived.bundles.len(), 1);
        assert_eq!(derived.dependencies.len(), 1);
        assert!(derived.conditionals.is_empty());
    }

    #[test]
    fn test_catalog_matching_by_range() {
        let catalog = FeatureCatalog::new(vec![
            feature("a", "1.0.0"),
            feature("a", "1.5.0"),
            feature("a", "2.0.0"),
            feature("b", "1.0.0"),
        ]);
        let range: VersionRange = "[1,2)".parse().unwrap();
        let found: Vec<_> = catalog.matching("a", &range).map(Feature::id).collect();
        assert_eq!(found, vec!["a/1.0.0", "a/1.5.0"]);
    }

    #[test]
    fn test_resource_key() {
        assert_eq!(feature("x", "1.0").resource_key(), "feature:x/1.0.0");
    }
}
