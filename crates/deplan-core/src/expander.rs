//! Transitive feature expansion
//!
//! Expansion walks the feature graph with an explicit work queue. A feature
//! is keyed by `(name, version)` in the registered set; a key that is already
//! present is skipped, which is what makes dependency cycles terminate.

use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::config::RangePolicy;
use crate::error::PlanError;
use crate::feature::{Feature, FeatureCatalog};
use crate::lock;
use crate::version::{Version, VersionRange};

/// Split a `name[/versionOrRange]` spec into the name and its effective range.
///
/// A missing or empty version accepts any version; bare versions go through
/// `policy`.
pub fn parse_feature_spec(spec: &str, policy: RangePolicy) -> Result<(String, VersionRange), PlanError> {
    let spec = spec.trim();
    match spec.split_once('/') {
        Some((name, version)) if !version.trim().is_empty() => {
            Ok((name.trim().to_string(), policy.effective_range(version)?))
        }
        Some((name, _)) => Ok((name.trim().to_string(), VersionRange::ANY)),
        None => Ok((spec.to_string(), VersionRange::ANY)),
    }
}

pub struct FeatureExpander {
    catalog: Arc<FeatureCatalog>,
    policy: RangePolicy,
    registered: Mutex<IndexMap<(String, Version), Feature>>,
}

impl FeatureExpander {
    pub fn new(catalog: Arc<FeatureCatalog>, policy: RangePolicy) -> Self {
        Self {
            catalog,
            policy,
            registered: Mutex::new(IndexMap::new()),
        }
    }

    pub fn policy(&self) -> RangePolicy {
        self.policy
    }

    /// Register every catalog feature matching `spec` and, transitively, its
    /// dependencies and conditional dependencies.
    ///
    /// Returns the bundle locations of the newly registered features, in
    /// discovery order. Features that were already registered contribute
    /// nothing, so a repeated call returns an empty list.
    pub fn register_matching_features(&self, spec: &str) -> Result<Vec<String>, PlanError> {
        let mut queue = VecDeque::from([spec.to_string()]);
        let mut locations = IndexSet::new();

        while let Some(spec) = queue.pop_front() {
            let (name, range) = parse_feature_spec(&spec, self.policy)?;
            let matches: Vec<&Feature> = self.catalog.matching(&name, &range).collect();
            if matches.is_empty() {
                tracing::debug!("No feature matches {}", spec);
            }

            for feature in matches {
                if !self.register(feature) {
                    continue;
                }
                tracing::debug!("Registered feature {}", feature.id());

                locations.extend(feature.bundles.iter().map(|b| b.location.clone()));
                queue.extend(feature.dependencies.iter().map(|d| d.spec()));

                for conditional in &feature.conditionals {
                    locations.extend(conditional.bundles.iter().map(|b| b.location.clone()));
                    queue.extend(conditional.dependencies.iter().map(|d| d.spec()));
                }
            }
        }

        Ok(locations.into_iter().collect())
    }

    /// Atomic check-and-insert; false when the feature was already registered
    fn register(&self, feature: &Feature) -> bool {
        let mut registered = lock(&self.registered);
        let key = (feature.name.clone(), feature.version.clone());
        if registered.contains_key(&key) {
            return false;
        }
        registered.insert(key, feature.clone());
        true
    }

    pub fn is_registered(&self, name: &str, version: &Version) -> bool {
        lock(&self.registered).contains_key(&(name.to_string(), version.clone()))
    }

    /// Registered features in registration order
    pub fn registered(&self) -> Vec<Feature> {
        lock(&self.registered).values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{BundleInfo, Conditional, FeatureRef};

    fn feature(name: &str, version: &str, deps: &[&str], bundles: &[&str]) -> Feature {
        let mut f = Feature::new(name, version.parse().unwrap());
        f.dependencies = deps.iter().map(|d| FeatureRef::new(d, None)).collect();
        f.bundles = bundles.iter().map(|b| BundleInfo::new(b)).collect();
        f
    }

    fn expander(features: Vec<Feature>) -> FeatureExpander {
        FeatureExpander::new(Arc::new(FeatureCatalog::new(features)), RangePolicy::Exact)
    }

    #[test]
    fn test_parse_feature_spec() {
        let (name, range) = parse_feature_spec("foo", RangePolicy::Exact).unwrap();
        assert_eq!(name, "foo");
        assert!(range.is_any());

        let (_, range) = parse_feature_spec("foo/", RangePolicy::Exact).unwrap();
        assert!(range.is_any());

        let (name, range) = parse_feature_spec("foo/1.2", RangePolicy::Exact).unwrap();
        assert_eq!(name, "foo");
        assert_eq!(range, VersionRange::exact("1.2.0".parse().unwrap()));

        let (_, range) = parse_feature_spec("foo/[1,2)", RangePolicy::Exact).unwrap();
        assert!(range.contains(&"1.5".parse().unwrap()));

        assert!(parse_feature_spec("foo/not-a-version", RangePolicy::Exact).is_err());
    }

    #[test]
    fn test_cycle_registers_each_feature_once() {
        let exp = expander(vec![
            feature("a", "1.0", &["b"], &["mvn:g/a/1.0"]),
            feature("b", "1.0", &["a"], &["mvn:g/b/1.0"]),
        ]);

        let locations = exp.register_matching_features("a").unwrap();
        assert_eq!(locations, vec!["mvn:g/a/1.0", "mvn:g/b/1.0"]);
        assert_eq!(exp.registered().len(), 2);

        assert!(exp.register_matching_features("b").unwrap().is_empty());
        assert_eq!(exp.registered().len(), 2);
    }

    #[test]
    fn test_self_dependency_terminates() {
        let exp = expander(vec![feature("loop", "1.0", &["loop"], &[])]);
        exp.register_matching_features("loop").unwrap();
        assert_eq!(exp.registered().len(), 1);
    }

    #[test]
    fn test_range_selects_every_matching_version() {
        let exp = expander(vec![
            feature("a", "1.0", &[], &["mvn:g/a/1.0"]),
            feature("a", "1.5", &[], &["mvn:g/a/1.5"]),
            feature("a", "2.0", &[], &["mvn:g/a/2.0"]),
        ]);
        let locations = exp.register_matching_features("a/[1,2)").unwrap();
        assert_eq!(locations, vec!["mvn:g/a/1.0", "mvn:g/a/1.5"]);
        assert!(exp.is_registered("a", &"1.5".parse().unwrap()));
        assert!(!exp.is_registered("a", &"2.0".parse().unwrap()));
    }

    #[test]
    fn test_bare_version_uses_policy() {
        let catalog = Arc::new(FeatureCatalog::new(vec![
            feature("a", "1.2.0", &[], &[]),
            feature("a", "1.2.5", &[], &[]),
        ]));
        let exact = FeatureExpander::new(Arc::clone(&catalog), RangePolicy::Exact);
        exact.register_matching_features("a/1.2.0").unwrap();
        assert_eq!(exact.registered().len(), 1);

        let minor = FeatureExpander::new(catalog, RangePolicy::Minor);
        minor.register_matching_features("a/1.2.0").unwrap();
        assert_eq!(minor.registered().len(), 2);
    }

    #[test]
    fn test_conditional_dependencies_and_bundles_are_expanded() {
        let mut parent = feature("web", "1.0", &[], &["mvn:g/web/1.0"]);
        parent.conditionals.push(Conditional {
            condition: vec!["security".to_string()],
            dependencies: vec![FeatureRef::new("audit", None)],
            bundles: vec![BundleInfo::new("mvn:g/web-sec/1.0")],
        });
        let exp = expander(vec![
            parent,
            feature("audit", "1.0", &[], &["mvn:g/audit/1.0"]),
            feature("security", "1.0", &[], &["mvn:g/security/1.0"]),
        ]);

        let locations = exp.register_matching_features("web").unwrap();
        assert_eq!(
            locations,
            vec!["mvn:g/web/1.0", "mvn:g/web-sec/1.0", "mvn:g/audit/1.0"]
        );
        // The condition itself is not pulled in
        assert!(!exp.is_registered("security", &"1.0".parse().unwrap()));
    }

    #[test]
    fn test_unknown_feature_registers_nothing() {
        let exp = expander(vec![]);
        assert!(exp.register_matching_features("ghost").unwrap().is_empty());
        assert!(exp.registered().is_empty());
    }
}
