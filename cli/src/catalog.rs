//! Feature catalog files
//!
//! A catalog file is a TOML document with `[[feature]]` entries:
//!
//! ```toml
//! [[feature]]
//! name = "web"
//! version = "1.0.0"
//! dependencies = [{ name = "http", version = "[1,2)" }]
//! bundles = [{ location = "mvn:org.acme/web/1.0.0" }]
//!
//! [[feature.conditional]]
//! condition = ["security"]
//! bundles = [{ location = "mvn:org.acme/web-security/1.0.0" }]
//! ```

use anyhow::{Context, Result};
use deplan_core::{Feature, FeatureCatalog};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    feature: Vec<Feature>,
}

/// Parse one catalog document
pub fn parse_catalog(content: &str) -> Result<Vec<Feature>> {
    let file: CatalogFile = toml::from_str(content)?;
    Ok(file.feature)
}

/// Load every catalog file, in order, into a single catalog
pub fn load_catalog(paths: &[PathBuf]) -> Result<FeatureCatalog> {
    let mut catalog = FeatureCatalog::default();
    for path in paths {
        let features = load_catalog_file(path)?;
        tracing::debug!("Loaded {} feature(s) from {}", features.len(), path.display());
        catalog.extend(features);
    }
    Ok(catalog)
}

fn load_catalog_file(path: &Path) -> Result<Vec<Feature>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read feature catalog: {}", path.display()))?;
    parse_catalog(&content)
        .with_context(|| format!("Failed to parse feature catalog: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CATALOG: &str = r#"
        [[feature]]
        name = "web"
        version = "1.0"
        dependencies = [{ name = "http", version = "[1,2)" }, { name = "log" }]
        bundles = [
            { location = "mvn:org.acme/web/1.0.0" },
            { location = "mvn:org.acme/util/1.0.0", dependency = true },
        ]

        [[feature.conditional]]
        condition = ["security"]
        bundles = [{ location = "mvn:org.acme/web-security/1.0.0" }]

        [[feature]]
        name = "log"
        version = "2.1.0"
    "#;

    #[test]
    fn test_parse_catalog() {
        let features = parse_catalog(CATALOG).unwrap();
        assert_eq!(features.len(), 2);

        let web = &features[0];
        assert_eq!(web.id(), "web/1.0.0");
        assert_eq!(web.dependencies[0].spec(), "http/[1,2)");
        assert_eq!(web.dependencies[1].spec(), "log");
        assert!(web.bundles[1].dependency);
        assert_eq!(web.conditionals.len(), 1);
        assert_eq!(web.conditionals[0].condition, vec!["security"]);

        assert!(features[1].bundles.is_empty());
    }

    #[test]
    fn test_bad_version_is_rejected() {
        let err = parse_catalog("[[feature]]\nname = \"x\"\nversion = \"one\"\n").unwrap_err();
        assert!(err.to_string().contains("one"));
    }

    #[test]
    fn test_load_catalog_concatenates_files() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("a.toml");
        let second = temp_dir.path().join("b.toml");
        fs::write(&first, CATALOG).unwrap();
        fs::write(&second, "[[feature]]\nname = \"extra\"\nversion = \"0.1\"\n").unwrap();

        let catalog = load_catalog(&[first, second]).unwrap();
        let names: Vec<_> = catalog.features().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["web", "log", "extra"]);
    }

    #[test]
    fn test_missing_catalog_names_the_file() {
        let err = load_catalog(&[PathBuf::from("/no/such/features.toml")]).unwrap_err();
        assert!(err.to_string().contains("/no/such/features.toml"));
    }
}
