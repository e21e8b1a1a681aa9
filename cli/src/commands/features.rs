use anyhow::Result;
use deplan_core::FeatureCatalog;
use std::path::PathBuf;

use crate::catalog;

pub fn run(catalogs: &[PathBuf]) -> Result<()> {
    let catalog = catalog::load_catalog(catalogs)?;
    print!("{}", render(&catalog));
    Ok(())
}

/// `name/version` per feature, with bundle and conditional counts
pub fn render(catalog: &FeatureCatalog) -> String {
    catalog
        .features()
        .iter()
        .map(|f| {
            let mut line = format!("{}  ({} bundle(s)", f.id(), f.bundles.len());
            if !f.conditionals.is_empty() {
                line.push_str(&format!(", {} conditional(s)", f.conditionals.len()));
            }
            line.push_str(")\n");
            line
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deplan_core::{BundleInfo, Conditional, Feature};

    #[test]
    fn test_render_catalog() {
        let mut web = Feature::new("web", "1.0".parse().unwrap());
        web.bundles.push(BundleInfo::new("mvn:g/web/1.0"));
        web.conditionals.push(Conditional::default());
        let catalog = FeatureCatalog::new(vec![web, Feature::new("log", "2.0".parse().unwrap())]);

        assert_eq!(
            render(&catalog),
            "web/1.0.0  (1 bundle(s), 1 conditional(s))\nlog/2.0.0  (0 bundle(s))\n"
        );
    }
}
