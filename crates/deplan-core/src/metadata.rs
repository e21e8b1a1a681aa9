//! Manifest attribute overrides
//!
//! The override table is keyed by symbolic name, then by version range, then
//! by attribute key. A value starting with `=` replaces the attribute; any
//! other value is appended to the existing one with a comma separator.

use indexmap::IndexMap;

use crate::model::Attributes;
use crate::version::{Version, VersionRange};

pub const SYMBOLIC_NAME: &str = "Bundle-SymbolicName";
pub const BUNDLE_VERSION: &str = "Bundle-Version";

/// `{ symbolic name: { range: { attribute: value } } }`, declaration order preserved
pub type MetadataOverrides = IndexMap<String, IndexMap<VersionRange, IndexMap<String, String>>>;

/// Symbolic name without its `;singleton:=true`-style parameters
pub fn symbolic_name(attributes: &Attributes) -> Option<&str> {
    attributes
        .get(SYMBOLIC_NAME)
        .map(|bsn| bsn.split(';').next().unwrap_or(bsn).trim())
        .filter(|bsn| !bsn.is_empty())
}

/// Apply every matching override entry to `attributes`, ranges in table order
pub fn apply_overrides(mut attributes: Attributes, metadata: &MetadataOverrides) -> Attributes {
    let Some(bsn) = symbolic_name(&attributes).map(String::from) else {
        return attributes;
    };
    let Some(version) = attributes
        .get(BUNDLE_VERSION)
        .and_then(|v| v.parse::<Version>().ok())
    else {
        return attributes;
    };
    let Some(ranges) = metadata.get(&bsn) else {
        return attributes;
    };

    for (range, entries) in ranges {
        if !range.contains(&version) {
            continue;
        }
        for (key, value) in entries {
            let patched = match value.strip_prefix('=') {
                Some(replacement) => replacement.to_string(),
                None => match attributes.get(key) {
                    Some(existing) => format!("{},{}", existing, value),
                    None => value.clone(),
                },
            };
            tracing::debug!("Overriding {} of {}/{}: {}", key, bsn, version, patched);
            attributes.insert(key.clone(), patched);
        }
    }

    attributes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn table(bsn: &str, entries: Vec<(&str, Vec<(&str, &str)>)>) -> MetadataOverrides {
        let mut ranges = IndexMap::new();
        for (range, values) in entries {
            let values: IndexMap<String, String> = values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            ranges.insert(range.parse::<VersionRange>().unwrap(), values);
        }
        let mut table = IndexMap::new();
        table.insert(bsn.to_string(), ranges);
        table
    }

    #[test]
    fn test_replace_then_append_in_declaration_order() {
        let input = attrs(&[
            ("Bundle-SymbolicName", "org.tz;singleton:=true"),
            ("Bundle-Version", "1.2.0"),
            ("Time-Zone", "UTC"),
        ]);
        let metadata = table(
            "org.tz",
            vec![
                ("[1.0,2.0)", vec![("Time-Zone", "=America/New_York")]),
                ("[1.2,1.3)", vec![("Time-Zone", "Europe/Paris")]),
            ],
        );

        let out = apply_overrides(input, &metadata);
        assert_eq!(out["Time-Zone"], "America/New_York,Europe/Paris");
    }

    #[test]
    fn test_append_without_existing_value() {
        let input = attrs(&[("Bundle-SymbolicName", "a"), ("Bundle-Version", "1.0")]);
        let metadata = table("a", vec![("[1,2)", vec![("Import-Package", "org.x")])]);
        let out = apply_overrides(input, &metadata);
        assert_eq!(out["Import-Package"], "org.x");
    }

    #[test]
    fn test_non_matching_range_passes_through() {
        let input = attrs(&[
            ("Bundle-SymbolicName", "a"),
            ("Bundle-Version", "3.0"),
            ("Import-Package", "org.y"),
        ]);
        let metadata = table("a", vec![("[1,2)", vec![("Import-Package", "=org.x")])]);
        let out = apply_overrides(input.clone(), &metadata);
        assert_eq!(out, input);
    }

    #[test]
    fn test_unknown_bundle_passes_through() {
        let input = attrs(&[("Bundle-SymbolicName", "b"), ("Bundle-Version", "1.0")]);
        let metadata = table("a", vec![("[1,2)", vec![("X", "=y")])]);
        assert_eq!(apply_overrides(input.clone(), &metadata), input);
    }

    #[test]
    fn test_symbolic_name_strips_parameters() {
        let input = attrs(&[("Bundle-SymbolicName", " org.a ; singleton:=true")]);
        assert_eq!(symbolic_name(&input), Some("org.a"));
        assert_eq!(symbolic_name(&Attributes::new()), None);
    }
}
