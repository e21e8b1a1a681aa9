//! Override reconciliation
//!
//! An override is a location, optionally followed by `;range="<range>"`. Once
//! every download has finished, the override's own pool entry is taken out
//! and put in place of each older resource with the same symbolic name whose
//! version lies in the governing range.

use std::str::FromStr;
use std::sync::Arc;

use crate::error::PlanError;
use crate::model::Resource;
use crate::registry::ResourceRegistry;
use crate::version::{Version, VersionRange};

const RANGE_PARAMETER: &str = "range";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideSpec {
    pub url: String,
    pub range: Option<VersionRange>,
}

impl FromStr for OverrideSpec {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(';');
        let url = parts.next().unwrap_or_default().trim().to_string();
        let mut range = None;
        for param in parts {
            if let Some((key, value)) = param.split_once('=')
                && key.trim() == RANGE_PARAMETER
            {
                range = Some(value.trim().trim_matches('"').parse()?);
            }
        }
        Ok(Self { url, range })
    }
}

impl OverrideSpec {
    /// Explicit range, or `[existing, existing.major.(minor+1).0)`
    pub fn governing_range(&self, existing: &Version) -> VersionRange {
        match &self.range {
            Some(range) => range.clone(),
            None => VersionRange::minor_line(existing.clone()),
        }
    }

    /// Whether the override should take the place of `existing`
    pub fn replaces(&self, existing: &Resource, replacement: &Resource) -> bool {
        let current = existing.version();
        existing.name() == replacement.name()
            && self.governing_range(&current).contains(&current)
            && current < replacement.version()
    }
}

/// Apply `overrides` to the pool; returns the number of replaced entries.
///
/// Overrides missing from the pool (e.g. their download failed) are ignored.
pub fn reconcile(registry: &ResourceRegistry, overrides: &[OverrideSpec]) -> usize {
    let mut replaced = 0;

    for spec in overrides {
        let Some(replacement) = registry.remove(&spec.url) else {
            tracing::debug!("Ignoring override {}: not available", spec.url);
            continue;
        };

        for (location, existing) in registry.snapshot() {
            if spec.replaces(&existing, &replacement) {
                tracing::info!(
                    "Overriding {} with {} at {}",
                    existing,
                    replacement,
                    location
                );
                registry.put(&location, Arc::clone(&replacement));
                replaced += 1;
            }
        }
    }

    replaced
}
