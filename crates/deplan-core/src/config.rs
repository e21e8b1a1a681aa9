//! Planner configuration
//!
//! Every field defaults so that partial configuration files stay valid.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::PlanError;
use crate::version::{Version, VersionRange};

/// Template turning a bare feature version into an effective range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangePolicy {
    /// `[v, v]`
    #[default]
    Exact,
    /// `[v, major.(minor+1).0)`
    Minor,
}

impl RangePolicy {
    pub fn range_for(self, version: &Version) -> VersionRange {
        match self {
            RangePolicy::Exact => VersionRange::exact(version.clone()),
            RangePolicy::Minor => VersionRange::minor_line(version.clone()),
        }
    }

    /// Explicit `[..]`/`(..)` expressions are parsed as-is, bare versions go
    /// through the template.
    pub fn effective_range(self, text: &str) -> Result<VersionRange, PlanError> {
        let text = text.trim();
        if text.starts_with('[') || text.starts_with('(') {
            text.parse()
        } else {
            Ok(self.range_for(&text.parse()?))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub feature_range: RangePolicy,

    /// Bounded wait for dynamic protocol handlers; negative disables the wait
    pub url_handlers_timeout_ms: i64,

    /// URI prefixes served by handlers that register at runtime
    pub dynamic_protocols: Vec<String>,

    pub handler_poll_interval_ms: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            feature_range: RangePolicy::Exact,
            url_handlers_timeout_ms: 30_000,
            dynamic_protocols: ["blueprint", "spring", "profile", "wrap", "war"]
                .into_iter()
                .map(String::from)
                .collect(),
            handler_poll_interval_ms: 100,
        }
    }
}

impl PlannerConfig {
    /// `None` when the handler wait is disabled
    pub fn handler_timeout(&self) -> Option<Duration> {
        u64::try_from(self.url_handlers_timeout_ms)
            .ok()
            .map(Duration::from_millis)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.handler_poll_interval_ms)
    }

    /// Returns Ok(()) if valid, or Err with a list of error messages
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.handler_poll_interval_ms == 0 {
            errors.push("handler_poll_interval_ms must be greater than zero".to_string());
        }
        for protocol in &self.dynamic_protocols {
            if protocol.is_empty() || protocol.contains(':') {
                errors.push(format!(
                    "dynamic protocol '{}' must be a non-empty scheme without ':'",
                    protocol
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
