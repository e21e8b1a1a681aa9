//! Configuration schema for deplan
//!
//! Every section defaults, so a partial file (or none at all) is valid.

use deplan_core::model::{TYPE_BUNDLE, namespace};
use deplan_core::{Capability, PlannerConfig, Resource, Version, builder::SYSTEM_BUNDLE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeplanConfig {
    /// Planner tuning: range policy, handler wait, dynamic protocols
    #[serde(default)]
    pub planner: PlannerConfig,

    /// The framework the plan is deployed into
    #[serde(default)]
    pub system: SystemConfig,

    /// Also wire optional package imports
    #[serde(default)]
    pub resolve_optional_imports: bool,
}

/// Capabilities already provided by the target runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub symbolic_name: String,
    pub version: String,
    /// Packages exported by the framework itself
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            symbolic_name: "system.bundle".to_string(),
            version: "0.0.0".to_string(),
            packages: Vec::new(),
        }
    }
}

impl SystemConfig {
    /// The resource handed to the resolver as the system bundle
    pub fn to_resource(&self) -> anyhow::Result<Resource> {
        let version: Version = self
            .version
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid system version: {}", e))?;
        let mut resource = Resource::new(SYSTEM_BUNDLE, &self.symbolic_name, version.clone(), TYPE_BUNDLE);
        for package in &self.packages {
            let (name, exported) = match package.split_once(';') {
                Some((name, v)) => (name.trim(), v.trim().trim_start_matches("version=").trim_matches('"')),
                None => (package.trim(), "0.0.0"),
            };
            let exported: Version = exported
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid version for system package {}: {}", name, e))?;
            resource.add_capability(
                Capability::new(namespace::PACKAGE)
                    .with_attribute(namespace::PACKAGE, name)
                    .with_attribute("version", exported)
                    .with_attribute("bundle-symbolic-name", self.symbolic_name.as_str())
                    .with_attribute("bundle-version", version.clone()),
            );
        }
        Ok(resource)
    }
}

impl DeplanConfig {
    /// Validate the configuration for common errors
    ///
    /// Returns Ok(()) if valid, or Err with a list of error messages
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = match self.planner.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };

        if self.system.symbolic_name.trim().is_empty() {
            errors.push("system.symbolic_name cannot be empty".to_string());
        }
        if let Err(e) = self.system.version.parse::<Version>() {
            errors.push(format!("system.version: {}", e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
