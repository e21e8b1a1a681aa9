//! Requirement graph construction
//!
//! Builds the synthetic root resource that carries the request, and one
//! resource per registered feature (plus one per conditional) whose
//! requirements mirror the feature's bundles and dependencies.

use crate::config::RangePolicy;
use crate::error::PlanError;
use crate::expander::parse_feature_spec;
use crate::feature::Feature;
use crate::model::{
    namespace, AttributeValue, Requirement, Resource, RESOLUTION_DIRECTIVE, RESOLUTION_OPTIONAL,
    TYPE_ATTRIBUTE, TYPE_DUMMY, TYPE_FEATURE, VERSION_ATTRIBUTE,
};
use crate::registry::ResourceRegistry;
use crate::version::{Version, VersionRange};

/// Id and name of the synthetic request resource
pub const ROOT_ID: &str = "dummy";

pub fn root_resource() -> Resource {
    Resource::new(ROOT_ID, ROOT_ID, Version::default(), TYPE_DUMMY)
}

fn optional(requirement: Requirement, optional: bool) -> Requirement {
    if optional {
        requirement.with_directive(RESOLUTION_DIRECTIVE, RESOLUTION_OPTIONAL)
    } else {
        requirement
    }
}

/// Add a feature identity requirement for `spec` (`name[/versionOrRange]`) to `resource`
pub fn require_feature(
    resource: &mut Resource,
    spec: &str,
    policy: RangePolicy,
    is_optional: bool,
) -> Result<(), PlanError> {
    let (name, range) = parse_feature_spec(spec, policy)?;
    let requirement = Requirement::identity(&resource.id, &name, TYPE_FEATURE, range);
    resource.add_requirement(optional(requirement, is_optional));
    Ok(())
}

/// Identity requirement owned by `owner` for "`target` or newer"
pub fn identity_requirement(owner: &str, target: &Resource) -> Result<Requirement, PlanError> {
    let mut identities = target.capabilities_in(namespace::IDENTITY);
    let (Some(identity), None) = (identities.next(), identities.next()) else {
        return Err(PlanError::Graph(format!(
            "Resource {} does not have a single {} capability",
            target.id,
            namespace::IDENTITY
        )));
    };

    let mut requirement = Requirement::new(owner, namespace::IDENTITY);
    for key in [namespace::IDENTITY, TYPE_ATTRIBUTE] {
        if let Some(value) = identity.attribute(key) {
            requirement.attributes.insert(key.to_string(), value.clone());
        }
    }
    let version = identity
        .attribute(VERSION_ATTRIBUTE)
        .and_then(AttributeValue::as_version)
        .cloned()
        .unwrap_or_default();
    Ok(requirement.with_attribute(VERSION_ATTRIBUTE, VersionRange::at_least(version)))
}

/// Require the pooled resource at `location` from `resource`
pub fn require_resource(
    resource: &mut Resource,
    pool: &ResourceRegistry,
    location: &str,
    is_optional: bool,
) -> Result<(), PlanError> {
    let target = pool
        .get(location)
        .ok_or_else(|| PlanError::Graph(format!("Could not find resource for {}", location)))?;
    let requirement = identity_requirement(&resource.id, &target)?;
    resource.add_requirement(optional(requirement, is_optional));
    Ok(())
}

/// Resource standing for `feature`: its identity plus requirements on its
/// dependency features and pooled bundles. Dependency-flagged bundles are
/// required optionally.
pub fn build_feature_resource(
    feature: &Feature,
    policy: RangePolicy,
    pool: &ResourceRegistry,
) -> Result<Resource, PlanError> {
    let mut resource = Resource::new(
        &feature.resource_key(),
        &feature.name,
        feature.version.clone(),
        TYPE_FEATURE,
    );
    for dependency in &feature.dependencies {
        require_feature(&mut resource, &dependency.spec(), policy, false)?;
    }
    for bundle in &feature.bundles {
        require_resource(&mut resource, pool, &bundle.location, bundle.dependency)?;
    }
    Ok(resource)
}

/// Build the resource of `feature` and of each of its conditionals.
///
/// A conditional resource requires its parent and its condition features;
/// the parent requires the conditional optionally, so it is only wired when
/// the conditions can be met.
pub fn build_feature_resources(
    feature: &Feature,
    policy: RangePolicy,
    pool: &ResourceRegistry,
) -> Result<(Resource, Vec<Resource>), PlanError> {
    let mut parent = build_feature_resource(feature, policy, pool)?;
    let mut conditionals = Vec::new();

    for conditional in &feature.conditionals {
        let derived = conditional.as_feature(feature);
        let mut resource = build_feature_resource(&derived, policy, pool)?;
        resource.add_requirement(Requirement::identity(
            &resource.id,
            &feature.name,
            TYPE_FEATURE,
            VersionRange::exact(feature.version.clone()),
        ));
        for condition in &conditional.condition {
            require_feature(&mut resource, condition, policy, false)?;
        }

        let link = Requirement::identity(
            &parent.id,
            &derived.name,
            TYPE_FEATURE,
            VersionRange::exact(derived.version.clone()),
        );
        parent.add_requirement(optional(link, true));
        conditionals.push(resource);
    }

    Ok((parent, conditionals))
}
