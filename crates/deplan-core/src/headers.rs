//! Building resources from manifest headers
//!
//! Headers use the usual clause syntax:
//! `path;path;attr=value;attr:Version=value;directive:=value, next-clause`.
//! Quoted values may contain `,` and `;`.

use crate::error::PlanError;
use crate::metadata::{self, BUNDLE_VERSION};
use crate::model::{
    namespace, AttributeValue, Attributes, Capability, Requirement, Resource,
    RESOLUTION_DIRECTIVE, TYPE_BUNDLE, VERSION_ATTRIBUTE,
};
use crate::version::{Version, VersionRange};

const EXPORT_PACKAGE: &str = "Export-Package";
const IMPORT_PACKAGE: &str = "Import-Package";
const REQUIRE_BUNDLE: &str = "Require-Bundle";
const PROVIDE_CAPABILITY: &str = "Provide-Capability";
const REQUIRE_CAPABILITY: &str = "Require-Capability";

#[derive(Debug, Default, PartialEq)]
struct Clause {
    paths: Vec<String>,
    /// (key, declared type, value)
    attributes: Vec<(String, Option<String>, String)>,
    directives: Vec<(String, String)>,
}

/// Split on `separator`, ignoring separators inside double quotes
fn split_unquoted(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '"' => quoted = !quoted,
            c if c == separator && !quoted => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn unquote(value: &str) -> String {
    value.trim().trim_matches('"').to_string()
}

fn parse_clauses(header: &str) -> Vec<Clause> {
    split_unquoted(header, ',')
        .into_iter()
        .filter(|c| !c.trim().is_empty())
        .map(|raw| {
            let mut clause = Clause::default();
            for part in split_unquoted(raw, ';') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                if let Some((key, value)) = part.split_once(":=") {
                    clause
                        .directives
                        .push((key.trim().to_string(), unquote(value)));
                } else if let Some((key, value)) = part.split_once('=') {
                    let (key, kind) = match key.split_once(':') {
                        Some((k, t)) => (k.trim().to_string(), Some(t.trim().to_string())),
                        None => (key.trim().to_string(), None),
                    };
                    clause.attributes.push((key, kind, unquote(value)));
                } else {
                    clause.paths.push(part.to_string());
                }
            }
            clause
        })
        .collect()
}

fn invalid_header(location: &str, header: &str, err: PlanError) -> PlanError {
    PlanError::Build {
        location: location.to_string(),
        reason: format!("invalid {} header: {}", header, err),
    }
}

fn clause_attribute<'a>(clause: &'a Clause, key: &str) -> Option<&'a str> {
    clause
        .attributes
        .iter()
        .find(|(k, _, _)| k == key)
        .map(|(_, _, v)| v.as_str())
}

fn clause_range(clause: &Clause, key: &str) -> Result<VersionRange, PlanError> {
    clause_attribute(clause, key)
        .map(str::parse::<VersionRange>)
        .transpose()
        .map(|r| r.unwrap_or(VersionRange::ANY))
}

fn apply_directives(mut requirement: Requirement, clause: &Clause) -> Requirement {
    for (key, value) in &clause.directives {
        requirement = requirement.with_directive(key, value);
    }
    requirement
}

/// Typed capability attribute: `Version` typed or `version` keys become versions
fn capability_value(key: &str, kind: Option<&str>, value: &str) -> Result<AttributeValue, PlanError> {
    match kind {
        Some("Version") => Ok(AttributeValue::Version(value.parse()?)),
        None if key == VERSION_ATTRIBUTE => Ok(AttributeValue::Version(value.parse()?)),
        _ => Ok(AttributeValue::String(value.to_string())),
    }
}

/// Typed requirement attribute: `version` keys and version-typed attributes become ranges
fn requirement_value(key: &str, kind: Option<&str>, value: &str) -> Result<AttributeValue, PlanError> {
    match kind {
        Some("Version" | "VersionRange") => Ok(AttributeValue::Range(value.parse()?)),
        None if key == VERSION_ATTRIBUTE => Ok(AttributeValue::Range(value.parse()?)),
        _ => Ok(AttributeValue::String(value.to_string())),
    }
}

/// Parse a `Require-Capability`-style clause list into requirements owned by `owner`
pub fn parse_requirements(owner: &str, text: &str) -> Result<Vec<Requirement>, PlanError> {
    let clauses = parse_clauses(text);
    if clauses.is_empty() {
        return Err(PlanError::Requirement {
            text: text.to_string(),
            reason: "no requirement clause".to_string(),
        });
    }

    let mut requirements = Vec::new();
    for clause in clauses {
        if clause.paths.is_empty() {
            return Err(PlanError::Requirement {
                text: text.to_string(),
                reason: "clause without namespace".to_string(),
            });
        }
        for ns in &clause.paths {
            let mut requirement = Requirement::new(owner, ns);
            for (key, kind, value) in &clause.attributes {
                let value = requirement_value(key, kind.as_deref(), value).map_err(|e| {
                    PlanError::Requirement {
                        text: text.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                requirement.attributes.insert(key.clone(), value);
            }
            requirements.push(apply_directives(requirement, &clause));
        }
    }
    Ok(requirements)
}

/// Build a bundle resource located at `location` from its manifest headers
pub fn build_resource(location: &str, headers: &Attributes) -> Result<Resource, PlanError> {
    let bsn = metadata::symbolic_name(headers).ok_or_else(|| PlanError::Build {
        location: location.to_string(),
        reason: "missing Bundle-SymbolicName header".to_string(),
    })?;
    let version = match headers.get(BUNDLE_VERSION) {
        Some(v) => v
            .parse::<Version>()
            .map_err(|e| invalid_header(location, BUNDLE_VERSION, e))?,
        None => Version::default(),
    };

    let mut resource = Resource::new(location, bsn, version.clone(), TYPE_BUNDLE).with_uri(location);

    if let Some(header) = headers.get(EXPORT_PACKAGE) {
        for clause in parse_clauses(header) {
            let exported = clause_attribute(&clause, VERSION_ATTRIBUTE)
                .map(str::parse::<Version>)
                .transpose()
                .map_err(|e| invalid_header(location, EXPORT_PACKAGE, e))?
                .unwrap_or_default();
            for package in &clause.paths {
                resource.add_capability(
                    Capability::new(namespace::PACKAGE)
                        .with_attribute(namespace::PACKAGE, package.as_str())
                        .with_attribute(VERSION_ATTRIBUTE, exported.clone())
                        .with_attribute("bundle-symbolic-name", bsn)
                        .with_attribute("bundle-version", version.clone()),
                );
            }
        }
    }

    if let Some(header) = headers.get(IMPORT_PACKAGE) {
        for clause in parse_clauses(header) {
            let range = clause_range(&clause, VERSION_ATTRIBUTE)
                .map_err(|e| invalid_header(location, IMPORT_PACKAGE, e))?;
            for package in &clause.paths {
                let requirement = Requirement::new(location, namespace::PACKAGE)
                    .with_attribute(namespace::PACKAGE, package.as_str())
                    .with_attribute(VERSION_ATTRIBUTE, range.clone());
                resource.add_requirement(apply_directives(requirement, &clause));
            }
        }
    }

    if let Some(header) = headers.get(REQUIRE_BUNDLE) {
        for clause in parse_clauses(header) {
            let range = clause_range(&clause, "bundle-version")
                .map_err(|e| invalid_header(location, REQUIRE_BUNDLE, e))?;
            for name in &clause.paths {
                let mut requirement = Requirement::identity(location, name, TYPE_BUNDLE, range.clone());
                if let Some((_, resolution)) =
                    clause.directives.iter().find(|(k, _)| k == RESOLUTION_DIRECTIVE)
                {
                    requirement = requirement.with_directive(RESOLUTION_DIRECTIVE, resolution);
                }
                resource.add_requirement(requirement);
            }
        }
    }

    if let Some(header) = headers.get(PROVIDE_CAPABILITY) {
        for clause in parse_clauses(header) {
            for ns in &clause.paths {
                let mut capability = Capability::new(ns);
                for (key, kind, value) in &clause.attributes {
                    let value = capability_value(key, kind.as_deref(), value)
                        .map_err(|e| invalid_header(location, PROVIDE_CAPABILITY, e))?;
                    capability.attributes.insert(key.clone(), value);
                }
                for (key, value) in &clause.directives {
                    capability.directives.insert(key.clone(), value.clone());
                }
                resource.add_capability(capability);
            }
        }
    }

    if let Some(header) = headers.get(REQUIRE_CAPABILITY) {
        let requirements = parse_requirements(location, header)
            .map_err(|e| invalid_header(location, REQUIRE_CAPABILITY, e))?;
        for requirement in requirements {
            resource.add_requirement(requirement);
        }
    }

    Ok(resource)
}
