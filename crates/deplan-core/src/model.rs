//! Resources, capabilities, requirements and wirings
//!
//! A [`Resource`] offers [`Capability`] facts and declares [`Requirement`]
//! needs. Requirements are matched against capabilities attribute by
//! attribute: string attributes must be equal, a version-range attribute must
//! contain the capability's version.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::version::{Version, VersionRange};

/// Well-known namespaces
pub mod namespace {
    pub const IDENTITY: &str = "osgi.identity";
    pub const PACKAGE: &str = "osgi.wiring.package";
}

pub const TYPE_ATTRIBUTE: &str = "type";
pub const VERSION_ATTRIBUTE: &str = "version";
pub const RESOLUTION_DIRECTIVE: &str = "resolution";
pub const RESOLUTION_MANDATORY: &str = "mandatory";
pub const RESOLUTION_OPTIONAL: &str = "optional";

pub const TYPE_BUNDLE: &str = "osgi.bundle";
pub const TYPE_FEATURE: &str = "karaf.feature";
pub const TYPE_DUMMY: &str = "dummy";

/// String-keyed header map produced by a manifest reader
pub type Attributes = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    Version(Version),
    Range(VersionRange),
}

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_version(&self) -> Option<&Version> {
        match self {
            AttributeValue::Version(v) => Some(v),
            _ => None,
        }
    }

    fn satisfied_by(&self, offered: Option<&AttributeValue>) -> bool {
        match (self, offered) {
            (AttributeValue::Range(range), Some(AttributeValue::Version(v))) => range.contains(v),
            // Capabilities without a version are treated as 0.0.0
            (AttributeValue::Range(range), None) => range.contains(&Version::default()),
            (AttributeValue::Range(range), Some(AttributeValue::String(s))) => {
                s.parse().is_ok_and(|v| range.contains(&v))
            }
            (AttributeValue::String(wanted), Some(AttributeValue::String(s))) => wanted == s,
            (AttributeValue::String(wanted), Some(AttributeValue::Version(v))) => {
                wanted.parse::<Version>().is_ok_and(|w| &w == v)
            }
            (AttributeValue::Version(wanted), Some(AttributeValue::Version(v))) => wanted == v,
            _ => false,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{}", s),
            AttributeValue::Version(v) => write!(f, "{}", v),
            AttributeValue::Range(r) => write!(f, "{}", r),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<Version> for AttributeValue {
    fn from(value: Version) -> Self {
        AttributeValue::Version(value)
    }
}

impl From<VersionRange> for AttributeValue {
    fn from(value: VersionRange) -> Self {
        AttributeValue::Range(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub namespace: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub directives: BTreeMap<String, String>,
}

impl Capability {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            attributes: BTreeMap::new(),
            directives: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// Id of the resource declaring this requirement
    pub owner: String,
    pub namespace: String,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub directives: BTreeMap<String, String>,
}

impl Requirement {
    pub fn new(owner: &str, namespace: &str) -> Self {
        Self {
            owner: owner.to_string(),
            namespace: namespace.to_string(),
            attributes: BTreeMap::new(),
            directives: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn with_directive(mut self, key: &str, value: &str) -> Self {
        self.directives.insert(key.to_string(), value.to_string());
        self
    }

    /// An identity requirement for `name` of the given type within `range`
    pub fn identity(owner: &str, name: &str, kind: &str, range: VersionRange) -> Self {
        Requirement::new(owner, namespace::IDENTITY)
            .with_attribute(namespace::IDENTITY, name)
            .with_attribute(TYPE_ATTRIBUTE, kind)
            .with_attribute(VERSION_ATTRIBUTE, range)
    }

    pub fn is_optional(&self) -> bool {
        self.directives
            .get(RESOLUTION_DIRECTIVE)
            .is_some_and(|r| r == RESOLUTION_OPTIONAL)
    }

    pub fn is_identity(&self) -> bool {
        self.namespace == namespace::IDENTITY
    }

    /// True for identity requirements whose type attribute marks a feature
    pub fn is_feature(&self) -> bool {
        self.is_identity()
            && self
                .attributes
                .get(TYPE_ATTRIBUTE)
                .and_then(AttributeValue::as_str)
                == Some(TYPE_FEATURE)
    }

    pub fn identity_name(&self) -> Option<&str> {
        self.attributes
            .get(namespace::IDENTITY)
            .and_then(AttributeValue::as_str)
    }

    pub fn matches(&self, capability: &Capability) -> bool {
        capability.namespace == self.namespace
            && self
                .attributes
                .iter()
                .all(|(key, wanted)| wanted.satisfied_by(capability.attributes.get(key)))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.owner, self.namespace)?;
        for (key, value) in &self.attributes {
            write!(f, "; {}={}", key, value)?;
        }
        for (key, value) in &self.directives {
            write!(f, "; {}:={}", key, value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Unique key of the resource within a plan (its location for artifacts)
    pub id: String,
    /// Deployable location; `None` for synthetic resources
    pub uri: Option<String>,
    pub capabilities: Vec<Capability>,
    pub requirements: Vec<Requirement>,
}

impl Resource {
    /// Create a resource carrying a single identity capability
    pub fn new(id: &str, name: &str, version: Version, kind: &str) -> Self {
        let identity = Capability::new(namespace::IDENTITY)
            .with_attribute(namespace::IDENTITY, name)
            .with_attribute(TYPE_ATTRIBUTE, kind)
            .with_attribute(VERSION_ATTRIBUTE, version);
        Self {
            id: id.to_string(),
            uri: None,
            capabilities: vec![identity],
            requirements: Vec::new(),
        }
    }

    pub fn with_uri(mut self, uri: &str) -> Self {
        self.uri = Some(uri.to_string());
        self
    }

    pub fn add_capability(&mut self, capability: Capability) {
        self.capabilities.push(capability);
    }

    pub fn add_requirement(&mut self, requirement: Requirement) {
        self.requirements.push(requirement);
    }

    pub fn capabilities_in<'a>(&'a self, ns: &'a str) -> impl Iterator<Item = &'a Capability> {
        self.capabilities.iter().filter(move |c| c.namespace == ns)
    }

    fn identity(&self) -> Option<&Capability> {
        self.capabilities_in(namespace::IDENTITY).next()
    }

    /// Symbolic name from the identity capability, or the id when absent
    pub fn name(&self) -> &str {
        self.identity()
            .and_then(|c| c.attribute(namespace::IDENTITY))
            .and_then(AttributeValue::as_str)
            .unwrap_or(&self.id)
    }

    pub fn version(&self) -> Version {
        self.identity()
            .and_then(|c| c.attribute(VERSION_ATTRIBUTE))
            .and_then(AttributeValue::as_version)
            .cloned()
            .unwrap_or_default()
    }

    pub fn kind(&self) -> Option<&str> {
        self.identity()
            .and_then(|c| c.attribute(TYPE_ATTRIBUTE))
            .and_then(AttributeValue::as_str)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name(), self.version())
    }
}

/// A satisfied requirement: `requirer`'s requirement is met by `provider`'s capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    pub requirer: String,
    pub requirement: Requirement,
    pub provider: String,
    pub capability: Capability,
}

/// Resolver output: the selected resources and the wires leaving each of them
#[derive(Debug, Clone, Default)]
pub struct Wiring {
    resources: BTreeMap<String, Arc<Resource>>,
    wires: BTreeMap<String, Vec<Wire>>,
}

impl Wiring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource(&mut self, resource: Arc<Resource>) {
        self.resources
            .entry(resource.id.clone())
            .or_insert(resource);
    }

    pub fn add_wire(&mut self, wire: Wire) {
        self.wires.entry(wire.requirer.clone()).or_default().push(wire);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    pub fn resource(&self, id: &str) -> Option<&Arc<Resource>> {
        self.resources.get(id)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.resources.values()
    }

    pub fn wires(&self, requirer: &str) -> &[Wire] {
        self.wires.get(requirer).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(name: &str, version: &str) -> Resource {
        Resource::new(
            &format!("mvn:test/{}/{}", name, version),
            name,
            version.parse().unwrap(),
            TYPE_BUNDLE,
        )
    }

    #[test]
    fn test_identity_requirement_matches_within_range() {
        let res = bundle("org.example.a", "1.2.0");
        let cap = &res.capabilities[0];

        let req = Requirement::identity(
            "dummy",
            "org.example.a",
            TYPE_BUNDLE,
            "[1.0,2.0)".parse().unwrap(),
        );
        assert!(req.matches(cap));

        let req = Requirement::identity(
            "dummy",
            "org.example.a",
            TYPE_BUNDLE,
            "[1.3,2.0)".parse().unwrap(),
        );
        assert!(!req.matches(cap));
    }

    #[test]
    fn test_type_attribute_must_match() {
        let res = bundle("shared-name", "1.0.0");
        let req = Requirement::identity("dummy", "shared-name", TYPE_FEATURE, VersionRange::ANY);
        assert!(!req.matches(&res.capabilities[0]));
        assert!(!req.is_optional());
        assert!(req.is_feature());
    }

    #[test]
    fn test_package_requirement_defaults_missing_version() {
        let cap = Capability::new(namespace::PACKAGE).with_attribute(namespace::PACKAGE, "org.a");
        let req = Requirement::new("x", namespace::PACKAGE)
            .with_attribute(namespace::PACKAGE, "org.a")
            .with_attribute(VERSION_ATTRIBUTE, VersionRange::ANY);
        assert!(req.matches(&cap));
    }

    #[test]
    fn test_resource_identity_accessors() {
        let res = bundle("org.example.b", "2.0.1");
        assert_eq!(res.name(), "org.example.b");
        assert_eq!(res.version(), "2.0.1".parse().unwrap());
        assert_eq!(res.kind(), Some(TYPE_BUNDLE));
        assert_eq!(res.to_string(), "org.example.b/2.0.1");
        assert_eq!(res.capabilities_in(namespace::IDENTITY).count(), 1);
    }

    #[test]
    fn test_requirement_display_names_owner() {
        let req = Requirement::identity("dummy", "foo", TYPE_FEATURE, VersionRange::ANY)
            .with_directive(RESOLUTION_DIRECTIVE, RESOLUTION_OPTIONAL);
        let text = req.to_string();
        assert!(text.starts_with("[dummy] osgi.identity"));
        assert!(text.contains("osgi.identity=foo"));
        assert!(text.contains("resolution:=optional"));
        assert!(req.is_optional());
    }

    #[test]
    fn test_wiring_keeps_first_resource_per_id() {
        let mut wiring = Wiring::new();
        let first = Arc::new(bundle("a", "1.0"));
        wiring.add_resource(Arc::clone(&first));
        wiring.add_resource(Arc::new(bundle("a", "1.0")));
        assert_eq!(wiring.len(), 1);
        assert!(wiring.contains(&first.id));
        assert!(wiring.wires(&first.id).is_empty());
    }
}
