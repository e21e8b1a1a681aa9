//! Artifact versions and version ranges
//!
//! Versions follow the `major.minor.micro[.qualifier]` scheme used by bundle
//! manifests. Parsing is lenient: `1`, `1.2` and `1.2.3-SNAPSHOT` are accepted
//! and normalized (`1.0.0`, `1.2.0`, `1.2.3.SNAPSHOT`).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::PlanError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    /// Compared lexically; an empty qualifier sorts lowest
    pub qualifier: String,
}

impl Version {
    pub fn new(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// The first version of the next minor line (`1.4.2` → `1.5.0`), if the
    /// minor number can still grow
    pub fn next_minor(&self) -> Option<Version> {
        let minor = self.minor.checked_add(1)?;
        Some(Version::new(self.major, minor, 0))
    }
}

impl FromStr for Version {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(PlanError::version(s, "empty version"));
        }

        let mut numbers = [0u64; 3];
        let mut qualifier = String::new();
        let mut rest = text;

        for (i, slot) in numbers.iter_mut().enumerate() {
            let digits = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            if digits == 0 {
                if i == 0 {
                    return Err(PlanError::version(s, "must start with a number"));
                }
                qualifier = rest.to_string();
                break;
            }
            *slot = rest[..digits]
                .parse()
                .map_err(|_| PlanError::version(s, "numeric segment out of range"))?;
            rest = &rest[digits..];

            match rest.chars().next() {
                None => break,
                Some('.') if i < 2 => rest = &rest[1..],
                Some('.' | '-' | '_') => {
                    qualifier = rest[1..].to_string();
                    break;
                }
                Some(_) => {
                    qualifier = rest.to_string();
                    break;
                }
            }
        }

        if qualifier.contains(char::is_whitespace) {
            return Err(PlanError::version(s, "qualifier contains whitespace"));
        }

        Ok(Version {
            major: numbers[0],
            minor: numbers[1],
            micro: numbers[2],
            qualifier,
        })
    }
}

impl TryFrom<String> for Version {
    type Error = PlanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

/// An interval of versions; an absent bound is unbounded
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    pub floor: Option<Version>,
    pub floor_inclusive: bool,
    pub ceiling: Option<Version>,
    pub ceiling_inclusive: bool,
}

impl VersionRange {
    pub const ANY: VersionRange = VersionRange {
        floor: None,
        floor_inclusive: true,
        ceiling: None,
        ceiling_inclusive: false,
    };

    /// `[v, ∞)`
    pub fn at_least(version: Version) -> Self {
        Self {
            floor: Some(version),
            floor_inclusive: true,
            ceiling: None,
            ceiling_inclusive: false,
        }
    }

    /// `[v, v]`
    pub fn exact(version: Version) -> Self {
        Self {
            floor: Some(version.clone()),
            floor_inclusive: true,
            ceiling: Some(version),
            ceiling_inclusive: true,
        }
    }

    /// `[floor, ceiling)`
    pub fn half_open(floor: Version, ceiling: Version) -> Self {
        Self {
            floor: Some(floor),
            floor_inclusive: true,
            ceiling: Some(ceiling),
            ceiling_inclusive: false,
        }
    }

    /// `[v, major.(minor+1).0)`, open-ended when `v` has no next minor line
    pub fn minor_line(version: Version) -> Self {
        match version.next_minor() {
            Some(ceiling) => Self::half_open(version, ceiling),
            None => Self::at_least(version),
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        let above_floor = match &self.floor {
            None => true,
            Some(floor) => match version.cmp(floor) {
                Ordering::Greater => true,
                Ordering::Equal => self.floor_inclusive,
                Ordering::Less => false,
            },
        };
        let below_ceiling = match &self.ceiling {
            None => true,
            Some(ceiling) => match version.cmp(ceiling) {
                Ordering::Less => true,
                Ordering::Equal => self.ceiling_inclusive,
                Ordering::Greater => false,
            },
        };
        above_floor && below_ceiling
    }

    pub fn is_any(&self) -> bool {
        self.floor.is_none() && self.ceiling.is_none()
    }
}

/// Parses `[a,b]`, `[a,b)`, `(a,b]`, `(a,b)` or a bare version meaning `[v, ∞)`.
impl FromStr for VersionRange {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim().trim_matches('"');
        let floor_inclusive = match text.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Ok(VersionRange::at_least(text.parse()?)),
        };
        let ceiling_inclusive = match text.chars().last() {
            Some(']') if text.len() > 1 => true,
            Some(')') if text.len() > 1 => false,
            _ => return Err(PlanError::version(s, "range must end with ']' or ')'")),
        };

        let inner = &text[1..text.len() - 1];
        let (floor, ceiling) = inner
            .split_once(',')
            .ok_or_else(|| PlanError::version(s, "range must contain two bounds"))?;
        let floor: Version = floor.parse()?;
        let ceiling: Version = ceiling.parse()?;
        if floor > ceiling {
            return Err(PlanError::version(s, "floor is above ceiling"));
        }

        Ok(VersionRange {
            floor: Some(floor),
            floor_inclusive,
            ceiling: Some(ceiling),
            ceiling_inclusive,
        })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.floor, &self.ceiling) {
            (None, None) => write!(f, "0.0.0"),
            (Some(floor), None) if self.floor_inclusive => write!(f, "{}", floor),
            (floor, ceiling) => {
                let floor = floor.clone().unwrap_or_default();
                write!(f, "{}{},", if self.floor_inclusive { '[' } else { '(' }, floor)?;
                match ceiling {
                    Some(ceiling) => write!(
                        f,
                        "{}{}",
                        ceiling,
                        if self.ceiling_inclusive { ']' } else { ')' }
                    ),
                    None => write!(f, "∞)"),
                }
            }
        }
    }
}
