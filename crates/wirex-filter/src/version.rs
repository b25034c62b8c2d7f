//! Four-part versions (`major.minor.micro.qualifier`)

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref VERSION_REGEX: Regex =
        Regex::new(r"^\s*(\d+)(?:\.(\d+)(?:\.(\d+)(?:\.([0-9A-Za-z_-]+))?)?)?\s*$").unwrap();
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version string \"{0}\"")]
    Invalid(String),
    #[error("Version component \"{component}\" is out of range in \"{version}\"")]
    OutOfRange { component: String, version: String },
}

/// A version with numeric major, minor and micro parts and an optional qualifier.
///
/// Missing numeric parts default to zero, so `1.2` equals `1.2.0`. Qualifiers
/// are compared as plain strings after the numeric parts; an empty qualifier
/// sorts first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub micro: u64,
    pub qualifier: String,
}

impl Version {
    /// Create a version without qualifier
    pub fn new(major: u64, minor: u64, micro: u64) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// Attach a qualifier
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = qualifier.into();
        self
    }

    /// Parse a version string
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let caps = VERSION_REGEX
            .captures(input)
            .ok_or_else(|| VersionError::Invalid(input.to_string()))?;

        let component = |idx: usize| -> Result<u64, VersionError> {
            match caps.get(idx) {
                Some(m) => m.as_str().parse().map_err(|_| VersionError::OutOfRange {
                    component: m.as_str().to_string(),
                    version: input.to_string(),
                }),
                None => Ok(0),
            }
        };

        Ok(Self {
            major: component(1)?,
            minor: component(2)?,
            micro: component(3)?,
            qualifier: caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
            .then(self.micro.cmp(&other.micro))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
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
