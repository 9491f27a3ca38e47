// src/config/location.rs

//! Feature-pack coordinates.

use crate::error::{Error, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coordinates of one released feature-pack: a producer name plus a semver
/// version. Displayed and parsed as `producer@version`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeaturePackLocation {
    pub producer: String,
    pub version: Version,
}

impl FeaturePackLocation {
    pub fn new(producer: impl Into<String>, version: Version) -> Self {
        Self {
            producer: producer.into(),
            version,
        }
    }
}

impl fmt::Display for FeaturePackLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.producer, self.version)
    }
}

impl FromStr for FeaturePackLocation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (producer, version) = s
            .split_once('@')
            .ok_or_else(|| Error::InvalidLocation(s.to_string()))?;
        if producer.is_empty() {
            return Err(Error::InvalidLocation(s.to_string()));
        }
        let version =
            Version::parse(version).map_err(|_| Error::InvalidLocation(s.to_string()))?;
        Ok(Self::new(producer, version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let loc: FeaturePackLocation = "core@1.2.3".parse().unwrap();
        assert_eq!(loc.producer, "core");
        assert_eq!(loc.version, Version::new(1, 2, 3));
        assert_eq!(loc.to_string(), "core@1.2.3");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("core".parse::<FeaturePackLocation>().is_err());
        assert!("@1.0.0".parse::<FeaturePackLocation>().is_err());
        assert!("core@not-a-version".parse::<FeaturePackLocation>().is_err());
    }
}
