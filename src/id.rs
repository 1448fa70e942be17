//! [`PackageId`]: the `scope/name` identity shared by every component.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A package identity in the Wally registry: `scope/name`, both
/// case-sensitive and matching `[A-Za-z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageId {
    scope: String,
    name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PackageIdError {
    #[error("package id `{0}` must be in `scope/name` form")]
    MissingSeparator(String),
    #[error("package id `{0}` has an empty scope or name")]
    Empty(String),
    #[error("package id `{0}` contains characters other than [A-Za-z0-9_-]")]
    InvalidCharacters(String),
}

fn valid_segment(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl PackageId {
    pub fn new(scope: impl Into<String>, name: impl Into<String>) -> Result<Self, PackageIdError> {
        let scope = scope.into();
        let name = name.into();
        let combined = format!("{scope}/{name}");
        if scope.is_empty() || name.is_empty() {
            return Err(PackageIdError::Empty(combined));
        }
        if !valid_segment(&scope) || !valid_segment(&name) {
            return Err(PackageIdError::InvalidCharacters(combined));
        }
        Ok(PackageId { scope, name })
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `_Index/{scope}_{name}` directory name for this id.
    pub fn index_dir_name(&self) -> String {
        format!("{}_{}", self.scope, self.name)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.name)
    }
}

impl FromStr for PackageId {
    type Err = PackageIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((scope, name)) = s.split_once('/') else {
            return Err(PackageIdError::MissingSeparator(s.to_string()));
        };
        PackageId::new(scope, name)
    }
}

impl TryFrom<String> for PackageId {
    type Error = PackageIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PackageId> for String {
    fn from(id: PackageId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scope_and_name() {
        let id: PackageId = "roblox/roact".parse().unwrap();
        assert_eq!(id.scope(), "roblox");
        assert_eq!(id.name(), "roact");
        assert_eq!(id.to_string(), "roblox/roact");
        assert_eq!(id.index_dir_name(), "roblox_roact");
    }

    #[test]
    fn rejects_missing_separator() {
        assert!("roact".parse::<PackageId>().is_err());
    }

    #[test]
    fn rejects_empty_segments() {
        assert!("/roact".parse::<PackageId>().is_err());
        assert!("roblox/".parse::<PackageId>().is_err());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!("roblox/ro act".parse::<PackageId>().is_err());
        assert!("rob lox/roact".parse::<PackageId>().is_err());
    }

    #[test]
    fn accepts_underscores_and_dashes() {
        assert!("ro-blox/ro_act".parse::<PackageId>().is_ok());
    }
}
