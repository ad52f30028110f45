use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// Longest accepted world name, in bytes.
pub const MAX_NAME_LEN: usize = 64;

/// Errors from validating a world name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("world name is empty")]
    Empty,
    #[error("world name is {len} bytes, limit is {MAX_NAME_LEN}")]
    TooLong { len: usize },
    #[error("world name `{0}` is reserved")]
    Reserved(String),
    #[error("world name contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Identifier of a world.
///
/// The same string names the metadata file stem and the host's level
/// directory, so it must be a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorldName(String);

impl WorldName {
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if name.len() > MAX_NAME_LEN {
            return Err(NameError::TooLong { len: name.len() });
        }
        if name == "." || name == ".." {
            return Err(NameError::Reserved(name));
        }
        if let Some(c) = name
            .chars()
            .find(|c| matches!(c, '/' | '\\') || c.is_control())
        {
            return Err(NameError::InvalidChar(c));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WorldName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for WorldName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl FromStr for WorldName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for WorldName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorldName> for String {
    fn from(name: WorldName) -> Self {
        name.0
    }
}

/// A live level as reported by the host server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LevelHandle {
    name: String,
}

impl LevelHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
