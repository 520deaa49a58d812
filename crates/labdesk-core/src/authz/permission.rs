use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire literal the gateway uses for the grant-everything permission.
const WILDCARD_LITERAL: &str = "all";

/// A fine-grained capability held by a user, e.g. `orders:read`.
///
/// The gateway encodes "every permission" as the literal string `"all"`.
/// That literal is decoded into [`Permission::All`] so it can never be
/// compared as ordinary permission text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    /// Grants every permission.
    All,
    /// A named capability such as `billing:write`.
    Named(String),
}

impl Permission {
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        if trimmed == WILDCARD_LITERAL {
            Permission::All
        } else {
            Permission::Named(trimmed.to_string())
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Permission::Named(name.into())
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Permission::All)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Permission::All => WILDCARD_LITERAL,
            Permission::Named(name) => name,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Permission {
    fn from(s: &str) -> Self {
        Permission::parse(s)
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Permission::parse(&raw))
    }
}
