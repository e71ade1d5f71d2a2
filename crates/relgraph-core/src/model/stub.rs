//! Lightweight `(type, id)` identity references.
//!
//! A [`Stub`] names a node of the relationship graph without holding the
//! node itself. Stubs are the keys of [`RelationshipsCache`] and the values
//! produced when reading either end of a relationship row.
//!
//! [`RelationshipsCache`]: crate::relationship::cache::RelationshipsCache

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::relationship::Relationship;

/// Minimal object representation: a type name and a numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Stub {
    #[serde(rename = "type")]
    pub object_type: String,
    pub id: i64,
}

impl Stub {
    pub fn new(object_type: impl Into<String>, id: i64) -> Self {
        Self {
            object_type: object_type.into(),
            id,
        }
    }

    /// Stub for the source end of a relationship.
    #[must_use]
    pub fn from_source(relationship: &Relationship) -> Self {
        Self::new(relationship.source_type.clone(), relationship.source_id)
    }

    /// Stub for the destination end of a relationship.
    #[must_use]
    pub fn from_destination(relationship: &Relationship) -> Self {
        Self::new(
            relationship.destination_type.clone(),
            relationship.destination_id,
        )
    }
}

impl fmt::Display for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.object_type, self.id)
    }
}

/// Error returned when a stub literal cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid object reference '{0}': expected Type#id or Type:id")]
pub struct ParseStubError(String);

impl FromStr for Stub {
    type Err = ParseStubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (object_type, id) = trimmed
            .rsplit_once('#')
            .or_else(|| trimmed.rsplit_once(':'))
            .ok_or_else(|| ParseStubError(s.to_string()))?;

        let object_type = object_type.trim();
        if object_type.is_empty() || !object_type.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ParseStubError(s.to_string()));
        }

        let id = id
            .trim()
            .parse::<i64>()
            .map_err(|_| ParseStubError(s.to_string()))?;

        Ok(Self::new(object_type, id))
    }
}
