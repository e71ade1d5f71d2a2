//! Node rows that relationships point at.

use serde::{Deserialize, Serialize};

use super::stub::Stub;

/// Type name of frozen point-in-time copies.
pub const SNAPSHOT_TYPE: &str = "Snapshot";

/// Anything that carries a graph identity.
pub trait Identifiable {
    fn object_type(&self) -> &str;

    fn object_id(&self) -> i64;

    fn stub(&self) -> Stub {
        Stub::new(self.object_type(), self.object_id())
    }
}

impl Identifiable for Stub {
    fn object_type(&self) -> &str {
        &self.object_type
    }

    fn object_id(&self) -> i64 {
        self.id
    }

    fn stub(&self) -> Stub {
        self.clone()
    }
}

/// A stored business object (Control, Risk, Regulation, Snapshot, ...).
///
/// Only snapshots carry a `child`: the entity they were copied from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Object {
    #[serde(rename = "type")]
    pub object_type: String,
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child: Option<Stub>,
    pub created_at_us: i64,
    pub updated_at_us: i64,
}

impl Object {
    /// Build an unsaved object. Timestamps are filled in on insert.
    pub fn new(object_type: impl Into<String>, id: i64, title: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            id,
            title: title.into(),
            child: None,
            created_at_us: 0,
            updated_at_us: 0,
        }
    }

    /// Build an unsaved snapshot of `child`.
    pub fn snapshot_of(id: i64, child: Stub) -> Self {
        let title = format!("Snapshot of {child}");
        Self {
            child: Some(child),
            ..Self::new(SNAPSHOT_TYPE, id, title)
        }
    }

    #[must_use]
    pub fn is_snapshot(&self) -> bool {
        self.object_type == SNAPSHOT_TYPE
    }
}

impl Identifiable for Object {
    fn object_type(&self) -> &str {
        &self.object_type
    }

    fn object_id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::{Identifiable, Object, SNAPSHOT_TYPE};
    use crate::model::stub::Stub;

    #[test]
    fn snapshot_carries_child_reference() {
        let snap = Object::snapshot_of(4, Stub::new("Control", 1));
        assert!(snap.is_snapshot());
        assert_eq!(snap.object_type, SNAPSHOT_TYPE);
        assert_eq!(snap.child, Some(Stub::new("Control", 1)));
        assert_eq!(snap.stub(), Stub::new("Snapshot", 4));
    }

    #[test]
    fn plain_object_has_no_child() {
        let control = Object::new("Control", 1, "Access reviews");
        assert!(!control.is_snapshot());
        assert!(control.child.is_none());
        assert_eq!(control.stub().to_string(), "Control#1");
    }
}
