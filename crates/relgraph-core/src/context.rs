//! The acting principal for a request.
//!
//! Every mutating operation takes an [`Actor`] explicitly instead of reading
//! a process-wide "current user".

use serde::{Deserialize, Serialize};

/// Who is performing an operation, and whether they are a trusted
/// integration exempt from type-pair mapping restrictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    pub is_external: bool,
}

impl Actor {
    /// A regular user.
    #[must_use]
    pub const fn internal(user_id: i64) -> Self {
        Self {
            user_id,
            is_external: false,
        }
    }

    /// A trusted external application account.
    #[must_use]
    pub const fn external(user_id: i64) -> Self {
        Self {
            user_id,
            is_external: true,
        }
    }
}
