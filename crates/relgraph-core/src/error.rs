use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    ObjectNotFound,
    RelationshipNotFound,
    JobNotFound,
    ValidationFailed,
    DuplicateRelationship,
    InvalidStateTransition,
    Forbidden,
    ImportInProgress,
    CorruptStore,
    StorageFailure,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::ObjectNotFound => "E2001",
            Self::RelationshipNotFound => "E2002",
            Self::JobNotFound => "E2003",
            Self::ValidationFailed => "E3001",
            Self::DuplicateRelationship => "E3002",
            Self::InvalidStateTransition => "E3003",
            Self::Forbidden => "E4001",
            Self::ImportInProgress => "E4002",
            Self::CorruptStore => "E5001",
            Self::StorageFailure => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::ObjectNotFound => "Object not found",
            Self::RelationshipNotFound => "Relationship not found",
            Self::JobNotFound => "Import/export job not found",
            Self::ValidationFailed => "Validation failed",
            Self::DuplicateRelationship => "Relationship already exists",
            Self::InvalidStateTransition => "Invalid state transition",
            Self::Forbidden => "Forbidden",
            Self::ImportInProgress => "Import in progress",
            Self::CorruptStore => "Corrupt SQLite store",
            Self::StorageFailure => "Storage failure",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `relg init` to create the store."),
            Self::ConfigParseError => Some("Fix syntax in .relgraph/config.toml and retry."),
            Self::ObjectNotFound | Self::RelationshipNotFound | Self::JobNotFound => None,
            Self::ValidationFailed => None,
            Self::DuplicateRelationship => {
                Some("The pair is already mapped; look it up with `relg related`.")
            }
            Self::InvalidStateTransition => Some(
                "Follow the job lifecycle: Not Started -> Analysis -> Blocked -> In Progress -> Finished.",
            ),
            Self::Forbidden => Some("Only the job owner can read or change it."),
            Self::ImportInProgress => Some("Wait for the running import to finish, or stop it."),
            Self::CorruptStore => Some("Restore the store from backup or re-run `relg init`."),
            Self::StorageFailure => Some("Retry once. Check disk space and file permissions."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A policy or invariant violation with the message shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors returned by graph, policy, and job operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The storage uniqueness constraint rejected a duplicate edge.
    #[error("relationship already exists: {0}")]
    Conflict(String),

    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GraphError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(message))
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationFailed,
            Self::Conflict(_) => ErrorCode::DuplicateRelationship,
            Self::NotFound { kind, .. } => match kind.as_bytes() {
                b"relationship" => ErrorCode::RelationshipNotFound,
                b"job" => ErrorCode::JobNotFound,
                _ => ErrorCode::ObjectNotFound,
            },
            Self::Forbidden(_) => ErrorCode::Forbidden,
            Self::BadRequest(_) => ErrorCode::ImportInProgress,
            Self::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            Self::Storage(_) => ErrorCode::StorageFailure,
            Self::Json(_) => ErrorCode::CorruptStore,
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// Returns `true` for policy and invariant violations.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::{ErrorCode, GraphError};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotInitialized,
            ErrorCode::ConfigParseError,
            ErrorCode::ObjectNotFound,
            ErrorCode::RelationshipNotFound,
            ErrorCode::JobNotFound,
            ErrorCode::ValidationFailed,
            ErrorCode::DuplicateRelationship,
            ErrorCode::InvalidStateTransition,
            ErrorCode::Forbidden,
            ErrorCode::ImportInProgress,
            ErrorCode::CorruptStore,
            ErrorCode::StorageFailure,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::DuplicateRelationship.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn not_found_kind_selects_code() {
        let rel = GraphError::NotFound {
            kind: "relationship",
            key: "7".into(),
        };
        let job = GraphError::NotFound {
            kind: "job",
            key: "7".into(),
        };
        let obj = GraphError::NotFound {
            kind: "object",
            key: "Control#7".into(),
        };
        assert_eq!(rel.code(), ErrorCode::RelationshipNotFound);
        assert_eq!(job.code(), ErrorCode::JobNotFound);
        assert_eq!(obj.code(), ErrorCode::ObjectNotFound);
    }

    #[test]
    fn validation_error_displays_message_verbatim() {
        let err = GraphError::validation("Relationship.source can't be None.");
        assert_eq!(err.to_string(), "Relationship.source can't be None.");
        assert!(err.is_validation());
    }
}
