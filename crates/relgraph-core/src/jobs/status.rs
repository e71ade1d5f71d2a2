use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::GraphError;

/// Direction of a bulk job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum JobType {
    #[default]
    Import,
    Export,
}

impl JobType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Import => "Import",
            Self::Export => "Export",
        }
    }
}

/// Lifecycle of an import/export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum JobStatus {
    #[default]
    #[serde(rename = "Not Started")]
    NotStarted,
    Analysis,
    #[serde(rename = "In Progress")]
    InProgress,
    Blocked,
    #[serde(rename = "Analysis Failed")]
    AnalysisFailed,
    Stopped,
    Failed,
    Finished,
}

impl JobStatus {
    pub const ALL: [Self; 8] = [
        Self::NotStarted,
        Self::Analysis,
        Self::InProgress,
        Self::Blocked,
        Self::AnalysisFailed,
        Self::Stopped,
        Self::Failed,
        Self::Finished,
    ];

    /// Stored form, e.g. `"In Progress"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "Not Started",
            Self::Analysis => "Analysis",
            Self::InProgress => "In Progress",
            Self::Blocked => "Blocked",
            Self::AnalysisFailed => "Analysis Failed",
            Self::Stopped => "Stopped",
            Self::Failed => "Failed",
            Self::Finished => "Finished",
        }
    }

    /// Whether the job can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::AnalysisFailed | Self::Stopped | Self::Failed | Self::Finished
        )
    }

    /// Validate a move from `self` to `target`.
    ///
    /// Valid transitions:
    /// - `Not Started -> Analysis | In Progress | Stopped | Failed`
    /// - `Analysis -> Blocked | In Progress | Analysis Failed | Stopped`
    /// - `Blocked -> In Progress | Stopped`
    /// - `In Progress -> Finished | Failed | Stopped`
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidTransition`] for anything else, including
    /// no-op transitions and any move out of a terminal status.
    pub fn can_transition_to(self, target: Self) -> Result<(), GraphError> {
        let allowed = matches!(
            (self, target),
            (
                Self::NotStarted,
                Self::Analysis | Self::InProgress | Self::Stopped | Self::Failed
            ) | (
                Self::Analysis,
                Self::Blocked | Self::InProgress | Self::AnalysisFailed | Self::Stopped
            ) | (Self::Blocked, Self::InProgress | Self::Stopped)
                | (Self::InProgress, Self::Finished | Self::Failed | Self::Stopped)
        );

        if allowed {
            Ok(())
        } else {
            Err(GraphError::InvalidTransition {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }
}

/// Error returned when a job enum literal is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {expected}: '{got}'")]
pub struct ParseJobEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lowercase with `_`/`-` folded to spaces, so `in_progress` matches.
fn normalize(input: &str) -> String {
    input
        .trim()
        .to_ascii_lowercase()
        .replace(['_', '-'], " ")
}

impl FromStr for JobType {
    type Err = ParseJobEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "import" => Ok(Self::Import),
            "export" => Ok(Self::Export),
            _ => Err(ParseJobEnumError {
                expected: "job type",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for JobStatus {
    type Err = ParseJobEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| ParseJobEnumError {
                expected: "job status",
                got: s.to_string(),
            })
    }
}
