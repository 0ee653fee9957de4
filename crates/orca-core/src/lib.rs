//! Core types and error definitions for the Orca task orchestration workspace.
//!
//! This crate provides the foundational types shared by every Orca crate:
//! the unified error enum and the small vocabulary (task families and
//! priorities) that both the orchestrator and the execution history speak.
//!
//! # Main types
//!
//! - [`OrcaError`] — Unified error enum for all Orca subsystems.
//! - [`OrcaResult`] — Convenience alias for `Result<T, OrcaError>`.
//! - [`TaskType`] — The family a task belongs to; agents advertise the families they serve.
//! - [`Priority`] — Ordered dispatch priority (`low < medium < high`).
//! - [`TaskErrorKind`] — Failure classification recorded on failed tasks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// --- Error types ---

/// Top-level error type for the Orca workspace.
///
/// Each variant corresponds to a failure class that callers handle differently.
#[derive(Debug, thiserror::Error)]
pub enum OrcaError {
    /// A task-creation request was malformed. The task is never created.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An operation was attempted on a task in the wrong lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The invoked agent capability failed or returned an error marker.
    #[error("Agent invocation error: {0}")]
    AgentInvocation(String),

    /// The agent could not be reached. Counts toward automatic deactivation.
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// An agent invocation exceeded its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The queue is at its configured depth cap.
    #[error("Capacity exhausted: {0}")]
    CapacityExhausted(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from the execution history store.
    #[error("Store error: {0}")]
    Store(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrcaError {
    /// Whether this error means the agent itself was unreachable rather than
    /// having rejected the work.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, OrcaError::Connectivity(_) | OrcaError::Timeout(_))
    }
}

/// A convenience `Result` alias using [`OrcaError`].
pub type OrcaResult<T> = Result<T, OrcaError>;

// --- Task vocabulary ---

/// The family a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// SEO article / blog content generation.
    ContentGeneration,
    /// Provisioning of a voice agent on a telephony platform.
    VoiceAgentDeployment,
    /// Competitor content and keyword gap analysis.
    CompetitorAnalysis,
}

impl TaskType {
    /// Every task family, in declaration order.
    pub const ALL: [TaskType; 3] = [
        TaskType::ContentGeneration,
        TaskType::VoiceAgentDeployment,
        TaskType::CompetitorAnalysis,
    ];

    /// The wire name of this family.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::ContentGeneration => "content_generation",
            TaskType::VoiceAgentDeployment => "voice_agent_deployment",
            TaskType::CompetitorAnalysis => "competitor_analysis",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = OrcaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| OrcaError::Config(format!("unknown task type '{s}'")))
    }
}

/// Why a task ended in the `failed` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    /// The capability returned an error, panicked, or produced the wrong output family.
    AgentInvocation,
    /// The capability did not finish within the configured invocation timeout.
    Timeout,
}

impl fmt::Display for TaskErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskErrorKind::AgentInvocation => write!(f, "agent_invocation"),
            TaskErrorKind::Timeout => write!(f, "timeout"),
        }
    }
}

/// Dispatch priority. Variant order is the ordering: `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Background work.
    Low,
    /// The default band.
    #[default]
    Medium,
    /// Dispatched before anything else still queued.
    High,
}

impl Priority {
    /// Every priority band, lowest first.
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
        }
    }
}

impl FromStr for Priority {
    type Err = OrcaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(OrcaError::Validation(format!("unknown priority '{other}'"))),
        }
    }
}
