use chrono::{DateTime, Utc};
use orca_core::{TaskErrorKind, TaskType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionOutcome {
    Success,
    Failure,
}

/// One finished agent invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub task_id: Uuid,
    pub agent_name: String,
    pub task_type: TaskType,
    pub outcome: ExecutionOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<TaskErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u64,
    pub recorded_at: DateTime<Utc>,
}

impl ExecutionRecord {
    pub fn success(
        task_id: Uuid,
        agent_name: impl Into<String>,
        task_type: TaskType,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            agent_name: agent_name.into(),
            task_type,
            outcome: ExecutionOutcome::Success,
            error_kind: None,
            message: None,
            duration_ms,
            recorded_at: Utc::now(),
        }
    }

    pub fn failure(
        task_id: Uuid,
        agent_name: impl Into<String>,
        task_type: TaskType,
        kind: TaskErrorKind,
        message: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            agent_name: agent_name.into(),
            task_type,
            outcome: ExecutionOutcome::Failure,
            error_kind: Some(kind),
            message: Some(message.into()),
            duration_ms,
            recorded_at: Utc::now(),
        }
    }

    /// Override the timestamp. Used when importing or backfilling history.
    pub fn at(mut self, recorded_at: DateTime<Utc>) -> Self {
        self.recorded_at = recorded_at;
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ExecutionOutcome::Success
    }
}
