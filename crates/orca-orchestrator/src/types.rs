use crate::payload::{TaskOutput, TaskPayload};
use chrono::{DateTime, Utc};
use orca_core::{OrcaError, OrcaResult, Priority, TaskErrorKind, TaskType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a task.
///
/// `queued → running → {completed | failed}`, plus `queued → cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Cause recorded on a failed task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// A unit of asynchronous work tracked through its lifecycle.
///
/// Only the orchestrator mutates a record, and only through the transition
/// methods below. `result` is set exactly when the task completed and `error`
/// exactly when it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub task_type: TaskType,
    pub payload: TaskPayload,
    pub priority: Priority,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    pub requested_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn new(requested_by: impl Into<String>, payload: TaskPayload, priority: Priority) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_type: payload.task_type(),
            payload,
            priority,
            status: TaskStatus::Queued,
            result: None,
            error: None,
            requested_by: requested_by.into(),
            assigned_agent: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// `queued → running`.
    pub fn start(&mut self, agent: impl Into<String>) -> OrcaResult<()> {
        self.expect_status(TaskStatus::Queued, "start")?;
        self.status = TaskStatus::Running;
        self.assigned_agent = Some(agent.into());
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// `running → completed`. An output of another family is an error marker
    /// and fails the task instead.
    pub fn complete(&mut self, output: TaskOutput) -> OrcaResult<()> {
        self.expect_status(TaskStatus::Running, "complete")?;
        if output.task_type() != self.task_type {
            return self.fail(TaskError::new(
                TaskErrorKind::AgentInvocation,
                format!(
                    "agent returned {} output for a {} task",
                    output.task_type(),
                    self.task_type
                ),
            ));
        }
        self.status = TaskStatus::Completed;
        self.result = Some(output);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// `running → failed`.
    pub fn fail(&mut self, error: TaskError) -> OrcaResult<()> {
        self.expect_status(TaskStatus::Running, "fail")?;
        self.status = TaskStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// `queued → cancelled`. Running tasks cannot be cancelled.
    pub fn cancel(&mut self) -> OrcaResult<()> {
        self.expect_status(TaskStatus::Queued, "cancel")?;
        self.status = TaskStatus::Cancelled;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn expect_status(&self, expected: TaskStatus, action: &str) -> OrcaResult<()> {
        if self.status != expected {
            return Err(OrcaError::InvalidState(format!(
                "cannot {action} task {}: status is {}, expected {expected}",
                self.id, self.status
            )));
        }
        Ok(())
    }
}
