use crate::payload::TaskOutput;
use crate::types::TaskRecord;
use async_trait::async_trait;
use orca_core::OrcaResult;

/// The opaque work an agent performs for a task.
///
/// Implementations return [`orca_core::OrcaError::Connectivity`] or
/// [`orca_core::OrcaError::Timeout`] when the backing service could not be
/// reached; those count toward the agent's automatic deactivation. Any other
/// error fails the task without affecting the agent's liveness.
#[async_trait]
pub trait AgentCapability: Send + Sync {
    async fn invoke(&self, task: &TaskRecord) -> OrcaResult<TaskOutput>;
}
