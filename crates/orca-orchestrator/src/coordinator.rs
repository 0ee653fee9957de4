use crate::capability::AgentCapability;
use crate::config::{AlertThresholds, OrchestratorConfig};
use crate::engine::Orchestrator;
use crate::monitor::{Monitor, MonitoringReport, TimeRange};
use crate::payload::{
    CompetitorAnalysisRequest, ContentGenerationRequest, TaskPayload, VoiceDeploymentRequest,
};
use crate::registry::AgentDescriptor;
use crate::task_queue::QueueSnapshot;
use crate::types::TaskRecord;
use chrono::{DateTime, Utc};
use orca_core::{OrcaError, OrcaResult, Priority};
use orca_history::ExecutionLogStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Created,
}

/// Returned as soon as a task is accepted; poll with the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReceipt {
    pub task_id: Uuid,
    pub status: ReceiptStatus,
}

/// Single entry point for callers: task creation, status polling, agent
/// control and monitoring.
///
/// Built once by the composition root and shared as `Arc<Coordinator>`.
pub struct Coordinator {
    orchestrator: Orchestrator,
    monitor: Monitor,
}

impl Coordinator {
    /// Must be called from inside a Tokio runtime.
    pub fn new(
        config: OrchestratorConfig,
        thresholds: AlertThresholds,
        history: Arc<dyn ExecutionLogStore>,
    ) -> OrcaResult<Self> {
        thresholds.validate()?;
        Ok(Self {
            orchestrator: Orchestrator::new(config, history.clone())?,
            monitor: Monitor::new(history, thresholds),
        })
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    pub fn create_content_task(
        &self,
        requested_by: &str,
        request: ContentGenerationRequest,
        priority: Priority,
    ) -> OrcaResult<TaskReceipt> {
        self.create_task(requested_by, TaskPayload::ContentGeneration(request), priority)
    }

    pub fn create_voice_deployment_task(
        &self,
        requested_by: &str,
        request: VoiceDeploymentRequest,
        priority: Priority,
    ) -> OrcaResult<TaskReceipt> {
        self.create_task(
            requested_by,
            TaskPayload::VoiceAgentDeployment(request),
            priority,
        )
    }

    pub fn create_competitor_analysis_task(
        &self,
        requested_by: &str,
        request: CompetitorAnalysisRequest,
        priority: Priority,
    ) -> OrcaResult<TaskReceipt> {
        self.create_task(
            requested_by,
            TaskPayload::CompetitorAnalysis(request),
            priority,
        )
    }

    /// Validate and enqueue. Returns without waiting for dispatch.
    pub fn create_task(
        &self,
        requested_by: &str,
        payload: TaskPayload,
        priority: Priority,
    ) -> OrcaResult<TaskReceipt> {
        if requested_by.trim().is_empty() {
            return Err(OrcaError::Validation("requested_by must not be empty".into()));
        }
        payload.validate()?;

        let task_id = self
            .orchestrator
            .submit(TaskRecord::new(requested_by, payload, priority))?;
        Ok(TaskReceipt {
            task_id,
            status: ReceiptStatus::Created,
        })
    }

    pub fn get_task_status(&self, id: Uuid) -> Option<TaskRecord> {
        self.orchestrator.task(id)
    }

    /// Lookup by an externally supplied id; malformed ids are simply not found.
    pub fn lookup_task(&self, id: &str) -> Option<TaskRecord> {
        let id = Uuid::parse_str(id.trim()).ok()?;
        self.get_task_status(id)
    }

    pub fn get_queue_status(&self) -> QueueSnapshot {
        self.orchestrator.snapshot()
    }

    pub fn get_agent_status(&self) -> BTreeMap<String, bool> {
        self.orchestrator.agent_status()
    }

    pub fn cancel_task(&self, id: Uuid) -> OrcaResult<Option<TaskRecord>> {
        self.orchestrator.cancel(id)
    }

    pub fn register_agent(&self, descriptor: AgentDescriptor, capability: Arc<dyn AgentCapability>) {
        self.orchestrator.register_agent(descriptor, capability);
    }

    pub fn mark_agent_active(&self, name: &str) -> bool {
        self.orchestrator.mark_agent_active(name)
    }

    pub fn mark_agent_inactive(&self, name: &str) -> bool {
        self.orchestrator.mark_agent_inactive(name)
    }

    pub fn prune_terminal(&self, before: DateTime<Utc>) -> usize {
        self.orchestrator.prune_terminal(before)
    }

    pub async fn get_monitoring_report(&self, range: TimeRange) -> OrcaResult<MonitoringReport> {
        let (snapshot, agents) = self.orchestrator.observe();
        self.monitor.build_report(range, snapshot, &agents).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::payload::{Language, VoicePlatform};
    use orca_history::MemoryLogStore;

    fn coordinator() -> Coordinator {
        Coordinator::new(
            OrchestratorConfig::default(),
            AlertThresholds::default(),
            Arc::new(MemoryLogStore::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_thresholds() {
        let thresholds = AlertThresholds {
            error_rate: 1.5,
            ..AlertThresholds::default()
        };
        let err = Coordinator::new(
            OrchestratorConfig::default(),
            thresholds,
            Arc::new(MemoryLogStore::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, OrcaError::Config(_)));
    }

    #[tokio::test]
    async fn test_create_returns_receipt() {
        let coordinator = coordinator();
        let receipt = coordinator
            .create_content_task(
                "marketing-site",
                ContentGenerationRequest::new("immigration", vec!["green card".into()]),
                Priority::High,
            )
            .unwrap();
        assert_eq!(receipt.status, ReceiptStatus::Created);

        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["status"], "created");

        let task = coordinator.get_task_status(receipt.task_id).unwrap();
        assert_eq!(task.requested_by, "marketing-site");
        assert_eq!(coordinator.get_queue_status().queue_length, 1);
    }

    #[tokio::test]
    async fn test_validation_rejects_before_creation() {
        let coordinator = coordinator();
        let err = coordinator
            .create_voice_deployment_task(
                "ops",
                VoiceDeploymentRequest {
                    agent_name: "intake".into(),
                    platform: VoicePlatform::Retell,
                    languages: vec![Language::En],
                    health_check_endpoint: Some("ftp://bad".into()),
                    rollback_enabled: true,
                },
                Priority::Medium,
            )
            .unwrap_err();
        assert!(matches!(err, OrcaError::Validation(_)));

        let err = coordinator
            .create_competitor_analysis_task(
                "  ",
                CompetitorAnalysisRequest {
                    practice_area: "family law".into(),
                    competitor_domains: vec!["rival.example".into()],
                    location: None,
                },
                Priority::Low,
            )
            .unwrap_err();
        assert!(matches!(err, OrcaError::Validation(_)));
        assert_eq!(coordinator.get_queue_status(), QueueSnapshot::default());
    }

    #[tokio::test]
    async fn test_lookup_task_tolerates_bad_ids() {
        let coordinator = coordinator();
        assert!(coordinator.lookup_task("not-a-uuid").is_none());
        assert!(coordinator.lookup_task(&Uuid::new_v4().to_string()).is_none());

        let receipt = coordinator
            .create_content_task(
                "tests",
                ContentGenerationRequest::new("immigration", vec!["visa".into()]),
                Priority::Low,
            )
            .unwrap();
        let found = coordinator
            .lookup_task(&receipt.task_id.to_string())
            .unwrap();
        assert_eq!(found.id, receipt.task_id);
    }

    #[tokio::test]
    async fn test_report_flags_unserviceable_backlog() {
        let coordinator = coordinator();
        coordinator
            .create_content_task(
                "tests",
                ContentGenerationRequest::new("immigration", vec!["visa".into()]),
                Priority::Medium,
            )
            .unwrap();

        let report = coordinator
            .get_monitoring_report(TimeRange::LastDay)
            .await
            .unwrap();
        assert_eq!(report.queue.queue_length, 1);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.alerts[0].level, crate::monitor::AlertLevel::Critical);
    }
}
