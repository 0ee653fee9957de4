//! Agent task orchestration: priority queue, agent registry, bounded-concurrency
//! dispatch, task lifecycle and monitoring.
//!
//! Callers go through the [`Coordinator`]: create a task, get a receipt back
//! immediately, then poll its status. The [`Orchestrator`] dispatches queued
//! tasks to capable, active agents while keeping at most `max_concurrent` of
//! them running, and appends every finished execution to the history store.
//! The [`Monitor`] aggregates that history into per-agent metrics and alerts.
//!
//! # Main types
//!
//! - [`Coordinator`] — Facade for task creation, status polling, agent control and reports.
//! - [`Orchestrator`] — Dispatch loop over the queue and registry.
//! - [`TaskQueue`] — Priority queue, FIFO within a priority band.
//! - [`AgentRegistry`] — Named agents, their capabilities and liveness.
//! - [`Monitor`] — Metrics, alert rules and monitoring reports.
//! - [`MonitorScheduler`] — Cron-driven background reporting.

/// Trait implemented by agent backends.
pub mod capability;
/// Orchestrator, monitor and agent configuration.
pub mod config;
/// Caller-facing facade.
pub mod coordinator;
/// Dispatch engine.
pub mod engine;
/// Metrics aggregation and alerting.
pub mod monitor;
/// Typed task requests and outputs.
pub mod payload;
/// Default agent roster.
pub mod profiles;
/// Agent registry and selection.
pub mod registry;
/// Cron-driven monitoring reports.
pub mod scheduler;
/// Priority task queue.
pub mod task_queue;
/// Task record and lifecycle transitions.
pub mod types;

pub use capability::AgentCapability;
pub use config::{AgentConfig, AlertThresholds, MonitorConfig, OrchestratorConfig};
pub use coordinator::{Coordinator, ReceiptStatus, TaskReceipt};
pub use engine::Orchestrator;
pub use monitor::{
    Alert, AlertLevel, AgentReport, Monitor, MonitoringReport, PerformanceSummary, SystemHealth,
    TimeRange, WorkerMetrics,
};
pub use payload::{
    CompetitorAnalysisOutput, CompetitorAnalysisRequest, ContentGenerationOutput,
    ContentGenerationRequest, Language, TaskOutput, TaskPayload, VoiceDeploymentOutput,
    VoiceDeploymentRequest, VoicePlatform,
};
pub use profiles::default_agents;
pub use registry::{AgentDescriptor, AgentRegistry};
pub use scheduler::MonitorScheduler;
pub use task_queue::{QueueSnapshot, QueuedTask, TaskQueue};
pub use types::{TaskError, TaskRecord, TaskStatus};
