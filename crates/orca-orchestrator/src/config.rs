use crate::registry::AgentDescriptor;
use orca_core::{OrcaError, OrcaResult, TaskType};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dispatch limits and policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound on concurrently running tasks.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Fail a running task with a timeout error after this many seconds.
    #[serde(default)]
    pub invocation_timeout_secs: Option<u64>,
    /// Reject new tasks once this many are queued. Unbounded when unset.
    #[serde(default)]
    pub max_queue_length: Option<usize>,
    /// Consecutive connectivity failures before an agent is marked inactive.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds before an auto-deactivated agent is put back in rotation. 0 disables recovery.
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,
}

fn default_max_concurrent() -> usize {
    5
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_recovery_timeout_secs() -> u64 {
    60
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            invocation_timeout_secs: None,
            max_queue_length: None,
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.invocation_timeout_secs = Some(secs);
        self
    }

    pub fn with_max_queue_length(mut self, cap: usize) -> Self {
        self.max_queue_length = Some(cap);
        self
    }

    pub fn with_recovery_timeout_secs(mut self, secs: u64) -> Self {
        self.recovery_timeout_secs = secs;
        self
    }

    pub fn recovery_timeout(&self) -> Option<Duration> {
        (self.recovery_timeout_secs > 0).then_some(Duration::from_secs(self.recovery_timeout_secs))
    }

    pub fn invocation_timeout(&self) -> Option<Duration> {
        self.invocation_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> OrcaResult<()> {
        if self.max_concurrent == 0 {
            return Err(OrcaError::Config("max_concurrent must be at least 1".into()));
        }
        if self.failure_threshold == 0 {
            return Err(OrcaError::Config(
                "failure_threshold must be at least 1".into(),
            ));
        }
        if self.invocation_timeout_secs == Some(0) {
            return Err(OrcaError::Config(
                "invocation_timeout_secs must be positive when set".into(),
            ));
        }
        Ok(())
    }
}

/// Monitor alert thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Per-worker error rate above which a warning is raised.
    #[serde(default = "default_error_rate")]
    pub error_rate: f64,
    /// Error-rate and latency rules only apply above this many requests.
    #[serde(default = "default_min_requests")]
    pub min_requests: u64,
    /// Queue length above which a backlog warning is raised.
    #[serde(default = "default_backlog")]
    pub backlog: usize,
    /// Hours without activity before an inactivity notice.
    #[serde(default = "default_inactivity_hours")]
    pub inactivity_hours: i64,
    /// Average response time, in milliseconds, above which a latency warning is raised.
    #[serde(default = "default_slow_response_ms")]
    pub slow_response_ms: f64,
}

fn default_error_rate() -> f64 {
    0.10
}
fn default_min_requests() -> u64 {
    10
}
fn default_backlog() -> usize {
    50
}
fn default_inactivity_hours() -> i64 {
    24
}
fn default_slow_response_ms() -> f64 {
    5000.0
}

/// Longest inactivity window accepted: one year.
const MAX_INACTIVITY_HOURS: i64 = 24 * 365;

impl AlertThresholds {
    pub fn validate(&self) -> OrcaResult<()> {
        if !(self.error_rate > 0.0 && self.error_rate <= 1.0) {
            return Err(OrcaError::Config(format!(
                "alerts.error_rate must be in (0, 1], got {}",
                self.error_rate
            )));
        }
        if !(1..=MAX_INACTIVITY_HOURS).contains(&self.inactivity_hours) {
            return Err(OrcaError::Config(format!(
                "alerts.inactivity_hours must be between 1 and {MAX_INACTIVITY_HOURS}, got {}",
                self.inactivity_hours
            )));
        }
        if !(self.slow_response_ms.is_finite() && self.slow_response_ms > 0.0) {
            return Err(OrcaError::Config(format!(
                "alerts.slow_response_ms must be positive, got {}",
                self.slow_response_ms
            )));
        }
        Ok(())
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            error_rate: default_error_rate(),
            min_requests: default_min_requests(),
            backlog: default_backlog(),
            inactivity_hours: default_inactivity_hours(),
            slow_response_ms: default_slow_response_ms(),
        }
    }
}

/// Background monitoring cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// 7-field cron expression: sec min hour day-of-month month day-of-week year.
    #[serde(default = "default_schedule")]
    pub schedule: String,
    /// Window each scheduled report covers (`1h`, `24h`, `7d`, `30d`).
    #[serde(default = "default_report_range")]
    pub report_range: String,
}

fn default_schedule() -> String {
    "0 */15 * * * * *".into()
}

fn default_report_range() -> String {
    "1h".into()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            schedule: default_schedule(),
            report_range: default_report_range(),
        }
    }
}

/// Static agent entry, as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    pub capabilities: Vec<TaskType>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl AgentConfig {
    pub fn to_descriptor(&self) -> OrcaResult<AgentDescriptor> {
        if self.name.trim().is_empty() {
            return Err(OrcaError::Config("agent name must not be empty".into()));
        }
        if self.capabilities.is_empty() {
            return Err(OrcaError::Config(format!(
                "agent '{}' declares no capabilities",
                self.name
            )));
        }
        let descriptor = AgentDescriptor::new(self.name.clone(), self.capabilities.iter().copied());
        Ok(if self.active {
            descriptor
        } else {
            descriptor.inactive()
        })
    }
}
