use crate::config::AlertThresholds;
use crate::registry::AgentDescriptor;
use crate::task_queue::QueueSnapshot;
use chrono::{DateTime, Duration, Utc};
use orca_core::{OrcaError, OrcaResult, TaskType};
use orca_history::{ExecutionLogStore, ExecutionRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::sync::Arc;

/// Per-worker aggregates over a reporting window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerMetrics {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub last_active: Option<DateTime<Utc>>,
    pub average_response_ms: f64,
}

impl WorkerMetrics {
    /// `failed / total`, or 0 when nothing ran.
    pub fn error_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.failed_requests as f64 / self.total_requests as f64
    }

    fn observe(&mut self, record: &ExecutionRecord) {
        let total_ms = self.average_response_ms * self.total_requests as f64;
        self.total_requests += 1;
        if record.is_success() {
            self.successful_requests += 1;
        } else {
            self.failed_requests += 1;
        }
        self.average_response_ms =
            (total_ms + record.duration_ms as f64) / self.total_requests as f64;
        if self.last_active.map_or(true, |at| record.recorded_at > at) {
            self.last_active = Some(record.recorded_at);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Info => write!(f, "info"),
            AlertLevel::Warning => write!(f, "warning"),
            AlertLevel::Critical => write!(f, "critical"),
        }
    }
}

/// Advisory signal derived from metrics. Never feeds back into task state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    fn new(level: AlertLevel, message: String, raised_at: DateTime<Utc>) -> Self {
        Self {
            level,
            message,
            agent: None,
            task_type: None,
            raised_at,
        }
    }

    fn for_agent(mut self, agent: &str) -> Self {
        self.agent = Some(agent.to_string());
        self
    }

    fn for_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = Some(task_type);
        self
    }
}

/// Health band derived from the average response time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemHealth {
    Excellent,
    Good,
    Degraded,
    Critical,
}

impl SystemHealth {
    pub fn from_average_ms(average_ms: f64) -> Self {
        if average_ms <= 3000.0 {
            SystemHealth::Excellent
        } else if average_ms <= 5000.0 {
            SystemHealth::Good
        } else if average_ms <= 10_000.0 {
            SystemHealth::Degraded
        } else {
            SystemHealth::Critical
        }
    }
}

/// Fleet-wide totals for a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub average_response_ms: f64,
    pub system_health: SystemHealth,
}

impl PerformanceSummary {
    pub fn from_metrics(metrics: &BTreeMap<String, WorkerMetrics>) -> Self {
        let mut total = 0u64;
        let mut successful = 0u64;
        let mut total_ms = 0.0;
        for m in metrics.values() {
            total += m.total_requests;
            successful += m.successful_requests;
            total_ms += m.average_response_ms * m.total_requests as f64;
        }
        let (success_rate, average_response_ms) = if total == 0 {
            (0.0, 0.0)
        } else {
            (successful as f64 / total as f64, total_ms / total as f64)
        };
        Self {
            total_requests: total,
            successful_requests: successful,
            failed_requests: total - successful,
            success_rate,
            average_response_ms,
            system_health: SystemHealth::from_average_ms(average_response_ms),
        }
    }
}

/// Reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    LastHour,
    LastDay,
    LastWeek,
    LastMonth,
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl TimeRange {
    /// `(start, end)` relative to `now`.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        match *self {
            TimeRange::LastHour => (now - Duration::hours(1), now),
            TimeRange::LastDay => (now - Duration::hours(24), now),
            TimeRange::LastWeek => (now - Duration::days(7), now),
            TimeRange::LastMonth => (now - Duration::days(30), now),
            TimeRange::Custom { start, end } => (start, end),
        }
    }
}

impl FromStr for TimeRange {
    type Err = OrcaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1h" => Ok(TimeRange::LastHour),
            "24h" | "1d" => Ok(TimeRange::LastDay),
            "7d" => Ok(TimeRange::LastWeek),
            "30d" => Ok(TimeRange::LastMonth),
            other => Err(OrcaError::Validation(format!(
                "unknown time range '{other}' (expected 1h, 24h, 7d or 30d)"
            ))),
        }
    }
}

/// One worker's line in a monitoring report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    pub name: String,
    pub active: bool,
    pub capabilities: BTreeSet<TaskType>,
    #[serde(flatten)]
    pub metrics: WorkerMetrics,
    pub error_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringReport {
    pub generated_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub agents: Vec<AgentReport>,
    pub queue: QueueSnapshot,
    pub performance: PerformanceSummary,
    pub alerts: Vec<Alert>,
}

/// Read-only aggregation over the execution history.
pub struct Monitor {
    history: Arc<dyn ExecutionLogStore>,
    thresholds: AlertThresholds,
}

impl Monitor {
    pub fn new(history: Arc<dyn ExecutionLogStore>, thresholds: AlertThresholds) -> Self {
        Self {
            history,
            thresholds,
        }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    /// Per-worker metrics for executions recorded in `[start, end]`.
    pub async fn compute_metrics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> OrcaResult<BTreeMap<String, WorkerMetrics>> {
        let records = self.history.query(start, end).await?;
        Ok(aggregate(&records))
    }

    pub fn generate_alerts(
        &self,
        metrics: &BTreeMap<String, WorkerMetrics>,
        snapshot: &QueueSnapshot,
    ) -> Vec<Alert> {
        self.generate_alerts_at(metrics, snapshot, Utc::now())
    }

    /// Threshold rules evaluated against a fixed clock.
    pub fn generate_alerts_at(
        &self,
        metrics: &BTreeMap<String, WorkerMetrics>,
        snapshot: &QueueSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        let t = &self.thresholds;
        let mut alerts = Vec::new();

        for (agent, m) in metrics {
            let sampled = m.total_requests > t.min_requests;
            let rate = m.error_rate();
            if sampled && rate > t.error_rate {
                alerts.push(
                    Alert::new(
                        AlertLevel::Warning,
                        format!(
                            "{agent} has a high error rate: {:.1}% over {} requests",
                            rate * 100.0,
                            m.total_requests
                        ),
                        now,
                    )
                    .for_agent(agent),
                );
            }
            if sampled && m.average_response_ms > t.slow_response_ms {
                alerts.push(
                    Alert::new(
                        AlertLevel::Warning,
                        format!(
                            "{agent} is responding slowly: {:.0}ms average",
                            m.average_response_ms
                        ),
                        now,
                    )
                    .for_agent(agent),
                );
            }
            if let Some(last) = m.last_active {
                if now - last > Duration::hours(t.inactivity_hours) {
                    alerts.push(
                        Alert::new(
                            AlertLevel::Info,
                            format!(
                                "{agent} has been inactive for more than {} hours",
                                t.inactivity_hours
                            ),
                            now,
                        )
                        .for_agent(agent),
                    );
                }
            }
        }

        if snapshot.queue_length > t.backlog {
            alerts.push(Alert::new(
                AlertLevel::Warning,
                format!("high backlog: {} tasks queued", snapshot.queue_length),
                now,
            ));
        }
        alerts
    }

    /// Critical alert per task family with queued work and no active agent able to take it.
    pub fn unserviceable_alerts(
        &self,
        snapshot: &QueueSnapshot,
        agents: &[AgentDescriptor],
        now: DateTime<Utc>,
    ) -> Vec<Alert> {
        snapshot
            .backlog_by_type
            .iter()
            .filter(|(task_type, queued)| {
                **queued > 0 && !agents.iter().any(|a| a.can_serve(**task_type))
            })
            .map(|(task_type, queued)| {
                Alert::new(
                    AlertLevel::Critical,
                    format!("{queued} {task_type} tasks queued with no active agent to serve them"),
                    now,
                )
                .for_task_type(*task_type)
            })
            .collect()
    }

    /// Full report for `range`, merging history with the live registry and queue.
    pub async fn build_report(
        &self,
        range: TimeRange,
        snapshot: QueueSnapshot,
        agents: &[AgentDescriptor],
    ) -> OrcaResult<MonitoringReport> {
        let now = Utc::now();
        let (window_start, window_end) = range.bounds(now);
        let mut metrics = self.compute_metrics(window_start, window_end).await?;

        // Registered agents without history still report; a newer heartbeat counts as activity.
        for agent in agents {
            let entry = metrics.entry(agent.name.clone()).or_default();
            if let Some(heartbeat) = agent.last_heartbeat_at {
                if entry.last_active.map_or(true, |at| heartbeat > at) {
                    entry.last_active = Some(heartbeat);
                }
            }
        }

        let mut alerts = self.generate_alerts_at(&metrics, &snapshot, now);
        alerts.extend(self.unserviceable_alerts(&snapshot, agents, now));
        alerts.sort_by(|a, b| b.level.cmp(&a.level));

        let performance = PerformanceSummary::from_metrics(&metrics);
        let agents = metrics
            .into_iter()
            .map(|(name, metrics)| {
                let registered = agents.iter().find(|a| a.name == name);
                AgentReport {
                    active: registered.is_some_and(|a| a.active),
                    capabilities: registered
                        .map(|a| a.capabilities.clone())
                        .unwrap_or_default(),
                    error_rate: metrics.error_rate(),
                    name,
                    metrics,
                }
            })
            .collect();

        Ok(MonitoringReport {
            generated_at: now,
            window_start,
            window_end,
            agents,
            queue: snapshot,
            performance,
            alerts,
        })
    }
}

/// Fold execution records into per-worker metrics.
pub fn aggregate(records: &[ExecutionRecord]) -> BTreeMap<String, WorkerMetrics> {
    let mut metrics: BTreeMap<String, WorkerMetrics> = BTreeMap::new();
    for record in records {
        metrics
            .entry(record.agent_name.clone())
            .or_default()
            .observe(record);
    }
    metrics
}
