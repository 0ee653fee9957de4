use crate::config::MonitorConfig;
use crate::coordinator::Coordinator;
use crate::monitor::{AlertLevel, TimeRange};
use chrono::{DateTime, Utc};
use cron::Schedule;
use orca_core::{OrcaError, OrcaResult};
use std::str::FromStr;
use std::sync::Arc;

/// Cron-driven loop that produces a monitoring report on every fire and
/// logs its alerts.
#[derive(Debug, Clone)]
pub struct MonitorScheduler {
    schedule: Schedule,
    range: TimeRange,
}

impl MonitorScheduler {
    pub fn new(cron_expr: &str, range: TimeRange) -> OrcaResult<Self> {
        Ok(Self {
            schedule: Self::parse_cron(cron_expr)?,
            range,
        })
    }

    pub fn from_config(config: &MonitorConfig) -> OrcaResult<Self> {
        let range = TimeRange::from_str(&config.report_range)?;
        Self::new(&config.schedule, range)
    }

    /// Parse a 7-field cron expression: sec min hour day-of-month month day-of-week year.
    pub fn parse_cron(cron_expr: &str) -> OrcaResult<Schedule> {
        Schedule::from_str(cron_expr)
            .map_err(|e| OrcaError::Config(format!("Invalid cron expression '{cron_expr}': {e}")))
    }

    pub fn next_fire_time(&self) -> Option<DateTime<Utc>> {
        self.schedule.upcoming(Utc).next()
    }

    /// Spawn the loop. Abort the returned handle to stop it.
    pub fn start(self, coordinator: Arc<Coordinator>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let Some(next) = self.next_fire_time() else {
                    tracing::warn!("Monitor schedule has no upcoming fire times, stopping");
                    return;
                };
                let now = Utc::now();
                if next > now {
                    let wait = (next - now).to_std().unwrap_or_default();
                    tracing::debug!(?wait, "Monitor sleeping until next report");
                    tokio::time::sleep(wait).await;
                }

                match coordinator.get_monitoring_report(self.range).await {
                    Ok(report) => {
                        tracing::info!(
                            total_requests = report.performance.total_requests,
                            health = ?report.performance.system_health,
                            queue_length = report.queue.queue_length,
                            alerts = report.alerts.len(),
                            "Monitoring report generated"
                        );
                        for alert in &report.alerts {
                            match alert.level {
                                AlertLevel::Critical => tracing::error!(
                                    agent = ?alert.agent,
                                    task_type = ?alert.task_type,
                                    "{}",
                                    alert.message
                                ),
                                AlertLevel::Warning => tracing::warn!(
                                    agent = ?alert.agent,
                                    "{}",
                                    alert.message
                                ),
                                AlertLevel::Info => tracing::info!(
                                    agent = ?alert.agent,
                                    "{}",
                                    alert.message
                                ),
                            }
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Monitoring report failed"),
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_cron() {
        assert!(MonitorScheduler::parse_cron("0 * * * * * *").is_ok());
    }

    #[test]
    fn test_parse_invalid_cron() {
        let err = MonitorScheduler::parse_cron("every five minutes").unwrap_err();
        assert!(matches!(err, OrcaError::Config(_)));
    }

    #[test]
    fn test_next_fire_time_is_future() {
        let scheduler = MonitorScheduler::new("0 * * * * * *", TimeRange::LastHour).unwrap();
        assert!(scheduler.next_fire_time().unwrap() > Utc::now());
    }

    #[test]
    fn test_from_config() {
        let scheduler = MonitorScheduler::from_config(&MonitorConfig::default()).unwrap();
        assert_eq!(scheduler.range, TimeRange::LastHour);

        let bad_range = MonitorConfig {
            report_range: "fortnight".into(),
            ..MonitorConfig::default()
        };
        assert!(MonitorScheduler::from_config(&bad_range).is_err());
    }
}
